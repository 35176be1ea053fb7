//! Layered stellarator reactor geometry.
//!
//! Turns flux-surface queries, a sparse radial-build thickness grid and coil
//! filament loci into boundary-represented solids, plus a structured mesh
//! for neutron-source sampling. Solids live in a [`topology::TopologyStore`]
//! and are handed to an [`export::ExportSink`] for CAD and neutronics output.

pub mod config;
pub mod error;
pub mod export;
pub mod flux;
pub mod geometry;
pub mod invessel;
pub mod magnets;
pub mod math;
pub mod operations;
pub mod source_mesh;
pub mod stellarator;
pub mod tessellation;
pub mod topology;

pub use error::{Result, StellforgeError};
pub use stellarator::Stellarator;
