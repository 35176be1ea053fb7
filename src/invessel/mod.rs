//! Layered in-vessel components: the thickness grid, ribs sampled from it,
//! and the solids lofted through the ribs.

pub mod build;
pub mod radial_build;
pub mod rib;

pub use build::{Component, InVesselBuild, SharedSurface};
pub use radial_build::{ComponentThickness, GridComponent, RadialBuildGrid, ThicknessMatrix};
pub use rib::{Rib, RibBuilder, RibLayer, PLASMA, SOL};
