//! Hand-off to the external geometry/export kernel.
//!
//! Builders produce solids in a [`TopologyStore`]; an [`ExportSink`] takes
//! them from there, reports the volume ids it assigned, and later receives
//! the material grouping and faceting settings for the neutronics model.

mod facet_sink;
mod tagging;

pub use facet_sink::{FacetSink, FacetedVolume};
pub use tagging::{tag_materials, FacetingMode, MaterialAssignment, MaterialBlock, MaterialGroup};

use serde::{Deserialize, Serialize};

use crate::config::DagmcExportConfig;
use crate::error::Result;
use crate::invessel::SharedSurface;
use crate::source_mesh::SourceMesh;
use crate::topology::{SolidId, TopologyStore};

/// Identifier the export kernel assigns to an imported volume.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct VolumeId(pub u32);

impl std::fmt::Display for VolumeId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// How coincident surfaces of neighbouring volumes are reconciled.
#[derive(Debug, Clone, Copy)]
pub enum SurfaceMerge<'a> {
    /// Imprint and merge every volume against every other.
    ImprintAll,
    /// Merge only the listed shared surfaces.
    Shared(&'a [SharedSurface]),
}

/// The external geometry kernel and file writers.
pub trait ExportSink {
    /// Imports one solid under `name`, returning the ids of the volumes created.
    ///
    /// # Errors
    ///
    /// Returns an error if the kernel rejects the solid.
    fn import_solid(
        &mut self,
        name: &str,
        store: &TopologyStore,
        solid: SolidId,
    ) -> Result<Vec<VolumeId>>;

    /// Reconciles surfaces shared between imported volumes.
    ///
    /// # Errors
    ///
    /// Returns an error if the kernel fails to merge.
    fn merge_surfaces(&mut self, merge: SurfaceMerge<'_>) -> Result<()>;

    /// Writes a volume mesh of the coil solids under `name`.
    ///
    /// # Errors
    ///
    /// Returns an error if meshing or writing fails.
    fn export_magnet_mesh(
        &mut self,
        name: &str,
        store: &TopologyStore,
        solids: &[SolidId],
    ) -> Result<()>;

    /// Writes the structured source mesh.
    ///
    /// # Errors
    ///
    /// Returns an error if the mesh cannot be written.
    fn export_source_mesh(&mut self, mesh: &SourceMesh) -> Result<()>;

    /// Writes the faceted neutronics model.
    ///
    /// # Errors
    ///
    /// Returns an error if faceting or writing fails.
    fn export_dagmc(
        &mut self,
        materials: &MaterialAssignment,
        settings: &DagmcExportConfig,
    ) -> Result<()>;
}
