//! Magnet coils: filament loci swept with a cross-section into tube solids.

mod cross_section;
mod filament;

pub use cross_section::{CrossSection, CIRCLE_SEGMENTS};
pub use filament::{filter_toroidal_extent, parse_filaments, Filament};

use tracing::{debug, info};

use crate::config::MagnetConfig;
use crate::error::{OperationError, Result};
use crate::export::{ExportSink, VolumeId};
use crate::math::units::scale_point;
use crate::math::Point3;
use crate::operations::shaping::{Frame, Sweep};
use crate::topology::{SolidId, TopologyStore};

/// One swept coil.
#[derive(Debug, Clone)]
pub struct Coil {
    /// Position among the kept filaments, in toroidal order.
    pub index: usize,
    /// Sampled centreline, closed implicitly.
    pub centerline: Vec<Point3>,
    /// Section frame at each centreline point.
    pub frames: Vec<Frame>,
    /// The tube solid.
    pub solid: SolidId,
    /// Volume ids assigned on import.
    pub volume_ids: Vec<VolumeId>,
}

/// The coil set of one build.
#[derive(Debug)]
pub struct MagnetSet {
    config: MagnetConfig,
    cross_section: CrossSection,
    filaments: Vec<Filament>,
    coils: Vec<Coil>,
}

impl MagnetSet {
    /// Validates the configuration and prepares an empty set.
    ///
    /// # Errors
    ///
    /// Returns a [`crate::error::ConfigError`] if the section is invalid.
    pub fn new(config: &MagnetConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            cross_section: config.cross_section()?,
            config: config.clone(),
            filaments: Vec::new(),
            coils: Vec::new(),
        })
    }

    /// Reads filaments from the configured coil file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or a line is malformed.
    pub fn load_filaments(&mut self) -> Result<&[Filament]> {
        let text = std::fs::read_to_string(&self.config.coils_file_path)?;
        let filaments = parse_filaments(&text, self.config.start_line, self.config.scale)?;
        self.set_filaments(filaments);
        Ok(&self.filaments)
    }

    /// Uses filaments given in unscaled file units.
    #[must_use]
    pub fn with_filaments(mut self, loci: Vec<Vec<Point3>>) -> Self {
        let scale = self.config.scale;
        let filaments = loci
            .into_iter()
            .map(|points| Filament {
                points: points.iter().map(|p| scale_point(p, scale)).collect(),
            })
            .collect();
        self.set_filaments(filaments);
        self
    }

    fn set_filaments(&mut self, filaments: Vec<Filament>) {
        let total = filaments.len();
        self.filaments =
            filter_toroidal_extent(filaments, self.config.toroidal_extent.to_radians());
        info!(
            read = total,
            kept = self.filaments.len(),
            extent_deg = self.config.toroidal_extent,
            "filaments loaded"
        );
    }

    /// Kept filaments in toroidal order.
    #[must_use]
    pub fn filaments(&self) -> &[Filament] {
        &self.filaments
    }

    /// The configured cross-section.
    #[must_use]
    pub fn cross_section(&self) -> CrossSection {
        self.cross_section
    }

    /// Material tag shared by all coils.
    #[must_use]
    pub fn mat_tag(&self) -> &str {
        &self.config.mat_tag
    }

    /// Built coils.
    #[must_use]
    pub fn coils(&self) -> &[Coil] {
        &self.coils
    }

    /// Sweeps the cross-section along every kept filament.
    ///
    /// # Errors
    ///
    /// Returns an error if a filament keeps fewer than three points after
    /// sampling or its frames cannot be built.
    pub fn build_magnet_coils(&mut self, store: &mut TopologyStore) -> Result<&[Coil]> {
        let section = self.cross_section.outline();
        let mut coils = Vec::with_capacity(self.filaments.len());
        for (index, filament) in self.filaments.iter().enumerate() {
            let centerline = filament.sample(index, self.config.sample_mod)?;
            let tube = Sweep::new(centerline.clone(), section.clone()).execute(store)?;
            debug!(coil = index, points = centerline.len(), "swept coil");
            coils.push(Coil {
                index,
                centerline,
                frames: tube.frames,
                solid: tube.solid,
                volume_ids: Vec::new(),
            });
        }
        info!(coils = coils.len(), "magnet coils built");
        self.coils = coils;
        Ok(&self.coils)
    }

    /// Hands every coil to the sink under the step file name.
    ///
    /// # Errors
    ///
    /// Returns [`OperationError::Failed`] if no coils were built, or any
    /// error the sink reports.
    pub fn import(&mut self, sink: &mut dyn ExportSink, store: &TopologyStore) -> Result<()> {
        if self.coils.is_empty() {
            return Err(OperationError::Failed("magnet coils not built".into()).into());
        }
        for coil in &mut self.coils {
            coil.volume_ids = sink.import_solid(&self.config.step_filename, store, coil.solid)?;
        }
        Ok(())
    }

    /// Whether a volume mesh of the coils was requested.
    #[must_use]
    pub fn mesh_requested(&self) -> bool {
        self.config.export_mesh
    }

    /// Hands every coil solid to the sink's mesher under the mesh file name.
    ///
    /// # Errors
    ///
    /// Returns [`OperationError::Failed`] if no coils were built, or any
    /// error the sink reports.
    pub fn export_mesh(&self, sink: &mut dyn ExportSink, store: &TopologyStore) -> Result<()> {
        if self.coils.is_empty() {
            return Err(OperationError::Failed("magnet coils not built".into()).into());
        }
        let solids: Vec<SolidId> = self.coils.iter().map(|c| c.solid).collect();
        info!(coils = solids.len(), filename = %self.config.mesh_filename, "meshing coils");
        sink.export_magnet_mesh(&self.config.mesh_filename, store, &solids)
    }

    /// All coil volume ids, in coil order.
    #[must_use]
    pub fn volume_ids(&self) -> Vec<VolumeId> {
        self.coils.iter().flat_map(|c| c.volume_ids.iter().copied()).collect()
    }
}
