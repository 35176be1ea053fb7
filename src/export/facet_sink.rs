use std::collections::HashSet;

use tracing::{debug, info};

use crate::config::DagmcExportConfig;
use crate::error::{ExportError, Result};
use crate::source_mesh::SourceMesh;
use crate::tessellation::{TessellateSolid, TriangleMesh};
use crate::topology::{SolidId, TopologyStore};

use super::{ExportSink, MaterialAssignment, SurfaceMerge, VolumeId};

/// A triangulated volume held by a [`FacetSink`].
#[derive(Debug, Clone)]
pub struct FacetedVolume {
    /// Id assigned on import.
    pub id: VolumeId,
    /// Name the volume was imported under.
    pub name: String,
    /// The imported solid.
    pub solid: SolidId,
    /// Boundary triangles, outward facing.
    pub mesh: TriangleMesh,
}

/// In-memory sink that triangulates imported solids.
///
/// Volume ids start at 1 and increase in import order, one per solid.
#[derive(Debug, Default)]
pub struct FacetSink {
    volumes: Vec<FacetedVolume>,
    imprinted: bool,
    merged_faces: usize,
    source_mesh: Option<(usize, usize)>,
    magnet_mesh: Option<(String, usize)>,
    materials: Option<MaterialAssignment>,
    settings: Option<DagmcExportConfig>,
}

impl FacetSink {
    /// Creates an empty sink.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Imported volumes in id order.
    #[must_use]
    pub fn volumes(&self) -> &[FacetedVolume] {
        &self.volumes
    }

    /// Looks up a volume by id.
    #[must_use]
    pub fn volume(&self, id: VolumeId) -> Option<&FacetedVolume> {
        self.volumes.iter().find(|v| v.id == id)
    }

    /// Whether a global imprint was requested.
    #[must_use]
    pub fn imprinted(&self) -> bool {
        self.imprinted
    }

    /// Number of explicitly merged shared faces.
    #[must_use]
    pub fn merged_faces(&self) -> usize {
        self.merged_faces
    }

    /// `(vertices, elements)` of the received source mesh.
    #[must_use]
    pub fn source_mesh(&self) -> Option<(usize, usize)> {
        self.source_mesh
    }

    /// `(name, triangles)` of the received coil mesh.
    #[must_use]
    pub fn magnet_mesh(&self) -> Option<(&str, usize)> {
        self.magnet_mesh.as_ref().map(|(name, n)| (name.as_str(), *n))
    }

    /// Material data of the last neutronics export.
    #[must_use]
    pub fn materials(&self) -> Option<&MaterialAssignment> {
        self.materials.as_ref()
    }

    /// Settings of the last neutronics export.
    #[must_use]
    pub fn settings(&self) -> Option<&DagmcExportConfig> {
        self.settings.as_ref()
    }

    fn next_id(&self) -> Result<VolumeId> {
        u32::try_from(self.volumes.len() + 1)
            .map(VolumeId)
            .map_err(|_| ExportError::Sink("volume id space exhausted".into()).into())
    }
}

impl ExportSink for FacetSink {
    fn import_solid(
        &mut self,
        name: &str,
        store: &TopologyStore,
        solid: SolidId,
    ) -> Result<Vec<VolumeId>> {
        let mesh = TessellateSolid::new(solid).execute(store)?;
        let id = self.next_id()?;
        debug!(name, volume = %id, triangles = mesh.num_triangles(), "faceted solid");
        self.volumes.push(FacetedVolume {
            id,
            name: name.to_string(),
            solid,
            mesh,
        });
        Ok(vec![id])
    }

    fn merge_surfaces(&mut self, merge: SurfaceMerge<'_>) -> Result<()> {
        match merge {
            SurfaceMerge::ImprintAll => self.imprinted = true,
            SurfaceMerge::Shared(shared) => {
                self.merged_faces += shared.iter().map(|s| s.faces.len()).sum::<usize>();
            }
        }
        Ok(())
    }

    fn export_magnet_mesh(
        &mut self,
        name: &str,
        store: &TopologyStore,
        solids: &[SolidId],
    ) -> Result<()> {
        if solids.is_empty() {
            return Err(ExportError::Sink("coil mesh has no solids".into()).into());
        }
        let mut triangles = 0;
        for &solid in solids {
            triangles += TessellateSolid::new(solid).execute(store)?.num_triangles();
        }
        debug!(name, solids = solids.len(), triangles, "meshed coils");
        self.magnet_mesh = Some((name.to_string(), triangles));
        Ok(())
    }

    fn export_source_mesh(&mut self, mesh: &SourceMesh) -> Result<()> {
        if mesh.elements().is_empty() {
            return Err(ExportError::Sink("source mesh has no elements".into()).into());
        }
        self.source_mesh = Some((mesh.vertices().len(), mesh.elements().len()));
        Ok(())
    }

    fn export_dagmc(
        &mut self,
        materials: &MaterialAssignment,
        settings: &DagmcExportConfig,
    ) -> Result<()> {
        let known: HashSet<VolumeId> = self.volumes.iter().map(|v| v.id).collect();
        let referenced: Vec<VolumeId> = match materials {
            MaterialAssignment::Legacy(groups) => {
                groups.iter().flat_map(|g| g.volumes.iter().copied()).collect()
            }
            MaterialAssignment::Native(blocks) => {
                blocks.iter().flat_map(|b| b.volumes.iter().copied()).collect()
            }
        };
        if let Some(missing) = referenced.iter().find(|id| !known.contains(id)) {
            return Err(ExportError::Sink(format!("volume {missing} was never imported")).into());
        }
        info!(
            volumes = self.volumes.len(),
            tagged = referenced.len(),
            filename = %settings.filename,
            "neutronics model exported"
        );
        self.materials = Some(materials.clone());
        self.settings = Some(settings.clone());
        Ok(())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::export::{tag_materials, FacetingMode};
    use crate::math::Point3;
    use crate::operations::shaping::Sweep;

    fn tube(store: &mut TopologyStore, offset: f64) -> SolidId {
        let centerline: Vec<Point3> = (0..12)
            .map(|i| {
                let t = f64::from(i) * std::f64::consts::TAU / 12.0;
                Point3::new(offset + 5.0 * t.cos(), 5.0 * t.sin(), 0.0)
            })
            .collect();
        let section = vec![(-0.5, -0.5), (0.5, -0.5), (0.5, 0.5), (-0.5, 0.5)];
        Sweep::new(centerline, section).execute(store).unwrap().solid
    }

    #[test]
    fn ids_follow_import_order() {
        let mut store = TopologyStore::new();
        let a = tube(&mut store, 0.0);
        let b = tube(&mut store, 20.0);
        let mut sink = FacetSink::new();
        assert_eq!(sink.import_solid("a", &store, a).unwrap(), vec![VolumeId(1)]);
        assert_eq!(sink.import_solid("b", &store, b).unwrap(), vec![VolumeId(2)]);
        let volume = sink.volume(VolumeId(2)).unwrap();
        assert_eq!(volume.name, "b");
        // 12 rings of 4 quads, two triangles each.
        assert_eq!(volume.mesh.num_triangles(), 96);
    }

    #[test]
    fn coil_mesh_counts_every_solid() {
        let mut store = TopologyStore::new();
        let solids = [tube(&mut store, 0.0), tube(&mut store, 20.0)];
        let mut sink = FacetSink::new();
        assert!(sink.export_magnet_mesh("coils", &store, &[]).is_err());
        sink.export_magnet_mesh("coils", &store, &solids).unwrap();
        assert_eq!(sink.magnet_mesh(), Some(("coils", 192)));
        assert!(sink.volumes().is_empty());
    }

    #[test]
    fn export_rejects_unknown_volumes() {
        let mut store = TopologyStore::new();
        let a = tube(&mut store, 0.0);
        let mut sink = FacetSink::new();
        let ids = sink.import_solid("a", &store, a).unwrap();
        let ghost = [VolumeId(9)];
        let bad = tag_materials(&[("steel", &ghost[..])], FacetingMode::Native).unwrap();
        assert!(sink.export_dagmc(&bad, &DagmcExportConfig::default()).is_err());
        let good = tag_materials(&[("steel", &ids[..])], FacetingMode::Legacy).unwrap();
        sink.export_dagmc(&good, &DagmcExportConfig::default()).unwrap();
        assert_eq!(sink.materials().unwrap().num_volumes(), 1);
    }
}
