use std::collections::HashSet;
use std::f64::consts::TAU;

use tracing::{debug, info, warn};

use crate::config::InVesselBuildConfig;
use crate::error::{OperationError, Result};
use crate::export::{ExportSink, VolumeId};
use crate::flux::FluxSurface;
use crate::math::{Point3, TOLERANCE};
use crate::operations::creation::MakeSolid;
use crate::operations::shaping::{polygon_cap, ring_cap, Loft, LoftWinding, LoftedSurface};
use crate::operations::transform::{CopySolids, Rotate};
use crate::topology::{FaceId, OrientedFace, SolidId, TopologyStore};

use super::radial_build::RadialBuildGrid;
use super::rib::{Rib, RibBuilder, PLASMA, SOL};

/// Angular slack for detecting a segment that closes the torus.
const FULL_TURN_TOLERANCE: f64 = 1e-9;

/// One layer of the build with a solid per toroidal segment.
#[derive(Debug, Clone)]
pub struct Component {
    /// Layer name.
    pub name: String,
    /// Material tag.
    pub mat_tag: String,
    /// Solids, base segment first, then one per repeat.
    pub solids: Vec<SolidId>,
    /// Volume ids assigned on import, empty until then.
    pub volume_ids: Vec<VolumeId>,
}

/// Faces shared by two radially adjacent components in one segment.
#[derive(Debug, Clone)]
pub struct SharedSurface {
    /// The inner component's name.
    pub inner: String,
    /// The outer component's name.
    pub outer: String,
    /// Toroidal segment index, 0 for the base segment.
    pub segment: usize,
    /// The shared faces.
    pub faces: Vec<FaceId>,
}

/// Builds the plasma, scrape-off layer and configured components as solids.
#[derive(Debug)]
pub struct InVesselBuild {
    grid: RadialBuildGrid,
    wall_s: f64,
    repeat: usize,
    num_ribs: usize,
    num_rib_pts: usize,
    scale: f64,
    plasma_mat_tag: String,
    sol_mat_tag: String,
    skip_imprint: bool,
    ribs: Vec<Rib>,
    components: Vec<Component>,
    shared: Vec<SharedSurface>,
}

impl InVesselBuild {
    /// Validates the configuration and prepares an empty build.
    ///
    /// # Errors
    ///
    /// Returns a [`crate::error::ConfigError`] if the section is invalid.
    pub fn new(config: &InVesselBuildConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            grid: config.radial_build_grid()?,
            wall_s: config.wall_s,
            repeat: config.repeat,
            num_ribs: config.num_ribs,
            num_rib_pts: config.num_rib_pts,
            scale: config.scale,
            plasma_mat_tag: config.plasma_mat_tag().to_string(),
            sol_mat_tag: config.sol_mat_tag().to_string(),
            skip_imprint: false,
            ribs: Vec::new(),
            components: Vec::new(),
            shared: Vec::new(),
        })
    }

    /// Makes each layer reuse the outer faces of the layer inside it.
    #[must_use]
    pub fn skip_imprint(mut self, skip: bool) -> Self {
        self.skip_imprint = skip;
        self
    }

    /// The thickness grid.
    #[must_use]
    pub fn grid(&self) -> &RadialBuildGrid {
        &self.grid
    }

    /// Ribs of the base segment, after [`InVesselBuild::generate_components`].
    #[must_use]
    pub fn ribs(&self) -> &[Rib] {
        &self.ribs
    }

    /// Components from the plasma outward.
    #[must_use]
    pub fn components(&self) -> &[Component] {
        &self.components
    }

    /// Looks up a component by name.
    #[must_use]
    pub fn component(&self, name: &str) -> Option<&Component> {
        self.components.iter().find(|c| c.name == name)
    }

    /// Surfaces shared between adjacent layers; empty unless imprinting is skipped.
    #[must_use]
    pub fn shared_surfaces(&self) -> &[SharedSurface] {
        &self.shared
    }

    /// Whether the base segment closes the torus on its own.
    fn full_turn(&self) -> bool {
        (self.grid.toroidal_extent() - TAU).abs() < FULL_TURN_TOLERANCE
    }

    /// Samples the ribs of the base segment.
    ///
    /// # Errors
    ///
    /// Returns an error if a flux query fails or a layer folds over itself.
    pub fn populate_ribs(&mut self, flux: &dyn FluxSurface) -> Result<&[Rib]> {
        let builder = RibBuilder::new(flux, &self.grid, self.wall_s, self.scale, self.num_rib_pts)?;
        let mut angles = self.grid.rib_angles(self.num_ribs);
        if self.full_turn() {
            angles.pop();
        }
        self.ribs = angles
            .into_iter()
            .map(|phi| builder.build_rib(phi))
            .collect::<Result<_>>()?;
        Ok(&self.ribs)
    }

    /// Builds every component's solids in `store`.
    ///
    /// # Errors
    ///
    /// Returns an error if a rib cannot be built, a loft fails or a layer
    /// does not close into a watertight solid.
    pub fn generate_components(
        &mut self,
        flux: &dyn FluxSurface,
        store: &mut TopologyStore,
    ) -> Result<&[Component]> {
        info!(
            ribs = self.num_ribs,
            rib_points = self.num_rib_pts,
            components = self.grid.components().len(),
            "generating in-vessel components"
        );
        self.populate_ribs(flux)?;
        let periodic = self.full_turn();
        let layer_count = self.ribs.first().map_or(0, |rib| rib.layers.len());

        let mut components: Vec<Component> = Vec::with_capacity(layer_count);
        let mut inner_surface: Option<LoftedSurface> = None;
        let mut winding: Option<LoftWinding> = None;

        for layer in 0..layer_count {
            let (name, mat_tag) = self.layer_identity(layer);
            if layer > 0 && self.layer_is_empty(layer) {
                warn!(component = %name, "layer has zero thickness everywhere; skipped");
                continue;
            }

            let profiles: Vec<Vec<Point3>> =
                self.ribs.iter().map(|rib| rib.layers[layer].points.clone()).collect();
            let mut loft = Loft::new(profiles).periodic(periodic);
            if let Some(w) = winding {
                loft = loft.with_winding(w);
            }
            let outer = loft.execute(store)?;
            winding = Some(outer.winding);

            let solid = match &inner_surface {
                None => closed_solid(store, &outer, periodic)?,
                Some(previous) => {
                    let inner = if self.skip_imprint {
                        previous.clone()
                    } else {
                        self.relofted(store, previous, layer, periodic)?
                    };
                    shell_solid(store, &outer, &inner, periodic)?
                }
            };
            debug!(component = %name, "built layer solid");
            components.push(Component {
                name,
                mat_tag,
                solids: vec![solid],
                volume_ids: Vec::new(),
            });
            inner_surface = Some(outer);
        }

        self.components = components;
        self.repeat_segments(store)?;
        self.shared = self.find_shared_surfaces(store)?;
        info!(
            components = self.components.len(),
            segments = self.repeat + 1,
            shared = self.shared.len(),
            "in-vessel components generated"
        );
        Ok(&self.components)
    }

    fn layer_identity(&self, layer: usize) -> (String, String) {
        match layer {
            0 => (PLASMA.to_string(), self.plasma_mat_tag.clone()),
            1 => (SOL.to_string(), self.sol_mat_tag.clone()),
            k => {
                let component = &self.grid.components()[k - 2];
                (component.name.clone(), component.mat_tag.clone())
            }
        }
    }

    /// Whether a layer coincides with the one inside it on every rib.
    fn layer_is_empty(&self, layer: usize) -> bool {
        self.ribs.iter().all(|rib| {
            rib.layers[layer]
                .points
                .iter()
                .zip(&rib.layers[layer - 1].points)
                .all(|(a, b)| (a - b).norm() < TOLERANCE)
        })
    }

    /// Lofts a fresh copy of the previous layer's outer boundary.
    fn relofted(
        &self,
        store: &mut TopologyStore,
        previous: &LoftedSurface,
        layer: usize,
        periodic: bool,
    ) -> Result<LoftedSurface> {
        let below = (0..layer)
            .rev()
            .find(|&l| l == 0 || !self.layer_is_empty(l))
            .unwrap_or(0);
        let profiles: Vec<Vec<Point3>> =
            self.ribs.iter().map(|rib| rib.layers[below].points.clone()).collect();
        Loft::new(profiles)
            .periodic(periodic)
            .with_winding(previous.winding)
            .execute(store)
    }

    /// Copies the base segment `repeat` times, rotating each copy about z.
    fn repeat_segments(&mut self, store: &mut TopologyStore) -> Result<()> {
        let base: Vec<SolidId> = self.components.iter().map(|c| c.solids[0]).collect();
        let extent = self.grid.toroidal_extent();
        for k in 1..=self.repeat {
            let copies = CopySolids::new(base.clone()).execute(store)?;
            #[allow(clippy::cast_precision_loss)]
            let angle = k as f64 * extent;
            Rotate::about_z(copies.clone(), angle).execute(store)?;
            for (component, solid) in self.components.iter_mut().zip(copies) {
                component.solids.push(solid);
            }
            debug!(segment = k, angle_deg = angle.to_degrees(), "repeated segment");
        }
        Ok(())
    }

    fn find_shared_surfaces(&self, store: &TopologyStore) -> Result<Vec<SharedSurface>> {
        let mut shared = Vec::new();
        for pair in self.components.windows(2) {
            let (inner, outer) = (&pair[0], &pair[1]);
            for (segment, (&a, &b)) in inner.solids.iter().zip(&outer.solids).enumerate() {
                let inner_faces: HashSet<FaceId> =
                    store.solid_faces(a)?.iter().map(|of| of.face).collect();
                let faces: Vec<FaceId> = store
                    .solid_faces(b)?
                    .iter()
                    .map(|of| of.face)
                    .filter(|f| inner_faces.contains(f))
                    .collect();
                if !faces.is_empty() {
                    shared.push(SharedSurface {
                        inner: inner.name.clone(),
                        outer: outer.name.clone(),
                        segment,
                        faces,
                    });
                }
            }
        }
        Ok(shared)
    }

    /// Hands every solid to the sink and records the volume ids it assigns.
    ///
    /// # Errors
    ///
    /// Returns [`OperationError::Failed`] if called before the components
    /// are generated, or any error the sink reports.
    pub fn import(&mut self, sink: &mut dyn ExportSink, store: &TopologyStore) -> Result<()> {
        if self.components.is_empty() {
            return Err(OperationError::Failed("in-vessel components not generated".into()).into());
        }
        for component in &mut self.components {
            component.volume_ids.clear();
            for &solid in &component.solids {
                let ids = sink.import_solid(&component.name, store, solid)?;
                component.volume_ids.extend(ids);
            }
            debug!(component = %component.name, volumes = component.volume_ids.len(), "imported");
        }
        Ok(())
    }

    /// `(mat_tag, volume ids)` per component, for material tagging.
    #[must_use]
    pub fn material_entries(&self) -> Vec<(&str, &[VolumeId])> {
        self.components
            .iter()
            .map(|c| (c.mat_tag.as_str(), c.volume_ids.as_slice()))
            .collect()
    }
}

/// The region enclosed by one lofted surface.
fn closed_solid(
    store: &mut TopologyStore,
    surface: &LoftedSurface,
    periodic: bool,
) -> Result<SolidId> {
    let mut faces = surface.oriented_faces(true);
    if !periodic {
        let start = polygon_cap(store, &surface.start_loop())?;
        let end = polygon_cap(store, &surface.end_loop())?;
        faces.push(OrientedFace::new(start, true));
        faces.push(OrientedFace::new(end, true));
    }
    MakeSolid::new(faces).execute(store)
}

/// The region between two nested lofted surfaces.
fn shell_solid(
    store: &mut TopologyStore,
    outer: &LoftedSurface,
    inner: &LoftedSurface,
    periodic: bool,
) -> Result<SolidId> {
    let mut faces = outer.oriented_faces(true);
    faces.extend(inner.oriented_faces(false));
    if !periodic {
        let caps = [
            ring_cap(store, &outer.start_loop(), &inner.start_loop())?,
            ring_cap(store, &outer.end_loop(), &inner.end_loop())?,
        ];
        faces.extend(caps.iter().flatten().map(|&f| OrientedFace::new(f, true)));
    }
    MakeSolid::new(faces).execute(store)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::f64::consts::PI;

    use approx::assert_relative_eq;

    use super::*;
    use crate::config::{ComponentConfig, RadialBuild};
    use crate::export::FacetSink;
    use crate::flux::AnalyticTorus;
    use crate::operations::query::{BoundingBox, IsValid, Volume};

    fn config(toroidal: &[f64], components: &[(&str, f64)]) -> InVesselBuildConfig {
        let rows = toroidal.len();
        let radial_build = components.iter().fold(RadialBuild::new(), |build, &(name, t)| {
            build.with(
                name,
                ComponentConfig {
                    thickness_matrix: vec![vec![t; 4]; rows],
                    mat_tag: None,
                },
            )
        });
        InVesselBuildConfig {
            toroidal_angles: toroidal.to_vec(),
            poloidal_angles: vec![0.0, 120.0, 240.0, 360.0],
            radial_build,
            wall_s: 1.21,
            repeat: 0,
            num_ribs: 13,
            num_rib_pts: 48,
            scale: 100.0,
            export_cad_to_dagmc: false,
            plasma_mat_tag: None,
            sol_mat_tag: Some("vacuum".into()),
            dagmc_filename: "dagmc".into(),
            export_dir: String::new(),
        }
    }

    fn torus() -> AnalyticTorus {
        AnalyticTorus::new(10.0, 2.0)
    }

    #[test]
    fn every_layer_is_watertight() {
        let mut store = TopologyStore::new();
        let cfg = config(&[0.0, 90.0], &[("fw", 5.0), ("shield", 30.0)]);
        let mut build = InVesselBuild::new(&cfg).unwrap();
        build.generate_components(&torus(), &mut store).unwrap();
        let names: Vec<&str> = build.components().iter().map(|c| c.name.as_str()).collect();
        assert_eq!(names, ["plasma", "sol", "fw", "shield"]);
        assert_eq!(build.component("sol").unwrap().mat_tag, "vacuum");
        for component in build.components() {
            assert!(IsValid::new(component.solids[0]).execute(&store), "{}", component.name);
        }
    }

    #[test]
    fn uniform_layer_volume_matches_torus_shell() {
        let mut store = TopologyStore::new();
        let mut build = InVesselBuild::new(&config(&[0.0, 90.0], &[("fw", 10.0)])).unwrap();
        build.generate_components(&torus(), &mut store).unwrap();
        // Wall at a = 2 sqrt(1.21) = 2.2 m; shell 10 cm thick, quarter turn.
        let (a, b, r0) = (220.0_f64, 230.0_f64, 1000.0);
        let expected = PI * (b * b - a * a) * r0 * (PI / 2.0);
        let fw = build.component("fw").unwrap().solids[0];
        let volume = Volume::new(fw).execute(&store).unwrap();
        assert_relative_eq!(volume, expected, max_relative = 1e-2);

        let plasma = build.component("plasma").unwrap().solids[0];
        let plasma_volume = Volume::new(plasma).execute(&store).unwrap();
        let expected = PI * 200.0 * 200.0 * r0 * (PI / 2.0);
        assert_relative_eq!(plasma_volume, expected, max_relative = 1e-2);
    }

    #[test]
    fn repeats_are_rotated_copies() {
        let mut store = TopologyStore::new();
        let mut cfg = config(&[0.0, 60.0], &[("fw", 5.0)]);
        cfg.repeat = 2;
        let mut build = InVesselBuild::new(&cfg).unwrap();
        build.generate_components(&torus(), &mut store).unwrap();
        for component in build.components() {
            assert_eq!(component.solids.len(), 3);
            let base = store.solids_vertices(&component.solids[..1]).unwrap().len();
            for &copy in &component.solids[1..] {
                assert_eq!(store.solids_vertices(&[copy]).unwrap().len(), base);
                assert!(IsValid::new(copy).execute(&store));
            }
            let v0 = Volume::new(component.solids[0]).execute(&store).unwrap();
            let v2 = Volume::new(component.solids[2]).execute(&store).unwrap();
            assert_relative_eq!(v0, v2, max_relative = 1e-9);
        }
        // The third segment spans 120 to 180 degrees.
        let fw = build.component("fw").unwrap();
        let bbox = BoundingBox::new(vec![fw.solids[2]]).execute(&store).unwrap();
        assert!(bbox.max.x < 0.0);
        assert!(bbox.min.y > -1e-6);
    }

    #[test]
    fn skip_imprint_shares_faces_between_layers() {
        let mut store = TopologyStore::new();
        let mut build = InVesselBuild::new(&config(&[0.0, 90.0], &[("fw", 5.0)]))
            .unwrap()
            .skip_imprint(true);
        build.generate_components(&torus(), &mut store).unwrap();
        let shared = build.shared_surfaces();
        assert_eq!(shared.len(), 2);
        assert_eq!((shared[0].inner.as_str(), shared[0].outer.as_str()), ("plasma", "sol"));

        let sol = build.component("sol").unwrap().solids[0];
        let fw = build.component("fw").unwrap().solids[0];
        let in_sol = store.solid_faces(sol).unwrap().to_vec();
        let in_fw = store.solid_faces(fw).unwrap().to_vec();
        for &face in &shared[1].faces {
            let a = in_sol.iter().find(|of| of.face == face).unwrap();
            let b = in_fw.iter().find(|of| of.face == face).unwrap();
            assert_ne!(a.forward, b.forward);
        }
    }

    #[test]
    fn imprinting_keeps_layers_separate() {
        let mut store = TopologyStore::new();
        let mut build = InVesselBuild::new(&config(&[0.0, 90.0], &[("fw", 5.0)])).unwrap();
        build.generate_components(&torus(), &mut store).unwrap();
        assert!(build.shared_surfaces().is_empty());
    }

    #[test]
    fn full_turn_closes_without_caps() {
        let mut store = TopologyStore::new();
        let mut cfg = config(&[0.0, 120.0, 240.0, 360.0], &[("fw", 5.0)]);
        cfg.num_ribs = 25;
        cfg.num_rib_pts = 16;
        let mut build = InVesselBuild::new(&cfg).unwrap();
        build.generate_components(&torus(), &mut store).unwrap();
        assert_eq!(build.ribs().len(), 24);
        for component in build.components() {
            assert!(IsValid::new(component.solids[0]).execute(&store));
        }
    }

    #[test]
    fn zero_thickness_layer_is_skipped() {
        let mut store = TopologyStore::new();
        let mut cfg = config(&[0.0, 90.0], &[("gap", 0.0), ("fw", 5.0)]);
        cfg.wall_s = 1.0;
        let mut build = InVesselBuild::new(&cfg).unwrap();
        build.generate_components(&torus(), &mut store).unwrap();
        let names: Vec<&str> = build.components().iter().map(|c| c.name.as_str()).collect();
        assert_eq!(names, ["plasma", "fw"]);
        assert!(IsValid::new(build.component("fw").unwrap().solids[0]).execute(&store));
    }

    #[test]
    fn import_records_volume_ids() {
        let mut store = TopologyStore::new();
        let mut cfg = config(&[0.0, 90.0], &[("fw", 5.0)]);
        cfg.repeat = 1;
        let mut build = InVesselBuild::new(&cfg).unwrap();
        let mut sink = FacetSink::new();
        assert!(build.import(&mut sink, &store).is_err());
        build.generate_components(&torus(), &mut store).unwrap();
        build.import(&mut sink, &store).unwrap();
        let entries = build.material_entries();
        assert_eq!(entries.len(), 3);
        assert_eq!(entries[0].0, "plasma");
        assert_eq!(entries[2].1, &[VolumeId(5), VolumeId(6)]);
    }
}
