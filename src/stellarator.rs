//! Whole-device build: in-vessel components, magnet coils, source mesh and
//! the neutronics export, run in that order against one topology store.

use tracing::info;

use crate::config::StellaratorConfig;
use crate::error::{ConfigError, OperationError, Result};
use crate::export::{tag_materials, ExportSink, MaterialAssignment, SurfaceMerge, VolumeId};
use crate::flux::FluxSurface;
use crate::invessel::InVesselBuild;
use crate::magnets::MagnetSet;
use crate::math::Point3;
use crate::source_mesh::SourceMesh;
use crate::topology::TopologyStore;

/// Owns the geometry of one stellarator model.
pub struct Stellarator<'a> {
    flux: &'a dyn FluxSurface,
    config: StellaratorConfig,
    store: TopologyStore,
    invessel_build: Option<InVesselBuild>,
    magnet_set: Option<MagnetSet>,
    source_mesh: Option<SourceMesh>,
}

impl<'a> Stellarator<'a> {
    /// Validates `config` and prepares an empty model.
    ///
    /// # Errors
    ///
    /// Returns a [`ConfigError`] if any section is invalid.
    pub fn new(flux: &'a dyn FluxSurface, config: StellaratorConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            flux,
            config,
            store: TopologyStore::new(),
            invessel_build: None,
            magnet_set: None,
            source_mesh: None,
        })
    }

    /// The configuration in use.
    #[must_use]
    pub fn config(&self) -> &StellaratorConfig {
        &self.config
    }

    /// The store holding every solid built so far.
    #[must_use]
    pub fn store(&self) -> &TopologyStore {
        &self.store
    }

    /// The in-vessel build, once constructed.
    #[must_use]
    pub fn invessel_build(&self) -> Option<&InVesselBuild> {
        self.invessel_build.as_ref()
    }

    /// The magnet set, once constructed.
    #[must_use]
    pub fn magnet_set(&self) -> Option<&MagnetSet> {
        self.magnet_set.as_ref()
    }

    /// The source mesh, once constructed.
    #[must_use]
    pub fn source_mesh(&self) -> Option<&SourceMesh> {
        self.source_mesh.as_ref()
    }

    /// Builds the plasma, scrape-off layer and in-vessel components.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::MissingKey`] without an `invessel_build`
    /// section, or any construction error.
    pub fn construct_invessel_build(&mut self) -> Result<()> {
        let config = self
            .config
            .invessel_build
            .as_ref()
            .ok_or(ConfigError::MissingKey("invessel_build"))?;
        let mut build =
            InVesselBuild::new(config)?.skip_imprint(self.config.dagmc_export.skip_imprint);
        build.generate_components(self.flux, &mut self.store)?;
        self.invessel_build = Some(build);
        Ok(())
    }

    /// Imports the in-vessel solids into the sink.
    ///
    /// With `export_cad_to_dagmc` set, the in-vessel components are also
    /// written as a neutronics model of their own.
    ///
    /// # Errors
    ///
    /// Returns [`OperationError::Failed`] if the build was not constructed,
    /// or any sink error.
    pub fn export_invessel_build(&mut self, sink: &mut dyn ExportSink) -> Result<()> {
        let build = self
            .invessel_build
            .as_mut()
            .ok_or_else(|| OperationError::Failed("in-vessel build not constructed".into()))?;
        build.import(sink, &self.store)?;
        let own_export = self.config.invessel_build.as_ref().filter(|c| c.export_cad_to_dagmc);
        if let Some(config) = own_export {
            let materials =
                tag_materials(&build.material_entries(), self.config.dagmc_export.faceting())?;
            let mut settings = self.config.dagmc_export.clone();
            settings.filename.clone_from(&config.dagmc_filename);
            settings.export_dir.clone_from(&config.export_dir);
            sink.export_dagmc(&materials, &settings)?;
        }
        Ok(())
    }

    /// Reads the coil file and sweeps the coils.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::MissingKey`] without a `magnet_coils`
    /// section, or any read or construction error.
    pub fn construct_magnets(&mut self) -> Result<()> {
        let mut magnets = self.new_magnet_set()?;
        magnets.load_filaments()?;
        self.finish_magnets(magnets)
    }

    /// Sweeps coils along filaments given directly, in coil-file units.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::MissingKey`] without a `magnet_coils`
    /// section, or any construction error.
    pub fn construct_magnets_from_filaments(&mut self, filaments: Vec<Vec<Point3>>) -> Result<()> {
        let magnets = self.new_magnet_set()?.with_filaments(filaments);
        self.finish_magnets(magnets)
    }

    fn new_magnet_set(&self) -> Result<MagnetSet> {
        let config = self
            .config
            .magnet_coils
            .as_ref()
            .ok_or(ConfigError::MissingKey("magnet_coils"))?;
        MagnetSet::new(config)
    }

    fn finish_magnets(&mut self, mut magnets: MagnetSet) -> Result<()> {
        magnets.build_magnet_coils(&mut self.store)?;
        self.magnet_set = Some(magnets);
        Ok(())
    }

    /// Imports the coil solids into the sink, then hands them to its mesher
    /// when `export_mesh` is set.
    ///
    /// # Errors
    ///
    /// Returns [`OperationError::Failed`] if the magnets were not
    /// constructed, or any sink error.
    pub fn export_magnets(&mut self, sink: &mut dyn ExportSink) -> Result<()> {
        let magnets = self
            .magnet_set
            .as_mut()
            .ok_or_else(|| OperationError::Failed("magnets not constructed".into()))?;
        magnets.import(sink, &self.store)?;
        if magnets.mesh_requested() {
            magnets.export_mesh(sink, &self.store)?;
        }
        Ok(())
    }

    /// Samples and connects the source mesh.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::MissingKey`] without a `source_mesh` section,
    /// or any flux query error.
    pub fn construct_source_mesh(&mut self) -> Result<()> {
        let config = self
            .config
            .source_mesh
            .as_ref()
            .ok_or(ConfigError::MissingKey("source_mesh"))?;
        let mut mesh = SourceMesh::new(config)?;
        mesh.create_vertices(self.flux)?;
        mesh.create_mesh()?;
        self.source_mesh = Some(mesh);
        Ok(())
    }

    /// Hands the source mesh to the sink.
    ///
    /// # Errors
    ///
    /// Returns [`OperationError::Failed`] if the mesh was not constructed,
    /// or any sink error.
    pub fn export_source_mesh(&self, sink: &mut dyn ExportSink) -> Result<()> {
        let mesh = self
            .source_mesh
            .as_ref()
            .ok_or_else(|| OperationError::Failed("source mesh not constructed".into()))?;
        sink.export_source_mesh(mesh)
    }

    /// Material grouping of every imported volume.
    ///
    /// # Errors
    ///
    /// Returns [`crate::error::ExportError::NotImported`] if a constructed
    /// component has no volume ids yet.
    pub fn material_assignment(&self) -> Result<MaterialAssignment> {
        let magnet_ids: Vec<VolumeId> =
            self.magnet_set.as_ref().map(MagnetSet::volume_ids).unwrap_or_default();
        let mut entries = self
            .invessel_build
            .as_ref()
            .map(InVesselBuild::material_entries)
            .unwrap_or_default();
        if let Some(magnets) = &self.magnet_set {
            entries.push((magnets.mat_tag(), magnet_ids.as_slice()));
        }
        tag_materials(&entries, self.config.dagmc_export.faceting())
    }

    /// Reconciles shared surfaces, tags materials and writes the
    /// neutronics model.
    ///
    /// # Errors
    ///
    /// Returns an error if a component was not imported or the sink fails.
    pub fn export_dagmc(&self, sink: &mut dyn ExportSink) -> Result<MaterialAssignment> {
        let settings = &self.config.dagmc_export;
        if settings.skip_imprint {
            let shared = self
                .invessel_build
                .as_ref()
                .map_or(&[][..], InVesselBuild::shared_surfaces);
            sink.merge_surfaces(SurfaceMerge::Shared(shared))?;
        } else {
            sink.merge_surfaces(SurfaceMerge::ImprintAll)?;
        }
        let materials = self.material_assignment()?;
        sink.export_dagmc(&materials, settings)?;
        info!(volumes = materials.num_volumes(), "neutronics export complete");
        Ok(materials)
    }

    /// Runs every configured stage and the neutronics export.
    ///
    /// # Errors
    ///
    /// Returns the first error of any stage.
    pub fn build(&mut self, sink: &mut dyn ExportSink) -> Result<MaterialAssignment> {
        if self.config.invessel_build.is_some() {
            info!("constructing in-vessel build");
            self.construct_invessel_build()?;
            self.export_invessel_build(sink)?;
        }
        if self.config.magnet_coils.is_some() {
            info!("constructing magnet coils");
            self.construct_magnets()?;
            self.export_magnets(sink)?;
        }
        if self.config.source_mesh.is_some() {
            info!("constructing source mesh");
            self.construct_source_mesh()?;
            self.export_source_mesh(sink)?;
        }
        self.export_dagmc(sink)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::f64::consts::{PI, TAU};
    use std::fmt::Write as _;

    use approx::assert_relative_eq;
    use serde_json::json;
    use tracing_subscriber::EnvFilter;

    use super::*;
    use crate::error::StellforgeError;
    use crate::export::FacetSink;
    use crate::flux::AnalyticTorus;
    use crate::invessel::PLASMA;
    use crate::math::polygon::polygon_area_3d;
    use crate::operations::query::{IsValid, Volume};

    fn init_tracing() {
        let _ = tracing_subscriber::fmt()
            .with_env_filter(EnvFilter::from_default_env())
            .with_test_writer()
            .try_init();
    }

    fn torus() -> AnalyticTorus {
        AnalyticTorus::new(10.0, 2.0)
    }

    fn config(value: serde_json::Value) -> StellaratorConfig {
        serde_json::from_value(value).unwrap()
    }

    #[test]
    fn uniform_wall_is_offset_five_centimetres() {
        init_tracing();
        let flux = torus();
        let mut model = Stellarator::new(
            &flux,
            config(json!({
                "vmec_file": "wout_torus.nc",
                "invessel_build": {
                    "toroidal_angles": [0.0, 180.0],
                    "poloidal_angles": [0.0, 120.0, 240.0, 360.0],
                    "wall_s": 1.0,
                    "num_ribs": 3,
                    "num_rib_pts": 4,
                    "radial_build": {
                        "wall": { "thickness_matrix": [[5.0, 5.0, 5.0, 5.0], [5.0, 5.0, 5.0, 5.0]] }
                    }
                }
            })),
        )
        .unwrap();
        model.construct_invessel_build().unwrap();
        let build = model.invessel_build().unwrap();
        assert_eq!(build.ribs().len(), 3);
        for rib in build.ribs() {
            assert_eq!(rib.layers.len(), 3);
            let wall = &rib.layers[2];
            assert_eq!(wall.name, "wall");
            for (point, &theta) in wall.points.iter().zip(&rib.thetas) {
                let surface = flux.position(1.0, theta, rib.phi).unwrap() * 100.0;
                assert_relative_eq!((point - surface).norm(), 5.0, epsilon = 1e-9);
            }
        }
        let wall = build.component("wall").unwrap();
        assert!(IsValid::new(wall.solids[0]).execute(model.store()));

        let mut sink = FacetSink::new();
        model.export_invessel_build(&mut sink).unwrap();
        let names: Vec<&str> = sink.volumes().iter().map(|v| v.name.as_str()).collect();
        assert_eq!(names, ["plasma", "wall"]);
        for volume in sink.volumes() {
            assert!(volume.mesh.num_triangles() > 0);
            assert!(Volume::new(volume.solid).execute(model.store()).unwrap() > 0.0);
        }
    }

    fn single_wall_model(flux: &AnalyticTorus, extent: f64, num_rib_pts: usize) -> Stellarator<'_> {
        Stellarator::new(
            flux,
            config(json!({
                "vmec_file": "wout_torus.nc",
                "invessel_build": {
                    "toroidal_angles": [0.0, extent],
                    "poloidal_angles": [0.0, 120.0, 240.0, 360.0],
                    "wall_s": 1.1,
                    "num_rib_pts": num_rib_pts,
                    "radial_build": {
                        "wall": { "thickness_matrix": [[5.0, 5.0, 5.0, 5.0], [5.0, 5.0, 5.0, 5.0]] }
                    }
                }
            })),
        )
        .unwrap()
    }

    #[test]
    fn quarter_and_half_turn_builds_facet_cleanly() {
        init_tracing();
        let flux = torus();
        for (extent, points) in [(90.0, 12), (90.0, 60), (180.0, 16)] {
            let mut model = single_wall_model(&flux, extent, points);
            let mut sink = FacetSink::new();
            model.build(&mut sink).unwrap();
            assert_eq!(sink.volumes().len(), 3, "extent {extent}, points {points}");
            for volume in sink.volumes() {
                let v = Volume::new(volume.solid).execute(model.store()).unwrap();
                assert!(v > 0.0, "{} at extent {extent}", volume.name);
            }
        }
    }

    #[test]
    fn quarter_turn_plasma_volume_follows_pappus() {
        let flux = torus();
        let mut model = single_wall_model(&flux, 90.0, 12);
        model.construct_invessel_build().unwrap();
        let plasma = model.invessel_build().unwrap().component(PLASMA).unwrap().solids[0];
        let volume = Volume::new(plasma).execute(model.store()).unwrap();
        // Regular 12-gon of circumradius 200 cm swept a quarter turn at R = 1000 cm.
        let expected = 3.0 * 200.0 * 200.0 * 1000.0 * (PI / 2.0);
        assert_relative_eq!(volume, expected, max_relative = 1e-2);
    }

    #[test]
    fn square_filament_sweeps_round_tube() {
        init_tracing();
        let flux = torus();
        let mut model = Stellarator::new(
            &flux,
            config(json!({
                "vmec_file": "wout_torus.nc",
                "magnet_coils": {
                    "coils_file_path": "unused",
                    "start_line": 0,
                    "cross_section": ["circle", 1.0],
                    "toroidal_extent": 360.0,
                    "scale": 1.0
                }
            })),
        )
        .unwrap();
        let square: Vec<Point3> = [
            (0.0, 0.0),
            (5.0, 0.0),
            (10.0, 0.0),
            (10.0, 5.0),
            (10.0, 10.0),
            (5.0, 10.0),
            (0.0, 10.0),
            (0.0, 5.0),
        ]
        .iter()
        .map(|&(x, y)| Point3::new(x - 5.0, y - 5.0, 0.0))
        .collect();
        model.construct_magnets_from_filaments(vec![square.clone()]).unwrap();
        let magnets = model.magnet_set().unwrap();
        let coil = &magnets.coils()[0];
        assert!(IsValid::new(coil.solid).execute(model.store()));
        assert_eq!(coil.centerline, square);
        assert_relative_eq!(magnets.cross_section().area(), PI);
        let section = magnets.cross_section().outline();
        for frame in &coil.frames {
            let ring: Vec<Point3> = section.iter().map(|&(u, v)| frame.place(u, v)).collect();
            assert_relative_eq!(polygon_area_3d(&ring), PI, max_relative = 1e-2);
        }
    }

    #[test]
    fn full_turn_source_mesh_wraps() {
        init_tracing();
        let flux = torus();
        let mut model = Stellarator::new(
            &flux,
            config(json!({
                "vmec_file": "wout_torus.nc",
                "source_mesh": {
                    "num_s": 3, "num_theta": 4, "num_phi": 2, "toroidal_extent": 360.0
                }
            })),
        )
        .unwrap();
        model.construct_source_mesh().unwrap();
        let mesh = model.source_mesh().unwrap();
        assert_eq!(mesh.vertices().len(), 24);
        for s in 0..3 {
            for theta in 0..4 {
                let a = mesh.vertex(s, theta, 0).unwrap().point;
                let b = mesh.vertex(s, theta, 1).unwrap().point;
                assert_relative_eq!((a - b).norm(), 0.0, epsilon = 1e-9);
            }
        }
    }

    #[test]
    fn missing_section_is_a_config_error() {
        let flux = torus();
        let mut model = Stellarator::new(&flux, config(json!({ "vmec_file": "wout.nc" }))).unwrap();
        assert!(matches!(
            model.construct_source_mesh().unwrap_err(),
            StellforgeError::Config(ConfigError::MissingKey("source_mesh"))
        ));
        let mut sink = FacetSink::new();
        assert!(model.export_magnets(&mut sink).is_err());
    }

    fn coil_file() -> String {
        let mut text = String::from("periods 5\nbegin filament\nmirror NIL\n");
        for deg in [15.0_f64, 45.0, 75.0, 135.0] {
            let phi = deg.to_radians();
            for i in 0..=16 {
                let t = f64::from(i) * TAU / 16.0;
                let r = 10.0 + 3.5 * t.cos();
                let current = if i == 16 { 0.0 } else { 1.2e6 };
                let (x, y, z) = (r * phi.cos(), r * phi.sin(), 3.5 * t.sin());
                writeln!(text, "{x} {y} {z} {current}").unwrap();
            }
        }
        text.push_str("end\n");
        text
    }

    #[test]
    fn full_pipeline_tags_every_volume() {
        init_tracing();
        let path =
            std::env::temp_dir().join(format!("stellforge_coils_{}.txt", std::process::id()));
        std::fs::write(&path, coil_file()).unwrap();

        let thickness = |t: f64| vec![vec![t; 4]; 2];
        let flux = torus();
        let mut model = Stellarator::new(
            &flux,
            config(json!({
                "vmec_file": "wout_torus.nc",
                "invessel_build": {
                    "toroidal_angles": [0.0, 90.0],
                    "poloidal_angles": [0.0, 120.0, 240.0, 360.0],
                    "wall_s": 1.08,
                    "num_ribs": 7,
                    "num_rib_pts": 16,
                    "plasma_mat_tag": "Vacuum",
                    "radial_build": {
                        "first_wall": { "thickness_matrix": thickness(5.0) },
                        "blanket": { "thickness_matrix": thickness(40.0), "mat_tag": "lipb" }
                    }
                },
                "magnet_coils": {
                    "coils_file_path": path,
                    "start_line": 3,
                    "cross_section": ["rectangle", 20.0, 30.0],
                    "toroidal_extent": 90.0,
                    "sample_mod": 2
                },
                "source_mesh": {
                    "num_s": 4, "num_theta": 9, "num_phi": 5, "toroidal_extent": 90.0
                },
                "dagmc_export": { "skip_imprint": true }
            })),
        )
        .unwrap();

        let mut sink = FacetSink::new();
        let materials = model.build(&mut sink).unwrap();
        std::fs::remove_file(&path).ok();

        let magnets = model.magnet_set().unwrap();
        assert_eq!(magnets.coils().len(), 3);
        assert_eq!(magnets.coils()[0].centerline.len(), 8);
        assert_eq!(magnets.volume_ids(), vec![VolumeId(5), VolumeId(6), VolumeId(7)]);

        let MaterialAssignment::Legacy(groups) = materials else {
            panic!("legacy faceting is the default");
        };
        let names: Vec<&str> = groups.iter().map(|g| g.name.as_str()).collect();
        assert_eq!(
            names,
            ["mat:Vacuum", "mat:sol", "mat:first_wall", "mat:lipb", "mat:magnets"]
        );
        assert_eq!(groups[4].volumes.len(), 3);

        assert_eq!(sink.volumes().len(), 7);
        assert!(sink.merged_faces() > 0);
        assert!(!sink.imprinted());
        assert_eq!(sink.source_mesh(), Some((4 * 9 * 5, 4 * 3 * 8)));
        assert_eq!(model.invessel_build().unwrap().components()[0].name, PLASMA);
    }

    #[test]
    fn native_faceting_numbers_blocks_by_first_volume() {
        let flux = torus();
        let mut model = Stellarator::new(
            &flux,
            config(json!({
                "vmec_file": "wout_torus.nc",
                "invessel_build": {
                    "toroidal_angles": [0.0, 45.0],
                    "poloidal_angles": [0.0, 180.0, 360.0],
                    "wall_s": 1.1,
                    "num_ribs": 4,
                    "num_rib_pts": 12,
                    "repeat": 1,
                    "export_cad_to_dagmc": true,
                    "dagmc_filename": "invessel",
                    "radial_build": {
                        "shield": { "thickness_matrix": [[10.0, 10.0, 10.0], [10.0, 10.0, 10.0]] }
                    }
                },
                "dagmc_export": { "legacy_faceting": false }
            })),
        )
        .unwrap();
        let mut sink = FacetSink::new();
        model.construct_invessel_build().unwrap();
        model.export_invessel_build(&mut sink).unwrap();
        assert_eq!(sink.settings().unwrap().filename, "invessel");

        let materials = model.export_dagmc(&mut sink).unwrap();
        let MaterialAssignment::Native(blocks) = materials else {
            panic!("native faceting requested");
        };
        let ids: Vec<u32> = blocks.iter().map(|b| b.block_id).collect();
        assert_eq!(ids, [1, 3, 5]);
        assert!(sink.imprinted());
        assert_eq!(sink.settings().unwrap().filename, "dagmc");
    }
}
