//! Run configuration, read from JSON.
//!
//! Angles are degrees here and converted to radians when the geometry
//! builders are set up. Every section is checked by `validate` before any
//! geometry is produced.

use std::fmt;
use std::path::{Path, PathBuf};

use serde::de::{MapAccess, Visitor};
use serde::ser::SerializeMap;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::error::{ConfigError, Result};
use crate::export::FacetingMode;
use crate::invessel::rib::{PLASMA, SOL};
use crate::invessel::{GridComponent, RadialBuildGrid, ThicknessMatrix};
use crate::magnets::CrossSection;
use crate::math::units::M2CM;

fn default_scale() -> f64 {
    M2CM
}
fn default_num_ribs() -> usize {
    61
}
fn default_num_rib_pts() -> usize {
    61
}
fn default_dagmc_filename() -> String {
    "dagmc".into()
}
fn default_sample_mod() -> usize {
    1
}
fn default_step_filename() -> String {
    "magnets".into()
}
fn default_magnet_mat_tag() -> String {
    "magnets".into()
}
fn default_mesh_filename() -> String {
    "magnet_mesh".into()
}
fn default_source_filename() -> String {
    "source_mesh".into()
}
fn default_source_wall_s() -> f64 {
    1.0
}
fn default_legacy_faceting() -> bool {
    true
}
fn default_anisotropic_ratio() -> f64 {
    100.0
}
fn default_deviation_angle() -> f64 {
    5.0
}

/// Top-level configuration of one stellarator build.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StellaratorConfig {
    /// Plasma equilibrium file, netCDF.
    pub vmec_file: PathBuf,
    /// Layered in-vessel components.
    #[serde(default)]
    pub invessel_build: Option<InVesselBuildConfig>,
    /// Magnet coils.
    #[serde(default)]
    pub magnet_coils: Option<MagnetConfig>,
    /// Neutron source mesh.
    #[serde(default)]
    pub source_mesh: Option<SourceMeshConfig>,
    /// Neutronics model export.
    #[serde(default)]
    pub dagmc_export: DagmcExportConfig,
}

impl StellaratorConfig {
    /// Reads and validates a configuration file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read, is not valid JSON for
    /// this schema, or fails validation.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let text = std::fs::read_to_string(path)?;
        Self::from_json_str(&text)
    }

    /// Parses and validates a configuration document.
    ///
    /// # Errors
    ///
    /// Returns an error if the document does not match the schema or fails
    /// validation.
    pub fn from_json_str(text: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    /// Checks every present section.
    ///
    /// # Errors
    ///
    /// Returns a [`ConfigError`] describing the first problem found.
    pub fn validate(&self) -> Result<()> {
        let extension = self
            .vmec_file
            .extension()
            .and_then(|e| e.to_str())
            .unwrap_or_default();
        if extension != "nc" {
            return Err(ConfigError::BadExtension {
                path: self.vmec_file.display().to_string(),
                extension: extension.to_string(),
            }
            .into());
        }
        if let Some(invessel) = &self.invessel_build {
            invessel.validate()?;
        }
        if let Some(magnets) = &self.magnet_coils {
            magnets.validate()?;
        }
        if let Some(source) = &self.source_mesh {
            source.validate()?;
        }
        self.dagmc_export.validate()
    }
}

/// Thickness data of one configured component.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ComponentConfig {
    /// Thickness in centimetres, `[toroidal][poloidal]`.
    pub thickness_matrix: Vec<Vec<f64>>,
    /// Material tag; the component name when absent.
    #[serde(default)]
    pub mat_tag: Option<String>,
}

/// Components from the plasma outward, in document order.
///
/// Read from a JSON object whose key order is the build order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RadialBuild {
    entries: Vec<(String, ComponentConfig)>,
}

impl RadialBuild {
    /// Creates an empty build.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a component outside the existing ones.
    #[must_use]
    pub fn with(mut self, name: impl Into<String>, component: ComponentConfig) -> Self {
        self.entries.push((name.into(), component));
        self
    }

    /// Iterates components from the plasma outward.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &ComponentConfig)> {
        self.entries.iter().map(|(n, c)| (n.as_str(), c))
    }

    /// Number of components.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether no components are configured.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl Serialize for RadialBuild {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.entries.len()))?;
        for (name, component) in &self.entries {
            map.serialize_entry(name, component)?;
        }
        map.end()
    }
}

impl<'de> Deserialize<'de> for RadialBuild {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        struct OrderedVisitor;

        impl<'de> Visitor<'de> for OrderedVisitor {
            type Value = RadialBuild;

            fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str("a map of component name to thickness data")
            }

            fn visit_map<A: MapAccess<'de>>(
                self,
                mut access: A,
            ) -> std::result::Result<RadialBuild, A::Error> {
                let mut entries = Vec::with_capacity(access.size_hint().unwrap_or(0));
                while let Some((name, component)) =
                    access.next_entry::<String, ComponentConfig>()?
                {
                    entries.push((name, component));
                }
                Ok(RadialBuild { entries })
            }
        }

        deserializer.deserialize_map(OrderedVisitor)
    }
}

/// In-vessel build section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InVesselBuildConfig {
    /// Toroidal grid angles in degrees, starting at 0.
    pub toroidal_angles: Vec<f64>,
    /// Poloidal grid angles in degrees.
    pub poloidal_angles: Vec<f64>,
    /// Components from the plasma outward.
    pub radial_build: RadialBuild,
    /// Flux label of the first wall, `>= 1`.
    pub wall_s: f64,
    /// Additional rotated copies of the segment.
    #[serde(default)]
    pub repeat: usize,
    /// Ribs per segment.
    #[serde(default = "default_num_ribs")]
    pub num_ribs: usize,
    /// Points per rib.
    #[serde(default = "default_num_rib_pts")]
    pub num_rib_pts: usize,
    /// Scale applied to flux-surface coordinates.
    #[serde(default = "default_scale")]
    pub scale: f64,
    /// Whether each component is exported on its own.
    #[serde(default)]
    pub export_cad_to_dagmc: bool,
    /// Plasma material tag.
    #[serde(default)]
    pub plasma_mat_tag: Option<String>,
    /// Scrape-off layer material tag.
    #[serde(default)]
    pub sol_mat_tag: Option<String>,
    /// Base name of the per-component neutronics file.
    #[serde(default = "default_dagmc_filename")]
    pub dagmc_filename: String,
    /// Output directory.
    #[serde(default)]
    pub export_dir: String,
}

impl InVesselBuildConfig {
    /// Checks ranges the grid itself does not know about.
    ///
    /// # Errors
    ///
    /// Returns a [`ConfigError`] if `wall_s < 1`, the repeated segments
    /// exceed a full turn, there are too few ribs or rib points (a segment
    /// closing the torus drops its last rib, so it needs four), the scale
    /// is not positive, or the grid is malformed.
    pub fn validate(&self) -> Result<()> {
        if !(self.wall_s >= 1.0 && self.wall_s.is_finite()) {
            return Err(invalid("wall_s", format!("must be >= 1, got {}", self.wall_s)));
        }
        if self.num_ribs < 2 {
            return Err(invalid("num_ribs", format!("need at least 2, got {}", self.num_ribs)));
        }
        if self.num_rib_pts < 3 {
            return Err(invalid(
                "num_rib_pts",
                format!("need at least 3, got {}", self.num_rib_pts),
            ));
        }
        check_scale(self.scale)?;
        let extent = self.toroidal_angles.last().copied().unwrap_or(0.0);
        if (extent - 360.0).abs() < 1e-9 && self.num_ribs < 4 {
            return Err(invalid(
                "num_ribs",
                format!("a full-turn segment needs at least 4, got {}", self.num_ribs),
            ));
        }
        #[allow(clippy::cast_precision_loss)]
        let covered = (self.repeat + 1) as f64 * extent;
        if covered > 360.0 + 1e-9 {
            return Err(invalid(
                "repeat",
                format!("{} segments of {extent} degrees exceed a full turn", self.repeat + 1),
            ));
        }
        if self.radial_build.iter().any(|(name, _)| name == PLASMA || name == SOL) {
            return Err(invalid("radial_build", format!("'{PLASMA}' and '{SOL}' are reserved")));
        }
        self.radial_build_grid().map(|_| ())
    }

    /// The thickness grid in radians, with material tags resolved.
    ///
    /// # Errors
    ///
    /// Returns a [`ConfigError`] if the angles or matrices are malformed.
    pub fn radial_build_grid(&self) -> Result<RadialBuildGrid> {
        let components = self
            .radial_build
            .iter()
            .map(|(name, component)| GridComponent {
                name: name.to_string(),
                thickness: ThicknessMatrix::new(component.thickness_matrix.clone()),
                mat_tag: component.mat_tag.clone().unwrap_or_else(|| name.to_string()),
            })
            .collect();
        RadialBuildGrid::new(
            self.toroidal_angles.iter().map(|a| a.to_radians()).collect(),
            self.poloidal_angles.iter().map(|a| a.to_radians()).collect(),
            components,
        )
    }

    /// Plasma material tag, `plasma` by default.
    #[must_use]
    pub fn plasma_mat_tag(&self) -> &str {
        self.plasma_mat_tag.as_deref().unwrap_or(PLASMA)
    }

    /// Scrape-off layer material tag, `sol` by default.
    #[must_use]
    pub fn sol_mat_tag(&self) -> &str {
        self.sol_mat_tag.as_deref().unwrap_or(SOL)
    }
}

/// Magnet coil section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MagnetConfig {
    /// Filament coordinate file.
    pub coils_file_path: PathBuf,
    /// First line of coordinate data, zero-based.
    pub start_line: usize,
    /// `["circle", radius]` or `["rectangle", width, thickness]`, centimetres.
    pub cross_section: Vec<serde_json::Value>,
    /// Toroidal extent of kept coils in degrees.
    pub toroidal_extent: f64,
    /// Keep every n-th filament point.
    #[serde(default = "default_sample_mod")]
    pub sample_mod: usize,
    /// Scale applied to filament coordinates.
    #[serde(default = "default_scale")]
    pub scale: f64,
    /// Base name of the coil CAD file.
    #[serde(default = "default_step_filename")]
    pub step_filename: String,
    /// Material tag of every coil.
    #[serde(default = "default_magnet_mat_tag")]
    pub mat_tag: String,
    /// Whether a volume mesh of the coils is requested.
    #[serde(default)]
    pub export_mesh: bool,
    /// Base name of the coil mesh file.
    #[serde(default = "default_mesh_filename")]
    pub mesh_filename: String,
    /// Output directory.
    #[serde(default)]
    pub export_dir: String,
}

impl MagnetConfig {
    /// The parsed cross-section.
    ///
    /// # Errors
    ///
    /// Returns a [`ConfigError`] for an unknown shape, wrong arity or a
    /// non-positive dimension.
    pub fn cross_section(&self) -> Result<CrossSection> {
        CrossSection::from_values(&self.cross_section)
    }

    /// Checks the magnet section.
    ///
    /// # Errors
    ///
    /// Returns a [`ConfigError`] describing the first problem found.
    pub fn validate(&self) -> Result<()> {
        self.cross_section()?;
        if self.sample_mod == 0 {
            return Err(invalid("sample_mod", "must be at least 1".into()));
        }
        check_extent("toroidal_extent", self.toroidal_extent)?;
        check_scale(self.scale)
    }
}

/// Source mesh section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SourceMeshConfig {
    /// Flux-label samples, axis included.
    pub num_s: usize,
    /// Poloidal samples, wrap point included.
    pub num_theta: usize,
    /// Toroidal samples, both ends included.
    pub num_phi: usize,
    /// Toroidal extent in degrees.
    pub toroidal_extent: f64,
    /// Outermost flux label of the mesh.
    #[serde(default = "default_source_wall_s")]
    pub wall_s: f64,
    /// Scale applied to flux-surface coordinates.
    #[serde(default = "default_scale")]
    pub scale: f64,
    /// Base name of the mesh file.
    #[serde(default = "default_source_filename")]
    pub filename: String,
    /// Output directory.
    #[serde(default)]
    pub export_dir: String,
}

impl SourceMeshConfig {
    /// Checks the source mesh section.
    ///
    /// # Errors
    ///
    /// Returns a [`ConfigError`] if a sample count is too small, the extent
    /// is outside `(0, 360]`, or `wall_s` or the scale is not positive.
    pub fn validate(&self) -> Result<()> {
        if self.num_s < 2 {
            return Err(invalid("num_s", format!("need at least 2, got {}", self.num_s)));
        }
        if self.num_theta < 3 {
            return Err(invalid("num_theta", format!("need at least 3, got {}", self.num_theta)));
        }
        if self.num_phi < 2 {
            return Err(invalid("num_phi", format!("need at least 2, got {}", self.num_phi)));
        }
        if !(self.wall_s > 0.0 && self.wall_s.is_finite()) {
            return Err(invalid("wall_s", format!("must be positive, got {}", self.wall_s)));
        }
        check_extent("toroidal_extent", self.toroidal_extent)?;
        check_scale(self.scale)
    }
}

/// Neutronics export section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DagmcExportConfig {
    /// Merge only the surfaces the build shares instead of imprinting all.
    #[serde(default)]
    pub skip_imprint: bool,
    /// Use legacy faceting with `mat:<tag>` groups.
    #[serde(default = "default_legacy_faceting")]
    pub legacy_faceting: bool,
    /// Maximum facet deviation from the surface.
    #[serde(default)]
    pub faceting_tolerance: Option<f64>,
    /// Maximum facet edge length.
    #[serde(default)]
    pub length_tolerance: Option<f64>,
    /// Maximum normal deviation between adjacent facets, degrees.
    #[serde(default)]
    pub normal_tolerance: Option<f64>,
    /// Maximum facet aspect ratio (native faceting).
    #[serde(default = "default_anisotropic_ratio")]
    pub anisotropic_ratio: f64,
    /// Maximum surface deviation angle, degrees (native faceting).
    #[serde(default = "default_deviation_angle")]
    pub deviation_angle: f64,
    /// Base name of the output file.
    #[serde(default = "default_dagmc_filename")]
    pub filename: String,
    /// Output directory.
    #[serde(default)]
    pub export_dir: String,
}

impl Default for DagmcExportConfig {
    fn default() -> Self {
        Self {
            skip_imprint: false,
            legacy_faceting: default_legacy_faceting(),
            faceting_tolerance: None,
            length_tolerance: None,
            normal_tolerance: None,
            anisotropic_ratio: default_anisotropic_ratio(),
            deviation_angle: default_deviation_angle(),
            filename: default_dagmc_filename(),
            export_dir: String::new(),
        }
    }
}

impl DagmcExportConfig {
    /// Faceting mode selected by `legacy_faceting`.
    #[must_use]
    pub fn faceting(&self) -> FacetingMode {
        if self.legacy_faceting {
            FacetingMode::Legacy
        } else {
            FacetingMode::Native
        }
    }

    /// Checks that every tolerance given is positive.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::InvalidValue`] for a non-positive tolerance.
    pub fn validate(&self) -> Result<()> {
        let checks = [
            ("faceting_tolerance", self.faceting_tolerance),
            ("length_tolerance", self.length_tolerance),
            ("normal_tolerance", self.normal_tolerance),
            ("anisotropic_ratio", Some(self.anisotropic_ratio)),
            ("deviation_angle", Some(self.deviation_angle)),
        ];
        for (key, value) in checks {
            if let Some(v) = value {
                if !(v > 0.0 && v.is_finite()) {
                    return Err(invalid(key, format!("must be positive, got {v}")));
                }
            }
        }
        Ok(())
    }
}

fn invalid(key: &'static str, reason: String) -> crate::error::StellforgeError {
    ConfigError::InvalidValue { key, reason }.into()
}

fn check_scale(scale: f64) -> Result<()> {
    if scale > 0.0 && scale.is_finite() {
        Ok(())
    } else {
        Err(invalid("scale", format!("must be positive, got {scale}")))
    }
}

fn check_extent(key: &'static str, degrees: f64) -> Result<()> {
    if degrees > 0.0 && degrees <= 360.0 {
        Ok(())
    } else {
        Err(invalid(key, format!("must be in (0, 360], got {degrees}")))
    }
}
