//! Structured source-sampling mesh over flux coordinates.
//!
//! Vertices form a dense `(s, theta, phi)` lattice. Elements are hexahedra
//! between neighbouring lattice cells, except next to the magnetic axis
//! where the collapsed `s = 0` ring turns them into wedges.

use std::f64::consts::TAU;

use tracing::{debug, info};

use crate::config::SourceMeshConfig;
use crate::error::{OperationError, Result};
use crate::flux::{FluxCoordinate, FluxSurface};
use crate::math::units::scale_point;
use crate::math::{linspace, Point3};

/// Angular slack for detecting a full toroidal turn.
const FULL_TURN_TOLERANCE: f64 = 1e-9;

/// One lattice vertex.
#[derive(Debug, Clone, Copy)]
pub struct SourceMeshVertex {
    /// `(s, theta, phi)` lattice index.
    pub index: (usize, usize, usize),
    /// Position, scaled.
    pub point: Point3,
    /// Flux coordinate the point was sampled at.
    pub coordinate: FluxCoordinate,
}

/// A volumetric element referencing canonical vertex indices.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MeshElement {
    /// Eight nodes: a quad at the lower toroidal plane, then the same quad above.
    Hex([usize; 8]),
    /// Six nodes: apex and two ring nodes at the lower plane, then above.
    Wedge([usize; 6]),
}

impl MeshElement {
    /// Node indices in element order.
    #[must_use]
    pub fn nodes(&self) -> &[usize] {
        match self {
            Self::Hex(nodes) => nodes.as_slice(),
            Self::Wedge(nodes) => nodes.as_slice(),
        }
    }
}

/// Lattice and connectivity of the source mesh.
#[derive(Debug, Clone)]
pub struct SourceMesh {
    num_s: usize,
    num_theta: usize,
    num_phi: usize,
    wall_s: f64,
    extent: f64,
    scale: f64,
    filename: String,
    vertices: Vec<SourceMeshVertex>,
    elements: Vec<MeshElement>,
}

impl SourceMesh {
    /// Validates the configuration and prepares an empty mesh.
    ///
    /// # Errors
    ///
    /// Returns a [`crate::error::ConfigError`] if the section is invalid.
    pub fn new(config: &SourceMeshConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            num_s: config.num_s,
            num_theta: config.num_theta,
            num_phi: config.num_phi,
            wall_s: config.wall_s,
            extent: config.toroidal_extent.to_radians(),
            scale: config.scale,
            filename: config.filename.clone(),
            vertices: Vec::new(),
            elements: Vec::new(),
        })
    }

    /// Output file base name.
    #[must_use]
    pub fn filename(&self) -> &str {
        &self.filename
    }

    /// Lattice dimensions `(num_s, num_theta, num_phi)`.
    #[must_use]
    pub fn dimensions(&self) -> (usize, usize, usize) {
        (self.num_s, self.num_theta, self.num_phi)
    }

    /// Whether the toroidal extent closes the torus.
    #[must_use]
    pub fn full_turn(&self) -> bool {
        (self.extent - TAU).abs() < FULL_TURN_TOLERANCE
    }

    /// Dense position of lattice index `(s, theta, phi)`.
    #[must_use]
    pub fn vertex_index(&self, s: usize, theta: usize, phi: usize) -> usize {
        phi * self.num_s * self.num_theta + s * self.num_theta + theta
    }

    /// Dense position of the vertex that stands in for `(s, theta, phi)`.
    ///
    /// The axis ring collapses onto `theta = 0`, the poloidal wrap index
    /// onto `theta = 0`, and on a full turn the last toroidal plane onto
    /// the first.
    #[must_use]
    pub fn canonical_index(&self, s: usize, theta: usize, phi: usize) -> usize {
        let theta = if s == 0 || theta == self.num_theta - 1 { 0 } else { theta };
        let phi = if self.full_turn() && phi == self.num_phi - 1 { 0 } else { phi };
        self.vertex_index(s, theta, phi)
    }

    /// All lattice vertices, dense.
    #[must_use]
    pub fn vertices(&self) -> &[SourceMeshVertex] {
        &self.vertices
    }

    /// The vertex at a lattice index, if generated.
    #[must_use]
    pub fn vertex(&self, s: usize, theta: usize, phi: usize) -> Option<&SourceMeshVertex> {
        if s >= self.num_s || theta >= self.num_theta || phi >= self.num_phi {
            return None;
        }
        self.vertices.get(self.vertex_index(s, theta, phi))
    }

    /// Elements, after [`SourceMesh::create_mesh`].
    #[must_use]
    pub fn elements(&self) -> &[MeshElement] {
        &self.elements
    }

    /// Samples the flux surface on the lattice.
    ///
    /// # Errors
    ///
    /// Returns an error if a flux query fails.
    pub fn create_vertices(&mut self, flux: &dyn FluxSurface) -> Result<&[SourceMeshVertex]> {
        let s_values = linspace(0.0, self.wall_s, self.num_s, true);
        let theta_values = linspace(0.0, TAU, self.num_theta, true);
        let phi_values = linspace(0.0, self.extent, self.num_phi, true);

        let mut vertices = Vec::with_capacity(self.num_s * self.num_theta * self.num_phi);
        for (k, &phi) in phi_values.iter().enumerate() {
            for (i, &s) in s_values.iter().enumerate() {
                for (j, &theta) in theta_values.iter().enumerate() {
                    let coordinate = FluxCoordinate::new(s, theta, phi).wrapped();
                    vertices.push(SourceMeshVertex {
                        index: (i, j, k),
                        point: scale_point(&flux.at(coordinate)?, self.scale),
                        coordinate,
                    });
                }
            }
        }
        debug!(vertices = vertices.len(), "source mesh vertices sampled");
        self.vertices = vertices;
        Ok(&self.vertices)
    }

    /// Connects the lattice into wedge and hexahedral elements.
    ///
    /// # Errors
    ///
    /// Returns [`OperationError::Failed`] if the vertices were not created.
    pub fn create_mesh(&mut self) -> Result<&[MeshElement]> {
        if self.vertices.is_empty() {
            return Err(OperationError::Failed("source mesh vertices not created".into()).into());
        }
        let mut elements =
            Vec::with_capacity((self.num_phi - 1) * (self.num_s - 1) * (self.num_theta - 1));
        for phi in 0..self.num_phi - 1 {
            for s in 0..self.num_s - 1 {
                for theta in 0..self.num_theta - 1 {
                    elements.push(self.element(s, theta, phi));
                }
            }
        }
        info!(
            vertices = self.vertices.len(),
            elements = elements.len(),
            "source mesh created"
        );
        self.elements = elements;
        Ok(&self.elements)
    }

    fn element(&self, s: usize, theta: usize, phi: usize) -> MeshElement {
        let c = |s, theta, phi| self.canonical_index(s, theta, phi);
        if s == 0 {
            MeshElement::Wedge([
                c(0, 0, phi),
                c(1, theta, phi),
                c(1, theta + 1, phi),
                c(0, 0, phi + 1),
                c(1, theta, phi + 1),
                c(1, theta + 1, phi + 1),
            ])
        } else {
            MeshElement::Hex([
                c(s, theta, phi),
                c(s + 1, theta, phi),
                c(s + 1, theta + 1, phi),
                c(s, theta + 1, phi),
                c(s, theta, phi + 1),
                c(s + 1, theta, phi + 1),
                c(s + 1, theta + 1, phi + 1),
                c(s, theta + 1, phi + 1),
            ])
        }
    }

    /// Element volumes by tetrahedral decomposition, cubic centimetres.
    #[must_use]
    pub fn element_volumes(&self) -> Vec<f64> {
        self.elements
            .iter()
            .map(|element| {
                let p = |i: usize| self.vertices[element.nodes()[i]].point;
                let tets: &[[usize; 4]] = match element {
                    MeshElement::Hex(_) => &HEX_TETS,
                    MeshElement::Wedge(_) => &WEDGE_TETS,
                };
                tets.iter()
                    .map(|t| tet_volume(&p(t[0]), &p(t[1]), &p(t[2]), &p(t[3])))
                    .sum::<f64>()
                    .abs()
            })
            .collect()
    }

    /// D-T source strength per element: mean nodal reaction rate times volume.
    #[must_use]
    pub fn source_strengths(&self) -> Vec<f64> {
        self.elements
            .iter()
            .zip(self.element_volumes())
            .map(|(element, volume)| {
                let nodes = element.nodes();
                #[allow(clippy::cast_precision_loss)]
                let mean = nodes
                    .iter()
                    .map(|&n| reaction_rate(self.vertices[n].coordinate.s))
                    .sum::<f64>()
                    / nodes.len() as f64;
                mean * volume
            })
            .collect()
    }
}

const HEX_TETS: [[usize; 4]; 6] = [
    [0, 1, 2, 6],
    [0, 2, 3, 6],
    [0, 3, 7, 6],
    [0, 7, 4, 6],
    [0, 4, 5, 6],
    [0, 5, 1, 6],
];

const WEDGE_TETS: [[usize; 4]; 3] = [[0, 1, 2, 5], [0, 1, 5, 4], [0, 4, 5, 3]];

fn tet_volume(a: &Point3, b: &Point3, c: &Point3, d: &Point3) -> f64 {
    (b - a).dot(&(c - a).cross(&(d - a))) / 6.0
}

/// D-T fusion reaction rate density at flux label `s`, per m³ per second.
///
/// Uses parabolic-like ion density and temperature profiles peaking on
/// axis; zero at and beyond the plasma boundary.
#[must_use]
pub fn reaction_rate(s: f64) -> f64 {
    if s >= 1.0 {
        return 0.0;
    }
    // Ion density (m^-3) and temperature (keV).
    let ni = 4.8e20 * (1.0 - s.powi(5));
    let ti = 11.5 * (1.0 - s);
    3.68e-18 * ni * ni / 4.0 * ti.powf(-2.0 / 3.0) * (-19.94 * ti.powf(-1.0 / 3.0)).exp()
}
