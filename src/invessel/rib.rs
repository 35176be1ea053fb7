use tracing::debug;

use crate::error::{GeometryError, Result};
use crate::flux::FluxSurface;
use crate::math::polygon::{polygon_self_intersects, signed_area_2d, to_rz};
use crate::math::units::scale_point;
use crate::math::{Point2, Point3, Vector3, TOLERANCE};

use super::radial_build::RadialBuildGrid;

/// Poloidal step used to difference the wall surface for normals.
const NORMAL_STEP: f64 = 1e-4;

/// Name of the innermost pseudo-layer.
pub const PLASMA: &str = "plasma";

/// Name of the scrape-off pseudo-layer between the plasma and the wall.
pub const SOL: &str = "sol";

/// One layer boundary on a rib.
#[derive(Debug, Clone)]
pub struct RibLayer {
    /// Name of the layer this boundary encloses.
    pub name: String,
    /// Closed ring of boundary points, one per poloidal sample.
    pub points: Vec<Point3>,
}

/// Cross-section of the layered build at one toroidal angle.
#[derive(Debug, Clone)]
pub struct Rib {
    /// Toroidal angle in radians.
    pub phi: f64,
    /// Poloidal angle of each ring point, in ring order.
    pub thetas: Vec<f64>,
    /// Boundaries from the plasma outward: plasma, sol, then each component.
    pub layers: Vec<RibLayer>,
}

impl Rib {
    /// Number of points on every ring.
    #[must_use]
    pub fn num_points(&self) -> usize {
        self.thetas.len()
    }
}

/// Builds ribs by walking outward from the wall flux surface.
pub struct RibBuilder<'a> {
    flux: &'a dyn FluxSurface,
    grid: &'a RadialBuildGrid,
    wall_s: f64,
    scale: f64,
    thetas: Vec<f64>,
    /// `+1` if rings run counter-clockwise in (R, Z) with increasing theta.
    direction: f64,
}

impl<'a> RibBuilder<'a> {
    /// Prepares a builder sampling `num_rib_pts` poloidal angles.
    ///
    /// The sampling direction is fixed here, from the wall surface at the
    /// first toroidal angle, so that every rib lists its points in the
    /// same counter-clockwise (R, Z) order.
    ///
    /// # Errors
    ///
    /// Returns an error if the flux surface cannot be queried or the wall
    /// cross-section has no area.
    pub fn new(
        flux: &'a dyn FluxSurface,
        grid: &'a RadialBuildGrid,
        wall_s: f64,
        scale: f64,
        num_rib_pts: usize,
    ) -> Result<Self> {
        let mut thetas = grid.rib_point_angles(num_rib_pts);
        let phi0 = grid.toroidal_angles()[0];
        let ring: Vec<Point2> = thetas
            .iter()
            .map(|&theta| flux.position(wall_s, theta, phi0).map(|p| to_rz(&p, phi0)))
            .collect::<Result<_>>()?;
        let area = signed_area_2d(&ring);
        if area.abs() < TOLERANCE {
            return Err(GeometryError::Degenerate(
                "wall flux surface has zero cross-sectional area".into(),
            )
            .into());
        }
        let direction = area.signum();
        if direction < 0.0 {
            thetas.reverse();
        }
        Ok(Self {
            flux,
            grid,
            wall_s,
            scale,
            thetas,
            direction,
        })
    }

    /// Poloidal angles in ring order.
    #[must_use]
    pub fn thetas(&self) -> &[f64] {
        &self.thetas
    }

    /// Builds the rib at toroidal angle `phi`.
    ///
    /// # Errors
    ///
    /// Returns an error if a flux query fails, a wall normal vanishes, or
    /// a layer boundary crosses itself in the rib plane.
    pub fn build_rib(&self, phi: f64) -> Result<Rib> {
        let plane_normal = Vector3::new(-phi.sin(), phi.cos(), 0.0);

        let plasma = self.surface_ring(1.0, phi)?;
        let mut wall = Vec::with_capacity(self.thetas.len());
        let mut normals = Vec::with_capacity(self.thetas.len());
        for &theta in &self.thetas {
            let point = self.scaled(self.wall_s, theta, phi)?;
            let ahead = self.scaled(self.wall_s, theta + self.direction * NORMAL_STEP, phi)?;
            let normal = plane_normal
                .cross(&(ahead - point))
                .try_normalize(TOLERANCE)
                .ok_or_else(|| {
                    GeometryError::Degenerate(format!(
                        "wall normal vanishes at theta {theta}, phi {phi}"
                    ))
                })?;
            wall.push(point);
            normals.push(normal);
        }

        let mut layers = Vec::with_capacity(self.grid.components().len() + 2);
        layers.push(RibLayer {
            name: PLASMA.into(),
            points: plasma,
        });
        layers.push(RibLayer {
            name: SOL.into(),
            points: wall.clone(),
        });

        let mut offsets = vec![0.0; self.thetas.len()];
        for component in self.grid.iter() {
            let points = wall
                .iter()
                .zip(&normals)
                .zip(&self.thetas)
                .zip(offsets.iter_mut())
                .map(|(((p, n), &theta), offset)| {
                    *offset += component.thickness_at(phi, theta);
                    p + n * *offset
                })
                .collect();
            layers.push(RibLayer {
                name: component.name().to_string(),
                points,
            });
        }

        for layer in &layers[1..] {
            let ring: Vec<Point2> = layer.points.iter().map(|p| to_rz(p, phi)).collect();
            if polygon_self_intersects(&ring) {
                return Err(GeometryError::SelfIntersection {
                    component: layer.name.clone(),
                    phi,
                }
                .into());
            }
        }

        debug!(phi_deg = phi.to_degrees(), layers = layers.len(), "built rib");
        Ok(Rib {
            phi,
            thetas: self.thetas.clone(),
            layers,
        })
    }

    fn surface_ring(&self, s: f64, phi: f64) -> Result<Vec<Point3>> {
        self.thetas
            .iter()
            .map(|&theta| self.scaled(s, theta, phi))
            .collect()
    }

    fn scaled(&self, s: f64, theta: f64, phi: f64) -> Result<Point3> {
        Ok(scale_point(&self.flux.position(s, theta, phi)?, self.scale))
    }
}
