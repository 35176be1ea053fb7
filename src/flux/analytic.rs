use crate::error::{GeometryError, Result};
use crate::math::Point3;

use super::FluxSurface;

/// A shaped torus standing in for an equilibrium.
///
/// Surfaces are nested ellipses in each poloidal plane, with minor radius
/// `a * sqrt(s)` so that `s` scales like enclosed area. An optional ripple
/// modulates the minor radius with the field periodicity.
#[derive(Debug, Clone)]
pub struct AnalyticTorus {
    major_radius: f64,
    minor_radius: f64,
    elongation: f64,
    ripple: f64,
    nfp: u32,
}

impl AnalyticTorus {
    /// Circular torus with the given radii.
    #[must_use]
    pub fn new(major_radius: f64, minor_radius: f64) -> Self {
        Self {
            major_radius,
            minor_radius,
            elongation: 1.0,
            ripple: 0.0,
            nfp: 1,
        }
    }

    /// Stretches the cross-section vertically by `kappa`.
    #[must_use]
    pub fn with_elongation(mut self, kappa: f64) -> Self {
        self.elongation = kappa;
        self
    }

    /// Modulates the minor radius by `1 + amplitude * cos(nfp * phi)`.
    #[must_use]
    pub fn with_ripple(mut self, amplitude: f64, nfp: u32) -> Self {
        self.ripple = amplitude;
        self.nfp = nfp.max(1);
        self
    }

    /// Major radius of the magnetic axis.
    #[must_use]
    pub fn major_radius(&self) -> f64 {
        self.major_radius
    }

    /// Minor radius of the `s = 1` surface.
    #[must_use]
    pub fn minor_radius(&self) -> f64 {
        self.minor_radius
    }
}

impl FluxSurface for AnalyticTorus {
    fn position(&self, s: f64, theta: f64, phi: f64) -> Result<Point3> {
        if !(s.is_finite() && theta.is_finite() && phi.is_finite()) || s < 0.0 {
            return Err(GeometryError::FluxQuery {
                s,
                theta,
                phi,
                reason: "flux label must be finite and non-negative".into(),
            }
            .into());
        }
        let rho = self.minor_radius
            * s.sqrt()
            * (1.0 + self.ripple * (f64::from(self.nfp) * phi).cos());
        let r = self.major_radius + rho * theta.cos();
        let z = self.elongation * rho * theta.sin();
        Ok(Point3::new(r * phi.cos(), r * phi.sin(), z))
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use approx::assert_relative_eq;

    use super::*;

    #[test]
    fn outboard_midplane_point() {
        let torus = AnalyticTorus::new(10.0, 2.0);
        let p = torus.position(1.0, 0.0, 0.0).unwrap();
        assert_relative_eq!(p.x, 12.0, epsilon = 1e-12);
    }

    #[test]
    fn axis_is_independent_of_theta() {
        let torus = AnalyticTorus::new(10.0, 2.0).with_elongation(1.5);
        let a = torus.position(0.0, 0.3, 1.0).unwrap();
        let b = torus.position(0.0, 2.1, 1.0).unwrap();
        assert!((a - b).norm() < 1e-12);
    }

    #[test]
    fn quarter_flux_is_half_radius() {
        let torus = AnalyticTorus::new(10.0, 2.0);
        let p = torus.position(0.25, std::f64::consts::FRAC_PI_2, 0.0).unwrap();
        assert_relative_eq!(p.z, 1.0, epsilon = 1e-12);
    }

    #[test]
    fn negative_flux_is_rejected() {
        let torus = AnalyticTorus::new(10.0, 2.0);
        assert!(torus.position(-0.1, 0.0, 0.0).is_err());
    }

    #[test]
    fn ripple_follows_field_periods() {
        let torus = AnalyticTorus::new(10.0, 2.0).with_ripple(0.1, 4);
        let period = std::f64::consts::TAU / 4.0;
        let a = torus.position(1.0, 0.7, 0.2).unwrap();
        let b = torus.position(1.0, 0.7, 0.2 + period).unwrap();
        assert_relative_eq!(a.x.hypot(a.y), b.x.hypot(b.y), epsilon = 1e-12);
        assert_relative_eq!(a.z, b.z, epsilon = 1e-12);
    }
}
