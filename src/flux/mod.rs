//! Flux-surface geometry queries.
//!
//! The construction engine only ever asks one question of the plasma
//! equilibrium: where is the point with flux label `s` at poloidal angle
//! `theta` and toroidal angle `phi`? [`FluxSurface`] is that capability.
//! Implementations must be pure functions of their arguments so builders
//! can share them by reference.

mod analytic;
mod fourier;

pub use analytic::AnalyticTorus;
pub use fourier::{FourierFluxSurface, FourierMode};

use std::f64::consts::TAU;

use crate::error::Result;
use crate::math::Point3;

/// Maps flux coordinates to Cartesian points, in the source's native units.
pub trait FluxSurface {
    /// Returns the point at flux label `s`, poloidal angle `theta` and
    /// toroidal angle `phi` (radians).
    ///
    /// Must accept `s` in `[0, 1]` and may extrapolate beyond; angles are
    /// arbitrary reals.
    ///
    /// # Errors
    ///
    /// Returns an error if the query cannot be evaluated.
    fn position(&self, s: f64, theta: f64, phi: f64) -> Result<Point3>;

    /// Evaluates the query at a [`FluxCoordinate`].
    ///
    /// # Errors
    ///
    /// Returns an error if the query cannot be evaluated.
    fn at(&self, coordinate: FluxCoordinate) -> Result<Point3> {
        self.position(coordinate.s, coordinate.theta, coordinate.phi)
    }
}

/// A point in flux coordinates.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FluxCoordinate {
    /// Normalised flux label; 0 on the magnetic axis, 1 on the plasma boundary.
    pub s: f64,
    /// Poloidal angle in radians.
    pub theta: f64,
    /// Toroidal angle in radians.
    pub phi: f64,
}

impl FluxCoordinate {
    /// Creates a new flux coordinate.
    #[must_use]
    pub fn new(s: f64, theta: f64, phi: f64) -> Self {
        Self { s, theta, phi }
    }

    /// Returns the coordinate with `theta` reduced into `[0, 2pi)`.
    #[must_use]
    pub fn wrapped(self) -> Self {
        let theta = self.theta.rem_euclid(TAU);
        Self {
            theta: if theta >= TAU { 0.0 } else { theta },
            ..self
        }
    }
}
