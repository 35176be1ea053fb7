//! Unit conversion applied to source data before geometric construction.

use super::Point3;

/// Metres to centimetres, the default scale for equilibrium and filament data.
pub const M2CM: f64 = 100.0;

/// Multiplies every coordinate of `point` by `scale`.
#[must_use]
pub fn scale_point(point: &Point3, scale: f64) -> Point3 {
    Point3::from(point.coords * scale)
}

/// Inverse of [`scale_point`].
#[must_use]
pub fn unscale_point(point: &Point3, scale: f64) -> Point3 {
    Point3::from(point.coords / scale)
}
