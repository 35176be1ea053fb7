use crate::error::{GeometryError, Result};
use crate::math::{Point3, Vector3, TOLERANCE};

/// A straight line through an origin with a unit direction.
///
/// The parametric form is `P(t) = origin + t * direction`, so `t` is arc length.
#[derive(Debug, Clone)]
pub struct Line {
    origin: Point3,
    direction: Vector3,
}

impl Line {
    /// Creates a new line from an origin and direction.
    ///
    /// # Errors
    ///
    /// Returns an error if the direction vector is zero-length.
    pub fn new(origin: Point3, direction: Vector3) -> Result<Self> {
        let len = direction.norm();
        if len < TOLERANCE {
            return Err(GeometryError::ZeroVector.into());
        }
        Ok(Self {
            origin,
            direction: direction / len,
        })
    }

    /// Creates the line through two points, returning it with the parameter of `end`.
    ///
    /// # Errors
    ///
    /// Returns an error if the points coincide.
    pub fn through(start: Point3, end: Point3) -> Result<(Self, f64)> {
        let d = end - start;
        let length = d.norm();
        Ok((Self::new(start, d)?, length))
    }

    /// Returns the origin point of the line.
    #[must_use]
    pub fn origin(&self) -> &Point3 {
        &self.origin
    }

    /// Returns the unit direction vector of the line.
    #[must_use]
    pub fn direction(&self) -> &Vector3 {
        &self.direction
    }

    /// Point at arc length `t` from the origin.
    #[must_use]
    pub fn point_at(&self, t: f64) -> Point3 {
        self.origin + self.direction * t
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn through_two_points_reaches_end() {
        let a = Point3::new(1.0, 0.0, 0.0);
        let b = Point3::new(1.0, 3.0, 4.0);
        let (line, t_end) = Line::through(a, b).unwrap();
        assert!((t_end - 5.0).abs() < TOLERANCE);
        assert!((line.point_at(t_end) - b).norm() < 1e-12);
        assert!((line.direction().norm() - 1.0).abs() < 1e-12);
        assert_eq!(line.origin(), &a);
    }

    #[test]
    fn coincident_points_are_rejected() {
        let a = Point3::new(2.0, 2.0, 2.0);
        assert!(Line::through(a, a).is_err());
    }
}
