use crate::error::{GeometryError, Result};
use crate::math::polygon::{centroid, newell_normal};
use crate::math::{Point3, Vector3, TOLERANCE};

/// An infinite plane in 3D space.
///
/// Defined by an origin point, and two orthogonal direction vectors
/// (`u_dir`, `v_dir`). The normal is `u_dir x v_dir`.
///
/// Parametric form: `P(u, v) = origin + u * u_dir + v * v_dir`.
#[derive(Debug, Clone)]
pub struct Plane {
    origin: Point3,
    u_dir: Vector3,
    v_dir: Vector3,
    normal: Vector3,
}

impl Plane {
    /// Creates a plane from an origin and a normal vector.
    ///
    /// The U and V directions are computed automatically.
    ///
    /// # Errors
    ///
    /// Returns an error if the normal vector is zero-length.
    pub fn from_normal(origin: Point3, normal: Vector3) -> Result<Self> {
        let len = normal.norm();
        if len < TOLERANCE {
            return Err(GeometryError::ZeroVector.into());
        }
        let normal = normal / len;

        // Choose a reference vector not parallel to the normal
        let reference = if normal.x.abs() < 0.9 {
            Vector3::new(1.0, 0.0, 0.0)
        } else {
            Vector3::new(0.0, 1.0, 0.0)
        };

        let u_dir = normal.cross(&reference).normalize();
        let v_dir = normal.cross(&u_dir);

        Ok(Self {
            origin,
            u_dir,
            v_dir,
            normal,
        })
    }

    /// Fits a plane through a closed polygon using Newell's method.
    ///
    /// The normal follows the polygon's winding (right-hand rule) and the
    /// origin is the vertex centroid.
    ///
    /// # Errors
    ///
    /// Returns [`GeometryError::Degenerate`] if the polygon has no area.
    pub fn from_polygon(points: &[Point3]) -> Result<Self> {
        let normal = newell_normal(points);
        if normal.norm() < TOLERANCE {
            return Err(
                GeometryError::Degenerate("polygon has zero area, cannot fit plane".into()).into(),
            );
        }
        Self::from_normal(centroid(points), normal)
    }

    /// Returns the origin point of the plane.
    #[must_use]
    pub fn origin(&self) -> &Point3 {
        &self.origin
    }

    /// Returns the U direction vector.
    #[must_use]
    pub fn u_dir(&self) -> &Vector3 {
        &self.u_dir
    }

    /// Returns the V direction vector.
    #[must_use]
    pub fn v_dir(&self) -> &Vector3 {
        &self.v_dir
    }

    /// Returns the normal vector of the plane.
    #[must_use]
    pub fn plane_normal(&self) -> &Vector3 {
        &self.normal
    }

    /// Signed distance of `point` from the plane along its normal.
    #[must_use]
    pub fn signed_distance(&self, point: &Point3) -> f64 {
        (point - self.origin).dot(&self.normal)
    }

    /// Returns the `(u, v)` coordinates of the projection of `point`.
    #[must_use]
    pub fn project(&self, point: &Point3) -> (f64, f64) {
        let d = point - self.origin;
        (d.dot(&self.u_dir), d.dot(&self.v_dir))
    }

    /// The point with in-plane coordinates `(u, v)`.
    #[must_use]
    pub fn point_at(&self, u: f64, v: f64) -> Point3 {
        self.origin + self.u_dir * u + self.v_dir * v
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn p(x: f64, y: f64, z: f64) -> Point3 {
        Point3::new(x, y, z)
    }

    #[test]
    fn polygon_plane_follows_winding() {
        let ccw = vec![p(0.0, 0.0, 1.0), p(1.0, 0.0, 1.0), p(1.0, 1.0, 1.0), p(0.0, 1.0, 1.0)];
        let plane = Plane::from_polygon(&ccw).unwrap();
        assert!((plane.plane_normal().z - 1.0).abs() < 1e-12);
        assert!(plane.signed_distance(&p(3.0, -2.0, 1.0)).abs() < 1e-12);

        let cw: Vec<Point3> = ccw.into_iter().rev().collect();
        let plane = Plane::from_polygon(&cw).unwrap();
        assert!((plane.plane_normal().z + 1.0).abs() < 1e-12);
    }

    #[test]
    fn project_then_evaluate_round_trips() {
        let plane = Plane::from_normal(p(1.0, 2.0, 3.0), Vector3::new(1.0, 1.0, 0.0)).unwrap();
        let q = plane.point_at(0.7, -1.3);
        let (u, v) = plane.project(&q);
        assert!((u - 0.7).abs() < 1e-12);
        assert!((v + 1.3).abs() < 1e-12);
    }

    #[test]
    fn collinear_polygon_is_degenerate() {
        let pts = vec![p(0.0, 0.0, 0.0), p(1.0, 0.0, 0.0), p(2.0, 0.0, 0.0)];
        assert!(Plane::from_polygon(&pts).is_err());
    }
}
