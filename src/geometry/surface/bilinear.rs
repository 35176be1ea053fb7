use crate::math::{Point3, TOLERANCE};

/// A ruled surface spanning four corner points.
///
/// `P(u, v) = (1-u)(1-v) p00 + u(1-v) p10 + u v p11 + (1-u) v p01` for
/// `u, v` in `[0, 1]`. Lofted quads between neighbouring ribs are rarely
/// planar, and may collapse to a sliver where a layer has zero thickness,
/// so this surface accepts any corner configuration.
#[derive(Debug, Clone)]
pub struct BilinearPatch {
    corners: [Point3; 4],
}

impl BilinearPatch {
    /// Creates a patch from corners in boundary order `p00, p10, p11, p01`.
    #[must_use]
    pub fn new(corners: [Point3; 4]) -> Self {
        Self { corners }
    }

    /// Returns the corners in boundary order.
    #[must_use]
    pub fn corners(&self) -> &[Point3; 4] {
        &self.corners
    }

    /// Returns `true` if the patch has (numerically) zero area.
    #[must_use]
    pub fn is_degenerate(&self) -> bool {
        let [p00, p10, p11, p01] = self.corners;
        let a = (p10 - p00).cross(&(p11 - p00));
        let b = (p11 - p00).cross(&(p01 - p00));
        a.norm() < TOLERANCE && b.norm() < TOLERANCE
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
    fn flat_unit_square_is_not_degenerate() {
        let patch = BilinearPatch::new([
            p(0.0, 0.0, 0.0),
            p(1.0, 0.0, 0.0),
            p(1.0, 1.0, 0.0),
            p(0.0, 1.0, 0.0),
        ]);
        assert!(!patch.is_degenerate());
    }

    #[test]
    fn collapsed_sliver_is_degenerate() {
        let a = p(1.0, 0.0, 0.0);
        let b = p(1.0, 1.0, 0.0);
        let patch = BilinearPatch::new([a, b, b, a]);
        assert!(patch.is_degenerate());
    }
}
