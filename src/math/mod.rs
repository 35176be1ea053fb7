pub mod polygon;
pub mod units;

/// 2D point type.
pub type Point2 = nalgebra::Point2<f64>;

/// 3D point type.
pub type Point3 = nalgebra::Point3<f64>;

/// 2D vector type.
pub type Vector2 = nalgebra::Vector2<f64>;

/// 3D vector type.
pub type Vector3 = nalgebra::Vector3<f64>;

/// 4x4 transformation matrix.
pub type Matrix4 = nalgebra::Matrix4<f64>;

/// Global geometric tolerance for floating-point comparisons.
pub const TOLERANCE: f64 = 1e-10;

/// Returns `n` evenly spaced values from `start` to `end`.
///
/// With `endpoint == false` the interval is half-open and `end` is excluded,
/// which is what closed loops (poloidal angles) need.
#[must_use]
#[allow(clippy::cast_precision_loss)]
pub fn linspace(start: f64, end: f64, n: usize, endpoint: bool) -> Vec<f64> {
    match n {
        0 => Vec::new(),
        1 => vec![start],
        _ => {
            let div = if endpoint { (n - 1) as f64 } else { n as f64 };
            let step = (end - start) / div;
            (0..n)
                .map(|i| {
                    if endpoint && i == n - 1 {
                        end
                    } else {
                        start + step * i as f64
                    }
                })
                .collect()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn linspace_inclusive_hits_both_ends() {
        let v = linspace(0.0, 1.0, 5, true);
        assert_eq!(v.len(), 5);
        assert!((v[0]).abs() < TOLERANCE);
        assert!((v[2] - 0.5).abs() < TOLERANCE);
        assert!((v[4] - 1.0).abs() < TOLERANCE);
    }

    #[test]
    fn linspace_half_open_excludes_end() {
        let v = linspace(0.0, 4.0, 4, false);
        assert_eq!(v, vec![0.0, 1.0, 2.0, 3.0]);
    }

    #[test]
    fn linspace_degenerate_counts() {
        assert!(linspace(0.0, 1.0, 0, true).is_empty());
        assert_eq!(linspace(2.0, 3.0, 1, true), vec![2.0]);
    }
}
