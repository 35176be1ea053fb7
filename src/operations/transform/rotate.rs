use nalgebra::{Rotation3, Unit};

use crate::error::{OperationError, Result};
use crate::math::{Matrix4, Point3, Vector3, TOLERANCE};
use crate::topology::{SolidId, TopologyStore};

use super::GeneralTransform;

/// Rotates a group of solids around an axis.
pub struct Rotate {
    solids: Vec<SolidId>,
    axis_origin: Point3,
    axis_direction: Vector3,
    angle: f64,
}

impl Rotate {
    /// Creates a new `Rotate` operation.
    ///
    /// * `angle` - Rotation angle in radians.
    #[must_use]
    pub fn new(
        solids: Vec<SolidId>,
        axis_origin: Point3,
        axis_direction: Vector3,
        angle: f64,
    ) -> Self {
        Self {
            solids,
            axis_origin,
            axis_direction,
            angle,
        }
    }

    /// Rotation about the global z axis, the device's axis of symmetry.
    #[must_use]
    pub fn about_z(solids: Vec<SolidId>, angle: f64) -> Self {
        Self::new(solids, Point3::origin(), Vector3::z(), angle)
    }

    /// Executes the rotation in place.
    ///
    /// # Errors
    ///
    /// Returns an error if the axis direction is zero-length.
    pub fn execute(&self, store: &mut TopologyStore) -> Result<()> {
        if self.axis_direction.norm() < TOLERANCE {
            return Err(
                OperationError::InvalidInput("rotation axis must be non-zero".into()).into(),
            );
        }
        let axis = Unit::new_normalize(self.axis_direction);
        let rot = Rotation3::from_axis_angle(&axis, self.angle).to_homogeneous();
        let t_neg = Matrix4::new_translation(&(-self.axis_origin.coords));
        let t_pos = Matrix4::new_translation(&self.axis_origin.coords);

        GeneralTransform::new(self.solids.clone(), t_pos * rot * t_neg).execute(store)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::f64::consts::FRAC_PI_2;

    use super::*;
    use crate::operations::creation::{MakeFace, MakeSolid, MakeWire};
    use crate::operations::query::BoundingBox;
    use crate::topology::OrientedFace;

    fn p(x: f64, y: f64, z: f64) -> Point3 {
        Point3::new(x, y, z)
    }

    fn tetra(store: &mut TopologyStore) -> SolidId {
        let v: Vec<_> = [p(1.0, 0.0, 0.0), p(2.0, 0.0, 0.0), p(1.0, 1.0, 0.0), p(1.0, 0.0, 1.0)]
            .iter()
            .map(|&q| store.add_vertex(crate::topology::VertexData::new(q)))
            .collect();
        let loops = [
            [v[0], v[2], v[1]],
            [v[0], v[1], v[3]],
            [v[1], v[2], v[3]],
            [v[2], v[0], v[3]],
        ];
        let faces = loops
            .iter()
            .map(|l| {
                let wire = MakeWire::from_vertices(l.to_vec(), true).execute(store).unwrap();
                OrientedFace::new(MakeFace::new(wire).execute(store).unwrap(), true)
            })
            .collect();
        MakeSolid::new(faces).execute(store).unwrap()
    }

    #[test]
    fn quarter_turn_about_z() {
        let mut store = TopologyStore::new();
        let solid = tetra(&mut store);
        Rotate::about_z(vec![solid], FRAC_PI_2).execute(&mut store).unwrap();
        let aabb = BoundingBox::new(vec![solid]).execute(&store).unwrap();
        assert!((aabb.min.x + 1.0).abs() < 1e-9);
        assert!((aabb.min.y - 1.0).abs() < 1e-9);
        assert!((aabb.max.y - 2.0).abs() < 1e-9);
    }

    #[test]
    fn zero_axis_is_rejected() {
        let mut store = TopologyStore::new();
        let solid = tetra(&mut store);
        let result =
            Rotate::new(vec![solid], Point3::origin(), Vector3::zeros(), 1.0).execute(&mut store);
        assert!(result.is_err());
    }
}
