use crate::error::{OperationError, Result};
use crate::math::Point3;
use crate::topology::{SolidId, TopologyStore};

/// An axis-aligned bounding box.
#[derive(Debug, Clone, Copy)]
pub struct Aabb {
    /// Minimum corner of the bounding box.
    pub min: Point3,
    /// Maximum corner of the bounding box.
    pub max: Point3,
}

impl Aabb {
    /// Returns the centre of the box.
    #[must_use]
    pub fn center(&self) -> Point3 {
        nalgebra::center(&self.min, &self.max)
    }
}

/// Computes the axis-aligned bounding box of one or more solids.
pub struct BoundingBox {
    solids: Vec<SolidId>,
}

impl BoundingBox {
    /// Creates a new `BoundingBox` query.
    #[must_use]
    pub fn new(solids: Vec<SolidId>) -> Self {
        Self { solids }
    }

    /// Executes the query over all vertices of the solids.
    ///
    /// # Errors
    ///
    /// Returns an error if the solids have no vertices or are missing.
    pub fn execute(&self, store: &TopologyStore) -> Result<Aabb> {
        let vertices = store.solids_vertices(&self.solids)?;
        let mut iter = vertices.iter();
        let first = iter
            .next()
            .ok_or_else(|| OperationError::InvalidInput("bounding box of empty geometry".into()))?;
        let start = store.vertex(*first)?.point;
        let mut aabb = Aabb { min: start, max: start };
        for &id in iter {
            let p = store.vertex(id)?.point;
            aabb.min = aabb.min.inf(&p);
            aabb.max = aabb.max.sup(&p);
        }
        Ok(aabb)
    }
}
