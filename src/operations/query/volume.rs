use crate::error::Result;
use crate::tessellation::TessellateSolid;
use crate::topology::{SolidId, TopologyStore};

/// Computes the enclosed volume of a solid.
///
/// Uses tessellation and the signed tetrahedron method: for each triangle,
/// `(1/6) * v0 . (v1 x v2)`, summed over the closed mesh. Shells oriented
/// outward give a positive result; an inside-out shell gives a negative one.
pub struct Volume {
    solid: SolidId,
}

impl Volume {
    /// Creates a new `Volume` query.
    #[must_use]
    pub fn new(solid: SolidId) -> Self {
        Self { solid }
    }

    /// Executes the query, returning the signed volume.
    ///
    /// # Errors
    ///
    /// Returns an error if the solid cannot be tessellated.
    pub fn execute(&self, store: &TopologyStore) -> Result<f64> {
        let mesh = TessellateSolid::new(self.solid).execute(store)?;

        let mut six_volume = 0.0;
        for tri in &mesh.indices {
            let v0 = mesh.vertices[tri[0] as usize];
            let v1 = mesh.vertices[tri[1] as usize];
            let v2 = mesh.vertices[tri[2] as usize];
            six_volume += v0.coords.dot(&v1.coords.cross(&v2.coords));
        }

        Ok(six_volume / 6.0)
    }
}
