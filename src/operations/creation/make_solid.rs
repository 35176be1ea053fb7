use crate::error::{Result, TopologyError};
use crate::operations::query::open_edges;
use crate::topology::{OrientedFace, ShellData, SolidData, SolidId, TopologyStore};

/// Creates a solid from a set of oriented faces.
pub struct MakeSolid {
    faces: Vec<OrientedFace>,
}

impl MakeSolid {
    /// Creates a new `MakeSolid` operation.
    #[must_use]
    pub fn new(faces: Vec<OrientedFace>) -> Self {
        Self { faces }
    }

    /// Executes the operation, creating the shell and solid in the store.
    ///
    /// # Errors
    ///
    /// Returns [`TopologyError::InvalidTopology`] if the faces do not form a
    /// closed, consistently oriented shell.
    pub fn execute(&self, store: &mut TopologyStore) -> Result<SolidId> {
        let open = open_edges(store, &self.faces)?;
        if !open.is_empty() {
            return Err(TopologyError::InvalidTopology(format!(
                "shell of {} faces has {} unmatched boundary edges",
                self.faces.len(),
                open.len()
            ))
            .into());
        }
        let shell = store.add_shell(ShellData {
            faces: self.faces.clone(),
            is_closed: true,
        });
        Ok(store.add_solid(SolidData { shell }))
    }
}
