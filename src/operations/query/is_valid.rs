use std::collections::HashMap;

use crate::error::Result;
use crate::topology::{OrientedFace, SolidId, TopologyStore, VertexId};

/// Validates that a solid's shell is closed and consistently oriented.
///
/// Every directed boundary edge `a → b` of every oriented face must be
/// matched by exactly one `b → a` in a neighbouring face.
pub struct IsValid {
    solid: SolidId,
}

impl IsValid {
    /// Creates a new `IsValid` query.
    #[must_use]
    pub fn new(solid: SolidId) -> Self {
        Self { solid }
    }

    /// Executes the validation, returning `true` if the solid is watertight.
    #[must_use]
    pub fn execute(&self, store: &TopologyStore) -> bool {
        let Ok(solid) = store.solid(self.solid) else {
            return false;
        };
        let Ok(shell) = store.shell(solid.shell) else {
            return false;
        };
        shell.is_closed
            && !shell.faces.is_empty()
            && open_edges(store, &shell.faces).is_ok_and(|open| open.is_empty())
    }
}

/// Returns the directed edges of `faces` that lack exactly one reversed twin.
///
/// # Errors
///
/// Returns an error if a referenced entity is missing from the store.
pub fn open_edges(
    store: &TopologyStore,
    faces: &[OrientedFace],
) -> Result<Vec<(VertexId, VertexId)>> {
    let mut counts: HashMap<(VertexId, VertexId), usize> = HashMap::new();
    for &of in faces {
        let ids = store.oriented_face_vertices(of)?;
        let n = ids.len();
        for i in 0..n {
            let a = ids[i];
            let b = ids[(i + 1) % n];
            if a != b {
                *counts.entry((a, b)).or_insert(0) += 1;
            }
        }
    }

    Ok(counts
        .iter()
        .filter(|&(&(a, b), &count)| count != 1 || counts.get(&(b, a)).copied() != Some(1))
        .map(|(&key, _)| key)
        .collect())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::math::Point3;
    use crate::operations::creation::{MakeFace, MakeSolid, MakeWire};
    use crate::topology::{FaceId, VertexData};

    fn tetra_faces(store: &mut TopologyStore) -> Vec<FaceId> {
        let v: Vec<VertexId> = [
            Point3::new(0.0, 0.0, 0.0),
            Point3::new(1.0, 0.0, 0.0),
            Point3::new(0.0, 1.0, 0.0),
            Point3::new(0.0, 0.0, 1.0),
        ]
        .iter()
        .map(|&p| store.add_vertex(VertexData::new(p)))
        .collect();
        // Outward-wound triangles.
        let loops = [
            [v[0], v[2], v[1]],
            [v[0], v[1], v[3]],
            [v[1], v[2], v[3]],
            [v[2], v[0], v[3]],
        ];
        loops
            .iter()
            .map(|l| {
                let wire = MakeWire::from_vertices(l.to_vec(), true).execute(store).unwrap();
                MakeFace::new(wire).execute(store).unwrap()
            })
            .collect()
    }

    #[test]
    fn tetrahedron_is_closed() {
        let mut store = TopologyStore::new();
        let faces: Vec<OrientedFace> = tetra_faces(&mut store)
            .into_iter()
            .map(|f| OrientedFace::new(f, true))
            .collect();
        let solid = MakeSolid::new(faces).execute(&mut store).unwrap();
        assert!(IsValid::new(solid).execute(&store));
    }

    #[test]
    fn missing_face_leaves_open_edges() {
        let mut store = TopologyStore::new();
        let faces: Vec<OrientedFace> = tetra_faces(&mut store)
            .into_iter()
            .take(3)
            .map(|f| OrientedFace::new(f, true))
            .collect();
        assert_eq!(open_edges(&store, &faces).unwrap().len(), 3);
        assert!(MakeSolid::new(faces).execute(&mut store).is_err());
    }

    #[test]
    fn flipped_face_breaks_orientation() {
        let mut store = TopologyStore::new();
        let mut faces: Vec<OrientedFace> = tetra_faces(&mut store)
            .into_iter()
            .map(|f| OrientedFace::new(f, true))
            .collect();
        faces[0] = faces[0].reversed();
        assert!(!open_edges(&store, &faces).unwrap().is_empty());
    }
}
