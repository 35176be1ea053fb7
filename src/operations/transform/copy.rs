use std::collections::HashMap;

use crate::error::Result;
use crate::topology::{
    EdgeId, FaceData, FaceId, OrientedEdge, OrientedFace, ShellData, SolidData, SolidId,
    TopologyStore, VertexId, WireData, WireId,
};

/// Deep-copies a group of solids.
///
/// Entities shared inside the group stay shared between the copies, so
/// copying an in-vessel build keeps neighbouring layers conformal.
pub struct CopySolids {
    solids: Vec<SolidId>,
}

#[derive(Default)]
struct CopyMemo {
    vertices: HashMap<VertexId, VertexId>,
    edges: HashMap<EdgeId, EdgeId>,
    wires: HashMap<WireId, WireId>,
    faces: HashMap<FaceId, FaceId>,
}

impl CopySolids {
    /// Creates a new `CopySolids` operation.
    #[must_use]
    pub fn new(solids: Vec<SolidId>) -> Self {
        Self { solids }
    }

    /// Executes the copy, returning the new solids in input order.
    ///
    /// # Errors
    ///
    /// Returns an error if any referenced entity is missing.
    pub fn execute(&self, store: &mut TopologyStore) -> Result<Vec<SolidId>> {
        let mut memo = CopyMemo::default();
        let mut copies = Vec::with_capacity(self.solids.len());
        for &solid in &self.solids {
            let faces = store.solid_faces(solid)?.to_vec();
            let mut new_faces = Vec::with_capacity(faces.len());
            for of in faces {
                let face = copy_face(store, &mut memo, of.face)?;
                new_faces.push(OrientedFace::new(face, of.forward));
            }
            let shell = store.add_shell(ShellData {
                faces: new_faces,
                is_closed: true,
            });
            copies.push(store.add_solid(SolidData { shell }));
        }
        Ok(copies)
    }
}

fn copy_vertex(store: &mut TopologyStore, memo: &mut CopyMemo, id: VertexId) -> Result<VertexId> {
    if let Some(&copy) = memo.vertices.get(&id) {
        return Ok(copy);
    }
    let data = store.vertex(id)?.clone();
    let copy = store.add_vertex(data);
    memo.vertices.insert(id, copy);
    Ok(copy)
}

fn copy_edge(store: &mut TopologyStore, memo: &mut CopyMemo, id: EdgeId) -> Result<EdgeId> {
    if let Some(&copy) = memo.edges.get(&id) {
        return Ok(copy);
    }
    let mut data = store.edge(id)?.clone();
    data.start = copy_vertex(store, memo, data.start)?;
    data.end = copy_vertex(store, memo, data.end)?;
    let copy = store.add_edge(data);
    memo.edges.insert(id, copy);
    Ok(copy)
}

fn copy_wire(store: &mut TopologyStore, memo: &mut CopyMemo, id: WireId) -> Result<WireId> {
    if let Some(&copy) = memo.wires.get(&id) {
        return Ok(copy);
    }
    let data = store.wire(id)?.clone();
    let mut edges = Vec::with_capacity(data.edges.len());
    for oe in &data.edges {
        edges.push(OrientedEdge::new(copy_edge(store, memo, oe.edge)?, oe.forward));
    }
    let copy = store.add_wire(WireData {
        edges,
        is_closed: data.is_closed,
    });
    memo.wires.insert(id, copy);
    Ok(copy)
}

fn copy_face(store: &mut TopologyStore, memo: &mut CopyMemo, id: FaceId) -> Result<FaceId> {
    if let Some(&copy) = memo.faces.get(&id) {
        return Ok(copy);
    }
    let data = store.face(id)?.clone();
    let outer_wire = copy_wire(store, memo, data.outer_wire)?;
    let copy = store.add_face(FaceData {
        surface: data.surface,
        outer_wire,
    });
    memo.faces.insert(id, copy);
    Ok(copy)
}
