pub mod edge;
pub mod face;
pub mod shell;
pub mod solid;
pub mod vertex;
pub mod wire;

pub use edge::{EdgeCurve, EdgeData, EdgeId};
pub use face::{FaceData, FaceId, FaceSurface, OrientedFace};
pub use shell::{ShellData, ShellId};
pub use solid::{SolidData, SolidId};
pub use vertex::{VertexData, VertexId};
pub use wire::{OrientedEdge, WireData, WireId};

use std::collections::HashSet;

use crate::error::TopologyError;
use crate::math::Point3;
use slotmap::SlotMap;

/// Generates insert / lookup / mutable lookup for one entity arena.
macro_rules! arena_access {
    ($field:ident: $id:ty => $data:ty, $add:ident, $get:ident, $get_mut:ident, $label:literal) => {
        #[doc = concat!("Inserts a ", $label, " and returns its ID.")]
        pub fn $add(&mut self, data: $data) -> $id {
            self.$field.insert(data)
        }

        #[doc = concat!("Returns the ", $label, " data, or an error if not found.")]
        ///
        /// # Errors
        ///
        /// Returns an error if the entity is not found in the store.
        pub fn $get(&self, id: $id) -> Result<&$data, TopologyError> {
            self.$field
                .get(id)
                .ok_or_else(|| TopologyError::EntityNotFound($label.into()))
        }

        #[doc = concat!("Returns the ", $label, " data mutably, or an error if not found.")]
        ///
        /// # Errors
        ///
        /// Returns an error if the entity is not found in the store.
        pub fn $get_mut(&mut self, id: $id) -> Result<&mut $data, TopologyError> {
            self.$field
                .get_mut(id)
                .ok_or_else(|| TopologyError::EntityNotFound($label.into()))
        }
    };
}

/// Central arena that owns all topological entities.
///
/// This replaces a CAD session: every builder writes into a caller-owned
/// store and hands back typed ids, so nothing depends on global numbering.
#[derive(Debug, Default)]
pub struct TopologyStore {
    vertices: SlotMap<VertexId, VertexData>,
    edges: SlotMap<EdgeId, EdgeData>,
    wires: SlotMap<WireId, WireData>,
    faces: SlotMap<FaceId, FaceData>,
    shells: SlotMap<ShellId, ShellData>,
    solids: SlotMap<SolidId, SolidData>,
}

impl TopologyStore {
    /// Creates a new, empty topology store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    arena_access!(vertices: VertexId => VertexData, add_vertex, vertex, vertex_mut, "vertex");
    arena_access!(edges: EdgeId => EdgeData, add_edge, edge, edge_mut, "edge");
    arena_access!(wires: WireId => WireData, add_wire, wire, wire_mut, "wire");
    arena_access!(faces: FaceId => FaceData, add_face, face, face_mut, "face");
    arena_access!(shells: ShellId => ShellData, add_shell, shell, shell_mut, "shell");
    arena_access!(solids: SolidId => SolidData, add_solid, solid, solid_mut, "solid");

    /// Number of vertices in the store.
    #[must_use]
    pub fn num_vertices(&self) -> usize {
        self.vertices.len()
    }

    /// Number of faces in the store.
    #[must_use]
    pub fn num_faces(&self) -> usize {
        self.faces.len()
    }

    /// Number of solids in the store.
    #[must_use]
    pub fn num_solids(&self) -> usize {
        self.solids.len()
    }

    // --- Traversal ---

    /// Returns the oriented faces bounding a solid.
    ///
    /// # Errors
    ///
    /// Returns an error if the solid or its shell is missing.
    pub fn solid_faces(&self, solid: SolidId) -> Result<&[OrientedFace], TopologyError> {
        let shell = self.shell(self.solid(solid)?.shell)?;
        Ok(&shell.faces)
    }

    /// Returns the vertex loop of a face in wire order.
    ///
    /// # Errors
    ///
    /// Returns an error if the face, its wire, or an edge is missing.
    pub fn face_vertices(&self, face: FaceId) -> Result<Vec<VertexId>, TopologyError> {
        let wire = self.wire(self.face(face)?.outer_wire)?;
        let mut loop_ids = Vec::with_capacity(wire.edges.len());
        for oe in &wire.edges {
            loop_ids.push(oe.tail(self.edge(oe.edge)?));
        }
        Ok(loop_ids)
    }

    /// Returns the vertex loop of a face as seen by a shell.
    ///
    /// Reversed faces yield the loop in reverse, so consecutive pairs are
    /// always the directed boundary edges of the oriented face.
    ///
    /// # Errors
    ///
    /// Returns an error if any referenced entity is missing.
    pub fn oriented_face_vertices(&self, of: OrientedFace) -> Result<Vec<VertexId>, TopologyError> {
        let mut ids = self.face_vertices(of.face)?;
        if !of.forward {
            ids.reverse();
        }
        Ok(ids)
    }

    /// Returns the boundary positions of an oriented face.
    ///
    /// # Errors
    ///
    /// Returns an error if any referenced entity is missing.
    pub fn oriented_face_points(&self, of: OrientedFace) -> Result<Vec<Point3>, TopologyError> {
        self.oriented_face_vertices(of)?
            .into_iter()
            .map(|id| self.vertex(id).map(|v| v.point))
            .collect()
    }

    /// Collects the unique vertices of a set of solids, in first-seen order.
    ///
    /// Vertices shared between the solids are reported once.
    ///
    /// # Errors
    ///
    /// Returns an error if any referenced entity is missing.
    pub fn solids_vertices(&self, solids: &[SolidId]) -> Result<Vec<VertexId>, TopologyError> {
        let mut seen = HashSet::new();
        let mut ordered = Vec::new();
        for &solid in solids {
            for &of in self.solid_faces(solid)? {
                for id in self.face_vertices(of.face)? {
                    if seen.insert(id) {
                        ordered.push(id);
                    }
                }
            }
        }
        Ok(ordered)
    }

    /// Collects the unique faces of a set of solids, in first-seen order.
    ///
    /// # Errors
    ///
    /// Returns an error if any referenced entity is missing.
    pub fn solids_faces(&self, solids: &[SolidId]) -> Result<Vec<FaceId>, TopologyError> {
        let mut seen = HashSet::new();
        let mut ordered = Vec::new();
        for &solid in solids {
            for &of in self.solid_faces(solid)? {
                if seen.insert(of.face) {
                    ordered.push(of.face);
                }
            }
        }
        Ok(ordered)
    }
}
