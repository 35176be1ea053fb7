use super::edge::{EdgeData, EdgeId};
use super::vertex::VertexId;

slotmap::new_key_type! {
    /// Unique identifier for a wire in the topology store.
    pub struct WireId;
}

/// An edge with orientation information within a wire.
#[derive(Debug, Clone, Copy)]
pub struct OrientedEdge {
    /// The edge identifier.
    pub edge: EdgeId,
    /// If `true`, the edge is traversed start → end, otherwise end → start.
    pub forward: bool,
}

impl OrientedEdge {
    /// Creates a new oriented edge.
    #[must_use]
    pub fn new(edge: EdgeId, forward: bool) -> Self {
        Self { edge, forward }
    }

    /// The vertex this oriented edge leaves from.
    #[must_use]
    pub fn tail(self, data: &EdgeData) -> VertexId {
        if self.forward {
            data.start
        } else {
            data.end
        }
    }
}

/// An ordered loop (or chain) of oriented edges.
#[derive(Debug, Clone)]
pub struct WireData {
    /// The ordered sequence of oriented edges.
    pub edges: Vec<OrientedEdge>,
    /// Whether the last edge ends where the first begins.
    pub is_closed: bool,
}
