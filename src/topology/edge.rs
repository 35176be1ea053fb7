use crate::geometry::curve::Line;

use super::vertex::VertexId;

slotmap::new_key_type! {
    /// Unique identifier for an edge in the topology store.
    pub struct EdgeId;
}

/// The geometric curve carried by an edge.
#[derive(Debug, Clone)]
pub enum EdgeCurve {
    /// A straight segment between distinct vertex positions.
    Line(Line),
    /// Both vertices sit at the same position (a collapsed layer sliver).
    Degenerate,
}

/// Data associated with a topological edge.
///
/// Edges are straight: every boundary in a lofted or swept solid is a
/// polyline through sampled points.
#[derive(Debug, Clone)]
pub struct EdgeData {
    /// Start vertex of the edge.
    pub start: VertexId,
    /// End vertex of the edge.
    pub end: VertexId,
    /// The geometric curve defining this edge's shape.
    pub curve: EdgeCurve,
    /// Parameter on the curve of the end vertex (the start is at 0).
    pub length: f64,
}
