use crate::error::{OperationError, Result};
use crate::geometry::curve::Line;
use crate::math::{Point3, TOLERANCE};
use crate::topology::{
    EdgeCurve, EdgeData, OrientedEdge, TopologyStore, VertexData, VertexId, WireData, WireId,
};

enum WireSource {
    Points(Vec<Point3>),
    Vertices(Vec<VertexId>),
}

/// Creates a polyline wire from points or from existing vertices.
pub struct MakeWire {
    source: WireSource,
    close: bool,
}

impl MakeWire {
    /// Creates a wire through new vertices at `points`.
    #[must_use]
    pub fn new(points: Vec<Point3>, close: bool) -> Self {
        Self {
            source: WireSource::Points(points),
            close,
        }
    }

    /// Creates a wire through vertices already in the store.
    ///
    /// Neighbouring faces built this way share vertices, which is what makes
    /// lofted shells topologically watertight.
    #[must_use]
    pub fn from_vertices(vertices: Vec<VertexId>, close: bool) -> Self {
        Self {
            source: WireSource::Vertices(vertices),
            close,
        }
    }

    /// Executes the operation, creating the edges and wire in the store.
    ///
    /// Consecutive vertices at the same position produce
    /// [`EdgeCurve::Degenerate`] edges rather than an error.
    ///
    /// # Errors
    ///
    /// Returns [`OperationError::InvalidInput`] if there are fewer than two
    /// vertices (three for a closed wire), or if a vertex id is unknown.
    pub fn execute(&self, store: &mut TopologyStore) -> Result<WireId> {
        let vertices: Vec<VertexId> = match &self.source {
            WireSource::Points(points) => points
                .iter()
                .map(|&p| store.add_vertex(VertexData::new(p)))
                .collect(),
            WireSource::Vertices(ids) => ids.clone(),
        };

        let min = if self.close { 3 } else { 2 };
        if vertices.len() < min {
            return Err(OperationError::InvalidInput(format!(
                "wire needs at least {min} vertices, got {}",
                vertices.len()
            ))
            .into());
        }

        let n = vertices.len();
        let segments = if self.close { n } else { n - 1 };
        let mut edges = Vec::with_capacity(segments);
        for i in 0..segments {
            let start = vertices[i];
            let end = vertices[(i + 1) % n];
            let a = store.vertex(start)?.point;
            let b = store.vertex(end)?.point;

            let (curve, length) = if (b - a).norm() < TOLERANCE {
                (EdgeCurve::Degenerate, 0.0)
            } else {
                let (line, length) = Line::through(a, b)?;
                (EdgeCurve::Line(line), length)
            };
            let edge = store.add_edge(EdgeData {
                start,
                end,
                curve,
                length,
            });
            edges.push(OrientedEdge::new(edge, true));
        }

        Ok(store.add_wire(WireData {
            edges,
            is_closed: self.close,
        }))
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn p(x: f64, y: f64, z: f64) -> Point3 {
        Point3::new(x, y, z)
    }

    #[test]
    fn closed_triangle_has_three_edges() {
        let mut store = TopologyStore::new();
        let wire = MakeWire::new(vec![p(0.0, 0.0, 0.0), p(1.0, 0.0, 0.0), p(0.0, 1.0, 0.0)], true)
            .execute(&mut store)
            .unwrap();
        let data = store.wire(wire).unwrap();
        assert_eq!(data.edges.len(), 3);
        assert!(data.is_closed);
        let last = store.edge(data.edges[2].edge).unwrap();
        let first = store.edge(data.edges[0].edge).unwrap();
        assert_eq!(last.end, first.start);
    }

    #[test]
    fn coincident_vertices_make_degenerate_edge() {
        let mut store = TopologyStore::new();
        let wire = MakeWire::new(vec![p(0.0, 0.0, 0.0), p(0.0, 0.0, 0.0), p(1.0, 0.0, 0.0)], false)
            .execute(&mut store)
            .unwrap();
        let data = store.wire(wire).unwrap();
        let first = store.edge(data.edges[0].edge).unwrap();
        assert!(matches!(first.curve, EdgeCurve::Degenerate));
        let second = store.edge(data.edges[1].edge).unwrap();
        assert!((second.length - 1.0).abs() < TOLERANCE);
    }

    #[test]
    fn shared_vertices_are_reused() {
        let mut store = TopologyStore::new();
        let ids: Vec<VertexId> = [p(0.0, 0.0, 0.0), p(1.0, 0.0, 0.0), p(1.0, 1.0, 0.0)]
            .iter()
            .map(|&q| store.add_vertex(VertexData::new(q)))
            .collect();
        MakeWire::from_vertices(ids.clone(), true).execute(&mut store).unwrap();
        MakeWire::from_vertices(ids, true).execute(&mut store).unwrap();
        assert_eq!(store.num_vertices(), 3);
    }

    #[test]
    fn too_few_points_is_an_error() {
        let mut store = TopologyStore::new();
        let result =
            MakeWire::new(vec![p(0.0, 0.0, 0.0), p(1.0, 0.0, 0.0)], true).execute(&mut store);
        assert!(result.is_err());
    }
}
