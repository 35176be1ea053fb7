use std::collections::HashSet;

use crate::error::Result;
use crate::geometry::curve::Line;
use crate::math::{Matrix4, Point3, TOLERANCE};
use crate::operations::creation::surface_for_boundary;
use crate::topology::{EdgeCurve, EdgeId, SolidId, TopologyStore};

/// Applies an affine 4x4 matrix to a group of solids in place.
///
/// Entities shared between the solids (a layer boundary used by two
/// neighbouring shells) are moved exactly once.
pub struct GeneralTransform {
    solids: Vec<SolidId>,
    matrix: Matrix4,
}

impl GeneralTransform {
    /// Creates a new `GeneralTransform` operation.
    #[must_use]
    pub fn new(solids: Vec<SolidId>, matrix: Matrix4) -> Self {
        Self { solids, matrix }
    }

    /// Executes the transformation.
    ///
    /// Vertex positions are mapped first; edge curves and face surfaces
    /// are then rebuilt from the moved vertices.
    ///
    /// # Errors
    ///
    /// Returns an error if any topology entity is missing or a face
    /// boundary no longer admits a surface.
    pub fn execute(&self, store: &mut TopologyStore) -> Result<()> {
        for vid in store.solids_vertices(&self.solids)? {
            let vertex = store.vertex_mut(vid)?;
            vertex.point = transform_point(&self.matrix, &vertex.point);
        }

        let faces = store.solids_faces(&self.solids)?;

        let mut edges: Vec<EdgeId> = Vec::new();
        let mut seen = HashSet::new();
        for &face in &faces {
            let wire = store.wire(store.face(face)?.outer_wire)?;
            for oe in &wire.edges {
                if seen.insert(oe.edge) {
                    edges.push(oe.edge);
                }
            }
        }
        for edge_id in edges {
            let edge = store.edge(edge_id)?;
            let a = store.vertex(edge.start)?.point;
            let b = store.vertex(edge.end)?.point;
            let (curve, length) = if (b - a).norm() < TOLERANCE {
                (EdgeCurve::Degenerate, 0.0)
            } else {
                let (line, length) = Line::through(a, b)?;
                (EdgeCurve::Line(line), length)
            };
            let edge = store.edge_mut(edge_id)?;
            edge.curve = curve;
            edge.length = length;
        }

        for face in faces {
            let points = store
                .face_vertices(face)?
                .into_iter()
                .map(|id| store.vertex(id).map(|v| v.point))
                .collect::<std::result::Result<Vec<_>, _>>()?;
            let surface = surface_for_boundary(&points)?;
            store.face_mut(face)?.surface = surface;
        }

        Ok(())
    }
}

/// Transforms a point by a 4x4 matrix (homogeneous coordinates).
fn transform_point(matrix: &Matrix4, point: &Point3) -> Point3 {
    let v = matrix * point.to_homogeneous();
    Point3::new(v.x, v.y, v.z)
}
