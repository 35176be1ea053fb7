use std::collections::{HashMap, HashSet, VecDeque};

use spade::handles::{FixedFaceHandle, FixedVertexHandle, InnerTag};
use spade::{
    ConstrainedDelaunayTriangulation, InsertionError, Point2 as SpadePoint2, Triangulation,
};

use crate::error::{Result, TessellationError};
use crate::geometry::surface::{BilinearPatch, Plane};
use crate::math::polygon::signed_area_2d;
use crate::math::{Point2, Point3, Vector2, Vector3, TOLERANCE};
use crate::topology::{FaceId, FaceSurface, TopologyStore};

use super::TriangleMesh;

/// Tessellates a face into a triangle mesh.
///
/// Triangles follow the winding of the face's outer wire, so their
/// right-hand normals agree with the face normal.
pub struct TessellateFace {
    face: FaceId,
}

impl TessellateFace {
    /// Creates a new `TessellateFace` operation.
    #[must_use]
    pub fn new(face: FaceId) -> Self {
        Self { face }
    }

    /// Executes the tessellation, returning a triangle mesh.
    ///
    /// # Errors
    ///
    /// Returns an error if the face is missing or its boundary cannot be
    /// triangulated.
    pub fn execute(&self, store: &TopologyStore) -> Result<TriangleMesh> {
        let face = store.face(self.face)?;
        match &face.surface {
            FaceSurface::Plane(plane) => {
                let points = store
                    .face_vertices(self.face)?
                    .into_iter()
                    .map(|id| store.vertex(id).map(|v| v.point))
                    .collect::<std::result::Result<Vec<_>, _>>()?;
                tessellate_plane(plane, &points)
            }
            FaceSurface::Bilinear(patch) => Ok(tessellate_bilinear(patch)),
        }
    }
}

/// Splits a ruled quad along its `p00`–`p11` diagonal, dropping slivers.
#[allow(clippy::cast_possible_truncation)]
fn tessellate_bilinear(patch: &BilinearPatch) -> TriangleMesh {
    let mut mesh = TriangleMesh::default();
    if patch.is_degenerate() {
        return mesh;
    }
    let [p00, p10, p11, p01] = *patch.corners();
    for [a, b, c] in [[p00, p10, p11], [p00, p11, p01]] {
        let n = (b - a).cross(&(c - a));
        let len = n.norm();
        if len < TOLERANCE {
            continue;
        }
        let base = mesh.vertices.len() as u32;
        mesh.vertices.extend_from_slice(&[a, b, c]);
        mesh.normals.extend(std::iter::repeat(n / len).take(3));
        mesh.indices.push([base, base + 1, base + 2]);
    }
    mesh
}

/// Triangulates a planar polygon with a constrained Delaunay triangulation.
#[allow(clippy::cast_possible_truncation)]
fn tessellate_plane(plane: &Plane, points: &[Point3]) -> Result<TriangleMesh> {
    let (projected, center) = project_boundary(plane, points);
    // Boundary winding in the plane's own (u, v) frame.
    let winding = signed_area_2d(&projected).signum();
    let normal: Vector3 = *plane.plane_normal() * winding;

    let mut cdt = ConstrainedDelaunayTriangulation::<SpadePoint2<f64>>::new();
    let handles = insert_constraint_loop(&mut cdt, &projected)?;

    // First boundary index seen for each CDT vertex.
    let mut source: HashMap<usize, usize> = HashMap::new();
    for (i, h) in handles.iter().enumerate() {
        source.entry(h.index()).or_insert(i);
    }

    let interior = classify_interior_faces(&cdt);

    let mut mesh = TriangleMesh::default();
    let mut vertex_map: HashMap<usize, u32> = HashMap::new();
    for face_handle in cdt.inner_faces() {
        if !interior.contains(&face_handle.fix().index()) {
            continue;
        }
        let verts = face_handle.vertices();
        let [a, b, c] = verts.map(|vh| vh.position());
        let orient = (b.x - a.x) * (c.y - a.y) - (b.y - a.y) * (c.x - a.x);

        let mut tri = [0u32; 3];
        for (slot, vh) in verts.iter().enumerate() {
            let key = vh.fix().index();
            let idx = if let Some(&existing) = vertex_map.get(&key) {
                existing
            } else {
                let p3 = match source.get(&key) {
                    Some(&i) => points[i],
                    None => {
                        let pos = vh.position();
                        plane.point_at(pos.x + center.x, pos.y + center.y)
                    }
                };
                let new_idx = mesh.vertices.len() as u32;
                mesh.vertices.push(p3);
                mesh.normals.push(normal);
                vertex_map.insert(key, new_idx);
                new_idx
            };
            tri[slot] = idx;
        }
        if orient * winding < 0.0 {
            tri.swap(1, 2);
        }
        mesh.indices.push(tri);
    }

    if mesh.indices.is_empty() {
        return Err(TessellationError::Failed("planar face produced no triangles".into()).into());
    }
    Ok(mesh)
}

/// Projects a boundary into the plane's `(u, v)` frame, relative to the
/// boundary's own centroid.
///
/// Coordinates below `TOLERANCE` times the boundary extent are snapped to
/// zero; the triangulation rejects subnormal-scale inputs left by trig
/// round-off on rib planes at quarter turns.
fn project_boundary(plane: &Plane, points: &[Point3]) -> (Vec<Point2>, Point2) {
    let raw: Vec<Point2> = points
        .iter()
        .map(|p| {
            let (u, v) = plane.project(p);
            Point2::new(u, v)
        })
        .collect();
    #[allow(clippy::cast_precision_loss)]
    let count = raw.len().max(1) as f64;
    let center = Point2::from(raw.iter().fold(Vector2::zeros(), |acc, p| acc + p.coords) / count);
    let extent = raw
        .iter()
        .map(|p| (p - center).amax())
        .fold(0.0_f64, f64::max)
        .max(1.0);
    let snap = |x: f64| if x.abs() < TOLERANCE * extent { 0.0 } else { x };
    let projected = raw
        .iter()
        .map(|p| Point2::new(snap(p.x - center.x), snap(p.y - center.y)))
        .collect();
    (projected, center)
}

/// Inserts a closed polygon as constraint edges, returning the vertex handles.
fn insert_constraint_loop(
    cdt: &mut ConstrainedDelaunayTriangulation<SpadePoint2<f64>>,
    points: &[Point2],
) -> Result<Vec<FixedVertexHandle>> {
    if points.len() < 3 {
        return Err(
            TessellationError::Failed("constraint loop needs at least 3 points".into()).into(),
        );
    }

    let mut handles = Vec::with_capacity(points.len());
    for p in points {
        let h = cdt
            .insert(SpadePoint2::new(p.x, p.y))
            .map_err(|e: InsertionError| TessellationError::Failed(format!("CDT insert: {e}")))?;
        handles.push(h);
    }

    for i in 0..handles.len() {
        let from = handles[i];
        let to = handles[(i + 1) % handles.len()];
        if from != to {
            cdt.add_constraint(from, to);
        }
    }

    Ok(handles)
}

/// Classifies which inner faces of the CDT lie inside the polygon.
///
/// Flood-fills from the convex hull; crossing a constraint edge toggles
/// inside/outside, so odd depth means interior.
fn classify_interior_faces(
    cdt: &ConstrainedDelaunayTriangulation<SpadePoint2<f64>>,
) -> HashSet<usize> {
    let mut interior = HashSet::new();
    let mut depth_map: HashMap<usize, u32> = HashMap::new();
    let mut queue: VecDeque<(FixedFaceHandle<InnerTag>, u32)> = VecDeque::new();

    let outer_fix = cdt.outer_face().fix();
    for edge in cdt.directed_edges() {
        if edge.face().fix() != outer_fix {
            continue;
        }
        if let Some(inner) = edge.rev().face().as_inner() {
            let idx = inner.fix().index();
            if depth_map.contains_key(&idx) {
                continue;
            }
            let depth = u32::from(cdt.is_constraint_edge(edge.as_undirected().fix()));
            depth_map.insert(idx, depth);
            if depth % 2 == 1 {
                interior.insert(idx);
            }
            queue.push_back((inner.fix(), depth));
        }
    }

    while let Some((face_fix, depth)) = queue.pop_front() {
        for edge in cdt.face(face_fix).adjacent_edges() {
            let Some(neighbor) = edge.rev().face().as_inner() else {
                continue;
            };
            let n_idx = neighbor.fix().index();
            if depth_map.contains_key(&n_idx) {
                continue;
            }
            let new_depth = depth + u32::from(cdt.is_constraint_edge(edge.as_undirected().fix()));
            depth_map.insert(n_idx, new_depth);
            if new_depth % 2 == 1 {
                interior.insert(n_idx);
            }
            queue.push_back((neighbor.fix(), new_depth));
        }
    }

    interior
}
