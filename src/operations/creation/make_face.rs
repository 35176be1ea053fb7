use crate::error::{OperationError, Result};
use crate::geometry::surface::{BilinearPatch, Plane};
use crate::math::Point3;
use crate::topology::{FaceData, FaceId, FaceSurface, TopologyStore, WireId};

/// Relative tolerance for accepting a polygon as planar.
const PLANARITY_TOLERANCE: f64 = 1e-9;

/// Creates a face bounded by a closed wire.
///
/// The surface is chosen from the boundary: a planar polygon gets a
/// [`FaceSurface::Plane`], any other four-sided boundary (twisted or
/// collapsed quads) gets a [`FaceSurface::Bilinear`] patch.
pub struct MakeFace {
    wire: WireId,
}

impl MakeFace {
    /// Creates a new `MakeFace` operation.
    #[must_use]
    pub fn new(wire: WireId) -> Self {
        Self { wire }
    }

    /// Executes the operation, creating the face in the topology store.
    ///
    /// # Errors
    ///
    /// Returns an error if the wire is open, or if it has more than four
    /// vertices and is not planar.
    pub fn execute(&self, store: &mut TopologyStore) -> Result<FaceId> {
        let wire = store.wire(self.wire)?;
        if !wire.is_closed {
            return Err(crate::error::TopologyError::WireNotClosed.into());
        }
        let points = wire_points(store, self.wire)?;
        let surface = surface_for_boundary(&points)?;
        Ok(store.add_face(FaceData {
            surface,
            outer_wire: self.wire,
        }))
    }
}

/// Picks the surface that fits a closed boundary polygon.
///
/// # Errors
///
/// Returns an error if a boundary with more than four vertices is
/// non-planar or degenerate.
pub fn surface_for_boundary(points: &[Point3]) -> Result<FaceSurface> {
    if let Ok(plane) = Plane::from_polygon(points) {
        let scale = polygon_extent(points).max(1.0);
        let planar = points
            .iter()
            .all(|p| plane.signed_distance(p).abs() <= PLANARITY_TOLERANCE * scale);
        if planar {
            return Ok(FaceSurface::Plane(plane));
        }
    }
    match points {
        [a, b, c, d] => Ok(FaceSurface::Bilinear(BilinearPatch::new([*a, *b, *c, *d]))),
        _ => Err(OperationError::InvalidInput(format!(
            "{}-sided boundary is not planar and cannot carry a ruled patch",
            points.len()
        ))
        .into()),
    }
}

/// Collects vertex positions from a wire in traversal order.
fn wire_points(store: &TopologyStore, wire_id: WireId) -> Result<Vec<Point3>> {
    let wire = store.wire(wire_id)?;
    let mut points = Vec::with_capacity(wire.edges.len());
    for oe in &wire.edges {
        let edge = store.edge(oe.edge)?;
        let vertex_id = if oe.forward { edge.start } else { edge.end };
        points.push(store.vertex(vertex_id)?.point);
    }
    Ok(points)
}

/// Largest coordinate span of the polygon's bounding box.
fn polygon_extent(points: &[Point3]) -> f64 {
    let mut min = points[0];
    let mut max = points[0];
    for p in points {
        min = min.inf(p);
        max = max.sup(p);
    }
    (max - min).amax()
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::operations::creation::MakeWire;

    fn p(x: f64, y: f64, z: f64) -> Point3 {
        Point3::new(x, y, z)
    }

    fn face_from(store: &mut TopologyStore, points: Vec<Point3>) -> Result<FaceId> {
        let wire = MakeWire::new(points, true).execute(store)?;
        MakeFace::new(wire).execute(store)
    }

    #[test]
    fn planar_hexagon_gets_plane() {
        let mut store = TopologyStore::new();
        let hex: Vec<Point3> = (0..6)
            .map(|k| {
                let a = f64::from(k) * std::f64::consts::PI / 3.0;
                p(a.cos(), 0.0, a.sin())
            })
            .collect();
        let face = face_from(&mut store, hex).unwrap();
        assert!(matches!(store.face(face).unwrap().surface, FaceSurface::Plane(_)));
    }

    #[test]
    fn twisted_quad_gets_bilinear_patch() {
        let mut store = TopologyStore::new();
        let quad = vec![p(0.0, 0.0, 0.0), p(1.0, 0.0, 0.0), p(1.0, 1.0, 0.5), p(0.0, 1.0, 0.0)];
        let face = face_from(&mut store, quad).unwrap();
        assert!(matches!(store.face(face).unwrap().surface, FaceSurface::Bilinear(_)));
    }

    #[test]
    fn collapsed_quad_is_accepted() {
        let mut store = TopologyStore::new();
        let a = p(2.0, 0.0, 0.0);
        let b = p(2.0, 0.0, 1.0);
        let face = face_from(&mut store, vec![a, b, b, a]).unwrap();
        assert!(matches!(store.face(face).unwrap().surface, FaceSurface::Bilinear(_)));
    }

    #[test]
    fn twisted_pentagon_is_rejected() {
        let mut store = TopologyStore::new();
        let pts = vec![
            p(0.0, 0.0, 0.0),
            p(1.0, 0.0, 0.0),
            p(1.5, 1.0, 0.7),
            p(0.5, 2.0, 0.0),
            p(-0.5, 1.0, 0.0),
        ];
        assert!(face_from(&mut store, pts).is_err());
    }

    #[test]
    fn open_wire_is_rejected() {
        let mut store = TopologyStore::new();
        let wire = MakeWire::new(vec![p(0.0, 0.0, 0.0), p(1.0, 0.0, 0.0), p(1.0, 1.0, 0.0)], false)
            .execute(&mut store)
            .unwrap();
        assert!(MakeFace::new(wire).execute(&mut store).is_err());
    }
}
