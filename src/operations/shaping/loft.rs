use crate::error::{OperationError, Result};
use crate::math::polygon::{centroid, newell_normal};
use crate::math::Point3;
use crate::operations::creation::{MakeFace, MakeWire};
use crate::topology::{FaceId, OrientedFace, TopologyStore, VertexData, VertexId};

/// Vertex order used for the ruled quads of a loft.
///
/// With rings indexed by `i` and ring points by `j`:
/// - `Standard`: `(i,j) (i+1,j) (i+1,j+1) (i,j+1)`
/// - `Flipped`: `(i,j) (i,j+1) (i+1,j+1) (i+1,j)`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoftWinding {
    /// Quads advance along the rings first.
    Standard,
    /// Quads advance around each ring first.
    Flipped,
}

/// Lofts a sequence of closed rings into a ruled surface.
///
/// Point `j` of ring `i` is connected only to point `j` of ring `i + 1`,
/// giving one quad face per ring interval and ring point. Unless a winding
/// is forced, the quads are wound so that their normals point away from
/// the loft's centreline.
pub struct Loft {
    profiles: Vec<Vec<Point3>>,
    periodic: bool,
    winding: Option<LoftWinding>,
}

/// The result of a [`Loft`]: the vertex grid and its quad faces.
#[derive(Debug, Clone)]
pub struct LoftedSurface {
    /// `grid[i][j]` is point `j` of ring `i`.
    pub grid: Vec<Vec<VertexId>>,
    /// Quad faces, `faces[segment * num_points + j]`.
    pub faces: Vec<FaceId>,
    /// Whether the last ring connects back to the first.
    pub periodic: bool,
    /// Quad vertex order used.
    pub winding: LoftWinding,
}

impl Loft {
    /// Creates a new open `Loft` through the given rings.
    #[must_use]
    pub fn new(profiles: Vec<Vec<Point3>>) -> Self {
        Self {
            profiles,
            periodic: false,
            winding: None,
        }
    }

    /// Connects the last ring back to the first, closing the surface into a tube.
    #[must_use]
    pub fn periodic(mut self, periodic: bool) -> Self {
        self.periodic = periodic;
        self
    }

    /// Forces the quad winding instead of detecting it.
    #[must_use]
    pub fn with_winding(mut self, winding: LoftWinding) -> Self {
        self.winding = Some(winding);
        self
    }

    /// Executes the loft, creating vertices and faces in the store.
    ///
    /// # Errors
    ///
    /// Returns [`OperationError::InvalidInput`] if there are fewer than two
    /// rings (three for a periodic loft), rings differ in length, or a ring
    /// has fewer than three points.
    pub fn execute(&self, store: &mut TopologyStore) -> Result<LoftedSurface> {
        let min_rings = if self.periodic { 3 } else { 2 };
        if self.profiles.len() < min_rings {
            return Err(OperationError::InvalidInput(format!(
                "loft needs at least {min_rings} rings, got {}",
                self.profiles.len()
            ))
            .into());
        }
        let m = self.profiles[0].len();
        if m < 3 {
            return Err(
                OperationError::InvalidInput("loft rings need at least 3 points".into()).into(),
            );
        }
        if let Some(bad) = self.profiles.iter().position(|ring| ring.len() != m) {
            return Err(OperationError::InvalidInput(format!(
                "ring {bad} has {} points, expected {m}",
                self.profiles[bad].len()
            ))
            .into());
        }

        let winding = self
            .winding
            .unwrap_or_else(|| detect_winding(&self.profiles[0], &self.profiles[1]));

        let grid: Vec<Vec<VertexId>> = self
            .profiles
            .iter()
            .map(|ring| {
                ring.iter()
                    .map(|&p| store.add_vertex(VertexData::new(p)))
                    .collect()
            })
            .collect();

        let n = grid.len();
        let segments = if self.periodic { n } else { n - 1 };
        let mut faces = Vec::with_capacity(segments * m);
        for i in 0..segments {
            let next = (i + 1) % n;
            for j in 0..m {
                let k = (j + 1) % m;
                let quad = match winding {
                    LoftWinding::Standard => {
                        vec![grid[i][j], grid[next][j], grid[next][k], grid[i][k]]
                    }
                    LoftWinding::Flipped => {
                        vec![grid[i][j], grid[i][k], grid[next][k], grid[next][j]]
                    }
                };
                let wire = MakeWire::from_vertices(quad, true).execute(store)?;
                faces.push(MakeFace::new(wire).execute(store)?);
            }
        }

        Ok(LoftedSurface {
            grid,
            faces,
            periodic: self.periodic,
            winding,
        })
    }
}

impl LoftedSurface {
    /// Number of points per ring.
    #[must_use]
    pub fn num_points(&self) -> usize {
        self.grid.first().map_or(0, Vec::len)
    }

    /// The quad between rings `segment` and `segment + 1` starting at point `j`.
    #[must_use]
    pub fn face(&self, segment: usize, j: usize) -> Option<FaceId> {
        self.faces.get(segment * self.num_points() + j).copied()
    }

    /// All faces with the given orientation.
    #[must_use]
    pub fn oriented_faces(&self, forward: bool) -> Vec<OrientedFace> {
        self.faces
            .iter()
            .map(|&f| OrientedFace::new(f, forward))
            .collect()
    }

    /// The first ring, ordered the way the surface traverses it.
    #[must_use]
    pub fn start_loop(&self) -> Vec<VertexId> {
        let mut ring = self.grid.first().cloned().unwrap_or_default();
        if self.winding == LoftWinding::Standard {
            ring.reverse();
        }
        ring
    }

    /// The last ring, ordered the way the surface traverses it.
    #[must_use]
    pub fn end_loop(&self) -> Vec<VertexId> {
        let mut ring = self.grid.last().cloned().unwrap_or_default();
        if self.winding == LoftWinding::Flipped {
            ring.reverse();
        }
        ring
    }
}

/// Closes a boundary loop with a single planar face wound against it.
///
/// # Errors
///
/// Returns an error if the loop is not planar or has fewer than three points.
pub fn polygon_cap(store: &mut TopologyStore, boundary: &[VertexId]) -> Result<FaceId> {
    let ids: Vec<VertexId> = boundary.iter().rev().copied().collect();
    let wire = MakeWire::from_vertices(ids, true).execute(store)?;
    MakeFace::new(wire).execute(store)
}

/// Closes the gap between two aligned boundary loops with quads.
///
/// `outer` belongs to a surface used forward by the shell and `inner` to
/// one used reversed; both must be listed in their own surface's traversal
/// order, index-aligned.
///
/// # Errors
///
/// Returns an error if the loops differ in length or a quad cannot be built.
pub fn ring_cap(
    store: &mut TopologyStore,
    outer: &[VertexId],
    inner: &[VertexId],
) -> Result<Vec<FaceId>> {
    if outer.len() != inner.len() || outer.len() < 3 {
        return Err(OperationError::InvalidInput(format!(
            "ring cap loops must match: {} vs {} points",
            outer.len(),
            inner.len()
        ))
        .into());
    }
    let m = outer.len();
    let mut faces = Vec::with_capacity(m);
    for p in 0..m {
        let q = (p + 1) % m;
        let quad = vec![outer[q], outer[p], inner[p], inner[q]];
        let wire = MakeWire::from_vertices(quad, true).execute(store)?;
        faces.push(MakeFace::new(wire).execute(store)?);
    }
    Ok(faces)
}

/// Picks the winding whose first-interval quads face away from the centreline.
fn detect_winding(first: &[Point3], second: &[Point3]) -> LoftWinding {
    let axis = nalgebra::center(&centroid(first), &centroid(second));
    let m = first.len();
    let score: f64 = (0..m)
        .map(|j| {
            let k = (j + 1) % m;
            let quad = [first[j], second[j], second[k], first[k]];
            newell_normal(&quad).dot(&(centroid(&quad) - axis))
        })
        .sum();
    if score < 0.0 {
        LoftWinding::Flipped
    } else {
        LoftWinding::Standard
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use approx::assert_relative_eq;

    use super::*;
    use crate::operations::creation::MakeSolid;
    use crate::operations::query::{IsValid, Volume};

    /// Square of side `2h` in the plane `x = x0`, counter-clockwise seen from +x.
    fn square(x0: f64, h: f64) -> Vec<Point3> {
        vec![
            Point3::new(x0, -h, -h),
            Point3::new(x0, h, -h),
            Point3::new(x0, h, h),
            Point3::new(x0, -h, h),
        ]
    }

    fn capped_prism(
        store: &mut TopologyStore,
        profiles: Vec<Vec<Point3>>,
    ) -> crate::topology::SolidId {
        let surface = Loft::new(profiles).execute(store).unwrap();
        let mut faces = surface.oriented_faces(true);
        faces.push(OrientedFace::new(polygon_cap(store, &surface.start_loop()).unwrap(), true));
        faces.push(OrientedFace::new(polygon_cap(store, &surface.end_loop()).unwrap(), true));
        MakeSolid::new(faces).execute(store).unwrap()
    }

    #[test]
    fn capped_loft_is_watertight_with_positive_volume() {
        let mut store = TopologyStore::new();
        let profiles = vec![square(0.0, 0.5), square(1.0, 0.5), square(2.0, 0.5)];
        let solid = capped_prism(&mut store, profiles);
        assert!(IsValid::new(solid).execute(&store));
        let volume = Volume::new(solid).execute(&store).unwrap();
        assert_relative_eq!(volume, 2.0, epsilon = 1e-9);
    }

    #[test]
    fn reversed_ring_order_is_still_outward() {
        let mut store = TopologyStore::new();
        let reversed = |x0| square(x0, 0.5).into_iter().rev().collect::<Vec<_>>();
        let solid = capped_prism(&mut store, vec![reversed(0.0), reversed(1.0)]);
        let volume = Volume::new(solid).execute(&store).unwrap();
        assert_relative_eq!(volume, 1.0, epsilon = 1e-9);
    }

    #[test]
    fn ring_cap_closes_shell_between_surfaces() {
        let mut store = TopologyStore::new();
        let outer = Loft::new(vec![square(0.0, 1.0), square(2.0, 1.0)])
            .execute(&mut store)
            .unwrap();
        let inner = Loft::new(vec![square(0.0, 0.5), square(2.0, 0.5)])
            .with_winding(outer.winding)
            .execute(&mut store)
            .unwrap();

        let mut faces = outer.oriented_faces(true);
        faces.extend(inner.oriented_faces(false));
        for f in ring_cap(&mut store, &outer.start_loop(), &inner.start_loop()).unwrap() {
            faces.push(OrientedFace::new(f, true));
        }
        for f in ring_cap(&mut store, &outer.end_loop(), &inner.end_loop()).unwrap() {
            faces.push(OrientedFace::new(f, true));
        }
        let solid = MakeSolid::new(faces).execute(&mut store).unwrap();
        assert!(IsValid::new(solid).execute(&store));
        let volume = Volume::new(solid).execute(&store).unwrap();
        assert_relative_eq!(volume, 2.0 * (4.0 - 1.0), epsilon = 1e-9);
    }

    #[test]
    fn quads_connect_matching_indices_only() {
        let mut store = TopologyStore::new();
        let surface = Loft::new(vec![square(0.0, 1.0), square(1.0, 1.0), square(2.0, 1.0)])
            .execute(&mut store)
            .unwrap();
        assert_eq!(surface.faces.len(), 2 * 4);
        for seg in 0..2 {
            for j in 0..4 {
                let face = surface.face(seg, j).unwrap();
                let mut ids = store.face_vertices(face).unwrap();
                ids.sort();
                let mut expected = vec![
                    surface.grid[seg][j],
                    surface.grid[seg][(j + 1) % 4],
                    surface.grid[seg + 1][j],
                    surface.grid[seg + 1][(j + 1) % 4],
                ];
                expected.sort();
                assert_eq!(ids, expected);
            }
        }
    }

    #[test]
    fn periodic_loft_closes_without_boundary() {
        let mut store = TopologyStore::new();
        // Square tube bent around the z axis.
        let rings: Vec<Vec<Point3>> = (0..6)
            .map(|i| {
                let phi = f64::from(i) * std::f64::consts::TAU / 6.0;
                let (s, c) = phi.sin_cos();
                [(4.5, -0.5), (5.5, -0.5), (5.5, 0.5), (4.5, 0.5)]
                    .iter()
                    .map(|&(r, z)| Point3::new(r * c, r * s, z))
                    .collect()
            })
            .collect();
        let surface = Loft::new(rings).periodic(true).execute(&mut store).unwrap();
        let solid = MakeSolid::new(surface.oriented_faces(true)).execute(&mut store).unwrap();
        assert!(IsValid::new(solid).execute(&store));
        assert!(Volume::new(solid).execute(&store).unwrap() > 0.0);
    }

    #[test]
    fn mismatched_rings_are_rejected() {
        let mut store = TopologyStore::new();
        let mut short = square(1.0, 1.0);
        short.pop();
        assert!(Loft::new(vec![square(0.0, 1.0), short]).execute(&mut store).is_err());
    }
}
