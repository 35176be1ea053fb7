use crate::error::{GeometryError, OperationError, Result};
use crate::math::polygon::centroid;
use crate::math::{Point3, Vector3, TOLERANCE};
use crate::operations::creation::MakeSolid;
use crate::topology::{SolidId, TopologyStore};

use super::loft::{Loft, LoftedSurface};

/// Local orthonormal frame on a centreline.
#[derive(Debug, Clone, Copy)]
pub struct Frame {
    /// Point on the centreline.
    pub origin: Point3,
    /// Unit tangent.
    pub tangent: Vector3,
    /// Unit normal.
    pub normal: Vector3,
    /// Unit binormal, `tangent x normal`.
    pub binormal: Vector3,
}

impl Frame {
    /// Builds a frame with an arbitrary normal perpendicular to `tangent`.
    ///
    /// # Errors
    ///
    /// Returns [`GeometryError::ZeroVector`] if the tangent vanishes.
    pub fn from_tangent(origin: Point3, tangent: Vector3) -> Result<Self> {
        let tangent = tangent
            .try_normalize(TOLERANCE)
            .ok_or(GeometryError::ZeroVector)?;
        let reference = if tangent.x.abs() < 0.9 {
            Vector3::x()
        } else {
            Vector3::y()
        };
        let normal = tangent.cross(&reference).normalize();
        Ok(Self {
            origin,
            tangent,
            normal,
            binormal: tangent.cross(&normal),
        })
    }

    /// Builds a frame whose normal is the part of `up` orthogonal to `tangent`.
    ///
    /// Falls back to [`Frame::from_tangent`] when `up` is parallel to the
    /// tangent.
    ///
    /// # Errors
    ///
    /// Returns [`GeometryError::ZeroVector`] if the tangent vanishes.
    pub fn from_tangent_with_up(origin: Point3, tangent: Vector3, up: Vector3) -> Result<Self> {
        let tangent = tangent
            .try_normalize(TOLERANCE)
            .ok_or(GeometryError::ZeroVector)?;
        let Some(normal) = (up - tangent * tangent.dot(&up)).try_normalize(TOLERANCE) else {
            return Self::from_tangent(origin, tangent);
        };
        Ok(Self {
            origin,
            tangent,
            normal,
            binormal: tangent.cross(&normal),
        })
    }

    /// Maps local section coordinates `(u along normal, v along binormal)` to space.
    #[must_use]
    pub fn place(&self, u: f64, v: f64) -> Point3 {
        self.origin + self.normal * u + self.binormal * v
    }
}

/// Frames along a closed polyline.
///
/// Tangents are central differences of the neighbouring points; normals
/// point away from the loop's centroid.
///
/// # Errors
///
/// Returns an error if the loop has fewer than three points or two
/// neighbours of a point coincide.
pub fn closed_loop_frames(points: &[Point3]) -> Result<Vec<Frame>> {
    let n = points.len();
    if n < 3 {
        return Err(OperationError::InvalidInput(format!(
            "closed loop needs at least 3 points, got {n}"
        ))
        .into());
    }
    let center = centroid(points);
    (0..n)
        .map(|i| {
            let prev = points[(i + n - 1) % n];
            let next = points[(i + 1) % n];
            Frame::from_tangent_with_up(points[i], next - prev, points[i] - center)
        })
        .collect()
}

/// Sweeps a planar section around a closed centreline into a tube solid.
///
/// The section is given in local `(normal, binormal)` coordinates and
/// placed at every centreline frame; consecutive placements are lofted
/// and the last connects back to the first, so the tube needs no caps.
pub struct Sweep {
    centerline: Vec<Point3>,
    section: Vec<(f64, f64)>,
}

/// The result of a [`Sweep`].
#[derive(Debug, Clone)]
pub struct SweptTube {
    /// The closed tube solid.
    pub solid: SolidId,
    /// The lofted tube wall.
    pub surface: LoftedSurface,
    /// The frame at each centreline point.
    pub frames: Vec<Frame>,
}

impl Sweep {
    /// Creates a new `Sweep` operation.
    #[must_use]
    pub fn new(centerline: Vec<Point3>, section: Vec<(f64, f64)>) -> Self {
        Self {
            centerline,
            section,
        }
    }

    /// Executes the sweep.
    ///
    /// # Errors
    ///
    /// Returns an error if the centreline or section has fewer than three
    /// points, or a frame cannot be built.
    pub fn execute(&self, store: &mut TopologyStore) -> Result<SweptTube> {
        if self.section.len() < 3 {
            return Err(OperationError::InvalidInput(
                "sweep section needs at least 3 points".into(),
            )
            .into());
        }
        let frames = closed_loop_frames(&self.centerline)?;
        let rings: Vec<Vec<Point3>> = frames
            .iter()
            .map(|frame| {
                self.section
                    .iter()
                    .map(|&(u, v)| frame.place(u, v))
                    .collect()
            })
            .collect();
        let surface = Loft::new(rings).periodic(true).execute(store)?;
        let solid = MakeSolid::new(surface.oriented_faces(true)).execute(store)?;
        Ok(SweptTube {
            solid,
            surface,
            frames,
        })
    }
}
