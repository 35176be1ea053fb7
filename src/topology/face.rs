use crate::geometry::surface::{BilinearPatch, Plane};

use super::wire::WireId;

slotmap::new_key_type! {
    /// Unique identifier for a face in the topology store.
    pub struct FaceId;
}

/// The geometric surface associated with a face.
#[derive(Debug, Clone)]
pub enum FaceSurface {
    /// A planar polygon (end caps, cross-section rings in a poloidal plane).
    Plane(Plane),
    /// A four-sided ruled patch (lofted and swept side quads).
    Bilinear(BilinearPatch),
}

/// Data associated with a topological face.
///
/// The outer wire's winding defines the face normal by the right-hand rule.
#[derive(Debug, Clone)]
pub struct FaceData {
    /// The geometric surface on which this face lies.
    pub surface: FaceSurface,
    /// The boundary wire.
    pub outer_wire: WireId,
}

/// A face as used by one shell.
///
/// Adjacent layers of an in-vessel build can share a face; each shell then
/// sees it with opposite orientation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OrientedFace {
    /// The face identifier.
    pub face: FaceId,
    /// If `false`, the shell uses the face with its normal reversed.
    pub forward: bool,
}

impl OrientedFace {
    /// Creates a new oriented face.
    #[must_use]
    pub fn new(face: FaceId, forward: bool) -> Self {
        Self { face, forward }
    }

    /// Returns the same face with opposite orientation.
    #[must_use]
    pub fn reversed(self) -> Self {
        Self {
            face: self.face,
            forward: !self.forward,
        }
    }
}
