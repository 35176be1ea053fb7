mod bilinear;
mod plane;

pub use bilinear::BilinearPatch;
pub use plane::Plane;
