mod copy;
mod general;
mod rotate;

pub use copy::CopySolids;
pub use general::GeneralTransform;
pub use rotate::Rotate;
