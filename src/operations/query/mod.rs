mod bounding_box;
mod is_valid;
mod volume;

pub use bounding_box::{Aabb, BoundingBox};
pub use is_valid::{open_edges, IsValid};
pub use volume::Volume;
