mod make_face;
mod make_solid;
mod make_wire;

pub use make_face::{surface_for_boundary, MakeFace};
pub use make_solid::MakeSolid;
pub use make_wire::MakeWire;
