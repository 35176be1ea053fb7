mod loft;
mod sweep;

pub use loft::{polygon_cap, ring_cap, Loft, LoftWinding, LoftedSurface};
pub use sweep::{closed_loop_frames, Frame, Sweep, SweptTube};
