use super::face::OrientedFace;

slotmap::new_key_type! {
    /// Unique identifier for a shell in the topology store.
    pub struct ShellId;
}

/// A connected set of oriented faces bounding a region.
#[derive(Debug, Clone)]
pub struct ShellData {
    /// The faces that make up this shell, oriented outward from the material.
    pub faces: Vec<OrientedFace>,
    /// Whether this shell is closed (watertight).
    pub is_closed: bool,
}
