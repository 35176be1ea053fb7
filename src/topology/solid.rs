use super::shell::ShellId;

slotmap::new_key_type! {
    /// Unique identifier for a solid in the topology store.
    pub struct SolidId;
}

/// A bounded volume enclosed by a single closed shell.
///
/// Layered in-vessel solids are thick-walled tube segments whose inner and
/// outer surfaces are joined by end caps, so one shell always suffices.
#[derive(Debug, Clone)]
pub struct SolidData {
    /// The boundary shell of the solid.
    pub shell: ShellId,
}
