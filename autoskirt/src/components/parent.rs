use hecs::Entity;

/// Component added to indicate that an entity has a parent
/// Kept in sync with the parent's [`super::Children`] by the functions in [`crate::hierarchy`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Parent(pub Entity);
