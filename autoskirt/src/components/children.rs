use hecs::Entity;

/// The ordered list of an entity's children.
///
/// The order is the order children were imported or attached in, and is what makes pre-order
/// traversals of the hierarchy stable.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Children(pub Vec<Entity>);

impl Children {
    /// Does this entity have no children?
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}
