/// Component that adds some information about the entity
/// Node names are how bones are found, so every node in the hierarchy carries one
#[derive(Debug, Clone, Eq, PartialEq, Hash, Default)]
pub struct Info {
    /// A helpful name
    pub name: String,
    /// Node ID from the original glTF file, if the node was imported
    pub node_id: Option<usize>,
}

impl Info {
    /// Info for a node created at runtime
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            node_id: None,
        }
    }
}
