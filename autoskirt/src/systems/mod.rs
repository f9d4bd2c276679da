/// Refresh every node's cached world transform
pub mod update_global_transform;

pub use update_global_transform::update_global_transform_system;
