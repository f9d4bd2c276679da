#![allow(missing_docs)]
pub mod children;
pub mod collider;
pub mod constraint;
pub mod dynamic_chain;
pub mod global_transform;
pub mod info;
pub mod local_transform;
pub mod parent;
pub mod root;
pub mod skinned_mesh;

pub use children::Children;
pub use collider::Collider;
pub use constraint::{Constraint, ConstraintKind, ConstraintSource, Constraints, RotationAxes};
pub use dynamic_chain::DynamicChain;
pub use global_transform::GlobalTransform;
pub use info::Info;
pub use local_transform::LocalTransform;
pub use parent::Parent;
pub use root::Root;
pub use skinned_mesh::SkinnedMesh;
