//! The individual steps of an apply. Each one can be run on its own against a [`hecs::World`],
//! recording what it changed into a [`crate::step::Step`].

/// Creating the skirt parent and finding the hips
pub mod auto_parent;
/// Capsule colliders between the legs
pub mod collider_placement;
/// Aim and rotation follow constraints, and the dynamic chain
pub mod constraints;
/// Fitting capsule radii to skinned vertices
pub mod radius_fitting;

pub use auto_parent::{compute_parent_position, find_hips, place_auto_parent, ParentPlacement};
pub use collider_placement::{
    anchor_rotation, capsule_height, place_colliders, CapsuleParameters, Link, LinkPattern,
};
pub use constraints::{
    attach_aim_constraint, attach_chain_colliders, attach_rotation_follow, chain_radius,
    configure_dynamic_chain, evaluate_constraint, min_pairwise_distance, solve_constraint,
};
pub use radius_fitting::{fit_capsule_radius, fit_limb_radius, RadiusFit};
