use bitflags::bitflags;
use glam::{Quat, Vec3};
use hecs::Entity;

bitflags! {
    /// Which rotational axes a constraint is allowed to drive
    pub struct RotationAxes: u8 {
        /// Rotation about X
        const X = 0b001;
        /// Rotation about Y
        const Y = 0b010;
        /// Rotation about Z
        const Z = 0b100;
    }
}

/// A single weighted source of a [`Constraint`]
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ConstraintSource {
    /// The node being followed
    pub entity: Entity,
    /// How much this source contributes. Weights across sources need not sum to one.
    pub weight: f32,
}

impl ConstraintSource {
    /// Create a new source
    pub fn new(entity: Entity, weight: f32) -> Self {
        Self { entity, weight }
    }
}

/// What a [`Constraint`] does with its sources
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ConstraintKind {
    /// Point `aim_axis` at the weighted average position of the sources, keeping `up_axis` as close
    /// to `world_up` as possible
    Aim {
        /// Local axis that is aimed at the sources
        aim_axis: Vec3,
        /// Local axis that is kept close to `world_up`
        up_axis: Vec3,
        /// Scene up, used to resolve the roll around `aim_axis`
        world_up: Vec3,
    },
    /// Blend the rotations of the sources into the owner
    RotationFollow,
}

/// A rotational constraint attached to a node
#[derive(Debug, Clone, PartialEq)]
pub struct Constraint {
    /// What the constraint does
    pub kind: ConstraintKind,
    /// Weighted source nodes
    pub sources: Vec<ConstraintSource>,
    /// Axes the constraint affects
    pub axes: RotationAxes,
    /// 0 leaves the owner unaffected, 1 fully drives it
    pub global_weight: f32,
    /// The owner's world rotation when the constraint was bound
    pub rest_rotation: Quat,
    /// Is the constraint evaluated at all?
    pub active: bool,
    /// Is the rest rotation locked, or may the host recapture it?
    pub locked: bool,
}

/// All constraints attached to a node, in the order they were attached.
///
/// Attaching never deduplicates: callers must remove stale constraints before attaching again.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Constraints(pub Vec<Constraint>);
