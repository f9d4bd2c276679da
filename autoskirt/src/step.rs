use std::fmt;

use glam::Affine3A;
use hecs::{Entity, World};
use log::warn;

use crate::{
    autoskirt_error::Warning,
    components::{Collider, Constraint, Constraints, DynamicChain},
    hierarchy::{self, ParentChange},
};

/// The independently toggleable parts of an apply
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Technique {
    /// Creating the skirt parent above the skirt bones
    AutoParent,
    /// Making the skirt parent follow the legs' rotation
    RotationFollow,
    /// Fitting collider radii to the leg mesh
    RadiusFit,
    /// Leg to opposite knee colliders
    CrossingColliders,
    /// Knee to knee colliders
    LateralColliders,
    /// Leg to knee colliders
    StraightColliders,
    /// Creating or replacing the dynamic chain on the skirt parent
    DynamicChain,
    /// Handing the generated colliders to the dynamic chain
    ChainColliders,
}

impl fmt::Display for Technique {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Technique::AutoParent => "Auto parent",
            Technique::RotationFollow => "Rotation follow",
            Technique::RadiusFit => "Radius fit",
            Technique::CrossingColliders => "Crossing colliders",
            Technique::LateralColliders => "Lateral colliders",
            Technique::StraightColliders => "Straight colliders",
            Technique::DynamicChain => "Dynamic chain",
            Technique::ChainColliders => "Chain colliders",
        };
        f.write_str(name)
    }
}

/// A single reversible change to the scene
#[derive(Debug, Clone)]
pub enum Mutation {
    /// A node was created
    Spawned(Entity),
    /// A node was moved to a new parent
    Reparented(ParentChange),
    /// A collider was attached to a node
    ColliderAttached(Entity),
    /// A constraint was pushed onto a node's [`Constraints`]
    ConstraintAttached(Entity),
    /// A node's dynamic chain was set, replacing `previous`
    ChainSet {
        /// The chain root
        entity: Entity,
        /// The chain that was there before, if any
        previous: Option<DynamicChain>,
    },
}

/// Everything one technique did to the scene, and everything that went wrong along the way.
///
/// Steps are independent: reverting one never requires reverting another, except that nodes
/// created by an earlier step must outlive the later steps that touched them.
#[derive(Debug, Clone)]
pub struct Step {
    /// Which technique this step belongs to
    pub technique: Technique,
    /// Changes made, in the order they were made
    pub mutations: Vec<Mutation>,
    /// Non-fatal problems raised while running the technique
    pub warnings: Vec<Warning>,
}

impl Step {
    /// An empty step for `technique`
    pub fn new(technique: Technique) -> Self {
        Self {
            technique,
            mutations: Vec::new(),
            warnings: Vec::new(),
        }
    }

    /// Did this step leave the scene untouched?
    pub fn is_empty(&self) -> bool {
        self.mutations.is_empty()
    }

    /// Record a warning, logging it as it happens
    pub fn warn(&mut self, warning: Warning) {
        warn!("[AUTOSKIRT] {warning}");
        self.warnings.push(warning);
    }

    /// Check a node reference before it is used, warning if it is unset or has been removed
    pub fn require(
        &mut self,
        world: &World,
        role: &'static str,
        node: Option<Entity>,
    ) -> Option<Entity> {
        let technique = self.technique;
        match node {
            None => {
                self.warn(Warning::MissingReference { technique, role });
                None
            }
            Some(entity) if !hierarchy::is_alive(world, entity) => {
                self.warn(Warning::StaleReference { technique, role });
                None
            }
            Some(entity) => Some(entity),
        }
    }

    pub(crate) fn spawn_node(
        &mut self,
        world: &mut World,
        name: &str,
        parent: Option<Entity>,
        global: Affine3A,
    ) -> Entity {
        let entity = hierarchy::spawn_node(world, name, parent, global);
        self.mutations.push(Mutation::Spawned(entity));
        entity
    }

    /// Reparent keeping the world transform. Returns false, with a warning, if the move was refused.
    pub(crate) fn set_parent(
        &mut self,
        world: &mut World,
        entity: Entity,
        new_parent: Option<Entity>,
    ) -> bool {
        match hierarchy::set_parent_keep_world(world, entity, new_parent) {
            Some(change) => {
                self.mutations.push(Mutation::Reparented(change));
                true
            }
            None => {
                let node = hierarchy::node_name(world, entity);
                self.warn(Warning::HierarchyCycle {
                    technique: self.technique,
                    node,
                });
                false
            }
        }
    }

    pub(crate) fn attach_collider(
        &mut self,
        world: &mut World,
        entity: Entity,
        collider: Collider,
    ) {
        if world.insert_one(entity, collider).is_ok() {
            self.mutations.push(Mutation::ColliderAttached(entity));
        }
    }

    pub(crate) fn attach_constraint(
        &mut self,
        world: &mut World,
        entity: Entity,
        constraint: Constraint,
    ) {
        let has_constraints = world.get::<&Constraints>(entity).is_ok();
        if !has_constraints && world.insert_one(entity, Constraints::default()).is_err() {
            return;
        }
        if let Ok(mut constraints) = world.get::<&mut Constraints>(entity) {
            constraints.0.push(constraint);
            self.mutations.push(Mutation::ConstraintAttached(entity));
        }
    }

    pub(crate) fn set_chain(&mut self, world: &mut World, entity: Entity, chain: DynamicChain) {
        let previous = world.remove_one::<DynamicChain>(entity).ok();
        if world.insert_one(entity, chain).is_ok() {
            self.mutations.push(Mutation::ChainSet { entity, previous });
        }
    }

    /// Undo every mutation in this step, newest first
    pub fn revert(self, world: &mut World) {
        for mutation in self.mutations.into_iter().rev() {
            match mutation {
                Mutation::Spawned(entity) => hierarchy::despawn_node(world, entity),
                Mutation::Reparented(change) => hierarchy::restore_parent(world, &change),
                Mutation::ColliderAttached(entity) => {
                    let _ = world.remove_one::<Collider>(entity);
                }
                Mutation::ConstraintAttached(entity) => {
                    let now_empty = world
                        .get::<&mut Constraints>(entity)
                        .map(|mut c| {
                            c.0.pop();
                            c.0.is_empty()
                        })
                        .unwrap_or(false);
                    if now_empty {
                        let _ = world.remove_one::<Constraints>(entity);
                    }
                }
                Mutation::ChainSet { entity, previous } => {
                    let _ = world.remove_one::<DynamicChain>(entity);
                    if let Some(previous) = previous {
                        let _ = world.insert_one(entity, previous);
                    }
                }
            }
        }
    }
}
