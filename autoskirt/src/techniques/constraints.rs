use glam::{EulerRot, Quat, Vec3};
use hecs::{Entity, World};
use itertools::Itertools;
use log::{debug, info};

use crate::{
    autoskirt_error::Warning,
    components::{
        Constraint, ConstraintKind, ConstraintSource, DynamicChain, RotationAxes,
        dynamic_chain::DEFAULT_MAX_ANGLE,
    },
    hierarchy,
    step::Step,
    util::{aim_rotation, MIN_DIRECTION_LENGTH_SQUARED},
};

/// Weight each leg contributes to the rotation follow constraint
pub const ROTATION_FOLLOW_SOURCE_WEIGHT: f32 = 0.5;

/// Attach an aim constraint to `anchor` that points its local +Y at the weighted average position of
/// `sources`, keeping its local +Z as close to scene up as possible.
///
/// The constraint is active and locked, at full weight, on every axis. The anchor's current world
/// rotation becomes its rest rotation, and the anchor is then turned to face its sources.
pub fn attach_aim_constraint(
    world: &mut World,
    step: &mut Step,
    anchor: Entity,
    sources: Vec<ConstraintSource>,
) {
    let Some(rest_rotation) = hierarchy::world_rotation(world, anchor) else {
        return;
    };

    let constraint = Constraint {
        kind: ConstraintKind::Aim {
            aim_axis: Vec3::Y,
            up_axis: Vec3::Z,
            world_up: Vec3::Y,
        },
        sources,
        axes: RotationAxes::all(),
        global_weight: 1.,
        rest_rotation,
        active: true,
        locked: true,
    };
    step.attach_constraint(world, anchor, constraint.clone());
    solve_constraint(world, anchor, &constraint);
}

/// Rotate `owner` to where `constraint` puts it in the scene as it is now.
///
/// Returns false if `owner` is gone.
pub fn solve_constraint(world: &mut World, owner: Entity, constraint: &Constraint) -> bool {
    evaluate_constraint(world, owner, constraint)
        .map_or(false, |rotation| hierarchy::set_world_rotation(world, owner, rotation))
}

/// Make `parent` follow the blended rotation of both legs at `weight`.
///
/// Each leg contributes [`ROTATION_FOLLOW_SOURCE_WEIGHT`]. The parent's current world rotation is
/// captured as the rest rotation. Returns false, with a warning, if either leg is missing.
pub fn attach_rotation_follow(
    world: &mut World,
    step: &mut Step,
    parent: Entity,
    left_leg: Option<Entity>,
    right_leg: Option<Entity>,
    weight: f32,
) -> bool {
    let left_leg = step.require(world, "left leg", left_leg);
    let right_leg = step.require(world, "right leg", right_leg);
    let (Some(left_leg), Some(right_leg)) = (left_leg, right_leg) else {
        return false;
    };
    let Some(rest_rotation) = step
        .require(world, "skirt parent", Some(parent))
        .and_then(|parent| hierarchy::world_rotation(world, parent))
    else {
        return false;
    };

    step.attach_constraint(
        world,
        parent,
        Constraint {
            kind: ConstraintKind::RotationFollow,
            sources: vec![
                ConstraintSource::new(left_leg, ROTATION_FOLLOW_SOURCE_WEIGHT),
                ConstraintSource::new(right_leg, ROTATION_FOLLOW_SOURCE_WEIGHT),
            ],
            axes: RotationAxes::all(),
            global_weight: weight,
            rest_rotation,
            active: true,
            locked: false,
        },
    );
    info!(
        "[AUTOSKIRT] {} follows the legs' rotation at weight {weight}",
        hierarchy::node_name(world, parent)
    );
    true
}

/// The world rotation `constraint` would give `owner` in the scene as it is now.
///
/// Sources that no longer exist are ignored. Returns `None` if `owner` is gone.
pub fn evaluate_constraint(world: &World, owner: Entity, constraint: &Constraint) -> Option<Quat> {
    let current = hierarchy::world_rotation(world, owner)?;
    if !constraint.active {
        return Some(current);
    }

    let rest = constraint.rest_rotation;
    let driven = match constraint.kind {
        ConstraintKind::Aim {
            aim_axis,
            up_axis,
            world_up,
        } => {
            let position = hierarchy::world_position(world, owner)?;
            weighted_mean_position(world, &constraint.sources)
                .map(|target| target - position)
                .filter(|direction| direction.length_squared() >= MIN_DIRECTION_LENGTH_SQUARED)
                .map(|direction| aim_rotation(aim_axis, up_axis, direction, world_up))
                .unwrap_or(rest)
        }
        ConstraintKind::RotationFollow => {
            weighted_mean_rotation(world, &constraint.sources).unwrap_or(rest)
        }
    };

    let blended = rest.slerp(driven, constraint.global_weight.clamp(0., 1.));
    Some(mask_axes(rest, blended, constraint.axes))
}

fn weighted_mean_position(world: &World, sources: &[ConstraintSource]) -> Option<Vec3> {
    let (sum, total) = sources
        .iter()
        .filter_map(|s| Some((hierarchy::world_position(world, s.entity)?, s.weight)))
        .fold((Vec3::ZERO, 0.), |(sum, total), (p, w)| (sum + p * w, total + w));
    (total > 0.).then(|| sum / total)
}

fn weighted_mean_rotation(world: &World, sources: &[ConstraintSource]) -> Option<Quat> {
    let rotations = sources
        .iter()
        .filter_map(|s| Some((hierarchy::world_rotation(world, s.entity)?, s.weight)))
        .collect::<Vec<_>>();
    let (first, _) = *rotations.first()?;

    // Keep every rotation in the same hemisphere as the first before summing
    let sum = rotations.iter().fold(glam::Vec4::ZERO, |sum, (q, w)| {
        let q = if q.dot(first) < 0. { -*q } else { *q };
        sum + glam::Vec4::from(q) * *w
    });
    (sum.length_squared() > f32::EPSILON).then(|| Quat::from_vec4(sum).normalize())
}

/// Keep only the enabled axes of the change from `rest` to `rotation`
fn mask_axes(rest: Quat, rotation: Quat, axes: RotationAxes) -> Quat {
    if axes.is_all() {
        return rotation;
    }
    let (x, y, z) = (rest.inverse() * rotation).to_euler(EulerRot::XYZ);
    let keep = |axis: RotationAxes, angle: f32| if axes.contains(axis) { angle } else { 0. };
    rest * Quat::from_euler(
        EulerRot::XYZ,
        keep(RotationAxes::X, x),
        keep(RotationAxes::Y, y),
        keep(RotationAxes::Z, z),
    )
}

/// The smallest distance between any two of `points`.
///
/// `None` if there are fewer than two points, which is distinct from `Some(0.)` for coincident ones.
pub fn min_pairwise_distance(points: &[Vec3]) -> Option<f32> {
    points
        .iter()
        .tuple_combinations()
        .map(|(a, b)| a.distance(*b))
        .reduce(f32::min)
}

/// Collision radius for the bones of a chain rooted at `parent`: half the smallest gap between any
/// two bone tips, scaled by `multiplier`. `None` if there are fewer than two tips.
pub fn chain_radius(world: &World, parent: Entity, multiplier: f32) -> Option<f32> {
    let tips = hierarchy::leaf_nodes(world, &hierarchy::children_of(world, parent))
        .into_iter()
        .filter_map(|tip| hierarchy::world_position(world, tip))
        .collect::<Vec<_>>();
    debug!("[AUTOSKIRT] Found {} skirt bone tips", tips.len());
    min_pairwise_distance(&tips).map(|distance| distance / 2. * multiplier)
}

/// Create, or replace, the dynamic chain rooted at `parent`.
///
/// Any existing chain on `parent` is discarded along with its colliders. The new chain's radius is
/// left unset, with a warning, if it cannot be inferred from the bone tips.
pub fn configure_dynamic_chain(
    world: &mut World,
    step: &mut Step,
    parent: Entity,
    radius_multiplier: f32,
) -> Option<DynamicChain> {
    let parent = step.require(world, "skirt parent", Some(parent))?;
    let name = hierarchy::node_name(world, parent);
    if world.get::<&DynamicChain>(parent).is_ok() {
        info!("[AUTOSKIRT] Dynamic chain already exists on {name}, replacing");
    }

    let radius = chain_radius(world, parent, radius_multiplier);
    match radius {
        Some(radius) => {
            info!("[AUTOSKIRT] Set chain radius to {radius:.4} based on skirt bone tips")
        }
        None => step.warn(Warning::DegenerateGeometry {
            technique: step.technique,
            reason: "Not enough skirt bone tip points to compute radius".to_string(),
        }),
    }

    let chain = DynamicChain {
        radius,
        max_angle: DEFAULT_MAX_ANGLE,
        colliders: Vec::new(),
    };
    step.set_chain(world, parent, chain.clone());
    Some(chain)
}

/// Replace the colliders of the chain rooted at `parent` with `colliders`.
///
/// Returns false, with a warning, if `parent` has no chain.
pub fn attach_chain_colliders(
    world: &mut World,
    step: &mut Step,
    parent: Entity,
    colliders: &[Entity],
) -> bool {
    let Some(parent) = step.require(world, "skirt parent", Some(parent)) else {
        return false;
    };
    let existing = world.get::<&DynamicChain>(parent).ok().map(|c| (*c).clone());
    let Some(chain) = existing else {
        step.warn(Warning::MissingReference {
            technique: step.technique,
            role: "dynamic chain",
        });
        return false;
    };

    step.set_chain(
        world,
        parent,
        DynamicChain {
            colliders: colliders.to_vec(),
            ..chain
        },
    );
    true
}
