use std::f32::consts::FRAC_PI_2;

use glam::{Affine3A, Quat, Vec3};
use hecs::{Entity, World};
use log::info;

use crate::{
    autoskirt_error::Warning,
    components::{Collider, ConstraintSource},
    config::LegSelection,
    hierarchy,
    step::{Step, Technique},
    techniques::constraints::attach_aim_constraint,
    util::{look_rotation, MIN_DIRECTION_LENGTH_SQUARED},
};

/// The shapes colliders can be laid out in between the legs
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LinkPattern {
    /// Each leg to the opposite knee, forming an X
    Crossing,
    /// Knee to knee
    Lateral,
    /// Each leg to its own knee
    Straight,
}

impl LinkPattern {
    /// The technique that places this pattern
    pub fn technique(&self) -> Technique {
        match self {
            LinkPattern::Crossing => Technique::CrossingColliders,
            LinkPattern::Lateral => Technique::LateralColliders,
            LinkPattern::Straight => Technique::StraightColliders,
        }
    }

    /// Should the anchors keep aiming at their targets when the legs move?
    pub fn tracks_target(&self) -> bool {
        !matches!(self, LinkPattern::Straight)
    }

    /// The links this pattern is made of, in output order
    pub fn links(&self, legs: &LegSelection) -> Vec<Link> {
        match self {
            LinkPattern::Crossing => vec![
                Link::new("SkirtX_Collider_LL_to_RK", "left leg", legs.left_leg, "right knee", legs.right_knee),
                Link::new("SkirtX_Collider_RL_to_LK", "right leg", legs.right_leg, "left knee", legs.left_knee),
            ],
            LinkPattern::Lateral => vec![
                Link::new("SkirtT_Collider_0", "left knee", legs.left_knee, "right knee", legs.right_knee),
                Link::new("SkirtT_Collider_1", "right knee", legs.right_knee, "left knee", legs.left_knee),
            ],
            LinkPattern::Straight => vec![
                Link::new("SkirtLeg_Collider_0", "right leg", legs.right_leg, "right knee", legs.right_knee),
                Link::new("SkirtLeg_Collider_1", "left leg", legs.left_leg, "left knee", legs.left_knee),
            ],
        }
    }
}

/// A single collider to be placed between two nodes
#[derive(Debug, Clone, PartialEq)]
pub struct Link {
    /// Name of the anchor node that will carry the collider
    pub name: &'static str,
    /// The node the anchor is attached to
    pub from: Option<Entity>,
    /// The node the collider reaches towards
    pub to: Option<Entity>,
    from_role: &'static str,
    to_role: &'static str,
}

impl Link {
    /// Create a new link. The roles are used to name missing endpoints in warnings.
    pub fn new(
        name: &'static str,
        from_role: &'static str,
        from: Option<Entity>,
        to_role: &'static str,
        to: Option<Entity>,
    ) -> Self {
        Self {
            name,
            from,
            to,
            from_role,
            to_role,
        }
    }
}

/// Size and shape parameters shared by every link of a pattern
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CapsuleParameters {
    /// Capsule radius
    pub radius: f32,
    /// Scales the distance between the endpoints before the caps are added
    pub length_multiplier: f32,
}

/// Total capsule length: the (scaled) distance between the endpoints plus a cap at each end
pub fn capsule_height(distance: f32, radius: f32, length_multiplier: f32) -> f32 {
    distance * length_multiplier + 2. * radius
}

/// World rotation of an anchor placed at `from` for a link towards `to`.
///
/// The anchor's +Z faces `to` with +Y kept as close to scene up as possible. Coincident endpoints
/// leave the anchor unrotated. Straight links are then rolled 90 degrees about the anchor's own X
/// so that the capsule's +Y axis runs along the link. Crossing and lateral anchors keep this as the
/// rest rotation of their aim constraint, which turns +Y onto the link when it is attached.
pub fn anchor_rotation(from: Vec3, to: Vec3, pattern: LinkPattern) -> Quat {
    let direction = to - from;
    let facing = if direction.length_squared() < MIN_DIRECTION_LENGTH_SQUARED {
        Quat::IDENTITY
    } else {
        look_rotation(direction.normalize(), Vec3::Y)
    };

    match pattern {
        LinkPattern::Straight => facing * Quat::from_rotation_x(FRAC_PI_2),
        _ => facing,
    }
}

/// Build a collider anchor for every link of `pattern`.
///
/// The result has one entry per link, in link order; links with a missing endpoint are skipped with
/// a warning and show up as `None`.
pub fn place_colliders(
    world: &mut World,
    step: &mut Step,
    pattern: LinkPattern,
    links: &[Link],
    parameters: CapsuleParameters,
) -> Vec<Option<Entity>> {
    links
        .iter()
        .map(|link| place_link(world, step, pattern, link, parameters))
        .collect()
}

fn place_link(
    world: &mut World,
    step: &mut Step,
    pattern: LinkPattern,
    link: &Link,
    parameters: CapsuleParameters,
) -> Option<Entity> {
    let from = step.require(world, link.from_role, link.from);
    let to = step.require(world, link.to_role, link.to);
    let (from, to) = (from?, to?);

    let (Some(from_position), Some(to_position)) = (
        hierarchy::world_position(world, from),
        hierarchy::world_position(world, to),
    ) else {
        step.warn(Warning::StaleReference {
            technique: pattern.technique(),
            role: link.from_role,
        });
        return None;
    };

    let distance = from_position.distance(to_position);
    if distance * distance < MIN_DIRECTION_LENGTH_SQUARED {
        step.warn(Warning::DegenerateGeometry {
            technique: pattern.technique(),
            reason: format!("{} endpoints coincide; using identity rotation", link.name),
        });
    }

    let rotation = anchor_rotation(from_position, to_position, pattern);
    let anchor = step.spawn_node(
        world,
        link.name,
        Some(from),
        Affine3A::from_rotation_translation(rotation, from_position),
    );

    let height = capsule_height(distance, parameters.radius, parameters.length_multiplier);
    step.attach_collider(world, anchor, Collider::capsule(parameters.radius, height));

    if pattern.tracks_target() {
        attach_aim_constraint(world, step, anchor, vec![ConstraintSource::new(to, 1.)]);
    }

    info!(
        "[AUTOSKIRT] Collider: {} at {from_position} (radius {:.4}, height {height:.4})",
        link.name, parameters.radius
    );

    Some(anchor)
}
