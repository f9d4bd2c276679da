use glam::{Affine3A, Quat, Vec3};
use hecs::{Entity, World};
use log::{debug, info};

use crate::{autoskirt_error::Warning, components::SkinnedMesh, hierarchy, step::Technique};

/// Segments shorter than this cannot be aligned and produce a zero radius
pub const MIN_SEGMENT_LENGTH: f32 = 1e-3;

/// Default minimum weight a vertex must have on the proximal bone to be considered
pub const DEFAULT_WEIGHT_THRESHOLD: f32 = 0.8;

/// The result of fitting a capsule around a limb segment
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct RadiusFit {
    /// The smallest radius enclosing every qualifying vertex
    pub radius: f32,
    /// How many vertices qualified
    pub included: usize,
}

/// Compute the smallest capsule radius that encloses every vertex of `mesh` that is weighted to
/// bone `bone_index` by at least `threshold` and lies between `proximal` and `distal`.
///
/// Vertices are moved into a space where the proximal to distal segment runs along +Y from the
/// origin; a vertex qualifies if its Y lies in `[0, length]`, and the radius is the largest XZ
/// distance among qualifying vertices. The result does not depend on vertex order.
pub fn fit_capsule_radius(
    mesh: &SkinnedMesh,
    local_to_world: &Affine3A,
    bone_index: usize,
    proximal: Vec3,
    distal: Vec3,
    threshold: f32,
) -> RadiusFit {
    if !mesh.is_valid() {
        return RadiusFit::default();
    }

    let segment = distal - proximal;
    let length = segment.length();
    if length < MIN_SEGMENT_LENGTH {
        return RadiusFit::default();
    }
    let align_to_y = Quat::from_rotation_arc(segment / length, Vec3::Y);

    mesh.positions
        .iter()
        .enumerate()
        .filter(|(vertex, _)| mesh.weight_for_bone(*vertex, bone_index) >= threshold)
        .map(|(_, position)| align_to_y * (local_to_world.transform_point3(*position) - proximal))
        .filter(|aligned| (0. ..=length).contains(&aligned.y))
        .fold(RadiusFit::default(), |fit, aligned| RadiusFit {
            radius: fit.radius.max(aligned.x.hypot(aligned.z)),
            included: fit.included + 1,
        })
}

/// Fit a capsule around the segment from `proximal` to `distal` using the skinned mesh on
/// `mesh_entity`.
///
/// A missing mesh, node or bind bone is reported as a [`Warning`] and nothing is scanned.
pub fn fit_limb_radius(
    world: &World,
    mesh_entity: Entity,
    proximal: Entity,
    distal: Entity,
    threshold: f32,
) -> Result<RadiusFit, Warning> {
    let technique = Technique::RadiusFit;
    let degenerate = |reason: String| Warning::DegenerateGeometry { technique, reason };

    let mesh = world
        .get::<&SkinnedMesh>(mesh_entity)
        .map_err(|_| degenerate("the skinned mesh has no skinning data".to_string()))?;
    if !mesh.is_valid() {
        return Err(degenerate(
            "the skinned mesh's vertex buffers are empty or inconsistent".to_string(),
        ));
    }

    let local_to_world = hierarchy::global_transform(world, mesh_entity).ok_or(
        Warning::StaleReference {
            technique,
            role: "skinned mesh",
        },
    )?;
    let proximal_position =
        hierarchy::world_position(world, proximal).ok_or(Warning::StaleReference {
            technique,
            role: "proximal bone",
        })?;
    let distal_position =
        hierarchy::world_position(world, distal).ok_or(Warning::StaleReference {
            technique,
            role: "distal bone",
        })?;

    let bone_name = hierarchy::node_name(world, proximal);
    let bone_index = mesh
        .bone_index(proximal)
        .ok_or_else(|| degenerate(format!("{bone_name} is not bound to the skinned mesh")))?;

    if proximal_position.distance(distal_position) < MIN_SEGMENT_LENGTH {
        return Err(degenerate(format!(
            "{bone_name} is too short to compute alignment"
        )));
    }

    let fit = fit_capsule_radius(
        &mesh,
        &local_to_world,
        bone_index,
        proximal_position,
        distal_position,
        threshold,
    );
    info!(
        "[AUTOSKIRT] Included {} vertices for {bone_name}. Max radius: {:.4}",
        fit.included, fit.radius
    );
    if fit.included == 0 {
        debug!("[AUTOSKIRT] No vertex of {bone_name} passed the weight threshold {threshold}");
    }

    Ok(fit)
}
