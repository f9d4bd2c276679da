use glam::{Affine3A, Vec3};
use hecs::{Entity, World};
use itertools::Itertools;
use log::info;

use crate::{
    autoskirt_error::{AutoSkirtError, Warning},
    hierarchy,
    step::Step,
    AutoSkirtResult,
};

/// Name given to the generated skirt parent
pub const AUTO_PARENT_NAME: &str = "SkirtParent_Auto";
/// Where the hips usually live, relative to the avatar root
pub const HIPS_PATH: &str = "Armature/Hips";
/// The usual name of the hip bone
pub const HIPS_NAME: &str = "Hips";

/// Where the skirt parent ended up
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ParentPlacement {
    /// The new node
    pub parent: Entity,
    /// Its world position
    pub position: Vec3,
    /// The node it was attached beneath: the hips, or the avatar root if none were found
    pub attached_to: Entity,
}

/// Where to put a parent for nodes at `positions`: their mean, raised along +Y by the largest
/// distance between any two of them times `vertical_offset_multiplier`.
///
/// `None` if there are fewer than two positions.
pub fn compute_parent_position(positions: &[Vec3], vertical_offset_multiplier: f32) -> Option<Vec3> {
    let max_distance = positions
        .iter()
        .tuple_combinations()
        .map(|(a, b)| a.distance(*b))
        .reduce(f32::max)?;
    let center = positions.iter().sum::<Vec3>() / positions.len() as f32;
    Some(center + Vec3::Y * max_distance * vertical_offset_multiplier)
}

/// Find the hip bone under `avatar_root`, ignoring anything beneath `exclude`.
///
/// Tried in order: the node at [`HIPS_PATH`], a direct child of the avatar root named
/// [`HIPS_NAME`], then the first node in pre-order whose name contains "hip" in any case.
pub fn find_hips(world: &World, avatar_root: Entity, exclude: Option<Entity>) -> Option<Entity> {
    let allowed =
        |node: Entity| !exclude.map_or(false, |e| hierarchy::is_ancestor_or_self(world, e, node));

    hierarchy::find_by_path(world, avatar_root, HIPS_PATH)
        .filter(|node| allowed(*node))
        .or_else(|| {
            hierarchy::find_by_path(world, avatar_root, HIPS_NAME).filter(|node| allowed(*node))
        })
        .or_else(|| hierarchy::find_node(world, avatar_root, |node, info| {
            allowed(node) && info.name.to_lowercase().contains("hip")
        }))
}

/// Create a new parent for `candidates` and hang it beneath the avatar's hips.
///
/// Candidates that are gone, or listed twice, are ignored. If fewer than two remain the scene is
/// left untouched and [`AutoSkirtError::NotEnoughCandidates`] is returned.
pub fn place_auto_parent(
    world: &mut World,
    step: &mut Step,
    candidates: &[Entity],
    vertical_offset_multiplier: f32,
    avatar_root: Entity,
) -> AutoSkirtResult<ParentPlacement> {
    if !hierarchy::is_alive(world, avatar_root) {
        return Err(AutoSkirtError::MissingAvatarRoot);
    }

    let candidates = valid_candidates(world, candidates);
    if let Some(candidate) = containing_candidate(world, &candidates, avatar_root) {
        return Err(AutoSkirtError::CandidateContainsAvatarRoot {
            name: hierarchy::node_name(world, candidate),
        });
    }
    let positions = candidates
        .iter()
        .filter_map(|c| hierarchy::world_position(world, *c))
        .collect::<Vec<_>>();
    let position = compute_parent_position(&positions, vertical_offset_multiplier).ok_or(
        AutoSkirtError::NotEnoughCandidates {
            found: candidates.len(),
        },
    )?;

    let parent = step.spawn_node(
        world,
        AUTO_PARENT_NAME,
        Some(avatar_root),
        Affine3A::from_translation(position),
    );
    for candidate in &candidates {
        step.set_parent(world, *candidate, Some(parent));
    }

    let attached_to = match find_hips(world, avatar_root, Some(parent)) {
        Some(hips) if step.set_parent(world, parent, Some(hips)) => {
            info!(
                "[AUTOSKIRT] Skirt parent assigned to hip bone: {}",
                hierarchy::node_name(world, hips)
            );
            hips
        }
        Some(_) => avatar_root,
        None => {
            step.warn(Warning::HipsNotFound);
            avatar_root
        }
    };

    info!(
        "[AUTOSKIRT] Created skirt parent at {position} with {} skirt bones",
        candidates.len()
    );

    Ok(ParentPlacement {
        parent,
        position,
        attached_to,
    })
}

/// The first candidate that is `avatar_root` or one of its ancestors. Such a node cannot be moved
/// beneath a parent that lives under the avatar root.
pub(crate) fn containing_candidate(
    world: &World,
    candidates: &[Entity],
    avatar_root: Entity,
) -> Option<Entity> {
    candidates
        .iter()
        .copied()
        .find(|candidate| hierarchy::is_ancestor_or_self(world, *candidate, avatar_root))
}

fn valid_candidates(world: &World, candidates: &[Entity]) -> Vec<Entity> {
    candidates
        .iter()
        .copied()
        .filter(|c| hierarchy::is_alive(world, *c))
        .unique()
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{hierarchy::tests::node, step::Technique};
    use approx::assert_relative_eq;

    #[test]
    pub fn test_collinear_candidates_offset_by_spread() {
        let positions = [
            Vec3::new(0., 1., 0.),
            Vec3::new(1., 1., 0.),
            Vec3::new(3., 1., 0.),
        ];
        let position = compute_parent_position(&positions, 0.1).unwrap();
        let mean = Vec3::new(4. / 3., 1., 0.);
        assert_relative_eq!(position.x, mean.x);
        assert_relative_eq!(position.z, mean.z);
        assert_relative_eq!(position.y - mean.y, 3. * 0.1, epsilon = 1e-6);

        assert_eq!(compute_parent_position(&positions[..1], 0.1), None);
    }

    fn avatar(world: &mut World) -> (Entity, Entity, Vec<Entity>) {
        let root = node(world, "Avatar", None, [0., 0., 0.]);
        let armature = node(world, "Armature", Some(root), [0., 0., 0.]);
        let hips = node(world, "Hips", Some(armature), [0., 1., 0.]);
        let skirt = [[0.1, 0.9, 0.], [-0.1, 0.9, 0.], [0., 0.9, 0.1]]
            .into_iter()
            .enumerate()
            .map(|(i, at)| node(world, &format!("Skirt_{i}"), Some(hips), at))
            .collect();
        (root, hips, skirt)
    }

    #[test]
    pub fn test_parent_created_under_hips() {
        let mut world = World::new();
        let (root, hips, skirt) = avatar(&mut world);
        let before = skirt
            .iter()
            .map(|s| hierarchy::world_position(&world, *s).unwrap())
            .collect::<Vec<_>>();

        let mut step = Step::new(Technique::AutoParent);
        let placement = place_auto_parent(&mut world, &mut step, &skirt, 0.1, root).unwrap();

        assert_eq!(placement.attached_to, hips);
        assert_eq!(hierarchy::parent_of(&world, placement.parent), Some(hips));
        assert_eq!(hierarchy::node_name(&world, placement.parent), AUTO_PARENT_NAME);
        assert!(step.warnings.is_empty());
        assert_relative_eq!(
            hierarchy::world_position(&world, placement.parent).unwrap(),
            placement.position,
            epsilon = 1e-6
        );

        for (bone, position) in skirt.iter().zip(before) {
            assert_eq!(hierarchy::parent_of(&world, *bone), Some(placement.parent));
            assert_relative_eq!(
                hierarchy::world_position(&world, *bone).unwrap(),
                position,
                epsilon = 1e-6
            );
        }

        step.revert(&mut world);
        assert!(!hierarchy::is_alive(&world, placement.parent));
        assert_eq!(hierarchy::children_of(&world, hips), skirt);
    }

    #[test]
    pub fn test_not_enough_candidates_leaves_scene_untouched() {
        let mut world = World::new();
        let (root, hips, skirt) = avatar(&mut world);
        let gone = node(&mut world, "Gone", Some(hips), [0., 0., 0.]);
        hierarchy::despawn_node(&mut world, gone);
        let entities = world.len();

        let mut step = Step::new(Technique::AutoParent);
        let result = place_auto_parent(
            &mut world,
            &mut step,
            &[skirt[0], skirt[0], gone],
            0.1,
            root,
        );

        assert!(matches!(
            result,
            Err(AutoSkirtError::NotEnoughCandidates { found: 1 })
        ));
        assert!(step.is_empty());
        assert_eq!(world.len(), entities);
        assert_eq!(hierarchy::parent_of(&world, skirt[0]), Some(hips));
    }

    #[test]
    pub fn test_candidate_above_avatar_root_is_rejected() {
        let mut world = World::new();
        let scene = node(&mut world, "Scene", None, [0., 0., 0.]);
        let (root, hips, skirt) = avatar(&mut world);
        hierarchy::set_parent_keep_world(&mut world, root, Some(scene));
        let entities = world.len();

        for candidate in [root, scene] {
            let mut step = Step::new(Technique::AutoParent);
            let result = place_auto_parent(
                &mut world,
                &mut step,
                &[skirt[0], candidate],
                0.1,
                root,
            );

            assert!(matches!(
                result,
                Err(AutoSkirtError::CandidateContainsAvatarRoot { .. })
            ));
            assert!(step.is_empty());
            assert_eq!(world.len(), entities);
            assert_eq!(hierarchy::parent_of(&world, skirt[0]), Some(hips));
        }
    }

    #[test]
    pub fn test_hips_fallbacks() {
        let mut world = World::new();
        let root = node(&mut world, "Avatar", None, [0., 0., 0.]);
        let rig = node(&mut world, "Rig", Some(root), [0., 0., 0.]);
        let pelvis = node(&mut world, "mixamorig:HipJoint", Some(rig), [0., 1., 0.]);
        assert_eq!(find_hips(&world, root, None), Some(pelvis));

        // Only a direct child of the avatar root is matched by name alone
        node(&mut world, "Hips", Some(pelvis), [0., 1., 0.]);
        assert_eq!(find_hips(&world, root, None), Some(pelvis));

        let hips = node(&mut world, "Hips", Some(root), [0., 1., 0.]);
        assert_eq!(find_hips(&world, root, None), Some(hips));

        let armature = node(&mut world, "Armature", Some(root), [0., 0., 0.]);
        let canonical = node(&mut world, "Hips", Some(armature), [0., 1., 0.]);
        assert_eq!(find_hips(&world, root, None), Some(canonical));

        // Nothing beneath the excluded node is a candidate
        assert_eq!(find_hips(&world, root, Some(armature)), Some(hips));
    }

    #[test]
    pub fn test_no_hips_defaults_to_avatar_root() {
        let mut world = World::new();
        let root = node(&mut world, "Avatar", None, [0., 0., 0.]);
        let a = node(&mut world, "A", Some(root), [0.2, 1., 0.]);
        let b = node(&mut world, "B", Some(root), [-0.2, 1., 0.]);

        let mut step = Step::new(Technique::AutoParent);
        let placement = place_auto_parent(&mut world, &mut step, &[a, b], 0.5, root).unwrap();

        assert_eq!(placement.attached_to, root);
        assert_eq!(hierarchy::parent_of(&world, placement.parent), Some(root));
        assert_eq!(step.warnings, vec![Warning::HipsNotFound]);
        assert_relative_eq!(placement.position, Vec3::new(0., 1.2, 0.), epsilon = 1e-6);
    }
}
