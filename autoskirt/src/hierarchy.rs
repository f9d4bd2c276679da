use std::collections::HashSet;

use glam::{Affine3A, Quat, Vec3};
use hecs::{Entity, World};

use crate::components::{Children, GlobalTransform, Info, LocalTransform, Parent};

/// Everything needed to put a node back where it was before it was reparented
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ParentChange {
    /// The node that moved
    pub entity: Entity,
    /// Its parent before the move
    pub previous_parent: Option<Entity>,
    /// Its position in the previous parent's [`Children`]
    pub previous_index: usize,
    /// Its transform relative to the previous parent
    pub previous_local: LocalTransform,
}

/// Is this node still in the scene?
pub fn is_alive(world: &World, entity: Entity) -> bool {
    world.contains(entity)
}

/// The node's name, or a placeholder if it has none
pub fn node_name(world: &World, entity: Entity) -> String {
    world
        .get::<&Info>(entity)
        .map(|info| info.name.clone())
        .unwrap_or_else(|_| format!("{entity:?}"))
}

/// The node's parent, if it has one
pub fn parent_of(world: &World, entity: Entity) -> Option<Entity> {
    world.get::<&Parent>(entity).ok().map(|p| p.0)
}

/// The node's children, in order
pub fn children_of(world: &World, entity: Entity) -> Vec<Entity> {
    world
        .get::<&Children>(entity)
        .map(|c| c.0.clone())
        .unwrap_or_default()
}

/// Walk from `entity` to its root, accumulating local transforms into a local-to-world transform.
///
/// Returns `None` if `entity` is not in the world.
pub fn global_transform(world: &World, entity: Entity) -> Option<Affine3A> {
    let mut transform = world.get::<&LocalTransform>(entity).ok()?.to_affine();
    let mut ancestor = entity;
    while let Some(next) = parent_of(world, ancestor) {
        let parent_local = world
            .get::<&LocalTransform>(next)
            .map(|l| l.to_affine())
            .unwrap_or(Affine3A::IDENTITY);
        transform = parent_local * transform;
        ancestor = next;
    }
    Some(transform)
}

/// World space position of the node
pub fn world_position(world: &World, entity: Entity) -> Option<Vec3> {
    global_transform(world, entity).map(|t| t.translation.into())
}

/// World space rotation of the node
pub fn world_rotation(world: &World, entity: Entity) -> Option<Quat> {
    global_transform(world, entity).map(|t| t.to_scale_rotation_translation().1)
}

/// Rotate the node to `rotation` in world space, leaving its world position and scale alone.
///
/// Returns false if `entity` is not in the world.
pub fn set_world_rotation(world: &mut World, entity: Entity, rotation: Quat) -> bool {
    let Some(global) = global_transform(world, entity) else {
        return false;
    };
    let (scale, _, translation) = global.to_scale_rotation_translation();
    let parent_global = parent_of(world, entity)
        .and_then(|parent| global_transform(world, parent))
        .unwrap_or(Affine3A::IDENTITY);
    let local =
        parent_global.inverse() * Affine3A::from_scale_rotation_translation(scale, rotation, translation);

    match world.get::<&mut LocalTransform>(entity) {
        Ok(mut local_transform) => {
            local_transform.update_from_affine(&local);
            true
        }
        Err(_) => false,
    }
}

/// Is `ancestor` the same node as `entity`, or one of its ancestors?
pub fn is_ancestor_or_self(world: &World, ancestor: Entity, entity: Entity) -> bool {
    let mut current = Some(entity);
    while let Some(node) = current {
        if node == ancestor {
            return true;
        }
        current = parent_of(world, node);
    }
    false
}

/// Create a new node with the given world transform, optionally as the last child of `parent`
pub fn spawn_node(
    world: &mut World,
    name: &str,
    parent: Option<Entity>,
    global: Affine3A,
) -> Entity {
    let parent = parent.filter(|p| is_alive(world, *p));
    let parent_global = parent
        .and_then(|p| global_transform(world, p))
        .unwrap_or(Affine3A::IDENTITY);
    let local = LocalTransform::from_affine(&(parent_global.inverse() * global));

    let entity = world.spawn((
        Info::new(name),
        local,
        GlobalTransform(global),
        Children::default(),
    ));

    if let Some(parent) = parent {
        attach(world, entity, parent, None);
    }

    entity
}

/// Move `entity` under `new_parent`, keeping its world transform.
///
/// Returns `None`, leaving the world untouched, if either node is gone or if the move would make a
/// node its own ancestor.
pub fn set_parent_keep_world(
    world: &mut World,
    entity: Entity,
    new_parent: Option<Entity>,
) -> Option<ParentChange> {
    if !is_alive(world, entity) {
        return None;
    }
    if let Some(new_parent) = new_parent {
        if !is_alive(world, new_parent) || is_ancestor_or_self(world, entity, new_parent) {
            return None;
        }
    }

    let global = global_transform(world, entity)?;
    let previous_local = *world.get::<&LocalTransform>(entity).ok()?;
    let (previous_parent, previous_index) = match detach(world, entity) {
        Some((parent, index)) => (Some(parent), index),
        None => (None, 0),
    };

    let parent_global = new_parent
        .and_then(|p| global_transform(world, p))
        .unwrap_or(Affine3A::IDENTITY);
    if let Ok(mut local) = world.get::<&mut LocalTransform>(entity) {
        local.update_from_affine(&(parent_global.inverse() * global));
    }
    if let Some(new_parent) = new_parent {
        attach(world, entity, new_parent, None);
    }

    Some(ParentChange {
        entity,
        previous_parent,
        previous_index,
        previous_local,
    })
}

/// Put a node back exactly where a [`ParentChange`] says it was
pub fn restore_parent(world: &mut World, change: &ParentChange) {
    if !is_alive(world, change.entity) {
        return;
    }
    detach(world, change.entity);
    if let Ok(mut local) = world.get::<&mut LocalTransform>(change.entity) {
        *local = change.previous_local;
    }
    if let Some(parent) = change.previous_parent.filter(|p| is_alive(world, *p)) {
        attach(world, change.entity, parent, Some(change.previous_index));
    }
}

/// Remove a node and everything beneath it
pub fn despawn_node(world: &mut World, entity: Entity) {
    if !is_alive(world, entity) {
        return;
    }
    detach(world, entity);
    for node in pre_order(world, entity) {
        let _ = world.despawn(node);
    }
}

fn attach(world: &mut World, entity: Entity, parent: Entity, index: Option<usize>) {
    let has_children = world.get::<&Children>(parent).is_ok();
    if !has_children {
        let _ = world.insert_one(parent, Children::default());
    }
    if let Ok(mut children) = world.get::<&mut Children>(parent) {
        let index = index.unwrap_or(children.0.len()).min(children.0.len());
        children.0.insert(index, entity);
    }
    let _ = world.insert_one(entity, Parent(parent));
}

fn detach(world: &mut World, entity: Entity) -> Option<(Entity, usize)> {
    let parent = parent_of(world, entity)?;
    let index = world.get::<&mut Children>(parent).ok().and_then(|mut c| {
        let index = c.0.iter().position(|e| *e == entity)?;
        c.0.remove(index);
        Some(index)
    });
    let _ = world.remove_one::<Parent>(entity);
    Some((parent, index.unwrap_or_default()))
}

/// Every node in the subtree rooted at `root`, parents before children and siblings in child
/// index order. Empty if `root` is not in the world.
pub fn pre_order(world: &World, root: Entity) -> Vec<Entity> {
    let mut visited = Vec::new();
    if !is_alive(world, root) {
        return visited;
    }

    let mut stack = vec![root];
    while let Some(node) = stack.pop() {
        visited.push(node);
        stack.extend(children_of(world, node).into_iter().rev());
    }
    visited
}

/// The first node in a pre-order walk of `root`'s subtree that matches `predicate`
pub fn find_node(
    world: &World,
    root: Entity,
    mut predicate: impl FnMut(Entity, &Info) -> bool,
) -> Option<Entity> {
    pre_order(world, root).into_iter().find(|node| {
        world
            .get::<&Info>(*node)
            .map(|info| predicate(*node, &info))
            .unwrap_or(false)
    })
}

/// Follow a `/` separated path of child names from `root`, eg. `"Armature/Hips"`
pub fn find_by_path(world: &World, root: Entity, path: &str) -> Option<Entity> {
    path.split('/')
        .filter(|segment| !segment.is_empty())
        .try_fold(root, |node, segment| {
            children_of(world, node).into_iter().find(|child| {
                world
                    .get::<&Info>(*child)
                    .map(|info| info.name == segment)
                    .unwrap_or(false)
            })
        })
        .filter(|node| *node != root || path.trim_matches('/').is_empty())
}

/// Every childless node beneath (and including) `roots`.
///
/// Each node is visited at most once even if the roots overlap, and the result is in pre-order, so
/// it is stable for a given hierarchy. Roots that are no longer in the world are ignored.
pub fn leaf_nodes(world: &World, roots: &[Entity]) -> Vec<Entity> {
    let mut visited = HashSet::new();
    let mut leaves = Vec::new();

    for root in roots {
        for node in pre_order(world, *root) {
            if !visited.insert(node) {
                continue;
            }
            let is_leaf = world
                .get::<&Children>(node)
                .map(|c| c.is_empty())
                .unwrap_or(true);
            if is_leaf {
                leaves.push(node);
            }
        }
    }

    leaves
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use approx::assert_relative_eq;

    /// Spawn a node at a world position, returning its entity
    pub(crate) fn node(
        world: &mut World,
        name: &str,
        parent: Option<Entity>,
        at: [f32; 3],
    ) -> Entity {
        spawn_node(world, name, parent, Affine3A::from_translation(at.into()))
    }

    #[test]
    pub fn test_leaves_of_chain() {
        let mut world = World::new();
        let a = node(&mut world, "A", None, [0., 0., 0.]);
        let b = node(&mut world, "B", Some(a), [0., 1., 0.]);
        let c = node(&mut world, "C", Some(b), [0., 2., 0.]);

        assert_eq!(leaf_nodes(&world, &[a]), vec![c]);
    }

    #[test]
    pub fn test_leaves_of_binary_tree() {
        let mut world = World::new();
        let root = node(&mut world, "Root", None, [0., 0., 0.]);
        let mut deepest = Vec::new();
        for i in 0..2 {
            let middle = node(
                &mut world,
                &format!("Middle {i}"),
                Some(root),
                [i as f32, 0., 0.],
            );
            for j in 0..2 {
                deepest.push(node(
                    &mut world,
                    &format!("Leaf {i}{j}"),
                    Some(middle),
                    [i as f32, j as f32, 0.],
                ));
            }
        }

        assert_eq!(leaf_nodes(&world, &[root]), deepest);
    }

    #[test]
    pub fn test_leaves_visit_each_node_once() {
        let mut world = World::new();
        let a = node(&mut world, "A", None, [0., 0., 0.]);
        let b = node(&mut world, "B", Some(a), [0., 1., 0.]);
        let lone = node(&mut world, "Lone", None, [5., 0., 0.]);

        // Overlapping roots, and a childless root
        assert_eq!(leaf_nodes(&world, &[a, b, lone]), vec![b, lone]);
    }

    #[test]
    pub fn test_reparent_keeps_world_position() {
        let mut world = World::new();
        let a = node(&mut world, "A", None, [1., 0., 0.]);
        let b = node(&mut world, "B", None, [0., 3., 0.]);
        let child = node(&mut world, "Child", Some(a), [2., 2., 2.]);

        let change = set_parent_keep_world(&mut world, child, Some(b)).unwrap();
        assert_eq!(change.previous_parent, Some(a));
        assert_eq!(parent_of(&world, child), Some(b));
        assert!(children_of(&world, a).is_empty());
        assert_eq!(children_of(&world, b), vec![child]);
        assert_relative_eq!(world_position(&world, child).unwrap(), Vec3::new(2., 2., 2.));
        assert_relative_eq!(
            world.get::<&LocalTransform>(child).unwrap().translation,
            Vec3::new(2., -1., 2.)
        );

        restore_parent(&mut world, &change);
        assert_eq!(parent_of(&world, child), Some(a));
        assert_relative_eq!(world_position(&world, child).unwrap(), Vec3::new(2., 2., 2.));
    }

    #[test]
    pub fn test_reparent_refuses_cycles() {
        let mut world = World::new();
        let a = node(&mut world, "A", None, [0., 0., 0.]);
        let b = node(&mut world, "B", Some(a), [0., 1., 0.]);

        assert!(set_parent_keep_world(&mut world, a, Some(b)).is_none());
        assert!(set_parent_keep_world(&mut world, a, Some(a)).is_none());
        assert_eq!(parent_of(&world, b), Some(a));
    }

    #[test]
    pub fn test_restore_keeps_sibling_order() {
        let mut world = World::new();
        let root = node(&mut world, "Root", None, [0., 0., 0.]);
        let other = node(&mut world, "Other", None, [0., 0., 0.]);
        let first = node(&mut world, "First", Some(root), [0., 0., 0.]);
        let second = node(&mut world, "Second", Some(root), [0., 0., 0.]);

        let change = set_parent_keep_world(&mut world, first, Some(other)).unwrap();
        assert_eq!(children_of(&world, root), vec![second]);
        restore_parent(&mut world, &change);
        assert_eq!(children_of(&world, root), vec![first, second]);
    }

    #[test]
    pub fn test_rotated_parent() {
        let mut world = World::new();
        let parent = spawn_node(
            &mut world,
            "Parent",
            None,
            Affine3A::from_rotation_translation(
                Quat::from_rotation_y(std::f32::consts::FRAC_PI_2),
                Vec3::new(0., 1., 0.),
            ),
        );
        let child = node(&mut world, "Child", Some(parent), [1., 1., 0.]);

        assert_relative_eq!(
            world_position(&world, child).unwrap(),
            Vec3::new(1., 1., 0.),
            epsilon = 1e-6
        );
        assert_relative_eq!(
            world_rotation(&world, child).unwrap(),
            Quat::IDENTITY,
            epsilon = 1e-6
        );

        let target = Quat::from_rotation_z(std::f32::consts::FRAC_PI_2);
        assert!(set_world_rotation(&mut world, child, target));
        assert_relative_eq!(world_rotation(&world, child).unwrap(), target, epsilon = 1e-6);
        assert_relative_eq!(
            world_position(&world, child).unwrap(),
            Vec3::new(1., 1., 0.),
            epsilon = 1e-6
        );
    }

    #[test]
    pub fn test_find_by_path_and_name() {
        let mut world = World::new();
        let root = node(&mut world, "Avatar", None, [0., 0., 0.]);
        let armature = node(&mut world, "Armature", Some(root), [0., 0., 0.]);
        let hips = node(&mut world, "Hips", Some(armature), [0., 1., 0.]);
        let upper_hip = node(&mut world, "UpperHip", Some(root), [0., 1., 0.]);

        assert_eq!(find_by_path(&world, root, "Armature/Hips"), Some(hips));
        assert_eq!(find_by_path(&world, root, "Hips"), None);
        assert_eq!(find_by_path(&world, root, "Armature/Nope"), None);
        assert_eq!(
            find_node(&world, root, |_, info| info.name.to_lowercase().contains("hip")),
            Some(hips)
        );
        assert_eq!(
            find_node(&world, root, |_, info| info.name == "UpperHip"),
            Some(upper_hip)
        );
    }

    #[test]
    pub fn test_despawn_removes_subtree() {
        let mut world = World::new();
        let root = node(&mut world, "Root", None, [0., 0., 0.]);
        let a = node(&mut world, "A", Some(root), [0., 0., 0.]);
        let b = node(&mut world, "B", Some(a), [0., 0., 0.]);

        despawn_node(&mut world, a);
        assert!(!is_alive(&world, a));
        assert!(!is_alive(&world, b));
        assert!(children_of(&world, root).is_empty());
    }
}
