use hecs::World;

use crate::components::{GlobalTransform, LocalTransform, Parent};

/// Update global transform system
/// Walks from each node up to its root, accumulating local transforms, and stores the result in
/// the node's [`GlobalTransform`]
pub fn update_global_transform_system(world: &mut World) {
    // Views allow random access into the set of parents and local transforms without a `World::get`
    // per ancestor.
    let mut parents = world.query::<&Parent>();
    let parents = parents.view();
    let mut locals = world.query::<&LocalTransform>();
    let locals = locals.view();

    // `GlobalTransform` is only borrowed here, so this can coexist with both views.
    for (entity, (local, global)) in world
        .query::<(&LocalTransform, &mut GlobalTransform)>()
        .iter()
    {
        let mut transform = local.to_affine();
        let mut ancestor = entity;
        while let Some(parent) = parents.get(ancestor) {
            ancestor = parent.0;
            if let Some(parent_local) = locals.get(ancestor) {
                transform = parent_local.to_affine() * transform;
            }
        }
        global.0 = transform;
    }
}

#[cfg(test)]
mod tests {
    use approx::assert_relative_eq;
    use glam::{Affine3A, Quat, Vec3};

    use super::*;
    use crate::hierarchy;

    #[test]
    pub fn test_transform_system() {
        let mut world = World::new();
        let local_transform = LocalTransform::from_translation([1.0, 1.0, 100.0].into());

        let parent = world.spawn((local_transform, GlobalTransform::default()));
        let child = world.spawn((local_transform, GlobalTransform::default(), Parent(parent)));
        let grandchild = world.spawn((local_transform, GlobalTransform::default(), Parent(child)));

        update_global_transform_system(&mut world);

        {
            let global_transform = world.get::<&GlobalTransform>(grandchild).unwrap();
            let expected_matrix = Affine3A::from_translation([3.0, 3.0, 300.0].into());
            assert_relative_eq!(global_transform.0, expected_matrix);
        }

        {
            let global_transform = world.get::<&GlobalTransform>(child).unwrap();
            let expected_matrix = Affine3A::from_translation([2.0, 2.0, 200.0].into());
            assert_relative_eq!(global_transform.0, expected_matrix);
        }
    }

    #[test]
    pub fn test_matches_hierarchy_walk() {
        let mut world = World::new();
        let root = hierarchy::spawn_node(
            &mut world,
            "Root",
            None,
            Affine3A::from_rotation_translation(Quat::from_rotation_y(0.7), Vec3::Y),
        );
        let child = hierarchy::spawn_node(
            &mut world,
            "Child",
            Some(root),
            Affine3A::from_translation(Vec3::new(0.5, 1.0, 0.)),
        );

        // Move the root without touching the cache, then refresh it
        world.get::<&mut LocalTransform>(root).unwrap().translation = Vec3::ZERO;
        update_global_transform_system(&mut world);

        let cached = world.get::<&GlobalTransform>(child).unwrap().0;
        assert_relative_eq!(
            cached,
            hierarchy::global_transform(&world, child).unwrap(),
            epsilon = 1e-6
        );
        assert_relative_eq!(
            world.get::<&GlobalTransform>(child).unwrap().translation(),
            Vec3::new(0.5, 0., 0.),
            epsilon = 1e-6
        );
    }

    #[test]
    pub fn test_entities_without_transforms() {
        let mut world = World::new();
        world.spawn((0,));
        update_global_transform_system(&mut world);
    }
}
