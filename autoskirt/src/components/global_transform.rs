use glam::{Affine3A, Quat, Vec3};

use super::LocalTransform;

/// Component used to cache the global transform of the entity.
/// This is the transformation from local to global space, refreshed by
/// [`crate::systems::update_global_transform_system`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GlobalTransform(pub Affine3A);

impl Default for GlobalTransform {
    fn default() -> Self {
        Self(Affine3A::IDENTITY)
    }
}

impl GlobalTransform {
    /// Convenience function to decompose the [`GlobalTransform`] into its components
    pub fn to_scale_rotation_translation(&self) -> (Vec3, Quat, Vec3) {
        self.0.to_scale_rotation_translation()
    }

    /// The position of the entity in world space
    pub fn translation(&self) -> Vec3 {
        self.0.translation.into()
    }
}

impl From<LocalTransform> for GlobalTransform {
    fn from(l: LocalTransform) -> Self {
        GlobalTransform(l.to_affine())
    }
}
