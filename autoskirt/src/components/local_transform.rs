use glam::{Affine3A, Quat, Vec3};
use gltf::scene::Transform as TransformData;
use serde::{Deserialize, Serialize};

/// The entity's transform relative to its [`super::Parent`].
///
/// This is the source of truth for where a node is. World space transforms are always derived
/// from the chain of `LocalTransform`s between a node and its root, see [`crate::hierarchy::global_transform`].
///
/// If the entity doesn't have a [`super::Parent`], then the global transform is just whatever you've set here.
#[derive(Clone, PartialEq, Debug, Copy, Deserialize, Serialize)]
pub struct LocalTransform {
    /// The translation of the entity
    pub translation: Vec3,
    /// The rotation of the entity
    pub rotation: Quat,
    /// The non-uniform scale of the entity
    pub scale: Vec3,
}

impl Default for LocalTransform {
    fn default() -> Self {
        Self {
            translation: Vec3::ZERO,
            rotation: Quat::IDENTITY,
            scale: Vec3::ONE,
        }
    }
}

impl LocalTransform {
    pub(crate) fn load(transform_data: TransformData) -> LocalTransform {
        let (t, r, s) = transform_data.decomposed();
        LocalTransform {
            translation: t.into(),
            // gltf gives us a quaternion in [x, y, z, w], which is what glam wants too
            rotation: Quat::from_array(r).normalize(),
            scale: s.into(),
        }
    }

    /// Convenience function to build a `LocalTransform` from a translation alone
    pub fn from_translation(translation: Vec3) -> Self {
        Self {
            translation,
            ..Default::default()
        }
    }

    /// Convenience function to convert the [`LocalTransform`] into a [`glam::Affine3A`]
    pub fn to_affine(&self) -> Affine3A {
        Affine3A::from_scale_rotation_translation(self.scale, self.rotation, self.translation)
    }

    /// Update the translation, rotation and scale from a [`glam::Affine3A`]
    pub fn update_from_affine(&mut self, transform: &Affine3A) {
        let (scale, rotation, translation) = transform.to_scale_rotation_translation();
        self.scale = scale;
        self.rotation = rotation;
        self.translation = translation;
    }

    /// Decompose a [`glam::Affine3A`] into a new `LocalTransform`
    pub fn from_affine(transform: &Affine3A) -> Self {
        let mut local = Self::default();
        local.update_from_affine(transform);
        local
    }
}
