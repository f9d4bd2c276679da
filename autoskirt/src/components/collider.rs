use std::fmt::Debug;

use glam::Vec3;
pub use rapier3d::prelude::SharedShape;

/// A capsule collider attached to an anchor node - essentially a thin wrapper around a
/// [`rapier3d::prelude::SharedShape`].
///
/// The capsule's axis is the anchor's local +Y. `offset_from_parent` moves the capsule's centre along
/// that axis so that one cap sits on the anchor and the other reaches towards the link's target.
#[derive(Clone)]
pub struct Collider {
    /// The shape of this collider
    pub shape: SharedShape,
    /// Offset of the shape's centre from the anchor, in the anchor's local space
    pub offset_from_parent: Vec3,
}

impl Debug for Collider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Collider")
            .field("shape", &self.shape.shape_type())
            .field("radius", &self.radius())
            .field("height", &self.height())
            .field("offset_from_parent", &self.offset_from_parent)
            .finish()
    }
}

impl Collider {
    /// Create a capsule whose total length, caps included, is `height`.
    ///
    /// `radius` is clamped to be non-negative and `height` to be at least `2 * radius`.
    pub fn capsule(radius: f32, height: f32) -> Collider {
        let radius = radius.max(0.);
        let height = height.max(2. * radius);
        let half_segment = (height * 0.5 - radius).max(0.);

        Collider {
            shape: SharedShape::capsule_y(half_segment, radius),
            offset_from_parent: Vec3::new(0., height * 0.5 - radius, 0.),
        }
    }

    /// The capsule's radius, or zero if the shape is not a capsule
    pub fn radius(&self) -> f32 {
        self.shape.as_capsule().map(|c| c.radius).unwrap_or_default()
    }

    /// The capsule's total length, caps included, or zero if the shape is not a capsule
    pub fn height(&self) -> f32 {
        self.shape
            .as_capsule()
            .map(|c| (c.segment.b - c.segment.a).norm() + 2. * c.radius)
            .unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    pub fn test_capsule_dimensions() {
        let collider = Collider::capsule(0.05, 0.5);
        assert_relative_eq!(collider.radius(), 0.05);
        assert_relative_eq!(collider.height(), 0.5, epsilon = 1e-6);
        assert_relative_eq!(collider.offset_from_parent, Vec3::new(0., 0.2, 0.));
    }

    #[test]
    pub fn test_capsule_is_never_shorter_than_its_caps() {
        let collider = Collider::capsule(0.1, 0.05);
        assert_relative_eq!(collider.height(), 0.2, epsilon = 1e-6);

        let collider = Collider::capsule(-1.0, 1.0);
        assert_eq!(collider.radius(), 0.);
    }
}
