use hecs::Entity;

/// Maximum bend of a chain segment, in degrees
pub const DEFAULT_MAX_ANGLE: f32 = 60.;

/// The primary containment collider of a skirt: the dynamic bone chain rooted at the skirt parent.
///
/// Every bone under the chain root collides as a sphere of `radius`, and is kept out of the
/// capsules listed in `colliders`.
#[derive(Debug, Clone, PartialEq)]
pub struct DynamicChain {
    /// Collision radius of each bone. `None` if it could not be inferred from the bone tips.
    pub radius: Option<f32>,
    /// Maximum bend of a segment away from its rest direction, in degrees
    pub max_angle: f32,
    /// Anchors carrying the [`super::Collider`]s this chain collides with
    pub colliders: Vec<Entity>,
}

impl Default for DynamicChain {
    fn default() -> Self {
        Self {
            radius: None,
            max_angle: DEFAULT_MAX_ANGLE,
            colliders: Vec::new(),
        }
    }
}
