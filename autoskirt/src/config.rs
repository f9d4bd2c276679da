use hecs::{Entity, World};
use itertools::Itertools;
use log::warn;
use serde::{Deserialize, Serialize};

use crate::{
    autoskirt_error::AutoSkirtError,
    hierarchy,
    techniques::{auto_parent::containing_candidate, radius_fitting::DEFAULT_WEIGHT_THRESHOLD},
    AutoSkirtResult,
};

/// Settings for one collider pattern
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PatternSettings {
    /// Place this pattern at all?
    pub enabled: bool,
    /// Capsule radius
    pub radius: f32,
    /// Scales the distance between the endpoints before the caps are added
    pub length_multiplier: f32,
}

impl PatternSettings {
    fn with_radius(radius: f32) -> Self {
        Self {
            enabled: false,
            radius,
            length_multiplier: 1.,
        }
    }
}

impl Default for PatternSettings {
    fn default() -> Self {
        Self::with_radius(0.05)
    }
}

/// Settings for making the skirt parent follow the legs
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RotationFollowSettings {
    /// Attach the constraint at all?
    pub enabled: bool,
    /// 0 leaves the skirt parent unaffected, 1 fully follows the legs
    pub weight: f32,
}

impl Default for RotationFollowSettings {
    fn default() -> Self {
        Self {
            enabled: false,
            weight: 0.5,
        }
    }
}

/// Settings for the skirt's dynamic chain
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ChainSettings {
    /// Create the chain on the skirt parent, replacing any that is already there
    pub create_or_replace: bool,
    /// Hand every collider created by the apply to the chain
    pub attach_colliders: bool,
    /// Scales the radius inferred from the skirt bone tips
    pub radius_multiplier: f32,
}

impl Default for ChainSettings {
    fn default() -> Self {
        Self {
            create_or_replace: false,
            attach_colliders: false,
            radius_multiplier: 0.8,
        }
    }
}

/// Settings for fitting collider radii to the leg mesh
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AutoFitSettings {
    /// Replace the configured radii with fitted ones?
    pub enabled: bool,
    /// Crossing radius, relative to the fitted leg radius
    pub crossing_multiplier: f32,
    /// Lateral radius, relative to the fitted leg radius
    pub lateral_multiplier: f32,
    /// Straight radius, relative to the fitted leg radius
    pub straight_multiplier: f32,
    /// Minimum weight a vertex needs on the upper leg to count
    pub weight_threshold: f32,
}

impl Default for AutoFitSettings {
    fn default() -> Self {
        Self {
            enabled: false,
            crossing_multiplier: 0.8,
            lateral_multiplier: 0.8,
            straight_multiplier: 1.,
            weight_threshold: DEFAULT_WEIGHT_THRESHOLD,
        }
    }
}

/// Every numeric option and toggle of an apply
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// Leg to opposite knee colliders
    pub crossing: PatternSettings,
    /// Knee to knee colliders
    pub lateral: PatternSettings,
    /// Leg to knee colliders
    pub straight: PatternSettings,
    /// Skirt parent rotation
    pub rotation_follow: RotationFollowSettings,
    /// Dynamic chain on the skirt parent
    pub chain: ChainSettings,
    /// Radius fitting
    pub auto_fit: AutoFitSettings,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            crossing: PatternSettings::with_radius(0.05),
            lateral: PatternSettings::with_radius(0.05),
            straight: PatternSettings::with_radius(0.06),
            rotation_follow: Default::default(),
            chain: Default::default(),
            auto_fit: Default::default(),
        }
    }
}

impl Settings {
    /// Check every value is in range
    pub fn validate(&self) -> AutoSkirtResult<()> {
        non_negative("crossing.radius", self.crossing.radius)?;
        non_negative("crossing.length_multiplier", self.crossing.length_multiplier)?;
        non_negative("lateral.radius", self.lateral.radius)?;
        non_negative("lateral.length_multiplier", self.lateral.length_multiplier)?;
        non_negative("straight.radius", self.straight.radius)?;
        non_negative("straight.length_multiplier", self.straight.length_multiplier)?;
        unit_interval("rotation_follow.weight", self.rotation_follow.weight)?;
        non_negative("chain.radius_multiplier", self.chain.radius_multiplier)?;
        non_negative("auto_fit.crossing_multiplier", self.auto_fit.crossing_multiplier)?;
        non_negative("auto_fit.lateral_multiplier", self.auto_fit.lateral_multiplier)?;
        non_negative("auto_fit.straight_multiplier", self.auto_fit.straight_multiplier)?;
        unit_interval("auto_fit.weight_threshold", self.auto_fit.weight_threshold)
    }
}

fn non_negative(name: &'static str, value: f32) -> AutoSkirtResult<()> {
    if value.is_finite() && value >= 0. {
        Ok(())
    } else {
        Err(AutoSkirtError::InvalidSetting {
            name,
            reason: format!("{value} must be a finite, non-negative number"),
        })
    }
}

fn unit_interval(name: &'static str, value: f32) -> AutoSkirtResult<()> {
    if (0. ..=1.).contains(&value) {
        Ok(())
    } else {
        Err(AutoSkirtError::InvalidSetting {
            name,
            reason: format!("{value} must be between 0 and 1"),
        })
    }
}

/// The four leg nodes colliders are placed between
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct LegSelection {
    /// Left upper leg, near the hips
    pub left_leg: Option<Entity>,
    /// Left lower leg, near the knee
    pub left_knee: Option<Entity>,
    /// Right upper leg, near the hips
    pub right_leg: Option<Entity>,
    /// Right lower leg, near the knee
    pub right_knee: Option<Entity>,
}

/// How the skirt parent is chosen
#[derive(Debug, Clone, PartialEq)]
pub enum Parenting {
    /// Create a new parent above `skirt_bones`
    AutoCreate {
        /// The top bones of the skirt
        skirt_bones: Vec<Entity>,
        /// Raises the new parent by this much of the skirt bones' spread
        vertical_offset_multiplier: f32,
    },
    /// Use an existing node
    Manual {
        /// The skirt parent
        parent: Option<Entity>,
    },
}

/// Everything an apply needs, resolved against a scene. Never changed once an apply starts.
#[derive(Debug, Clone, PartialEq)]
pub struct ApplyConfig {
    /// The avatar the skirt belongs to
    pub avatar_root: Option<Entity>,
    /// How the skirt parent is chosen
    pub parenting: Parenting,
    /// The legs
    pub legs: LegSelection,
    /// The node carrying the skinned body mesh, used to fit radii
    pub skinned_mesh: Option<Entity>,
    /// Options and toggles
    pub settings: Settings,
}

impl ApplyConfig {
    /// Check everything that must hold before the scene is touched
    pub fn validate(&self, world: &World) -> AutoSkirtResult<()> {
        if !self
            .avatar_root
            .map_or(false, |root| hierarchy::is_alive(world, root))
        {
            return Err(AutoSkirtError::MissingAvatarRoot);
        }

        match &self.parenting {
            Parenting::AutoCreate {
                skirt_bones,
                vertical_offset_multiplier,
            } => {
                let found = skirt_bones
                    .iter()
                    .filter(|bone| hierarchy::is_alive(world, **bone))
                    .unique()
                    .count();
                if found < 2 {
                    return Err(AutoSkirtError::NotEnoughCandidates { found });
                }
                let live = skirt_bones
                    .iter()
                    .copied()
                    .filter(|bone| hierarchy::is_alive(world, *bone))
                    .collect::<Vec<_>>();
                if let Some(bone) = self
                    .avatar_root
                    .and_then(|root| containing_candidate(world, &live, root))
                {
                    return Err(AutoSkirtError::CandidateContainsAvatarRoot {
                        name: hierarchy::node_name(world, bone),
                    });
                }
                if !vertical_offset_multiplier.is_finite() {
                    return Err(AutoSkirtError::InvalidSetting {
                        name: "vertical_offset_multiplier",
                        reason: format!("{vertical_offset_multiplier} must be finite"),
                    });
                }
            }
            Parenting::Manual { parent } => {
                if !parent.map_or(false, |parent| hierarchy::is_alive(world, parent)) {
                    return Err(AutoSkirtError::MissingManualParent);
                }
            }
        }

        self.settings.validate()
    }
}

/// Names a node either by a `/` separated path from the avatar root, or by its exact name
pub type NodeRef = String;

/// How the skirt parent is chosen, as written in a configuration file
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "mode", rename_all = "snake_case")]
pub enum ParentingFile {
    /// See [`Parenting::AutoCreate`]
    AutoCreate {
        /// The top bones of the skirt
        skirt_bones: Vec<NodeRef>,
        /// Raises the new parent by this much of the skirt bones' spread
        #[serde(default = "default_vertical_offset_multiplier")]
        vertical_offset_multiplier: f32,
    },
    /// See [`Parenting::Manual`]
    Manual {
        /// The skirt parent
        parent: Option<NodeRef>,
    },
}

fn default_vertical_offset_multiplier() -> f32 {
    0.1
}

/// A [`LegSelection`] as written in a configuration file
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
#[allow(missing_docs)]
pub struct LegSelectionFile {
    pub left_leg: Option<NodeRef>,
    pub left_knee: Option<NodeRef>,
    pub right_leg: Option<NodeRef>,
    pub right_knee: Option<NodeRef>,
}

/// An [`ApplyConfig`] as stored on disk, naming nodes instead of pointing at them
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConfigFile {
    /// The avatar root. Defaults to the root of the scene.
    #[serde(default)]
    pub avatar_root: Option<NodeRef>,
    /// How the skirt parent is chosen
    pub parenting: ParentingFile,
    /// The legs
    #[serde(default)]
    pub legs: LegSelectionFile,
    /// The node carrying the skinned body mesh
    #[serde(default)]
    pub skinned_mesh: Option<NodeRef>,
    /// Options and toggles
    #[serde(default)]
    pub settings: Settings,
}

impl ConfigFile {
    /// Parse a configuration from JSON
    pub fn from_json(json: &str) -> AutoSkirtResult<Self> {
        Ok(serde_json::from_str(json)?)
    }

    /// Look up every named node in the scene under `scene_root`.
    ///
    /// Names that cannot be found are logged and left unset, so the apply can decide whether that
    /// is fatal. Skirt bones that cannot be found are dropped.
    pub fn resolve(&self, world: &World, scene_root: Entity) -> ApplyConfig {
        let avatar_root = match &self.avatar_root {
            Some(name) => lookup(world, scene_root, "avatar root", name),
            None => Some(scene_root),
        };
        let search_root = avatar_root.unwrap_or(scene_root);
        let find = |role: &str, name: &Option<NodeRef>| {
            name.as_ref()
                .and_then(|name| lookup(world, search_root, role, name))
        };

        let parenting = match &self.parenting {
            ParentingFile::AutoCreate {
                skirt_bones,
                vertical_offset_multiplier,
            } => Parenting::AutoCreate {
                skirt_bones: skirt_bones
                    .iter()
                    .filter_map(|name| lookup(world, search_root, "skirt bone", name))
                    .collect(),
                vertical_offset_multiplier: *vertical_offset_multiplier,
            },
            ParentingFile::Manual { parent } => Parenting::Manual {
                parent: find("skirt parent", parent),
            },
        };

        ApplyConfig {
            avatar_root,
            parenting,
            legs: LegSelection {
                left_leg: find("left leg", &self.legs.left_leg),
                left_knee: find("left knee", &self.legs.left_knee),
                right_leg: find("right leg", &self.legs.right_leg),
                right_knee: find("right knee", &self.legs.right_knee),
            },
            skinned_mesh: find("skinned mesh", &self.skinned_mesh),
            settings: self.settings,
        }
    }
}

/// Resolve a [`NodeRef`] beneath `root`
pub fn find_node_ref(world: &World, root: Entity, name: &str) -> Option<Entity> {
    if name.contains('/') {
        hierarchy::find_by_path(world, root, name)
    } else {
        hierarchy::find_node(world, root, |_, info| info.name == name)
    }
}

fn lookup(world: &World, root: Entity, role: &str, name: &str) -> Option<Entity> {
    let found = find_node_ref(world, root, name);
    if found.is_none() {
        warn!("[AUTOSKIRT] Could not find {role} `{name}`");
    }
    found
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hierarchy::tests::node;

    fn scene(world: &mut World) -> Entity {
        let root = node(world, "Avatar", None, [0., 0., 0.]);
        let armature = node(world, "Armature", Some(root), [0., 0., 0.]);
        let hips = node(world, "Hips", Some(armature), [0., 1., 0.]);
        node(world, "Skirt_0", Some(hips), [0.1, 0.9, 0.]);
        node(world, "Skirt_1", Some(hips), [-0.1, 0.9, 0.]);
        node(world, "LeftLeg", Some(hips), [0.1, 0.9, 0.]);
        node(world, "RightLeg", Some(hips), [-0.1, 0.9, 0.]);
        root
    }

    #[test]
    pub fn test_defaults() {
        let settings = Settings::default();
        assert_eq!(settings.crossing.radius, 0.05);
        assert_eq!(settings.lateral.radius, 0.05);
        assert_eq!(settings.straight.radius, 0.06);
        assert_eq!(settings.lateral.length_multiplier, 1.);
        assert_eq!(settings.rotation_follow.weight, 0.5);
        assert_eq!(settings.chain.radius_multiplier, 0.8);
        assert_eq!(settings.auto_fit.straight_multiplier, 1.);
        assert_eq!(settings.auto_fit.weight_threshold, 0.8);
        assert!(settings.validate().is_ok());
    }

    #[test]
    pub fn test_parse_and_resolve() {
        let json = r#"{
            "parenting": {
                "mode": "auto_create",
                "skirt_bones": ["Skirt_0", "Armature/Hips/Skirt_1", "Missing"]
            },
            "legs": { "left_leg": "LeftLeg", "right_leg": "Armature/Hips/RightLeg" },
            "settings": {
                "lateral": { "enabled": true, "length_multiplier": 0.7 },
                "rotation_follow": { "enabled": true }
            }
        }"#;
        let file = ConfigFile::from_json(json).unwrap();
        assert!(file.settings.lateral.enabled);
        assert_eq!(file.settings.lateral.radius, 0.05);
        assert_eq!(file.settings.lateral.length_multiplier, 0.7);
        assert_eq!(file.settings.rotation_follow.weight, 0.5);

        let mut world = World::new();
        let root = scene(&mut world);
        let config = file.resolve(&world, root);

        assert_eq!(config.avatar_root, Some(root));
        let Parenting::AutoCreate {
            skirt_bones,
            vertical_offset_multiplier,
        } = &config.parenting
        else {
            panic!("expected auto create, got {:?}", config.parenting);
        };
        assert_eq!(skirt_bones.len(), 2);
        assert_eq!(*vertical_offset_multiplier, 0.1);
        assert_eq!(hierarchy::node_name(&world, skirt_bones[1]), "Skirt_1");
        assert_eq!(
            hierarchy::node_name(&world, config.legs.right_leg.unwrap()),
            "RightLeg"
        );
        assert_eq!(config.legs.left_knee, None);
        assert!(config.validate(&world).is_ok());
    }

    #[test]
    pub fn test_validate_preconditions() {
        let mut world = World::new();
        let root = scene(&mut world);
        let manual = ConfigFile::from_json(r#"{ "parenting": { "mode": "manual" } }"#).unwrap();
        let mut config = manual.resolve(&world, root);
        assert!(matches!(
            config.validate(&world),
            Err(AutoSkirtError::MissingManualParent)
        ));

        config.avatar_root = None;
        assert!(matches!(
            config.validate(&world),
            Err(AutoSkirtError::MissingAvatarRoot)
        ));

        let skirt = hierarchy::find_node(&world, root, |_, info| info.name == "Skirt_0");
        config.avatar_root = Some(root);
        config.parenting = Parenting::AutoCreate {
            skirt_bones: vec![skirt.unwrap(), skirt.unwrap()],
            vertical_offset_multiplier: 0.1,
        };
        assert!(matches!(
            config.validate(&world),
            Err(AutoSkirtError::NotEnoughCandidates { found: 1 })
        ));

        config.parenting = Parenting::AutoCreate {
            skirt_bones: vec![skirt.unwrap(), root],
            vertical_offset_multiplier: 0.1,
        };
        let error = config.validate(&world).unwrap_err();
        assert!(error.is_precondition());
        assert!(matches!(
            error,
            AutoSkirtError::CandidateContainsAvatarRoot { name } if name == "Avatar"
        ));
    }

    #[test]
    pub fn test_invalid_settings() {
        let mut settings = Settings::default();
        settings.rotation_follow.weight = 1.5;
        assert!(matches!(
            settings.validate(),
            Err(AutoSkirtError::InvalidSetting {
                name: "rotation_follow.weight",
                ..
            })
        ));

        let mut settings = Settings::default();
        settings.straight.radius = f32::NAN;
        assert!(settings.validate().is_err());

        let mut settings = Settings::default();
        settings.auto_fit.weight_threshold = -0.1;
        assert!(settings.validate().is_err());
    }

    #[test]
    pub fn test_unknown_mode_is_rejected() {
        assert!(matches!(
            ConfigFile::from_json(r#"{ "parenting": { "mode": "sideways" } }"#),
            Err(AutoSkirtError::Json(_))
        ));
    }
}
