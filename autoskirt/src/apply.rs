use hecs::{Entity, World};
use log::{info, warn};

use crate::{
    autoskirt_error::{AutoSkirtError, Warning},
    config::{ApplyConfig, Parenting, Settings},
    step::{Step, Technique},
    systems::update_global_transform_system,
    techniques::{
        attach_chain_colliders, attach_rotation_follow, configure_dynamic_chain, fit_limb_radius,
        place_auto_parent, place_colliders, CapsuleParameters, LinkPattern,
    },
    AutoSkirtResult,
};

/// Radius used for each collider pattern
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PatternRadii {
    /// Leg to opposite knee
    pub crossing: f32,
    /// Knee to knee
    pub lateral: f32,
    /// Leg to knee
    pub straight: f32,
}

impl PatternRadii {
    fn from_settings(settings: &Settings) -> Self {
        Self {
            crossing: settings.crossing.radius,
            lateral: settings.lateral.radius,
            straight: settings.straight.radius,
        }
    }

    /// The radius for `pattern`
    pub fn get(&self, pattern: LinkPattern) -> f32 {
        match pattern {
            LinkPattern::Crossing => self.crossing,
            LinkPattern::Lateral => self.lateral,
            LinkPattern::Straight => self.straight,
        }
    }
}

/// What an apply did
#[derive(Debug, Clone)]
pub struct ApplySummary {
    /// The skirt parent, created or chosen
    pub parent: Entity,
    /// Every collider anchor created, in creation order
    pub colliders: Vec<Entity>,
    /// The radius each pattern used
    pub radii: PatternRadii,
    /// The leg radius fitted from the skinned mesh, if radius fitting ran and found vertices
    pub fitted_radius: Option<f32>,
    /// The dynamic chain's radius, if a chain was created and its radius could be inferred
    pub chain_radius: Option<f32>,
    /// One step per technique that ran, in order
    pub steps: Vec<Step>,
}

impl ApplySummary {
    /// How many colliders were created
    pub fn collider_count(&self) -> usize {
        self.colliders.len()
    }

    /// Every warning raised, in order
    pub fn warnings(&self) -> impl Iterator<Item = &Warning> {
        self.steps.iter().flat_map(|step| step.warnings.iter())
    }

    /// Undo the whole apply, newest step first
    pub fn revert(self, world: &mut World) {
        for step in self.steps.into_iter().rev() {
            step.revert(world);
        }
        update_global_transform_system(world);
    }
}

/// Run every enabled technique against the scene.
///
/// All preconditions are checked first; if any fails an error is returned and the scene is left
/// untouched. After that, problems only skip the technique (or the single collider) they affect and
/// are reported as warnings on the returned steps.
pub fn apply(world: &mut World, config: &ApplyConfig) -> AutoSkirtResult<ApplySummary> {
    config.validate(world)?;
    let avatar_root = config.avatar_root.ok_or(AutoSkirtError::MissingAvatarRoot)?;
    let settings = &config.settings;
    let mut steps = Vec::new();

    info!("[AUTOSKIRT] Applying configuration to {avatar_root:?}");

    let parent = match &config.parenting {
        Parenting::AutoCreate {
            skirt_bones,
            vertical_offset_multiplier,
        } => {
            let mut step = Step::new(Technique::AutoParent);
            let placement = place_auto_parent(
                world,
                &mut step,
                skirt_bones,
                *vertical_offset_multiplier,
                avatar_root,
            )?;
            steps.push(step);
            placement.parent
        }
        Parenting::Manual { parent } => parent.ok_or(AutoSkirtError::MissingManualParent)?,
    };

    if settings.rotation_follow.enabled {
        let mut step = Step::new(Technique::RotationFollow);
        attach_rotation_follow(
            world,
            &mut step,
            parent,
            config.legs.left_leg,
            config.legs.right_leg,
            settings.rotation_follow.weight,
        );
        steps.push(step);
    }

    let mut radii = PatternRadii::from_settings(settings);
    let mut fitted_radius = None;
    if settings.auto_fit.enabled {
        let mut step = Step::new(Technique::RadiusFit);
        fitted_radius = fit_leg_radius(world, &mut step, config);
        if let Some(leg) = fitted_radius {
            radii = PatternRadii {
                crossing: leg * settings.auto_fit.crossing_multiplier,
                lateral: leg * settings.auto_fit.lateral_multiplier,
                straight: leg * settings.auto_fit.straight_multiplier,
            };
        }
        steps.push(step);
    }

    let mut colliders = Vec::new();
    for (pattern, pattern_settings) in [
        (LinkPattern::Crossing, settings.crossing),
        (LinkPattern::Lateral, settings.lateral),
        (LinkPattern::Straight, settings.straight),
    ] {
        if !pattern_settings.enabled {
            continue;
        }
        let mut step = Step::new(pattern.technique());
        let parameters = CapsuleParameters {
            radius: radii.get(pattern),
            length_multiplier: pattern_settings.length_multiplier,
        };
        let anchors = place_colliders(
            world,
            &mut step,
            pattern,
            &pattern.links(&config.legs),
            parameters,
        );
        colliders.extend(anchors.into_iter().flatten());
        steps.push(step);
    }

    if colliders.is_empty() {
        warn!("[AUTOSKIRT] No colliders were created");
    } else {
        info!("[AUTOSKIRT] Created {} colliders", colliders.len());
    }

    let mut chain_radius = None;
    if settings.chain.create_or_replace {
        let mut step = Step::new(Technique::DynamicChain);
        chain_radius = configure_dynamic_chain(
            world,
            &mut step,
            parent,
            settings.chain.radius_multiplier,
        )
        .and_then(|chain| chain.radius);
        steps.push(step);
    }

    if settings.chain.attach_colliders {
        let mut step = Step::new(Technique::ChainColliders);
        attach_chain_colliders(world, &mut step, parent, &colliders);
        steps.push(step);
    }

    update_global_transform_system(world);

    Ok(ApplySummary {
        parent,
        colliders,
        radii,
        fitted_radius,
        chain_radius,
        steps,
    })
}

/// Fit both legs and keep the larger radius. `None`, with a warning, if neither leg could be fitted.
fn fit_leg_radius(world: &World, step: &mut Step, config: &ApplyConfig) -> Option<f32> {
    let threshold = config.settings.auto_fit.weight_threshold;
    let mesh = step.require(world, "skinned mesh", config.skinned_mesh)?;
    let legs = config.legs;

    let mut fit = |leg_role: &'static str,
                   leg: Option<Entity>,
                   knee_role: &'static str,
                   knee: Option<Entity>|
     -> f32 {
        let leg = step.require(world, leg_role, leg);
        let knee = step.require(world, knee_role, knee);
        let (Some(leg), Some(knee)) = (leg, knee) else {
            return 0.;
        };
        match fit_limb_radius(world, mesh, leg, knee, threshold) {
            Ok(fit) => fit.radius,
            Err(warning) => {
                step.warn(warning);
                0.
            }
        }
    };
    let left = fit("left leg", legs.left_leg, "left knee", legs.left_knee);
    let right = fit("right leg", legs.right_leg, "right knee", legs.right_knee);

    let leg = left.max(right);
    if leg > 0. {
        info!("[AUTOSKIRT] Fitted leg radius {leg:.4} (left {left:.4}, right {right:.4})");
        Some(leg)
    } else {
        step.warn(Warning::DegenerateGeometry {
            technique: Technique::RadiusFit,
            reason: "no leg vertices passed the weight threshold; keeping the configured radii"
                .to_string(),
        });
        None
    }
}
