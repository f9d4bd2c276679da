use thiserror::Error;

use crate::step::Technique;

/// Fatal outcomes. Everything in here aborts an apply before the scene is touched, or comes from
/// loading the inputs in the first place.
#[derive(Error, Debug)]
pub enum AutoSkirtError {
    /// No avatar root was given, or it is no longer in the scene
    #[error("Please assign an avatar root before applying configuration")]
    MissingAvatarRoot,
    /// Auto-create needs at least two distinct, live skirt bones
    #[error("Please add two or more skirt bones to calculate the auto parent position (found {found})")]
    NotEnoughCandidates {
        /// How many usable skirt bones there were
        found: usize,
    },
    /// A skirt bone is the avatar root or one of its ancestors, so it cannot go under the new parent
    #[error("Skirt bone {name} contains the avatar root and cannot be moved under the skirt parent")]
    CandidateContainsAvatarRoot {
        /// Name of the offending skirt bone
        name: String,
    },
    /// Manual parenting was chosen without a live parent node
    #[error("Please assign a manual skirt parent or enable auto-create")]
    MissingManualParent,
    /// A numeric setting is out of range
    #[error("Setting `{name}` is invalid: {reason}")]
    InvalidSetting {
        /// The setting, as a dotted path
        name: &'static str,
        /// What is wrong with it
        reason: String,
    },
    /// The glTF file has no scene, or its scene has no nodes
    #[error("The glTF file does not contain a scene")]
    EmptyScene,
    /// The glTF file could not be parsed
    #[error("There was a problem loading the glTF file")]
    Gltf(#[from] gltf::Error),
    /// The configuration file could not be parsed
    #[error("There was a problem reading the configuration")]
    Json(#[from] serde_json::Error),
    /// Reading a file failed
    #[error(transparent)]
    IO(#[from] std::io::Error),
    /// Anything else
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl AutoSkirtError {
    /// Was this raised by a precondition check, before any mutation?
    pub fn is_precondition(&self) -> bool {
        matches!(
            self,
            AutoSkirtError::MissingAvatarRoot
                | AutoSkirtError::NotEnoughCandidates { .. }
                | AutoSkirtError::CandidateContainsAvatarRoot { .. }
                | AutoSkirtError::MissingManualParent
                | AutoSkirtError::InvalidSetting { .. }
        )
    }
}

/// Non-fatal outcomes. The affected technique (or link) is skipped or falls back to a safe default,
/// and everything else carries on.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum Warning {
    /// A node the technique needs was never set
    #[error("[{technique}] {role} is not set; skipping")]
    MissingReference {
        /// The technique that was skipped
        technique: Technique,
        /// What the node is for, eg. "left knee"
        role: &'static str,
    },
    /// A node the technique needs was removed after it was chosen
    #[error("[{technique}] {role} no longer exists; skipping")]
    StaleReference {
        /// The technique that was skipped
        technique: Technique,
        /// What the node was for
        role: &'static str,
    },
    /// The geometry could not be used, so a safe default was substituted
    #[error("[{technique}] {reason}")]
    DegenerateGeometry {
        /// The technique that fell back
        technique: Technique,
        /// What went wrong and what was used instead
        reason: String,
    },
    /// A reparent was refused because it would create a loop
    #[error("[{technique}] moving {node} would make it its own ancestor; skipping")]
    HierarchyCycle {
        /// The technique that asked for the move
        technique: Technique,
        /// Name of the node that was not moved
        node: String,
    },
    /// No hip bone was found, so the skirt parent hangs from the avatar root
    #[error("Could not find hip bone, defaulted to avatar root")]
    HipsNotFound,
}
