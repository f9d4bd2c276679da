#![deny(missing_docs)]

//! Automatic collider and constraint setup for avatar skirts.
//!
//! Given a skinned humanoid avatar loaded into a [`hecs::World`], `autoskirt` creates a parent node
//! above the skirt bones, places capsule colliders between the legs in crossing, lateral and straight
//! patterns, fits their radii to the leg mesh, and configures the skirt's dynamic chain so that the
//! skirt cannot pass through the legs.
//!
//! # Getting started
//! Load an avatar with [`asset_importer::load_avatar_from_glb`], describe what you want with a
//! [`config::ConfigFile`], resolve it against the loaded scene and hand the result to [`apply`].
//! Everything [`apply`] did is recorded in the returned [`ApplySummary`], which can also undo it.

pub use glam;
pub use hecs;
pub use rapier3d;

pub use apply::{apply, ApplySummary, PatternRadii};
pub use autoskirt_error::{AutoSkirtError, Warning};
pub use config::{ApplyConfig, ConfigFile, Settings};

/// The apply pipeline
pub mod apply;
/// Tools to import avatars from glTF files
pub mod asset_importer;
mod autoskirt_error;
/// Components are the data attached to the nodes of an avatar
pub mod components;
/// Options for an apply, and the file format they are stored in
pub mod config;
/// Building, searching and rearranging the node hierarchy
pub mod hierarchy;
/// Reversible records of what each technique changed
pub mod step;
/// Systems keep derived data in the world up to date
pub mod systems;
pub mod techniques;
/// Kitchen sink utility functions
pub mod util;

/// AutoSkirt result type
pub type AutoSkirtResult<T> = std::result::Result<T, AutoSkirtError>;
