use anyhow::{bail, Context, Result};
use autoskirt::{
    apply,
    asset_importer::load_avatar_from_glb,
    components::{Collider, DynamicChain},
    hecs::{Entity, World},
    hierarchy, ApplySummary, ConfigFile,
};
use glam::Vec3;
use log::{info, warn};
use serde::Serialize;

#[derive(Debug, Serialize)]
struct ColliderReport {
    name: String,
    attached_to: Option<String>,
    position: Vec3,
    radius: f32,
    height: f32,
}

#[derive(Debug, Serialize)]
struct Report {
    parent: String,
    collider_count: usize,
    colliders: Vec<ColliderReport>,
    crossing_radius: f32,
    lateral_radius: f32,
    straight_radius: f32,
    fitted_radius: Option<f32>,
    chain_radius: Option<f32>,
    chain_colliders: usize,
    warnings: Vec<String>,
}

impl Report {
    fn new(world: &World, summary: &ApplySummary) -> Self {
        let colliders = summary
            .colliders
            .iter()
            .filter_map(|anchor| collider_report(world, *anchor))
            .collect();
        let chain_colliders = world
            .get::<&DynamicChain>(summary.parent)
            .map(|chain| chain.colliders.len())
            .unwrap_or_default();

        Self {
            parent: hierarchy::node_name(world, summary.parent),
            collider_count: summary.collider_count(),
            colliders,
            crossing_radius: summary.radii.crossing,
            lateral_radius: summary.radii.lateral,
            straight_radius: summary.radii.straight,
            fitted_radius: summary.fitted_radius,
            chain_radius: summary.chain_radius,
            chain_colliders,
            warnings: summary.warnings().map(ToString::to_string).collect(),
        }
    }
}

fn collider_report(world: &World, anchor: Entity) -> Option<ColliderReport> {
    let collider = world.get::<&Collider>(anchor).ok()?;
    Some(ColliderReport {
        name: hierarchy::node_name(world, anchor),
        attached_to: hierarchy::parent_of(world, anchor).map(|p| hierarchy::node_name(world, p)),
        position: hierarchy::world_position(world, anchor)?,
        radius: collider.radius(),
        height: collider.height(),
    })
}

pub fn main() -> Result<()> {
    env_logger::builder()
        .filter_level(log::LevelFilter::Info)
        .parse_default_env()
        .init();

    let args = std::env::args().skip(1).collect::<Vec<_>>();
    let [avatar_path, config_path] = args.as_slice() else {
        bail!("Usage: autoskirt <avatar.glb> <config.json>");
    };

    let glb = std::fs::read(avatar_path).with_context(|| format!("Unable to read {avatar_path}"))?;
    let (mut world, scene_root) = load_avatar_from_glb(&glb)?;
    info!("Loaded {avatar_path}");

    let json = std::fs::read_to_string(config_path)
        .with_context(|| format!("Unable to read {config_path}"))?;
    let config = ConfigFile::from_json(&json)?.resolve(&world, scene_root);

    let summary = apply(&mut world, &config)?;
    if summary.warnings().next().is_some() {
        warn!("Finished with {} warnings", summary.warnings().count());
    }

    let report = Report::new(&world, &summary);
    println!("{}", serde_json::to_string_pretty(&report)?);

    Ok(())
}
