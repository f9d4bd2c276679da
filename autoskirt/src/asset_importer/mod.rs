use std::collections::HashMap;

use glam::Vec3;
use gltf::Document;
use hecs::{Entity, World};
use log::{debug, info};

use crate::{
    autoskirt_error::AutoSkirtError,
    components::{Children, GlobalTransform, Info, LocalTransform, Parent, Root, SkinnedMesh},
    systems::update_global_transform_system,
    AutoSkirtResult,
};

/// Name of the node created to hold a scene that has more than one root
pub const SCENE_ROOT_NAME: &str = "Scene";

/// Convenience struct to hold all the necessary bits and pieces during the import of a single glTF file
struct ImportContext {
    document: Document,
    buffers: Vec<gltf::buffer::Data>,
    node_entity_map: HashMap<usize, Entity>,
}

impl ImportContext {
    fn new(glb_buffer: &[u8]) -> AutoSkirtResult<Self> {
        let (document, buffers, _images) = gltf::import_slice(glb_buffer)?;
        Ok(Self {
            document,
            buffers,
            node_entity_map: Default::default(),
        })
    }
}

/// Load an avatar from a GLB (or self-contained glTF) file.
///
/// Returns the scene and its root. A scene with several root nodes is gathered under a new node
/// named [`SCENE_ROOT_NAME`].
pub fn load_avatar_from_glb(glb_buffer: &[u8]) -> AutoSkirtResult<(World, Entity)> {
    let mut import_context = ImportContext::new(glb_buffer)?;
    let mut world = World::new();

    let document = import_context.document.clone();
    let scene = document
        .default_scene()
        .or_else(|| document.scenes().next())
        .ok_or(AutoSkirtError::EmptyScene)?;

    let roots = scene
        .nodes()
        .map(|node_data| load_node(&node_data, &mut import_context, &mut world, None))
        .collect::<Vec<_>>();

    let root = match roots.as_slice() {
        [] => return Err(AutoSkirtError::EmptyScene),
        [root] => *root,
        _ => {
            let scene_root = world.spawn((
                Info::new(SCENE_ROOT_NAME),
                LocalTransform::default(),
                GlobalTransform::default(),
                Children(roots.clone()),
            ));
            for root in &roots {
                world.insert_one(*root, Parent(scene_root)).map_err(anyhow::Error::from)?;
            }
            scene_root
        }
    };
    world.insert_one(root, Root {}).map_err(anyhow::Error::from)?;

    add_skinned_meshes(&import_context, &mut world)?;
    update_global_transform_system(&mut world);

    info!(
        "[AUTOSKIRT_GLTF] Loaded {} nodes from {} scene roots",
        import_context.node_entity_map.len(),
        roots.len()
    );

    Ok((world, root))
}

fn load_node(
    node_data: &gltf::Node,
    import_context: &mut ImportContext,
    world: &mut World,
    parent: Option<Entity>,
) -> Entity {
    let info = Info {
        name: node_data
            .name()
            .map(|s| s.to_string())
            .unwrap_or(format!("Node {}", node_data.index())),
        node_id: Some(node_data.index()),
    };
    let this_entity = world.spawn((
        info,
        LocalTransform::load(node_data.transform()),
        GlobalTransform::default(),
    ));
    if let Some(parent) = parent {
        let _ = world.insert_one(this_entity, Parent(parent));
    }
    import_context
        .node_entity_map
        .insert(node_data.index(), this_entity);

    let children = node_data
        .children()
        .map(|child| load_node(&child, import_context, world, Some(this_entity)))
        .collect();
    let _ = world.insert_one(this_entity, Children(children));

    this_entity
}

fn add_skinned_meshes(import_context: &ImportContext, world: &mut World) -> AutoSkirtResult<()> {
    for node_data in import_context.document.nodes() {
        let (Some(mesh_data), Some(skin_data)) = (node_data.mesh(), node_data.skin()) else {
            continue;
        };
        let Some(this_entity) = import_context.node_entity_map.get(&node_data.index()) else {
            continue;
        };

        let bones = skin_data
            .joints()
            .filter_map(|joint| import_context.node_entity_map.get(&joint.index()).copied())
            .collect();
        let mut skinned_mesh = SkinnedMesh {
            bones,
            ..Default::default()
        };

        for primitive in mesh_data.primitives() {
            let reader = primitive.reader(|buffer| {
                import_context
                    .buffers
                    .get(buffer.index())
                    .map(|data| data.0.as_slice())
            });
            let Some(positions) = reader.read_positions() else {
                continue;
            };
            let positions = positions.map(Vec3::from).collect::<Vec<_>>();
            let count = positions.len();

            let joint_indices = reader
                .read_joints(0)
                .map(|joints| joints.into_u16().collect::<Vec<_>>())
                .unwrap_or_else(|| vec![[0; 4]; count]);
            let joint_weights = reader
                .read_weights(0)
                .map(|weights| weights.into_f32().collect::<Vec<_>>())
                .unwrap_or_else(|| vec![[0.; 4]; count]);

            skinned_mesh.positions.extend(positions);
            skinned_mesh.joint_indices.extend(joint_indices);
            skinned_mesh.joint_weights.extend(joint_weights);
        }

        debug!(
            "[AUTOSKIRT_GLTF] Adding a skinned mesh to {} with {} vertices and {} bones",
            node_data.name().unwrap_or("a node"),
            skinned_mesh.positions.len(),
            skinned_mesh.bones.len()
        );
        world
            .insert_one(*this_entity, skinned_mesh)
            .map_err(anyhow::Error::from)?;
    }

    Ok(())
}
