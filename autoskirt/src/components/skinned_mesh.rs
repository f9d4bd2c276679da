use glam::Vec3;
use hecs::Entity;

/// The skinning data of a mesh: the bind pose vertex positions and, for each vertex, up to four
/// (bone index, weight) pairs.
///
/// Bone indices refer to `bones`, the bind bone list. Vertex positions are in the owning entity's
/// local space, so the owning entity's world transform is the mesh's local-to-world transform.
/// Automatically added by `asset_importer` for nodes that have both a mesh and a skin.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SkinnedMesh {
    /// Vertex positions in mesh space
    pub positions: Vec<Vec3>,
    /// Indices into `bones`, four per vertex
    pub joint_indices: Vec<[u16; 4]>,
    /// Weights matching `joint_indices`, four per vertex. Not necessarily normalised.
    pub joint_weights: Vec<[f32; 4]>,
    /// The bind bone list
    pub bones: Vec<Entity>,
}

impl SkinnedMesh {
    /// Are the vertex buffers present and consistent with one another?
    pub fn is_valid(&self) -> bool {
        !self.positions.is_empty()
            && !self.bones.is_empty()
            && self.joint_indices.len() == self.positions.len()
            && self.joint_weights.len() == self.positions.len()
    }

    /// Index of `bone` in the bind bone list
    pub fn bone_index(&self, bone: Entity) -> Option<usize> {
        self.bones.iter().position(|b| *b == bone)
    }

    /// The weight `bone_index` contributes to vertex `vertex`, or zero if none of its slots match
    pub fn weight_for_bone(&self, vertex: usize, bone_index: usize) -> f32 {
        let (Some(indices), Some(weights)) =
            (self.joint_indices.get(vertex), self.joint_weights.get(vertex))
        else {
            return 0.;
        };

        indices
            .iter()
            .zip(weights)
            .find(|(index, _)| **index as usize == bone_index)
            .map(|(_, weight)| *weight)
            .unwrap_or_default()
    }
}
