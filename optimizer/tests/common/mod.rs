//! Shared avatar fixtures for the integration tests.

#![allow(dead_code)]

use skinweld_core::animation::{AnimationClip, AnimatorController, State, StateMachine};
use skinweld_core::avatar::{AnimatorBinding, Avatar, SkinnedRenderer};
use skinweld_core::material::Material;
use skinweld_core::math::Vec3;
use skinweld_core::mesh::{generators, BlendShape, BlendShapeFrame, SkinnedMesh};
use skinweld_core::registry::{ClipId, ControllerId, NodeId, RendererId};
use skinweld_core::scene::NodeTransform;

/// Builds avatars with renderers skinned to a shared hips bone.
pub struct AvatarBuilder {
    pub avatar: Avatar,
    pub hips: NodeId,
}

impl AvatarBuilder {
    pub fn new() -> Self {
        let mut avatar = Avatar::new("Avatar");
        let root = avatar.root();
        let armature = avatar
            .nodes
            .add_child(root, "Armature", NodeTransform::IDENTITY)
            .unwrap();
        let hips = avatar
            .nodes
            .add_child(armature, "Hips", NodeTransform::IDENTITY)
            .unwrap();
        Self { avatar, hips }
    }

    /// Add a renderer under the avatar root at the origin.
    pub fn renderer(&mut self, name: &str, mesh: SkinnedMesh, materials: usize) -> RendererId {
        self.renderer_at(name, mesh, materials, NodeTransform::IDENTITY)
    }

    /// Add a renderer under the avatar root with its own material per slot.
    pub fn renderer_at(
        &mut self,
        name: &str,
        mut mesh: SkinnedMesh,
        materials: usize,
        transform: NodeTransform,
    ) -> RendererId {
        let root = self.avatar.root();
        let node = self.avatar.nodes.add_child(root, name, transform).unwrap();
        let first = mesh.sub_meshes.first().cloned().unwrap_or_default();
        while mesh.sub_meshes.len() < materials {
            mesh.sub_meshes.push(first.clone());
        }
        mesh.name = format!("{name}Mesh");
        let mesh = self.avatar.meshes.insert(mesh);
        let materials = (0..materials)
            .map(|i| {
                self.avatar
                    .materials
                    .insert(Material::new(format!("{name}{i}")))
            })
            .collect();
        self.avatar.renderers.insert(
            SkinnedRenderer::new(node, mesh)
                .with_root_bone(self.hips)
                .with_bones(vec![self.hips])
                .with_materials(materials),
        )
    }

    /// Add an FX controller playing each clip in its own state.
    pub fn controller(&mut self, clips: Vec<AnimationClip>) -> (ControllerId, Vec<ClipId>) {
        let ids: Vec<ClipId> = clips
            .into_iter()
            .map(|clip| self.avatar.clips.insert(clip))
            .collect();
        let states = ids
            .iter()
            .enumerate()
            .map(|(i, &clip)| State {
                name: format!("State{i}"),
                motion: Some(clip),
            })
            .collect();
        let controller = self.avatar.controllers.insert(
            AnimatorController::new("FX").with_layer(StateMachine {
                states,
                children: Vec::new(),
            }),
        );
        let root = self.avatar.root();
        self.avatar.animators.push(AnimatorBinding { root, controller });
        (controller, ids)
    }

    pub fn build(self) -> Avatar {
        self.avatar
    }
}

/// A grid of `columns * rows` cells, `(columns + 1) * (rows + 1)` vertices.
pub fn grid(columns: u32, rows: u32) -> SkinnedMesh {
    generators::generate_skinned_grid(columns, rows, 1.0)
}

/// A shape with one frame per weight, lifting every vertex along Y by the
/// frame's index plus one.
pub fn lifting_shape(name: &str, vertex_count: usize, weights: &[f32]) -> BlendShape {
    let frames = weights
        .iter()
        .enumerate()
        .map(|(i, &w)| {
            BlendShapeFrame::from_positions(w, vec![Vec3::y() * (i as f32 + 1.0); vertex_count])
        })
        .collect();
    BlendShape::new(name, frames)
}

/// A single-frame shape moving only the listed vertices.
pub fn hiding_shape(name: &str, vertex_count: usize, moved: &[usize]) -> BlendShape {
    let mut deltas = vec![Vec3::zeros(); vertex_count];
    for &i in moved {
        deltas[i] = Vec3::new(0.0, -1.0, 0.0);
    }
    BlendShape::new(name, vec![BlendShapeFrame::from_positions(100.0, deltas)])
}
