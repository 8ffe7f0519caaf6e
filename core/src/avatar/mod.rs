//! The in-memory avatar model.
//!
//! An [`Avatar`] owns the node hierarchy and every asset its renderers and
//! animators use. Assets are addressed by typed ids from
//! [`crate::registry`], so passes can replace a mesh or clip without
//! touching anything that does not reference it.
//!
//! Animation bindings are resolved the way an animator would: the binding
//! path is walked from the animator's root node and the target type picks
//! the component on the node found ([`Avatar::resolve_binding`]).

mod error;
mod types;

pub use error::AvatarError;
pub use types::{
    AnimatorBinding, Avatar, AvatarMappings, ProbeUsage, RendererSettings, ShadowCasting,
    SkinQuality, SkinnedRenderer,
};

use crate::animation::{CurveBinding, TargetType};
use crate::mesh::SkinnedMesh;
use crate::registry::{ClipId, NodeId, Registry, RendererId};
use crate::scene::NodeTree;

/// A clip as played by one animator.
///
/// The same clip played from two roots yields two references.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct AnimationReference {
    /// Node the clip's binding paths are relative to.
    pub root: NodeId,
    /// The clip.
    pub clip: ClipId,
}

/// What a curve binding animates.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AnimatedObject {
    /// A skinned renderer component.
    Renderer(RendererId),
    /// A node (game object or transform bindings).
    Node(NodeId),
    /// A component of a type this model does not describe.
    Other {
        /// Node carrying the component.
        node: NodeId,
        /// Component type name.
        component: String,
    },
    /// The path or the component does not exist.
    Missing,
}

impl Avatar {
    /// Create an avatar with an empty hierarchy.
    pub fn new(name: impl Into<String>) -> Self {
        let name = name.into();
        Self {
            nodes: NodeTree::new(name.clone()),
            name,
            renderers: Registry::new(),
            meshes: Registry::new(),
            materials: Registry::new(),
            clips: Registry::new(),
            controllers: Registry::new(),
            animators: Vec::new(),
            mappings: AvatarMappings::default(),
        }
    }

    /// The avatar root node.
    pub fn root(&self) -> NodeId {
        self.nodes.root()
    }

    /// Renderer hosted on `node`, if any.
    pub fn renderer_on_node(&self, node: NodeId) -> Option<RendererId> {
        self.renderers
            .iter()
            .find(|(_, r)| r.node == node)
            .map(|(id, _)| id)
    }

    /// Display name of a renderer: its host node's name.
    pub fn renderer_name(&self, id: RendererId) -> &str {
        self.renderers
            .get(id)
            .map_or("<missing>", |r| self.nodes.name(r.node))
    }

    /// A renderer and its mesh.
    pub fn renderer_and_mesh(
        &self,
        id: RendererId,
    ) -> Result<(&SkinnedRenderer, &SkinnedMesh), AvatarError> {
        let renderer = self
            .renderers
            .get(id)
            .ok_or(AvatarError::MissingRenderer(id))?;
        let mesh = self
            .meshes
            .get(renderer.mesh)
            .ok_or(AvatarError::MissingMesh(renderer.mesh))?;
        Ok((renderer, mesh))
    }

    /// Check that every id a renderer holds resolves.
    ///
    /// Missing bone entries are allowed; bone ids that are set must exist.
    pub fn validate_renderer(&self, id: RendererId) -> Result<(), AvatarError> {
        let (renderer, _) = self.renderer_and_mesh(id)?;
        let nodes = std::iter::once(renderer.node)
            .chain(renderer.root_bone)
            .chain(renderer.settings.probe_anchor)
            .chain(renderer.bones.iter().flatten().copied());
        for node in nodes {
            if !self.nodes.contains(node) {
                return Err(AvatarError::MissingNode(node));
            }
        }
        if let Some(material) = renderer
            .materials
            .iter()
            .find(|m| !self.materials.contains(**m))
        {
            return Err(AvatarError::MissingMaterial(*material));
        }
        Ok(())
    }

    /// Every (animator root, clip) pair reachable from the avatar's animators.
    ///
    /// Controllers are walked through nested state machines; each pair is
    /// reported once, in animator then state order.
    pub fn animation_references(&self) -> Vec<AnimationReference> {
        let mut refs = Vec::new();
        for animator in &self.animators {
            let Some(controller) = self.controllers.get(animator.controller) else {
                log::warn!(
                    "avatar {}: animator on {} references missing {}",
                    self.name,
                    self.nodes.name(animator.root),
                    animator.controller
                );
                continue;
            };
            for clip in controller.clips() {
                let reference = AnimationReference {
                    root: animator.root,
                    clip,
                };
                if !refs.contains(&reference) {
                    refs.push(reference);
                }
            }
        }
        refs
    }

    /// Resolve what a binding animates when played from `root`.
    pub fn resolve_binding(&self, root: NodeId, binding: &CurveBinding) -> AnimatedObject {
        let Some(node) = self.nodes.find_by_path(root, &binding.path) else {
            return AnimatedObject::Missing;
        };
        match &binding.target {
            TargetType::GameObject | TargetType::Transform => AnimatedObject::Node(node),
            TargetType::SkinnedRenderer => self
                .renderer_on_node(node)
                .map_or(AnimatedObject::Missing, AnimatedObject::Renderer),
            TargetType::Other(component) => AnimatedObject::Other {
                node,
                component: component.clone(),
            },
        }
    }

    /// Blend shape names of the eyelid mapping, captured for re-resolution.
    ///
    /// Indices that do not resolve become `None`. Returns `None` when
    /// `renderer` is not the eyelid renderer.
    pub fn eyelid_blend_shape_names(&self, renderer: RendererId) -> Option<Vec<Option<String>>> {
        if self.mappings.eyelid_renderer != Some(renderer) {
            return None;
        }
        let mesh = self.renderer_and_mesh(renderer).ok().map(|(_, m)| m);
        Some(
            self.mappings
                .eyelid_blend_shapes
                .iter()
                .map(|&index| {
                    let mesh = mesh?;
                    let index = usize::try_from(index).ok()?;
                    mesh.blend_shape_name(index).map(str::to_owned)
                })
                .collect(),
        )
    }

    /// Re-resolve eyelid indices by name against the eyelid renderer's mesh.
    /// Names that no longer exist map to `-1`.
    pub fn restore_eyelid_blend_shapes(&mut self, names: &[Option<String>]) {
        let mesh = self
            .mappings
            .eyelid_renderer
            .and_then(|id| self.renderer_and_mesh(id).ok())
            .map(|(_, m)| m);
        let indices = names
            .iter()
            .map(|name| {
                name.as_deref()
                    .and_then(|n| mesh.and_then(|m| m.blend_shape_index(n)))
                    .and_then(|i| i32::try_from(i).ok())
                    .unwrap_or(-1)
            })
            .collect();
        self.mappings.eyelid_blend_shapes = indices;
    }
}
