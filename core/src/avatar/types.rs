//! Avatar container types.

use serde::{Deserialize, Serialize};

use crate::animation::{AnimationClip, AnimatorController};
use crate::material::Material;
use crate::math::Bounds;
use crate::mesh::SkinnedMesh;
use crate::registry::{ClipId, ControllerId, MaterialId, MeshId, NodeId, Registry, RendererId};
use crate::scene::NodeTree;

/// Shadow casting mode of a renderer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize, Deserialize)]
pub enum ShadowCasting {
    /// No shadows.
    Off,
    /// Casts shadows.
    #[default]
    On,
    /// Casts shadows from both faces.
    TwoSided,
    /// Only the shadow is rendered.
    ShadowsOnly,
}

/// Light or reflection probe usage.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize, Deserialize)]
pub enum ProbeUsage {
    /// Probes are not used.
    Off,
    /// Probes are blended.
    #[default]
    BlendProbes,
    /// Probes blend with the skybox.
    BlendProbesAndSkybox,
    /// A single probe is used.
    Simple,
}

/// Maximum number of bones influencing a vertex when skinning.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize, Deserialize)]
pub enum SkinQuality {
    /// Project-wide setting.
    #[default]
    Auto,
    /// One bone.
    Bone1,
    /// Two bones.
    Bone2,
    /// Four bones.
    Bone4,
}

/// Static renderer configuration compared when grouping renderers.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(default)]
pub struct RendererSettings {
    /// Shadow casting mode.
    pub shadow_casting: ShadowCasting,
    /// Whether the renderer receives shadows.
    pub receive_shadows: bool,
    /// Whether bounds are updated while off screen.
    pub update_when_offscreen: bool,
    /// Light probe usage.
    pub light_probes: ProbeUsage,
    /// Reflection probe usage.
    pub reflection_probes: ProbeUsage,
    /// Skinning quality.
    pub quality: SkinQuality,
    /// Node anchoring probe sampling.
    pub probe_anchor: Option<NodeId>,
    /// Whether skinned motion vectors are generated.
    pub skinned_motion_vectors: bool,
    /// Whether dynamic occlusion culling is allowed.
    pub dynamic_occlusion: bool,
}

impl Default for RendererSettings {
    fn default() -> Self {
        Self {
            shadow_casting: ShadowCasting::On,
            receive_shadows: true,
            update_when_offscreen: false,
            light_probes: ProbeUsage::BlendProbes,
            reflection_probes: ProbeUsage::BlendProbes,
            quality: SkinQuality::Auto,
            probe_anchor: None,
            skinned_motion_vectors: true,
            dynamic_occlusion: true,
        }
    }
}

/// A skinned mesh renderer living on a node.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SkinnedRenderer {
    /// Node hosting the renderer.
    pub node: NodeId,
    /// Whether the renderer component is enabled.
    #[serde(default = "enabled_default")]
    pub enabled: bool,
    /// Static settings.
    #[serde(default)]
    pub settings: RendererSettings,
    /// Root bone; `None` uses the host node.
    #[serde(default)]
    pub root_bone: Option<NodeId>,
    /// Bone list addressed by mesh bone weights. Entries may be missing.
    #[serde(default)]
    pub bones: Vec<Option<NodeId>>,
    /// Material per submesh slot.
    #[serde(default)]
    pub materials: Vec<MaterialId>,
    /// Rendered mesh.
    pub mesh: MeshId,
    /// Current blend shape weights by mesh shape index.
    #[serde(default)]
    pub blend_shape_weights: Vec<f32>,
    /// Bounds in the host node's local space.
    #[serde(default)]
    pub local_bounds: Bounds,
}

fn enabled_default() -> bool {
    true
}

impl SkinnedRenderer {
    /// Create an enabled renderer with default settings.
    pub fn new(node: NodeId, mesh: MeshId) -> Self {
        Self {
            node,
            enabled: true,
            settings: RendererSettings::default(),
            root_bone: None,
            bones: Vec::new(),
            materials: Vec::new(),
            mesh,
            blend_shape_weights: Vec::new(),
            local_bounds: Bounds::default(),
        }
    }

    /// Set the root bone.
    #[must_use]
    pub fn with_root_bone(mut self, bone: NodeId) -> Self {
        self.root_bone = Some(bone);
        self
    }

    /// Set the bone list.
    #[must_use]
    pub fn with_bones(mut self, bones: Vec<NodeId>) -> Self {
        self.bones = bones.into_iter().map(Some).collect();
        self
    }

    /// Set the materials.
    #[must_use]
    pub fn with_materials(mut self, materials: Vec<MaterialId>) -> Self {
        self.materials = materials;
        self
    }

    /// Set the local bounds.
    #[must_use]
    pub fn with_local_bounds(mut self, bounds: Bounds) -> Self {
        self.local_bounds = bounds;
        self
    }

    /// Root bone, or the host node when none is set.
    pub fn effective_root_bone(&self) -> NodeId {
        self.root_bone.unwrap_or(self.node)
    }

    /// Current weight of the blend shape at `index`; missing entries are zero.
    pub fn blend_shape_weight(&self, index: usize) -> f32 {
        self.blend_shape_weights.get(index).copied().unwrap_or(0.0)
    }

    /// Set the weight of the blend shape at `index`, growing the list as needed.
    pub fn set_blend_shape_weight(&mut self, index: usize, weight: f32) {
        if self.blend_shape_weights.len() <= index {
            self.blend_shape_weights.resize(index + 1, 0.0);
        }
        self.blend_shape_weights[index] = weight;
    }
}

/// An animator playing a controller relative to a root node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnimatorBinding {
    /// Node binding paths are resolved from.
    pub root: NodeId,
    /// Controller played.
    pub controller: ControllerId,
}

/// Avatar-level references to specific renderers and blend shapes.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AvatarMappings {
    /// Renderer driving visemes.
    pub viseme_renderer: Option<RendererId>,
    /// Viseme blend shape names.
    pub viseme_blend_shapes: Vec<String>,
    /// Renderer driving eyelids.
    pub eyelid_renderer: Option<RendererId>,
    /// Eyelid blend shape indices on the eyelid renderer's mesh; `-1` is unset.
    pub eyelid_blend_shapes: Vec<i32>,
}

/// A fully resolved avatar: hierarchy, renderers and every asset they use.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Avatar {
    /// Avatar name.
    pub name: String,
    /// Node hierarchy; its root is the avatar root.
    pub nodes: NodeTree,
    /// Skinned renderers.
    #[serde(default)]
    pub renderers: Registry<RendererId, SkinnedRenderer>,
    /// Mesh assets.
    #[serde(default)]
    pub meshes: Registry<MeshId, SkinnedMesh>,
    /// Material assets.
    #[serde(default)]
    pub materials: Registry<MaterialId, Material>,
    /// Animation clip assets.
    #[serde(default)]
    pub clips: Registry<ClipId, AnimationClip>,
    /// Animator controller assets.
    #[serde(default)]
    pub controllers: Registry<ControllerId, AnimatorController>,
    /// Animators on the avatar.
    #[serde(default)]
    pub animators: Vec<AnimatorBinding>,
    /// Viseme and eyelid mappings.
    #[serde(default)]
    pub mappings: AvatarMappings,
}
