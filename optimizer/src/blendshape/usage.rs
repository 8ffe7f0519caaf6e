use std::collections::{BTreeMap, BTreeSet};

use skinweld_core::avatar::{AnimatedObject, Avatar};
use skinweld_core::registry::RendererId;

/// Blend shapes something outside the mesh depends on, per renderer.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BlendShapeUsage {
    /// Shapes driven by an animation curve.
    pub animated: BTreeMap<RendererId, BTreeSet<String>>,
    /// Shapes referenced by the avatar's viseme or eyelid mappings.
    pub mapped: BTreeMap<RendererId, BTreeSet<String>>,
}

impl BlendShapeUsage {
    /// Whether a curve drives `name` on `renderer`.
    pub fn is_animated(&self, renderer: RendererId, name: &str) -> bool {
        self.animated
            .get(&renderer)
            .is_some_and(|names| names.contains(name))
    }

    /// Whether an avatar mapping names `name` on `renderer`.
    pub fn is_mapped(&self, renderer: RendererId, name: &str) -> bool {
        self.mapped
            .get(&renderer)
            .is_some_and(|names| names.contains(name))
    }
}

/// Scan animations and avatar mappings for blend shape references.
pub fn collect_usage(avatar: &Avatar) -> BlendShapeUsage {
    let mut usage = BlendShapeUsage::default();
    for source in avatar.animation_references() {
        let Some(clip) = avatar.clips.get(source.clip) else {
            continue;
        };
        for binding in &clip.bindings {
            let Some(name) = binding.blend_shape() else {
                continue;
            };
            if let AnimatedObject::Renderer(id) = avatar.resolve_binding(source.root, binding) {
                usage
                    .animated
                    .entry(id)
                    .or_default()
                    .insert(name.to_owned());
            }
        }
    }

    let mappings = &avatar.mappings;
    if let Some(id) = mappings.viseme_renderer {
        usage
            .mapped
            .entry(id)
            .or_default()
            .extend(mappings.viseme_blend_shapes.iter().cloned());
    }
    if let Some(id) = mappings.eyelid_renderer {
        let names = avatar.eyelid_blend_shape_names(id).unwrap_or_default();
        usage
            .mapped
            .entry(id)
            .or_default()
            .extend(names.into_iter().flatten());
    }
    usage
}

#[cfg(test)]
mod tests {
    use super::*;
    use skinweld_core::animation::{
        AnimationClip, AnimatorController, Curve, CurveBinding, State, StateMachine, TargetType,
    };
    use skinweld_core::avatar::{AnimatorBinding, SkinnedRenderer};
    use skinweld_core::mesh::{BlendShape, BlendShapeFrame, SkinnedMesh};
    use skinweld_core::scene::NodeTransform;

    #[test]
    fn animated_and_mapped_shapes_are_collected() {
        let mut avatar = Avatar::new("Avatar");
        let root = avatar.root();
        let face = avatar.nodes.add_child(root, "Face", NodeTransform::IDENTITY).unwrap();
        let mesh = avatar.meshes.insert(
            SkinnedMesh::new("face")
                .with_blend_shape(BlendShape::new("Blink", vec![BlendShapeFrame::zeroed(0, 100.0)]))
                .with_blend_shape(BlendShape::new("vrc.v_aa", vec![BlendShapeFrame::zeroed(0, 100.0)])),
        );
        let renderer = avatar.renderers.insert(SkinnedRenderer::new(face, mesh));
        let clip = avatar.clips.insert(AnimationClip::new("Smile").with_binding(CurveBinding::new(
            "Face",
            TargetType::SkinnedRenderer,
            "blendShape.Smile",
            Curve::float(vec![]),
        )));
        let controller = avatar.controllers.insert(AnimatorController::new("FX").with_layer(
            StateMachine {
                states: vec![State {
                    name: "Smile".into(),
                    motion: Some(clip),
                }],
                children: Vec::new(),
            },
        ));
        avatar.animators.push(AnimatorBinding { root, controller });
        avatar.mappings.viseme_renderer = Some(renderer);
        avatar.mappings.viseme_blend_shapes = vec!["vrc.v_aa".into()];
        avatar.mappings.eyelid_renderer = Some(renderer);
        avatar.mappings.eyelid_blend_shapes = vec![0, -1];

        let usage = collect_usage(&avatar);
        assert!(usage.is_animated(renderer, "Smile"));
        assert!(!usage.is_animated(renderer, "Blink"));
        assert!(usage.is_mapped(renderer, "Blink"));
        assert!(usage.is_mapped(renderer, "vrc.v_aa"));
        assert!(!usage.is_mapped(renderer, "Smile"));
    }
}
