//! Equivalence keys: which renderers may be merged.
//!
//! A renderer's [`EquivalenceKey`] is a set of signatures built from its
//! static configuration and from every non-material curve that animates it.
//! Two renderers merge only when their keys are exactly equal, which makes
//! grouping a true equivalence relation.
//!
//! Material curves (`material.*`, `m_Materials.*`) are kept out of the key
//! and returned separately; merging handles them by remapping slots.

use std::collections::{BTreeMap, BTreeSet};

use skinweld_core::animation::{Curve, CurveBinding, TargetType, WeightedMode};
use skinweld_core::avatar::{AnimatedObject, AnimationReference, Avatar, RendererSettings};
use skinweld_core::registry::{MaterialId, NodeId, RendererId};

use crate::error::KeyError;

/// Static state that must match for two renderers to merge.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct StaticSignature {
    pub root_bone: NodeId,
    pub enabled: bool,
    pub active_self: bool,
    pub settings: RendererSettings,
    pub has_blend_shapes: bool,
}

/// One keyframe, floats compared bit for bit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct KeySignature {
    pub time: u32,
    pub value: u32,
    pub in_tangent: u32,
    pub out_tangent: u32,
    pub in_weight: u32,
    pub out_weight: u32,
    pub weighted_mode: WeightedMode,
}

/// Keys of a curve.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum CurveKeys {
    Float { discrete: bool, keys: Vec<KeySignature> },
    Object(Vec<(u32, Option<MaterialId>)>),
}

impl From<&Curve> for CurveKeys {
    fn from(curve: &Curve) -> Self {
        match curve {
            Curve::Float { keys, discrete } => Self::Float {
                discrete: *discrete,
                keys: keys
                    .iter()
                    .map(|k| KeySignature {
                        time: k.time.to_bits(),
                        value: k.value.to_bits(),
                        in_tangent: k.in_tangent.to_bits(),
                        out_tangent: k.out_tangent.to_bits(),
                        in_weight: k.in_weight.to_bits(),
                        out_weight: k.out_weight.to_bits(),
                        weighted_mode: k.weighted_mode,
                    })
                    .collect(),
            },
            Curve::Object { keys } => {
                Self::Object(keys.iter().map(|k| (k.time.to_bits(), k.value)).collect())
            }
        }
    }
}

/// A curve animating the renderer or its node.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct CurveSignature {
    pub source: AnimationReference,
    pub target: TargetType,
    pub property: String,
    pub key_count: usize,
    pub keys: CurveKeys,
}

impl CurveSignature {
    fn new(source: AnimationReference, binding: &CurveBinding) -> Self {
        Self {
            source,
            target: binding.target.clone(),
            property: binding.property.clone(),
            key_count: binding.curve.len(),
            keys: CurveKeys::from(&binding.curve),
        }
    }
}

/// One entry of an [`EquivalenceKey`].
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum KeyEntry {
    Static(StaticSignature),
    Curve(CurveSignature),
}

/// Order-independent fingerprint of a renderer.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct EquivalenceKey(BTreeSet<KeyEntry>);

impl EquivalenceKey {
    /// Number of entries.
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Returns `true` if the key has no entries.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Entries in canonical order.
    pub fn entries(&self) -> impl Iterator<Item = &KeyEntry> + '_ {
        self.0.iter()
    }
}

/// A binding together with the animator it is played from.
#[derive(Debug, Clone, PartialEq)]
pub struct BindingRef {
    pub source: AnimationReference,
    pub binding: CurveBinding,
}

/// A renderer eligible for merging.
#[derive(Debug, Clone, PartialEq)]
pub struct Candidate {
    pub renderer: RendererId,
    pub key: EquivalenceKey,
    /// Material curves on the renderer, excluded from the key.
    pub material_bindings: Vec<BindingRef>,
    /// Non-material curves on the renderer or its node, part of the key.
    pub animated_bindings: Vec<BindingRef>,
}

impl Candidate {
    /// Material slots whose material is swapped by animation.
    pub fn swapped_slots(&self) -> BTreeSet<usize> {
        self.material_bindings
            .iter()
            .filter_map(|b| b.binding.material_slot())
            .collect()
    }
}

/// Outcome of [`build_keys`].
#[derive(Debug, Clone, Default)]
pub struct KeyReport {
    /// Eligible renderers in registry order.
    pub candidates: Vec<Candidate>,
    /// Renderers excluded from grouping and why.
    pub excluded: Vec<(RendererId, KeyError)>,
}

impl KeyReport {
    /// Candidate entry for `renderer`.
    pub fn candidate(&self, renderer: RendererId) -> Option<&Candidate> {
        self.candidates.iter().find(|c| c.renderer == renderer)
    }

    /// Partition candidates by equal key. Only groups of two or more are
    /// returned; groups and members keep registry order.
    pub fn groups(&self) -> Vec<Vec<RendererId>> {
        let mut groups: Vec<(&EquivalenceKey, Vec<RendererId>)> = Vec::new();
        for candidate in &self.candidates {
            match groups.iter_mut().find(|(key, _)| **key == candidate.key) {
                Some((_, members)) => members.push(candidate.renderer),
                None => groups.push((&candidate.key, vec![candidate.renderer])),
            }
        }
        groups
            .into_iter()
            .map(|(_, members)| members)
            .filter(|members| members.len() >= 2)
            .collect()
    }
}

#[derive(Default)]
struct Accumulator {
    entries: BTreeSet<KeyEntry>,
    material_bindings: Vec<BindingRef>,
    animated_bindings: Vec<BindingRef>,
    error: Option<KeyError>,
}

/// Compute keys for every renderer of the avatar.
///
/// Lookup failures and unsupported bindings exclude the renderer; they
/// never abort the whole computation.
pub fn build_keys(avatar: &Avatar) -> KeyReport {
    let mut report = KeyReport::default();
    let mut accumulators: BTreeMap<RendererId, Accumulator> = BTreeMap::new();

    for (id, _) in avatar.renderers.iter() {
        match static_signature(avatar, id) {
            Ok(signature) => {
                let mut acc = Accumulator::default();
                acc.entries.insert(KeyEntry::Static(signature));
                accumulators.insert(id, acc);
            }
            Err(e) => report.excluded.push((id, e)),
        }
    }

    for source in avatar.animation_references() {
        let Some(clip) = avatar.clips.get(source.clip) else {
            log::warn!("Controller references missing {}", source.clip);
            continue;
        };
        for binding in &clip.bindings {
            let (renderer, on_renderer) = match avatar.resolve_binding(source.root, binding) {
                AnimatedObject::Renderer(id) => (id, true),
                AnimatedObject::Node(node) if binding.target == TargetType::GameObject => {
                    match avatar.renderer_on_node(node) {
                        Some(id) => (id, false),
                        None => continue,
                    }
                }
                AnimatedObject::Other { node, component } => {
                    if let Some(acc) = avatar
                        .renderer_on_node(node)
                        .and_then(|id| accumulators.get_mut(&id))
                    {
                        acc.error.get_or_insert(KeyError::UnsupportedComponent {
                            component,
                            property: binding.property.clone(),
                        });
                    }
                    continue;
                }
                AnimatedObject::Node(_) | AnimatedObject::Missing => continue,
            };
            let Some(acc) = accumulators.get_mut(&renderer) else {
                continue;
            };
            let entry = BindingRef {
                source,
                binding: binding.clone(),
            };
            if on_renderer && binding.is_material_curve() {
                acc.material_bindings.push(entry);
            } else {
                acc.entries
                    .insert(KeyEntry::Curve(CurveSignature::new(source, binding)));
                acc.animated_bindings.push(entry);
            }
        }
    }

    for (renderer, acc) in accumulators {
        if let Some(e) = acc.error {
            report.excluded.push((renderer, e));
            continue;
        }
        report.candidates.push(Candidate {
            renderer,
            key: EquivalenceKey(acc.entries),
            material_bindings: acc.material_bindings,
            animated_bindings: acc.animated_bindings,
        });
    }
    report.excluded.sort_by_key(|(id, _)| *id);
    for (id, e) in &report.excluded {
        log::warn!("{} excluded from merging: {e}", avatar.renderer_name(*id));
    }
    report
}

/// Static signature, after checking skeleton candidacy.
fn static_signature(avatar: &Avatar, id: RendererId) -> Result<StaticSignature, KeyError> {
    avatar.validate_renderer(id)?;
    let (renderer, mesh) = avatar.renderer_and_mesh(id)?;

    let anchor = renderer
        .root_bone
        .or_else(|| renderer.bones.iter().flatten().next().copied())
        .unwrap_or(renderer.node);
    if anchor == avatar.root() {
        return Err(KeyError::RootBoneIsAvatarRoot(anchor));
    }
    let skeleton = avatar
        .nodes
        .top_level_ancestor(anchor)
        .ok_or(KeyError::RootBoneOutsideAvatar(anchor))?;
    if let Some(bone) = renderer
        .bones
        .iter()
        .flatten()
        .find(|b| !avatar.nodes.is_descendant_of(**b, skeleton))
    {
        return Err(KeyError::BoneOutsideSkeleton {
            bone: *bone,
            skeleton,
        });
    }

    let active_self = avatar.nodes.get(renderer.node).is_some_and(|n| n.active);
    Ok(StaticSignature {
        root_bone: renderer.effective_root_bone(),
        enabled: renderer.enabled,
        active_self,
        settings: renderer.settings.clone(),
        has_blend_shapes: !mesh.blend_shapes.is_empty(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use skinweld_core::animation::{AnimationClip, AnimatorController, Keyframe, State, StateMachine};
    use skinweld_core::avatar::{AnimatorBinding, ShadowCasting, SkinnedRenderer};
    use skinweld_core::material::Material;
    use skinweld_core::mesh::{generators, BlendShape, BlendShapeFrame, SkinnedMesh};
    use skinweld_core::scene::NodeTransform;

    struct Scene {
        avatar: Avatar,
        hips: NodeId,
        body: RendererId,
        hair: RendererId,
    }

    fn add_renderer(avatar: &mut Avatar, name: &str, hips: NodeId) -> RendererId {
        let root = avatar.root();
        let node = avatar.nodes.add_child(root, name, NodeTransform::IDENTITY).unwrap();
        let mesh = avatar.meshes.insert(generators::generate_skinned_grid(1, 1, 1.0));
        let material = avatar.materials.insert(Material::new(name));
        avatar.renderers.insert(
            SkinnedRenderer::new(node, mesh)
                .with_root_bone(hips)
                .with_bones(vec![hips])
                .with_materials(vec![material]),
        )
    }

    fn scene() -> Scene {
        let mut avatar = Avatar::new("Avatar");
        let root = avatar.root();
        let armature = avatar.nodes.add_child(root, "Armature", NodeTransform::IDENTITY).unwrap();
        let hips = avatar.nodes.add_child(armature, "Hips", NodeTransform::IDENTITY).unwrap();
        let body = add_renderer(&mut avatar, "Body", hips);
        let hair = add_renderer(&mut avatar, "Hair", hips);
        Scene {
            avatar,
            hips,
            body,
            hair,
        }
    }

    fn animate(avatar: &mut Avatar, bindings: Vec<CurveBinding>) {
        let mut clip = AnimationClip::new("Anim");
        clip.bindings = bindings;
        let clip = avatar.clips.insert(clip);
        let controller = avatar.controllers.insert(AnimatorController::new("FX").with_layer(
            StateMachine {
                states: vec![State {
                    name: "Idle".into(),
                    motion: Some(clip),
                }],
                children: Vec::new(),
            },
        ));
        let root = avatar.root();
        avatar.animators.push(AnimatorBinding { root, controller });
    }

    fn float_curve(value: f32) -> Curve {
        Curve::float(vec![Keyframe::new(0.0, value), Keyframe::new(1.0, value)])
    }

    #[test]
    fn identical_renderers_share_a_group() {
        let s = scene();
        let report = build_keys(&s.avatar);
        assert!(report.excluded.is_empty());
        assert_eq!(report.groups(), vec![vec![s.body, s.hair]]);
    }

    #[test]
    fn static_difference_splits_groups() {
        let mut s = scene();
        s.avatar.renderers.get_mut(s.hair).unwrap().settings.shadow_casting = ShadowCasting::Off;
        assert!(build_keys(&s.avatar).groups().is_empty());
    }

    #[test]
    fn blend_shape_presence_is_part_of_the_key() {
        let mut s = scene();
        let mesh = s.avatar.renderers.get(s.hair).unwrap().mesh;
        let n = s.avatar.meshes.get(mesh).unwrap().vertex_count();
        s.avatar
            .meshes
            .get_mut(mesh)
            .unwrap()
            .blend_shapes
            .push(BlendShape::new("Blink", vec![BlendShapeFrame::zeroed(n, 100.0)]));
        assert!(build_keys(&s.avatar).groups().is_empty());
    }

    #[test]
    fn material_curves_do_not_split_groups() {
        let mut s = scene();
        animate(
            &mut s.avatar,
            vec![
                CurveBinding::new("Body", TargetType::SkinnedRenderer, "material._Color.r", float_curve(1.0)),
                CurveBinding::new(
                    "Hair",
                    TargetType::SkinnedRenderer,
                    "m_Materials.Array.data[0]",
                    Curve::object(vec![]),
                ),
            ],
        );
        let report = build_keys(&s.avatar);
        assert_eq!(report.groups(), vec![vec![s.body, s.hair]]);
        let hair = report.candidate(s.hair).unwrap();
        assert_eq!(hair.swapped_slots(), BTreeSet::from([0]));
        assert!(hair.animated_bindings.is_empty());
    }

    #[test]
    fn matching_curves_keep_the_group() {
        let mut s = scene();
        animate(
            &mut s.avatar,
            vec![
                CurveBinding::new("Body", TargetType::GameObject, "m_IsActive", float_curve(0.0)),
                CurveBinding::new("Hair", TargetType::GameObject, "m_IsActive", float_curve(0.0)),
            ],
        );
        let report = build_keys(&s.avatar);
        assert_eq!(report.groups(), vec![vec![s.body, s.hair]]);
        assert_eq!(report.candidate(s.body).unwrap().animated_bindings.len(), 1);
    }

    #[test]
    fn differing_curves_split_the_group() {
        let mut s = scene();
        animate(
            &mut s.avatar,
            vec![CurveBinding::new(
                "Body",
                TargetType::SkinnedRenderer,
                "blendShape.Blink",
                float_curve(100.0),
            )],
        );
        let report = build_keys(&s.avatar);
        assert!(report.groups().is_empty());
        assert_eq!(report.candidates.len(), 2);
    }

    #[test]
    fn unsupported_component_excludes_renderer() {
        let mut s = scene();
        animate(
            &mut s.avatar,
            vec![CurveBinding::new(
                "Hair",
                TargetType::Other("Light".into()),
                "m_Intensity",
                float_curve(1.0),
            )],
        );
        let report = build_keys(&s.avatar);
        assert_eq!(report.excluded.len(), 1);
        assert!(matches!(
            report.excluded[0],
            (id, KeyError::UnsupportedComponent { .. }) if id == s.hair
        ));
    }

    #[test]
    fn bones_outside_the_skeleton_exclude_renderer() {
        let mut s = scene();
        let root = s.avatar.root();
        let stray = s.avatar.nodes.add_child(root, "Prop", NodeTransform::IDENTITY).unwrap();
        s.avatar.renderers.get_mut(s.hair).unwrap().bones = vec![Some(s.hips), Some(stray)];
        let report = build_keys(&s.avatar);
        assert_eq!(report.candidates.len(), 1);
        assert!(matches!(
            report.excluded[0].1,
            KeyError::BoneOutsideSkeleton { bone, .. } if bone == stray
        ));
    }

    #[test]
    fn avatar_root_as_root_bone_excludes_renderer() {
        let mut s = scene();
        let root = s.avatar.root();
        s.avatar.renderers.get_mut(s.hair).unwrap().root_bone = Some(root);
        let report = build_keys(&s.avatar);
        assert_eq!(report.excluded, vec![(s.hair, KeyError::RootBoneIsAvatarRoot(root))]);
        assert_eq!(report.candidates.len(), 1);
    }

    #[test]
    fn dangling_mesh_excludes_renderer() {
        let mut s = scene();
        let mesh = s.avatar.meshes.insert(SkinnedMesh::new("gone"));
        s.avatar.meshes.remove(mesh);
        s.avatar.renderers.get_mut(s.body).unwrap().mesh = mesh;
        let report = build_keys(&s.avatar);
        assert!(matches!(report.excluded[0], (id, KeyError::Lookup(_)) if id == s.body));
    }

    #[test]
    fn keys_are_deterministic() {
        let s = scene();
        let a = build_keys(&s.avatar);
        let b = build_keys(&s.avatar);
        assert_eq!(a.candidates, b.candidates);
    }
}
