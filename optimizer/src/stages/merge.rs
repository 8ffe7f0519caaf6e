use std::collections::BTreeSet;

use skinweld_core::animation::AnimationClip;
use skinweld_core::avatar::{AnimatedObject, Avatar};
use skinweld_core::registry::{NodeId, RendererId};

use super::{Stage, StageContext};
use crate::diagnostics::Finding;
use crate::error::{MergeError, MergeResult, OptimizeResult};
use crate::key::{self, KeyReport};
use crate::merge::{self, FramePolicyKind};
use crate::retarget::{self, ClipCloneCache, GroupRetarget, RetargetReport, SlotMap};
use crate::snapshot::{self, SlotKeying};

/// Merges renderers with equal equivalence keys.
///
/// Each group is folded into its first member, which keeps its node and
/// becomes the merged renderer. Animation aimed at the other members is
/// retargeted, then those members are removed. A group that fails to merge
/// is reported and left untouched.
#[derive(Debug, Clone, Copy)]
pub struct MergeMeshes {
    copy_blend_shapes: bool,
    frame_policy: FramePolicyKind,
}

impl MergeMeshes {
    pub fn new() -> Self {
        Self {
            copy_blend_shapes: true,
            frame_policy: FramePolicyKind::default(),
        }
    }

    /// Carry blend shapes into merged meshes.
    #[must_use]
    pub fn with_copy_blend_shapes(mut self, copy: bool) -> Self {
        self.copy_blend_shapes = copy;
        self
    }

    /// Policy for blend shapes whose frame counts differ.
    #[must_use]
    pub fn with_frame_policy(mut self, policy: FramePolicyKind) -> Self {
        self.frame_policy = policy;
        self
    }
}

impl Default for MergeMeshes {
    fn default() -> Self {
        Self::new()
    }
}

/// What merging one group produced.
struct GroupOutcome {
    mesh: String,
    vertices: usize,
    retarget: RetargetReport,
    /// Nodes of removed renderers, dropped once animation no longer targets them.
    orphans: Vec<NodeId>,
}

impl Stage for MergeMeshes {
    fn name(&self) -> &'static str {
        "merge-meshes"
    }

    fn run(&self, mut avatar: Avatar, ctx: &mut StageContext<'_>) -> OptimizeResult<Avatar> {
        let report = key::build_keys(&avatar);
        for (id, e) in &report.excluded {
            ctx.diagnostics.push(
                self.name(),
                Finding::Excluded {
                    renderer: avatar.renderer_name(*id).to_owned(),
                    reason: e.to_string(),
                },
            );
        }

        let groups = report.groups();
        for group in &groups {
            let members = names(&avatar, group);
            if ctx.dry_run() {
                log::warn!("Would merge {}", members.join(", "));
            }
            ctx.diagnostics
                .push(self.name(), Finding::MergeGroup { members });
        }
        if ctx.dry_run() || groups.is_empty() {
            return Ok(avatar);
        }

        let mut cache = ClipCloneCache::new();
        let mut orphans = Vec::new();
        for group in &groups {
            let members = names(&avatar, group);
            match self.merge_group(&mut avatar, &report, group, &mut cache) {
                Ok(outcome) => {
                    for (clip, bindings) in &outcome.retarget.clips {
                        let clip = avatar
                            .clips
                            .get(*clip)
                            .map_or_else(|| clip.to_string(), |c| c.name.clone());
                        ctx.diagnostics.push(
                            self.name(),
                            Finding::RetargetedClip {
                                clip,
                                bindings: *bindings,
                            },
                        );
                    }
                    ctx.diagnostics.push(
                        self.name(),
                        Finding::Merged {
                            mesh: outcome.mesh,
                            members,
                            vertices: outcome.vertices,
                        },
                    );
                    orphans.extend(outcome.orphans);
                }
                Err(e) => {
                    log::warn!("Group {} not merged: {e}", members.join(", "));
                    ctx.diagnostics.push(
                        self.name(),
                        Finding::GroupFailed {
                            members,
                            reason: e.to_string(),
                        },
                    );
                }
            }
        }
        cache.apply_to_controllers(&mut avatar);
        for node in orphans {
            remove_orphan_node(&mut avatar, node);
        }
        Ok(avatar)
    }
}

impl MergeMeshes {
    /// Merge one group. Everything that can fail runs before the avatar is
    /// touched.
    fn merge_group(
        &self,
        avatar: &mut Avatar,
        report: &KeyReport,
        group: &[RendererId],
        cache: &mut ClipCloneCache,
    ) -> MergeResult<GroupOutcome> {
        let survivor = *group.first().ok_or(MergeError::EmptyGroup)?;
        let swapped: Vec<BTreeSet<usize>> = group
            .iter()
            .map(|id| report.candidate(*id).map(|c| c.swapped_slots()).unwrap_or_default())
            .collect();

        let mut snapshots = Vec::with_capacity(group.len());
        for (id, swapped) in group.iter().zip(&swapped) {
            let mut snapshot = snapshot::extract(avatar, *id, SlotKeying::ByMaterial { swapped })?;
            if !self.copy_blend_shapes {
                snapshot.blend_shapes.clear();
            }
            snapshots.push(snapshot);
        }
        let mut merged = merge::merge_all(snapshots, self.frame_policy.as_policy())?;
        let mesh = names(avatar, group).join("_");
        merged.name = mesh.clone();
        let vertices = merged.vertex_count();

        let mut slot_map = SlotMap::new();
        for (id, swapped) in group.iter().zip(&swapped) {
            let Some(renderer) = avatar.renderers.get(*id) else {
                continue;
            };
            let keying = SlotKeying::ByMaterial { swapped };
            for (slot, material) in renderer.materials.iter().enumerate() {
                if let Some(position) = merged.sub_meshes.position(&keying.key(*id, slot, *material)) {
                    slot_map.insert((*id, slot), position);
                }
            }
        }

        let eyelids = group
            .iter()
            .find_map(|id| avatar.eyelid_blend_shape_names(*id));

        snapshot::write_back(merged, avatar, survivor, &mesh)?;

        let bindings: Vec<_> = group
            .iter()
            .filter_map(|id| report.candidate(*id))
            .flat_map(|c| {
                c.material_bindings
                    .iter()
                    .chain(&c.animated_bindings)
                    .map(move |b| (c.renderer, b.clone()))
            })
            .collect();
        let retarget = retarget::retarget_group(
            avatar,
            cache,
            &GroupRetarget {
                survivor,
                bindings: &bindings,
                slot_map: &slot_map,
            },
        );

        let mappings = &mut avatar.mappings;
        if mappings.viseme_renderer.is_some_and(|r| group.contains(&r)) {
            mappings.viseme_renderer = Some(survivor);
        }
        if mappings.eyelid_renderer.is_some_and(|r| group.contains(&r)) {
            mappings.eyelid_renderer = Some(survivor);
        }
        if let Some(names) = eyelids {
            avatar.restore_eyelid_blend_shapes(&names);
        }

        let orphans = group[1..]
            .iter()
            .filter_map(|id| remove_renderer(avatar, *id))
            .collect();
        log::info!("Merged {} renderers into {mesh} ({vertices} vertices)", group.len());
        Ok(GroupOutcome {
            mesh,
            vertices,
            retarget,
            orphans,
        })
    }
}

fn names(avatar: &Avatar, group: &[RendererId]) -> Vec<String> {
    group
        .iter()
        .map(|id| avatar.renderer_name(*id).to_owned())
        .collect()
}

/// Remove a merged-away renderer and return its node.
fn remove_renderer(avatar: &mut Avatar, id: RendererId) -> Option<NodeId> {
    let renderer = avatar.renderers.remove(id)?;
    if avatar.meshes.get(renderer.mesh).is_some_and(|m| m.generated)
        && !avatar.renderers.iter().any(|(_, r)| r.mesh == renderer.mesh)
    {
        avatar.meshes.remove(renderer.mesh);
    }
    Some(renderer.node)
}

/// Remove the node of a merged-away renderer when nothing else needs it.
fn remove_orphan_node(avatar: &mut Avatar, node: NodeId) {
    if node_in_use(avatar, node) {
        log::debug!("Kept node {} of merged renderer", avatar.nodes.name(node));
        return;
    }
    let name = avatar.nodes.name(node).to_owned();
    if avatar.nodes.remove_leaf(node) {
        log::debug!("Removed node {name}");
    }
}

fn node_in_use(avatar: &Avatar, node: NodeId) -> bool {
    let Some(data) = avatar.nodes.get(node) else {
        return true;
    };
    if !data.children.is_empty() || data.extra_components > 0 {
        return true;
    }
    let referenced_by_renderer = avatar.renderers.iter().any(|(_, r)| {
        r.node == node
            || r.root_bone == Some(node)
            || r.settings.probe_anchor == Some(node)
            || r.bones.contains(&Some(node))
    });
    if referenced_by_renderer || avatar.animators.iter().any(|a| a.root == node) {
        return true;
    }
    avatar.animation_references().iter().any(|source| {
        avatar
            .clips
            .get(source.clip)
            .is_some_and(|clip| clip_targets(avatar, clip, source.root, node))
    })
}

fn clip_targets(avatar: &Avatar, clip: &AnimationClip, root: NodeId, node: NodeId) -> bool {
    clip.bindings.iter().any(|b| {
        matches!(
            avatar.resolve_binding(root, b),
            AnimatedObject::Node(n) | AnimatedObject::Other { node: n, .. } if n == node
        )
    })
}
