//! Animation retargeting after a merge.
//!
//! Clips are never edited in place. The first rewrite of a clip clones it
//! through the [`ClipCloneCache`]; later rewrites, from any merge group,
//! edit that same clone. Once every group is done,
//! [`ClipCloneCache::apply_to_controllers`] swaps the clones into cloned
//! controllers and points the animators at them.

use std::collections::BTreeMap;

use skinweld_core::animation::{property, CurveBinding};
use skinweld_core::avatar::Avatar;
use skinweld_core::registry::{ClipId, ControllerId, RendererId};

use crate::key::BindingRef;

/// Clips cloned during one pass, original to clone.
#[derive(Debug, Clone, Default)]
pub struct ClipCloneCache {
    clones: BTreeMap<ClipId, ClipId>,
}

impl ClipCloneCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Clone of `clip`, if one was made.
    pub fn clone_of(&self, clip: ClipId) -> Option<ClipId> {
        self.clones.get(&clip).copied()
    }

    /// Number of cloned clips.
    pub fn len(&self) -> usize {
        self.clones.len()
    }

    /// Returns `true` if nothing was cloned.
    pub fn is_empty(&self) -> bool {
        self.clones.is_empty()
    }

    /// The clone of `clip`, creating it on first use.
    ///
    /// Returns `None` if the clip does not exist.
    pub fn get_or_clone(&mut self, avatar: &mut Avatar, clip: ClipId) -> Option<ClipId> {
        if let Some(clone) = self.clones.get(&clip) {
            return Some(*clone);
        }
        let mut copy = avatar.clips.get(clip)?.clone();
        copy.name = format!("{}_merged", copy.name);
        copy.generated = true;
        let clone = avatar.clips.insert(copy);
        log::debug!("Cloned {clip} as {clone}");
        self.clones.insert(clip, clone);
        Some(clone)
    }

    /// Clone every controller that plays a cloned clip, swap the clones in
    /// and point animators at the cloned controllers.
    ///
    /// Returns the cloned controllers.
    pub fn apply_to_controllers(&self, avatar: &mut Avatar) -> Vec<ControllerId> {
        if self.clones.is_empty() {
            return Vec::new();
        }
        let lookup = |clip: ClipId| self.clones.get(&clip).copied();
        let affected: Vec<ControllerId> = avatar
            .controllers
            .iter()
            .filter(|(_, c)| c.clips().iter().any(|clip| self.clones.contains_key(clip)))
            .map(|(id, _)| id)
            .collect();

        let mut replaced = BTreeMap::new();
        for id in affected {
            let Some(original) = avatar.controllers.get(id) else {
                continue;
            };
            let mut copy = original.clone();
            copy.name = format!("{}_merged", copy.name);
            copy.generated = true;
            let swapped = copy.replace_motions(&lookup);
            let clone = avatar.controllers.insert(copy);
            log::info!("Controller {id} cloned as {clone}, {swapped} motions replaced");
            replaced.insert(id, clone);
        }
        for animator in &mut avatar.animators {
            if let Some(clone) = replaced.get(&animator.controller) {
                animator.controller = *clone;
            }
        }
        replaced.into_values().collect()
    }
}

/// Slot of each source `(renderer, slot)` in the merged renderer.
pub type SlotMap = BTreeMap<(RendererId, usize), usize>;

/// Bindings of one merge group and where they must point afterwards.
#[derive(Debug, Clone)]
pub struct GroupRetarget<'a> {
    /// Renderer the group was merged into.
    pub survivor: RendererId,
    /// Every binding that targeted a group member, with its member.
    pub bindings: &'a [(RendererId, BindingRef)],
    /// Merged slot of every member slot.
    pub slot_map: &'a SlotMap,
}

/// Summary of a group retarget.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RetargetReport {
    /// Clips that were edited, by original id, with their rewritten binding count.
    pub clips: Vec<(ClipId, usize)>,
    /// Bindings rewritten.
    pub rewritten: usize,
    /// Rewritten bindings dropped because the clip already had one.
    pub duplicates: usize,
}

/// Rewrite the group's bindings to target the survivor.
///
/// Paths become the survivor's path from the animator root and material
/// slot indices are remapped through the slot map. A rewritten binding whose
/// `(path, target, property)` already exists on the clip is dropped.
pub fn retarget_group(
    avatar: &mut Avatar,
    cache: &mut ClipCloneCache,
    group: &GroupRetarget<'_>,
) -> RetargetReport {
    let mut report = RetargetReport::default();
    let Some(survivor_node) = avatar.renderers.get(group.survivor).map(|r| r.node) else {
        log::warn!("Retarget skipped: survivor {} is missing", group.survivor);
        return report;
    };

    let mut edits: BTreeMap<ClipId, Vec<(CurveBinding, CurveBinding)>> = BTreeMap::new();
    for (member, entry) in group.bindings {
        let Some(path) = avatar.nodes.path_from(entry.source.root, survivor_node) else {
            log::warn!(
                "{} is not below animator root {}, binding {} left as is",
                avatar.renderer_name(group.survivor),
                avatar.nodes.name(entry.source.root),
                entry.binding.property
            );
            continue;
        };
        let mut rewritten = entry.binding.clone();
        rewritten.path = path;
        if let Some(slot) = entry.binding.material_slot() {
            match group.slot_map.get(&(*member, slot)) {
                Some(&merged) => rewritten.property = property::material_slot_property(merged),
                None => log::debug!("Slot {slot} of {member} has no merged slot"),
            }
        }
        if rewritten != entry.binding {
            edits
                .entry(entry.source.clip)
                .or_default()
                .push((entry.binding.clone(), rewritten));
        }
    }

    for (clip, changes) in edits {
        let Some(clone) = cache.get_or_clone(avatar, clip) else {
            continue;
        };
        let Some(target) = avatar.clips.get_mut(clone) else {
            continue;
        };
        target
            .bindings
            .retain(|b| !changes.iter().any(|(old, _)| old.same_target(b)));
        let count = changes.len();
        for (_, new) in changes {
            if !target.add_binding_unique(new) {
                report.duplicates += 1;
            }
        }
        report.rewritten += count;
        report.clips.push((clip, count));
    }
    if report.rewritten > 0 {
        log::info!(
            "Retargeted {} bindings in {} clips to {} ({} duplicates dropped)",
            report.rewritten,
            report.clips.len(),
            avatar.renderer_name(group.survivor),
            report.duplicates
        );
    }
    report
}
