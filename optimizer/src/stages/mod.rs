//! Optimisation stages.
//!
//! A [`Stage`] takes the avatar by value and hands back the optimised one.
//! Stages never abort on a bad renderer or group: they record a finding and
//! move on.
//!
//! - [`RemoveMarkedBlendShapes`] strips geometry hidden by marked shapes
//! - [`RemoveUnusedBlendShapes`] bakes or drops shapes nothing drives
//! - [`MergeMeshes`] merges equivalent renderers and retargets animation

mod marked;
mod merge;
mod unused;

pub use marked::RemoveMarkedBlendShapes;
pub use merge::MergeMeshes;
pub use unused::RemoveUnusedBlendShapes;

use skinweld_core::avatar::Avatar;
use skinweld_core::registry::RendererId;

use crate::diagnostics::Diagnostics;
use crate::error::{OptimizeResult, SnapshotResult};
use crate::snapshot::{self, MeshSnapshot, SlotKeying};

/// Whether stages mutate the avatar.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RunMode {
    /// Report what would change, leave the avatar as it is.
    #[default]
    DryRun,
    /// Apply every change.
    Apply,
}

/// State shared by the stages of one run.
#[derive(Debug)]
pub struct StageContext<'a> {
    pub mode: RunMode,
    pub diagnostics: &'a mut Diagnostics,
}

impl StageContext<'_> {
    /// Returns `true` in a dry run.
    pub fn dry_run(&self) -> bool {
        self.mode == RunMode::DryRun
    }
}

/// One optimisation pass over the whole avatar.
pub trait Stage {
    /// Name used in logs and diagnostics.
    fn name(&self) -> &'static str;

    /// Run the pass.
    fn run(&self, avatar: Avatar, ctx: &mut StageContext<'_>) -> OptimizeResult<Avatar>;
}

/// Renderer ids in registry order, collected up front so a stage can
/// mutate the avatar while walking them.
pub(crate) fn renderer_ids(avatar: &Avatar) -> Vec<RendererId> {
    avatar.renderers.iter().map(|(id, _)| id).collect()
}

/// Edit one renderer through a snapshot and write the result back under the
/// mesh's own name. Eyelid mappings on the renderer are re-resolved by name.
pub(crate) fn rewrite_renderer<R>(
    avatar: &mut Avatar,
    id: RendererId,
    edit: impl FnOnce(&mut MeshSnapshot) -> R,
) -> SnapshotResult<R> {
    let eyelids = avatar.eyelid_blend_shape_names(id);
    let mut snapshot = snapshot::extract(avatar, id, SlotKeying::PerSlot)?;
    let mesh_name = avatar.renderer_and_mesh(id)?.1.name.clone();
    let result = edit(&mut snapshot);
    snapshot::write_back(snapshot, avatar, id, &mesh_name)?;
    if let Some(names) = eyelids {
        avatar.restore_eyelid_blend_shapes(&names);
    }
    Ok(result)
}
