use skinweld_core::avatar::Avatar;
use skinweld_core::registry::RendererId;

use super::{renderer_ids, rewrite_renderer, Stage, StageContext};
use crate::blendshape::{self, BlendShapeUsage};
use crate::diagnostics::Finding;
use crate::error::OptimizeResult;

/// Removes blend shapes nothing drives.
///
/// Shapes that are animated or named by a viseme or eyelid mapping are kept.
/// Of the rest, shapes with a non-zero weight are baked into the mesh at
/// that weight and shapes at zero are dropped.
#[derive(Debug, Clone, Copy, Default)]
pub struct RemoveUnusedBlendShapes;

/// Shapes to bake and shapes to drop.
type Plan = (Vec<String>, Vec<String>);

fn plan(avatar: &Avatar, usage: &BlendShapeUsage, id: RendererId) -> Plan {
    let mut plan = Plan::default();
    let Ok((renderer, mesh)) = avatar.renderer_and_mesh(id) else {
        return plan;
    };
    for (index, shape) in mesh.blend_shapes.iter().enumerate() {
        if usage.is_animated(id, &shape.name) || usage.is_mapped(id, &shape.name) {
            continue;
        }
        if renderer.blend_shape_weight(index) != 0.0 {
            plan.0.push(shape.name.clone());
        } else {
            plan.1.push(shape.name.clone());
        }
    }
    plan
}

impl Stage for RemoveUnusedBlendShapes {
    fn name(&self) -> &'static str {
        "remove-unused-blendshapes"
    }

    fn run(&self, mut avatar: Avatar, ctx: &mut StageContext<'_>) -> OptimizeResult<Avatar> {
        let usage = blendshape::collect_usage(&avatar);
        for id in renderer_ids(&avatar) {
            let (baked, dropped) = plan(&avatar, &usage, id);
            if baked.is_empty() && dropped.is_empty() {
                continue;
            }
            let renderer = avatar.renderer_name(id).to_owned();
            if ctx.dry_run() {
                log::warn!("{renderer}: would bake {baked:?} and drop {dropped:?}");
                ctx.diagnostics.push(
                    self.name(),
                    Finding::UnusedShapes {
                        renderer,
                        baked,
                        dropped,
                    },
                );
                continue;
            }
            let names: Vec<String> = baked.iter().chain(&dropped).cloned().collect();
            match rewrite_renderer(&mut avatar, id, |snapshot| {
                blendshape::bake_static(snapshot, &names)
            }) {
                Ok(report) => ctx.diagnostics.push(
                    self.name(),
                    Finding::UnusedShapes {
                        renderer,
                        baked: report.baked,
                        dropped: report.dropped,
                    },
                ),
                Err(e) => {
                    log::warn!("{renderer}: unused blend shapes left in place: {e}");
                    ctx.diagnostics.push(
                        self.name(),
                        Finding::RendererFailed {
                            renderer,
                            reason: e.to_string(),
                        },
                    );
                }
            }
        }
        Ok(avatar)
    }
}
