use skinweld_core::avatar::Avatar;
use skinweld_core::registry::RendererId;

use super::{renderer_ids, rewrite_renderer, Stage, StageContext};
use crate::blendshape::{self, BlendShapeUsage};
use crate::diagnostics::Finding;
use crate::error::OptimizeResult;

/// Deletes the geometry hidden by marked blend shapes.
///
/// A shape is marked when its name starts with the marker prefix, its
/// current weight is non-zero and no animation drives it. Vertices the shape
/// moves are removed along with every triangle touching them.
#[derive(Debug, Clone)]
pub struct RemoveMarkedBlendShapes {
    prefix: String,
}

impl RemoveMarkedBlendShapes {
    pub fn new(prefix: impl Into<String>) -> Self {
        Self {
            prefix: prefix.into(),
        }
    }

    /// Marked shapes of one renderer.
    fn marked(&self, avatar: &Avatar, usage: &BlendShapeUsage, id: RendererId) -> Vec<String> {
        let Ok((renderer, mesh)) = avatar.renderer_and_mesh(id) else {
            return Vec::new();
        };
        mesh.blend_shapes
            .iter()
            .enumerate()
            .filter(|(index, shape)| {
                shape.name.starts_with(&self.prefix)
                    && renderer.blend_shape_weight(*index) != 0.0
                    && !usage.is_animated(id, &shape.name)
            })
            .map(|(_, shape)| shape.name.clone())
            .collect()
    }
}

impl Default for RemoveMarkedBlendShapes {
    fn default() -> Self {
        Self::new("remove_")
    }
}

impl Stage for RemoveMarkedBlendShapes {
    fn name(&self) -> &'static str {
        "remove-marked-blendshapes"
    }

    fn run(&self, mut avatar: Avatar, ctx: &mut StageContext<'_>) -> OptimizeResult<Avatar> {
        let usage = blendshape::collect_usage(&avatar);
        for id in renderer_ids(&avatar) {
            let shapes = self.marked(&avatar, &usage, id);
            if shapes.is_empty() {
                continue;
            }
            let renderer = avatar.renderer_name(id).to_owned();
            ctx.diagnostics.push(
                self.name(),
                Finding::MarkedShapes {
                    renderer: renderer.clone(),
                    shapes: shapes.clone(),
                },
            );
            if ctx.dry_run() {
                log::warn!("{renderer}: would strip geometry of {shapes:?}");
                continue;
            }
            match rewrite_renderer(&mut avatar, id, |snapshot| {
                blendshape::strip_vertices(snapshot, &shapes)
            }) {
                Ok(report) => ctx.diagnostics.push(
                    self.name(),
                    Finding::StrippedVertices {
                        renderer,
                        vertices: report.removed_vertices,
                        triangles: report.removed_triangles,
                    },
                ),
                Err(e) => {
                    log::warn!("{renderer}: marked blend shapes left in place: {e}");
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

#[cfg(test)]
mod tests {
    use super::*;
    use crate::diagnostics::Diagnostics;
    use crate::stages::RunMode;
    use skinweld_core::avatar::SkinnedRenderer;
    use skinweld_core::material::Material;
    use skinweld_core::math::Vec3;
    use skinweld_core::mesh::{generators, BlendShape, BlendShapeFrame};
    use skinweld_core::scene::NodeTransform;

    fn avatar(weight: f32) -> (Avatar, RendererId) {
        let mut avatar = Avatar::new("Avatar");
        let root = avatar.root();
        let node = avatar.nodes.add_child(root, "Face", NodeTransform::IDENTITY).unwrap();
        let mut mesh = generators::generate_skinned_grid(2, 1, 1.0);
        let n = mesh.vertex_count();
        let mut deltas = vec![Vec3::zeros(); n];
        deltas[0] = Vec3::y();
        mesh.blend_shapes.push(BlendShape::new(
            "remove_eyes",
            vec![BlendShapeFrame::from_positions(100.0, deltas)],
        ));
        mesh.blend_shapes.push(BlendShape::new("Blink", vec![BlendShapeFrame::zeroed(n, 100.0)]));
        let mesh = avatar.meshes.insert(mesh);
        let material = avatar.materials.insert(Material::new("Face"));
        let mut renderer = SkinnedRenderer::new(node, mesh)
            .with_bones(vec![node])
            .with_materials(vec![material]);
        renderer.set_blend_shape_weight(0, weight);
        let id = avatar.renderers.insert(renderer);
        avatar.mappings.eyelid_renderer = Some(id);
        avatar.mappings.eyelid_blend_shapes = vec![1, 0];
        (avatar, id)
    }

    fn run(avatar: Avatar, mode: RunMode) -> (Avatar, Diagnostics) {
        let mut diagnostics = Diagnostics::new();
        let mut ctx = StageContext {
            mode,
            diagnostics: &mut diagnostics,
        };
        let avatar = RemoveMarkedBlendShapes::default().run(avatar, &mut ctx).unwrap();
        (avatar, diagnostics)
    }

    #[test]
    fn weighted_marker_strips_geometry() {
        let (avatar, id) = avatar(100.0);
        let (avatar, diagnostics) = run(avatar, RunMode::Apply);
        let (_, mesh) = avatar.renderer_and_mesh(id).unwrap();
        // 3x2 grid, corner vertex 0 belongs to one triangle.
        assert_eq!(mesh.vertex_count(), 5);
        assert_eq!(mesh.triangle_count(), 3);
        assert_eq!(mesh.blend_shapes.len(), 1);
        assert!(mesh.generated);
        // Blink moved from index 1 to 0; the stripped shape is gone.
        assert_eq!(avatar.mappings.eyelid_blend_shapes, vec![0, -1]);
        assert_eq!(
            diagnostics.findings[1].finding,
            Finding::StrippedVertices {
                renderer: "Face".into(),
                vertices: 1,
                triangles: 1
            }
        );
    }

    #[test]
    fn zero_weight_marker_is_kept() {
        let (avatar, id) = avatar(0.0);
        let before = avatar.renderer_and_mesh(id).unwrap().1.clone();
        let (avatar, diagnostics) = run(avatar, RunMode::Apply);
        assert!(diagnostics.is_empty());
        assert_eq!(avatar.renderer_and_mesh(id).unwrap().1, &before);
    }

    #[test]
    fn dry_run_only_reports() {
        let (avatar, id) = avatar(100.0);
        let mesh = avatar.renderers.get(id).unwrap().mesh;
        let (avatar, diagnostics) = run(avatar, RunMode::DryRun);
        assert_eq!(diagnostics.len(), 1);
        assert_eq!(avatar.renderers.get(id).unwrap().mesh, mesh);
    }
}
