//! End-to-end consolidation tests.
//!
//! Avatars are built in memory, run through the pipeline and checked for
//! the geometric and animation properties a merged avatar must keep.
//!
//! # Test Categories
//!
//! - **Merge**: vertex counts, bounds, frame reconciliation, material slots
//! - **Blend shapes**: marked strip, static bake, idempotence
//! - **Retargeting**: shared clip clones, controller swaps
//! - **Modes and output**: dry run, generated asset flush

mod common;

use rstest::rstest;

use common::{grid, hiding_shape, lifting_shape, AvatarBuilder};
use skinweld_core::animation::{AnimationClip, Curve, CurveBinding, Keyframe, TargetType};
use skinweld_core::avatar::Avatar;
use skinweld_core::math::{self, Vec3};
use skinweld_core::registry::RendererId;
use skinweld_core::scene::NodeTransform;
use skinweld_optimizer::assets::{self, AssetStore, DirectoryAssetStore};
use skinweld_optimizer::blendshape;
use skinweld_optimizer::merge::{self, FramePolicyKind};
use skinweld_optimizer::snapshot::{self, SlotKeying};
use skinweld_optimizer::stages::{MergeMeshes, RemoveMarkedBlendShapes};
use skinweld_optimizer::{Finding, OptimizerConfig, Pipeline, RunMode};
use std::f32::consts::FRAC_1_SQRT_2;

fn temp_dir(name: &str) -> std::path::PathBuf {
    let dir = std::env::temp_dir().join(format!("skinweld_consolidation_test_{name}"));
    let _ = std::fs::remove_dir_all(&dir);
    std::fs::create_dir_all(&dir).unwrap();
    dir
}

fn assert_triangles_valid(avatar: &Avatar, id: RendererId) {
    let (_, mesh) = avatar.renderer_and_mesh(id).unwrap();
    let n = mesh.vertex_count() as u32;
    for (slot, triangles) in mesh.sub_meshes.iter().enumerate() {
        assert_eq!(triangles.len() % 3, 0, "slot {slot} is not a triangle list");
        assert!(triangles.iter().all(|&i| i < n), "slot {slot} indexes past the mesh");
    }
}

fn toggle() -> Curve {
    Curve::float(vec![Keyframe::new(0.0, 0.0), Keyframe::new(1.0, 1.0)])
}

// ============================================================================
// Merge
// ============================================================================

struct BodyAndHair {
    avatar: Avatar,
    body: RendererId,
    hair: RendererId,
}

/// Body with 100 vertices and a one-frame Blink, Hair with 50 vertices and a
/// two-frame Blink, placed 20 units forward.
fn body_and_hair() -> BodyAndHair {
    let mut builder = AvatarBuilder::new();
    let mut body = grid(9, 9);
    body.blend_shapes.push(lifting_shape("Blink", 100, &[100.0]));
    let mut hair = grid(9, 4);
    hair.blend_shapes.push(lifting_shape("Blink", 50, &[50.0, 100.0]));
    let body = builder.renderer("Body", body, 1);
    let hair = builder.renderer_at(
        "Hair",
        hair,
        1,
        NodeTransform::IDENTITY.with_translation([0.0, 0.0, 20.0]),
    );
    BodyAndHair {
        avatar: builder.build(),
        body,
        hair,
    }
}

fn merge_only(policy: FramePolicyKind) -> Pipeline {
    Pipeline::new().with_stage(MergeMeshes::new().with_frame_policy(policy))
}

#[test]
fn merged_renderer_covers_both_inputs() {
    let s = body_and_hair();
    let (avatar, diagnostics) = merge_only(FramePolicyKind::ClampToLast)
        .run(s.avatar, RunMode::Apply)
        .unwrap();

    assert!(avatar.renderers.get(s.hair).is_none());
    let (renderer, mesh) = avatar.renderer_and_mesh(s.body).unwrap();
    assert_eq!(mesh.vertex_count(), 150);
    assert_eq!(mesh.name, "Body_Hair");
    assert!(mesh.generated);

    let bounds = renderer.local_bounds;
    assert!((bounds.min() - Vec3::new(0.0, 0.0, 0.0)).norm() < 1e-4);
    assert!((bounds.max() - Vec3::new(9.0, 0.0, 24.0)).norm() < 1e-4);

    assert_triangles_valid(&avatar, s.body);
    assert_eq!(diagnostics.count(|f| matches!(f, Finding::Merged { .. })), 1);
}

#[rstest]
#[case::rotated(NodeTransform::IDENTITY.with_rotation([0.0, FRAC_1_SQRT_2, 0.0, FRAC_1_SQRT_2]), 1.0)]
#[case::stretched(NodeTransform::IDENTITY.with_scale([2.0, 1.0, 1.0]), 1.0)]
#[case::mirrored(NodeTransform::IDENTITY.with_scale([-1.0, 1.0, 1.0]), -1.0)]
fn member_transform_reaches_merged_geometry(
    #[case] transform: NodeTransform,
    #[case] handedness: f32,
) {
    let transform = transform.with_translation([0.0, 0.0, 20.0]);
    let mut builder = AvatarBuilder::new();
    let body = builder.renderer("Body", grid(9, 9), 1);
    builder.renderer_at("Hair", grid(9, 4), 1, transform);
    let (avatar, _) = merge_only(FramePolicyKind::ClampToLast)
        .run(builder.build(), RunMode::Apply)
        .unwrap();

    let (_, mesh) = avatar.renderer_and_mesh(body).unwrap();
    assert_eq!(mesh.vertex_count(), 150);
    let to_body = transform.matrix();
    let linear = math::linear_part(&to_body);
    for (i, v) in grid(9, 4).vertices.iter().enumerate() {
        let j = 100 + i;
        let (tangent, source) = (mesh.tangents[j], mesh.tangents[i]);
        assert!((mesh.vertices[j] - math::transform_point(&to_body, v)).norm() < 1e-4);
        assert!(mesh.normals[j].dot(&tangent.xyz()).abs() < 1e-4);
        assert!(tangent.xyz().dot(&(linear * source.xyz())) > 0.0);
        assert_eq!(tangent.w, source.w * handedness);
    }
    assert_triangles_valid(&avatar, body);
}

#[test]
fn shared_blend_shape_reuses_last_frame() {
    let s = body_and_hair();
    let (avatar, _) = merge_only(FramePolicyKind::ClampToLast)
        .run(s.avatar, RunMode::Apply)
        .unwrap();
    let (_, mesh) = avatar.renderer_and_mesh(s.body).unwrap();

    assert_eq!(mesh.blend_shapes.len(), 1);
    let blink = &mesh.blend_shapes[0];
    assert_eq!(blink.frames.len(), 2);
    assert_eq!(blink.frames[0].weight, 100.0);
    assert_eq!(blink.frames[1].weight, 100.0);

    // Body has one frame, so its part of frame 2 repeats frame 1.
    let second = &blink.frames[1].delta_vertices;
    assert_eq!(second.len(), 150);
    assert!(second[..100].iter().all(|d| *d == Vec3::y()));
    assert!(second[100..].iter().all(|d| *d == Vec3::y() * 2.0));
}

#[test]
fn strict_policy_leaves_failed_group_untouched() {
    let s = body_and_hair();
    let (avatar, diagnostics) = merge_only(FramePolicyKind::Strict)
        .run(s.avatar, RunMode::Apply)
        .unwrap();

    assert_eq!(avatar.renderers.len(), 2);
    let (_, body) = avatar.renderer_and_mesh(s.body).unwrap();
    assert_eq!(body.name, "BodyMesh");
    assert_eq!(body.vertex_count(), 100);
    assert!(!body.generated);
    assert_eq!(avatar.renderer_and_mesh(s.hair).unwrap().1.vertex_count(), 50);
    assert_eq!(diagnostics.count(|f| matches!(f, Finding::GroupFailed { .. })), 1);
}

#[test]
fn singleton_merge_returns_input() {
    let s = body_and_hair();
    let snapshot = snapshot::extract(&s.avatar, s.body, SlotKeying::PerSlot).unwrap();
    let merged = merge::merge_all(
        vec![snapshot.clone()],
        FramePolicyKind::ClampToLast.as_policy(),
    )
    .unwrap();
    assert_eq!(merged, snapshot);
}

#[rstest]
#[case::first_slot(0, 2)]
#[case::middle_slot(1, 3)]
#[case::last_slot(2, 4)]
fn material_swap_slot_is_offset_by_preceding_materials(
    #[case] local: usize,
    #[case] global: usize,
) {
    let mut builder = AvatarBuilder::new();
    let a = builder.renderer("A", grid(1, 1), 2);
    let b = builder.renderer("B", grid(1, 1), 3);
    let swap = AnimationClip::new("Swap").with_binding(CurveBinding::new(
        "B",
        TargetType::SkinnedRenderer,
        format!("m_Materials.Array.data[{local}]"),
        Curve::object(vec![]),
    ));
    builder.controller(vec![swap]);

    let (avatar, _) = merge_only(FramePolicyKind::ClampToLast)
        .run(builder.build(), RunMode::Apply)
        .unwrap();

    assert!(avatar.renderers.get(b).is_none());
    assert_eq!(avatar.renderers.get(a).unwrap().materials.len(), 5);
    let controller = avatar.animators[0].controller;
    let clip = avatar.controllers.get(controller).unwrap().clips()[0];
    let binding = &avatar.clips.get(clip).unwrap().bindings[0];
    assert_eq!(binding.path, "A");
    assert_eq!(binding.property, format!("m_Materials.Array.data[{global}]"));
}

// ============================================================================
// Blend shapes
// ============================================================================

fn face(weight: f32) -> (Avatar, RendererId) {
    let mut builder = AvatarBuilder::new();
    let mut mesh = grid(3, 1);
    mesh.blend_shapes.push(hiding_shape("remove_eyes", 8, &[0, 4]));
    mesh.blend_shapes.push(lifting_shape("Smile", 8, &[100.0]));
    let id = builder.renderer("Face", mesh, 1);
    let mut avatar = builder.build();
    let renderer = avatar.renderers.get_mut(id).unwrap();
    renderer.set_blend_shape_weight(0, weight);
    (avatar, id)
}

#[test]
fn marked_shape_removes_hidden_geometry() {
    let (avatar, id) = face(100.0);
    let (avatar, diagnostics) = Pipeline::new()
        .with_stage(RemoveMarkedBlendShapes::default())
        .run(avatar, RunMode::Apply)
        .unwrap();

    let (_, mesh) = avatar.renderer_and_mesh(id).unwrap();
    // Vertices 0 and 4 form the left edge; both triangles of the first quad go.
    assert_eq!(mesh.vertex_count(), 6);
    assert_eq!(mesh.sub_meshes[0].len() / 3, 4);
    assert_eq!(mesh.blend_shapes.len(), 1);
    assert_eq!(mesh.blend_shapes[0].name, "Smile");
    assert_eq!(mesh.blend_shapes[0].frames[0].delta_vertices.len(), 6);
    assert_triangles_valid(&avatar, id);
    assert_eq!(
        diagnostics.count(|f| matches!(
            f,
            Finding::StrippedVertices {
                vertices: 2,
                triangles: 2,
                ..
            }
        )),
        1
    );
}

#[test]
fn animated_marker_is_kept() {
    let (avatar, id) = face(100.0);
    let mut builder = AvatarBuilder {
        hips: avatar.root(),
        avatar,
    };
    builder.controller(vec![AnimationClip::new("Eyes").with_binding(
        CurveBinding::new(
            "Face",
            TargetType::SkinnedRenderer,
            "blendShape.remove_eyes",
            toggle(),
        ),
    )]);
    let (avatar, diagnostics) = Pipeline::new()
        .with_stage(RemoveMarkedBlendShapes::default())
        .run(builder.build(), RunMode::Apply)
        .unwrap();
    assert!(diagnostics.is_empty());
    assert_eq!(avatar.renderer_and_mesh(id).unwrap().1.vertex_count(), 8);
}

#[test]
fn strip_twice_equals_strip_once() {
    let (avatar, id) = face(100.0);
    let names = vec!["remove_eyes".to_string()];
    let mut once = snapshot::extract(&avatar, id, SlotKeying::PerSlot).unwrap();
    blendshape::strip_vertices(&mut once, &names);
    let mut twice = once.clone();
    let report = blendshape::strip_vertices(&mut twice, &names);
    assert_eq!(twice, once);
    assert!(report.shapes.is_empty());
    assert_eq!(report.removed_vertices, 0);
}

#[rstest]
#[case::full(100.0)]
#[case::half(50.0)]
#[case::quarter(25.0)]
fn bake_adds_scaled_last_frame(#[case] weight: f32) {
    let mut builder = AvatarBuilder::new();
    let mut mesh = grid(2, 2);
    mesh.blend_shapes.push(lifting_shape("Chubby", 9, &[50.0, 100.0]));
    let id = builder.renderer("Body", mesh, 1);
    let mut avatar = builder.build();
    avatar.renderers.get_mut(id).unwrap().set_blend_shape_weight(0, weight);

    let mut snapshot = snapshot::extract(&avatar, id, SlotKeying::PerSlot).unwrap();
    let original = snapshot.vertices.clone();
    let last = snapshot.blend_shapes[0].frames[1].delta_vertices.clone();
    let report = blendshape::bake_static(&mut snapshot, &["Chubby".to_string()]);

    assert_eq!(report.baked, vec!["Chubby".to_string()]);
    assert!(snapshot.blend_shapes.is_empty());
    for ((now, was), delta) in snapshot.vertices.iter().zip(&original).zip(&last) {
        assert_eq!(*now, was + delta * (weight / 100.0));
    }
}

// ============================================================================
// Retargeting
// ============================================================================

#[test]
fn shared_clip_is_cloned_once_across_groups() {
    let mut builder = AvatarBuilder::new();
    let body = builder.renderer("Body", grid(1, 1), 1);
    let hair = builder.renderer("Hair", grid(1, 1), 1);
    let mut shoes = grid(1, 1);
    shoes.blend_shapes.push(lifting_shape("Tight", 4, &[100.0]));
    let mut socks = grid(1, 1);
    socks.blend_shapes.push(lifting_shape("Tight", 4, &[100.0]));
    let shoes = builder.renderer("Shoes", shoes, 1);
    let socks = builder.renderer("Socks", socks, 1);

    let mut outfit = AnimationClip::new("Outfit");
    for path in ["Body", "Hair", "Shoes", "Socks"] {
        outfit.bindings.push(CurveBinding::new(
            path,
            TargetType::GameObject,
            "m_IsActive",
            toggle(),
        ));
    }
    let (controller, clips) = builder.controller(vec![outfit]);

    let (avatar, diagnostics) = merge_only(FramePolicyKind::ClampToLast)
        .run(builder.build(), RunMode::Apply)
        .unwrap();

    assert_eq!(diagnostics.count(|f| matches!(f, Finding::Merged { .. })), 2);
    for gone in [hair, socks] {
        assert!(avatar.renderers.get(gone).is_none());
    }
    for kept in [body, shoes] {
        assert_triangles_valid(&avatar, kept);
    }

    let generated: Vec<_> = avatar.clips.iter().filter(|(_, c)| c.generated).collect();
    assert_eq!(generated.len(), 1);
    let (clone_id, clone) = generated[0];
    assert_eq!(clone.name, "Outfit_merged");
    let paths: Vec<_> = clone.bindings.iter().map(|b| b.path.as_str()).collect();
    assert_eq!(paths, vec!["Body", "Shoes"]);

    // The original clip and controller are untouched; the animator now plays
    // a controller clone pointing at the clip clone.
    assert_eq!(avatar.clips.get(clips[0]).unwrap().bindings.len(), 4);
    assert_eq!(avatar.controllers.get(controller).unwrap().clips(), vec![clips[0]]);
    let swapped = avatar.animators[0].controller;
    assert_ne!(swapped, controller);
    assert_eq!(avatar.controllers.get(swapped).unwrap().clips(), vec![clone_id]);
}

// ============================================================================
// Modes and output
// ============================================================================

#[test]
fn dry_run_reports_without_mutating() {
    let s = body_and_hair();
    let (mut face_avatar, _) = face(100.0);
    face_avatar.name = "Face".into();
    for avatar in [s.avatar, face_avatar] {
        let before = assets::encode("before", &avatar).unwrap();
        let (after, diagnostics) = Pipeline::from_config(&OptimizerConfig::default())
            .run(avatar, RunMode::DryRun)
            .unwrap();
        assert_eq!(assets::encode("after", &after).unwrap(), before);
        assert!(!diagnostics.is_empty());
    }
}

#[test]
fn generated_assets_are_flushed_and_cleared() {
    let s = body_and_hair();
    let mut config = OptimizerConfig::default();
    config.blendshapes.remove_unused = false;
    let (avatar, _) = Pipeline::from_config(&config)
        .run(s.avatar, RunMode::Apply)
        .unwrap();

    let dir = temp_dir("flush");
    let mut store = DirectoryAssetStore::new(dir.join("generated"));
    let written = assets::flush_generated(&avatar, &mut store, false).unwrap();
    let names = store.list().unwrap();
    assert_eq!(names.len(), written);
    assert!(names
        .iter()
        .any(|n| n.starts_with("mesh-") && n.ends_with("-Body_Hair.ron")));

    store.clear().unwrap();
    assert!(store.list().unwrap().is_empty());
}
