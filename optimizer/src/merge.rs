//! Merge engine: folds snapshots into one.
//!
//! The first snapshot is the base. Its transform, bone order and submesh
//! order are kept; every following snapshot is re-projected into base space
//! and appended. Blend shapes present in both inputs are reconciled frame by
//! frame through a [`FramePolicy`]:
//!
//! - [`ClampToLast`] reuses a source's last frame beyond its own frame count
//! - [`Strict`] refuses to merge shapes whose frame counts differ

use serde::{Deserialize, Serialize};
use skinweld_core::math::{self, Mat3, Mat4, Vec3, Vec4};
use skinweld_core::mesh::BlendShapeFrame;

use crate::error::{MergeError, MergeResult};
use crate::snapshot::{MeshSnapshot, SnapshotBlendShape};

/// A merged frame: base frame index, other frame index, frame weight.
pub type FramePair = (usize, usize, f32);

/// Reconciles the frames of a blend shape present in both merge inputs.
pub trait FramePolicy {
    /// Name used in logs and diagnostics.
    fn name(&self) -> &'static str;

    /// Decide which source frames make up each merged frame.
    fn reconcile(
        &self,
        shape: &str,
        base: &[BlendShapeFrame],
        other: &[BlendShapeFrame],
    ) -> MergeResult<Vec<FramePair>>;
}

/// Merged frame count is the larger of the two. A source with fewer frames
/// repeats its last frame; the frame weight is the larger contributing weight.
#[derive(Debug, Clone, Copy, Default)]
pub struct ClampToLast;

impl FramePolicy for ClampToLast {
    fn name(&self) -> &'static str {
        "clamp-to-last"
    }

    fn reconcile(
        &self,
        shape: &str,
        base: &[BlendShapeFrame],
        other: &[BlendShapeFrame],
    ) -> MergeResult<Vec<FramePair>> {
        let (Some(base_last), Some(other_last)) = (base.len().checked_sub(1), other.len().checked_sub(1))
        else {
            return Err(MergeError::FrameCountMismatch {
                shape: shape.to_owned(),
                base: base.len(),
                other: other.len(),
            });
        };
        let count = base.len().max(other.len());
        Ok((0..count)
            .map(|i| {
                let b = i.min(base_last);
                let o = i.min(other_last);
                (b, o, base[b].weight.max(other[o].weight))
            })
            .collect())
    }
}

/// Frame counts must match exactly.
#[derive(Debug, Clone, Copy, Default)]
pub struct Strict;

impl FramePolicy for Strict {
    fn name(&self) -> &'static str {
        "strict"
    }

    fn reconcile(
        &self,
        shape: &str,
        base: &[BlendShapeFrame],
        other: &[BlendShapeFrame],
    ) -> MergeResult<Vec<FramePair>> {
        if base.len() != other.len() || base.is_empty() {
            return Err(MergeError::FrameCountMismatch {
                shape: shape.to_owned(),
                base: base.len(),
                other: other.len(),
            });
        }
        Ok(base
            .iter()
            .zip(other)
            .enumerate()
            .map(|(i, (b, o))| (i, i, b.weight.max(o.weight)))
            .collect())
    }
}

/// Configurable choice of [`FramePolicy`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum FramePolicyKind {
    #[default]
    ClampToLast,
    Strict,
}

impl FramePolicyKind {
    /// The policy implementation.
    pub fn as_policy(self) -> &'static dyn FramePolicy {
        match self {
            Self::ClampToLast => &ClampToLast,
            Self::Strict => &Strict,
        }
    }
}

/// Fold `snapshots` left to right into the first one.
///
/// A single snapshot is returned unchanged.
pub fn merge_all(snapshots: Vec<MeshSnapshot>, policy: &dyn FramePolicy) -> MergeResult<MeshSnapshot> {
    let mut iter = snapshots.into_iter();
    let mut base = iter.next().ok_or(MergeError::EmptyGroup)?;
    for other in iter {
        merge_into(&mut base, other, policy)?;
    }
    base.check_invariants()?;
    Ok(base)
}

/// Append `other` to `base`, re-projecting it into base space.
pub fn merge_into(
    base: &mut MeshSnapshot,
    other: MeshSnapshot,
    policy: &dyn FramePolicy,
) -> MergeResult<()> {
    let offset = base.vertex_count();
    let other_count = other.vertex_count();
    let relative = base.world_to_local * other.local_to_world;
    let projection = Reprojection::new(&relative);

    // Blend shapes first: reconciliation is the only step that can fail,
    // and base must stay untouched when it does.
    let blend_shapes = merge_blend_shapes(base, &other, offset, &projection, policy)?;

    let MeshSnapshot {
        name,
        vertices,
        normals,
        tangents,
        colors,
        uv_channels,
        sub_meshes,
        weights,
        bones,
        bind_poses,
        bounds,
        world_to_local,
        ..
    } = other;

    base.vertices
        .extend(vertices.iter().map(|v| math::transform_point(&relative, v)));
    base.normals
        .extend(normals.iter().map(|n| projection.normal(n)));
    base.tangents
        .extend(tangents.iter().map(|t| projection.tangent(t)));
    base.colors.extend(colors);
    for (channel, uvs) in base.uv_channels.iter_mut().zip(uv_channels) {
        channel.extend(uvs);
    }

    for (key, triangles) in sub_meshes.into_entries() {
        base.sub_meshes
            .entry(key)
            .extend(triangles.iter().map(|i| i + offset as u32));
    }

    base.weights.extend(weights);

    let inverse_relative = world_to_local * base.local_to_world;
    for (bone, pose) in bind_poses {
        base.bind_poses.entry(bone).or_insert(pose * inverse_relative);
    }
    for bone in bones {
        if !base.bones.contains(&bone) {
            base.bones.push(bone);
        }
    }

    base.blend_shapes = blend_shapes;
    base.bounds.encapsulate(&bounds.transformed(&relative));

    log::debug!(
        "Merged {name} into {}: {} + {} vertices",
        base.name,
        offset,
        other_count
    );
    Ok(())
}

/// Maps surface data of one snapshot into another's space.
///
/// Normals go through the inverse-transpose and tangents through the linear
/// part, both renormalised. A mirroring transform flips tangent handedness.
/// Blend shape normal and tangent deltas use the same matrix as the data they
/// offset and share its renormalisation factor, so `base + delta` stays
/// parallel to the re-projected morphed vector.
struct Reprojection {
    linear: Mat3,
    normal: Mat3,
    handedness: f32,
}

impl Reprojection {
    fn new(relative: &Mat4) -> Self {
        let linear = math::linear_part(relative);
        Self {
            normal: math::normal_matrix(relative),
            handedness: linear.determinant().signum(),
            linear,
        }
    }

    fn normal(&self, n: &Vec3) -> Vec3 {
        renormalize(self.normal * n, *n)
    }

    fn tangent(&self, t: &Vec4) -> Vec4 {
        let xyz = renormalize(self.linear * t.xyz(), t.xyz());
        Vec4::new(xyz.x, xyz.y, xyz.z, t.w * self.handedness)
    }

    fn frame(&self, frame: &BlendShapeFrame, normals: &[Vec3], tangents: &[Vec4]) -> BlendShapeFrame {
        BlendShapeFrame {
            weight: frame.weight,
            delta_vertices: frame.delta_vertices.iter().map(|d| self.linear * d).collect(),
            delta_normals: frame
                .delta_normals
                .iter()
                .zip(normals)
                .map(|(d, n)| self.normal * d * inverse_length(&(self.normal * n)))
                .collect(),
            delta_tangents: frame
                .delta_tangents
                .iter()
                .zip(tangents)
                .map(|(d, t)| self.linear * d * inverse_length(&(self.linear * t.xyz())))
                .collect(),
        }
    }
}

fn renormalize(v: Vec3, fallback: Vec3) -> Vec3 {
    v.try_normalize(f32::EPSILON).unwrap_or(fallback)
}

fn inverse_length(v: &Vec3) -> f32 {
    let length = v.norm();
    if length > f32::EPSILON {
        1.0 / length
    } else {
        1.0
    }
}

fn merge_blend_shapes(
    base: &MeshSnapshot,
    other: &MeshSnapshot,
    offset: usize,
    projection: &Reprojection,
    policy: &dyn FramePolicy,
) -> MergeResult<Vec<SnapshotBlendShape>> {
    let other_count = other.vertex_count();
    let moved = |frame: &BlendShapeFrame| projection.frame(frame, &other.normals, &other.tangents);

    let mut merged = Vec::with_capacity(base.blend_shapes.len() + other.blend_shapes.len());
    for shape in &base.blend_shapes {
        let frames = match other.blend_shapes.iter().find(|s| s.name == shape.name) {
            Some(theirs) => {
                let pairs = policy.reconcile(&shape.name, &shape.frames, &theirs.frames)?;
                pairs
                    .into_iter()
                    .map(|(b, o, weight)| {
                        let mut frame = concat(&shape.frames[b], &moved(&theirs.frames[o]));
                        frame.weight = weight;
                        frame
                    })
                    .collect()
            }
            None => shape
                .frames
                .iter()
                .map(|f| concat(f, &BlendShapeFrame::zeroed(other_count, f.weight)))
                .collect(),
        };
        let weight = other
            .blend_shapes
            .iter()
            .find(|s| s.name == shape.name)
            .map_or(shape.weight, |s| s.weight.max(shape.weight));
        merged.push(SnapshotBlendShape {
            name: shape.name.clone(),
            frames,
            weight,
        });
    }
    for shape in &other.blend_shapes {
        if base.blend_shape_index(&shape.name).is_some() {
            continue;
        }
        merged.push(SnapshotBlendShape {
            name: shape.name.clone(),
            frames: shape
                .frames
                .iter()
                .map(|f| concat(&BlendShapeFrame::zeroed(offset, f.weight), &moved(f)))
                .collect(),
            weight: shape.weight,
        });
    }
    Ok(merged)
}

fn concat(first: &BlendShapeFrame, second: &BlendShapeFrame) -> BlendShapeFrame {
    let join = |a: &[Vec3], b: &[Vec3]| a.iter().chain(b).copied().collect();
    BlendShapeFrame {
        weight: first.weight,
        delta_vertices: join(&first.delta_vertices, &second.delta_vertices),
        delta_normals: join(&first.delta_normals, &second.delta_normals),
        delta_tangents: join(&first.delta_tangents, &second.delta_tangents),
    }
}
