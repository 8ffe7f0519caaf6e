//! Engine-independent mesh snapshots.
//!
//! A [`MeshSnapshot`] captures everything a renderer draws in one
//! self-contained value: geometry with every optional channel padded to the
//! vertex count, triangles grouped by [`MaterialKey`], bone weights keyed by
//! bone node rather than by index, bind poses, blend shapes with their
//! current weights, bounds and the renderer's world transform.
//!
//! Snapshots are built by [`extract`], edited in place (merge, strip, bake)
//! and consumed by [`write_back`]. Every per-vertex array, blend shape frame
//! deltas included, has the same length at all times.

mod apply;
mod extract;

pub use apply::{write_back, WrittenMesh};
pub use extract::{extract, SlotKeying};

use std::collections::BTreeMap;

use skinweld_core::math::{Bounds, Color, Mat4, Vec2, Vec3, Vec4};
use skinweld_core::mesh::{BlendShapeFrame, MAX_UV_CHANNELS};
use skinweld_core::registry::{MaterialId, NodeId, RendererId};

use crate::error::{SnapshotError, SnapshotResult};

/// UV written for vertices lacking one.
pub const DEFAULT_UV: Vec2 = Vec2::new(0.0, 0.0);

/// Color written for vertices lacking one: white, zero alpha.
pub const DEFAULT_COLOR: Color = Color::new(1.0, 1.0, 1.0, 0.0);

/// Four bone influences addressed by bone node.
///
/// `None` marks an influence whose bone is missing from the hierarchy.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BoneWeight4 {
    pub bones: [Option<NodeId>; 4],
    pub weights: [f32; 4],
}

impl BoneWeight4 {
    /// Full weight on one bone.
    pub fn single(bone: NodeId) -> Self {
        Self {
            bones: [Some(bone); 4],
            weights: [1.0, 0.0, 0.0, 0.0],
        }
    }
}

/// Key grouping triangles into one submesh of the merged renderer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum MaterialKey {
    /// Triangles of every slot using this material.
    Material(MaterialId),
    /// One specific slot, kept apart from every other slot.
    Slot {
        material: MaterialId,
        renderer: RendererId,
        slot: usize,
    },
}

impl MaterialKey {
    /// Material rendered by this submesh.
    pub fn material(&self) -> MaterialId {
        match *self {
            Self::Material(material) | Self::Slot { material, .. } => material,
        }
    }
}

/// Material-keyed triangle lists in first-insertion order.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct SubMeshes {
    entries: Vec<(MaterialKey, Vec<u32>)>,
}

impl SubMeshes {
    /// Triangle list for `key`, created empty at the end if absent.
    pub fn entry(&mut self, key: MaterialKey) -> &mut Vec<u32> {
        let index = match self.position(&key) {
            Some(index) => index,
            None => {
                self.entries.push((key, Vec::new()));
                self.entries.len() - 1
            }
        };
        &mut self.entries[index].1
    }

    /// Slot index `key` ends up in.
    pub fn position(&self, key: &MaterialKey) -> Option<usize> {
        self.entries.iter().position(|(k, _)| k == key)
    }

    /// Triangle list for `key`.
    pub fn get(&self, key: &MaterialKey) -> Option<&[u32]> {
        self.entries
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_slice())
    }

    /// Keys in slot order.
    pub fn keys(&self) -> impl Iterator<Item = &MaterialKey> + '_ {
        self.entries.iter().map(|(k, _)| k)
    }

    /// `(key, triangles)` pairs in slot order.
    pub fn iter(&self) -> impl Iterator<Item = (&MaterialKey, &[u32])> + '_ {
        self.entries.iter().map(|(k, v)| (k, v.as_slice()))
    }

    /// Mutable triangle lists in slot order.
    pub fn lists_mut(&mut self) -> impl Iterator<Item = &mut Vec<u32>> + '_ {
        self.entries.iter_mut().map(|(_, v)| v)
    }

    /// Number of submeshes.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns `true` if there are no submeshes.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Total triangle count.
    pub fn triangle_count(&self) -> usize {
        self.entries.iter().map(|(_, v)| v.len() / 3).sum()
    }

    pub(crate) fn into_entries(self) -> Vec<(MaterialKey, Vec<u32>)> {
        self.entries
    }
}

/// A blend shape with the renderer's current weight.
#[derive(Debug, Clone, PartialEq)]
pub struct SnapshotBlendShape {
    pub name: String,
    pub frames: Vec<BlendShapeFrame>,
    /// Current weight on the renderer (0..100).
    pub weight: f32,
}

impl SnapshotBlendShape {
    /// The frame applied at full weight.
    pub fn last_frame(&self) -> Option<&BlendShapeFrame> {
        self.frames.last()
    }
}

/// Engine-independent capture of one renderer's drawable state.
#[derive(Debug, Clone, PartialEq)]
pub struct MeshSnapshot {
    /// Name used for the written mesh.
    pub name: String,
    pub vertices: Vec<Vec3>,
    pub normals: Vec<Vec3>,
    pub tangents: Vec<Vec4>,
    pub colors: Vec<Color>,
    pub uv_channels: [Vec<Vec2>; MAX_UV_CHANNELS],
    pub sub_meshes: SubMeshes,
    pub weights: Vec<BoneWeight4>,
    /// Bone order of the written bone list.
    pub bones: Vec<NodeId>,
    pub bind_poses: BTreeMap<NodeId, Mat4>,
    pub blend_shapes: Vec<SnapshotBlendShape>,
    /// Bounds in the renderer node's local space.
    pub bounds: Bounds,
    pub local_to_world: Mat4,
    pub world_to_local: Mat4,
}

impl MeshSnapshot {
    /// Number of vertices.
    pub fn vertex_count(&self) -> usize {
        self.vertices.len()
    }

    /// Index of a blend shape by name.
    pub fn blend_shape_index(&self, name: &str) -> Option<usize> {
        self.blend_shapes.iter().position(|s| s.name == name)
    }

    /// Check the lock-step and index invariants.
    pub fn check_invariants(&self) -> SnapshotResult<()> {
        let n = self.vertices.len();
        let mut channels: Vec<(String, usize)> = vec![
            ("normals".into(), self.normals.len()),
            ("tangents".into(), self.tangents.len()),
            ("colors".into(), self.colors.len()),
            ("weights".into(), self.weights.len()),
        ];
        for (i, uvs) in self.uv_channels.iter().enumerate() {
            channels.push((format!("uv{i}"), uvs.len()));
        }
        if let Some((channel, len)) = channels.into_iter().find(|(_, len)| *len != n) {
            return Err(SnapshotError::Inconsistent(format!(
                "{channel} has {len} entries for {n} vertices"
            )));
        }
        for shape in &self.blend_shapes {
            if shape.frames.is_empty() {
                return Err(SnapshotError::EmptyBlendShape(shape.name.clone()));
            }
            for (frame, data) in shape.frames.iter().enumerate() {
                let lens = [
                    data.delta_vertices.len(),
                    data.delta_normals.len(),
                    data.delta_tangents.len(),
                ];
                if let Some(len) = lens.into_iter().find(|len| *len != n) {
                    return Err(SnapshotError::FrameLength {
                        shape: shape.name.clone(),
                        frame,
                        len,
                        vertex_count: n,
                    });
                }
            }
        }
        for (slot, (_, triangles)) in self.sub_meshes.iter().enumerate() {
            if let Some(&index) = triangles.iter().find(|&&i| i as usize >= n) {
                return Err(SnapshotError::TriangleOutOfRange {
                    slot,
                    index,
                    vertex_count: n,
                });
            }
        }
        Ok(())
    }

    /// Delete the flagged vertices from every per-vertex array.
    ///
    /// Triangles touching a removed vertex are dropped entirely; the rest are
    /// remapped. Returns `(vertices removed, triangles removed)`.
    pub fn remove_vertices(&mut self, remove: &[bool]) -> (usize, usize) {
        let n = self.vertices.len();
        let flagged = |i: usize| remove.get(i).copied().unwrap_or(false);

        let mut remap = vec![None; n];
        let mut next = 0u32;
        for (i, slot) in remap.iter_mut().enumerate() {
            if !flagged(i) {
                *slot = Some(next);
                next += 1;
            }
        }
        let removed_vertices = n - next as usize;
        if removed_vertices == 0 {
            return (0, 0);
        }

        fn retain<T>(values: &mut Vec<T>, remap: &[Option<u32>]) {
            let mut i = 0;
            values.retain(|_| {
                let keep = remap.get(i).is_some_and(Option::is_some);
                i += 1;
                keep
            });
        }

        retain(&mut self.vertices, &remap);
        retain(&mut self.normals, &remap);
        retain(&mut self.tangents, &remap);
        retain(&mut self.colors, &remap);
        retain(&mut self.weights, &remap);
        for uvs in &mut self.uv_channels {
            retain(uvs, &remap);
        }
        for shape in &mut self.blend_shapes {
            for frame in &mut shape.frames {
                retain(&mut frame.delta_vertices, &remap);
                retain(&mut frame.delta_normals, &remap);
                retain(&mut frame.delta_tangents, &remap);
            }
        }

        let mut removed_triangles = 0;
        for list in self.sub_meshes.lists_mut() {
            let before = list.len() / 3;
            *list = list
                .chunks_exact(3)
                .filter_map(|tri| {
                    let a = remap.get(tri[0] as usize).copied().flatten()?;
                    let b = remap.get(tri[1] as usize).copied().flatten()?;
                    let c = remap.get(tri[2] as usize).copied().flatten()?;
                    Some([a, b, c])
                })
                .flatten()
                .collect();
            removed_triangles += before - list.len() / 3;
        }

        (removed_vertices, removed_triangles)
    }
}
