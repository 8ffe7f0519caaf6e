//! Skinned mesh asset data.
//!
//! This module provides:
//! - [`SkinnedMesh`] - index-based mesh as stored by an asset
//! - [`BoneWeight`] - four bone influences addressed by bone-list index
//! - [`BlendShape`] / [`BlendShapeFrame`] - morph targets with keyframes
//!
//! Optional per-vertex channels (normals, tangents, colors, UVs, weights)
//! may be shorter than the vertex list or empty, meaning "absent".

use serde::{Deserialize, Serialize};

use crate::math::{Bounds, Color, Mat4, Vec2, Vec3, Vec4};

/// Number of UV channels a mesh can carry.
pub const MAX_UV_CHANNELS: usize = 8;

/// Four bone influences of one vertex.
///
/// Indices address the owning renderer's bone list.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct BoneWeight {
    /// Bone-list indices of the four influences.
    pub indices: [u32; 4],
    /// Influence weights, normally summing to one.
    pub weights: [f32; 4],
}

impl BoneWeight {
    /// Full weight on a single bone.
    pub fn single(index: u32) -> Self {
        Self {
            indices: [index; 4],
            weights: [1.0, 0.0, 0.0, 0.0],
        }
    }
}

/// One keyframe of a blend shape.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BlendShapeFrame {
    /// Shape weight (0..100 by convention) at which the deltas apply fully.
    pub weight: f32,
    /// Per-vertex position offsets.
    pub delta_vertices: Vec<Vec3>,
    /// Per-vertex normal offsets.
    pub delta_normals: Vec<Vec3>,
    /// Per-vertex tangent offsets.
    pub delta_tangents: Vec<Vec3>,
}

impl BlendShapeFrame {
    /// A frame with all deltas zero.
    pub fn zeroed(vertex_count: usize, weight: f32) -> Self {
        Self {
            weight,
            delta_vertices: vec![Vec3::zeros(); vertex_count],
            delta_normals: vec![Vec3::zeros(); vertex_count],
            delta_tangents: vec![Vec3::zeros(); vertex_count],
        }
    }

    /// A frame with position deltas only.
    pub fn from_positions(weight: f32, delta_vertices: Vec<Vec3>) -> Self {
        let n = delta_vertices.len();
        Self {
            weight,
            delta_vertices,
            delta_normals: vec![Vec3::zeros(); n],
            delta_tangents: vec![Vec3::zeros(); n],
        }
    }
}

/// A named morph target.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BlendShape {
    /// Shape name, unique within a mesh.
    pub name: String,
    /// Keyframes in ascending weight order.
    pub frames: Vec<BlendShapeFrame>,
}

impl BlendShape {
    /// Create a shape from its frames.
    pub fn new(name: impl Into<String>, frames: Vec<BlendShapeFrame>) -> Self {
        Self {
            name: name.into(),
            frames,
        }
    }
}

/// A skinned mesh asset.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SkinnedMesh {
    /// Asset name.
    pub name: String,
    /// Vertex positions. Defines the vertex count.
    pub vertices: Vec<Vec3>,
    /// Vertex normals, empty when absent.
    #[serde(default)]
    pub normals: Vec<Vec3>,
    /// Vertex tangents (`w` is the bitangent sign), empty when absent.
    #[serde(default)]
    pub tangents: Vec<Vec4>,
    /// Vertex colors, empty when absent.
    #[serde(default)]
    pub colors: Vec<Color>,
    /// UV channels; missing trailing channels are absent.
    #[serde(default)]
    pub uvs: Vec<Vec<Vec2>>,
    /// Triangle lists, one per material slot.
    #[serde(default)]
    pub sub_meshes: Vec<Vec<u32>>,
    /// Skinning weights, empty when the mesh is unskinned.
    #[serde(default)]
    pub bone_weights: Vec<BoneWeight>,
    /// Bind pose per bone-list entry.
    #[serde(default)]
    pub bind_poses: Vec<Mat4>,
    /// Morph targets.
    #[serde(default)]
    pub blend_shapes: Vec<BlendShape>,
    /// Set on meshes produced by optimisation passes.
    #[serde(default)]
    pub generated: bool,
}

impl SkinnedMesh {
    /// Create an empty mesh.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            vertices: Vec::new(),
            normals: Vec::new(),
            tangents: Vec::new(),
            colors: Vec::new(),
            uvs: Vec::new(),
            sub_meshes: Vec::new(),
            bone_weights: Vec::new(),
            bind_poses: Vec::new(),
            blend_shapes: Vec::new(),
            generated: false,
        }
    }

    /// Set vertex positions.
    #[must_use]
    pub fn with_vertices(mut self, vertices: Vec<Vec3>) -> Self {
        self.vertices = vertices;
        self
    }

    /// Set vertex normals.
    #[must_use]
    pub fn with_normals(mut self, normals: Vec<Vec3>) -> Self {
        self.normals = normals;
        self
    }

    /// Set a UV channel, creating empty intermediate channels as needed.
    #[must_use]
    pub fn with_uvs(mut self, channel: usize, uvs: Vec<Vec2>) -> Self {
        self.set_uvs(channel, uvs);
        self
    }

    /// Append a submesh triangle list.
    #[must_use]
    pub fn with_sub_mesh(mut self, indices: Vec<u32>) -> Self {
        self.sub_meshes.push(indices);
        self
    }

    /// Append a blend shape.
    #[must_use]
    pub fn with_blend_shape(mut self, shape: BlendShape) -> Self {
        self.blend_shapes.push(shape);
        self
    }

    /// Number of vertices.
    pub fn vertex_count(&self) -> usize {
        self.vertices.len()
    }

    /// Number of triangles over all submeshes.
    pub fn triangle_count(&self) -> usize {
        self.sub_meshes.iter().map(|s| s.len() / 3).sum()
    }

    /// UV channel contents; empty for absent channels.
    pub fn uv_channel(&self, channel: usize) -> &[Vec2] {
        self.uvs.get(channel).map_or(&[], |c| c.as_slice())
    }

    /// Replace a UV channel. Channels beyond [`MAX_UV_CHANNELS`] are ignored.
    pub fn set_uvs(&mut self, channel: usize, uvs: Vec<Vec2>) {
        if channel >= MAX_UV_CHANNELS {
            log::warn!("mesh {}: ignoring UV channel {channel}", self.name);
            return;
        }
        if self.uvs.len() <= channel {
            self.uvs.resize_with(channel + 1, Vec::new);
        }
        self.uvs[channel] = uvs;
    }

    /// Index of a blend shape by name.
    pub fn blend_shape_index(&self, name: &str) -> Option<usize> {
        self.blend_shapes.iter().position(|s| s.name == name)
    }

    /// Name of the blend shape at `index`.
    pub fn blend_shape_name(&self, index: usize) -> Option<&str> {
        self.blend_shapes.get(index).map(|s| s.name.as_str())
    }

    /// Bounds of the vertex positions, `None` for an empty mesh.
    pub fn compute_bounds(&self) -> Option<Bounds> {
        Bounds::from_points(self.vertices.iter())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn triangle() -> SkinnedMesh {
        SkinnedMesh::new("tri")
            .with_vertices(vec![
                Vec3::new(0.0, 0.0, 0.0),
                Vec3::new(1.0, 0.0, 0.0),
                Vec3::new(0.0, 1.0, 0.0),
            ])
            .with_sub_mesh(vec![0, 1, 2])
    }

    #[test]
    fn uv_channels_are_created_on_demand() {
        let mesh = triangle().with_uvs(2, vec![Vec2::zeros(); 3]);
        assert_eq!(mesh.uvs.len(), 3);
        assert!(mesh.uv_channel(0).is_empty());
        assert_eq!(mesh.uv_channel(2).len(), 3);
        assert!(mesh.uv_channel(7).is_empty());
    }

    #[test]
    fn uv_channel_out_of_range_is_ignored() {
        let mesh = triangle().with_uvs(MAX_UV_CHANNELS, vec![Vec2::zeros(); 3]);
        assert!(mesh.uvs.is_empty());
    }

    #[test]
    fn blend_shape_lookup() {
        let mesh = triangle()
            .with_blend_shape(BlendShape::new("Blink", vec![BlendShapeFrame::zeroed(3, 100.0)]))
            .with_blend_shape(BlendShape::new("Smile", vec![BlendShapeFrame::zeroed(3, 100.0)]));
        assert_eq!(mesh.blend_shape_index("Smile"), Some(1));
        assert_eq!(mesh.blend_shape_name(0), Some("Blink"));
        assert_eq!(mesh.blend_shape_index("Nope"), None);
    }

    #[test]
    fn bounds_of_triangle() {
        let b = triangle().compute_bounds().unwrap();
        assert_eq!(b.min(), Vec3::new(0.0, 0.0, 0.0));
        assert_eq!(b.max(), Vec3::new(1.0, 1.0, 0.0));
        assert_eq!(triangle().triangle_count(), 1);
    }
}
