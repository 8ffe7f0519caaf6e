//! Mesh generators for common shapes.
//!
//! These generators produce unskinned [`SkinnedMesh`] values; attach bone
//! weights and bind poses with the builder methods before use on a renderer.

use std::f32::consts::PI;

use crate::math::{Vec2, Vec3};

use super::data::{BoneWeight, SkinnedMesh};

/// Generate a UV sphere mesh.
///
/// Creates a sphere with the given radius, number of longitudinal segments,
/// and number of latitudinal rings. Normals and UV channel 0 are filled.
///
/// # Arguments
///
/// * `radius` - Sphere radius
/// * `segments` - Number of longitudinal segments (around the equator)
/// * `rings` - Number of latitudinal rings (from pole to pole)
pub fn generate_sphere(radius: f32, segments: u32, rings: u32) -> SkinnedMesh {
    let mut vertices = Vec::new();
    let mut normals = Vec::new();
    let mut uvs = Vec::new();
    let mut indices = Vec::new();

    for ring in 0..=rings {
        let theta = ring as f32 * PI / rings as f32;
        let sin_theta = theta.sin();
        let cos_theta = theta.cos();

        for segment in 0..=segments {
            let phi = segment as f32 * 2.0 * PI / segments as f32;
            let normal = Vec3::new(sin_theta * phi.cos(), cos_theta, sin_theta * phi.sin());

            vertices.push(normal * radius);
            normals.push(normal);
            uvs.push(Vec2::new(
                segment as f32 / segments as f32,
                ring as f32 / rings as f32,
            ));
        }
    }

    for ring in 0..rings {
        for segment in 0..segments {
            let current = ring * (segments + 1) + segment;
            let next = current + segments + 1;

            indices.extend_from_slice(&[current, next, current + 1]);
            indices.extend_from_slice(&[current + 1, next, next + 1]);
        }
    }

    SkinnedMesh::new("sphere")
        .with_vertices(vertices)
        .with_normals(normals)
        .with_uvs(0, uvs)
        .with_sub_mesh(indices)
}

/// Generate a quad mesh on the XY plane.
///
/// Creates a quad centered at the origin with the given half-width and
/// half-height. Only positions and UV channel 0 are filled.
///
/// UV coordinates go from (0,0) at top-left to (1,1) at bottom-right.
pub fn generate_quad(half_width: f32, half_height: f32) -> SkinnedMesh {
    let vertices = vec![
        Vec3::new(-half_width, -half_height, 0.0),
        Vec3::new(half_width, -half_height, 0.0),
        Vec3::new(half_width, half_height, 0.0),
        Vec3::new(-half_width, half_height, 0.0),
    ];
    let uvs = vec![
        Vec2::new(0.0, 1.0),
        Vec2::new(1.0, 1.0),
        Vec2::new(1.0, 0.0),
        Vec2::new(0.0, 0.0),
    ];

    SkinnedMesh::new("quad")
        .with_vertices(vertices)
        .with_uvs(0, uvs)
        .with_sub_mesh(vec![0, 1, 2, 2, 3, 0])
}

/// Generate a flat grid on the XZ plane with `(columns + 1) * (rows + 1)`
/// vertices, skinned entirely to bone 0.
///
/// Handy for building test avatars with an exact vertex count.
pub fn generate_skinned_grid(columns: u32, rows: u32, cell_size: f32) -> SkinnedMesh {
    let mut vertices = Vec::new();
    let mut uvs = Vec::new();
    let mut indices = Vec::new();

    for row in 0..=rows {
        for column in 0..=columns {
            vertices.push(Vec3::new(column as f32 * cell_size, 0.0, row as f32 * cell_size));
            uvs.push(Vec2::new(
                column as f32 / columns.max(1) as f32,
                row as f32 / rows.max(1) as f32,
            ));
        }
    }

    for row in 0..rows {
        for column in 0..columns {
            let current = row * (columns + 1) + column;
            let next = current + columns + 1;

            indices.extend_from_slice(&[current, next, current + 1]);
            indices.extend_from_slice(&[current + 1, next, next + 1]);
        }
    }

    let weights = vec![BoneWeight::single(0); vertices.len()];
    let normals = vec![Vec3::y(); vertices.len()];

    let mut mesh = SkinnedMesh::new("grid")
        .with_vertices(vertices)
        .with_normals(normals)
        .with_uvs(0, uvs)
        .with_sub_mesh(indices);
    mesh.bone_weights = weights;
    mesh
}
