//! Blend shape removal on snapshots.
//!
//! - [`strip_vertices`] deletes the geometry a shape hides
//! - [`bake_static`] folds a shape's current displacement into the base mesh
//!
//! Both treat names that are not present as no-ops, so running either twice
//! with the same input changes nothing the second time.

mod usage;

pub use usage::{collect_usage, BlendShapeUsage};

use skinweld_core::math::Vec3;

use crate::snapshot::MeshSnapshot;

/// Outcome of [`strip_vertices`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StripReport {
    /// Shapes that were removed.
    pub shapes: Vec<String>,
    pub removed_vertices: usize,
    pub removed_triangles: usize,
}

/// Outcome of [`bake_static`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BakeReport {
    /// Shapes with a non-zero weight whose displacement was baked in.
    pub baked: Vec<String>,
    /// Shapes with zero weight, dropped without touching geometry.
    pub dropped: Vec<String>,
}

/// Remove the named shapes together with every vertex they move.
///
/// A vertex is flagged when the shape's last frame displaces it. Flagged
/// vertices are deleted from every per-vertex array, remaining blend shapes
/// included, and triangles touching them are dropped.
pub fn strip_vertices(snapshot: &mut MeshSnapshot, names: &[String]) -> StripReport {
    let mut report = StripReport::default();
    let mut flagged = vec![false; snapshot.vertex_count()];
    snapshot.blend_shapes.retain(|shape| {
        if !names.contains(&shape.name) {
            return true;
        }
        if let Some(frame) = shape.last_frame() {
            for (flag, delta) in flagged.iter_mut().zip(&frame.delta_vertices) {
                if *delta != Vec3::zeros() {
                    *flag = true;
                }
            }
        }
        report.shapes.push(shape.name.clone());
        false
    });
    let (vertices, triangles) = snapshot.remove_vertices(&flagged);
    report.removed_vertices = vertices;
    report.removed_triangles = triangles;
    if !report.shapes.is_empty() {
        log::info!(
            "{}: stripped {:?}, {} vertices and {} triangles removed",
            snapshot.name,
            report.shapes,
            vertices,
            triangles
        );
    }
    report
}

/// Bake the named shapes at their current weight and drop them.
///
/// Each vertex gains `last_frame_delta * weight / 100`; normals and tangent
/// directions gain their deltas the same way. No vertex is removed.
pub fn bake_static(snapshot: &mut MeshSnapshot, names: &[String]) -> BakeReport {
    let mut report = BakeReport::default();
    let shapes = std::mem::take(&mut snapshot.blend_shapes);
    for shape in shapes {
        if !names.contains(&shape.name) {
            snapshot.blend_shapes.push(shape);
            continue;
        }
        let factor = shape.weight / 100.0;
        match shape.last_frame() {
            Some(frame) if factor != 0.0 => {
                for (v, d) in snapshot.vertices.iter_mut().zip(&frame.delta_vertices) {
                    *v += d * factor;
                }
                for (n, d) in snapshot.normals.iter_mut().zip(&frame.delta_normals) {
                    *n += d * factor;
                }
                for (t, d) in snapshot.tangents.iter_mut().zip(&frame.delta_tangents) {
                    t.x += d.x * factor;
                    t.y += d.y * factor;
                    t.z += d.z * factor;
                }
                report.baked.push(shape.name);
            }
            _ => report.dropped.push(shape.name),
        }
    }
    if !report.baked.is_empty() || !report.dropped.is_empty() {
        log::info!(
            "{}: baked {:?}, dropped {:?}",
            snapshot.name,
            report.baked,
            report.dropped
        );
    }
    report
}
