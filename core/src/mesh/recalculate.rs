//! Normal and tangent reconstruction for meshes missing those channels.

use crate::math::{Vec2, Vec3, Vec4};

/// Area-weighted smooth normals over all triangle lists.
///
/// Vertices not referenced by any triangle get `+Y`.
pub fn compute_normals<'a>(
    vertices: &[Vec3],
    triangle_lists: impl Iterator<Item = &'a Vec<u32>>,
) -> Vec<Vec3> {
    let mut normals = vec![Vec3::zeros(); vertices.len()];
    for list in triangle_lists {
        for tri in list.chunks_exact(3) {
            let [a, b, c] = [tri[0] as usize, tri[1] as usize, tri[2] as usize];
            if a >= vertices.len() || b >= vertices.len() || c >= vertices.len() {
                continue;
            }
            let face = (vertices[b] - vertices[a]).cross(&(vertices[c] - vertices[a]));
            normals[a] += face;
            normals[b] += face;
            normals[c] += face;
        }
    }
    normals
        .into_iter()
        .map(|n| n.try_normalize(1e-12).unwrap_or_else(Vec3::y))
        .collect()
}

/// Per-vertex tangents from normals and UVs (Lengyel's method).
///
/// Missing UVs are treated as (0, 0); degenerate tangents fall back to an
/// axis perpendicular to the normal.
pub fn compute_tangents<'a>(
    vertices: &[Vec3],
    normals: &[Vec3],
    uvs: &[Vec2],
    triangle_lists: impl Iterator<Item = &'a Vec<u32>>,
) -> Vec<Vec4> {
    let n = vertices.len();
    let uv = |i: usize| uvs.get(i).copied().unwrap_or_else(Vec2::zeros);
    let mut tan = vec![Vec3::zeros(); n];
    let mut bitan = vec![Vec3::zeros(); n];

    for list in triangle_lists {
        for tri in list.chunks_exact(3) {
            let [a, b, c] = [tri[0] as usize, tri[1] as usize, tri[2] as usize];
            if a >= n || b >= n || c >= n {
                continue;
            }
            let e1 = vertices[b] - vertices[a];
            let e2 = vertices[c] - vertices[a];
            let d1 = uv(b) - uv(a);
            let d2 = uv(c) - uv(a);
            let det = d1.x * d2.y - d2.x * d1.y;
            if det.abs() < 1e-12 {
                continue;
            }
            let r = 1.0 / det;
            let t = (e1 * d2.y - e2 * d1.y) * r;
            let bt = (e2 * d1.x - e1 * d2.x) * r;
            for i in [a, b, c] {
                tan[i] += t;
                bitan[i] += bt;
            }
        }
    }

    (0..n)
        .map(|i| {
            let normal = normals.get(i).copied().unwrap_or_else(Vec3::y);
            // Gram-Schmidt
            let t = tan[i] - normal * normal.dot(&tan[i]);
            let t = t.try_normalize(1e-12).unwrap_or_else(|| fallback_tangent(&normal));
            let w = if normal.cross(&t).dot(&bitan[i]) < 0.0 {
                -1.0
            } else {
                1.0
            };
            Vec4::new(t.x, t.y, t.z, w)
        })
        .collect()
}

fn fallback_tangent(normal: &Vec3) -> Vec3 {
    let axis = if normal.x.abs() < 0.9 {
        Vec3::x()
    } else {
        Vec3::z()
    };
    (axis - normal * normal.dot(&axis))
        .try_normalize(1e-12)
        .unwrap_or_else(Vec3::x)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn flat_triangle_normals_point_up() {
        let vertices = vec![
            Vec3::new(0.0, 0.0, 0.0),
            Vec3::new(0.0, 0.0, 1.0),
            Vec3::new(1.0, 0.0, 0.0),
        ];
        let lists = vec![vec![0, 1, 2]];
        let normals = compute_normals(&vertices, lists.iter());
        for n in normals {
            assert!((n - Vec3::y()).norm() < 1e-6);
        }
    }

    #[test]
    fn unreferenced_vertex_gets_default_normal() {
        let vertices = vec![Vec3::zeros(); 2];
        let normals = compute_normals(&vertices, std::iter::empty());
        assert_eq!(normals, vec![Vec3::y(); 2]);
    }

    #[test]
    fn tangents_follow_u_direction() {
        let vertices = vec![
            Vec3::new(0.0, 0.0, 0.0),
            Vec3::new(1.0, 0.0, 0.0),
            Vec3::new(0.0, 1.0, 0.0),
        ];
        let normals = vec![Vec3::z(); 3];
        let uvs = vec![Vec2::new(0.0, 0.0), Vec2::new(1.0, 0.0), Vec2::new(0.0, 1.0)];
        let lists = vec![vec![0, 1, 2]];
        let tangents = compute_tangents(&vertices, &normals, &uvs, lists.iter());
        for t in tangents {
            assert!((t.xyz() - Vec3::x()).norm() < 1e-5);
            assert_eq!(t.w, 1.0);
        }
    }

    #[test]
    fn tangents_without_uvs_are_perpendicular() {
        let vertices = vec![Vec3::zeros(); 3];
        let normals = vec![Vec3::y(); 3];
        let tangents = compute_tangents(&vertices, &normals, &[], std::iter::empty());
        for t in tangents {
            assert!(t.xyz().dot(&Vec3::y()).abs() < 1e-6);
            assert!((t.xyz().norm() - 1.0).abs() < 1e-6);
        }
    }
}
