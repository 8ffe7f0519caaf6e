//! [`MeshSnapshot`] back into an avatar.

use skinweld_core::avatar::{Avatar, AvatarError};
use skinweld_core::math::Mat4;
use skinweld_core::mesh::{BlendShape, BoneWeight, SkinnedMesh};
use skinweld_core::registry::{MeshId, NodeId, RendererId};

use super::{MeshSnapshot, DEFAULT_COLOR, DEFAULT_UV};
use crate::error::SnapshotResult;

use super::extract::scene_bind_pose;

/// Result of writing a snapshot back.
#[derive(Debug, Clone, PartialEq)]
pub struct WrittenMesh {
    /// Newly created mesh asset.
    pub mesh: MeshId,
    /// Bone list assigned to the renderer.
    pub bones: Vec<NodeId>,
    /// UV channels written (unused ones are omitted).
    pub uv_channels: usize,
    /// Whether vertex colors were written.
    pub has_colors: bool,
    /// Bones whose bind pose fell back to identity.
    pub identity_bind_poses: usize,
    /// Weighted influences dropped because their bone is unresolved.
    pub unresolved_influences: usize,
}

/// Write `snapshot` into a new generated mesh and point renderer `id` at it.
///
/// Bone weights are resolved to indices here: the bone list is the
/// snapshot's bone order followed by any other weighted bone in first-seen
/// order. Influences on missing bones get index 0 and weight 0. UV channels
/// holding only default UVs and colors that are all default are omitted.
pub fn write_back(
    snapshot: MeshSnapshot,
    avatar: &mut Avatar,
    id: RendererId,
    mesh_name: &str,
) -> SnapshotResult<WrittenMesh> {
    snapshot.check_invariants()?;
    let renderer = avatar
        .renderers
        .get(id)
        .ok_or(AvatarError::MissingRenderer(id))?;
    let old_mesh = renderer.mesh;

    let mut bones = snapshot.bones.clone();
    for weight in &snapshot.weights {
        for bone in weight.bones.iter().flatten() {
            if !bones.contains(bone) {
                bones.push(*bone);
            }
        }
    }

    let mut bind_poses = Vec::with_capacity(bones.len());
    let mut identity_bind_poses = 0;
    for bone in &bones {
        let pose = match snapshot.bind_poses.get(bone) {
            Some(pose) => *pose,
            None => match scene_bind_pose(avatar, *bone, &snapshot.local_to_world) {
                Ok(pose) => pose,
                Err(e) => {
                    log::warn!("{mesh_name} ({id}): identity bind pose for {bone}: {e}");
                    identity_bind_poses += 1;
                    Mat4::identity()
                }
            },
        };
        bind_poses.push(pose);
    }

    let mut unresolved_influences = 0;
    let bone_weights = snapshot
        .weights
        .iter()
        .map(|w| {
            let mut out = BoneWeight::default();
            for slot in 0..4 {
                match w.bones[slot].and_then(|b| bones.iter().position(|x| *x == b)) {
                    Some(index) => {
                        out.indices[slot] = index as u32;
                        out.weights[slot] = w.weights[slot];
                    }
                    None => {
                        if w.weights[slot] > 0.0 {
                            unresolved_influences += 1;
                        }
                        out.indices[slot] = 0;
                        out.weights[slot] = 0.0;
                    }
                }
            }
            out
        })
        .collect();
    if unresolved_influences > 0 {
        log::warn!(
            "{mesh_name} ({id}): dropped {unresolved_influences} weighted influences on unresolved bones"
        );
    }

    let mut mesh = SkinnedMesh::new(mesh_name);
    mesh.generated = true;

    let mut uv_channels = 0;
    for (channel, uvs) in snapshot.uv_channels.into_iter().enumerate() {
        if uvs.iter().any(|uv| *uv != DEFAULT_UV) {
            mesh.set_uvs(channel, uvs);
            uv_channels += 1;
        } else {
            log::debug!("UV channel #{} is unused in {mesh_name}", channel + 1);
        }
    }
    let has_colors = snapshot.colors.iter().any(|c| *c != DEFAULT_COLOR);
    if has_colors {
        mesh.colors = snapshot.colors;
    }

    let mut materials = Vec::with_capacity(snapshot.sub_meshes.len());
    for (key, triangles) in snapshot.sub_meshes.into_entries() {
        materials.push(key.material());
        mesh.sub_meshes.push(triangles);
    }

    let weights: Vec<f32> = snapshot.blend_shapes.iter().map(|s| s.weight).collect();
    mesh.blend_shapes = snapshot
        .blend_shapes
        .into_iter()
        .map(|s| BlendShape::new(s.name, s.frames))
        .collect();

    mesh.vertices = snapshot.vertices;
    mesh.normals = snapshot.normals;
    mesh.tangents = snapshot.tangents;
    mesh.bone_weights = bone_weights;
    mesh.bind_poses = bind_poses;

    log::info!(
        "Wrote mesh {mesh_name}: {} vertices, {} triangles, {} bones",
        mesh.vertex_count(),
        mesh.triangle_count(),
        bones.len()
    );

    let mesh_id = avatar.meshes.insert(mesh);
    if let Some(renderer) = avatar.renderers.get_mut(id) {
        renderer.mesh = mesh_id;
        renderer.materials = materials;
        renderer.bones = bones.iter().copied().map(Some).collect();
        renderer.blend_shape_weights = weights;
        renderer.local_bounds = snapshot.bounds;
    }
    prune_generated_mesh(avatar, old_mesh);

    Ok(WrittenMesh {
        mesh: mesh_id,
        bones,
        uv_channels,
        has_colors,
        identity_bind_poses,
        unresolved_influences,
    })
}

/// Drop a generated mesh no renderer uses any more.
fn prune_generated_mesh(avatar: &mut Avatar, mesh: MeshId) {
    let generated = avatar.meshes.get(mesh).is_some_and(|m| m.generated);
    let in_use = avatar.renderers.iter().any(|(_, r)| r.mesh == mesh);
    if generated && !in_use {
        avatar.meshes.remove(mesh);
        log::debug!("Dropped superseded generated {mesh}");
    }
}
