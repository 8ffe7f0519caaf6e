//! Renderer and mesh to [`MeshSnapshot`].

use std::collections::{BTreeMap, BTreeSet};

use skinweld_core::avatar::{Avatar, AvatarError, SkinnedRenderer};
use skinweld_core::math::{Bounds, Mat4, Vec3};
use skinweld_core::mesh::{recalculate, BlendShapeFrame, SkinnedMesh, MAX_UV_CHANNELS};
use skinweld_core::registry::{MaterialId, NodeId, RendererId};

use super::{
    BoneWeight4, MaterialKey, MeshSnapshot, SnapshotBlendShape, SubMeshes, DEFAULT_COLOR,
    DEFAULT_UV,
};
use crate::error::{SnapshotError, SnapshotResult};

/// How submesh slots are keyed.
#[derive(Debug, Clone, Copy)]
pub enum SlotKeying<'a> {
    /// Slots sharing a material are concatenated, except the listed slots,
    /// whose material is swapped by animation.
    ByMaterial { swapped: &'a BTreeSet<usize> },
    /// Every slot stays its own submesh.
    PerSlot,
}

impl SlotKeying<'_> {
    /// Key of slot `slot` of `renderer`.
    pub fn key(&self, renderer: RendererId, slot: usize, material: MaterialId) -> MaterialKey {
        match self {
            Self::ByMaterial { swapped } if !swapped.contains(&slot) => {
                MaterialKey::Material(material)
            }
            _ => MaterialKey::Slot {
                material,
                renderer,
                slot,
            },
        }
    }
}

/// Capture renderer `id` as a self-contained snapshot.
///
/// Missing normals and tangents are recalculated, missing colors, UVs and
/// weights padded with defaults. Data that cannot be made consistent fails
/// with a [`SnapshotError`].
pub fn extract(avatar: &Avatar, id: RendererId, keying: SlotKeying<'_>) -> SnapshotResult<MeshSnapshot> {
    avatar.validate_renderer(id)?;
    let (renderer, mesh) = avatar.renderer_and_mesh(id)?;
    let n = mesh.vertex_count();

    check_channel_lengths(mesh)?;

    let local_to_world = avatar
        .nodes
        .local_to_world(renderer.node)
        .ok_or(AvatarError::MissingNode(renderer.node))?;
    let world_to_local = local_to_world
        .try_inverse()
        .ok_or(SnapshotError::SingularTransform(renderer.node))?;

    let normals = if mesh.normals.len() < n {
        log::debug!("{}: recalculating normals", mesh.name);
        recalculate::compute_normals(&mesh.vertices, mesh.sub_meshes.iter())
    } else {
        mesh.normals.clone()
    };
    let tangents = if mesh.tangents.len() < n {
        log::debug!("{}: recalculating tangents", mesh.name);
        recalculate::compute_tangents(
            &mesh.vertices,
            &normals,
            mesh.uv_channel(0),
            mesh.sub_meshes.iter(),
        )
    } else {
        mesh.tangents.clone()
    };

    let mut colors = mesh.colors.clone();
    colors.resize(n, DEFAULT_COLOR);

    let uv_channels = std::array::from_fn(|channel| {
        let mut uvs = mesh.uv_channel(channel).to_vec();
        uvs.resize(n, DEFAULT_UV);
        uvs
    });

    let sub_meshes = extract_sub_meshes(id, renderer, mesh, keying)?;

    let default_bone = renderer.effective_root_bone();
    let mut weights = Vec::with_capacity(n);
    for (vertex, weight) in mesh.bone_weights.iter().enumerate() {
        let mut bones = [None; 4];
        for (slot, &index) in weight.indices.iter().enumerate() {
            let entry = renderer
                .bones
                .get(index as usize)
                .ok_or(SnapshotError::BoneIndexOutOfRange {
                    vertex,
                    index,
                    bone_count: renderer.bones.len(),
                })?;
            bones[slot] = *entry;
        }
        weights.push(BoneWeight4 {
            bones,
            weights: weight.weights,
        });
    }
    let padded = n - weights.len();
    weights.resize(n, BoneWeight4::single(default_bone));

    let mut bones = Vec::new();
    let mut bind_poses = BTreeMap::new();
    for (index, bone) in renderer.bones.iter().enumerate() {
        let Some(bone) = *bone else { continue };
        if bind_poses.contains_key(&bone) {
            continue;
        }
        let pose = match mesh.bind_poses.get(index) {
            Some(pose) => *pose,
            None => scene_bind_pose(avatar, bone, &local_to_world)?,
        };
        bind_poses.insert(bone, pose);
        bones.push(bone);
    }
    if padded > 0 && !bind_poses.contains_key(&default_bone) {
        bind_poses.insert(default_bone, scene_bind_pose(avatar, default_bone, &local_to_world)?);
    }

    let blend_shapes = mesh
        .blend_shapes
        .iter()
        .enumerate()
        .map(|(index, shape)| {
            if shape.frames.is_empty() {
                return Err(SnapshotError::EmptyBlendShape(shape.name.clone()));
            }
            let frames = shape
                .frames
                .iter()
                .enumerate()
                .map(|(frame, data)| padded_frame(&shape.name, frame, data, n))
                .collect::<SnapshotResult<Vec<_>>>()?;
            Ok(SnapshotBlendShape {
                name: shape.name.clone(),
                frames,
                weight: renderer.blend_shape_weight(index),
            })
        })
        .collect::<SnapshotResult<Vec<_>>>()?;

    let bounds = if renderer.local_bounds == Bounds::default() {
        mesh.compute_bounds().unwrap_or_default()
    } else {
        renderer.local_bounds
    };

    let snapshot = MeshSnapshot {
        name: avatar.renderer_name(id).to_owned(),
        vertices: mesh.vertices.clone(),
        normals,
        tangents,
        colors,
        uv_channels,
        sub_meshes,
        weights,
        bones,
        bind_poses,
        blend_shapes,
        bounds,
        local_to_world,
        world_to_local,
    };
    snapshot.check_invariants()?;
    log::debug!(
        "Extracted {}: {} vertices, {} submeshes, {} blend shapes",
        snapshot.name,
        n,
        snapshot.sub_meshes.len(),
        snapshot.blend_shapes.len()
    );
    Ok(snapshot)
}

fn check_channel_lengths(mesh: &SkinnedMesh) -> SnapshotResult<()> {
    let n = mesh.vertex_count();
    let mut channels = vec![
        ("normals".to_string(), mesh.normals.len()),
        ("tangents".to_string(), mesh.tangents.len()),
        ("colors".to_string(), mesh.colors.len()),
        ("bone weights".to_string(), mesh.bone_weights.len()),
    ];
    channels.extend(
        mesh.uvs
            .iter()
            .take(MAX_UV_CHANNELS)
            .enumerate()
            .map(|(i, uvs)| (format!("uv{i}"), uvs.len())),
    );
    match channels.into_iter().find(|(_, len)| *len > n) {
        Some((channel, len)) => Err(SnapshotError::ChannelTooLong {
            channel,
            len,
            vertex_count: n,
        }),
        None => Ok(()),
    }
}

fn extract_sub_meshes(
    id: RendererId,
    renderer: &SkinnedRenderer,
    mesh: &SkinnedMesh,
    keying: SlotKeying<'_>,
) -> SnapshotResult<SubMeshes> {
    let n = mesh.vertex_count();
    if mesh.sub_meshes.len() > renderer.materials.len() {
        log::debug!(
            "{}: {} submeshes without a material are not rendered",
            mesh.name,
            mesh.sub_meshes.len() - renderer.materials.len()
        );
    }
    let mut sub_meshes = SubMeshes::default();
    for (slot, &material) in renderer.materials.iter().enumerate() {
        let triangles = mesh.sub_meshes.get(slot).map_or(&[][..], |t| t.as_slice());
        if let Some(&index) = triangles.iter().find(|&&i| i as usize >= n) {
            return Err(SnapshotError::TriangleOutOfRange {
                slot,
                index,
                vertex_count: n,
            });
        }
        let usable = triangles.len() - triangles.len() % 3;
        sub_meshes
            .entry(keying.key(id, slot, material))
            .extend_from_slice(&triangles[..usable]);
    }
    Ok(sub_meshes)
}

/// Bind pose of `bone` for a mesh drawn at `mesh_to_world`, from the scene.
pub(crate) fn scene_bind_pose(
    avatar: &Avatar,
    bone: NodeId,
    mesh_to_world: &Mat4,
) -> SnapshotResult<Mat4> {
    let world_to_bone = avatar
        .nodes
        .world_to_local(bone)
        .ok_or(SnapshotError::SingularTransform(bone))?;
    Ok(world_to_bone * mesh_to_world)
}

/// Copy a frame, padding absent normal and tangent deltas with zeros.
fn padded_frame(
    shape: &str,
    frame: usize,
    data: &BlendShapeFrame,
    n: usize,
) -> SnapshotResult<BlendShapeFrame> {
    let fit = |deltas: &[Vec3], optional: bool| -> SnapshotResult<Vec<Vec3>> {
        match deltas.len() {
            len if len == n => Ok(deltas.to_vec()),
            0 if optional => Ok(vec![Vec3::zeros(); n]),
            len => Err(SnapshotError::FrameLength {
                shape: shape.to_owned(),
                frame,
                len,
                vertex_count: n,
            }),
        }
    };
    Ok(BlendShapeFrame {
        weight: data.weight,
        delta_vertices: fit(&data.delta_vertices, false)?,
        delta_normals: fit(&data.delta_normals, true)?,
        delta_tangents: fit(&data.delta_tangents, true)?,
    })
}
