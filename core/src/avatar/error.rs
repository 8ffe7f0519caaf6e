//! Error types for avatar lookups.

use crate::registry::{MaterialId, MeshId, NodeId, RendererId};

/// A reference inside an avatar that does not resolve.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AvatarError {
    /// Renderer id not present.
    MissingRenderer(RendererId),
    /// Node id not present in the hierarchy.
    MissingNode(NodeId),
    /// Mesh id not present.
    MissingMesh(MeshId),
    /// Material id not present.
    MissingMaterial(MaterialId),
}

impl std::fmt::Display for AvatarError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::MissingRenderer(id) => write!(f, "dangling renderer reference {id}"),
            Self::MissingNode(id) => write!(f, "dangling node reference {id}"),
            Self::MissingMesh(id) => write!(f, "dangling mesh reference {id}"),
            Self::MissingMaterial(id) => write!(f, "dangling material reference {id}"),
        }
    }
}

impl std::error::Error for AvatarError {}
