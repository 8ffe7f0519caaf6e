//! Error types for the optimizer.
//!
//! Each concern has its own enum. Errors from snapshot extraction, merging
//! and key building are local: they fail one renderer or one merge group and
//! are reported through diagnostics, never aborting the run.

use std::path::PathBuf;

use skinweld_core::avatar::AvatarError;
use skinweld_core::registry::NodeId;
use thiserror::Error;

/// Snapshot extraction and write-back errors.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum SnapshotError {
    #[error("lookup failed: {0}")]
    Lookup(#[from] AvatarError),
    #[error("{channel} has {len} entries but the mesh has {vertex_count} vertices")]
    ChannelTooLong {
        channel: String,
        len: usize,
        vertex_count: usize,
    },
    #[error("vertex {vertex} uses bone index {index} but the bone list has {bone_count} entries")]
    BoneIndexOutOfRange {
        vertex: usize,
        index: u32,
        bone_count: usize,
    },
    #[error("submesh {slot} references vertex {index} but the mesh has {vertex_count} vertices")]
    TriangleOutOfRange {
        slot: usize,
        index: u32,
        vertex_count: usize,
    },
    #[error("blend shape {shape} frame {frame} has {len} deltas for {vertex_count} vertices")]
    FrameLength {
        shape: String,
        frame: usize,
        len: usize,
        vertex_count: usize,
    },
    #[error("blend shape {0} has no frames")]
    EmptyBlendShape(String),
    #[error("world transform of {0} is not invertible")]
    SingularTransform(NodeId),
    #[error("per-vertex arrays out of step: {0}")]
    Inconsistent(String),
}

pub type SnapshotResult<T> = Result<T, SnapshotError>;

/// Merge engine errors.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum MergeError {
    #[error("cannot merge an empty group")]
    EmptyGroup,
    #[error("blend shape {shape} has {base} frames in the base but {other} in the merged mesh")]
    FrameCountMismatch {
        shape: String,
        base: usize,
        other: usize,
    },
    #[error("data integrity: {0}")]
    Integrity(#[from] SnapshotError),
}

pub type MergeResult<T> = Result<T, MergeError>;

/// Reasons a renderer is excluded from grouping.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum KeyError {
    #[error("lookup failed: {0}")]
    Lookup(#[from] AvatarError),
    #[error("root bone {0} is not inside the avatar")]
    RootBoneOutsideAvatar(NodeId),
    #[error("root bone {0} is the avatar root, which has no skeleton above it")]
    RootBoneIsAvatarRoot(NodeId),
    #[error("bone {bone} lies outside skeleton root {skeleton}")]
    BoneOutsideSkeleton { bone: NodeId, skeleton: NodeId },
    #[error("binding {property} animates unsupported component {component}")]
    UnsupportedComponent { component: String, property: String },
}

/// Configuration loading errors.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("failed to parse {path}: {source}")]
    Parse {
        path: PathBuf,
        source: toml::de::Error,
    },
}

/// Generated-asset store errors.
#[derive(Error, Debug)]
pub enum AssetError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("failed to encode {name}: {message}")]
    Encode { name: String, message: String },
    #[error("failed to decode {name}: {message}")]
    Decode { name: String, message: String },
}

pub type AssetResult<T> = Result<T, AssetError>;

/// Errors that abort a whole optimisation run.
#[derive(Error, Debug)]
pub enum OptimizeError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error(transparent)]
    Asset(#[from] AssetError),
}

pub type OptimizeResult<T> = Result<T, OptimizeError>;
