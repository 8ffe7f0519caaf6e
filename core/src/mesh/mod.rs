//! Skinned mesh types and generators.
//!
//! This module provides:
//!
//! - [`SkinnedMesh`] - Index-based skinned mesh with optional channels
//! - [`BlendShape`] - Named morph target with weighted frames
//! - [`recalculate`] - Normal and tangent reconstruction
//! - Generators for common shapes (sphere, quad, skinned grid)

mod data;
pub mod generators;
pub mod recalculate;

pub use data::{BlendShape, BlendShapeFrame, BoneWeight, MAX_UV_CHANNELS, SkinnedMesh};
