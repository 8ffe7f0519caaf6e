//! # skinweld optimizer
//!
//! Offline consolidation of an avatar's skinned meshes. Renderers that draw
//! the same way and are animated the same way are merged into one, blend
//! shapes that hide geometry or that nothing drives are removed, and every
//! animation clip and controller touching a merged renderer is rewritten to
//! point at the survivor.
//!
//! ## Overview
//!
//! - [`key`] - Equivalence keys deciding which renderers may merge
//! - [`snapshot`] - Engine-independent mesh snapshots and write-back
//! - [`merge`] - The merge engine and blend shape frame policies
//! - [`blendshape`] - Stripping and baking of blend shapes
//! - [`retarget`] - Clip and controller retargeting
//! - [`stages`] - The optimisation passes
//! - [`pipeline`] - The driver running passes in order
//! - [`assets`] - Storage for generated meshes, clips and controllers
//!
//! ## Example
//!
//! ```ignore
//! use skinweld_optimizer::{OptimizerConfig, Pipeline, RunMode};
//!
//! let config = OptimizerConfig::load_or_default("skinweld.toml".as_ref());
//! let (avatar, diagnostics) = Pipeline::from_config(&config).run(avatar, RunMode::Apply)?;
//! println!("{diagnostics}");
//! ```

pub mod assets;
pub mod blendshape;
pub mod config;
pub mod diagnostics;
pub mod error;
pub mod key;
pub mod merge;
pub mod pipeline;
pub mod retarget;
pub mod snapshot;
pub mod stages;

pub use assets::{AssetStore, DirectoryAssetStore, MemoryAssetStore};
pub use config::OptimizerConfig;
pub use diagnostics::{Diagnostics, Finding};
pub use error::{OptimizeError, OptimizeResult};
pub use merge::{FramePolicy, FramePolicyKind};
pub use pipeline::Pipeline;
pub use stages::{RunMode, Stage};

/// Optimizer library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Log the library version once at start-up.
pub fn init() {
    log::info!("skinweld optimizer v{} initialized", VERSION);
}
