//! # skinweld core
//!
//! In-memory model of a skinned character avatar: node hierarchy, skinned
//! meshes, materials, animation clips and controllers. The optimizer crate
//! reads and rewrites this model; nothing here knows about merging.

pub mod animation;
pub mod avatar;
pub mod material;
pub mod math;
pub mod mesh;
pub mod registry;
pub mod scene;

/// Core library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Log the library version once at start-up.
pub fn init() {
    log::info!("skinweld core v{} initialized", VERSION);
}
