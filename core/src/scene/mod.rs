//! Avatar node hierarchy.
//!
//! - [`NodeTree`] — arena-backed tree of [`Node`]s with one root
//! - [`NodeTransform`] — TRS transform using plain arrays
//!
//! Bones, renderer hosts and animator roots are all nodes; transform paths
//! used by animation bindings are resolved against this tree.

mod types;

pub use types::{Node, NodeTransform, NodeTree};
