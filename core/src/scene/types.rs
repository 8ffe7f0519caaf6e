//! Node hierarchy types.
//!
//! Transforms use plain arrays (`[f32; 3]`, `[f32; 4]`) so they serialize
//! compactly; convert with the helpers in [`crate::math`] when computing.

use serde::{Deserialize, Serialize};

use crate::math::{self, Mat4, Vec3};
use crate::registry::{NodeId, Registry};

/// Node transform decomposed into translation, rotation, and scale.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct NodeTransform {
    /// Translation [x, y, z].
    pub translation: [f32; 3],
    /// Rotation quaternion [x, y, z, w].
    pub rotation: [f32; 4],
    /// Scale [x, y, z].
    pub scale: [f32; 3],
}

impl NodeTransform {
    /// Identity transform: no translation, identity rotation, unit scale.
    pub const IDENTITY: Self = Self {
        translation: [0.0, 0.0, 0.0],
        rotation: [0.0, 0.0, 0.0, 1.0],
        scale: [1.0, 1.0, 1.0],
    };

    /// Returns this transform with a different translation.
    #[must_use]
    pub const fn with_translation(mut self, translation: [f32; 3]) -> Self {
        self.translation = translation;
        self
    }

    /// Returns this transform with a different rotation.
    #[must_use]
    pub const fn with_rotation(mut self, rotation: [f32; 4]) -> Self {
        self.rotation = rotation;
        self
    }

    /// Returns this transform with a different scale.
    #[must_use]
    pub const fn with_scale(mut self, scale: [f32; 3]) -> Self {
        self.scale = scale;
        self
    }

    /// Local TRS matrix.
    pub fn matrix(&self) -> Mat4 {
        math::mat4_from_scale_rotation_translation(
            Vec3::from(self.scale),
            math::quat_from_array(self.rotation),
            Vec3::from(self.translation),
        )
    }
}

impl Default for NodeTransform {
    fn default() -> Self {
        Self::IDENTITY
    }
}

/// A node in the avatar hierarchy.
///
/// Bones, renderer hosts and plain grouping objects are all nodes.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Node {
    /// Node name. Used to build transform paths, so siblings should differ.
    pub name: String,
    /// Parent node, `None` for the hierarchy root.
    pub parent: Option<NodeId>,
    /// Child nodes in order.
    pub children: Vec<NodeId>,
    /// Local transform relative to the parent.
    pub transform: NodeTransform,
    /// Whether the node itself is active.
    pub active: bool,
    /// Number of components on the node besides its transform and renderer.
    #[serde(default)]
    pub extra_components: u32,
}

impl Node {
    /// Create an active node with an identity transform.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            parent: None,
            children: Vec::new(),
            transform: NodeTransform::IDENTITY,
            active: true,
            extra_components: 0,
        }
    }
}

/// Tree of [`Node`]s with a single root.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NodeTree {
    nodes: Registry<NodeId, Node>,
    root: NodeId,
}

impl NodeTree {
    /// Create a tree containing only a root node.
    pub fn new(root_name: impl Into<String>) -> Self {
        let mut nodes = Registry::new();
        let root = nodes.insert(Node::new(root_name));
        Self { nodes, root }
    }

    /// The root node.
    pub fn root(&self) -> NodeId {
        self.root
    }

    /// Get a node by id.
    pub fn get(&self, id: NodeId) -> Option<&Node> {
        self.nodes.get(id)
    }

    /// Get a mutable node by id.
    pub fn get_mut(&mut self, id: NodeId) -> Option<&mut Node> {
        self.nodes.get_mut(id)
    }

    /// Returns `true` if the node exists.
    pub fn contains(&self, id: NodeId) -> bool {
        self.nodes.contains(id)
    }

    /// Number of nodes, root included.
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// Returns `true` if the tree holds no nodes. A well-formed tree always has a root.
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Iterate all nodes in creation order.
    pub fn iter(&self) -> impl Iterator<Item = (NodeId, &Node)> + '_ {
        self.nodes.iter()
    }

    /// Name of a node, or `"<missing>"`.
    pub fn name(&self, id: NodeId) -> &str {
        self.nodes.get(id).map_or("<missing>", |n| n.name.as_str())
    }

    /// Add a child node and return its id. Returns `None` if `parent` does not exist.
    pub fn add_child(
        &mut self,
        parent: NodeId,
        name: impl Into<String>,
        transform: NodeTransform,
    ) -> Option<NodeId> {
        if !self.nodes.contains(parent) {
            return None;
        }
        let mut node = Node::new(name);
        node.parent = Some(parent);
        node.transform = transform;
        let id = self.nodes.insert(node);
        if let Some(parent) = self.nodes.get_mut(parent) {
            parent.children.push(id);
        }
        Some(id)
    }

    /// Find a direct child by name.
    pub fn find_child(&self, parent: NodeId, name: &str) -> Option<NodeId> {
        self.nodes
            .get(parent)?
            .children
            .iter()
            .copied()
            .find(|c| self.nodes.get(*c).is_some_and(|n| n.name == name))
    }

    /// Resolve a `/`-separated transform path relative to `from`.
    ///
    /// The empty path resolves to `from` itself.
    pub fn find_by_path(&self, from: NodeId, path: &str) -> Option<NodeId> {
        if !self.nodes.contains(from) {
            return None;
        }
        if path.is_empty() {
            return Some(from);
        }
        path.split('/')
            .try_fold(from, |current, segment| self.find_child(current, segment))
    }

    /// Transform path of `node` relative to `ancestor`.
    ///
    /// Returns the empty string when they are the same node and `None` when
    /// `node` is not inside `ancestor`'s subtree.
    pub fn path_from(&self, ancestor: NodeId, node: NodeId) -> Option<String> {
        let mut segments = Vec::new();
        let mut current = node;
        while current != ancestor {
            let n = self.nodes.get(current)?;
            segments.push(n.name.as_str());
            current = n.parent?;
        }
        segments.reverse();
        Some(segments.join("/"))
    }

    /// Returns `true` if `node` is `ancestor` or lies in its subtree.
    pub fn is_descendant_of(&self, node: NodeId, ancestor: NodeId) -> bool {
        let mut current = Some(node);
        while let Some(id) = current {
            if id == ancestor {
                return true;
            }
            current = self.nodes.get(id).and_then(|n| n.parent);
        }
        false
    }

    /// The child of the root whose subtree contains `node`.
    ///
    /// Returns `None` for the root itself or for nodes not attached to the root.
    pub fn top_level_ancestor(&self, node: NodeId) -> Option<NodeId> {
        let mut current = node;
        loop {
            let parent = self.nodes.get(current)?.parent?;
            if parent == self.root {
                return Some(current);
            }
            current = parent;
        }
    }

    /// All nodes of the subtree rooted at `id`, depth-first, `id` first.
    pub fn subtree(&self, id: NodeId) -> Vec<NodeId> {
        let mut out = Vec::new();
        let mut stack = vec![id];
        while let Some(current) = stack.pop() {
            if let Some(node) = self.nodes.get(current) {
                out.push(current);
                stack.extend(node.children.iter().rev().copied());
            }
        }
        out
    }

    /// Whether the node and all of its ancestors are active.
    pub fn is_active_in_hierarchy(&self, id: NodeId) -> bool {
        let mut current = Some(id);
        while let Some(node_id) = current {
            match self.nodes.get(node_id) {
                Some(node) if node.active => current = node.parent,
                _ => return false,
            }
        }
        true
    }

    /// Matrix mapping the node's local space to world space.
    pub fn local_to_world(&self, id: NodeId) -> Option<Mat4> {
        let node = self.nodes.get(id)?;
        let local = node.transform.matrix();
        match node.parent {
            Some(parent) => Some(self.local_to_world(parent)? * local),
            None => Some(local),
        }
    }

    /// Matrix mapping world space to the node's local space.
    ///
    /// `None` if the node is missing or its world matrix is singular.
    pub fn world_to_local(&self, id: NodeId) -> Option<Mat4> {
        self.local_to_world(id)?.try_inverse()
    }

    /// Remove a childless node. Returns `false` if it has children, is the
    /// root, or does not exist.
    pub fn remove_leaf(&mut self, id: NodeId) -> bool {
        if id == self.root {
            return false;
        }
        let Some(node) = self.nodes.get(id) else {
            return false;
        };
        if !node.children.is_empty() {
            return false;
        }
        let parent = node.parent;
        self.nodes.remove(id);
        if let Some(parent) = parent.and_then(|p| self.nodes.get_mut(p)) {
            parent.children.retain(|c| *c != id);
        }
        true
    }
}
