//! Typed identifiers and the [`Registry`] container that owns resources.
//!
//! Every resource in an [`Avatar`](crate::avatar::Avatar) is addressed by a
//! small copyable id. Ids are never reused within a registry, so an id held
//! after the resource was removed resolves to `None` instead of aliasing a
//! newer resource. Iteration follows insertion order.

use std::collections::BTreeMap;
use std::fmt;
use std::hash::Hash;
use std::marker::PhantomData;

use serde::{Deserialize, Serialize};

/// Common behaviour of typed resource ids.
pub trait ResourceId: Copy + Eq + Ord + Hash + fmt::Debug {
    /// Build an id from its raw value.
    fn from_raw(raw: u32) -> Self;
    /// Raw value of the id.
    fn raw(self) -> u32;
}

macro_rules! define_id {
    ($(#[$meta:meta])* $name:ident, $prefix:literal) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(pub u32);

        impl ResourceId for $name {
            fn from_raw(raw: u32) -> Self {
                Self(raw)
            }

            fn raw(self) -> u32 {
                self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, concat!($prefix, "#{}"), self.0)
            }
        }
    };
}

define_id!(
    /// Identity of a node in the avatar hierarchy. Bones are nodes.
    NodeId,
    "node"
);
define_id!(
    /// Identity of a skinned renderer.
    RendererId,
    "renderer"
);
define_id!(
    /// Identity of a skinned mesh asset.
    MeshId,
    "mesh"
);
define_id!(
    /// Identity of a material asset.
    MaterialId,
    "material"
);
define_id!(
    /// Identity of an animation clip asset.
    ClipId,
    "clip"
);
define_id!(
    /// Identity of an animator controller asset.
    ControllerId,
    "controller"
);

/// Insertion-ordered storage of resources addressed by typed ids.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(bound(serialize = "T: Serialize", deserialize = "T: Deserialize<'de>"))]
pub struct Registry<I, T> {
    entries: BTreeMap<u32, T>,
    next: u32,
    #[serde(skip)]
    marker: PhantomData<I>,
}

impl<I: ResourceId, T> Registry<I, T> {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self {
            entries: BTreeMap::new(),
            next: 0,
            marker: PhantomData,
        }
    }

    /// Insert a resource and return its freshly allocated id.
    pub fn insert(&mut self, value: T) -> I {
        let raw = self.next;
        self.next += 1;
        self.entries.insert(raw, value);
        I::from_raw(raw)
    }

    /// Get a resource by id.
    pub fn get(&self, id: I) -> Option<&T> {
        self.entries.get(&id.raw())
    }

    /// Get a mutable resource by id.
    pub fn get_mut(&mut self, id: I) -> Option<&mut T> {
        self.entries.get_mut(&id.raw())
    }

    /// Remove a resource. The id is never handed out again.
    pub fn remove(&mut self, id: I) -> Option<T> {
        self.entries.remove(&id.raw())
    }

    /// Returns `true` if the id resolves to a live resource.
    pub fn contains(&self, id: I) -> bool {
        self.entries.contains_key(&id.raw())
    }

    /// Number of live resources.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns `true` if no resources are stored.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Iterate `(id, resource)` pairs in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = (I, &T)> + '_ {
        self.entries.iter().map(|(raw, v)| (I::from_raw(*raw), v))
    }

    /// Iterate `(id, resource)` pairs mutably in insertion order.
    pub fn iter_mut(&mut self) -> impl Iterator<Item = (I, &mut T)> + '_ {
        self.entries.iter_mut().map(|(raw, v)| (I::from_raw(*raw), v))
    }

    /// Collect all live ids in insertion order.
    pub fn ids(&self) -> Vec<I> {
        self.entries.keys().map(|raw| I::from_raw(*raw)).collect()
    }
}

impl<I: ResourceId, T> Default for Registry<I, T> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ids_follow_insertion_order() {
        let mut reg: Registry<MeshId, &str> = Registry::new();
        let a = reg.insert("a");
        let b = reg.insert("b");
        assert!(a < b);
        assert_eq!(reg.ids(), vec![a, b]);
        assert_eq!(reg.get(b), Some(&"b"));
    }

    #[test]
    fn removed_ids_are_not_reused() {
        let mut reg: Registry<ClipId, u32> = Registry::new();
        let a = reg.insert(1);
        assert_eq!(reg.remove(a), Some(1));
        let b = reg.insert(2);
        assert_ne!(a, b);
        assert!(reg.get(a).is_none());
        assert_eq!(reg.len(), 1);
    }

    #[test]
    fn id_display() {
        assert_eq!(NodeId(3).to_string(), "node#3");
        assert_eq!(RendererId(0).to_string(), "renderer#0");
    }
}
