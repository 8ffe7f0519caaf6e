//! Animation clips and their curve bindings.

use serde::{Deserialize, Serialize};

use crate::registry::MaterialId;

use super::property;

/// Tangent weighting mode of a keyframe.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize, Deserialize)]
pub enum WeightedMode {
    /// Neither tangent is weighted.
    #[default]
    None,
    /// Only the incoming tangent is weighted.
    In,
    /// Only the outgoing tangent is weighted.
    Out,
    /// Both tangents are weighted.
    Both,
}

/// One key of a float curve.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Keyframe {
    /// Key time in seconds.
    pub time: f32,
    /// Key value.
    pub value: f32,
    /// Incoming tangent slope.
    #[serde(default)]
    pub in_tangent: f32,
    /// Outgoing tangent slope.
    #[serde(default)]
    pub out_tangent: f32,
    /// Incoming tangent weight.
    #[serde(default)]
    pub in_weight: f32,
    /// Outgoing tangent weight.
    #[serde(default)]
    pub out_weight: f32,
    /// Which tangents are weighted.
    #[serde(default)]
    pub weighted_mode: WeightedMode,
}

impl Keyframe {
    /// A flat key with default tangents.
    pub fn new(time: f32, value: f32) -> Self {
        Self {
            time,
            value,
            in_tangent: 0.0,
            out_tangent: 0.0,
            in_weight: 0.0,
            out_weight: 0.0,
            weighted_mode: WeightedMode::None,
        }
    }
}

/// One key of an object-reference curve.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ObjectKeyframe {
    /// Key time in seconds.
    pub time: f32,
    /// Referenced material, `None` clears the slot.
    pub value: Option<MaterialId>,
}

/// Curve data of a binding.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Curve {
    /// Float curve, either interpolated or discrete (stepped).
    Float {
        /// Keys in time order.
        keys: Vec<Keyframe>,
        /// Discrete curves step between keys.
        #[serde(default)]
        discrete: bool,
    },
    /// Object-reference curve.
    Object {
        /// Keys in time order.
        keys: Vec<ObjectKeyframe>,
    },
}

impl Curve {
    /// Interpolated float curve.
    pub fn float(keys: Vec<Keyframe>) -> Self {
        Self::Float {
            keys,
            discrete: false,
        }
    }

    /// Object-reference curve.
    pub fn object(keys: Vec<ObjectKeyframe>) -> Self {
        Self::Object { keys }
    }

    /// Number of keys.
    pub fn len(&self) -> usize {
        match self {
            Self::Float { keys, .. } => keys.len(),
            Self::Object { keys } => keys.len(),
        }
    }

    /// Returns `true` if the curve has no keys.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Kind of component a binding animates.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum TargetType {
    /// The node itself (active state and similar).
    GameObject,
    /// The node transform.
    Transform,
    /// A skinned renderer on the node.
    SkinnedRenderer,
    /// Any other component, named by type.
    Other(String),
}

/// A curve bound to a property of an object below the animator root.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CurveBinding {
    /// Transform path from the animator root, `/`-separated.
    pub path: String,
    /// Animated component type.
    pub target: TargetType,
    /// Animated property name.
    pub property: String,
    /// Curve data.
    pub curve: Curve,
}

impl CurveBinding {
    /// Create a binding.
    pub fn new(
        path: impl Into<String>,
        target: TargetType,
        property: impl Into<String>,
        curve: Curve,
    ) -> Self {
        Self {
            path: path.into(),
            target,
            property: property.into(),
            curve,
        }
    }

    /// Whether this binding animates a material (excluded from merge keys).
    pub fn is_material_curve(&self) -> bool {
        property::is_material_property(&self.property)
    }

    /// Material slot swapped by this binding, if it is a material-reference curve.
    pub fn material_slot(&self) -> Option<usize> {
        property::parse_material_slot(&self.property)
    }

    /// Blend shape driven by this binding, if any.
    pub fn blend_shape(&self) -> Option<&str> {
        match self.target {
            TargetType::SkinnedRenderer => property::blend_shape_name(&self.property),
            _ => None,
        }
    }

    /// Whether `other` binds the same (path, target, property) triple.
    pub fn same_target(&self, other: &CurveBinding) -> bool {
        self.path == other.path && self.target == other.target && self.property == other.property
    }
}

/// An animation clip.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnimationClip {
    /// Asset name.
    pub name: String,
    /// Curve bindings in authoring order.
    pub bindings: Vec<CurveBinding>,
    /// Set on clips produced by optimisation passes.
    #[serde(default)]
    pub generated: bool,
}

impl AnimationClip {
    /// Create an empty clip.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            bindings: Vec::new(),
            generated: false,
        }
    }

    /// Append a binding.
    #[must_use]
    pub fn with_binding(mut self, binding: CurveBinding) -> Self {
        self.bindings.push(binding);
        self
    }

    /// Add a binding unless one with the same (path, target, property)
    /// already exists. Returns `true` if it was added.
    pub fn add_binding_unique(&mut self, binding: CurveBinding) -> bool {
        if self.bindings.iter().any(|b| b.same_target(&binding)) {
            return false;
        }
        self.bindings.push(binding);
        true
    }
}
