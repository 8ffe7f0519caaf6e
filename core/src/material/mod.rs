//! Material assets referenced by renderer slots.
//!
//! Merging only cares about material identity, so a [`Material`] carries
//! just enough to be written out and told apart in diagnostics.

use serde::{Deserialize, Serialize};

/// A material asset.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Material {
    /// Asset name.
    pub name: String,
    /// Shader the material renders with.
    #[serde(default)]
    pub shader: String,
    /// Base color factor (linear RGBA).
    #[serde(default = "default_color")]
    pub base_color: [f32; 4],
}

fn default_color() -> [f32; 4] {
    [1.0, 1.0, 1.0, 1.0]
}

impl Material {
    /// Create a white material with no shader.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            shader: String::new(),
            base_color: default_color(),
        }
    }

    /// Set the shader name.
    #[must_use]
    pub fn with_shader(mut self, shader: impl Into<String>) -> Self {
        self.shader = shader.into();
        self
    }

    /// Set the base color.
    #[must_use]
    pub fn with_base_color(mut self, color: [f32; 4]) -> Self {
        self.base_color = color;
        self
    }
}
