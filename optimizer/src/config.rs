//! Optimizer configuration loaded from `skinweld.toml`.
//!
//! Every field has a default, so an empty file (or no file at all) enables
//! all passes with cleanup of generated assets.
//!
//! ```toml
//! [optimizer]
//! enabled = true
//! cleanup = false
//!
//! [merge]
//! frame_policy = "strict"
//!
//! [blendshapes]
//! marker_prefix = "hide_"
//! ```

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;
use crate::merge::FramePolicyKind;

/// Top-level configuration.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct OptimizerConfig {
    pub optimizer: GlobalSection,
    pub merge: MergeSection,
    pub blendshapes: BlendShapeSection,
    pub assets: AssetSection,
}

/// Global toggles.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GlobalSection {
    /// Run any optimisation at all.
    pub enabled: bool,
    /// Clear the generated-assets area after a run. When disabled a debug
    /// copy of the optimised avatar is written as well.
    pub cleanup: bool,
}

impl Default for GlobalSection {
    fn default() -> Self {
        Self {
            enabled: true,
            cleanup: true,
        }
    }
}

/// Mesh merge settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MergeSection {
    pub enabled: bool,
    /// Carry blend shapes into merged meshes.
    pub copy_blendshapes: bool,
    /// How blend shapes with different frame counts are reconciled.
    pub frame_policy: FramePolicyKind,
}

impl Default for MergeSection {
    fn default() -> Self {
        Self {
            enabled: true,
            copy_blendshapes: true,
            frame_policy: FramePolicyKind::ClampToLast,
        }
    }
}

/// Blend shape pass settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BlendShapeSection {
    /// Strip geometry hidden by marked blend shapes.
    pub remove_marked: bool,
    /// Bake or drop blend shapes nothing drives.
    pub remove_unused: bool,
    /// Name prefix marking geometry-hiding blend shapes.
    pub marker_prefix: String,
}

impl Default for BlendShapeSection {
    fn default() -> Self {
        Self {
            remove_marked: true,
            remove_unused: true,
            marker_prefix: "remove_".into(),
        }
    }
}

/// Generated-asset settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AssetSection {
    /// Directory generated meshes, clips and controllers are written to.
    pub generated_dir: PathBuf,
}

impl Default for AssetSection {
    fn default() -> Self {
        Self {
            generated_dir: PathBuf::from("skinweld-generated"),
        }
    }
}

impl OptimizerConfig {
    /// Parse a configuration from TOML text.
    pub fn from_toml_str(content: &str, path: &Path) -> Result<Self, ConfigError> {
        toml::from_str(content).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Load a configuration file.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml_str(&content, path)
    }

    /// Load a configuration file, falling back to defaults if it is missing
    /// or invalid.
    pub fn load_or_default(path: &Path) -> Self {
        match Self::load(path) {
            Ok(config) => {
                log::info!("Loaded optimizer config from {}", path.display());
                config
            }
            Err(e) => {
                log::warn!("No usable config ({e}), using defaults");
                Self::default()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_file_gives_defaults() {
        let config = OptimizerConfig::from_toml_str("", Path::new("skinweld.toml")).unwrap();
        assert_eq!(config, OptimizerConfig::default());
        assert!(config.optimizer.enabled);
        assert!(config.optimizer.cleanup);
        assert_eq!(config.blendshapes.marker_prefix, "remove_");
        assert_eq!(config.merge.frame_policy, FramePolicyKind::ClampToLast);
    }

    #[test]
    fn partial_sections_override_fields() {
        let text = r#"
            [optimizer]
            cleanup = false

            [merge]
            frame_policy = "strict"
            copy_blendshapes = false

            [blendshapes]
            marker_prefix = "hide_"

            [assets]
            generated_dir = "out/gen"
        "#;
        let config = OptimizerConfig::from_toml_str(text, Path::new("skinweld.toml")).unwrap();
        assert!(config.optimizer.enabled);
        assert!(!config.optimizer.cleanup);
        assert_eq!(config.merge.frame_policy, FramePolicyKind::Strict);
        assert!(!config.merge.copy_blendshapes);
        assert!(config.merge.enabled);
        assert_eq!(config.blendshapes.marker_prefix, "hide_");
        assert!(config.blendshapes.remove_unused);
        assert_eq!(config.assets.generated_dir, PathBuf::from("out/gen"));
    }

    #[test]
    fn unknown_policy_is_an_error() {
        let text = "[merge]\nframe_policy = \"average\"\n";
        let err = OptimizerConfig::from_toml_str(text, Path::new("bad.toml")).unwrap_err();
        assert!(matches!(err, ConfigError::Parse { .. }));
        assert!(err.to_string().contains("bad.toml"));
    }

    #[test]
    fn missing_file_falls_back_to_defaults() {
        let config = OptimizerConfig::load_or_default(Path::new("/nonexistent/skinweld.toml"));
        assert_eq!(config, OptimizerConfig::default());
    }
}
