//! Generated-asset storage.
//!
//! Meshes, clips and controllers produced by a run are flushed to one
//! working area through an [`AssetStore`]. The area is disposable: it is
//! cleared after a run when cleanup is enabled.
//!
//! - [`MemoryAssetStore`] keeps assets in memory, for tests
//! - [`DirectoryAssetStore`] writes them below a directory on disk
//!
//! Assets are stored as pretty-printed RON.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use serde::de::DeserializeOwned;
use serde::Serialize;
use skinweld_core::avatar::Avatar;

use crate::error::{AssetError, AssetResult};

/// Destination for generated assets.
pub trait AssetStore {
    /// Store `data` under `name`, replacing any previous asset.
    fn write(&mut self, name: &str, data: &str) -> AssetResult<()>;

    /// Names of stored assets, sorted.
    fn list(&self) -> AssetResult<Vec<String>>;

    /// Delete every stored asset.
    fn clear(&mut self) -> AssetResult<()>;
}

/// In-memory asset store.
#[derive(Debug, Clone, Default)]
pub struct MemoryAssetStore {
    assets: BTreeMap<String, String>,
}

impl MemoryAssetStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Contents of a stored asset.
    pub fn get(&self, name: &str) -> Option<&str> {
        self.assets.get(name).map(String::as_str)
    }
}

impl AssetStore for MemoryAssetStore {
    fn write(&mut self, name: &str, data: &str) -> AssetResult<()> {
        self.assets.insert(name.to_owned(), data.to_owned());
        Ok(())
    }

    fn list(&self) -> AssetResult<Vec<String>> {
        Ok(self.assets.keys().cloned().collect())
    }

    fn clear(&mut self) -> AssetResult<()> {
        self.assets.clear();
        Ok(())
    }
}

/// Asset store rooted at a directory. The directory is created on first
/// write.
#[derive(Debug, Clone)]
pub struct DirectoryAssetStore {
    root: PathBuf,
}

impl DirectoryAssetStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// The store's directory.
    pub fn root(&self) -> &Path {
        &self.root
    }

    fn resolve(&self, name: &str) -> PathBuf {
        self.root.join(name)
    }
}

impl AssetStore for DirectoryAssetStore {
    fn write(&mut self, name: &str, data: &str) -> AssetResult<()> {
        let path = self.resolve(name);
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(path, data)?;
        Ok(())
    }

    fn list(&self) -> AssetResult<Vec<String>> {
        if !self.root.is_dir() {
            return Ok(Vec::new());
        }
        let mut names = Vec::new();
        for entry in std::fs::read_dir(&self.root)? {
            let entry = entry?;
            if entry.file_type()?.is_file() {
                names.push(entry.file_name().to_string_lossy().into_owned());
            }
        }
        names.sort();
        Ok(names)
    }

    fn clear(&mut self) -> AssetResult<()> {
        if self.root.exists() {
            std::fs::remove_dir_all(&self.root)?;
            log::info!("Cleared generated assets in {}", self.root.display());
        }
        Ok(())
    }
}

/// Serialize a value as pretty RON.
pub fn encode<T: Serialize>(name: &str, value: &T) -> AssetResult<String> {
    ron::ser::to_string_pretty(value, ron::ser::PrettyConfig::default()).map_err(|e| {
        AssetError::Encode {
            name: name.to_owned(),
            message: e.to_string(),
        }
    })
}

/// Deserialize a value from RON.
pub fn decode<T: DeserializeOwned>(name: &str, text: &str) -> AssetResult<T> {
    ron::from_str(text).map_err(|e| AssetError::Decode {
        name: name.to_owned(),
        message: e.to_string(),
    })
}

/// File name for a generated asset.
fn asset_name(kind: &str, raw: u32, name: &str) -> String {
    let clean: String = name
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || c == '_' || c == '-' {
                c
            } else {
                '_'
            }
        })
        .collect();
    format!("{kind}-{raw}-{clean}.ron")
}

/// Write every generated mesh, clip and controller to `store`.
///
/// With `debug_copy` set, the whole avatar is written as well. Returns the
/// number of assets written.
pub fn flush_generated(
    avatar: &Avatar,
    store: &mut dyn AssetStore,
    debug_copy: bool,
) -> AssetResult<usize> {
    let mut written = 0;
    for (id, mesh) in avatar.meshes.iter().filter(|(_, m)| m.generated) {
        let name = asset_name("mesh", id.0, &mesh.name);
        store.write(&name, &encode(&name, mesh)?)?;
        written += 1;
    }
    for (id, clip) in avatar.clips.iter().filter(|(_, c)| c.generated) {
        let name = asset_name("clip", id.0, &clip.name);
        store.write(&name, &encode(&name, clip)?)?;
        written += 1;
    }
    for (id, controller) in avatar.controllers.iter().filter(|(_, c)| c.generated) {
        let name = asset_name("controller", id.0, &controller.name);
        store.write(&name, &encode(&name, controller)?)?;
        written += 1;
    }
    if debug_copy {
        let name = asset_name("avatar", 0, &avatar.name).replace(".ron", "-debug.ron");
        store.write(&name, &encode(&name, avatar)?)?;
        written += 1;
    }
    log::info!("Flushed {written} generated assets");
    Ok(written)
}

/// Load an avatar from a RON file.
pub fn load_avatar(path: &Path) -> AssetResult<Avatar> {
    let text = std::fs::read_to_string(path)?;
    decode(&path.display().to_string(), &text)
}

/// Save an avatar as a RON file.
pub fn save_avatar(avatar: &Avatar, path: &Path) -> AssetResult<()> {
    let text = encode(&path.display().to_string(), avatar)?;
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)?;
    }
    std::fs::write(path, text)?;
    Ok(())
}
