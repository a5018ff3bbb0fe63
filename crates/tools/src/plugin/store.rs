//! Persistence for installed plugin manifests.
//!
//! The registry never touches the filesystem directly: it is handed a
//! [`ManifestStore`], so tests can run against [`MemoryManifestStore`] or a
//! temporary directory.

use modai_core::error::PluginError;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::RwLock;
use tracing::debug;

use super::manifest::PluginManifest;

/// One stored manifest, or the reason it could not be read.
#[derive(Debug)]
pub struct StoreEntry {
    pub name: String,
    pub manifest: Result<PluginManifest, PluginError>,
}

pub trait ManifestStore: Send + Sync {
    /// Every stored manifest, sorted by name. Unreadable entries are
    /// reported per entry rather than failing the whole listing.
    fn list(&self) -> Result<Vec<StoreEntry>, PluginError>;

    /// Write `manifest`, replacing any manifest with the same name.
    fn save(&self, manifest: &PluginManifest) -> Result<(), PluginError>;

    /// Delete the manifest called `name`. Returns whether one existed.
    fn remove(&self, name: &str) -> Result<bool, PluginError>;
}

/// One `<name>.json` file per plugin in a directory.
#[derive(Debug, Clone)]
pub struct FsManifestStore {
    dir: PathBuf,
}

impl FsManifestStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn path_for(&self, name: &str) -> PathBuf {
        self.dir.join(format!("{name}.json"))
    }

    fn io_error(path: &Path, e: std::io::Error) -> PluginError {
        PluginError::Io {
            path: path.to_path_buf(),
            reason: e.to_string(),
        }
    }
}

impl ManifestStore for FsManifestStore {
    fn list(&self) -> Result<Vec<StoreEntry>, PluginError> {
        if !self.dir.exists() {
            return Ok(Vec::new());
        }

        let entries = std::fs::read_dir(&self.dir).map_err(|e| Self::io_error(&self.dir, e))?;
        let mut listed = Vec::new();

        for entry in entries.flatten() {
            let path = entry.path();
            if path.extension().and_then(|e| e.to_str()) != Some("json") {
                continue;
            }
            let Some(name) = path.file_stem().and_then(|s| s.to_str()).map(String::from) else {
                continue;
            };

            let manifest = std::fs::read_to_string(&path)
                .map_err(|e| Self::io_error(&path, e))
                .and_then(|text| PluginManifest::from_json(&text, &path.display().to_string()))
                .and_then(|m| {
                    if m.name == name {
                        Ok(m)
                    } else {
                        Err(PluginError::InvalidManifest {
                            source_name: path.display().to_string(),
                            reason: format!("declares name '{}' but is stored as '{name}'", m.name),
                        })
                    }
                });
            listed.push(StoreEntry { name, manifest });
        }

        listed.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(listed)
    }

    fn save(&self, manifest: &PluginManifest) -> Result<(), PluginError> {
        std::fs::create_dir_all(&self.dir).map_err(|e| Self::io_error(&self.dir, e))?;
        let path = self.path_for(&manifest.name);
        let json = serde_json::to_string_pretty(manifest).map_err(|e| {
            PluginError::InvalidManifest {
                source_name: manifest.name.clone(),
                reason: e.to_string(),
            }
        })?;
        std::fs::write(&path, json).map_err(|e| Self::io_error(&path, e))?;
        debug!(path = %path.display(), "Saved plugin manifest");
        Ok(())
    }

    fn remove(&self, name: &str) -> Result<bool, PluginError> {
        let path = self.path_for(name);
        if !path.exists() {
            return Ok(false);
        }
        std::fs::remove_file(&path).map_err(|e| Self::io_error(&path, e))?;
        Ok(true)
    }
}

/// Volatile store for tests and embedding.
#[derive(Debug, Default)]
pub struct MemoryManifestStore {
    manifests: RwLock<BTreeMap<String, PluginManifest>>,
}

impl MemoryManifestStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl ManifestStore for MemoryManifestStore {
    fn list(&self) -> Result<Vec<StoreEntry>, PluginError> {
        let manifests = self.manifests.read().unwrap_or_else(|e| e.into_inner());
        Ok(manifests
            .iter()
            .map(|(name, m)| StoreEntry {
                name: name.clone(),
                manifest: Ok(m.clone()),
            })
            .collect())
    }

    fn save(&self, manifest: &PluginManifest) -> Result<(), PluginError> {
        let mut manifests = self.manifests.write().unwrap_or_else(|e| e.into_inner());
        manifests.insert(manifest.name.clone(), manifest.clone());
        Ok(())
    }

    fn remove(&self, name: &str) -> Result<bool, PluginError> {
        let mut manifests = self.manifests.write().unwrap_or_else(|e| e.into_inner());
        Ok(manifests.remove(name).is_some())
    }
}
