//! Install, update, uninstall and load plugins.

use modai_core::error::PluginError;
use modai_core::tool::Tool;
use tracing::{info, warn};

use super::command::CommandTool;
use super::manifest::PluginManifest;
use super::store::{ManifestStore, StoreEntry};

/// The outcome of loading one installed plugin.
pub enum PluginLoad {
    Loaded(Box<dyn Tool>),
    LoadFailure { name: String, reason: String },
}

impl PluginLoad {
    pub fn name(&self) -> &str {
        match self {
            PluginLoad::Loaded(tool) => tool.name(),
            PluginLoad::LoadFailure { name, .. } => name,
        }
    }

    pub fn is_loaded(&self) -> bool {
        matches!(self, PluginLoad::Loaded(_))
    }
}

impl std::fmt::Debug for PluginLoad {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PluginLoad::Loaded(tool) => f.debug_tuple("Loaded").field(&tool.name()).finish(),
            PluginLoad::LoadFailure { name, reason } => f
                .debug_struct("LoadFailure")
                .field("name", name)
                .field("reason", reason)
                .finish(),
        }
    }
}

pub struct PluginRegistry {
    store: Box<dyn ManifestStore>,
}

impl PluginRegistry {
    pub fn new(store: impl ManifestStore + 'static) -> Self {
        Self {
            store: Box::new(store),
        }
    }

    fn find(&self, name: &str) -> Result<Option<StoreEntry>, PluginError> {
        Ok(self.store.list()?.into_iter().find(|e| e.name == name))
    }

    /// Add a new plugin. Fails if one with the same name is installed.
    pub fn install(&self, manifest: PluginManifest) -> Result<(), PluginError> {
        manifest.validate()?;
        if self.find(&manifest.name)?.is_some() {
            return Err(PluginError::AlreadyInstalled(manifest.name));
        }
        self.store.save(&manifest)?;
        info!(plugin = %manifest.name, "Installed plugin");
        Ok(())
    }

    /// Replace the manifest of an installed plugin.
    pub fn update(&self, manifest: PluginManifest) -> Result<(), PluginError> {
        manifest.validate()?;
        if self.find(&manifest.name)?.is_none() {
            return Err(PluginError::NotInstalled(manifest.name));
        }
        self.store.save(&manifest)?;
        info!(plugin = %manifest.name, "Updated plugin");
        Ok(())
    }

    pub fn uninstall(&self, name: &str) -> Result<(), PluginError> {
        if !self.store.remove(name)? {
            return Err(PluginError::NotInstalled(name.into()));
        }
        info!(plugin = %name, "Uninstalled plugin");
        Ok(())
    }

    pub fn manifests(&self) -> Result<Vec<StoreEntry>, PluginError> {
        self.store.list()
    }

    /// Load every installed plugin. Each one yields exactly one outcome.
    pub fn load_all(&self) -> Result<Vec<PluginLoad>, PluginError> {
        let loads: Vec<PluginLoad> = self
            .store
            .list()?
            .into_iter()
            .map(|entry| match entry.manifest {
                Ok(manifest) => load(manifest),
                Err(e) => PluginLoad::LoadFailure {
                    name: entry.name,
                    reason: e.to_string(),
                },
            })
            .collect();

        for outcome in &loads {
            if let PluginLoad::LoadFailure { name, reason } = outcome {
                warn!(plugin = %name, reason = %reason, "Plugin failed to load");
            }
        }
        Ok(loads)
    }
}

/// Turn a manifest into a runnable tool.
pub fn load(manifest: PluginManifest) -> PluginLoad {
    if let Err(e) = manifest.validate() {
        return PluginLoad::LoadFailure {
            name: manifest.name,
            reason: e.to_string(),
        };
    }
    match manifest.locate_entry() {
        Some(program) => PluginLoad::Loaded(Box::new(CommandTool::new(manifest, program))),
        None => PluginLoad::LoadFailure {
            reason: PluginError::MissingEntry(manifest.entry.clone()).to_string(),
            name: manifest.name,
        },
    }
}
