//! Plugin manifest: what an installed plugin declares about itself.

use modai_core::error::PluginError;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::path::{Path, PathBuf};

fn default_timeout() -> u64 {
    30
}

fn empty_example() -> Value {
    Value::Object(Default::default())
}

/// A plugin is an external program that speaks JSON on stdin/stdout.
///
/// ```json
/// {
///   "name": "weather",
///   "description": "Current weather for a city",
///   "example": { "city": "Oslo" },
///   "entry": "/opt/modai/weather.py",
///   "args": ["--units", "metric"],
///   "timeout_secs": 10
/// }
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PluginManifest {
    /// Tool name the model uses in directives
    pub name: String,

    #[serde(default)]
    pub description: String,

    /// Example `arguments` object shown to the model
    #[serde(default = "empty_example")]
    pub example: Value,

    /// Program to run: an absolute path, or a bare name looked up on `PATH`
    pub entry: PathBuf,

    #[serde(default)]
    pub args: Vec<String>,

    #[serde(default = "default_timeout")]
    pub timeout_secs: u64,
}

impl PluginManifest {
    /// Parse and validate a manifest; `source_name` labels errors.
    pub fn from_json(text: &str, source_name: &str) -> Result<Self, PluginError> {
        let manifest: Self =
            serde_json::from_str(text).map_err(|e| PluginError::InvalidManifest {
                source_name: source_name.into(),
                reason: e.to_string(),
            })?;
        manifest.validate()?;
        Ok(manifest)
    }

    pub fn validate(&self) -> Result<(), PluginError> {
        let invalid = |reason: &str| PluginError::InvalidManifest {
            source_name: self.name.clone(),
            reason: reason.into(),
        };

        if self.name.is_empty() {
            return Err(invalid("name is empty"));
        }
        if !self
            .name
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-')
        {
            return Err(invalid("name may only contain letters, digits, '_' and '-'"));
        }
        if self.entry.as_os_str().is_empty() {
            return Err(invalid("entry is empty"));
        }
        if !self.example.is_object() {
            return Err(invalid("example must be a JSON object"));
        }
        if self.timeout_secs == 0 {
            return Err(invalid("timeout_secs must be at least 1"));
        }
        Ok(())
    }

    /// Anchor a relative entry path (`./tool.sh`, `bin/tool`) at `base`.
    ///
    /// Bare program names are left for `PATH` lookup.
    pub fn anchor_entry(&mut self, base: &Path) {
        if self.entry.is_relative() && self.entry.components().count() > 1 {
            self.entry = base.join(&self.entry);
        }
    }

    /// Where the entry program lives, if it can be found.
    pub fn locate_entry(&self) -> Option<PathBuf> {
        if self.entry.components().count() > 1 || self.entry.is_absolute() {
            return self.entry.is_file().then(|| self.entry.clone());
        }
        let path = std::env::var_os("PATH")?;
        std::env::split_paths(&path)
            .map(|dir| dir.join(&self.entry))
            .find(|candidate| candidate.is_file())
    }
}
