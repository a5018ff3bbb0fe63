pub mod agent;
pub mod config_cmd;
pub mod doctor;
pub mod onboard;
pub mod plugin;
pub mod providers;
pub mod tools;

use modai_config::AppConfig;
use modai_core::tool::ToolRegistry;
use modai_tools::plugin::FsManifestStore;
use modai_tools::{PluginLoad, PluginRegistry};
use tracing::warn;

/// The plugin registry backed by the configured plugin directory.
pub fn plugin_registry(config: &AppConfig) -> PluginRegistry {
    PluginRegistry::new(FsManifestStore::new(config.plugins.resolved_dir()))
}

/// Built-in tools plus every plugin that loads, and the plugins that did not.
pub fn tool_registry(config: &AppConfig) -> (ToolRegistry, Vec<PluginLoad>) {
    let mut registry = modai_tools::builtin_registry(&config.tools);
    let failures = match plugin_registry(config).load_all() {
        Ok(loads) => modai_tools::register_plugins(&mut registry, loads),
        Err(e) => {
            warn!(error = %e, "Could not read the plugin directory");
            Vec::new()
        }
    };
    (registry, failures)
}
