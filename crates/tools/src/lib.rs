//! Built-in tool implementations for modai.
//!
//! Tools give the agent the ability to interact with the world:
//! run commands, read/write files, roll dice, and make HTTP calls.
//! Installed plugins are external programs wrapped as tools; see [`plugin`].

pub mod dice;
pub mod exec;
pub mod file_read;
pub mod file_write;
pub mod http_request;
pub mod path;
pub mod plugin;

use modai_config::ToolsConfig;
use modai_core::error::ToolError;
use modai_core::tool::{Arguments, ToolRegistry};
use std::time::Duration;
use tracing::info;

pub use path::{PathError, PathGuard};
pub use plugin::{PluginLoad, PluginManifest, PluginRegistry};

/// Create a registry with all built-in tools, configured from `[tools]`.
pub fn builtin_registry(config: &ToolsConfig) -> ToolRegistry {
    let guard = PathGuard::new(config.allowed_roots.clone(), config.forbidden_paths.clone());

    let mut registry = ToolRegistry::new();
    registry.register(Box::new(exec::ExecTool::new(
        config.allowed_commands.clone(),
        Duration::from_secs(config.exec_timeout_secs),
    )));
    registry.register(Box::new(file_read::FileReadTool::new(guard.clone())));
    registry.register(Box::new(file_write::FileWriteTool::new(guard)));
    registry.register(Box::new(dice::DiceTool));
    registry.register(Box::new(http_request::HttpRequestTool::new(
        Duration::from_secs(config.http_timeout_secs),
    )));
    registry
}

/// Register every loaded plugin and hand back the failures.
///
/// A plugin with the same name as a built-in replaces it.
pub fn register_plugins(registry: &mut ToolRegistry, loads: Vec<PluginLoad>) -> Vec<PluginLoad> {
    let mut failures = Vec::new();
    for load in loads {
        match load {
            PluginLoad::Loaded(tool) => {
                info!(plugin = %tool.name(), "Registered plugin tool");
                registry.register(tool);
            }
            failure @ PluginLoad::LoadFailure { .. } => failures.push(failure),
        }
    }
    failures
}

/// Fetch a required string argument.
pub(crate) fn required_str<'a>(arguments: &'a Arguments, key: &str) -> Result<&'a str, ToolError> {
    arguments
        .get(key)
        .and_then(|v| v.as_str())
        .ok_or_else(|| ToolError::InvalidArguments(format!("Missing '{key}' argument")))
}
