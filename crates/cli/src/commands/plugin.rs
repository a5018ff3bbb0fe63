//! `modai plugin`: Install, list and remove plugins.

use std::path::Path;

use modai_config::AppConfig;
use modai_tools::PluginManifest;

fn load_config() -> Result<AppConfig, Box<dyn std::error::Error>> {
    Ok(AppConfig::load().map_err(|e| format!("Failed to load config: {e}"))?)
}

pub async fn list() -> Result<(), Box<dyn std::error::Error>> {
    let config = load_config()?;
    let entries = super::plugin_registry(&config).manifests()?;

    if entries.is_empty() {
        println!("No plugins installed in {}", config.plugins.resolved_dir().display());
        return Ok(());
    }

    println!("Installed plugins ({})", entries.len());
    println!("====================\n");
    for entry in entries {
        match entry.manifest {
            Ok(manifest) => {
                let status = if manifest.locate_entry().is_some() {
                    "ready"
                } else {
                    "entry missing"
                };
                println!("  {} [{status}]", manifest.name);
                if !manifest.description.is_empty() {
                    println!("    {}", manifest.description);
                }
                println!("    entry: {}", manifest.entry.display());
            }
            Err(e) => println!("  {} [broken]\n    {e}", entry.name),
        }
    }
    Ok(())
}

pub async fn install(manifest_path: &Path, update: bool) -> Result<(), Box<dyn std::error::Error>> {
    let config = load_config()?;
    let text = std::fs::read_to_string(manifest_path)
        .map_err(|e| format!("Cannot read {}: {e}", manifest_path.display()))?;

    let mut manifest = PluginManifest::from_json(&text, &manifest_path.display().to_string())?;
    if let Some(base) = manifest_path.parent() {
        let base = if base.as_os_str().is_empty() { Path::new(".") } else { base };
        let base = std::fs::canonicalize(base).unwrap_or_else(|_| base.to_path_buf());
        manifest.anchor_entry(&base);
    }
    if manifest.locate_entry().is_none() {
        eprintln!(
            "  [warn] entry '{}' was not found; the plugin will fail to load until it exists",
            manifest.entry.display()
        );
    }

    let name = manifest.name.clone();
    let registry = super::plugin_registry(&config);
    if update {
        registry.update(manifest)?;
        println!("Updated plugin '{name}'");
    } else {
        registry.install(manifest)?;
        println!("Installed plugin '{name}'");
    }
    Ok(())
}

pub async fn remove(name: &str) -> Result<(), Box<dyn std::error::Error>> {
    let config = load_config()?;
    super::plugin_registry(&config).uninstall(name)?;
    println!("Removed plugin '{name}'");
    Ok(())
}
