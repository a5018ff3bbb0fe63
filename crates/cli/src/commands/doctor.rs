//! `modai doctor`: Diagnose system health.

use modai_config::AppConfig;
use modai_tools::PluginLoad;

pub async fn run() -> Result<(), Box<dyn std::error::Error>> {
    println!("modai doctor");
    println!("============\n");

    let mut issues = 0;

    let config_path = AppConfig::config_path();
    if !config_path.exists() {
        println!("  [warn] No config file, using defaults. Run `modai onboard` to create one");
        issues += 1;
    }

    let config = match AppConfig::load() {
        Ok(config) => {
            println!("  [ok]   Config valid");
            config
        }
        Err(e) => {
            println!("  [fail] Config invalid: {e}");
            println!("\n  1 blocking issue found.");
            return Ok(());
        }
    };

    if config.has_api_key() {
        println!("  [ok]   API key configured for '{}'", config.default_provider);
    } else {
        println!("  [warn] No API key configured. Set OPENROUTER_API_KEY or add api_key to config.toml");
        issues += 1;
    }

    let plugin_dir = config.plugins.resolved_dir();
    let (tools, failures) = super::tool_registry(&config);
    println!("  [ok]   {} tools available", tools.len());
    if !plugin_dir.exists() {
        println!("  [info] No plugin directory at {}", plugin_dir.display());
    }
    for failure in &failures {
        if let PluginLoad::LoadFailure { name, reason } = failure {
            println!("  [warn] Plugin '{name}' does not load: {reason}");
            issues += 1;
        }
    }

    if config.tools.allowed_commands.is_empty() {
        println!("  [info] exec accepts any command (tools.allowed_commands is empty)");
    }

    // Summary
    println!();
    if issues == 0 {
        println!("  All checks passed!");
    } else {
        println!("  {issues} issue(s) found. See above for details.");
    }

    Ok(())
}
