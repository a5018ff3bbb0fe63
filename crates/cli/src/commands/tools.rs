//! `modai tools`: List the tools the agent can call.

use modai_config::AppConfig;
use modai_tools::PluginLoad;

pub async fn run() -> Result<(), Box<dyn std::error::Error>> {
    let config = AppConfig::load().map_err(|e| format!("Failed to load config: {e}"))?;
    let (registry, failures) = super::tool_registry(&config);

    println!("Available tools ({})", registry.len());
    println!("==================\n");
    for info in registry.list() {
        println!("  {}", info.name);
        println!("    {}", info.description);
        println!("    example: {}", info.example);
        println!();
    }

    if !failures.is_empty() {
        println!("Plugins that failed to load:");
        for failure in &failures {
            if let PluginLoad::LoadFailure { name, reason } = failure {
                println!("  {name}: {reason}");
            }
        }
    }

    Ok(())
}
