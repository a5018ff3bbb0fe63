//! `modai onboard`: First-time setup.

use modai_config::AppConfig;

pub async fn run() -> Result<(), Box<dyn std::error::Error>> {
    let config_dir = AppConfig::config_dir();
    let config_path = AppConfig::config_path();

    println!("modai first-time setup");
    println!("======================\n");

    // Create directories
    if !config_dir.exists() {
        std::fs::create_dir_all(&config_dir)?;
        println!("  Created config directory: {}", config_dir.display());
    } else {
        println!("  Config directory exists: {}", config_dir.display());
    }

    // Create config file
    if config_path.exists() {
        println!("\n  Config already exists at: {}", config_path.display());
        println!("  Edit it manually or delete and re-run onboard.\n");
    } else {
        std::fs::write(&config_path, AppConfig::default_toml())?;
        println!("  Created config.toml at: {}", config_path.display());
    }

    let plugin_dir = AppConfig::load_from(&config_path)
        .map(|c| c.plugins.resolved_dir())
        .unwrap_or_else(|_| config_dir.join("plugins"));
    if !plugin_dir.exists() {
        std::fs::create_dir_all(&plugin_dir)?;
        println!("  Created plugin directory: {}", plugin_dir.display());
    }

    println!("\n  Next steps:");
    println!("   1. Add your API key to {} (or export OPENROUTER_API_KEY)", config_path.display());
    println!("   2. Run: modai doctor");
    println!("   3. Run: modai agent\n");

    Ok(())
}
