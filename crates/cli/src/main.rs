//! modai CLI: the main entry point.
//!
//! Commands:
//! - `onboard`  : Initialize config and the plugin directory
//! - `agent`    : Interactive chat or single-message mode
//! - `tools`    : List built-in and plugin tools
//! - `plugin`   : Manage installed plugins
//! - `providers`: List supported LLM providers
//! - `config`   : Show, locate or validate configuration
//! - `doctor`   : Diagnose system health

use std::path::PathBuf;

use clap::{Parser, Subcommand};

mod commands;

#[derive(Parser)]
#[command(
    name = "modai",
    about = "modai: a terminal agent that calls tools embedded in model output",
    version,
    author
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Initialize configuration
    Onboard,

    /// Chat with the AI agent
    Agent {
        /// Send a single message instead of entering interactive mode
        #[arg(short, long)]
        message: Option<String>,

        /// Run tool calls without asking first
        #[arg(short, long)]
        yes: bool,
    },

    /// List available tools
    Tools,

    /// Manage installed plugins
    Plugin {
        #[command(subcommand)]
        command: PluginCommand,
    },

    /// List supported LLM providers
    Providers,

    /// Configuration management
    Config {
        #[command(subcommand)]
        command: ConfigCommand,
    },

    /// Diagnose system health
    Doctor,
}

#[derive(Subcommand)]
enum PluginCommand {
    /// List installed plugins
    List,

    /// Install a plugin from a manifest file
    Install {
        /// Path to the plugin's JSON manifest
        manifest: PathBuf,

        /// Replace an installed plugin of the same name
        #[arg(long)]
        update: bool,
    },

    /// Remove an installed plugin
    Remove {
        /// Plugin name
        name: String,
    },
}

#[derive(Subcommand)]
enum ConfigCommand {
    /// Print the effective configuration
    Show,

    /// Print the config file location
    Path,

    /// Check the configuration for problems
    Validate,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    // Initialize tracing
    let filter = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(filter)),
        )
        .with_target(false)
        .init();

    match cli.command {
        Commands::Onboard => commands::onboard::run().await?,
        Commands::Agent { message, yes } => commands::agent::run(message, yes).await?,
        Commands::Tools => commands::tools::run().await?,
        Commands::Plugin { command } => match command {
            PluginCommand::List => commands::plugin::list().await?,
            PluginCommand::Install { manifest, update } => {
                commands::plugin::install(&manifest, update).await?
            }
            PluginCommand::Remove { name } => commands::plugin::remove(&name).await?,
        },
        Commands::Providers => commands::providers::run().await?,
        Commands::Config { command } => match command {
            ConfigCommand::Show => commands::config_cmd::show().await?,
            ConfigCommand::Path => commands::config_cmd::path().await?,
            ConfigCommand::Validate => commands::config_cmd::validate().await?,
        },
        Commands::Doctor => commands::doctor::run().await?,
    }

    Ok(())
}
