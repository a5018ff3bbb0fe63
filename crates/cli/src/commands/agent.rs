//! `modai agent`: Interactive or single-message chat mode.

use std::sync::Arc;

use async_trait::async_trait;
use modai_agent::{AgentLoop, Confirmation, LoopOutcome};
use modai_config::AppConfig;
use modai_protocol::Directive;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader, Lines, Stdin};
use tokio::sync::Mutex;

/// Line-oriented terminal input shared by the chat prompt and the
/// confirmation gate.
struct Console {
    lines: Mutex<Lines<BufReader<Stdin>>>,
}

impl Console {
    fn new() -> Self {
        Self {
            lines: Mutex::new(BufReader::new(tokio::io::stdin()).lines()),
        }
    }

    /// Print `prompt` and read one line. `None` on end of input.
    async fn ask(&self, prompt: &str) -> std::io::Result<Option<String>> {
        let mut stdout = tokio::io::stdout();
        stdout.write_all(prompt.as_bytes()).await?;
        stdout.flush().await?;
        self.lines.lock().await.next_line().await
    }
}

#[async_trait]
impl Confirmation for Console {
    async fn confirm(&self, directive: &Directive) -> bool {
        println!();
        println!("  Tool call: {}", directive.tool());
        println!("  Arguments: {}", serde_json::Value::Object(directive.arguments().clone()));
        match self.ask("  Run it? [y/N] ").await {
            Ok(Some(answer)) => matches!(answer.trim().to_lowercase().as_str(), "y" | "yes"),
            _ => false,
        }
    }
}

pub async fn run(message: Option<String>, yes: bool) -> Result<(), Box<dyn std::error::Error>> {
    let config = AppConfig::load().map_err(|e| format!("Failed to load config: {e}"))?;

    // Fail early with setup instructions when no key is set
    if !config.has_api_key() {
        eprintln!();
        eprintln!("  ERROR: No API key configured!");
        eprintln!();
        eprintln!("  Set one of these environment variables:");
        eprintln!("    OPENROUTER_API_KEY=sk-or-v1-...   (recommended)");
        eprintln!("    OPENAI_API_KEY=sk-...             (for OpenAI direct)");
        eprintln!("    ANTHROPIC_API_KEY=sk-ant-...      (for Anthropic direct)");
        eprintln!("    MODAI_API_KEY=...                 (generic)");
        eprintln!();
        eprintln!("  Or add it to your config file:");
        eprintln!("    {}", AppConfig::config_path().display());
        eprintln!();
        return Err("No API key found. See above for setup instructions.".into());
    }

    let router = modai_providers::build_from_config(&config);
    let provider = router.default().ok_or("No default provider configured")?;

    let (tools, failures) = super::tool_registry(&config);
    for failure in &failures {
        if let modai_tools::PluginLoad::LoadFailure { name, reason } = failure {
            eprintln!("  [Plugin skipped] {name}: {reason}");
        }
    }
    let tool_names = tools.names().join(", ");

    let console = Arc::new(Console::new());
    let mut agent = AgentLoop::new(provider, Arc::new(tools)).with_max_turns(config.agent.max_turns);
    if let Some(prompt) = &config.agent.system_prompt_override {
        agent = agent.with_persona(prompt);
    }
    if config.agent.confirm_tools && !yes {
        agent = agent.with_confirmation(console.clone());
    }

    if let Some(msg) = message {
        // Single message mode
        let outcome = agent.handle_chat(&msg).await?;
        print_outcome(&outcome, "");
        return Ok(());
    }

    // Interactive mode
    println!();
    println!("  modai agent (interactive)");
    println!();
    println!("  Provider:  {}", config.default_provider);
    println!("  Model:     {}", config.default_model);
    println!("  Tools:     {tool_names}");
    println!();
    println!("  Type your message and press Enter.");
    println!("  Type 'exit' or Ctrl+D to quit, '/reset' to clear history.");
    println!();

    while let Some(line) = console.ask("  You > ").await? {
        let line = line.trim();
        match line {
            "" => continue,
            "exit" | "quit" => break,
            "/reset" => {
                agent.reset();
                println!("  History cleared.");
                continue;
            }
            _ => {}
        }

        match agent.handle_chat(line).await {
            Ok(outcome) => {
                println!();
                print_outcome(&outcome, "  Assistant > ");
                println!();
            }
            Err(e) => {
                eprintln!("  [Error] {e}");
                println!();
            }
        }
    }

    println!();
    println!("  Goodbye!");
    Ok(())
}

fn print_outcome(outcome: &LoopOutcome, prefix: &str) {
    for line in outcome.response.lines() {
        println!("{prefix}{line}");
    }
    if outcome.is_truncated() {
        eprintln!(
            "  [Warning] Stopped after {} turns while the model was still calling tools; \
             the response above may be incomplete.",
            outcome.turns
        );
    }
}
