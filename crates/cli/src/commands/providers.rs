//! `modai providers`: List supported LLM providers.

use modai_config::AppConfig;

pub async fn run() -> Result<(), Box<dyn std::error::Error>> {
    println!("Supported LLM providers");
    println!("=======================");
    println!();
    println!("  Built-in providers:");
    println!("  ┌──────────────────┬──────────────────────────────┬──────────────┐");
    println!("  │ Provider         │ Base URL                     │ Auth         │");
    println!("  ├──────────────────┼──────────────────────────────┼──────────────┤");
    println!("  │ openrouter       │ openrouter.ai/api/v1         │ API key      │");
    println!("  │ openai           │ api.openai.com/v1            │ API key      │");
    println!("  │ anthropic        │ api.anthropic.com            │ API key      │");
    println!("  │ ollama           │ localhost:11434/v1           │ None (local) │");
    println!("  │ groq             │ api.groq.com/openai/v1       │ API key      │");
    println!("  │ deepseek         │ api.deepseek.com/v1          │ API key      │");
    println!("  │ together         │ api.together.xyz/v1          │ API key      │");
    println!("  │ vllm             │ localhost:8000/v1            │ None (local) │");
    println!("  └──────────────────┴──────────────────────────────┴──────────────┘");
    println!();
    println!("  Custom endpoints:");
    println!("    Any OpenAI-compatible API works out of the box:");
    println!("    default_provider = \"mine\"");
    println!("    [providers.mine]");
    println!("    api_url = \"https://your-custom-endpoint.com/v1\"");
    println!("    api_key = \"your-key\"");
    println!();
    println!("  Environment variables:");
    println!("    MODAI_API_KEY, OPENROUTER_API_KEY, OPENAI_API_KEY, ANTHROPIC_API_KEY");
    println!("    MODAI_PROVIDER, MODAI_MODEL");

    if let Ok(config) = AppConfig::load() {
        let router = modai_providers::build_from_config(&config);
        println!();
        println!("  Configured: {}", router.list().join(", "));
        println!("  Default:    {} ({})", router.default_name(), config.default_model);
    }

    Ok(())
}
