//! End-to-end integration tests for the modai agent.
//!
//! These drive the full pipeline, from a scripted model response through
//! directive extraction, real built-in tools and plugins, to the final answer.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

use modai_agent::{AgentLoop, LoopState};
use modai_config::ToolsConfig;
use modai_core::error::ProviderError;
use modai_core::event::{DomainEvent, EventBus};
use modai_core::message::ConversationTurn;
use modai_core::provider::Provider;
use modai_tools::plugin::FsManifestStore;
use modai_tools::{PluginManifest, PluginRegistry, builtin_registry, register_plugins};
use serde_json::json;

// ── Mock Provider ────────────────────────────────────────────────────────

/// A mock provider that returns scripted responses in sequence and keeps
/// every message it was sent.
struct ScriptedProvider {
    responses: Mutex<VecDeque<String>>,
    received: Mutex<Vec<String>>,
}

impl ScriptedProvider {
    fn new(responses: &[&str]) -> Self {
        Self {
            responses: Mutex::new(responses.iter().map(|s| s.to_string()).collect()),
            received: Mutex::new(Vec::new()),
        }
    }

    fn received(&self) -> Vec<String> {
        self.received.lock().unwrap().clone()
    }
}

#[async_trait::async_trait]
impl Provider for ScriptedProvider {
    fn name(&self) -> &str {
        "e2e_mock"
    }

    async fn generate_response(
        &self,
        message: &str,
        _system_prompt: &str,
        _history: &[ConversationTurn],
    ) -> Result<String, ProviderError> {
        self.received.lock().unwrap().push(message.to_string());
        let next = self.responses.lock().unwrap().pop_front();
        Ok(next.unwrap_or_else(|| panic!("ScriptedProvider exhausted")))
    }
}

fn directive(tool: &str, arguments: serde_json::Value) -> String {
    json!({ "protocol": "modai", "tool": tool, "arguments": arguments }).to_string()
}

fn agent_with(provider: Arc<ScriptedProvider>) -> AgentLoop {
    AgentLoop::new(provider, Arc::new(builtin_registry(&ToolsConfig::default())))
}

// ── E2E: built-in tools ──────────────────────────────────────────────────

#[tokio::test]
async fn e2e_dice_roll_round_trip() {
    let first = format!(
        "Let me roll that for you. {}",
        directive("roll_dice", json!({ "dice": "2d6" }))
    );
    let provider = Arc::new(ScriptedProvider::new(&[&first, "You rolled the dice."]));
    let mut agent = agent_with(provider.clone());

    let outcome = agent.handle_chat("Roll 2d6").await.unwrap();

    assert_eq!(outcome.state, LoopState::Done);
    assert_eq!(outcome.turns, 2);
    assert_eq!(outcome.response, "You rolled the dice.");

    let result = &outcome.executions[0].result;
    assert!(result.success);
    let total = result.data.as_ref().unwrap()["total"].as_i64().unwrap();
    assert!((2..=12).contains(&total));

    let follow_up = &provider.received()[1];
    assert!(follow_up.contains("Let me roll that for you."));
    assert!(follow_up.contains(r#"Tool `roll_dice` called with {"dice":"2d6"}"#));
}

#[tokio::test]
async fn e2e_write_then_read_in_one_response() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("note.txt");
    let path_str = path.to_str().unwrap();

    let first = format!(
        "Saving, then reading back.\n{}\n{}",
        directive("write_file", json!({ "path": path_str, "content": "remember the milk" })),
        directive("read_file", json!({ "path": path_str })),
    );
    let provider = Arc::new(ScriptedProvider::new(&[&first, "The note says: remember the milk"]));
    let mut agent = agent_with(provider.clone());

    let outcome = agent.handle_chat("Write a note and read it back").await.unwrap();

    assert_eq!(outcome.state, LoopState::Done);
    let tools: Vec<&str> = outcome
        .executions
        .iter()
        .map(|e| e.directive.tool())
        .collect();
    assert_eq!(tools, vec!["write_file", "read_file"]);
    assert!(outcome.executions.iter().all(|e| e.result.success));
    assert_eq!(
        outcome.executions[1].result.data,
        Some(json!("remember the milk"))
    );
    assert!(provider.received()[1].contains("result: remember the milk"));
}

#[tokio::test]
async fn e2e_missing_file_is_reported_not_raised() {
    let dir = tempfile::tempdir().unwrap();
    let missing = dir.path().join("nope.txt");
    let first = directive("read_file", json!({ "path": missing.to_str().unwrap() }));
    let provider = Arc::new(ScriptedProvider::new(&[&first, "That file does not exist."]));
    let mut agent = agent_with(provider.clone());

    let outcome = agent.handle_chat("Read nope.txt").await.unwrap();

    assert_eq!(outcome.state, LoopState::Done);
    assert!(!outcome.executions[0].result.success);
    assert!(provider.received()[1].contains("-> error:"));
}

#[tokio::test]
async fn e2e_double_encoded_directive_still_runs() {
    let first = r#"Rolling: {\"protocol\":\"modai\",\"tool\":\"roll_dice\",\"arguments\":{\"dice\":\"1d4\"}}"#;
    let provider = Arc::new(ScriptedProvider::new(&[first, "Done."]));
    let mut agent = agent_with(provider);

    let outcome = agent.handle_chat("roll a d4").await.unwrap();

    assert_eq!(outcome.executions.len(), 1);
    assert_eq!(outcome.executions[0].directive.tool(), "roll_dice");
    assert!(outcome.executions[0].result.success);
}

#[tokio::test]
async fn e2e_turn_limit_truncates_and_publishes() {
    let call = directive("roll_dice", json!({ "dice": "1d6" }));
    let script: Vec<&str> = std::iter::repeat_n(call.as_str(), 5).collect();
    let provider = Arc::new(ScriptedProvider::new(&script));
    let bus = Arc::new(EventBus::new(256));
    let mut events = bus.subscribe();
    let mut agent = agent_with(provider.clone()).with_event_bus(bus);

    let outcome = agent.handle_chat("keep rolling").await.unwrap();

    assert_eq!(outcome.state, LoopState::AbortedMaxTurns);
    assert_eq!(outcome.turns, 5);
    assert_eq!(outcome.response, call);
    assert_eq!(outcome.executions.len(), 4);
    assert_eq!(provider.received().len(), 5);

    let mut executed = 0;
    let mut limit = false;
    while let Ok(event) = events.try_recv() {
        match event.as_ref() {
            DomainEvent::ToolExecuted { .. } => executed += 1,
            DomainEvent::TurnLimitReached { .. } => limit = true,
            _ => {}
        }
    }
    assert_eq!(executed, 4);
    assert!(limit);
}

#[tokio::test]
async fn e2e_foreign_protocol_is_left_alone() {
    let text = r#"Here is config: {"protocol":"other","tool":"exec","arguments":{}}"#;
    let provider = Arc::new(ScriptedProvider::new(&[text]));
    let mut agent = agent_with(provider);

    let outcome = agent.handle_chat("show me").await.unwrap();

    assert_eq!(outcome.state, LoopState::Done);
    assert_eq!(outcome.response, text);
    assert!(outcome.executions.is_empty());
}

// ── E2E: plugins ─────────────────────────────────────────────────────────

#[cfg(unix)]
#[tokio::test]
async fn e2e_installed_plugin_is_callable() {
    let plugin_dir = tempfile::tempdir().unwrap();
    let plugins = PluginRegistry::new(FsManifestStore::new(plugin_dir.path()));
    plugins
        .install(PluginManifest {
            name: "echo_args".into(),
            description: "Echo the arguments back".into(),
            example: json!({ "text": "hi" }),
            entry: "cat".into(),
            args: vec![],
            timeout_secs: 5,
        })
        .unwrap();

    let mut registry = builtin_registry(&ToolsConfig::default());
    let failures = register_plugins(&mut registry, plugins.load_all().unwrap());
    assert!(failures.is_empty());

    let first = directive("echo_args", json!({ "text": "ping" }));
    let provider = Arc::new(ScriptedProvider::new(&[&first, "The plugin answered."]));
    let mut agent = AgentLoop::new(provider.clone(), Arc::new(registry));
    assert!(agent.system_prompt().contains("### echo_args"));

    let outcome = agent.handle_chat("ping the plugin").await.unwrap();

    assert_eq!(outcome.executions[0].result.data, Some(json!({ "text": "ping" })));
    assert!(provider.received()[1].contains(r#"result: {"text":"ping"}"#));
}

#[cfg(unix)]
#[tokio::test]
async fn e2e_exec_runs_shell_commands() {
    let first = directive("exec", json!({ "command": "echo modai" }));
    let provider = Arc::new(ScriptedProvider::new(&[&first, "It printed modai."]));
    let mut agent = agent_with(provider);

    let outcome = agent.handle_chat("run echo").await.unwrap();

    let data = outcome.executions[0].result.data.clone().unwrap();
    assert_eq!(data["stdout"], json!("modai"));
}
