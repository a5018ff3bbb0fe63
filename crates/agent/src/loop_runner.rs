//! The agent reasoning loop implementation.

use std::sync::Arc;
use std::time::Instant;

use chrono::Utc;
use modai_core::error::ToolError;
use modai_core::event::{DomainEvent, EventBus};
use modai_core::message::ConversationTurn;
use modai_core::provider::Provider;
use modai_core::tool::{ToolRegistry, ToolResult};
use modai_protocol::{Candidate, Directive, Rejection};
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::confirm::{AutoApprove, Confirmation};
use crate::prompt;

/// Default bound on model responses per `handle_chat` call.
pub const DEFAULT_MAX_TURNS: usize = 5;

const CANCELLED: &str = "Cancelled by user";

/// How a `handle_chat` call ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoopState {
    /// The model answered without asking for tools
    Done,
    /// The model was still asking for tools when the turn bound was hit
    AbortedMaxTurns,
}

/// One directive and what came of it.
#[derive(Debug, Clone, PartialEq)]
pub struct ToolExecution {
    pub directive: Directive,
    pub result: ToolResult,
}

/// The result of one `handle_chat` call.
#[derive(Debug, Clone, PartialEq)]
pub struct LoopOutcome {
    pub state: LoopState,
    /// Final text: stripped of directives when `Done`, raw when aborted
    pub response: String,
    /// Model responses consumed, 1-based
    pub turns: usize,
    /// Every execution in order, across all turns
    pub executions: Vec<ToolExecution>,
}

impl LoopOutcome {
    pub fn is_truncated(&self) -> bool {
        self.state == LoopState::AbortedMaxTurns
    }
}

/// Drives one conversation session: generate, extract, execute, feed back.
pub struct AgentLoop {
    /// The LLM provider to use
    provider: Arc<dyn Provider>,

    /// Tool registry
    tools: Arc<ToolRegistry>,

    /// System prompt sent with every request
    system_prompt: String,

    /// Maximum model responses per `handle_chat` call
    max_turns: usize,

    /// Gate consulted before each directive runs
    confirmation: Arc<dyn Confirmation>,

    /// Event bus for domain events
    event_bus: Arc<EventBus>,

    /// Identifies the current session in logs
    session_id: Uuid,

    /// Session history, owned by this loop
    history: Vec<ConversationTurn>,
}

impl AgentLoop {
    /// Create a new agent loop. The system prompt is built from the registry.
    pub fn new(provider: Arc<dyn Provider>, tools: Arc<ToolRegistry>) -> Self {
        let system_prompt = prompt::system_prompt(None, &tools.list());
        Self {
            provider,
            tools,
            system_prompt,
            max_turns: DEFAULT_MAX_TURNS,
            confirmation: Arc::new(AutoApprove),
            event_bus: Arc::new(EventBus::default()),
            session_id: Uuid::new_v4(),
            history: Vec::new(),
        }
    }

    /// Set the turn bound. Zero is treated as one.
    pub fn with_max_turns(mut self, max: usize) -> Self {
        self.max_turns = max.max(1);
        self
    }

    /// Swap the built-in persona, keeping the protocol description and tool list.
    pub fn with_persona(mut self, persona: &str) -> Self {
        self.system_prompt = prompt::system_prompt(Some(persona), &self.tools.list());
        self
    }

    /// Replace the generated system prompt entirely.
    pub fn with_system_prompt(mut self, system_prompt: impl Into<String>) -> Self {
        self.system_prompt = system_prompt.into();
        self
    }

    pub fn with_confirmation(mut self, confirmation: Arc<dyn Confirmation>) -> Self {
        self.confirmation = confirmation;
        self
    }

    pub fn with_event_bus(mut self, event_bus: Arc<EventBus>) -> Self {
        self.event_bus = event_bus;
        self
    }

    pub fn system_prompt(&self) -> &str {
        &self.system_prompt
    }

    /// The turns exchanged so far in this session.
    pub fn history(&self) -> &[ConversationTurn] {
        &self.history
    }

    pub fn session_id(&self) -> Uuid {
        self.session_id
    }

    /// Forget the session history and start a new session.
    pub fn reset(&mut self) {
        self.history.clear();
        self.session_id = Uuid::new_v4();
    }

    /// Process a user message until the model stops asking for tools or the
    /// turn bound is reached.
    ///
    /// Tool failures never abort the loop; they are reported to the model in
    /// the follow-up. A provider failure is returned as-is.
    ///
    /// `max_turns` bounds provider calls. If the response at the bound still
    /// carries directives, they are not executed: the outcome is
    /// [`LoopState::AbortedMaxTurns`] with that raw response. A model that
    /// always calls tools therefore gets `max_turns` calls and
    /// `max_turns - 1` rounds of tool execution.
    pub async fn handle_chat(&mut self, message: &str) -> modai_core::Result<LoopOutcome> {
        info!(
            session_id = %self.session_id,
            provider = %self.provider.name(),
            history = self.history.len(),
            "Processing chat message"
        );

        let mut outgoing = prompt::first_message(message);
        let mut executions = Vec::new();
        let mut turn = 0;

        loop {
            let response = match self
                .provider
                .generate_response(&outgoing, &self.system_prompt, &self.history)
                .await
            {
                Ok(response) => response,
                Err(e) => {
                    self.event_bus.publish(DomainEvent::ErrorOccurred {
                        context: format!("provider {} at turn {}", self.provider.name(), turn + 1),
                        error_message: e.to_string(),
                        timestamp: Utc::now(),
                    });
                    return Err(e.into());
                }
            };
            turn += 1;

            self.history.push(ConversationTurn::user(outgoing));
            self.history.push(ConversationTurn::assistant(response.clone()));
            self.event_bus.publish(DomainEvent::ResponseGenerated {
                provider: self.provider.name().to_string(),
                turn,
                chars: response.chars().count(),
                timestamp: Utc::now(),
            });

            let directives = self.scan(&response);
            debug!(turn, directives = directives.len(), "Agent loop iteration");

            if directives.is_empty() {
                return Ok(LoopOutcome {
                    state: LoopState::Done,
                    response: modai_protocol::strip_all(&response),
                    turns: turn,
                    executions,
                });
            }

            if turn >= self.max_turns {
                warn!(
                    turns = turn,
                    pending = directives.len(),
                    "Max turns reached with directives still pending"
                );
                self.event_bus.publish(DomainEvent::TurnLimitReached {
                    turns: turn,
                    timestamp: Utc::now(),
                });
                return Ok(LoopOutcome {
                    state: LoopState::AbortedMaxTurns,
                    response,
                    turns: turn,
                    executions,
                });
            }

            let mut lines = Vec::with_capacity(directives.len());
            for directive in directives {
                let result = self.execute(&directive).await;
                lines.push(prompt::context_line(&directive, &result));
                executions.push(ToolExecution { directive, result });
            }

            outgoing = prompt::follow_up(&response, &lines);
        }
    }

    /// Extract directives in order, reporting every rejected candidate.
    fn scan(&self, response: &str) -> Vec<Directive> {
        let mut directives = Vec::new();
        for candidate in modai_protocol::candidates(response) {
            match candidate {
                Candidate::Accepted(accepted) => directives.push(accepted.directive),
                Candidate::Rejected(rejection) => self.report_rejection(response, &rejection),
            }
        }
        directives
    }

    fn report_rejection(&self, response: &str, rejection: &Rejection) {
        let tier = rejection.tier.map_or("scan", |t| t.as_str());
        let snippet = rejection.excerpt(response, 80);
        debug!(tier, reason = %rejection.reason, snippet, "Dropped directive candidate");
        self.event_bus.publish(DomainEvent::DirectiveRejected {
            tier: tier.to_string(),
            reason: rejection.reason.to_string(),
            snippet: snippet.to_string(),
            timestamp: Utc::now(),
        });
    }

    /// Run one directive. Always produces a result.
    async fn execute(&self, directive: &Directive) -> ToolResult {
        let name = directive.tool();
        let start = Instant::now();

        let result = if !self.confirmation.confirm(directive).await {
            info!(tool = %name, "Tool call declined");
            ToolResult::failure(CANCELLED)
        } else {
            match self.tools.get(name) {
                None => {
                    warn!(tool = %name, "Directive names an unknown tool");
                    ToolResult::failure(ToolError::NotFound(name.to_string()).to_string())
                }
                Some(tool) => match tool.execute(directive.arguments()).await {
                    Ok(result) => result,
                    Err(e) => {
                        warn!(tool = %name, error = %e, "Tool execution failed");
                        ToolResult::failure(e.to_string())
                    }
                },
            }
        };

        let duration_ms = start.elapsed().as_millis() as u64;
        debug!(tool = %name, success = result.success, duration_ms, "Directive executed");
        self.event_bus.publish(DomainEvent::ToolExecuted {
            tool_name: name.to_string(),
            success: result.success,
            duration_ms,
            timestamp: Utc::now(),
        });
        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use modai_core::error::ProviderError;
    use modai_core::tool::{Arguments, Tool};
    use serde_json::{Value, json};
    use std::collections::VecDeque;
    use std::sync::Mutex;

    const DICE_CALL: &str = r#"Rolling. {"protocol":"modai","tool":"roll","arguments":{"dice":"2d6"}}"#;

    /// Replays scripted responses and records every message it was sent.
    struct ScriptedProvider {
        responses: Mutex<VecDeque<String>>,
        fallback: Option<String>,
        seen: Mutex<Vec<(String, usize)>>,
    }

    impl ScriptedProvider {
        fn new(responses: &[&str]) -> Self {
            Self {
                responses: Mutex::new(responses.iter().map(|s| s.to_string()).collect()),
                fallback: None,
                seen: Mutex::new(Vec::new()),
            }
        }

        fn always(response: &str) -> Self {
            Self {
                fallback: Some(response.to_string()),
                ..Self::new(&[])
            }
        }

        fn messages(&self) -> Vec<String> {
            self.seen.lock().unwrap().iter().map(|(m, _)| m.clone()).collect()
        }

        fn calls(&self) -> usize {
            self.seen.lock().unwrap().len()
        }
    }

    #[async_trait]
    impl Provider for ScriptedProvider {
        fn name(&self) -> &str {
            "scripted"
        }

        async fn generate_response(
            &self,
            message: &str,
            _system_prompt: &str,
            history: &[ConversationTurn],
        ) -> Result<String, ProviderError> {
            self.seen
                .lock()
                .unwrap()
                .push((message.to_string(), history.len()));
            self.responses
                .lock()
                .unwrap()
                .pop_front()
                .or_else(|| self.fallback.clone())
                .ok_or_else(|| ProviderError::Network("script exhausted".into()))
        }
    }

    /// A tool with a fixed outcome that counts its calls.
    struct FixedTool {
        name: &'static str,
        outcome: fn(&Arguments) -> Result<ToolResult, ToolError>,
        calls: Arc<Mutex<Vec<Arguments>>>,
    }

    impl FixedTool {
        fn new(name: &'static str, outcome: fn(&Arguments) -> Result<ToolResult, ToolError>) -> Self {
            Self {
                name,
                outcome,
                calls: Arc::new(Mutex::new(Vec::new())),
            }
        }
    }

    #[async_trait]
    impl Tool for FixedTool {
        fn name(&self) -> &str {
            self.name
        }
        fn description(&self) -> &str {
            "test tool"
        }
        fn example(&self) -> Value {
            json!({})
        }
        async fn execute(&self, arguments: &Arguments) -> Result<ToolResult, ToolError> {
            self.calls.lock().unwrap().push(arguments.clone());
            (self.outcome)(arguments)
        }
    }

    fn seven(_: &Arguments) -> Result<ToolResult, ToolError> {
        Ok(ToolResult::ok(json!({ "total": 7 })))
    }

    fn registry_with(tool: FixedTool) -> Arc<ToolRegistry> {
        let mut registry = ToolRegistry::new();
        registry.register(Box::new(tool));
        Arc::new(registry)
    }

    struct DenyAll;

    #[async_trait]
    impl Confirmation for DenyAll {
        async fn confirm(&self, _directive: &Directive) -> bool {
            false
        }
    }

    #[test]
    fn persona_keeps_tool_protocol_in_prompt() {
        let provider = Arc::new(ScriptedProvider::new(&[]));
        let agent = AgentLoop::new(provider, registry_with(FixedTool::new("roll", seven)))
            .with_persona("You are a dungeon master.");
        let prompt = agent.system_prompt();
        assert!(prompt.starts_with("You are a dungeon master."));
        assert!(prompt.contains(r#""protocol":"modai""#));
        assert!(prompt.contains("### roll"));
    }

    #[tokio::test]
    async fn plain_answer_is_done_at_turn_one() {
        let provider = Arc::new(ScriptedProvider::new(&["Hello! How can I help?"]));
        let mut agent = AgentLoop::new(provider.clone(), Arc::new(ToolRegistry::new()));

        let outcome = agent.handle_chat("Hello!").await.unwrap();
        assert_eq!(outcome.state, LoopState::Done);
        assert_eq!(outcome.response, "Hello! How can I help?");
        assert_eq!(outcome.turns, 1);
        assert!(outcome.executions.is_empty());
        assert_eq!(agent.history().len(), 2);
        assert!(provider.messages()[0].starts_with("Hello!"));
    }

    #[tokio::test]
    async fn directive_then_answer_is_done_at_turn_two() {
        let provider = Arc::new(ScriptedProvider::new(&[DICE_CALL, "You rolled a 7."]));
        let tool = FixedTool::new("roll", seven);
        let calls = tool.calls.clone();
        let mut agent = AgentLoop::new(provider.clone(), registry_with(tool));

        let outcome = agent.handle_chat("roll 2d6").await.unwrap();
        assert_eq!(outcome.state, LoopState::Done);
        assert_eq!(outcome.turns, 2);
        assert_eq!(outcome.response, "You rolled a 7.");
        assert_eq!(outcome.executions.len(), 1);
        assert_eq!(outcome.executions[0].directive.tool(), "roll");
        assert_eq!(calls.lock().unwrap()[0]["dice"], json!("2d6"));

        let follow_up = &provider.messages()[1];
        assert!(follow_up.contains(DICE_CALL));
        assert!(follow_up.contains(r#"Tool `roll` called with {"dice":"2d6"} -> result: {"total":7}"#));
    }

    #[tokio::test]
    async fn endless_directives_abort_at_max_turns() {
        let provider = Arc::new(ScriptedProvider::always(DICE_CALL));
        let tool = FixedTool::new("roll", seven);
        let calls = tool.calls.clone();
        let bus = Arc::new(EventBus::new(64));
        let mut events = bus.subscribe();
        let mut agent = AgentLoop::new(provider.clone(), registry_with(tool)).with_event_bus(bus);

        let outcome = agent.handle_chat("roll forever").await.unwrap();
        assert_eq!(outcome.state, LoopState::AbortedMaxTurns);
        assert!(outcome.is_truncated());
        assert_eq!(outcome.turns, DEFAULT_MAX_TURNS);
        assert_eq!(outcome.response, DICE_CALL);
        assert_eq!(provider.calls(), DEFAULT_MAX_TURNS);
        assert_eq!(calls.lock().unwrap().len(), DEFAULT_MAX_TURNS - 1);

        let mut limit_hit = false;
        while let Ok(event) = events.try_recv() {
            if let DomainEvent::TurnLimitReached { turns, .. } = event.as_ref() {
                assert_eq!(*turns, DEFAULT_MAX_TURNS);
                limit_hit = true;
            }
        }
        assert!(limit_hit);
    }

    #[tokio::test]
    async fn custom_turn_bound() {
        let provider = Arc::new(ScriptedProvider::always(DICE_CALL));
        let mut agent = AgentLoop::new(provider.clone(), registry_with(FixedTool::new("roll", seven)))
            .with_max_turns(2);

        let outcome = agent.handle_chat("go").await.unwrap();
        assert_eq!(outcome.state, LoopState::AbortedMaxTurns);
        assert_eq!(provider.calls(), 2);
    }

    #[tokio::test]
    async fn failed_results_reach_the_follow_up() {
        fn boom(_: &Arguments) -> Result<ToolResult, ToolError> {
            Ok(ToolResult::failure("boom"))
        }
        let provider = Arc::new(ScriptedProvider::new(&[DICE_CALL, "That failed."]));
        let mut agent = AgentLoop::new(provider.clone(), registry_with(FixedTool::new("roll", boom)));

        let outcome = agent.handle_chat("roll").await.unwrap();
        assert_eq!(outcome.state, LoopState::Done);
        assert!(!outcome.executions[0].result.success);
        assert!(provider.messages()[1].contains("-> error: boom"));
    }

    #[tokio::test]
    async fn tool_errors_are_normalised() {
        fn explode(_: &Arguments) -> Result<ToolResult, ToolError> {
            Err(ToolError::ExecutionFailed {
                tool_name: "roll".into(),
                reason: "dice fell off the table".into(),
            })
        }
        let provider = Arc::new(ScriptedProvider::new(&[DICE_CALL, "ok"]));
        let mut agent =
            AgentLoop::new(provider.clone(), registry_with(FixedTool::new("roll", explode)));

        let outcome = agent.handle_chat("roll").await.unwrap();
        let result = &outcome.executions[0].result;
        assert!(!result.success);
        assert_eq!(
            result.error.as_deref(),
            Some("Tool execution failed: roll: dice fell off the table")
        );
        assert!(provider.messages()[1].contains("dice fell off the table"));
    }

    #[tokio::test]
    async fn unknown_tool_is_a_failed_result() {
        let response = r#"{"protocol":"modai","tool":"teleport","arguments":{"to":"mars"}}"#;
        let provider = Arc::new(ScriptedProvider::new(&[response, "Can't do that."]));
        let mut agent = AgentLoop::new(provider.clone(), Arc::new(ToolRegistry::new()));

        let outcome = agent.handle_chat("go to mars").await.unwrap();
        assert_eq!(
            outcome.executions[0].result.error.as_deref(),
            Some("Unknown tool: teleport")
        );
        assert_eq!(outcome.response, "Can't do that.");
    }

    #[tokio::test]
    async fn declined_confirmation_skips_the_tool() {
        let provider = Arc::new(ScriptedProvider::new(&[DICE_CALL, "Okay, not rolling."]));
        let tool = FixedTool::new("roll", seven);
        let calls = tool.calls.clone();
        let mut agent = AgentLoop::new(provider.clone(), registry_with(tool))
            .with_confirmation(Arc::new(DenyAll));

        let outcome = agent.handle_chat("roll").await.unwrap();
        assert!(calls.lock().unwrap().is_empty());
        assert_eq!(
            outcome.executions[0].result.error.as_deref(),
            Some("Cancelled by user")
        );
        assert!(provider.messages()[1].contains("error: Cancelled by user"));
    }

    #[tokio::test]
    async fn directives_run_in_extraction_order() {
        let response = concat!(
            r#"{"protocol":"modai","tool":"roll","arguments":{"n":1}}"#,
            r#"{"protocol":"modai","tool":"roll","arguments":{"n":2}}"#,
            r#" and {"protocol":"modai","tool":"roll","arguments":{"n":3}}"#,
        );
        let provider = Arc::new(ScriptedProvider::new(&[response, "done"]));
        let tool = FixedTool::new("roll", seven);
        let calls = tool.calls.clone();
        let mut agent = AgentLoop::new(provider.clone(), registry_with(tool));

        agent.handle_chat("roll thrice").await.unwrap();
        let order: Vec<Value> = calls.lock().unwrap().iter().map(|a| a["n"].clone()).collect();
        assert_eq!(order, vec![json!(1), json!(2), json!(3)]);

        let follow_up = &provider.messages()[1];
        let first = follow_up.find(r#"{"n":1}"#).unwrap();
        let third = follow_up.find(r#"{"n":3}"#).unwrap();
        assert!(first < third);
    }

    #[tokio::test]
    async fn provider_errors_propagate() {
        let provider = Arc::new(ScriptedProvider::new(&[]));
        let mut agent = AgentLoop::new(provider, Arc::new(ToolRegistry::new()));

        let err = agent.handle_chat("hi").await.unwrap_err();
        assert!(matches!(
            err,
            modai_core::Error::Provider(ProviderError::Network(_))
        ));
        assert!(agent.history().is_empty());
    }

    #[tokio::test]
    async fn final_answer_is_stripped_of_half_formed_directives() {
        let response = r#"All done. {"protocol":"modai","tool":"exec"}"#;
        let provider = Arc::new(ScriptedProvider::new(&[response]));
        let mut agent = AgentLoop::new(provider, Arc::new(ToolRegistry::new()));

        let outcome = agent.handle_chat("anything").await.unwrap();
        assert_eq!(outcome.state, LoopState::Done);
        assert_eq!(outcome.response, "All done.");
    }

    #[tokio::test]
    async fn rejections_are_published() {
        let response = r#"Hmm {"protocol":"modai","tool":"exec"} anyway"#;
        let provider = Arc::new(ScriptedProvider::new(&[response]));
        let bus = Arc::new(EventBus::new(16));
        let mut events = bus.subscribe();
        let mut agent =
            AgentLoop::new(provider, Arc::new(ToolRegistry::new())).with_event_bus(bus);

        agent.handle_chat("x").await.unwrap();
        let mut rejected = Vec::new();
        while let Ok(event) = events.try_recv() {
            if let DomainEvent::DirectiveRejected { reason, .. } = event.as_ref() {
                rejected.push(reason.clone());
            }
        }
        assert_eq!(rejected.len(), 1);
    }

    #[tokio::test]
    async fn history_carries_across_chats_until_reset() {
        let provider = Arc::new(ScriptedProvider::new(&[DICE_CALL, "7", "Hi again"]));
        let mut agent = AgentLoop::new(provider.clone(), registry_with(FixedTool::new("roll", seven)));

        agent.handle_chat("roll").await.unwrap();
        assert_eq!(agent.history().len(), 4);

        agent.handle_chat("hello").await.unwrap();
        assert_eq!(agent.history().len(), 6);
        let seen: Vec<usize> = provider.seen.lock().unwrap().iter().map(|(_, h)| *h).collect();
        assert_eq!(seen, vec![0, 2, 4]);

        let before = agent.session_id();
        agent.reset();
        assert!(agent.history().is_empty());
        assert_ne!(agent.session_id(), before);
    }
}
