//! Anthropic native provider implementation.
//!
//! Uses Anthropic's Messages API directly (not OpenAI-compatible proxy):
//! `x-api-key` authentication, the `anthropic-version` header, and the
//! system prompt as a top-level field.

use async_trait::async_trait;
use modai_core::error::ProviderError;
use modai_core::message::ConversationTurn;
use modai_core::provider::Provider;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::{GenerationSettings, check_status, send_error};

const ANTHROPIC_VERSION: &str = "2023-06-01";
const DEFAULT_BASE_URL: &str = "https://api.anthropic.com";
const DEFAULT_MODEL: &str = "claude-sonnet-4-20250514";

/// Anthropic native Messages API provider.
pub struct AnthropicProvider {
    base_url: String,
    api_key: String,
    settings: GenerationSettings,
    client: reqwest::Client,
}

impl AnthropicProvider {
    /// Create a new Anthropic provider.
    pub fn new(api_key: impl Into<String>) -> Self {
        let client = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(300))
            .build()
            .expect("Failed to create HTTP client");

        Self {
            base_url: DEFAULT_BASE_URL.into(),
            api_key: api_key.into(),
            settings: GenerationSettings {
                model: DEFAULT_MODEL.into(),
                ..GenerationSettings::default()
            },
            client,
        }
    }

    /// Create with a custom base URL (e.g., for testing or proxies).
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    pub fn with_settings(mut self, settings: GenerationSettings) -> Self {
        self.settings = settings;
        self
    }

    /// History plus the new message, with adjacent same-role turns merged
    /// because the Messages API requires strict user/assistant alternation.
    fn to_api_messages<'a>(message: &'a str, history: &'a [ConversationTurn]) -> Vec<ApiMessage> {
        let turns = history
            .iter()
            .map(|t| (t.role.as_str(), t.content.as_str()))
            .chain(std::iter::once(("user", message)));

        let mut messages: Vec<ApiMessage> = Vec::new();
        for (role, content) in turns {
            match messages.last_mut() {
                Some(last) if last.role == role => {
                    last.content.push_str("\n\n");
                    last.content.push_str(content);
                }
                _ => messages.push(ApiMessage {
                    role: role.to_string(),
                    content: content.to_string(),
                }),
            }
        }
        messages
    }
}

#[async_trait]
impl Provider for AnthropicProvider {
    fn name(&self) -> &str {
        "anthropic"
    }

    async fn generate_response(
        &self,
        message: &str,
        system_prompt: &str,
        history: &[ConversationTurn],
    ) -> Result<String, ProviderError> {
        let url = format!("{}/v1/messages", self.base_url);

        let body = ApiRequest {
            model: &self.settings.model,
            max_tokens: self.settings.max_tokens,
            temperature: self.settings.temperature,
            system: (!system_prompt.is_empty()).then_some(system_prompt),
            messages: Self::to_api_messages(message, history),
        };

        debug!(model = %self.settings.model, turns = history.len(), "Sending Anthropic request");

        let response = self
            .client
            .post(&url)
            .header("x-api-key", &self.api_key)
            .header("anthropic-version", ANTHROPIC_VERSION)
            .json(&body)
            .send()
            .await
            .map_err(send_error)?;

        let response = check_status(response).await?;

        let api_response: ApiResponse = response
            .json()
            .await
            .map_err(|e| ProviderError::InvalidResponse(format!("Failed to parse response: {e}")))?;

        let text: Vec<String> = api_response
            .content
            .into_iter()
            .filter_map(|block| match block {
                ContentBlock::Text { text } => Some(text),
                ContentBlock::Other => None,
            })
            .collect();

        if text.is_empty() {
            return Err(ProviderError::InvalidResponse(
                "No text content in response".into(),
            ));
        }
        Ok(text.concat())
    }
}

// --- Anthropic API wire types ---

#[derive(Serialize)]
struct ApiRequest<'a> {
    model: &'a str,
    max_tokens: u32,
    temperature: f32,
    #[serde(skip_serializing_if = "Option::is_none")]
    system: Option<&'a str>,
    messages: Vec<ApiMessage>,
}

#[derive(Debug, Serialize)]
struct ApiMessage {
    role: String,
    content: String,
}

#[derive(Deserialize)]
struct ApiResponse {
    content: Vec<ContentBlock>,
}

#[derive(Deserialize)]
#[serde(tag = "type")]
enum ContentBlock {
    #[serde(rename = "text")]
    Text { text: String },
    #[serde(other)]
    Other,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use wiremock::matchers::{body_partial_json, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[test]
    fn merges_adjacent_user_turns() {
        let history = vec![
            ConversationTurn::user("first"),
            ConversationTurn::assistant("reply"),
            ConversationTurn::user("dangling"),
        ];
        let messages = AnthropicProvider::to_api_messages("next", &history);
        assert_eq!(messages.len(), 3);
        assert_eq!(messages[2].role, "user");
        assert_eq!(messages[2].content, "dangling\n\nnext");
    }

    #[tokio::test]
    async fn sends_system_top_level_and_joins_text_blocks() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1/messages"))
            .and(header("x-api-key", "sk-ant"))
            .and(header("anthropic-version", ANTHROPIC_VERSION))
            .and(body_partial_json(json!({
                "system": "be terse",
                "messages": [{ "role": "user", "content": "hello" }]
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "content": [
                    { "type": "text", "text": "Hello" },
                    { "type": "thinking", "thinking": "hmm" },
                    { "type": "text", "text": ", world" }
                ]
            })))
            .mount(&server)
            .await;

        let provider = AnthropicProvider::new("sk-ant").with_base_url(server.uri());
        let reply = provider
            .generate_response("hello", "be terse", &[])
            .await
            .unwrap();
        assert_eq!(reply, "Hello, world");
    }

    #[tokio::test]
    async fn rate_limit_honours_retry_after() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(429).insert_header("retry-after", "17"))
            .mount(&server)
            .await;

        let provider = AnthropicProvider::new("sk-ant").with_base_url(server.uri());
        let err = provider.generate_response("hi", "", &[]).await.unwrap_err();
        assert!(matches!(err, ProviderError::RateLimited { retry_after_secs: 17 }));
    }

    #[tokio::test]
    async fn response_without_text_is_invalid() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "content": [] })))
            .mount(&server)
            .await;

        let provider = AnthropicProvider::new("sk-ant").with_base_url(server.uri());
        let err = provider.generate_response("hi", "", &[]).await.unwrap_err();
        assert!(matches!(err, ProviderError::InvalidResponse(_)));
    }
}
