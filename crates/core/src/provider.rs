//! Provider trait: the abstraction over text-generation backends.
//!
//! A Provider turns a message, a system prompt, and the prior history into
//! one new assistant message. Tool calls are not a provider concern: they
//! travel inside the returned text and are recovered by `modai-protocol`.
//!
//! Implementations: OpenAI-compatible endpoints, Anthropic.

use async_trait::async_trait;

use crate::error::ProviderError;
use crate::message::ConversationTurn;

/// The core Provider trait.
///
/// Implementations must fail loudly: a transport or API failure is an
/// `Err`, never an empty or sentinel string.
#[async_trait]
pub trait Provider: Send + Sync {
    /// A human-readable name for this provider (e.g., "openrouter", "anthropic").
    fn name(&self) -> &str;

    /// Generate the next assistant message.
    ///
    /// `history` holds the turns that precede `message`; `message` itself is
    /// not yet part of it.
    async fn generate_response(
        &self,
        message: &str,
        system_prompt: &str,
        history: &[ConversationTurn],
    ) -> Result<String, ProviderError>;
}
