//! # modai Core
//!
//! Domain types, traits, and error definitions for the modai agent.
//! This crate defines the seams that every other crate implements against:
//!
//! - [`Provider`]: a text-generation backend producing one assistant message
//! - [`Tool`]: a side-effecting capability invoked by a directive
//! - [`ToolRegistry`]: name → tool lookup plus the listing used for prompts
//!
//! Concrete providers live in `modai-providers`, concrete tools in
//! `modai-tools`. Tests swap in stubs without touching the loop.

pub mod error;
pub mod event;
pub mod message;
pub mod provider;
pub mod tool;

// Re-export key types at crate root for ergonomics
pub use error::{Error, PluginError, ProviderError, Result, ToolError};
pub use event::{DomainEvent, EventBus};
pub use message::{ConversationTurn, Role};
pub use provider::Provider;
pub use tool::{Arguments, Tool, ToolInfo, ToolRegistry, ToolResult};
