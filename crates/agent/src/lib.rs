//! The agentic loop for modai.
//!
//! One [`AgentLoop`] owns one conversation session and runs a bounded cycle:
//!
//! 1. **Generate**: ask the provider for the next response
//! 2. **Extract**: pull embedded directives out of the text
//! 3. **Execute**: run them one at a time, in the order they appear
//! 4. **Feed back**: send the results as a follow-up and go to step 1
//!
//! The cycle ends when a response carries no directives, or when the turn
//! bound is reached while the model is still asking for tools.

pub mod confirm;
pub mod loop_runner;
pub mod prompt;

pub use confirm::{AutoApprove, Confirmation};
pub use loop_runner::{AgentLoop, DEFAULT_MAX_TURNS, LoopOutcome, LoopState, ToolExecution};
