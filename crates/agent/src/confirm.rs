//! Confirmation gate run before each directive executes.

use async_trait::async_trait;
use modai_protocol::Directive;

/// Decides whether a directive may run.
///
/// Returning `false` skips the tool; the loop records a failed result
/// with the error `Cancelled by user`.
#[async_trait]
pub trait Confirmation: Send + Sync {
    async fn confirm(&self, directive: &Directive) -> bool;
}

/// Approves everything. Used for non-interactive runs.
#[derive(Debug, Clone, Copy, Default)]
pub struct AutoApprove;

#[async_trait]
impl Confirmation for AutoApprove {
    async fn confirm(&self, _directive: &Directive) -> bool {
        true
    }
}
