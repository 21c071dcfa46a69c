//! Compensating rollback for multi-step remote provisioning.
//!
//! An `OrchestrationContext` owns an append-only stack of
//! `CompensationAction`s. Each action is registered right after the forward
//! step it undoes has succeeded, with the identifiers that step produced
//! captured by value. When the workflow exits without `mark_success()` the
//! stack is unwound last-in first-out; a failing reversal is logged and the
//! unwind moves on to the next one.
//!
//! Exit paths:
//! - `finish(outcome)` on the normal path (Ok or Err), returning `outcome`
//!   unchanged after any unwind.
//! - `Drop` when the owning future is cancelled before `finish` ran. The
//!   pending actions are moved onto the current Tokio runtime and unwound in
//!   a background task.

use crate::error::Result;
use futures::future::BoxFuture;
use std::future::Future;

/// Deferred reversal of one forward step.
pub type Reversal = Box<dyn FnOnce() -> BoxFuture<'static, Result<()>> + Send>;

// ---------------------------------------------------------------------------
// CompensationAction
// ---------------------------------------------------------------------------

pub struct CompensationAction {
    description: String,
    reversal: Reversal,
}

impl CompensationAction {
    pub fn new<F, Fut>(description: impl Into<String>, reversal: F) -> Self
    where
        F: FnOnce() -> Fut + Send + 'static,
        Fut: Future<Output = Result<()>> + Send + 'static,
    {
        Self {
            description: description.into(),
            reversal: Box::new(move || Box::pin(reversal())),
        }
    }

    pub fn description(&self) -> &str {
        &self.description
    }

    async fn run(self) -> Result<()> {
        (self.reversal)().await
    }
}

impl std::fmt::Debug for CompensationAction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CompensationAction")
            .field("description", &self.description)
            .finish_non_exhaustive()
    }
}

// ---------------------------------------------------------------------------
// UnwindReport
// ---------------------------------------------------------------------------

/// What an unwind pass did, in execution order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UnwindReport {
    pub reverted: Vec<String>,
    pub failed: Vec<String>,
}

impl UnwindReport {
    pub fn attempted(&self) -> usize {
        self.reverted.len() + self.failed.len()
    }
}

/// Pops one action at a time, so whatever has not run yet stays owned by
/// `actions` if the caller is dropped mid-unwind.
async fn unwind_actions(label: &str, actions: &mut Vec<CompensationAction>) -> UnwindReport {
    let mut report = UnwindReport::default();
    if actions.is_empty() {
        return report;
    }
    tracing::warn!(
        workflow = %label,
        pending = actions.len(),
        "rolling back provisioning"
    );
    while let Some(action) = actions.pop() {
        let description = action.description.clone();
        tracing::info!(workflow = %label, "rollback: {description}");
        match action.run().await {
            Ok(()) => report.reverted.push(description),
            Err(e) => {
                tracing::error!(
                    workflow = %label,
                    error = %e,
                    "rollback step failed: {description}"
                );
                report.failed.push(description);
            }
        }
    }
    report
}

// ---------------------------------------------------------------------------
// OrchestrationContext
// ---------------------------------------------------------------------------

pub struct OrchestrationContext {
    label: String,
    actions: Vec<CompensationAction>,
    success: bool,
}

impl OrchestrationContext {
    pub fn new(label: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            actions: Vec::new(),
            success: false,
        }
    }

    /// Push the reversal of a forward step that has just succeeded.
    pub fn register<F, Fut>(&mut self, description: impl Into<String>, reversal: F)
    where
        F: FnOnce() -> Fut + Send + 'static,
        Fut: Future<Output = Result<()>> + Send + 'static,
    {
        let action = CompensationAction::new(description, reversal);
        tracing::debug!(workflow = %self.label, "registered compensation: {}", action.description);
        self.actions.push(action);
    }

    /// Declare the workflow complete. No unwind happens after this.
    pub fn mark_success(&mut self) {
        self.success = true;
    }

    pub fn is_success(&self) -> bool {
        self.success
    }

    pub fn pending(&self) -> usize {
        self.actions.len()
    }

    /// Descriptions in registration order.
    pub fn descriptions(&self) -> Vec<&str> {
        self.actions.iter().map(|a| a.description()).collect()
    }

    /// Run every registered reversal, most recent first. Failures are logged
    /// and do not stop the remaining reversals.
    pub async fn unwind(&mut self) -> UnwindReport {
        unwind_actions(&self.label, &mut self.actions).await
    }

    /// Exit hook for the normal path. Unwinds unless `mark_success()` was
    /// called, then hands back `outcome` untouched.
    pub async fn finish<T>(mut self, outcome: Result<T>) -> Result<T> {
        if self.success {
            self.actions.clear();
        } else {
            let report = self.unwind().await;
            if !report.failed.is_empty() {
                tracing::warn!(
                    workflow = %self.label,
                    failed = report.failed.len(),
                    "rollback incomplete; resources may need manual cleanup"
                );
            }
        }
        outcome
    }
}

impl Drop for OrchestrationContext {
    fn drop(&mut self) {
        if self.success || self.actions.is_empty() {
            return;
        }
        let mut actions = std::mem::take(&mut self.actions);
        let label = std::mem::take(&mut self.label);
        match tokio::runtime::Handle::try_current() {
            Ok(handle) => {
                tracing::warn!(workflow = %label, "provisioning interrupted; unwinding in background");
                handle.spawn(async move {
                    unwind_actions(&label, &mut actions).await;
                });
            }
            Err(_) => {
                for action in actions.iter().rev() {
                    tracing::error!(
                        workflow = %label,
                        "no runtime to roll back; abandoned: {}",
                        action.description
                    );
                }
            }
        }
    }
}
