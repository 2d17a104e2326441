// src/task/delegate.rs

//! Per-task observer interface.

use tracing::{info, warn};

use super::{Task, TaskError, TaskOutput};

/// Optional observer of a task's terminal transitions.
///
/// Both callbacks default to doing nothing. They run synchronously on the
/// thread that completed the task, after the state and payload are recorded
/// and before dependents are examined, so they should return promptly.
///
/// Tasks hold their delegate weakly; keep the `Arc` alive for as long as
/// notifications are wanted.
pub trait TaskDelegate: Send + Sync {
    /// The task finished successfully with the given (optional) result.
    fn on_finished(&self, task: &Task, result: Option<&TaskOutput>) {
        let _ = (task, result);
    }

    /// The task failed with the given error.
    fn on_failed(&self, task: &Task, error: &TaskError) {
        let _ = (task, error);
    }
}

/// Delegate that reports outcomes through `tracing`.
///
/// Used by the CLI so every task gets a log line in addition to the summary.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingDelegate;

impl TaskDelegate for TracingDelegate {
    fn on_finished(&self, task: &Task, _result: Option<&TaskOutput>) {
        info!(task = %task.name(), "task finished");
    }

    fn on_failed(&self, task: &Task, error: &TaskError) {
        warn!(task = %task.name(), error = %error, "task failed");
    }
}
