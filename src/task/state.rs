// src/task/state.rs

//! Task states and the per-task mutable cell guarded by the task's lock.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::Serialize;
use tokio_util::sync::CancellationToken;

use super::{TaskError, TaskOutput};

/// State of a task.
///
/// ```text
///   (new) ──► Ready ◄──── Pending ◄── add_task with prerequisites
///               │  all prerequisites finished ┘
///             start
///               ▼
///           Executing ──► Finished | Failed
///
///   Pending/Ready/Executing ──cancel──► Cancelled
///   Pending/Ready/Cancelled/Failed ──retry──► Pending | Ready (+ start)
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum TaskState {
    /// Some prerequisite has not finished successfully yet.
    Pending,
    /// All prerequisites finished; the task may be started.
    Ready,
    /// The body has been handed to the executor.
    Executing,
    /// Marked cancelled; a running body is expected to notice and stop.
    Cancelled,
    /// The body reported success.
    Finished,
    /// The body reported failure.
    Failed,
}

impl TaskState {
    /// Cancelled, Finished or Failed.
    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            TaskState::Cancelled | TaskState::Finished | TaskState::Failed
        )
    }

    pub(crate) fn can_cancel(self) -> bool {
        matches!(
            self,
            TaskState::Pending | TaskState::Ready | TaskState::Executing
        )
    }

    pub(crate) fn can_retry(self) -> bool {
        matches!(
            self,
            TaskState::Pending | TaskState::Ready | TaskState::Cancelled | TaskState::Failed
        )
    }

    pub fn as_str(self) -> &'static str {
        match self {
            TaskState::Pending => "pending",
            TaskState::Ready => "ready",
            TaskState::Executing => "executing",
            TaskState::Cancelled => "cancelled",
            TaskState::Finished => "finished",
            TaskState::Failed => "failed",
        }
    }
}

impl fmt::Display for TaskState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Terminal payload of one execution.
#[derive(Clone)]
pub(crate) enum Outcome {
    Finished(Option<TaskOutput>),
    Failed(TaskError),
}

/// Everything about a task that changes after construction, behind one lock.
pub(crate) struct TaskCell {
    pub(crate) state: TaskState,
    pub(crate) outcome: Option<Outcome>,
    pub(crate) finish_date: Option<DateTime<Utc>>,
    /// Incremented on every transition into `Executing`.
    pub(crate) execution: u64,
    /// Token of the current (or most recent) execution.
    pub(crate) cancel_token: CancellationToken,
}

impl TaskCell {
    pub(crate) fn new() -> Self {
        Self {
            state: TaskState::Ready,
            outcome: None,
            finish_date: None,
            execution: 0,
            cancel_token: CancellationToken::new(),
        }
    }

    /// Forget the previous terminal cycle.
    pub(crate) fn clear_outcome(&mut self) {
        self.outcome = None;
        self.finish_date = None;
    }

    /// Open a new execution and return its number and cancellation token.
    pub(crate) fn begin_execution(&mut self) -> (u64, CancellationToken) {
        self.state = TaskState::Executing;
        self.clear_outcome();
        self.execution += 1;
        self.cancel_token = CancellationToken::new();
        (self.execution, self.cancel_token.clone())
    }
}
