// src/task/context.rs

//! Context handed to a running task body.

use std::any::Any;
use std::fmt;
use std::panic::{AssertUnwindSafe, catch_unwind};
use std::sync::Arc;

use anyhow::anyhow;
use tokio_util::sync::CancellationToken;
use tracing::{debug, trace};

use super::lifecycle::Completion;
use super::work::TaskBody;
use super::{Task, TaskState};

/// Handle given to a task body for one execution of the task.
///
/// Completions made through a context only apply to the execution it was
/// created for. If the task was cancelled and retried in the meantime, a late
/// `finish*` / `fail_with_error` from the old body is discarded.
#[derive(Clone)]
pub struct TaskContext {
    task: Task,
    execution: u64,
    token: CancellationToken,
}

impl TaskContext {
    pub(crate) fn new(task: Task, execution: u64, token: CancellationToken) -> Self {
        Self {
            task,
            execution,
            token,
        }
    }

    pub fn task(&self) -> &Task {
        &self.task
    }

    pub fn name(&self) -> &str {
        self.task.name()
    }

    /// Number of this execution (1 for the first start, +1 per restart).
    pub fn execution(&self) -> u64 {
        self.execution
    }

    /// Whether the task was cancelled since this execution began.
    ///
    /// Bodies should check this at safe points and stop early.
    pub fn is_cancelled(&self) -> bool {
        self.token.is_cancelled()
    }

    /// Resolves once the task is cancelled. For async bodies.
    pub async fn cancelled(&self) {
        self.token.cancelled().await
    }

    pub fn cancellation_token(&self) -> CancellationToken {
        self.token.clone()
    }

    /// Finish with no result.
    pub fn finish(&self) -> bool {
        self.task
            .complete(Completion::Finished(None), Some(self.execution))
    }

    /// Finish with the given result.
    pub fn finish_with_result<T: Any + Send + Sync>(&self, result: T) -> bool {
        self.task.complete(
            Completion::Finished(Some(Arc::new(result))),
            Some(self.execution),
        )
    }

    /// Fail with the given error.
    pub fn fail_with_error(&self, error: impl Into<anyhow::Error>) -> bool {
        self.task.complete(
            Completion::Failed(Arc::new(error.into())),
            Some(self.execution),
        )
    }

    /// Entry point of the work submitted to the executor.
    pub(crate) fn run(self) {
        {
            let cell = self.task.inner.cell.lock();
            if cell.state != TaskState::Executing || cell.execution != self.execution {
                debug!(
                    task = %self.task.name(),
                    execution = self.execution,
                    state = ?cell.state,
                    "execution superseded before its body ran; skipping"
                );
                return;
            }
        }

        trace!(
            task = %self.task.name(),
            execution = self.execution,
            body = self.task.inner.body.kind(),
            "running task body"
        );

        match &self.task.inner.body {
            TaskBody::Immediate => {
                self.finish();
            }
            TaskBody::Condition(condition) => {
                if condition.is_fulfilled() {
                    self.finish();
                } else {
                    debug!(task = %self.task.name(), "waiting for external condition");
                }
            }
            TaskBody::Work(work) => {
                let work = Arc::clone(work);
                let ctx = self.clone();
                if let Err(panic) = catch_unwind(AssertUnwindSafe(move || work.run(ctx))) {
                    let message = panic_message(panic.as_ref());
                    self.fail_with_error(anyhow!("task body panicked: {message}"));
                }
            }
        }
    }
}

impl fmt::Debug for TaskContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TaskContext")
            .field("task", &self.task.name())
            .field("execution", &self.execution)
            .field("cancelled", &self.is_cancelled())
            .finish()
    }
}

fn panic_message(panic: &(dyn Any + Send)) -> String {
    if let Some(s) = panic.downcast_ref::<&'static str>() {
        (*s).to_string()
    } else if let Some(s) = panic.downcast_ref::<String>() {
        s.clone()
    } else {
        "non-string panic payload".to_string()
    }
}
