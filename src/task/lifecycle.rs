// src/task/lifecycle.rs

//! Task state transitions.
//!
//! Each task's `TaskCell` lock is the unit of mutual exclusion. A transition
//! may read prerequisite states while holding its own lock (prerequisite
//! locks are taken downstream-to-upstream only), and never holds its lock
//! while calling into the executor, a delegate, or another task's transition.

use std::any::Any;
use std::sync::Arc;

use chrono::Utc;
use tracing::{debug, info, trace, warn};

use super::context::TaskContext;
use super::propagation;
use super::state::Outcome;
use super::{Task, TaskError, TaskOutput, TaskState};

/// Completion requested by a body (or directly by a caller).
pub(crate) enum Completion {
    Finished(Option<TaskOutput>),
    Failed(TaskError),
}

impl Task {
    /// Hand the task's body to its graph's executor, if the task is `Ready`.
    ///
    /// Returns whether this call moved the task to `Executing`. Concurrent
    /// calls on the same task never both succeed.
    pub fn start(&self) -> bool {
        let Some(graph) = self.graph_shared() else {
            warn!(task = %self.name(), "start ignored; task is not part of a live graph");
            return false;
        };

        let (execution, token) = {
            let mut cell = self.inner.cell.lock();
            if cell.state != TaskState::Ready {
                trace!(task = %self.name(), state = ?cell.state, "start ignored; task not ready");
                return false;
            }
            cell.begin_execution()
        };

        debug!(
            task = %self.name(),
            graph = %graph.name(),
            execution,
            "task executing"
        );
        graph.notify_progress();

        let ctx = TaskContext::new(self.clone(), execution, token);
        graph.executor().submit(Box::new(move || ctx.run()));
        true
    }

    /// Mark this task and everything downstream of it as cancelled.
    ///
    /// Only Pending, Ready and Executing tasks change state, but the walk
    /// continues through every dependent regardless. A running body is not
    /// interrupted; it observes the cancellation through its context.
    pub fn cancel(&self) {
        propagation::cancel_from([self.clone()]);
    }

    /// Reset this task (if Pending, Ready, Cancelled or Failed) and everything
    /// downstream of it. Tasks whose prerequisites have all finished become
    /// Ready and start; the rest become Pending.
    pub fn retry(&self) {
        propagation::retry_from([self.clone()]);
    }

    /// Finish the current execution with no result.
    ///
    /// Only the first completion while `Executing` has any effect; returns
    /// whether this call was it.
    pub fn finish(&self) -> bool {
        self.complete(Completion::Finished(None), None)
    }

    /// Finish the current execution with a result.
    pub fn finish_with_result<T: Any + Send + Sync>(&self, result: T) -> bool {
        self.complete(Completion::Finished(Some(Arc::new(result))), None)
    }

    /// Fail the current execution.
    pub fn fail_with_error(&self, error: impl Into<anyhow::Error>) -> bool {
        self.complete(Completion::Failed(Arc::new(error.into())), None)
    }

    /// Record a terminal outcome, notify the delegate, then wake dependents.
    ///
    /// With `execution = Some(n)` the completion only applies to execution `n`.
    pub(crate) fn complete(&self, completion: Completion, execution: Option<u64>) -> bool {
        let now = Utc::now();
        let graph = self.graph_shared();
        let _transition = graph.as_ref().map(|g| g.begin_transition());
        {
            let mut cell = self.inner.cell.lock();
            if cell.state != TaskState::Executing {
                debug!(
                    task = %self.name(),
                    state = ?cell.state,
                    "completion discarded; task is not executing"
                );
                return false;
            }
            if let Some(execution) = execution {
                if execution != cell.execution {
                    debug!(
                        task = %self.name(),
                        stale = execution,
                        current = cell.execution,
                        "completion discarded; it belongs to an earlier execution"
                    );
                    return false;
                }
            }

            let (state, outcome) = match &completion {
                Completion::Finished(result) => {
                    (TaskState::Finished, Outcome::Finished(result.clone()))
                }
                Completion::Failed(error) => {
                    (TaskState::Failed, Outcome::Failed(Arc::clone(error)))
                }
            };
            cell.state = state;
            cell.outcome = Some(outcome);
            cell.finish_date = Some(now);
        }

        let delegate = self.inner.delegate.read().as_ref().and_then(|d| d.upgrade());

        match &completion {
            Completion::Finished(result) => {
                info!(task = %self.name(), "task finished");
                if let Some(delegate) = &delegate {
                    delegate.on_finished(self, result.as_ref());
                }
            }
            Completion::Failed(error) => {
                warn!(
                    task = %self.name(),
                    error = %error,
                    "task failed; dependents stay pending until it is retried"
                );
                if let Some(delegate) = &delegate {
                    delegate.on_failed(self, error);
                }
            }
        }

        if let Some(graph) = &graph {
            graph.notify_progress();
        }

        if matches!(completion, Completion::Finished(_)) {
            propagation::start_ready_dependents(self);
        }
        true
    }

    /// Pending → Ready when every prerequisite has finished.
    pub(crate) fn promote_if_prerequisites_finished(&self) -> bool {
        let prerequisites = self.prerequisite_tasks();
        let mut cell = self.inner.cell.lock();
        if cell.state != TaskState::Pending {
            return false;
        }
        if !prerequisites.iter().all(Task::is_finished) {
            return false;
        }
        cell.state = TaskState::Ready;
        drop(cell);

        debug!(task = %self.name(), "all prerequisites finished; task ready");
        true
    }

    /// Cancel this task alone. Returns whether the state changed.
    pub(crate) fn mark_cancelled(&self) -> bool {
        let previous = {
            let mut cell = self.inner.cell.lock();
            if !cell.state.can_cancel() {
                trace!(task = %self.name(), state = ?cell.state, "cancel leaves task unchanged");
                return false;
            }
            let previous = cell.state;
            cell.state = TaskState::Cancelled;
            cell.cancel_token.cancel();
            previous
        };

        debug!(task = %self.name(), from = ?previous, "task cancelled");
        if let Some(graph) = self.graph_shared() {
            graph.notify_progress();
        }
        true
    }

    /// Reset this task alone. Returns whether it is now Ready (and should be
    /// started by the caller).
    pub(crate) fn mark_retried(&self) -> bool {
        let prerequisites = self.prerequisite_tasks();
        let next = {
            let mut cell = self.inner.cell.lock();
            if !cell.state.can_retry() {
                trace!(task = %self.name(), state = ?cell.state, "retry leaves task unchanged");
                return false;
            }
            let next = if prerequisites.iter().all(Task::is_finished) {
                TaskState::Ready
            } else {
                TaskState::Pending
            };
            cell.state = next;
            cell.clear_outcome();
            next
        };

        debug!(task = %self.name(), to = ?next, "task reset for retry");
        if let Some(graph) = self.graph_shared() {
            graph.notify_progress();
        }
        next == TaskState::Ready
    }
}
