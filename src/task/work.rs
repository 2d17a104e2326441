// src/task/work.rs

//! Ways of supplying a task's body.
//!
//! Every body receives a [`TaskContext`] and must eventually call exactly one
//! of its completion methods. Failing to do so leaves the task `Executing`
//! and every downstream task `Pending`; nothing in the scheduler times out.

use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Weak};

use anyhow::anyhow;

use super::TaskContext;

/// A task body: the equivalent of overriding a task's work method.
///
/// Any `Fn(TaskContext) + Send + Sync` closure is a `TaskWork`.
pub trait TaskWork: Send + Sync {
    fn run(&self, ctx: TaskContext);
}

impl<F> TaskWork for F
where
    F: Fn(TaskContext) + Send + Sync,
{
    fn run(&self, ctx: TaskContext) {
        self(ctx)
    }
}

/// Receiver of selector-dispatched task bodies.
///
/// One target can serve several tasks, told apart by `selector`. An unknown
/// selector should fail the task rather than leave it hanging.
pub trait TaskTarget: Send + Sync {
    fn perform(&self, selector: &str, ctx: TaskContext);
}

/// Body that sends `selector` to a target held weakly.
#[derive(Clone)]
pub struct SelectorWork {
    target: Weak<dyn TaskTarget>,
    selector: &'static str,
}

impl SelectorWork {
    pub fn new<T: TaskTarget + 'static>(target: &Arc<T>, selector: &'static str) -> Self {
        let target: Weak<dyn TaskTarget> = Arc::downgrade(target) as Weak<dyn TaskTarget>;
        Self { target, selector }
    }

    pub fn selector(&self) -> &'static str {
        self.selector
    }
}

impl fmt::Debug for SelectorWork {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SelectorWork")
            .field("selector", &self.selector)
            .field("target_alive", &(self.target.strong_count() > 0))
            .finish()
    }
}

impl TaskWork for SelectorWork {
    fn run(&self, ctx: TaskContext) {
        match self.target.upgrade() {
            Some(target) => target.perform(self.selector, ctx),
            None => {
                ctx.fail_with_error(anyhow!(
                    "target for selector `{}` was dropped before the task ran",
                    self.selector
                ));
            }
        }
    }
}

/// Body that completes once an outside party declares a condition fulfilled.
#[derive(Debug, Default)]
pub struct ExternalCondition {
    fulfilled: AtomicBool,
}

impl ExternalCondition {
    pub(crate) fn is_fulfilled(&self) -> bool {
        self.fulfilled.load(Ordering::Acquire)
    }

    pub(crate) fn set_fulfilled(&self, fulfilled: bool) {
        self.fulfilled.store(fulfilled, Ordering::Release);
    }
}

/// What a task runs when started.
pub(crate) enum TaskBody {
    /// Finish immediately with no result.
    Immediate,
    Work(Arc<dyn TaskWork>),
    Condition(ExternalCondition),
}

impl TaskBody {
    pub(crate) fn kind(&self) -> &'static str {
        match self {
            TaskBody::Immediate => "immediate",
            TaskBody::Work(_) => "work",
            TaskBody::Condition(_) => "external-condition",
        }
    }
}
