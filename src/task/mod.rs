// src/task/mod.rs

//! Tasks: atomic units of schedulable work.
//!
//! - [`state`] holds the `TaskState` enum and the lock-protected cell.
//! - [`work`] contains the body strategies (closures, `TaskWork` impls,
//!   selector dispatch, external conditions).
//! - [`context`] is the handle a running body uses to check cancellation and
//!   report completion.
//! - [`lifecycle`] implements `start` / `cancel` / `retry` / completion.
//! - [`propagation`] walks dependent edges iteratively.
//! - [`delegate`] is the optional per-task observer.
//!
//! A [`Task`] is a cheap, cloneable handle. Clones refer to the same task.

pub mod context;
pub mod delegate;
pub(crate) mod lifecycle;
pub(crate) mod propagation;
pub mod state;
pub mod work;

use std::any::Any;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Weak};

use chrono::{DateTime, Utc};
use parking_lot::{Mutex, RwLock};

use crate::graph::GraphShared;

pub use context::TaskContext;
pub use delegate::{TaskDelegate, TracingDelegate};
pub use state::TaskState;
pub use work::{ExternalCondition, SelectorWork, TaskTarget, TaskWork};

use state::{Outcome, TaskCell};
use work::TaskBody;

/// Payload recorded when a task finishes successfully.
pub type TaskOutput = Arc<dyn Any + Send + Sync>;

/// Payload recorded when a task fails.
pub type TaskError = Arc<anyhow::Error>;

static NEXT_TASK_ID: AtomicU64 = AtomicU64::new(1);

/// Process-wide unique task identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TaskId(u64);

impl TaskId {
    fn next() -> Self {
        Self(NEXT_TASK_ID.fetch_add(1, Ordering::Relaxed))
    }
}

impl fmt::Display for TaskId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "task-{}", self.0)
    }
}

/// Edges and graph membership. Written once by `TaskGraph::add_task` (plus
/// `dependents` growing as later tasks are added), read everywhere else.
#[derive(Default)]
pub(crate) struct TaskLinks {
    pub(crate) graph: Option<Weak<GraphShared>>,
    pub(crate) prerequisites: Vec<Task>,
    pub(crate) dependents: Vec<Weak<TaskInner>>,
}

pub(crate) struct TaskInner {
    pub(crate) id: TaskId,
    pub(crate) name: String,
    pub(crate) body: TaskBody,
    pub(crate) delegate: RwLock<Option<Weak<dyn TaskDelegate>>>,
    pub(crate) cell: Mutex<TaskCell>,
    pub(crate) links: RwLock<TaskLinks>,
}

impl Drop for TaskInner {
    fn drop(&mut self) {
        // Unlink prerequisite chains iteratively; a long chain would otherwise
        // drop recursively, one frame per link.
        let mut stack = std::mem::take(&mut self.links.get_mut().prerequisites);
        while let Some(task) = stack.pop() {
            if let Ok(mut inner) = Arc::try_unwrap(task.inner) {
                stack.append(&mut inner.links.get_mut().prerequisites);
            }
        }
    }
}

/// Handle to a task.
#[derive(Clone)]
pub struct Task {
    pub(crate) inner: Arc<TaskInner>,
}

impl Task {
    /// A task whose body finishes immediately with no result.
    pub fn new(name: impl Into<String>) -> Self {
        Self::builder().name(name).build()
    }

    /// A task whose body is the given closure.
    pub fn from_fn<F>(name: impl Into<String>, f: F) -> Self
    where
        F: Fn(TaskContext) + Send + Sync + 'static,
    {
        Self::builder().name(name).work_fn(f).build()
    }

    /// A task whose body sends `selector` to `target`.
    pub fn with_target<T: TaskTarget + 'static>(
        name: impl Into<String>,
        target: &Arc<T>,
        selector: &'static str,
    ) -> Self {
        Self::builder().name(name).target(target, selector).build()
    }

    /// A task that finishes once [`Task::set_fulfilled`] is called with `true`.
    pub fn external_condition(name: impl Into<String>) -> Self {
        Self::builder().name(name).external_condition().build()
    }

    pub fn builder() -> TaskBuilder {
        TaskBuilder::default()
    }

    pub fn id(&self) -> TaskId {
        self.inner.id
    }

    pub fn name(&self) -> &str {
        &self.inner.name
    }

    pub fn state(&self) -> TaskState {
        self.inner.cell.lock().state
    }

    pub fn is_pending(&self) -> bool {
        self.state() == TaskState::Pending
    }

    pub fn is_ready(&self) -> bool {
        self.state() == TaskState::Ready
    }

    pub fn is_executing(&self) -> bool {
        self.state() == TaskState::Executing
    }

    pub fn is_cancelled(&self) -> bool {
        self.state() == TaskState::Cancelled
    }

    pub fn is_finished(&self) -> bool {
        self.state() == TaskState::Finished
    }

    pub fn is_failed(&self) -> bool {
        self.state() == TaskState::Failed
    }

    /// Result of the last successful execution, if the task is finished and
    /// produced one.
    pub fn result(&self) -> Option<TaskOutput> {
        match &self.inner.cell.lock().outcome {
            Some(Outcome::Finished(result)) => result.clone(),
            _ => None,
        }
    }

    /// Typed view of [`Task::result`].
    pub fn result_as<T: Any + Send + Sync>(&self) -> Option<Arc<T>> {
        self.result().and_then(|r| r.downcast::<T>().ok())
    }

    /// Error of the last failed execution, if the task is failed.
    pub fn error(&self) -> Option<TaskError> {
        match &self.inner.cell.lock().outcome {
            Some(Outcome::Failed(error)) => Some(Arc::clone(error)),
            _ => None,
        }
    }

    /// When the task last finished or failed.
    pub fn finish_date(&self) -> Option<DateTime<Utc>> {
        self.inner.cell.lock().finish_date
    }

    /// Tasks this task waits for. Empty for root tasks and tasks outside a graph.
    pub fn prerequisite_tasks(&self) -> Vec<Task> {
        self.inner.links.read().prerequisites.clone()
    }

    /// Tasks that list this task as a prerequisite.
    pub fn dependent_tasks(&self) -> Vec<Task> {
        self.inner
            .links
            .read()
            .dependents
            .iter()
            .filter_map(Weak::upgrade)
            .map(|inner| Task { inner })
            .collect()
    }

    /// Name of the owning graph, if the task has been added to one that is
    /// still alive.
    pub fn graph_name(&self) -> Option<String> {
        self.graph_shared().map(|g| g.name().to_string())
    }

    /// Whether the task has been added to a graph (alive or not).
    pub fn has_graph(&self) -> bool {
        self.inner.links.read().graph.is_some()
    }

    /// Observe this task's terminal transitions. The delegate is held weakly.
    pub fn set_delegate<D: TaskDelegate + 'static>(&self, delegate: &Arc<D>) {
        let weak: Weak<dyn TaskDelegate> = Arc::downgrade(delegate) as Weak<dyn TaskDelegate>;
        *self.inner.delegate.write() = Some(weak);
    }

    pub fn clear_delegate(&self) {
        *self.inner.delegate.write() = None;
    }

    /// For external-condition tasks: record whether the condition holds.
    /// Fulfilling it while the task is executing finishes the task.
    ///
    /// Returns `false` (and does nothing) for other kinds of task.
    pub fn set_fulfilled(&self, fulfilled: bool) -> bool {
        let TaskBody::Condition(condition) = &self.inner.body else {
            tracing::warn!(
                task = %self.name(),
                body = self.inner.body.kind(),
                "set_fulfilled on a task without an external condition; ignoring"
            );
            return false;
        };
        condition.set_fulfilled(fulfilled);
        if fulfilled && self.is_executing() {
            self.finish();
        }
        true
    }

    /// For external-condition tasks: whether the condition holds.
    pub fn is_fulfilled(&self) -> bool {
        match &self.inner.body {
            TaskBody::Condition(condition) => condition.is_fulfilled(),
            _ => false,
        }
    }

    pub(crate) fn graph_shared(&self) -> Option<Arc<GraphShared>> {
        self.inner.links.read().graph.as_ref().and_then(Weak::upgrade)
    }

    pub(crate) fn ptr_eq(&self, other: &Task) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }
}

impl PartialEq for Task {
    fn eq(&self, other: &Self) -> bool {
        self.ptr_eq(other)
    }
}

impl Eq for Task {}

impl Hash for Task {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.inner.id.hash(state);
    }
}

impl fmt::Debug for Task {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Task")
            .field("id", &self.inner.id)
            .field("name", &self.inner.name)
            .field("state", &self.state())
            .field("body", &self.inner.body.kind())
            .finish()
    }
}

impl fmt::Display for Task {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.inner.name)
    }
}

/// Builder for [`Task`].
#[derive(Default)]
pub struct TaskBuilder {
    name: Option<String>,
    body: Option<TaskBody>,
}

impl TaskBuilder {
    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn work<W: TaskWork + 'static>(mut self, work: W) -> Self {
        self.body = Some(TaskBody::Work(Arc::new(work)));
        self
    }

    pub fn work_fn<F>(self, f: F) -> Self
    where
        F: Fn(TaskContext) + Send + Sync + 'static,
    {
        self.work(f)
    }

    pub fn target<T: TaskTarget + 'static>(self, target: &Arc<T>, selector: &'static str) -> Self {
        self.work(SelectorWork::new(target, selector))
    }

    pub fn external_condition(mut self) -> Self {
        self.body = Some(TaskBody::Condition(ExternalCondition::default()));
        self
    }

    pub fn build(self) -> Task {
        let id = TaskId::next();
        let name = self.name.unwrap_or_else(|| id.to_string());
        Task {
            inner: Arc::new(TaskInner {
                id,
                name,
                body: self.body.unwrap_or(TaskBody::Immediate),
                delegate: RwLock::new(None),
                cell: Mutex::new(TaskCell::new()),
                links: RwLock::new(TaskLinks::default()),
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_task_is_ready_without_edges() {
        let task = Task::new("a");
        assert_eq!(task.state(), TaskState::Ready);
        assert!(task.is_ready());
        assert!(task.prerequisite_tasks().is_empty());
        assert!(task.dependent_tasks().is_empty());
        assert!(!task.has_graph());
        assert!(task.result().is_none());
        assert!(task.error().is_none());
        assert!(task.finish_date().is_none());
    }

    #[test]
    fn default_names_are_unique() {
        let a = Task::builder().build();
        let b = Task::builder().build();
        assert_ne!(a.name(), b.name());
        assert!(a.name().starts_with("task-"));
        assert_eq!(a.name(), a.id().to_string());
    }

    #[test]
    fn clones_are_the_same_task() {
        let a = Task::new("a");
        let b = a.clone();
        let c = Task::new("a");
        assert_eq!(a, b);
        assert_ne!(a, c);
    }

    #[test]
    fn set_fulfilled_only_applies_to_condition_tasks() {
        let plain = Task::new("plain");
        assert!(!plain.set_fulfilled(true));
        assert!(!plain.is_fulfilled());

        let gate = Task::external_condition("gate");
        assert!(gate.set_fulfilled(true));
        assert!(gate.is_fulfilled());
        // Not executing: fulfilling alone does not change state.
        assert!(gate.is_ready());
    }
}
