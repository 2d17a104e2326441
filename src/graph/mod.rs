// src/graph/mod.rs

//! Task graphs: construction, graph-wide orchestration and status.
//!
//! The graph owns its tasks and the executor their bodies run on. After
//! construction it holds no mutable state of its own; all progress happens
//! through per-task transitions (see `crate::task::lifecycle`).

mod shared;
pub mod summary;

use std::collections::HashSet;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Weak};

use tracing::{debug, info};

use crate::errors::{Result, TaskGraphError};
use crate::exec::{TokioExecutor, WorkExecutor};
use crate::task::{Task, TaskId, TaskState, propagation};

pub(crate) use shared::GraphShared;
pub use summary::StateCounts;

static NEXT_GRAPH_ID: AtomicU64 = AtomicU64::new(1);

/// A set of tasks plus the prerequisite edges between them.
pub struct TaskGraph {
    shared: Arc<GraphShared>,
    tasks: Vec<Task>,
}

impl TaskGraph {
    /// A graph with a synthesized name whose bodies run on `executor`.
    pub fn new<E: WorkExecutor + 'static>(executor: E) -> Self {
        let id = NEXT_GRAPH_ID.fetch_add(1, Ordering::Relaxed);
        Self::named(format!("graph-{id}"), executor)
    }

    pub fn named<E: WorkExecutor + 'static>(name: impl Into<String>, executor: E) -> Self {
        let name = name.into();
        debug!(graph = %name, "task graph created");
        Self {
            shared: Arc::new(GraphShared::new(name, Arc::new(executor))),
            tasks: Vec::new(),
        }
    }

    /// A graph running bodies on the blocking pool of the caller's tokio
    /// runtime.
    pub fn on_current_runtime(name: impl Into<String>) -> Result<Self> {
        Ok(Self::named(name, TokioExecutor::current()?))
    }

    pub fn name(&self) -> &str {
        self.shared.name()
    }

    /// Add `task` with the given prerequisites, which must already be members.
    ///
    /// A task with at least one prerequisite becomes Pending. Duplicate
    /// entries in `prerequisites` are ignored.
    pub fn try_add_task(&mut self, task: &Task, prerequisites: &[&Task]) -> Result<()> {
        if task.has_graph() {
            return Err(TaskGraphError::AlreadyInGraph {
                task: task.name().to_string(),
                graph: task
                    .graph_name()
                    .unwrap_or_else(|| "<dropped graph>".to_string()),
            });
        }

        let mut seen: HashSet<TaskId> = HashSet::new();
        let mut prereqs: Vec<Task> = Vec::with_capacity(prerequisites.len());
        for &prereq in prerequisites {
            if !self.contains(prereq) {
                return Err(TaskGraphError::PrerequisiteNotInGraph {
                    task: task.name().to_string(),
                    prerequisite: prereq.name().to_string(),
                    graph: self.name().to_string(),
                });
            }
            if seen.insert(prereq.id()) {
                prereqs.push(prereq.clone());
            }
        }

        for prereq in &prereqs {
            prereq
                .inner
                .links
                .write()
                .dependents
                .push(Arc::downgrade(&task.inner));
        }

        let has_prerequisites = !prereqs.is_empty();
        {
            let mut links = task.inner.links.write();
            links.graph = Some(Arc::downgrade(&self.shared));
            links.prerequisites = prereqs;
        }
        if has_prerequisites {
            let mut cell = task.inner.cell.lock();
            if matches!(cell.state, TaskState::Ready | TaskState::Pending) {
                cell.state = TaskState::Pending;
            }
        }

        debug!(
            graph = %self.name(),
            task = %task.name(),
            prerequisites = prerequisites.len(),
            "task added"
        );
        self.tasks.push(task.clone());
        Ok(())
    }

    /// Like [`TaskGraph::try_add_task`], but a membership violation is a
    /// programming error and panics.
    pub fn add_task(&mut self, task: &Task, prerequisites: &[&Task]) {
        if let Err(err) = self.try_add_task(task, prerequisites) {
            panic!("{err}");
        }
    }

    /// Start every root task. Returns how many moved to Executing.
    pub fn start(&self) -> usize {
        let started = self.root_tasks().iter().filter(|t| t.start()).count();
        info!(graph = %self.name(), started, "graph started");
        started
    }

    /// Cancel every root task and, through them, the whole graph.
    pub fn cancel(&self) {
        info!(graph = %self.name(), "graph cancel requested");
        propagation::cancel_from(self.root_tasks());
    }

    /// Retry every root task and, through them, the whole graph.
    pub fn retry(&self) {
        info!(graph = %self.name(), "graph retry requested");
        propagation::retry_from(self.root_tasks());
    }

    /// True iff some task is not Finished.
    pub fn has_unfinished_tasks(&self) -> bool {
        self.tasks.iter().any(|t| !t.is_finished())
    }

    pub fn has_failed_tasks(&self) -> bool {
        self.tasks.iter().any(Task::is_failed)
    }

    /// `None` if `task` is not a member of this graph.
    pub fn prerequisite_tasks_for_task(&self, task: &Task) -> Option<Vec<Task>> {
        self.contains(task).then(|| task.prerequisite_tasks())
    }

    /// `None` if `task` is not a member of this graph.
    pub fn dependent_tasks_for_task(&self, task: &Task) -> Option<Vec<Task>> {
        self.contains(task).then(|| task.dependent_tasks())
    }

    /// All members, in insertion order.
    pub fn all_tasks(&self) -> &[Task] {
        &self.tasks
    }

    pub fn task_named(&self, name: &str) -> Option<&Task> {
        self.tasks.iter().find(|t| t.name() == name)
    }

    pub fn root_tasks(&self) -> Vec<Task> {
        self.tasks
            .iter()
            .filter(|t| t.inner.links.read().prerequisites.is_empty())
            .cloned()
            .collect()
    }

    pub fn contains(&self, task: &Task) -> bool {
        let links = task.inner.links.read();
        links
            .graph
            .as_ref()
            .is_some_and(|g| Weak::ptr_eq(g, &Arc::downgrade(&self.shared)))
    }

    pub fn state_counts(&self) -> StateCounts {
        self.tasks.iter().map(Task::state).collect()
    }

    /// No task is Ready or Executing and no completion is still waking its
    /// dependents.
    pub fn is_settled(&self) -> bool {
        self.settled_counts().is_some()
    }

    /// Wait until the graph is settled and return the counts observed then.
    ///
    /// A body that never completes (or an external condition that is never
    /// fulfilled) keeps the graph unsettled, so callers that cannot trust
    /// their bodies should put a timeout around this.
    pub async fn wait_settled(&self) -> StateCounts {
        let mut progress = self.shared.subscribe();
        loop {
            if let Some(counts) = self.settled_counts() {
                return counts;
            }
            // The sender lives in `self.shared`, so this only fails if the
            // graph is gone, which `&self` rules out.
            if progress.changed().await.is_err() {
                return self.state_counts();
            }
        }
    }

    /// Counts from a snapshot that no transition overlapped, if settled.
    fn settled_counts(&self) -> Option<StateCounts> {
        let before = self.shared.generation();
        let counts = self.state_counts();
        let in_flight = self.shared.in_flight();
        let after = self.shared.generation();

        (counts.is_settled() && in_flight == 0 && before == after).then_some(counts)
    }
}

impl fmt::Debug for TaskGraph {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TaskGraph")
            .field("name", &self.name())
            .field("tasks", &self.tasks)
            .finish()
    }
}
