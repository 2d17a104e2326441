// src/task/propagation.rs

//! Walking dependent edges.
//!
//! Cancel and retry reach every task downstream of their starting points.
//! The walks are breadth-first over an explicit queue with a visited set, so
//! long chains cost no stack and diamonds visit each task once.

use std::collections::{HashSet, VecDeque};

use tracing::debug;

use super::{Task, TaskId};

/// Start every dependent of `finished` whose prerequisites are now all done.
///
/// Two prerequisites finishing concurrently may both call this for the same
/// dependent; the Pending→Ready promotion and the Ready→Executing handoff are
/// each guarded by the dependent's lock, so exactly one start succeeds.
pub(crate) fn start_ready_dependents(finished: &Task) {
    for dependent in finished.dependent_tasks() {
        if dependent.promote_if_prerequisites_finished() {
            dependent.start();
        }
    }
}

/// Cancel the given tasks and everything downstream of them.
pub(crate) fn cancel_from(roots: impl IntoIterator<Item = Task>) {
    let mut cancelled = 0usize;
    walk_downstream(roots, |task| {
        if task.mark_cancelled() {
            cancelled += 1;
        }
    });
    debug!(cancelled, "cancellation propagated");
}

/// Retry the given tasks and everything downstream of them.
pub(crate) fn retry_from(roots: impl IntoIterator<Item = Task>) {
    let mut started = 0usize;
    walk_downstream(roots, |task| {
        if task.mark_retried() && task.start() {
            started += 1;
        }
    });
    debug!(started, "retry propagated");
}

/// Visit `roots` and all their transitive dependents once, in BFS order.
fn walk_downstream(roots: impl IntoIterator<Item = Task>, mut visit: impl FnMut(&Task)) {
    let mut queue: VecDeque<Task> = roots.into_iter().collect();
    let mut seen: HashSet<TaskId> = HashSet::new();

    while let Some(task) = queue.pop_front() {
        if !seen.insert(task.id()) {
            continue;
        }
        visit(&task);
        queue.extend(task.dependent_tasks());
    }
}
