// src/graph/shared.rs

//! The part of a graph that its tasks can reach.

use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use tokio::sync::watch;

use crate::exec::WorkExecutor;

/// Graph state shared with member tasks through a `Weak` back-reference.
///
/// Holds no task handles: the task set lives in `TaskGraph` itself and is
/// only mutated through `&mut TaskGraph`.
pub(crate) struct GraphShared {
    name: String,
    executor: Arc<dyn WorkExecutor>,
    /// Bumped on every state transition of a member task.
    progress: watch::Sender<u64>,
    /// Completions whose dependent propagation has not returned yet.
    in_flight: AtomicUsize,
}

impl GraphShared {
    pub(crate) fn new(name: String, executor: Arc<dyn WorkExecutor>) -> Self {
        let (progress, _) = watch::channel(0);
        Self {
            name,
            executor,
            progress,
            in_flight: AtomicUsize::new(0),
        }
    }

    pub(crate) fn name(&self) -> &str {
        &self.name
    }

    pub(crate) fn executor(&self) -> &dyn WorkExecutor {
        self.executor.as_ref()
    }

    pub(crate) fn notify_progress(&self) {
        self.progress.send_modify(|n| *n = n.wrapping_add(1));
    }

    pub(crate) fn subscribe(&self) -> watch::Receiver<u64> {
        self.progress.subscribe()
    }

    pub(crate) fn generation(&self) -> u64 {
        *self.progress.borrow()
    }

    /// Mark a completion as in progress until the guard drops.
    ///
    /// While a finished task is waking its dependents, the graph can briefly
    /// show neither Ready nor Executing tasks; settle checks treat that
    /// window as unsettled.
    pub(crate) fn begin_transition(&self) -> TransitionGuard<'_> {
        self.in_flight.fetch_add(1, Ordering::SeqCst);
        TransitionGuard { shared: self }
    }

    pub(crate) fn in_flight(&self) -> usize {
        self.in_flight.load(Ordering::SeqCst)
    }
}

pub(crate) struct TransitionGuard<'a> {
    shared: &'a GraphShared,
}

impl Drop for TransitionGuard<'_> {
    fn drop(&mut self) {
        self.shared.in_flight.fetch_sub(1, Ordering::SeqCst);
        self.shared.notify_progress();
    }
}

impl fmt::Debug for GraphShared {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GraphShared")
            .field("name", &self.name)
            .field("progress", &self.generation())
            .field("in_flight", &self.in_flight())
            .finish_non_exhaustive()
    }
}
