// src/exec/backend.rs

//! Pluggable executor abstraction.
//!
//! Tasks talk to a `WorkExecutor` instead of a concrete runtime. This makes it
//! easy to swap in a manual executor in tests while production code uses
//! [`TokioExecutor`](super::TokioExecutor).

use std::sync::Arc;

/// A unit of work handed to an executor: one invocation of a task body.
pub type Work = Box<dyn FnOnce() + Send + 'static>;

/// Trait abstracting how task bodies are executed.
///
/// Implementations may run the work on any thread, in any order relative to
/// other submissions. `submit` must not block waiting for the work to run.
pub trait WorkExecutor: Send + Sync {
    /// Hand the given work to the executor.
    fn submit(&self, work: Work);
}

impl<E: WorkExecutor + ?Sized> WorkExecutor for Arc<E> {
    fn submit(&self, work: Work) {
        (**self).submit(work)
    }
}
