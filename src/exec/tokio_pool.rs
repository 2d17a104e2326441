// src/exec/tokio_pool.rs

//! Executor backed by tokio's blocking thread pool.

use std::fmt;
use std::sync::Arc;

use tokio::runtime::Handle;
use tokio::sync::Semaphore;
use tracing::{debug, warn};

use crate::errors::{Result, TaskGraphError};

use super::backend::{Work, WorkExecutor};

/// Runs task bodies with `spawn_blocking` on a tokio runtime.
///
/// Task bodies are plain closures that may block, so they go to the blocking
/// pool rather than the async workers. When a concurrency limit is set, each
/// submission first waits (asynchronously) for a semaphore permit, which it
/// holds until the body returns.
#[derive(Clone)]
pub struct TokioExecutor {
    handle: Handle,
    limit: Option<(usize, Arc<Semaphore>)>,
}

impl fmt::Debug for TokioExecutor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TokioExecutor")
            .field("max_concurrency", &self.max_concurrency())
            .finish_non_exhaustive()
    }
}

impl TokioExecutor {
    /// Create an executor that submits to the given runtime.
    pub fn new(handle: Handle) -> Self {
        Self {
            handle,
            limit: None,
        }
    }

    /// Create an executor on the runtime the caller is running in.
    pub fn current() -> Result<Self> {
        let handle =
            Handle::try_current().map_err(|e| TaskGraphError::NoRuntime(e.to_string()))?;
        Ok(Self::new(handle))
    }

    /// Bound the number of bodies running at once. `0` is clamped to `1`.
    pub fn with_max_concurrency(mut self, max: usize) -> Self {
        let max = max.max(1);
        self.limit = Some((max, Arc::new(Semaphore::new(max))));
        self
    }

    /// The configured concurrency bound, if any.
    pub fn max_concurrency(&self) -> Option<usize> {
        self.limit.as_ref().map(|(max, _)| *max)
    }

    /// Runtime handle the executor submits to.
    pub fn handle(&self) -> &Handle {
        &self.handle
    }
}

impl WorkExecutor for TokioExecutor {
    fn submit(&self, work: Work) {
        match &self.limit {
            None => {
                self.handle.spawn_blocking(work);
            }
            Some((_, limit)) => {
                let limit = Arc::clone(limit);
                let handle = self.handle.clone();
                self.handle.spawn(async move {
                    let permit = match limit.acquire_owned().await {
                        Ok(permit) => permit,
                        Err(e) => {
                            warn!(error = %e, "executor semaphore closed; dropping work");
                            return;
                        }
                    };
                    let joined = handle
                        .spawn_blocking(move || {
                            let _permit = permit;
                            work();
                        })
                        .await;
                    if let Err(e) = joined {
                        debug!(error = %e, "blocking work did not complete normally");
                    }
                });
            }
        }
    }
}
