// src/exec/inline.rs

//! Executor that runs work on the submitting thread.
//!
//! A finishing task starts its dependents, which submit their bodies, which
//! may finish and start *their* dependents, and so on. Running each submission
//! directly would nest one stack frame per edge of a chain. Instead the first
//! submission on a thread becomes the "drainer": nested submissions are queued
//! in a thread-local FIFO and run by the drainer's loop once the current work
//! returns.

use std::cell::RefCell;
use std::collections::VecDeque;

use tracing::trace;

use super::backend::{Work, WorkExecutor};

thread_local! {
    static PENDING: RefCell<Option<VecDeque<Work>>> = const { RefCell::new(None) };
}

/// Runs work synchronously on the caller's thread, iteratively.
#[derive(Debug, Clone, Copy, Default)]
pub struct InlineExecutor;

impl InlineExecutor {
    pub fn new() -> Self {
        Self
    }
}

/// Clears the thread-local queue when the drainer exits, even by unwinding.
struct DrainGuard;

impl Drop for DrainGuard {
    fn drop(&mut self) {
        PENDING.with(|pending| *pending.borrow_mut() = None);
    }
}

impl WorkExecutor for InlineExecutor {
    fn submit(&self, work: Work) {
        let first = PENDING.with(|pending| {
            let mut pending = pending.borrow_mut();
            match pending.as_mut() {
                Some(queue) => {
                    queue.push_back(work);
                    trace!(queued = queue.len(), "inline executor: deferred nested work");
                    None
                }
                None => {
                    *pending = Some(VecDeque::new());
                    Some(work)
                }
            }
        });

        let Some(first) = first else {
            return;
        };

        let _guard = DrainGuard;
        first();

        loop {
            let next = PENDING.with(|pending| {
                pending
                    .borrow_mut()
                    .as_mut()
                    .and_then(|queue| queue.pop_front())
            });
            match next {
                Some(work) => work(),
                None => break,
            }
        }
    }
}
