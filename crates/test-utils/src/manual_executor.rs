use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

use taskgraph::exec::{Work, WorkExecutor};

/// An executor that only queues work; the test decides when it runs.
///
/// Clones share the same queue, so a test can keep one handle while the
/// graph owns another.
#[derive(Clone, Default)]
pub struct ManualExecutor {
    queue: Arc<Mutex<VecDeque<Work>>>,
}

impl ManualExecutor {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of submitted bodies not yet run.
    pub fn queued(&self) -> usize {
        self.queue.lock().unwrap().len()
    }

    /// Run the oldest queued body. Returns `false` if the queue was empty.
    pub fn run_next(&self) -> bool {
        // Popped before running: the body may submit more work.
        let next = self.queue.lock().unwrap().pop_front();
        match next {
            Some(work) => {
                work();
                true
            }
            None => false,
        }
    }

    /// Run bodies until none are queued. Returns how many ran.
    pub fn run_until_idle(&self) -> usize {
        let mut ran = 0;
        while self.run_next() {
            ran += 1;
        }
        ran
    }
}

impl WorkExecutor for ManualExecutor {
    fn submit(&self, work: Work) {
        self.queue.lock().unwrap().push_back(work);
    }
}
