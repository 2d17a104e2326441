// src/graph/summary.rs

//! Per-state task counts for status reporting.

use std::fmt;

use serde::Serialize;

use crate::task::TaskState;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct StateCounts {
    pub pending: usize,
    pub ready: usize,
    pub executing: usize,
    pub cancelled: usize,
    pub finished: usize,
    pub failed: usize,
}

impl StateCounts {
    pub fn record(&mut self, state: TaskState) {
        match state {
            TaskState::Pending => self.pending += 1,
            TaskState::Ready => self.ready += 1,
            TaskState::Executing => self.executing += 1,
            TaskState::Cancelled => self.cancelled += 1,
            TaskState::Finished => self.finished += 1,
            TaskState::Failed => self.failed += 1,
        }
    }

    pub fn total(&self) -> usize {
        self.pending + self.ready + self.executing + self.cancelled + self.finished + self.failed
    }

    /// Nothing is Ready or Executing, so no transition can happen on its own.
    pub fn is_settled(&self) -> bool {
        self.ready == 0 && self.executing == 0
    }
}

impl FromIterator<TaskState> for StateCounts {
    fn from_iter<I: IntoIterator<Item = TaskState>>(iter: I) -> Self {
        let mut counts = StateCounts::default();
        for state in iter {
            counts.record(state);
        }
        counts
    }
}

impl fmt::Display for StateCounts {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} finished, {} failed, {} cancelled, {} pending, {} ready, {} executing",
            self.finished, self.failed, self.cancelled, self.pending, self.ready, self.executing
        )
    }
}
