use std::sync::Mutex;

use taskgraph::task::{Task, TaskDelegate, TaskError, TaskOutput};

/// One delegate callback, as observed by [`RecordingDelegate`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DelegateEvent {
    /// Task name and, for `i32` results, the value.
    Finished(String, Option<i32>),
    /// Task name and the error's display form.
    Failed(String, String),
}

/// Delegate that records every callback in order.
#[derive(Debug, Default)]
pub struct RecordingDelegate {
    events: Mutex<Vec<DelegateEvent>>,
}

impl RecordingDelegate {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn events(&self) -> Vec<DelegateEvent> {
        self.events.lock().unwrap().clone()
    }

    pub fn count(&self) -> usize {
        self.events.lock().unwrap().len()
    }
}

impl TaskDelegate for RecordingDelegate {
    fn on_finished(&self, task: &Task, result: Option<&TaskOutput>) {
        let value = result.and_then(|r| r.downcast_ref::<i32>()).copied();
        self.events
            .lock()
            .unwrap()
            .push(DelegateEvent::Finished(task.name().to_string(), value));
    }

    fn on_failed(&self, task: &Task, error: &TaskError) {
        self.events
            .lock()
            .unwrap()
            .push(DelegateEvent::Failed(task.name().to_string(), error.to_string()));
    }
}
