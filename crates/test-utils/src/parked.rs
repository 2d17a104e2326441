use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use taskgraph::task::{Task, TaskContext};

/// Task bodies that park their context instead of completing.
///
/// Tests pull the contexts out with [`ParkedBodies::take`] and complete them
/// in whatever order the scenario needs.
#[derive(Clone, Default)]
pub struct ParkedBodies {
    parked: Arc<Mutex<HashMap<String, Vec<TaskContext>>>>,
    runs: Arc<Mutex<HashMap<String, usize>>>,
}

impl ParkedBodies {
    pub fn new() -> Self {
        Self::default()
    }

    /// A task whose body parks its context under `name`.
    pub fn task(&self, name: &str) -> Task {
        let parked = self.clone();
        Task::from_fn(name, move |ctx: TaskContext| {
            let name = ctx.name().to_string();
            *parked.runs.lock().unwrap().entry(name.clone()).or_default() += 1;
            parked.parked.lock().unwrap().entry(name).or_default().push(ctx);
        })
    }

    /// Oldest parked context for `name`.
    pub fn take(&self, name: &str) -> TaskContext {
        let mut parked = self.parked.lock().unwrap();
        let contexts = parked
            .get_mut(name)
            .filter(|v| !v.is_empty())
            .unwrap_or_else(|| panic!("no parked context for task '{name}'"));
        contexts.remove(0)
    }

    pub fn is_parked(&self, name: &str) -> bool {
        self.parked
            .lock()
            .unwrap()
            .get(name)
            .is_some_and(|v| !v.is_empty())
    }

    /// How many times the body of `name` has run.
    pub fn runs(&self, name: &str) -> usize {
        self.runs.lock().unwrap().get(name).copied().unwrap_or(0)
    }
}
