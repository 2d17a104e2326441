// src/config/model.rs

use std::collections::BTreeMap;

use serde::Deserialize;

/// Graph definition exactly as deserialized, before validation.
///
/// ```toml
/// [graph]
/// name = "build"
/// max_concurrency = 4
/// retries = 1
///
/// [task.fetch]
/// cmd = "curl -sO https://example.com/src.tar.gz"
///
/// [task.compile]
/// cmd = "make"
/// after = ["fetch"]
/// ```
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RawGraphFile {
    #[serde(default)]
    pub graph: GraphSection,

    /// Keyed by task name.
    #[serde(default)]
    pub task: BTreeMap<String, TaskSection>,
}

/// `[graph]` section.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct GraphSection {
    /// Graph name used in logs. Defaults to the config file stem.
    #[serde(default)]
    pub name: Option<String>,

    /// Upper bound on concurrently running task bodies; unbounded if unset.
    #[serde(default)]
    pub max_concurrency: Option<usize>,

    /// How many times the whole graph is retried after a round that ends
    /// with failed tasks.
    #[serde(default)]
    pub retries: u32,
}

/// `[task.<name>]` section.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct TaskSection {
    /// Shell command run as the task body.
    pub cmd: String,

    /// Prerequisites: this task starts once all of them have finished.
    #[serde(default)]
    pub after: Vec<String>,
}

/// A validated graph definition.
///
/// Only obtainable through `TryFrom<RawGraphFile>` (or `new_unchecked`), so
/// holders can rely on every `after` entry naming a task and on the
/// dependencies being acyclic.
#[derive(Debug, Clone)]
pub struct GraphFile {
    pub graph: GraphSection,
    pub task: BTreeMap<String, TaskSection>,
    order: Vec<String>,
}

impl GraphFile {
    /// Build without validation. `order` must list every task after all of
    /// its prerequisites.
    pub fn new_unchecked(
        graph: GraphSection,
        task: BTreeMap<String, TaskSection>,
        order: Vec<String>,
    ) -> Self {
        Self { graph, task, order }
    }

    /// Task names in an order where every prerequisite precedes its
    /// dependents, as `TaskGraph::add_task` requires.
    pub fn insertion_order(&self) -> &[String] {
        &self.order
    }
}
