#![allow(dead_code)]

use std::collections::BTreeMap;
use taskgraph::config::{GraphFile, GraphSection, RawGraphFile, TaskSection};

/// Builder for `GraphFile` to simplify test setup.
pub struct GraphFileBuilder {
    raw: RawGraphFile,
}

impl GraphFileBuilder {
    pub fn new() -> Self {
        Self {
            raw: RawGraphFile {
                graph: GraphSection::default(),
                task: BTreeMap::new(),
            },
        }
    }

    pub fn name(mut self, name: &str) -> Self {
        self.raw.graph.name = Some(name.to_string());
        self
    }

    pub fn max_concurrency(mut self, max: usize) -> Self {
        self.raw.graph.max_concurrency = Some(max);
        self
    }

    pub fn retries(mut self, retries: u32) -> Self {
        self.raw.graph.retries = retries;
        self
    }

    pub fn with_task(mut self, name: &str, task: TaskSection) -> Self {
        self.raw.task.insert(name.to_string(), task);
        self
    }

    /// The unvalidated file, for exercising validation errors.
    pub fn build_raw(self) -> RawGraphFile {
        self.raw
    }

    pub fn build(self) -> GraphFile {
        GraphFile::try_from(self.raw).expect("Failed to build valid graph file from builder")
    }
}

impl Default for GraphFileBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// Builder for `TaskSection`.
pub struct TaskSectionBuilder {
    task: TaskSection,
}

impl TaskSectionBuilder {
    pub fn new(cmd: &str) -> Self {
        Self {
            task: TaskSection {
                cmd: cmd.to_string(),
                after: vec![],
            },
        }
    }

    pub fn after(mut self, dep: &str) -> Self {
        self.task.after.push(dep.to_string());
        self
    }

    pub fn build(self) -> TaskSection {
        self.task
    }
}
