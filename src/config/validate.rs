// src/config/validate.rs

use petgraph::algo::toposort;
use petgraph::graphmap::DiGraphMap;

use crate::config::model::{GraphFile, RawGraphFile};
use crate::errors::{Result, TaskGraphError};

impl TryFrom<RawGraphFile> for GraphFile {
    type Error = TaskGraphError;

    fn try_from(raw: RawGraphFile) -> std::result::Result<Self, Self::Error> {
        ensure_has_tasks(&raw)?;
        validate_graph_section(&raw)?;
        validate_task_dependencies(&raw)?;
        let order = insertion_order(&raw)?;
        Ok(GraphFile::new_unchecked(raw.graph, raw.task, order))
    }
}

fn ensure_has_tasks(cfg: &RawGraphFile) -> Result<()> {
    if cfg.task.is_empty() {
        return Err(TaskGraphError::ConfigError(
            "config must contain at least one [task.<name>] section".to_string(),
        ));
    }
    Ok(())
}

fn validate_graph_section(cfg: &RawGraphFile) -> Result<()> {
    if cfg.graph.max_concurrency == Some(0) {
        return Err(TaskGraphError::ConfigError(
            "[graph].max_concurrency must be >= 1 (got 0)".to_string(),
        ));
    }
    if cfg.graph.name.as_deref().is_some_and(|n| n.trim().is_empty()) {
        return Err(TaskGraphError::ConfigError(
            "[graph].name must not be empty".to_string(),
        ));
    }
    Ok(())
}

fn validate_task_dependencies(cfg: &RawGraphFile) -> Result<()> {
    for (name, task) in cfg.task.iter() {
        if task.cmd.trim().is_empty() {
            return Err(TaskGraphError::ConfigError(format!(
                "task '{}' has an empty `cmd`",
                name
            )));
        }
        for dep in task.after.iter() {
            if dep == name {
                return Err(TaskGraphError::ConfigError(format!(
                    "task '{}' cannot depend on itself in `after`",
                    name
                )));
            }
            if !cfg.task.contains_key(dep) {
                return Err(TaskGraphError::ConfigError(format!(
                    "task '{}' has unknown dependency '{}' in `after`",
                    name, dep
                )));
            }
        }
    }
    Ok(())
}

/// Topologically sort the tasks, failing on a cycle.
///
/// Edge direction is dependency -> dependent: `after = ["A"]` on `B` adds
/// `A -> B`, so the sort lists prerequisites first.
fn insertion_order(cfg: &RawGraphFile) -> Result<Vec<String>> {
    let mut graph: DiGraphMap<&str, ()> = DiGraphMap::new();

    for name in cfg.task.keys() {
        graph.add_node(name.as_str());
    }
    for (name, task) in cfg.task.iter() {
        for dep in task.after.iter() {
            graph.add_edge(dep.as_str(), name.as_str(), ());
        }
    }

    match toposort(&graph, None) {
        Ok(order) => Ok(order.into_iter().map(str::to_string).collect()),
        Err(cycle) => Err(TaskGraphError::GraphCycle(format!(
            "cycle detected in task graph involving task '{}'",
            cycle.node_id()
        ))),
    }
}
