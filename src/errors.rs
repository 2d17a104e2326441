// src/errors.rs

//! Errors raised while loading, validating and wiring task graphs.
//!
//! Task-body failures are *not* represented here: they are recorded on the
//! task itself (see [`crate::task::TaskError`]). This enum covers everything
//! around the scheduler: config loading, graph construction and wiring.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum TaskGraphError {
    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Task not found: {0}")]
    TaskNotFound(String),

    #[error("Cycle detected in task graph: {0}")]
    GraphCycle(String),

    #[error("TOML parsing error: {0}")]
    TomlError(#[from] toml::de::Error),

    #[error("task '{task}' already belongs to graph '{graph}'")]
    AlreadyInGraph { task: String, graph: String },

    #[error("prerequisite '{prerequisite}' of task '{task}' is not a member of graph '{graph}'")]
    PrerequisiteNotInGraph {
        task: String,
        prerequisite: String,
        graph: String,
    },

    #[error("no tokio runtime available: {0}")]
    NoRuntime(String),
}

pub type Result<T> = std::result::Result<T, TaskGraphError>;
