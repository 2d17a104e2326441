// src/exec/mod.rs

//! Work execution layer.
//!
//! The scheduler never runs task bodies itself; it hands them to a
//! [`WorkExecutor`] and returns immediately.
//!
//! - [`backend`] defines the `WorkExecutor` trait and the `Work` unit.
//! - [`tokio_pool`] runs work on tokio's blocking pool, optionally bounded.
//! - [`inline`] runs work on the submitting thread through a trampoline queue
//!   (deterministic, useful for tests and single-threaded embedding).
//! - [`command`] provides `CommandWork`, a task body that runs a shell command.

pub mod backend;
pub mod command;
pub mod inline;
pub mod tokio_pool;

pub use backend::{Work, WorkExecutor};
pub use command::{CommandOutput, CommandWork};
pub use inline::InlineExecutor;
pub use tokio_pool::TokioExecutor;
