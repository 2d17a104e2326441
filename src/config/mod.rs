// src/config/mod.rs

//! TOML graph definitions for the `taskgraph` binary.
//!
//! - `model.rs` holds the serde data model.
//! - `loader.rs` reads a file from disk.
//! - `validate.rs` turns a `RawGraphFile` into a checked `GraphFile`.

pub mod loader;
pub mod model;
pub mod validate;

pub use loader::{default_config_path, load_and_validate, load_from_path};
pub use model::{GraphFile, GraphSection, RawGraphFile, TaskSection};
