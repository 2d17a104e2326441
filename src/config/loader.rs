// src/config/loader.rs

use std::fs;
use std::path::{Path, PathBuf};

use crate::config::model::{GraphFile, RawGraphFile};
use crate::errors::Result;

/// Read and deserialize a graph file without semantic validation.
///
/// Use [`load_and_validate`] to also check dependencies and acyclicity.
pub fn load_from_path(path: impl AsRef<Path>) -> Result<RawGraphFile> {
    let contents = fs::read_to_string(path.as_ref())?;
    let raw: RawGraphFile = toml::from_str(&contents)?;
    Ok(raw)
}

/// Read, deserialize and validate a graph file.
pub fn load_and_validate(path: impl AsRef<Path>) -> Result<GraphFile> {
    let raw = load_from_path(&path)?;
    GraphFile::try_from(raw)
}

/// `Taskgraph.toml` in the current working directory.
pub fn default_config_path() -> PathBuf {
    PathBuf::from("Taskgraph.toml")
}
