//! TOML configuration file
//!
//! Every key mirrors a command-line flag; flags given on the command line
//! win over the file.

use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Config {
    /// Root directory of the publish target.
    pub target: Option<PathBuf>,
    /// Remote directory to start the session in.
    pub init_dir: Option<String>,
    /// Snapshot cache file; present means the cached strategy is used.
    pub cache: Option<PathBuf>,
    /// Submission policy names, combined with `|`.
    pub submit: Option<Vec<String>>,
    /// Only publish files ending with one of these extensions.
    pub extensions: Option<Vec<String>>,
    /// Descend into subdirectories.
    pub recurse: Option<bool>,
}

impl Config {
    pub fn load(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read config file {}", path.display()))?;
        toml::from_str(&text)
            .with_context(|| format!("failed to parse config file {}", path.display()))
    }
}
