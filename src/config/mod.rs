//! Configuration for distributed table operations.
//!
//! Values are layered: built-in defaults, then a TOML file, then
//! `DISTTABLE_*` environment variables. Command-line flags are applied last by
//! the binary.

use anyhow::{anyhow, bail, Context, Result};
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::debug;

/// Environment variable overriding `scheduler.max_parallel`
pub const ENV_MAX_PARALLEL: &str = "DISTTABLE_MAX_PARALLEL";
/// Environment variable overriding `display.max_rows`
pub const ENV_MAX_ROWS: &str = "DISTTABLE_MAX_ROWS";
/// Environment variable overriding `distribute.chunks`
pub const ENV_CHUNKS: &str = "DISTTABLE_CHUNKS";

/// Get the default configuration file location
pub fn default_config_path() -> Option<PathBuf> {
    ProjectDirs::from("org", "disttable", "disttable")
        .map(|dirs| dirs.config_dir().join("config.toml"))
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SchedulerConfig {
    /// Maximum number of units of work running at once
    pub max_parallel: usize,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            max_parallel: std::thread::available_parallelism()
                .map(|n| n.get())
                .unwrap_or(4),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DisplayConfig {
    /// Rows rendered before the ellipsis marker
    pub max_rows: usize,
}

impl Default for DisplayConfig {
    fn default() -> Self {
        Self {
            max_rows: crate::table::display::DEFAULT_MAX_ROWS,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DistributeConfig {
    /// Chunk count used when distributing a single local table
    pub chunks: usize,
}

impl Default for DistributeConfig {
    fn default() -> Self {
        Self { chunks: 4 }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TableConfig {
    pub scheduler: SchedulerConfig,
    pub display: DisplayConfig,
    pub distribute: DistributeConfig,
}

impl TableConfig {
    /// Load configuration from `path`, or from the default location if it
    /// exists, then apply environment overrides.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let mut config = match path {
            Some(path) => Self::from_file(path)?,
            None => match default_config_path() {
                Some(default) if default.exists() => Self::from_file(&default)?,
                _ => Self::default(),
            },
        };
        config.merge_env_with(|key| std::env::var(key).ok())?;
        config.validate()?;
        Ok(config)
    }

    /// Parse a TOML configuration file.
    pub fn from_file(path: &Path) -> Result<Self> {
        debug!("Loading configuration from {}", path.display());
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file {}", path.display()))?;
        toml::from_str(&content)
            .with_context(|| format!("Invalid config file {}", path.display()))
    }

    /// Apply `DISTTABLE_*` overrides using `lookup` to read variables.
    pub fn merge_env_with<F>(&mut self, lookup: F) -> Result<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        let parse = |key: &str, value: String| -> Result<usize> {
            value
                .trim()
                .parse::<usize>()
                .map_err(|e| anyhow!("{} must be a positive integer: {}", key, e))
        };

        if let Some(value) = lookup(ENV_MAX_PARALLEL) {
            self.scheduler.max_parallel = parse(ENV_MAX_PARALLEL, value)?;
        }
        if let Some(value) = lookup(ENV_MAX_ROWS) {
            self.display.max_rows = parse(ENV_MAX_ROWS, value)?;
        }
        if let Some(value) = lookup(ENV_CHUNKS) {
            self.distribute.chunks = parse(ENV_CHUNKS, value)?;
        }
        Ok(())
    }

    /// Reject settings that can never work.
    pub fn validate(&self) -> Result<()> {
        if self.scheduler.max_parallel == 0 {
            bail!("scheduler.max_parallel must be at least 1");
        }
        if self.distribute.chunks == 0 {
            bail!("distribute.chunks must be at least 1");
        }
        Ok(())
    }
}
