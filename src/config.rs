//! # Configuration Module
//!
//! Data directory setup and runtime settings for tastegraph.
//!
//! ## Data Storage
//!
//! The graph database lives in the platform-standard data directory:
//! - Linux: `~/.local/share/tastegraph/graph.db`
//! - macOS: `~/Library/Application Support/tastegraph/graph.db`
//! - Windows: `%APPDATA%\tastegraph\graph.db`
//!
//! ## Configuration File
//!
//! An optional `config.json` next to the database overrides the defaults.
//! Every field may be omitted:
//!
//! ```json
//! {
//!   "db_path": "graph.db",
//!   "candidate_pool": 20,
//!   "default_limit": 10,
//!   "max_page_size": 500
//! }
//! ```
//!
//! A relative `db_path` is resolved against the directory holding the file.

use anyhow::{ensure, Context, Result};
use log::debug;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

use crate::catalog::DEFAULT_MAX_PAGE_SIZE;
use crate::recommend::DEFAULT_CANDIDATE_POOL;

/// File name of the graph database inside the data directory.
pub const DB_FILE: &str = "graph.db";
/// File name of the optional settings file inside the data directory.
pub const CONFIG_FILE: &str = "config.json";

/// Returns the platform-appropriate data directory for tastegraph, creating
/// it if needed.
///
/// # Errors
///
/// This function will return an error if:
/// - The system data directory cannot be determined
/// - The `tastegraph` subdirectory cannot be created
pub fn get_data_dir() -> Result<PathBuf> {
    let data_dir = dirs::data_dir().ok_or_else(|| {
        anyhow::anyhow!(
            "Could not determine system data directory. Use --db or TASTEGRAPH_DB to choose a database file."
        )
    })?;

    let app_dir = data_dir.join("tastegraph");
    fs::create_dir_all(&app_dir).with_context(|| {
        format!(
            "Failed to create tastegraph data directory at {}. Please check file permissions.",
            app_dir.display()
        )
    })?;

    Ok(app_dir)
}

/// Returns the default database file path.
///
/// # Examples
///
/// ```no_run
/// use tastegraph::config::get_db_path;
///
/// let db_path = get_db_path()?;
/// println!("Database location: {}", db_path.display());
/// # Ok::<(), anyhow::Error>(())
/// ```
pub fn get_db_path() -> Result<PathBuf> {
    Ok(get_data_dir()?.join(DB_FILE))
}

/// Returns where `config.json` would live, without touching the filesystem.
pub fn config_file_path() -> Option<PathBuf> {
    dirs::data_dir().map(|dir| dir.join("tastegraph").join(CONFIG_FILE))
}

/// Configuration for runtime behavior
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RuntimeConfig {
    /// Path to the database file; `None` means the data directory default
    #[serde(skip_serializing_if = "Option::is_none")]
    pub db_path: Option<PathBuf>,
    /// Similar users consulted per recommendation
    pub candidate_pool: usize,
    /// Result size when a command is given no `--limit`
    pub default_limit: usize,
    /// Upper bound on any paged listing
    pub max_page_size: usize,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            db_path: None,
            candidate_pool: DEFAULT_CANDIDATE_POOL,
            default_limit: 10,
            max_page_size: DEFAULT_MAX_PAGE_SIZE,
        }
    }
}

impl RuntimeConfig {
    /// Loads `config.json` from the data directory, falling back to the
    /// defaults when the file (or the directory itself) does not exist.
    pub fn load() -> Result<Self> {
        match config_file_path() {
            Some(path) => Self::load_from(&path),
            None => Ok(Self::default()),
        }
    }

    /// Loads settings from an explicit file. A missing file yields the
    /// defaults; an unreadable or malformed one is an error.
    pub fn load_from(path: &Path) -> Result<Self> {
        if !path.exists() {
            debug!("No config file at {}, using defaults", path.display());
            return Ok(Self::default());
        }

        let text = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file {}", path.display()))?;
        let mut config: Self = serde_json::from_str(&text)
            .with_context(|| format!("Invalid config file {}", path.display()))?;

        if let Some(dir) = path.parent() {
            config.db_path = config
                .db_path
                .map(|db| if db.is_relative() { dir.join(db) } else { db });
        }
        config.validate()?;
        debug!("Loaded config from {}: {config:?}", path.display());
        Ok(config)
    }

    /// Replace the database path, e.g. from `--db`.
    #[must_use]
    pub fn with_db_path(mut self, db_path: PathBuf) -> Self {
        self.db_path = Some(db_path);
        self
    }

    /// The database file to open. Only the data directory default creates
    /// directories.
    pub fn database_path(&self) -> Result<PathBuf> {
        match &self.db_path {
            Some(path) => Ok(path.clone()),
            None => get_db_path(),
        }
    }

    fn validate(&self) -> Result<()> {
        ensure!(self.candidate_pool > 0, "candidate_pool must be at least 1");
        ensure!(self.max_page_size > 0, "max_page_size must be at least 1");
        Ok(())
    }
}
