//! Runtime configuration for the core.
//!
//! # Responsibility
//! - Resolve the data directory, log level and log directory.
//! - Derive the on-disk locations of the notes and settings files.
//!
//! # Invariants
//! - Blank environment values are treated as unset.
//! - Notes and settings always live in separate files.

use crate::logging::default_log_level;
use std::path::PathBuf;

pub const DATA_DIR_ENV: &str = "MININOTE_DATA_DIR";
pub const LOG_LEVEL_ENV: &str = "MININOTE_LOG_LEVEL";
pub const LOG_DIR_ENV: &str = "MININOTE_LOG_DIR";

const DEFAULT_DATA_DIR_NAME: &str = "mininote";
const NOTES_DB_FILE_NAME: &str = "notes.sqlite3";
const SETTINGS_DB_FILE_NAME: &str = "settings.sqlite3";
const LOG_DIR_NAME: &str = "logs";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CoreConfig {
    pub data_dir: PathBuf,
    pub log_level: String,
    pub log_dir: PathBuf,
}

impl CoreConfig {
    /// Builds a config rooted at `data_dir` with default logging settings.
    pub fn new(data_dir: impl Into<PathBuf>) -> Self {
        let data_dir = data_dir.into();
        Self {
            log_dir: data_dir.join(LOG_DIR_NAME),
            log_level: default_log_level().to_string(),
            data_dir,
        }
    }

    /// Reads `MININOTE_*` variables from the process environment.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Resolves the config through `lookup`, falling back to defaults.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let data_dir = non_blank(lookup(DATA_DIR_ENV))
            .map(PathBuf::from)
            .unwrap_or_else(|| std::env::temp_dir().join(DEFAULT_DATA_DIR_NAME));

        let mut config = Self::new(data_dir);
        if let Some(level) = non_blank(lookup(LOG_LEVEL_ENV)) {
            config.log_level = level;
        }
        if let Some(dir) = non_blank(lookup(LOG_DIR_ENV)) {
            config.log_dir = PathBuf::from(dir);
        }
        config
    }

    pub fn notes_db_path(&self) -> PathBuf {
        self.data_dir.join(NOTES_DB_FILE_NAME)
    }

    pub fn settings_db_path(&self) -> PathBuf {
        self.data_dir.join(SETTINGS_DB_FILE_NAME)
    }
}

fn non_blank(value: Option<String>) -> Option<String> {
    value
        .map(|raw| raw.trim().to_string())
        .filter(|trimmed| !trimmed.is_empty())
}
