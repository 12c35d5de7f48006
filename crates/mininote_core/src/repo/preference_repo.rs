//! Theme preference store over the settings file.
//!
//! # Responsibility
//! - Persist the single dark-theme flag under `DARK_THEME_KEY`.
//!
//! # Invariants
//! - The row is created lazily on first read with `DEFAULT_DARK_THEME`.
//! - The row is never deleted.

use crate::db::{open_db, open_db_in_memory, table_exists, DbError, Schema};
use crate::model::preference::{ThemePreference, DARK_THEME_KEY};
use log::debug;
use rusqlite::{params, Connection, OptionalExtension};
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::path::Path;
use std::sync::{Mutex, MutexGuard};

pub type PreferenceResult<T> = Result<T, PreferenceError>;

/// Errors from preference store operations.
///
/// The preference row is created on demand, so there is no not-found case.
#[derive(Debug)]
pub enum PreferenceError {
    Db(DbError),
    /// Stored value is not a valid boolean.
    InvalidData(String),
    MissingRequiredTable(&'static str),
    LockPoisoned,
    /// The blocking-pool task running the write did not complete.
    BackgroundTask(String),
}

impl Display for PreferenceError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Db(err) => write!(f, "{err}"),
            Self::InvalidData(message) => write!(f, "invalid preference data: {message}"),
            Self::MissingRequiredTable(table) => {
                write!(f, "preference store requires table `{table}`")
            }
            Self::LockPoisoned => write!(f, "preference connection lock poisoned"),
            Self::BackgroundTask(message) => {
                write!(f, "background preference task failed: {message}")
            }
        }
    }
}

impl Error for PreferenceError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Db(err) => Some(err),
            Self::InvalidData(_) => None,
            Self::MissingRequiredTable(_) => None,
            Self::LockPoisoned => None,
            Self::BackgroundTask(_) => None,
        }
    }
}

impl From<DbError> for PreferenceError {
    fn from(value: DbError) -> Self {
        Self::Db(value)
    }
}

impl From<rusqlite::Error> for PreferenceError {
    fn from(value: rusqlite::Error) -> Self {
        Self::Db(DbError::Sqlite(value))
    }
}

/// Durable store for the theme preference.
pub trait PreferenceRepository: Send + Sync {
    /// Reads the stored preference, persisting the default when absent.
    fn read(&self) -> PreferenceResult<ThemePreference>;
    fn write(&self, preference: ThemePreference) -> PreferenceResult<()>;
}

/// SQLite-backed preference store.
pub struct SqlitePreferenceRepository {
    conn: Mutex<Connection>,
}

impl SqlitePreferenceRepository {
    pub fn try_new(conn: Connection) -> PreferenceResult<Self> {
        if !table_exists(&conn, "preferences")? {
            return Err(PreferenceError::MissingRequiredTable("preferences"));
        }
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    pub fn open(path: impl AsRef<Path>) -> PreferenceResult<Self> {
        Self::try_new(open_db(path, Schema::Settings)?)
    }

    pub fn open_in_memory() -> PreferenceResult<Self> {
        Self::try_new(open_db_in_memory(Schema::Settings)?)
    }

    fn lock(&self) -> PreferenceResult<MutexGuard<'_, Connection>> {
        self.conn.lock().map_err(|_| PreferenceError::LockPoisoned)
    }
}

impl PreferenceRepository for SqlitePreferenceRepository {
    fn read(&self) -> PreferenceResult<ThemePreference> {
        let conn = self.lock()?;
        let stored: Option<i64> = conn
            .query_row(
                "SELECT value FROM preferences WHERE key = ?1;",
                [DARK_THEME_KEY],
                |row| row.get(0),
            )
            .optional()?;

        match stored {
            Some(value) => Ok(ThemePreference {
                is_dark: int_to_bool(value)?,
            }),
            None => {
                let preference = ThemePreference::default();
                conn.execute(
                    "INSERT OR IGNORE INTO preferences (key, value) VALUES (?1, ?2);",
                    params![DARK_THEME_KEY, i64::from(preference.is_dark)],
                )?;
                debug!(
                    "event=preference_default module=repo status=ok key={} is_dark={}",
                    DARK_THEME_KEY, preference.is_dark
                );
                Ok(preference)
            }
        }
    }

    fn write(&self, preference: ThemePreference) -> PreferenceResult<()> {
        let conn = self.lock()?;
        conn.execute(
            "INSERT INTO preferences (key, value) VALUES (?1, ?2)
             ON CONFLICT(key) DO UPDATE SET value = excluded.value;",
            params![DARK_THEME_KEY, i64::from(preference.is_dark)],
        )?;
        debug!(
            "event=preference_write module=repo status=ok key={} is_dark={}",
            DARK_THEME_KEY, preference.is_dark
        );
        Ok(())
    }
}

fn int_to_bool(value: i64) -> PreferenceResult<bool> {
    match value {
        0 => Ok(false),
        1 => Ok(true),
        other => Err(PreferenceError::InvalidData(format!(
            "invalid boolean value `{other}` in preferences.value"
        ))),
    }
}
