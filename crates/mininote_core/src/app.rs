//! Application context owning every store and service.
//!
//! # Responsibility
//! - Open the notes and settings files described by [`CoreConfig`].
//! - Hand presentation code the coordinator and theme service it renders
//!   from, instead of process-wide mutable state.
//!
//! # Invariants
//! - Each file is opened by exactly one store owned by this context.
//! - Opening performs all blocking I/O on tokio's blocking pool.

use crate::config::CoreConfig;
use crate::repo::note_repo::{RepoError, SqliteNoteRepository};
use crate::repo::preference_repo::{PreferenceError, SqlitePreferenceRepository};
use crate::service::note_coordinator::NoteCoordinator;
use crate::service::note_feed::NoteFeed;
use crate::service::theme_service::ThemeService;
use log::{error, info};
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Instant;
use tokio::runtime::Handle;

#[derive(Debug)]
pub enum AppError {
    CreateDataDir {
        dir: PathBuf,
        source: std::io::Error,
    },
    Repo(RepoError),
    Preference(PreferenceError),
    /// The blocking open task did not complete.
    Startup(String),
}

impl Display for AppError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::CreateDataDir { dir, source } => write!(
                f,
                "failed to create data directory `{}`: {source}",
                dir.display()
            ),
            Self::Repo(err) => write!(f, "{err}"),
            Self::Preference(err) => write!(f, "{err}"),
            Self::Startup(message) => write!(f, "startup task failed: {message}"),
        }
    }
}

impl Error for AppError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::CreateDataDir { source, .. } => Some(source),
            Self::Repo(err) => Some(err),
            Self::Preference(err) => Some(err),
            Self::Startup(_) => None,
        }
    }
}

impl From<RepoError> for AppError {
    fn from(value: RepoError) -> Self {
        Self::Repo(value)
    }
}

impl From<PreferenceError> for AppError {
    fn from(value: PreferenceError) -> Self {
        Self::Preference(value)
    }
}

pub type NotesHandle = NoteCoordinator<SqliteNoteRepository>;
pub type ThemeHandle = ThemeService<SqlitePreferenceRepository>;

/// Opened application state: note coordinator plus theme service.
pub struct AppCore {
    notes: NotesHandle,
    theme: ThemeHandle,
}

impl AppCore {
    /// Opens both stores and starts the note coordinator on the current runtime.
    ///
    /// Must be called from within a tokio runtime.
    pub async fn open(config: &CoreConfig) -> Result<Self, AppError> {
        let started_at = Instant::now();
        let data_dir = config.data_dir.clone();
        let notes_path = config.notes_db_path();
        let settings_path = config.settings_db_path();

        let opened = tokio::task::spawn_blocking(move || open_stores(data_dir, notes_path, settings_path))
            .await
            .map_err(|join_err| AppError::Startup(join_err.to_string()))
            .and_then(|result| result);

        let (feed, theme) = match opened {
            Ok(stores) => stores,
            Err(err) => {
                error!(
                    "event=app_open module=app status=error duration_ms={} error={}",
                    started_at.elapsed().as_millis(),
                    err
                );
                return Err(err);
            }
        };

        let notes = NoteCoordinator::spawn(Arc::new(feed), &Handle::current());
        info!(
            "event=app_open module=app status=ok duration_ms={} notes={} is_dark={}",
            started_at.elapsed().as_millis(),
            notes.current().len(),
            theme.is_dark()
        );
        Ok(Self { notes, theme })
    }

    pub fn notes(&self) -> &NotesHandle {
        &self.notes
    }

    pub fn theme(&self) -> &ThemeHandle {
        &self.theme
    }

    /// Drains pending note mutations and stops the coordinator.
    pub async fn shutdown(self) {
        self.notes.shutdown().await;
        info!("event=app_close module=app status=ok");
    }
}

fn open_stores(
    data_dir: PathBuf,
    notes_path: PathBuf,
    settings_path: PathBuf,
) -> Result<(NoteFeed<SqliteNoteRepository>, ThemeHandle), AppError> {
    std::fs::create_dir_all(&data_dir).map_err(|source| AppError::CreateDataDir {
        dir: data_dir.clone(),
        source,
    })?;

    let feed = NoteFeed::new(SqliteNoteRepository::open(notes_path)?)?;
    let theme = ThemeService::new(SqlitePreferenceRepository::open(settings_path)?)?;
    Ok((feed, theme))
}
