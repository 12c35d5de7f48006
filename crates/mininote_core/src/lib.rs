//! Core persistence layer for MiniNote.
//! This crate is the single source of truth for stored notes and the theme
//! flag, and for the live views presentation code renders from.

pub mod app;
pub mod config;
pub mod db;
pub mod live;
pub mod logging;
pub mod model;
pub mod repo;
pub mod service;

pub use app::{AppCore, AppError};
pub use config::CoreConfig;
pub use live::{LiveValue, Subscription};
pub use logging::{
    default_log_level, init_logging, init_logging_from_config, logging_status, LoggingError,
};
pub use model::note::{validate_note_text, Note, NoteId, NoteValidationError};
pub use model::preference::{ThemePreference, DARK_THEME_KEY, DEFAULT_DARK_THEME};
pub use repo::note_repo::{NoteRepository, RepoError, RepoResult, SqliteNoteRepository};
pub use repo::preference_repo::{
    PreferenceError, PreferenceRepository, PreferenceResult, SqlitePreferenceRepository,
};
pub use service::note_coordinator::{
    CoordinatorError, MutationFault, MutationKind, NoteCoordinator,
};
pub use service::note_feed::{NoteFeed, NoteSnapshot};
pub use service::theme_service::ThemeService;

/// Minimal health-check API for early integration.
pub fn ping() -> &'static str {
    "pong"
}

/// Returns the core crate version.
pub fn core_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
