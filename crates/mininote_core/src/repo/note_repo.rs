//! Note record store contracts and SQLite implementation.
//!
//! # Responsibility
//! - Provide insert/update/delete/full-scan APIs over the `notes` table.
//! - Own the single connection of the notes file and serialize access to it.
//!
//! # Invariants
//! - Every operation runs while holding the store mutex; no two operations
//!   on one store interleave.
//! - Ids come from `AUTOINCREMENT`, so a deleted id is never handed out again.
//! - `list_all` is always ordered by `id DESC`.
//! - Update/delete of a missing id is `NotFound` and leaves the table as-is.

use crate::db::{open_db, open_db_in_memory, table_exists, table_has_column, DbError, Schema};
use crate::model::note::{Note, NoteId};
use log::{debug, error};
use rusqlite::{Connection, Row, TransactionBehavior};
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::path::Path;
use std::sync::{Mutex, MutexGuard};
use std::time::Instant;

const NOTE_SELECT_SQL: &str = "SELECT id, text, created_at FROM notes";

pub type RepoResult<T> = Result<T, RepoError>;

/// Errors from note record store operations.
#[derive(Debug)]
pub enum RepoError {
    /// Target row does not exist (benign for update/delete races).
    NotFound(NoteId),
    Db(DbError),
    InvalidData(String),
    MissingRequiredTable(&'static str),
    MissingRequiredColumn {
        table: &'static str,
        column: &'static str,
    },
    /// A previous holder of the connection panicked mid-operation.
    LockPoisoned,
    /// The blocking-pool task running the operation did not complete.
    BackgroundTask(String),
}

impl RepoError {
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound(_))
    }

    /// Everything except `NotFound` means the medium cannot be trusted.
    pub fn is_storage_fault(&self) -> bool {
        !self.is_not_found()
    }
}

impl Display for RepoError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::NotFound(id) => write!(f, "note not found: {id}"),
            Self::Db(err) => write!(f, "{err}"),
            Self::InvalidData(message) => write!(f, "invalid persisted data: {message}"),
            Self::MissingRequiredTable(table) => write!(f, "missing required table `{table}`"),
            Self::MissingRequiredColumn { table, column } => {
                write!(f, "missing required column `{table}.{column}`")
            }
            Self::LockPoisoned => write!(f, "store connection lock poisoned"),
            Self::BackgroundTask(message) => write!(f, "background storage task failed: {message}"),
        }
    }
}

impl Error for RepoError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Db(err) => Some(err),
            _ => None,
        }
    }
}

impl From<DbError> for RepoError {
    fn from(value: DbError) -> Self {
        Self::Db(value)
    }
}

impl From<rusqlite::Error> for RepoError {
    fn from(value: rusqlite::Error) -> Self {
        Self::Db(DbError::Sqlite(value))
    }
}

/// Record store interface for notes.
///
/// Implementations must be shareable across worker threads and must make
/// each call atomic with respect to every other call on the same instance.
pub trait NoteRepository: Send + Sync {
    /// Appends a note and returns it with its freshly assigned id.
    fn insert(&self, text: &str) -> RepoResult<Note>;
    /// Replaces the text of an existing note.
    fn update(&self, id: NoteId, text: &str) -> RepoResult<()>;
    /// Removes an existing note.
    fn delete(&self, id: NoteId) -> RepoResult<()>;
    /// Gets one note by id.
    fn get(&self, id: NoteId) -> RepoResult<Option<Note>>;
    /// Returns every note, newest id first.
    fn list_all(&self) -> RepoResult<Vec<Note>>;
}

/// SQLite-backed record store.
pub struct SqliteNoteRepository {
    conn: Mutex<Connection>,
}

impl SqliteNoteRepository {
    /// Wraps a migrated connection, checking the notes table shape first.
    pub fn try_new(conn: Connection) -> RepoResult<Self> {
        ensure_note_connection_ready(&conn)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    /// Opens (creating and migrating when needed) the notes file at `path`.
    pub fn open(path: impl AsRef<Path>) -> RepoResult<Self> {
        Self::try_new(open_db(path, Schema::Notes)?)
    }

    pub fn open_in_memory() -> RepoResult<Self> {
        Self::try_new(open_db_in_memory(Schema::Notes)?)
    }

    fn lock(&self) -> RepoResult<MutexGuard<'_, Connection>> {
        self.conn.lock().map_err(|_| RepoError::LockPoisoned)
    }
}

impl NoteRepository for SqliteNoteRepository {
    fn insert(&self, text: &str) -> RepoResult<Note> {
        let started_at = Instant::now();
        let result = self.lock().and_then(|mut conn| insert_note(&mut conn, text));
        log_outcome("note_insert", started_at, result.as_ref().map(|note| note.id));
        result
    }

    fn update(&self, id: NoteId, text: &str) -> RepoResult<()> {
        let started_at = Instant::now();
        let result = self.lock().and_then(|conn| {
            let changed = conn.execute(
                "UPDATE notes SET text = ?2 WHERE id = ?1;",
                rusqlite::params![id, text],
            )?;
            if changed == 0 {
                return Err(RepoError::NotFound(id));
            }
            Ok(())
        });
        log_outcome("note_update", started_at, result.as_ref().map(|_| id));
        result
    }

    fn delete(&self, id: NoteId) -> RepoResult<()> {
        let started_at = Instant::now();
        let result = self.lock().and_then(|conn| {
            let changed = conn.execute("DELETE FROM notes WHERE id = ?1;", [id])?;
            if changed == 0 {
                return Err(RepoError::NotFound(id));
            }
            Ok(())
        });
        log_outcome("note_delete", started_at, result.as_ref().map(|_| id));
        result
    }

    fn get(&self, id: NoteId) -> RepoResult<Option<Note>> {
        let conn = self.lock()?;
        let mut stmt = conn.prepare(&format!("{NOTE_SELECT_SQL} WHERE id = ?1;"))?;
        let mut rows = stmt.query([id])?;
        if let Some(row) = rows.next()? {
            return Ok(Some(parse_note_row(row)?));
        }
        Ok(None)
    }

    fn list_all(&self) -> RepoResult<Vec<Note>> {
        let conn = self.lock()?;
        let mut stmt = conn.prepare(&format!("{NOTE_SELECT_SQL} ORDER BY id DESC;"))?;
        let mut rows = stmt.query([])?;
        let mut notes = Vec::new();
        while let Some(row) = rows.next()? {
            notes.push(parse_note_row(row)?);
        }
        Ok(notes)
    }
}

fn insert_note(conn: &mut Connection, text: &str) -> RepoResult<Note> {
    let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;
    tx.execute(
        "INSERT INTO notes (text, created_at)
         VALUES (?1, CAST((julianday('now') - 2440587.5) * 86400000 AS INTEGER));",
        [text],
    )?;
    let id = tx.last_insert_rowid();

    let note = {
        let mut stmt = tx.prepare(&format!("{NOTE_SELECT_SQL} WHERE id = ?1;"))?;
        let mut rows = stmt.query([id])?;
        let Some(row) = rows.next()? else {
            return Err(RepoError::InvalidData(format!(
                "inserted note {id} missing in read-back"
            )));
        };
        parse_note_row(row)?
    };

    tx.commit()?;
    Ok(note)
}

fn parse_note_row(row: &Row<'_>) -> RepoResult<Note> {
    let id: i64 = row.get("id")?;
    if id < 0 {
        return Err(RepoError::InvalidData(format!(
            "negative id value `{id}` in notes.id"
        )));
    }

    Ok(Note {
        id,
        text: row.get("text")?,
        created_at: row.get("created_at")?,
    })
}

fn log_outcome(event: &str, started_at: Instant, outcome: Result<NoteId, &RepoError>) {
    let duration_ms = started_at.elapsed().as_millis();
    match outcome {
        Ok(id) => debug!(
            "event={event} module=repo status=ok id={id} duration_ms={duration_ms}"
        ),
        Err(RepoError::NotFound(id)) => debug!(
            "event={event} module=repo status=not_found id={id} duration_ms={duration_ms}"
        ),
        Err(err) => error!(
            "event={event} module=repo status=error duration_ms={duration_ms} error={err}"
        ),
    }
}

fn ensure_note_connection_ready(conn: &Connection) -> RepoResult<()> {
    if !table_exists(conn, "notes")? {
        return Err(RepoError::MissingRequiredTable("notes"));
    }

    for column in ["id", "text", "created_at"] {
        if !table_has_column(conn, "notes", column)? {
            return Err(RepoError::MissingRequiredColumn {
                table: "notes",
                column,
            });
        }
    }

    Ok(())
}
