//! Connection bootstrap utilities for SQLite.
//!
//! # Responsibility
//! - Open file or in-memory SQLite connections.
//! - Configure connection pragmas required by core durability behavior.
//! - Trigger schema migrations before returning a usable connection.
//!
//! # Invariants
//! - Returned connections have `synchronous=FULL`.
//! - Returned connections have migrations for their schema fully applied.
//! - File connections run in `locking_mode=EXCLUSIVE` and hold the file lock
//!   until dropped.

use super::migrations::{apply_migrations, Schema};
use super::{DbError, DbResult};
use log::{error, info};
use rusqlite::{Connection, ErrorCode};
use std::path::Path;
use std::time::{Duration, Instant};

/// Opens a SQLite database file and applies all pending `schema` migrations.
///
/// # Side effects
/// - Creates the file when missing.
/// - Takes an exclusive lock on the file for the connection's lifetime.
/// - Emits `db_open` logging events with duration and status.
///
/// # Errors
/// - [`DbError::StoreInUse`] when another connection holds the file.
pub fn open_db(path: impl AsRef<Path>, schema: Schema) -> DbResult<Connection> {
    let path = path.as_ref();
    let started_at = Instant::now();
    info!(
        "event=db_open module=db status=start mode=file schema={}",
        schema.label()
    );
    finish_open(Connection::open(path), schema, Some(path), started_at)
}

/// Opens an in-memory SQLite database and applies all pending `schema` migrations.
pub fn open_db_in_memory(schema: Schema) -> DbResult<Connection> {
    let started_at = Instant::now();
    info!(
        "event=db_open module=db status=start mode=memory schema={}",
        schema.label()
    );
    finish_open(Connection::open_in_memory(), schema, None, started_at)
}

fn finish_open(
    opened: rusqlite::Result<Connection>,
    schema: Schema,
    file: Option<&Path>,
    started_at: Instant,
) -> DbResult<Connection> {
    let mode = if file.is_some() { "file" } else { "memory" };
    let mut conn = match opened {
        Ok(conn) => conn,
        Err(err) => {
            error!(
                "event=db_open module=db status=error mode={} schema={} duration_ms={} error_code=db_open_failed error={}",
                mode,
                schema.label(),
                started_at.elapsed().as_millis(),
                err
            );
            return Err(err.into());
        }
    };

    match bootstrap_connection(&mut conn, schema, file) {
        Ok(()) => {
            info!(
                "event=db_open module=db status=ok mode={} schema={} duration_ms={}",
                mode,
                schema.label(),
                started_at.elapsed().as_millis()
            );
            Ok(conn)
        }
        Err(err) => {
            error!(
                "event=db_open module=db status=error mode={} schema={} duration_ms={} error_code=db_bootstrap_failed error={}",
                mode,
                schema.label(),
                started_at.elapsed().as_millis(),
                err
            );
            Err(err)
        }
    }
}

fn bootstrap_connection(
    conn: &mut Connection,
    schema: Schema,
    file: Option<&Path>,
) -> DbResult<()> {
    conn.execute_batch("PRAGMA synchronous = FULL;")?;
    if let Some(path) = file {
        claim_exclusive(conn, path)?;
    }
    conn.busy_timeout(Duration::from_secs(5))?;
    apply_migrations(conn, schema)?;
    Ok(())
}

/// Locks the file for this connection until it is closed.
///
/// Fails fast instead of waiting out another owner.
fn claim_exclusive(conn: &Connection, path: &Path) -> DbResult<()> {
    conn.busy_timeout(Duration::ZERO)?;
    // The pragma answers with the new mode; only the side effect matters.
    conn.query_row("PRAGMA locking_mode = EXCLUSIVE;", [], |row| {
        row.get::<_, String>(0)
    })?;

    match conn.execute_batch("BEGIN EXCLUSIVE; COMMIT;") {
        Ok(()) => Ok(()),
        Err(err) if is_lock_conflict(&err) => Err(DbError::StoreInUse {
            path: path.to_path_buf(),
        }),
        Err(err) => Err(err.into()),
    }
}

fn is_lock_conflict(err: &rusqlite::Error) -> bool {
    matches!(
        err.sqlite_error_code(),
        Some(ErrorCode::DatabaseBusy | ErrorCode::DatabaseLocked)
    )
}
