use mininote_core::db::migrations::latest_version;
use mininote_core::db::{open_db, open_db_in_memory, schema_version, table_has_column, DbError, Schema};
use rusqlite::Connection;
use std::time::Duration;

#[test]
fn open_notes_in_memory_applies_all_migrations() {
    let conn = open_db_in_memory(Schema::Notes).unwrap();

    assert_eq!(schema_version(&conn).unwrap(), latest_version(Schema::Notes));
    assert_eq!(latest_version(Schema::Notes), 2);
    assert_table_exists(&conn, "notes");
    assert!(table_has_column(&conn, "notes", "created_at").unwrap());
}

#[test]
fn open_settings_in_memory_creates_preferences_only() {
    let conn = open_db_in_memory(Schema::Settings).unwrap();

    assert_eq!(
        schema_version(&conn).unwrap(),
        latest_version(Schema::Settings)
    );
    assert_table_exists(&conn, "preferences");
    assert_table_missing(&conn, "notes");
}

#[test]
fn opening_same_database_twice_is_idempotent() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("notes.sqlite3");

    let conn_first = open_db(&path, Schema::Notes).unwrap();
    conn_first
        .execute("INSERT INTO notes (text) VALUES ('kept');", [])
        .unwrap();
    drop(conn_first);

    let conn_second = open_db(&path, Schema::Notes).unwrap();
    assert_eq!(
        schema_version(&conn_second).unwrap(),
        latest_version(Schema::Notes)
    );
    let count: i64 = conn_second
        .query_row("SELECT COUNT(*) FROM notes;", [], |row| row.get(0))
        .unwrap();
    assert_eq!(count, 1);
}

#[test]
fn version_one_file_gains_created_at_with_default() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("legacy.sqlite3");

    let legacy = Connection::open(&path).unwrap();
    legacy
        .execute_batch(
            "CREATE TABLE notes (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                text TEXT NOT NULL
            );
            INSERT INTO notes (text) VALUES ('from v1');
            PRAGMA user_version = 1;",
        )
        .unwrap();
    drop(legacy);

    let conn = open_db(&path, Schema::Notes).unwrap();
    assert_eq!(schema_version(&conn).unwrap(), 2);
    let (text, created_at): (String, i64) = conn
        .query_row("SELECT text, created_at FROM notes;", [], |row| {
            Ok((row.get(0)?, row.get(1)?))
        })
        .unwrap();
    assert_eq!(text, "from v1");
    assert_eq!(created_at, 0);
}

#[test]
fn add_column_step_tolerates_existing_column() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("half-migrated.sqlite3");

    let partial = Connection::open(&path).unwrap();
    partial
        .execute_batch(
            "CREATE TABLE notes (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                text TEXT NOT NULL,
                created_at INTEGER NOT NULL DEFAULT 0
            );
            PRAGMA user_version = 1;",
        )
        .unwrap();
    drop(partial);

    let conn = open_db(&path, Schema::Notes).unwrap();
    assert_eq!(schema_version(&conn).unwrap(), 2);
    assert!(table_has_column(&conn, "notes", "created_at").unwrap());
}

#[test]
fn opening_database_with_newer_schema_version_returns_error() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("future.sqlite3");

    let conn = Connection::open(&path).unwrap();
    conn.execute_batch("PRAGMA user_version = 999;").unwrap();
    drop(conn);

    let err = open_db(&path, Schema::Notes).unwrap_err();
    match err {
        DbError::UnsupportedSchemaVersion {
            schema,
            db_version,
            latest_supported,
        } => {
            assert_eq!(schema, Schema::Notes);
            assert_eq!(db_version, 999);
            assert_eq!(latest_supported, latest_version(Schema::Notes));
        }
        other => panic!("unexpected error: {other}"),
    }
}

#[test]
fn file_is_locked_while_a_connection_owns_it() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("settings.sqlite3");

    let owner = open_db(&path, Schema::Settings).unwrap();
    let err = open_db(&path, Schema::Settings).unwrap_err();
    assert!(matches!(err, DbError::StoreInUse { .. }), "got {err}");

    let outsider = Connection::open(&path).unwrap();
    outsider.busy_timeout(Duration::ZERO).unwrap();
    assert!(outsider
        .query_row("SELECT COUNT(*) FROM preferences;", [], |row| row.get::<_, i64>(0))
        .is_err());
    drop(outsider);

    drop(owner);
    open_db(&path, Schema::Settings).unwrap();
}

fn assert_table_exists(conn: &Connection, table_name: &str) {
    assert_eq!(table_count(conn, table_name), 1, "table {table_name} does not exist");
}

fn assert_table_missing(conn: &Connection, table_name: &str) {
    assert_eq!(table_count(conn, table_name), 0, "table {table_name} should not exist");
}

fn table_count(conn: &Connection, table_name: &str) -> i64 {
    conn.query_row(
        "SELECT COUNT(*)
         FROM sqlite_master
         WHERE type = 'table' AND name = ?1;",
        [table_name],
        |row| row.get(0),
    )
    .unwrap()
}
