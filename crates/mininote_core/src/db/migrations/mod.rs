//! SQLite migration registry and executor.
//!
//! # Responsibility
//! - Register schema migrations per database file in strictly increasing order.
//! - Apply pending migrations atomically at open time.
//!
//! # Invariants
//! - `version` values must remain monotonic within one schema.
//! - Applied migration version is mirrored to `PRAGMA user_version`.
//! - Migrations are additive only; re-running a step on an already
//!   migrated file must not fail.

use crate::db::{schema_version, table_has_column, DbError, DbResult};
use log::info;
use rusqlite::{Connection, Transaction};

/// Logical schema carried by one SQLite file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Schema {
    /// `notes` table owned by the record store.
    Notes,
    /// `preferences` key/value table owned by the preference store.
    Settings,
}

impl Schema {
    /// Stable lowercase label used in logs and error messages.
    pub fn label(self) -> &'static str {
        match self {
            Self::Notes => "notes",
            Self::Settings => "settings",
        }
    }

    fn migrations(self) -> &'static [Migration] {
        match self {
            Self::Notes => NOTES_MIGRATIONS,
            Self::Settings => SETTINGS_MIGRATIONS,
        }
    }
}

#[derive(Debug, Clone, Copy)]
enum MigrationStep {
    Sql(&'static str),
    /// Skipped when the column is already present.
    AddColumn {
        table: &'static str,
        column: &'static str,
        definition: &'static str,
    },
}

#[derive(Debug, Clone, Copy)]
struct Migration {
    version: u32,
    step: MigrationStep,
}

const NOTES_MIGRATIONS: &[Migration] = &[
    Migration {
        version: 1,
        step: MigrationStep::Sql(include_str!("0001_notes_init.sql")),
    },
    Migration {
        version: 2,
        step: MigrationStep::AddColumn {
            table: "notes",
            column: "created_at",
            definition: "INTEGER NOT NULL DEFAULT 0",
        },
    },
];

const SETTINGS_MIGRATIONS: &[Migration] = &[Migration {
    version: 1,
    step: MigrationStep::Sql(include_str!("0001_settings_init.sql")),
}];

/// Returns the latest migration version known by this binary for `schema`.
pub fn latest_version(schema: Schema) -> u32 {
    schema
        .migrations()
        .last()
        .map_or(0, |migration| migration.version)
}

/// Applies all pending migrations of `schema` on the provided connection.
pub fn apply_migrations(conn: &mut Connection, schema: Schema) -> DbResult<()> {
    let current_version = schema_version(conn)?;
    let latest = latest_version(schema);

    if current_version > latest {
        return Err(DbError::UnsupportedSchemaVersion {
            schema,
            db_version: current_version,
            latest_supported: latest,
        });
    }

    if current_version == latest {
        return Ok(());
    }

    let tx = conn.transaction()?;
    for migration in schema.migrations() {
        if migration.version <= current_version {
            continue;
        }

        apply_step(&tx, migration.step)?;
        tx.execute_batch(&format!("PRAGMA user_version = {};", migration.version))?;
    }
    tx.commit()?;

    info!(
        "event=db_migrate module=db status=ok schema={} from_version={} to_version={}",
        schema.label(),
        current_version,
        latest
    );
    Ok(())
}

fn apply_step(tx: &Transaction<'_>, step: MigrationStep) -> DbResult<()> {
    match step {
        MigrationStep::Sql(sql) => tx.execute_batch(sql)?,
        MigrationStep::AddColumn {
            table,
            column,
            definition,
        } => {
            if !table_has_column(tx, table, column)? {
                tx.execute_batch(&format!(
                    "ALTER TABLE {table} ADD COLUMN {column} {definition};"
                ))?;
            }
        }
    }
    Ok(())
}
