//! Schema migrations for long-term storage.
//!
//! Each schema step is a SQL file compiled into the binary. Opening a
//! [`crate::LocalArea`] brings the database up to date; the names of the
//! steps already applied live in `_trail_migrations`.

use std::collections::HashSet;

use rusqlite::Connection;
use thiserror::Error;

struct Migration {
    name: &'static str,
    sql: &'static str,
}

/// Schema steps, oldest first. Append only.
const MIGRATIONS: &[Migration] = &[Migration {
    name: "000_kv_entries",
    sql: include_str!("migrations/000_kv_entries.sql"),
}];

const BOOTSTRAP_SQL: &str = "CREATE TABLE IF NOT EXISTS _trail_migrations (
    name TEXT PRIMARY KEY,
    applied_at TEXT NOT NULL DEFAULT (datetime('now'))
);";

/// Errors raised while bringing the schema up to date.
#[derive(Debug, Error)]
pub enum MigrationError {
    /// A schema step failed; nothing from that step was kept.
    #[error("migration '{name}' failed: {source}")]
    ExecutionFailed {
        /// The step that failed.
        name: String,
        /// The underlying SQLite error.
        source: rusqlite::Error,
    },

    /// The bookkeeping table could not be created or read.
    #[error("failed to read migration state: {0}")]
    StateQuery(#[source] rusqlite::Error),
}

/// Applies every pending schema step and returns how many ran.
///
/// # Errors
///
/// Returns `MigrationError` if a step fails or the bookkeeping table
/// cannot be read.
pub fn run_migrations(conn: &Connection) -> Result<usize, MigrationError> {
    apply_pending(conn, MIGRATIONS)
}

fn apply_pending(conn: &Connection, migrations: &[Migration]) -> Result<usize, MigrationError> {
    conn.execute_batch(BOOTSTRAP_SQL)
        .map_err(MigrationError::StateQuery)?;

    let done = applied_names(conn).map_err(MigrationError::StateQuery)?;
    let pending: Vec<&Migration> = migrations
        .iter()
        .filter(|m| !done.contains(m.name))
        .collect();

    for migration in &pending {
        tracing::info!(migration = migration.name, "applying migration");
        apply_one(conn, migration).map_err(|source| MigrationError::ExecutionFailed {
            name: migration.name.to_string(),
            source,
        })?;
    }

    Ok(pending.len())
}

fn applied_names(conn: &Connection) -> rusqlite::Result<HashSet<String>> {
    let mut stmt = conn.prepare("SELECT name FROM _trail_migrations")?;
    let names = stmt
        .query_map([], |row| row.get::<_, String>(0))?
        .collect::<rusqlite::Result<HashSet<_>>>()?;
    Ok(names)
}

/// Runs one step and records it in a single transaction.
fn apply_one(conn: &Connection, migration: &Migration) -> rusqlite::Result<()> {
    let tx = conn.unchecked_transaction()?;
    tx.execute_batch(migration.sql)?;
    tx.execute(
        "INSERT INTO _trail_migrations (name) VALUES (?1)",
        [migration.name],
    )?;
    tx.commit()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn table_exists(conn: &Connection, table: &str) -> bool {
        conn.query_row(
            "SELECT EXISTS(SELECT 1 FROM sqlite_master WHERE type = 'table' AND name = ?1)",
            [table],
            |row| row.get(0),
        )
        .unwrap()
    }

    #[test]
    fn fresh_database_gets_kv_table() {
        let conn = Connection::open_in_memory().unwrap();
        assert_eq!(run_migrations(&conn).unwrap(), MIGRATIONS.len());
        assert!(table_exists(&conn, "kv_entries"));
    }

    #[test]
    fn second_run_applies_nothing() {
        let conn = Connection::open_in_memory().unwrap();
        run_migrations(&conn).unwrap();
        assert_eq!(run_migrations(&conn).unwrap(), 0);
    }

    #[test]
    fn only_new_steps_run_on_upgrade() {
        let conn = Connection::open_in_memory().unwrap();
        run_migrations(&conn).unwrap();

        let upgraded = [
            Migration {
                name: "000_kv_entries",
                sql: include_str!("migrations/000_kv_entries.sql"),
            },
            Migration {
                name: "001_probe",
                sql: "CREATE TABLE probe (id INTEGER PRIMARY KEY);",
            },
        ];
        assert_eq!(apply_pending(&conn, &upgraded).unwrap(), 1);
        assert!(table_exists(&conn, "probe"));
    }

    #[test]
    fn failed_step_leaves_no_trace() {
        let conn = Connection::open_in_memory().unwrap();
        let broken = [Migration {
            name: "001_broken",
            sql: "CREATE TABLE half_done (id INTEGER); SELECT * FROM no_such_table;",
        }];

        let err = apply_pending(&conn, &broken).unwrap_err();
        assert!(
            matches!(err, MigrationError::ExecutionFailed { ref name, .. } if name == "001_broken"),
            "unexpected error: {err:?}"
        );
        assert!(!table_exists(&conn, "half_done"));
        assert!(applied_names(&conn).unwrap().is_empty());
    }
}
