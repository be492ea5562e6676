//! SQLite connection pool for the long-term area.

use r2d2::Pool;
use r2d2_sqlite::SqliteConnectionManager;
use rusqlite::{Connection, OpenFlags};
use thiserror::Error;

/// Connection tunables.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DbRuntimeSettings {
    /// How long a connection waits on a locked database, in milliseconds.
    pub busy_timeout_ms: u64,

    /// Upper bound on pooled connections.
    pub pool_max_size: u32,
}

impl Default for DbRuntimeSettings {
    fn default() -> Self {
        Self {
            busy_timeout_ms: 5_000,
            pool_max_size: 4,
        }
    }
}

/// Pool handed to [`crate::LocalArea::open`].
pub type DbPool = Pool<SqliteConnectionManager>;

/// Errors that can occur when creating the pool.
#[derive(Debug, Error)]
pub enum PoolError {
    /// The pool could not establish its initial connections.
    #[error("failed to create database connection pool: {0}")]
    PoolInit(#[from] r2d2::Error),
}

/// Opens a pool on the database file at `db_path`, creating it if needed.
///
/// Every connection runs in WAL mode with the configured busy timeout.
/// Each pooled connection to `:memory:` gets a private database, so tests
/// that need shared state use a file from `tempfile`.
///
/// # Errors
///
/// Returns `PoolError::PoolInit` if the pool cannot be built.
pub fn create_pool(db_path: &str, settings: DbRuntimeSettings) -> Result<DbPool, PoolError> {
    let manager = SqliteConnectionManager::file(db_path)
        .with_flags(
            OpenFlags::SQLITE_OPEN_READ_WRITE
                | OpenFlags::SQLITE_OPEN_CREATE
                | OpenFlags::SQLITE_OPEN_FULL_MUTEX,
        )
        .with_init(move |conn| configure_connection(conn, settings.busy_timeout_ms));

    let pool = Pool::builder()
        .max_size(settings.pool_max_size)
        .build(manager)?;
    tracing::debug!(path = db_path, max_size = settings.pool_max_size, "opened storage pool");
    Ok(pool)
}

fn configure_connection(conn: &mut Connection, busy_timeout_ms: u64) -> rusqlite::Result<()> {
    let journal_mode: String = conn.query_row("PRAGMA journal_mode = WAL", [], |row| row.get(0))?;
    // In-memory databases report "memory".
    if journal_mode != "wal" && journal_mode != "memory" {
        return Err(rusqlite::Error::SqliteFailure(
            rusqlite::ffi::Error::new(rusqlite::ffi::SQLITE_ERROR),
            Some(format!("journal mode stuck at {journal_mode}")),
        ));
    }
    conn.busy_timeout(std::time::Duration::from_millis(busy_timeout_ms))
}
