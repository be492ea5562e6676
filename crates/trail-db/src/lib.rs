//! Key-value storage areas for the activity trail.
//!
//! Recorders persist their event list through a [`KeyValueArea`], an
//! interface shaped after the browser storage API: string keys, string
//! values, and three operations. Two areas ship here:
//!
//! - [`SessionArea`]: an in-process map that lives for one session and is
//!   shared by every recorder built from the same host.
//! - [`LocalArea`]: a SQLite-backed area scoped to an origin that survives
//!   process restarts.
//!
//! Every operation returns a `Result`. Callers decide whether a failure is
//! surfaced or absorbed; this crate never swallows errors itself.
//!
//! # Design decisions
//!
//! - **SQLite with WAL mode** for the local area: no external process, and
//!   concurrent readers with a single writer match the recorder's access
//!   pattern.
//! - **`r2d2` connection pool**: bounded connection reuse without manual
//!   lifetime management.
//! - **Embedded migrations**: SQL files are compiled into the binary via
//!   `include_str!`, so the schema cannot drift from the code that reads it.

mod area;
mod error;
mod local;
mod migrations;
mod pool;

pub use area::{KeyValueArea, SessionArea};
pub use error::AreaError;
pub use local::LocalArea;
pub use migrations::{run_migrations, MigrationError};
pub use pool::{create_pool, DbPool, DbRuntimeSettings, PoolError};
