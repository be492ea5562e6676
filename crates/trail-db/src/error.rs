//! Error types for storage area operations.

use thiserror::Error;

use crate::migrations::MigrationError;

/// Errors that can occur when reading or writing a key-value area.
#[derive(Debug, Error)]
pub enum AreaError {
    /// The area has been disabled by the host and accepts no operations.
    #[error("storage area is unavailable")]
    Unavailable,

    /// Writing the value would exceed the area's byte quota.
    #[error("storage quota exceeded: {required} bytes required, {quota} bytes allowed")]
    QuotaExceeded {
        /// Total bytes the area would hold after the write.
        required: usize,
        /// Configured byte quota.
        quota: usize,
    },

    /// A SQLite operation failed.
    #[error("storage database error: {0}")]
    Database(#[from] rusqlite::Error),

    /// No pooled connection could be obtained.
    #[error("storage pool error: {0}")]
    Pool(#[from] r2d2::Error),

    /// The long-term schema could not be brought up to date.
    #[error("storage schema error: {0}")]
    Migration(#[from] MigrationError),
}
