//! Error types for the recorder.

use trail_db::AreaError;

/// Errors returned by storage backends.
///
/// The engine logs and discards these; they exist so every failure point
/// is visible to tests and to custom backends.
#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    /// The underlying key-value area failed.
    #[error("storage area error: {0}")]
    Area(#[from] AreaError),

    /// The persisted text could not be parsed, or the list could not be
    /// serialized.
    #[error("storage serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Errors caused by misusing the engine API.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ObserveError {
    /// `record` was called with an empty or whitespace-only name.
    #[error("event name cannot be empty")]
    EmptyEventName,
}

/// Errors raised by the binding layer.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum BindingError {
    /// The activity context was requested outside any provider scope.
    #[error("use_activity() was called outside an ActivityProvider scope; wrap the caller in ActivityProvider::provide")]
    OutsideProvider,
}
