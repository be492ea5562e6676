//! Shared types and constants for the activity trail workspace.
//!
//! This crate provides the foundational types used across all trail crates:
//! the immutable [`Event`] envelope, the [`StorageMode`] selector, and the
//! recorder defaults. It carries no behaviour beyond parsing and formatting,
//! so every other crate can depend on it without pulling in storage or
//! runtime concerns.

use serde::{Deserialize, Serialize};
use thiserror::Error;

mod event;

pub use event::{Event, Metadata, Viewport};

/// Storage key used when the recorder configuration does not name one.
pub const DEFAULT_STORAGE_KEY: &str = "activity_trail:events";

/// Number of events retained when the recorder configuration does not say.
pub const DEFAULT_MAX_EVENTS: usize = 50;

/// Where a recorder keeps its event list between reloads.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StorageMode {
    /// Lives only as long as the recorder instance. Never persisted.
    #[default]
    Memory,
    /// Persisted in the session-scoped key-value area.
    Session,
    /// Persisted in the origin-scoped long-term key-value area.
    Local,
}

impl StorageMode {
    /// Returns the canonical lowercase label for this mode.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Memory => "memory",
            Self::Session => "session",
            Self::Local => "local",
        }
    }

    /// Whether events written in this mode outlive the recorder instance.
    pub fn is_durable(self) -> bool {
        !matches!(self, Self::Memory)
    }
}

impl std::fmt::Display for StorageMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for StorageMode {
    type Err = ParseStorageModeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "memory" => Ok(Self::Memory),
            "session" => Ok(Self::Session),
            "local" => Ok(Self::Local),
            _ => Err(ParseStorageModeError(s.to_string())),
        }
    }
}

/// Error returned when parsing an unknown storage mode string.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown storage mode: {0} (expected one of: memory, session, local)")]
pub struct ParseStorageModeError(pub String);
