//! Storage backends: where the engine keeps its trail between reloads.
//!
//! A backend moves the whole event list as one unit. Every call returns a
//! `Result`; the engine decides that failures are logged and absorbed.

use std::sync::{Arc, Mutex, PoisonError};

use trail_db::{AreaError, KeyValueArea};
use trail_types::{Event, StorageMode};

use crate::error::StorageError;
use crate::host::Host;

/// Loads and saves the full event list.
pub trait StorageBackend: Send + Sync {
    /// The mode this backend implements, for logging.
    fn mode(&self) -> StorageMode;

    /// Returns the persisted list, or an empty list if nothing was stored.
    fn load(&self) -> Result<Vec<Event>, StorageError>;

    /// Replaces the persisted list with `events`.
    fn save(&self, events: &[Event]) -> Result<(), StorageError>;
}

/// Volatile backend whose contents die with the engine that owns it.
#[derive(Debug, Default)]
pub struct MemoryBackend {
    events: Mutex<Vec<Event>>,
}

impl MemoryBackend {
    /// Creates an empty memory backend.
    pub fn new() -> Self {
        Self::default()
    }
}

impl StorageBackend for MemoryBackend {
    fn mode(&self) -> StorageMode {
        StorageMode::Memory
    }

    fn load(&self) -> Result<Vec<Event>, StorageError> {
        Ok(self
            .events
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone())
    }

    fn save(&self, events: &[Event]) -> Result<(), StorageError> {
        *self.events.lock().unwrap_or_else(PoisonError::into_inner) = events.to_vec();
        Ok(())
    }
}

/// Durable backend storing the list as JSON text under one key of a
/// key-value area.
pub struct AreaBackend {
    area: Option<Arc<dyn KeyValueArea>>,
    key: String,
    mode: StorageMode,
}

impl AreaBackend {
    /// Creates a backend over `area`. A `None` area behaves like storage
    /// the host has disabled: every call fails with `Unavailable`.
    pub fn new(
        area: Option<Arc<dyn KeyValueArea>>,
        key: impl Into<String>,
        mode: StorageMode,
    ) -> Self {
        Self {
            area,
            key: key.into(),
            mode,
        }
    }

    fn area(&self) -> Result<&dyn KeyValueArea, StorageError> {
        self.area
            .as_deref()
            .ok_or(StorageError::Area(AreaError::Unavailable))
    }
}

impl std::fmt::Debug for AreaBackend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AreaBackend")
            .field("key", &self.key)
            .field("mode", &self.mode)
            .field("has_area", &self.area.is_some())
            .finish()
    }
}

impl StorageBackend for AreaBackend {
    fn mode(&self) -> StorageMode {
        self.mode
    }

    fn load(&self) -> Result<Vec<Event>, StorageError> {
        let Some(text) = self.area()?.get_item(&self.key)? else {
            return Ok(Vec::new());
        };

        // The outer shape must be an array; individual entries that no
        // longer match the envelope are dropped rather than failing the load.
        let raw: Vec<serde_json::Value> = serde_json::from_str(&text)?;
        let total = raw.len();
        let events: Vec<Event> = raw
            .into_iter()
            .filter_map(|value| serde_json::from_value(value).ok())
            .collect();

        if events.len() < total {
            tracing::warn!(
                key = %self.key,
                mode = %self.mode,
                skipped = total - events.len(),
                "dropped malformed entries from persisted trail"
            );
        }

        Ok(events)
    }

    fn save(&self, events: &[Event]) -> Result<(), StorageError> {
        let area = self.area()?;
        let text = serde_json::to_string(events)?;
        area.set_item(&self.key, &text)?;
        Ok(())
    }
}

/// Builds the backend matching `mode` from the host's storage areas.
pub(crate) fn for_mode(mode: StorageMode, key: &str, host: &Host) -> Box<dyn StorageBackend> {
    match mode {
        StorageMode::Memory => Box::new(MemoryBackend::new()),
        StorageMode::Session => Box::new(AreaBackend::new(
            Some(host.session_area()),
            key,
            StorageMode::Session,
        )),
        StorageMode::Local => Box::new(AreaBackend::new(host.local_area(), key, StorageMode::Local)),
    }
}
