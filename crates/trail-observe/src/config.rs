//! Engine construction options.

use serde::Deserialize;
use trail_types::{StorageMode, DEFAULT_MAX_EVENTS, DEFAULT_STORAGE_KEY};

/// Options recognised when building an [`crate::EventEngine`].
///
/// Deserializes from either snake_case (`storage_key`, `max_events`) or the
/// camelCase names used by embedding hosts (`storageKey`, `maxEvents`).
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct EngineConfig {
    /// Which backend keeps the trail between reloads.
    #[serde(default)]
    pub storage: StorageMode,

    /// Key the durable backends store the trail under.
    #[serde(default = "default_storage_key", alias = "storageKey")]
    pub storage_key: String,

    /// Requested retention bound. See [`EngineConfig::max_events`].
    #[serde(default, alias = "maxEvents")]
    pub max_events: Option<i64>,
}

fn default_storage_key() -> String {
    DEFAULT_STORAGE_KEY.to_string()
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            storage: StorageMode::default(),
            storage_key: default_storage_key(),
            max_events: None,
        }
    }
}

impl EngineConfig {
    /// Sets the storage mode.
    #[must_use]
    pub fn with_storage(mut self, storage: StorageMode) -> Self {
        self.storage = storage;
        self
    }

    /// Sets the storage key.
    #[must_use]
    pub fn with_storage_key(mut self, key: impl Into<String>) -> Self {
        self.storage_key = key.into();
        self
    }

    /// Sets the requested retention bound.
    #[must_use]
    pub fn with_max_events(mut self, max_events: i64) -> Self {
        self.max_events = Some(max_events);
        self
    }

    /// Effective retention bound: 50 when unset, never below 1.
    pub fn max_events(&self) -> usize {
        match self.max_events {
            None => DEFAULT_MAX_EVENTS,
            Some(n) if n < 1 => 1,
            Some(n) => usize::try_from(n).unwrap_or(usize::MAX),
        }
    }

    /// Effective storage key: the default when the configured one is blank.
    pub fn storage_key(&self) -> &str {
        if self.storage_key.trim().is_empty() {
            DEFAULT_STORAGE_KEY
        } else {
            &self.storage_key
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let config = EngineConfig::default();
        assert_eq!(config.storage, StorageMode::Memory);
        assert_eq!(config.storage_key(), DEFAULT_STORAGE_KEY);
        assert_eq!(config.max_events(), 50);
    }

    #[test]
    fn non_positive_max_events_is_coerced_to_one() {
        assert_eq!(EngineConfig::default().with_max_events(0).max_events(), 1);
        assert_eq!(EngineConfig::default().with_max_events(-7).max_events(), 1);
        assert_eq!(EngineConfig::default().with_max_events(3).max_events(), 3);
    }

    #[test]
    fn blank_storage_key_uses_default() {
        let config = EngineConfig::default().with_storage_key("  ");
        assert_eq!(config.storage_key(), DEFAULT_STORAGE_KEY);
    }

    #[test]
    fn deserializes_camel_case_aliases() {
        let config: EngineConfig =
            serde_json::from_str(r#"{"storage":"local","storageKey":"k","maxEvents":5}"#).unwrap();
        assert_eq!(config.storage, StorageMode::Local);
        assert_eq!(config.storage_key(), "k");
        assert_eq!(config.max_events(), 5);
    }

    #[test]
    fn deserializes_empty_object_to_defaults() {
        let config: EngineConfig = serde_json::from_str("{}").unwrap();
        assert_eq!(config, EngineConfig::default());
    }
}
