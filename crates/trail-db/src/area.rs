//! The key-value area interface and the session-scoped area.

use std::collections::HashMap;
use std::sync::{PoisonError, RwLock};

use crate::error::AreaError;

/// A string-keyed, string-valued storage area.
///
/// Implementations must be safe to share between recorders; each call is
/// independent and either completes or returns an error.
pub trait KeyValueArea: Send + Sync {
    /// Returns the value stored under `key`, or `None` if absent.
    fn get_item(&self, key: &str) -> Result<Option<String>, AreaError>;

    /// Stores `value` under `key`, replacing any previous value.
    fn set_item(&self, key: &str, value: &str) -> Result<(), AreaError>;

    /// Removes `key` if present.
    fn remove_item(&self, key: &str) -> Result<(), AreaError>;
}

/// Session-scoped area held in process memory.
///
/// One instance represents one browsing session: share it (behind an `Arc`)
/// between every recorder of that session and drop it when the session ends.
#[derive(Debug)]
pub struct SessionArea {
    entries: RwLock<HashMap<String, String>>,
    quota_bytes: Option<usize>,
    available: bool,
}

impl SessionArea {
    /// Creates an empty, unbounded session area.
    pub fn new() -> Self {
        Self {
            entries: RwLock::new(HashMap::new()),
            quota_bytes: None,
            available: true,
        }
    }

    /// Creates an empty area that rejects writes growing it past
    /// `quota_bytes` (keys plus values, in UTF-8 bytes).
    pub fn with_quota(quota_bytes: usize) -> Self {
        Self {
            quota_bytes: Some(quota_bytes),
            ..Self::new()
        }
    }

    /// Creates an area that fails every operation with
    /// [`AreaError::Unavailable`], as when the host disables storage.
    pub fn unavailable() -> Self {
        Self {
            available: false,
            ..Self::new()
        }
    }

    /// Number of bytes currently held.
    pub fn used_bytes(&self) -> usize {
        let entries = self.entries.read().unwrap_or_else(PoisonError::into_inner);
        entries.iter().map(|(k, v)| k.len() + v.len()).sum()
    }

    fn ensure_available(&self) -> Result<(), AreaError> {
        if self.available {
            Ok(())
        } else {
            Err(AreaError::Unavailable)
        }
    }
}

impl Default for SessionArea {
    fn default() -> Self {
        Self::new()
    }
}

impl KeyValueArea for SessionArea {
    fn get_item(&self, key: &str) -> Result<Option<String>, AreaError> {
        self.ensure_available()?;
        let entries = self.entries.read().unwrap_or_else(PoisonError::into_inner);
        Ok(entries.get(key).cloned())
    }

    fn set_item(&self, key: &str, value: &str) -> Result<(), AreaError> {
        self.ensure_available()?;
        let mut entries = self.entries.write().unwrap_or_else(PoisonError::into_inner);

        if let Some(quota) = self.quota_bytes {
            let others: usize = entries
                .iter()
                .filter(|(k, _)| k.as_str() != key)
                .map(|(k, v)| k.len() + v.len())
                .sum();
            let required = others + key.len() + value.len();
            if required > quota {
                return Err(AreaError::QuotaExceeded { required, quota });
            }
        }

        entries.insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove_item(&self, key: &str) -> Result<(), AreaError> {
        self.ensure_available()?;
        let mut entries = self.entries.write().unwrap_or_else(PoisonError::into_inner);
        entries.remove(key);
        Ok(())
    }
}
