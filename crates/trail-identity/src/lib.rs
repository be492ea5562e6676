//! Session and page identifiers for recorded events.
//!
//! A session identifier is stable for one browsing session: it is created on
//! first use and kept in the session-scoped storage area so every recorder of
//! that session reads the same value. A page identifier is created once per
//! provider instance, which stands for one page load, and is never persisted.
//!
//! Storage failures never reach the caller. When the session area is missing
//! or refuses the read or write, the provider falls back to an identifier it
//! owns itself, created lazily on the first failed access and reused for the
//! provider's lifetime.

use std::sync::{Arc, OnceLock};

use trail_db::{AreaError, KeyValueArea};

/// Key under which the session identifier is stored in the session area.
pub const SESSION_ID_KEY: &str = "activity_trail:session_id";

/// Produces the session and page identifiers stamped on every event.
pub struct IdentityProvider {
    session_area: Option<Arc<dyn KeyValueArea>>,
    fallback_session_id: OnceLock<String>,
    page_id: OnceLock<String>,
}

impl IdentityProvider {
    /// Creates a provider that keeps the session identifier in `session_area`.
    pub fn new(session_area: Arc<dyn KeyValueArea>) -> Self {
        Self {
            session_area: Some(session_area),
            fallback_session_id: OnceLock::new(),
            page_id: OnceLock::new(),
        }
    }

    /// Creates a provider with no session storage at all.
    ///
    /// The session identifier is then stable for the provider's lifetime
    /// only.
    pub fn detached() -> Self {
        Self {
            session_area: None,
            fallback_session_id: OnceLock::new(),
            page_id: OnceLock::new(),
        }
    }

    /// Returns the identifier of the current session.
    pub fn session_id(&self) -> String {
        match self.stored_session_id() {
            Ok(id) => id,
            Err(e) => {
                tracing::debug!(error = %e, "session storage unusable, using fallback session id");
                self.fallback_session_id.get_or_init(generate_id).clone()
            }
        }
    }

    /// Returns the identifier of the current page load.
    pub fn page_id(&self) -> String {
        self.page_id.get_or_init(generate_id).clone()
    }

    fn stored_session_id(&self) -> Result<String, AreaError> {
        let area = self.session_area.as_ref().ok_or(AreaError::Unavailable)?;

        if let Some(existing) = area.get_item(SESSION_ID_KEY)? {
            if !existing.is_empty() {
                return Ok(existing);
            }
        }

        let id = generate_id();
        area.set_item(SESSION_ID_KEY, &id)?;
        tracing::debug!(session_id = %id, "started new session");
        Ok(id)
    }
}

impl std::fmt::Debug for IdentityProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("IdentityProvider")
            .field("has_session_area", &self.session_area.is_some())
            .field("page_id", &self.page_id.get())
            .finish_non_exhaustive()
    }
}

/// Generates a fresh random identifier.
pub fn generate_id() -> String {
    uuid::Uuid::new_v4().to_string()
}
