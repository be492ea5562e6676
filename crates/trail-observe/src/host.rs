//! The embedding host: storage areas, identity and page context.

use std::sync::Arc;

use trail_db::{KeyValueArea, SessionArea};
use trail_identity::IdentityProvider;

use crate::environment::{EnvironmentProbe, PageEnvironment};

/// Everything an engine needs from its surroundings.
///
/// Cloning a host shares all of its parts, so engines built from clones
/// see the same session, the same page, and the same storage.
#[derive(Clone)]
pub struct Host {
    session_area: Arc<dyn KeyValueArea>,
    local_area: Option<Arc<dyn KeyValueArea>>,
    identity: Arc<IdentityProvider>,
    environment: Arc<dyn EnvironmentProbe>,
}

impl Host {
    /// Creates a host for one session, with no long-term storage and an
    /// empty [`PageEnvironment`].
    pub fn new(session_area: Arc<dyn KeyValueArea>) -> Self {
        Self {
            identity: Arc::new(IdentityProvider::new(session_area.clone())),
            session_area,
            local_area: None,
            environment: Arc::new(PageEnvironment::new()),
        }
    }

    /// Attaches the long-term storage area used by `local` engines.
    #[must_use]
    pub fn with_local_area(mut self, area: Arc<dyn KeyValueArea>) -> Self {
        self.local_area = Some(area);
        self
    }

    /// Replaces the page context source.
    #[must_use]
    pub fn with_environment(mut self, environment: Arc<dyn EnvironmentProbe>) -> Self {
        self.environment = environment;
        self
    }

    /// Replaces the identity provider.
    #[must_use]
    pub fn with_identity(mut self, identity: Arc<IdentityProvider>) -> Self {
        self.identity = identity;
        self
    }

    /// Simulates a hard navigation: the same session and storage, a fresh
    /// page identifier.
    #[must_use]
    pub fn reload(&self) -> Self {
        Self {
            identity: Arc::new(IdentityProvider::new(self.session_area.clone())),
            ..self.clone()
        }
    }

    /// The session-scoped area.
    pub fn session_area(&self) -> Arc<dyn KeyValueArea> {
        self.session_area.clone()
    }

    /// The long-term area, if the host has one.
    pub fn local_area(&self) -> Option<Arc<dyn KeyValueArea>> {
        self.local_area.clone()
    }

    /// The identity provider.
    pub fn identity(&self) -> Arc<IdentityProvider> {
        self.identity.clone()
    }

    /// The page context source.
    pub fn environment(&self) -> Arc<dyn EnvironmentProbe> {
        self.environment.clone()
    }
}

impl Default for Host {
    fn default() -> Self {
        Self::new(Arc::new(SessionArea::new()))
    }
}

impl std::fmt::Debug for Host {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Host")
            .field("identity", &self.identity)
            .field("has_local_area", &self.local_area.is_some())
            .finish_non_exhaustive()
    }
}
