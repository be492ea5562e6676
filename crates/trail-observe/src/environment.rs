//! Ambient page context captured when an event is recorded.

use std::sync::{PoisonError, RwLock};

use trail_types::Viewport;

/// What the page looked like at one instant.
///
/// Each field is independently optional: a host that cannot report one of
/// them leaves it `None` without affecting the others.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EnvironmentSnapshot {
    /// Path and query string.
    pub path: Option<String>,
    /// Document title.
    pub title: Option<String>,
    /// Referring URL.
    pub referrer: Option<String>,
    /// Viewport dimensions.
    pub viewport: Option<Viewport>,
}

/// Source of [`EnvironmentSnapshot`]s.
pub trait EnvironmentProbe: Send + Sync {
    /// Reads the current page context. Must not fail.
    fn snapshot(&self) -> EnvironmentSnapshot;
}

/// Navigation state kept up to date by the embedding host.
///
/// The host calls the setters as the user navigates or resizes; the engine
/// reads a snapshot at record time. Empty titles and referrers are stored
/// as absent, matching how documents report "none".
#[derive(Debug, Default)]
pub struct PageEnvironment {
    state: RwLock<EnvironmentSnapshot>,
}

impl PageEnvironment {
    /// Creates an environment with nothing known yet.
    pub fn new() -> Self {
        Self::default()
    }

    /// Records a navigation to `path` (path plus query).
    pub fn navigate(&self, path: impl Into<String>) {
        self.write(|state| state.path = Some(path.into()));
    }

    /// Sets the document title.
    pub fn set_title(&self, title: impl Into<String>) {
        self.write(|state| state.title = non_empty(title.into()));
    }

    /// Sets the referrer.
    pub fn set_referrer(&self, referrer: impl Into<String>) {
        self.write(|state| state.referrer = non_empty(referrer.into()));
    }

    /// Sets the viewport dimensions.
    pub fn resize(&self, width: u32, height: u32) {
        self.write(|state| state.viewport = Some(Viewport { width, height }));
    }

    fn write(&self, apply: impl FnOnce(&mut EnvironmentSnapshot)) {
        let mut state = self.state.write().unwrap_or_else(PoisonError::into_inner);
        apply(&mut state);
    }
}

impl EnvironmentProbe for PageEnvironment {
    fn snapshot(&self) -> EnvironmentSnapshot {
        self.state
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

fn non_empty(value: String) -> Option<String> {
    if value.is_empty() {
        None
    } else {
        Some(value)
    }
}
