//! Process-wide, read-only access to published trails.
//!
//! Components that cannot hold an engine reference (a third-party widget,
//! an HTTP handler in another crate) look a trail up by namespace and get a
//! [`ReadOnlyBridge`], which can read the trail and nothing else.

use std::collections::HashMap;
use std::sync::{Arc, OnceLock, PoisonError, RwLock, Weak};

use trail_types::Event;

use crate::engine::EventEngine;

/// Namespace used when the host does not choose one.
pub const DEFAULT_NAMESPACE: &str = "activityTrail";

type Registry = RwLock<HashMap<String, Weak<EventEngine>>>;

fn registry() -> &'static Registry {
    static REGISTRY: OnceLock<Registry> = OnceLock::new();
    REGISTRY.get_or_init(|| RwLock::new(HashMap::new()))
}

/// Read-only view of a published engine.
///
/// Holds the engine weakly: once the engine is dropped the bridge reports an
/// empty trail.
#[derive(Clone, Debug)]
pub struct ReadOnlyBridge {
    engine: Weak<EventEngine>,
}

impl ReadOnlyBridge {
    /// Creates a bridge over `engine` without publishing it.
    pub fn new(engine: &Arc<EventEngine>) -> Self {
        Self {
            engine: Arc::downgrade(engine),
        }
    }

    /// Copy of the trail, oldest first.
    pub fn get_events(&self) -> Vec<Event> {
        self.engine
            .upgrade()
            .map(|engine| engine.get_events())
            .unwrap_or_default()
    }
}

/// Keeps a namespace entry alive; dropping it withdraws the entry.
#[derive(Debug)]
#[must_use = "dropping the registration withdraws the published trail"]
pub struct BridgeRegistration {
    namespace: String,
    engine: Weak<EventEngine>,
}

impl BridgeRegistration {
    /// The namespace the trail is published under.
    pub fn namespace(&self) -> &str {
        &self.namespace
    }
}

impl Drop for BridgeRegistration {
    fn drop(&mut self) {
        let mut entries = registry().write().unwrap_or_else(PoisonError::into_inner);
        // Only withdraw our own entry; a later publish may have replaced it.
        if entries
            .get(&self.namespace)
            .is_some_and(|current| Weak::ptr_eq(current, &self.engine))
        {
            entries.remove(&self.namespace);
            tracing::debug!(namespace = %self.namespace, "withdrew published trail");
        }
    }
}

/// Publishes `engine` under `namespace`, replacing any previous entry.
pub fn publish(namespace: &str, engine: &Arc<EventEngine>) -> BridgeRegistration {
    let weak = Arc::downgrade(engine);
    registry()
        .write()
        .unwrap_or_else(PoisonError::into_inner)
        .insert(namespace.to_string(), weak.clone());
    tracing::debug!(namespace, "published trail");

    BridgeRegistration {
        namespace: namespace.to_string(),
        engine: weak,
    }
}

/// Looks up the trail published under `namespace`.
///
/// Returns `None` if nothing is published there or the engine is gone.
pub fn lookup(namespace: &str) -> Option<ReadOnlyBridge> {
    let entries = registry().read().unwrap_or_else(PoisonError::into_inner);
    let engine = entries.get(namespace)?;
    if engine.strong_count() == 0 {
        return None;
    }
    Some(ReadOnlyBridge {
        engine: engine.clone(),
    })
}
