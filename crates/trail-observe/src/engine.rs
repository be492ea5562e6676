//! The event engine: bounded trail, write-through persistence, fan-out.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError};

use chrono::{SecondsFormat, Utc};
use trail_identity::{generate_id, IdentityProvider};
use trail_types::{Event, Metadata, StorageMode};

use crate::backend::{self, StorageBackend};
use crate::config::EngineConfig;
use crate::environment::EnvironmentProbe;
use crate::error::ObserveError;
use crate::host::Host;
use crate::listeners::{Listener, ListenerSet, SequencedListener, Subscription};

/// Owns one trail of recent events.
///
/// Every mutation (`record`, `clear`) completes its in-memory change and its
/// storage write under one lock, then notifies listeners after the lock is
/// released, so a listener may safely call back into the engine.
///
/// Each mutation also takes the next sequence number while it holds the
/// lock. Listeners on different threads may be notified out of mutation
/// order; sequenced listeners can tell.
pub struct EventEngine {
    events: Mutex<Vec<Event>>,
    /// Sequence number of the last mutation. Only advanced under `events`.
    seq: AtomicU64,
    backend: Box<dyn StorageBackend>,
    listeners: Arc<ListenerSet>,
    identity: Arc<IdentityProvider>,
    environment: Arc<dyn EnvironmentProbe>,
    max_events: usize,
}

impl EventEngine {
    /// Builds an engine with the backend selected by `config.storage` and
    /// hydrates it from that backend.
    pub fn new(config: &EngineConfig, host: &Host) -> Self {
        let backend = backend::for_mode(config.storage, config.storage_key(), host);
        Self::with_backend(config, backend, host)
    }

    /// Builds an engine over a caller-supplied backend. `config.storage` is
    /// ignored.
    pub fn with_backend(
        config: &EngineConfig,
        backend: Box<dyn StorageBackend>,
        host: &Host,
    ) -> Self {
        let max_events = config.max_events();

        let mut events = match backend.load() {
            Ok(events) => events,
            Err(e) => {
                tracing::warn!(
                    mode = %backend.mode(),
                    error = %e,
                    "failed to load persisted trail, starting empty"
                );
                Vec::new()
            }
        };
        retain_most_recent(&mut events, max_events);

        tracing::debug!(
            mode = %backend.mode(),
            count = events.len(),
            max_events,
            "event engine hydrated"
        );

        Self {
            events: Mutex::new(events),
            seq: AtomicU64::new(0),
            backend,
            listeners: Arc::new(ListenerSet::default()),
            identity: host.identity(),
            environment: host.environment(),
            max_events,
        }
    }

    /// Records a new event and returns it.
    ///
    /// The event is stamped with the current page context, identifiers, a
    /// fresh id and the current time, appended to the trail, and the oldest
    /// entries beyond the retention bound are dropped. The trail is then
    /// saved and every listener receives a copy.
    ///
    /// # Errors
    ///
    /// Returns [`ObserveError::EmptyEventName`] if `name` is blank; the
    /// trail is left untouched. Storage failures are never returned.
    pub fn record(
        &self,
        name: &str,
        note: Option<String>,
        metadata: Option<Metadata>,
    ) -> Result<Event, ObserveError> {
        if name.trim().is_empty() {
            return Err(ObserveError::EmptyEventName);
        }

        let context = self.environment.snapshot();
        let now = Utc::now();
        let event = Event {
            id: generate_id(),
            name: name.to_string(),
            note,
            metadata,
            path: context.path.unwrap_or_default(),
            title: context.title,
            referrer: context.referrer,
            ts: now.to_rfc3339_opts(SecondsFormat::Millis, true),
            ts_ms: now.timestamp_millis(),
            session_id: self.identity.session_id(),
            page_id: self.identity.page_id(),
            viewport: context.viewport,
        };

        let (seq, snapshot) = {
            let mut events = self.lock_events();
            events.push(event.clone());
            retain_most_recent(&mut events, self.max_events);
            self.persist(&events);
            (self.advance_seq(), events.clone())
        };

        tracing::debug!(name = %event.name, count = snapshot.len(), seq, "recorded event");
        self.notify(seq, snapshot);
        Ok(event)
    }

    /// Returns a copy of the trail, oldest first.
    pub fn get_events(&self) -> Vec<Event> {
        self.lock_events().clone()
    }

    /// Empties the trail, saves the empty list, and notifies listeners.
    ///
    /// Listeners are notified even when the trail was already empty.
    pub fn clear(&self) {
        let seq = {
            let mut events = self.lock_events();
            events.clear();
            self.persist(&events);
            self.advance_seq()
        };

        tracing::debug!(seq, "cleared trail");
        self.notify(seq, Vec::new());
    }

    /// Copy of the trail together with the sequence number of the mutation
    /// that produced it. Pairs with [`EventEngine::subscribe_sequenced`] to
    /// seed a sink without missing or reordering updates.
    pub fn sequenced_events(&self) -> (u64, Vec<Event>) {
        let events = self.lock_events();
        (self.seq.load(Ordering::Relaxed), events.clone())
    }

    /// Registers `listener` for every future mutation.
    ///
    /// Registering the same `Arc` again returns a handle to the existing
    /// registration; the listener is still called once per mutation.
    pub fn subscribe(&self, listener: Listener) -> Subscription {
        let id = self.listeners.insert(listener);
        Subscription::new(id, &self.listeners)
    }

    /// Registers a closure. Each call creates a distinct registration.
    pub fn subscribe_fn<F>(&self, listener: F) -> Subscription
    where
        F: Fn(Vec<Event>) + Send + Sync + 'static,
    {
        self.subscribe(Arc::new(listener))
    }

    /// Registers a closure that also receives each mutation's sequence
    /// number. Each call creates a distinct registration.
    pub fn subscribe_sequenced<F>(&self, listener: F) -> Subscription
    where
        F: Fn(u64, Vec<Event>) + Send + Sync + 'static,
    {
        let listener: SequencedListener = Arc::new(listener);
        let id = self.listeners.insert(listener);
        Subscription::new(id, &self.listeners)
    }

    /// Number of currently registered listeners.
    pub fn listener_count(&self) -> usize {
        self.listeners.len()
    }

    /// Effective retention bound.
    pub fn max_events(&self) -> usize {
        self.max_events
    }

    /// Storage mode of the backend in use.
    pub fn storage_mode(&self) -> StorageMode {
        self.backend.mode()
    }

    fn lock_events(&self) -> std::sync::MutexGuard<'_, Vec<Event>> {
        self.events.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn persist(&self, events: &[Event]) {
        if let Err(e) = self.backend.save(events) {
            tracing::warn!(
                mode = %self.backend.mode(),
                count = events.len(),
                error = %e,
                "failed to persist trail; keeping in-memory copy"
            );
        }
    }

    /// Caller must hold the `events` lock.
    fn advance_seq(&self) -> u64 {
        self.seq.fetch_add(1, Ordering::Relaxed) + 1
    }

    fn notify(&self, seq: u64, snapshot: Vec<Event>) {
        for listener in self.listeners.snapshot() {
            listener.call(seq, snapshot.clone());
        }
    }
}

impl std::fmt::Debug for EventEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EventEngine")
            .field("mode", &self.backend.mode())
            .field("max_events", &self.max_events)
            .field("listeners", &self.listeners.len())
            .finish_non_exhaustive()
    }
}

/// Drops entries from the front until at most `max` remain.
fn retain_most_recent(events: &mut Vec<Event>, max: usize) {
    if events.len() > max {
        let excess = events.len() - max;
        events.drain(..excess);
    }
}
