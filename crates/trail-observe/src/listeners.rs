//! Subscriber registry with set semantics.

use std::sync::{Arc, Mutex, PoisonError, RwLock, Weak};

use trail_types::Event;

/// Callback invoked with a fresh copy of the trail after every mutation.
///
/// Identity is the `Arc` allocation: registering clones of the same `Arc`
/// twice keeps a single registration.
pub type Listener = Arc<dyn Fn(Vec<Event>) + Send + Sync>;

/// Like [`Listener`], but also receives the mutation's sequence number.
///
/// Sequence numbers grow with every mutation in the order the mutations
/// took effect. Notifications from different threads can arrive out of
/// that order; a sink that keeps only the latest trail uses the number to
/// discard stale ones (see [`LatestTrail`]).
pub type SequencedListener = Arc<dyn Fn(u64, Vec<Event>) + Send + Sync>;

#[derive(Clone)]
pub(crate) enum Callback {
    Plain(Listener),
    Sequenced(SequencedListener),
}

impl Callback {
    pub(crate) fn call(&self, seq: u64, events: Vec<Event>) {
        match self {
            Callback::Plain(listener) => listener(events),
            Callback::Sequenced(listener) => listener(seq, events),
        }
    }

    // Data pointer only; vtable pointers may differ across codegen units.
    fn data_ptr(&self) -> *const () {
        match self {
            Callback::Plain(listener) => Arc::as_ptr(listener) as *const (),
            Callback::Sequenced(listener) => Arc::as_ptr(listener) as *const (),
        }
    }
}

impl From<Listener> for Callback {
    fn from(listener: Listener) -> Self {
        Callback::Plain(listener)
    }
}

impl From<SequencedListener> for Callback {
    fn from(listener: SequencedListener) -> Self {
        Callback::Sequenced(listener)
    }
}

#[derive(Default)]
pub(crate) struct ListenerSet {
    inner: Mutex<Entries>,
}

#[derive(Default)]
struct Entries {
    next_id: u64,
    listeners: Vec<(u64, Callback)>,
}

impl ListenerSet {
    /// Registers `listener`, or returns the id of its existing registration.
    pub(crate) fn insert(&self, listener: impl Into<Callback>) -> u64 {
        let listener = listener.into();
        let mut entries = self.inner.lock().unwrap_or_else(PoisonError::into_inner);

        if let Some((id, _)) = entries
            .listeners
            .iter()
            .find(|(_, existing)| existing.data_ptr() == listener.data_ptr())
        {
            return *id;
        }

        let id = entries.next_id;
        entries.next_id += 1;
        entries.listeners.push((id, listener));
        id
    }

    pub(crate) fn remove(&self, id: u64) -> bool {
        let mut entries = self.inner.lock().unwrap_or_else(PoisonError::into_inner);
        let before = entries.listeners.len();
        entries.listeners.retain(|(existing, _)| *existing != id);
        entries.listeners.len() != before
    }

    /// Listeners in registration order.
    pub(crate) fn snapshot(&self) -> Vec<Callback> {
        let entries = self.inner.lock().unwrap_or_else(PoisonError::into_inner);
        entries
            .listeners
            .iter()
            .map(|(_, listener)| listener.clone())
            .collect()
    }

    pub(crate) fn len(&self) -> usize {
        self.inner
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .listeners
            .len()
    }
}

/// Handle returned by [`crate::EventEngine::subscribe`].
///
/// Dropping it does not unsubscribe; call [`Subscription::unsubscribe`].
#[derive(Clone)]
pub struct Subscription {
    id: u64,
    set: Weak<ListenerSet>,
}

impl Subscription {
    pub(crate) fn new(id: u64, set: &Arc<ListenerSet>) -> Self {
        Self {
            id,
            set: Arc::downgrade(set),
        }
    }

    /// Removes the listener. Further calls, or calls after the engine is
    /// gone, do nothing.
    pub fn unsubscribe(&self) {
        if let Some(set) = self.set.upgrade() {
            if set.remove(self.id) {
                tracing::debug!(listener = self.id, "listener unsubscribed");
            }
        }
    }
}

impl std::fmt::Debug for Subscription {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Subscription").field("id", &self.id).finish()
    }
}

/// The newest trail seen by a sequenced listener.
///
/// [`LatestTrail::apply`] ignores any snapshot older than the one it holds,
/// so the stored trail never moves backwards however notifications from
/// concurrent mutations interleave.
#[derive(Debug, Default)]
pub struct LatestTrail {
    inner: RwLock<(u64, Vec<Event>)>,
}

impl LatestTrail {
    /// Creates an empty trail at sequence 0.
    pub fn new() -> Self {
        Self::default()
    }

    /// Stores `events` unless a newer snapshot is already held. Returns
    /// whether it was stored.
    pub fn apply(&self, seq: u64, events: Vec<Event>) -> bool {
        let mut latest = self.inner.write().unwrap_or_else(PoisonError::into_inner);
        if seq < latest.0 {
            return false;
        }
        *latest = (seq, events);
        true
    }

    /// Copy of the held trail.
    pub fn events(&self) -> Vec<Event> {
        self.inner
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .1
            .clone()
    }

    /// Sequence number of the held trail.
    pub fn seq(&self) -> u64 {
        self.inner.read().unwrap_or_else(PoisonError::into_inner).0
    }
}
