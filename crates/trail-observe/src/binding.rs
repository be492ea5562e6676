//! Scope-provided access to an engine for view code.
//!
//! An [`ActivityProvider`] is mounted once per engine. It subscribes at
//! mount time and keeps the latest trail it was notified with, so view code
//! can read [`ActivityHandle::events`] without re-querying the engine.
//! Inside [`ActivityProvider::provide`] the provider is the current one for
//! this thread, and [`use_activity`] hands out its handle. Asking for the
//! handle anywhere else is a programming error and fails immediately.

use std::cell::RefCell;
use std::sync::Arc;

use trail_types::{Event, Metadata};

use crate::engine::EventEngine;
use crate::error::{BindingError, ObserveError};
use crate::listeners::{LatestTrail, Subscription};

thread_local! {
    static PROVIDED: RefCell<Vec<ActivityHandle>> = const { RefCell::new(Vec::new()) };
}

/// What view code sees: the engine operations plus the latest snapshot.
#[derive(Clone)]
pub struct ActivityHandle {
    engine: Arc<EventEngine>,
    latest: Arc<LatestTrail>,
}

impl ActivityHandle {
    /// Records an event. Same as [`EventEngine::record`].
    ///
    /// # Errors
    ///
    /// Returns [`ObserveError::EmptyEventName`] for a blank name.
    pub fn track(
        &self,
        name: &str,
        note: Option<String>,
        metadata: Option<Metadata>,
    ) -> Result<Event, ObserveError> {
        self.engine.record(name, note, metadata)
    }

    /// Reads the trail straight from the engine.
    pub fn get_events(&self) -> Vec<Event> {
        self.engine.get_events()
    }

    /// Clears the trail.
    pub fn clear(&self) {
        self.engine.clear();
    }

    /// The newest trail the provider has been notified of.
    pub fn events(&self) -> Vec<Event> {
        self.latest.events()
    }
}

impl std::fmt::Debug for ActivityHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ActivityHandle")
            .field("engine", &self.engine)
            .finish_non_exhaustive()
    }
}

/// Keeps an engine subscription alive and provides its handle to a scope.
///
/// Dropping the provider unsubscribes.
#[derive(Debug)]
pub struct ActivityProvider {
    handle: ActivityHandle,
    subscription: Subscription,
}

impl ActivityProvider {
    /// Subscribes to `engine` and seeds the snapshot with its current trail.
    ///
    /// Subscribing comes first, so a mutation racing the mount is either
    /// in the seed or delivered afterwards; stale deliveries are dropped.
    pub fn mount(engine: Arc<EventEngine>) -> Self {
        let latest = Arc::new(LatestTrail::new());
        let sink = Arc::clone(&latest);
        let subscription = engine.subscribe_sequenced(move |seq, events| {
            sink.apply(seq, events);
        });
        let (seq, events) = engine.sequenced_events();
        latest.apply(seq, events);

        Self {
            handle: ActivityHandle { engine, latest },
            subscription,
        }
    }

    /// A handle usable outside any scope.
    pub fn handle(&self) -> ActivityHandle {
        self.handle.clone()
    }

    /// Runs `scope` with this provider as the current one on this thread.
    ///
    /// Scopes nest; the innermost provider wins.
    pub fn provide<R>(&self, scope: impl FnOnce() -> R) -> R {
        PROVIDED.with(|stack| stack.borrow_mut().push(self.handle.clone()));
        let _guard = ScopeGuard;
        scope()
    }
}

impl Drop for ActivityProvider {
    fn drop(&mut self) {
        self.subscription.unsubscribe();
    }
}

/// Pops the provided handle even if the scope panics.
struct ScopeGuard;

impl Drop for ScopeGuard {
    fn drop(&mut self) {
        PROVIDED.with(|stack| {
            stack.borrow_mut().pop();
        });
    }
}

/// Returns the handle of the innermost enclosing provider scope.
///
/// # Errors
///
/// Returns [`BindingError::OutsideProvider`] when called outside every
/// [`ActivityProvider::provide`] scope on this thread.
pub fn use_activity() -> Result<ActivityHandle, BindingError> {
    PROVIDED
        .with(|stack| stack.borrow().last().cloned())
        .ok_or(BindingError::OutsideProvider)
}
