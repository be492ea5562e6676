//! Recent-activity recorder for the activity trail.
//!
//! Implements the event engine: a bounded, FIFO ring of recorded actions
//! that is written through to a pluggable storage backend after every
//! mutation and fanned out to subscribers. Downstream consumers (a support
//! widget, an assistance agent) read the trail to get a compact picture of
//! what the user just did, without a network round trip.
//!
//! # Storage modes
//!
//! | Mode | Backed by | Survives |
//! |------|-----------|----------|
//! | `memory` | the engine itself | nothing |
//! | `session` | the host's [`trail_db::SessionArea`] | page reloads within a session |
//! | `local` | the host's [`trail_db::LocalArea`] | process restarts |
//!
//! Storage failures are never surfaced: a failed load starts the engine
//! empty, a failed save is logged and the in-memory trail stays
//! authoritative.
//!
//! # Usage
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use trail_observe::{EngineConfig, EventEngine, Host};
//! use trail_types::StorageMode;
//!
//! let host = Host::default();
//! let engine = EventEngine::new(
//!     &EngineConfig::default().with_storage(StorageMode::Session),
//!     &host,
//! );
//!
//! let subscription = engine.subscribe_fn(|events| {
//!     tracing::info!(count = events.len(), "trail changed");
//! });
//! engine.record("checkout_started", None, None)?;
//! subscription.unsubscribe();
//! ```

mod backend;
pub mod binding;
pub mod bridge;
mod config;
mod engine;
mod environment;
mod error;
mod host;
mod listeners;

pub use backend::{AreaBackend, MemoryBackend, StorageBackend};
pub use binding::{use_activity, ActivityHandle, ActivityProvider};
pub use bridge::{BridgeRegistration, ReadOnlyBridge};
pub use config::EngineConfig;
pub use engine::EventEngine;
pub use environment::{EnvironmentProbe, EnvironmentSnapshot, PageEnvironment};
pub use error::{BindingError, ObserveError, StorageError};
pub use host::Host;
pub use listeners::{LatestTrail, Listener, SequencedListener, Subscription};
