//! HTTP surface for the activity trail.
//!
//! Hosts one [`EventEngine`] and exposes it to clients that cannot link the
//! engine directly: a write API for the embedding page, an SSE stream that
//! carries every subscriber notification, and the read-only bridge endpoint
//! consumed by support widgets.

pub mod api_bridge;
pub mod api_events;
pub mod api_page;
pub mod config;

use axum::{
    extract::DefaultBodyLimit,
    routing::{get, put},
    Extension, Json, Router,
};
use serde_json::{json, Value};
use std::sync::{Arc, Mutex, PoisonError};
use tokio::sync::broadcast;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use trail_db::{
    create_pool, AreaError, DbRuntimeSettings, KeyValueArea, LocalArea, PoolError, SessionArea,
};
use trail_observe::{
    bridge, BridgeRegistration, EventEngine, Host, PageEnvironment, Subscription,
};
use trail_types::{Event, StorageMode};

use crate::config::Config;

/// Capacity of the notification broadcast channel feeding SSE clients.
const EVENTS_BROADCAST_CAPACITY: usize = 64;

/// Maximum request body size (256 KiB). Event metadata is meant to be small.
const MAX_REQUEST_BODY_BYTES: usize = 256 * 1024;

/// Application state shared across all request handlers.
#[derive(Clone)]
pub struct AppState {
    /// The hosted engine.
    pub engine: Arc<EventEngine>,
    /// Page context the engine stamps on new events.
    pub page: Arc<PageEnvironment>,
    /// Engine notifications in mutation order, for SSE clients.
    pub events_tx: broadcast::Sender<Vec<Event>>,
    /// Namespace the engine is published under.
    pub bridge_namespace: String,
    /// Keeps the bridge entry published for as long as the state lives.
    _registration: Arc<BridgeRegistration>,
    /// Keeps a handle to the broadcast subscription.
    _subscription: Subscription,
}

impl AppState {
    /// Wires `engine` to the broadcast channel and publishes it on the
    /// bridge under `bridge_namespace`.
    pub fn new(
        engine: Arc<EventEngine>,
        page: Arc<PageEnvironment>,
        bridge_namespace: impl Into<String>,
    ) -> Self {
        let (events_tx, _) = broadcast::channel(EVENTS_BROADCAST_CAPACITY);

        let tx = events_tx.clone();
        let last_sent = Mutex::new(0u64);
        let subscription = engine.subscribe_sequenced(move |seq, events| {
            // Sending under the lock keeps frames in mutation order.
            let mut last = last_sent.lock().unwrap_or_else(PoisonError::into_inner);
            if seq < *last {
                tracing::trace!(seq, last = *last, "dropping stale trail notification");
                return;
            }
            *last = seq;
            // No receivers just means no SSE client is connected.
            if tx.send(events).is_err() {
                tracing::trace!("no stream subscribers for trail notification");
            }
        });

        let bridge_namespace = bridge_namespace.into();
        let registration = bridge::publish(&bridge_namespace, &engine);

        Self {
            engine,
            page,
            events_tx,
            bridge_namespace,
            _registration: Arc::new(registration),
            _subscription: subscription,
        }
    }
}

/// Builds the host and engine described by `config`.
///
/// Long-term storage is only opened for `local` recorders. If it cannot be
/// opened the engine still starts; its saves are then absorbed like any
/// other storage failure.
pub fn build_engine(config: &Config) -> (Arc<EventEngine>, Arc<PageEnvironment>) {
    let page = Arc::new(PageEnvironment::new());
    let session_area: Arc<dyn KeyValueArea> = Arc::new(SessionArea::new());
    let mut host = Host::new(session_area).with_environment(page.clone());

    if config.recorder.storage == StorageMode::Local {
        match open_local_area(config) {
            Ok(area) => host = host.with_local_area(area),
            Err(e) => tracing::warn!(
                path = %config.storage.db_path,
                error = %e,
                "long-term storage unavailable; trail will not survive restarts"
            ),
        }
    }

    let engine = Arc::new(EventEngine::new(&config.recorder, &host));
    tracing::info!(
        storage = %engine.storage_mode(),
        max_events = engine.max_events(),
        "event engine ready"
    );
    (engine, page)
}

/// Errors that can occur when opening long-term storage.
#[derive(Debug, thiserror::Error)]
pub enum LocalStorageError {
    /// The database pool could not be created.
    #[error(transparent)]
    Pool(#[from] PoolError),

    /// The area could not be opened on the pool.
    #[error(transparent)]
    Area(#[from] AreaError),
}

fn open_local_area(config: &Config) -> Result<Arc<dyn KeyValueArea>, LocalStorageError> {
    let settings = DbRuntimeSettings {
        busy_timeout_ms: config.storage.busy_timeout_ms,
        pool_max_size: config.storage.pool_max_size,
    };
    let pool = create_pool(&config.storage.db_path, settings)?;
    let mut area = LocalArea::open(pool, config.storage.origin.clone())?;
    if let Some(quota) = config.storage.quota_bytes {
        area = area.with_quota(quota);
    }
    Ok(Arc::new(area))
}

/// Health check handler.
async fn health() -> Json<Value> {
    Json(json!({
        "status": "ok",
        "version": env!("CARGO_PKG_VERSION")
    }))
}

/// Builds the application router with all routes.
pub fn app(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health))
        .route(
            "/api/events",
            get(api_events::list_events_handler)
                .post(api_events::track_event_handler)
                .delete(api_events::clear_events_handler),
        )
        .route(
            "/api/events/stream",
            get(api_events::event_stream_handler),
        )
        .route("/api/page", put(api_page::update_page_handler))
        .route("/bridge/events", get(api_bridge::bridge_events_handler))
        .layer(DefaultBodyLimit::max(MAX_REQUEST_BODY_BYTES))
        .layer(TraceLayer::new_for_http())
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .layer(Extension(Arc::new(state)))
}
