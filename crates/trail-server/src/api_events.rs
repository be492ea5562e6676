//! Trail API handlers.
//!
//! Provides:
//! - `POST /api/events`: record an event
//! - `GET /api/events`: read the trail, optionally only its newest entries
//! - `DELETE /api/events`: clear the trail
//! - `GET /api/events/stream`: SSE stream of subscriber notifications

use crate::AppState;
use axum::{
    extract::{Extension, Query},
    http::StatusCode,
    response::{
        sse::{Event as SseEvent, KeepAlive},
        IntoResponse, Response, Sse,
    },
    Json,
};
use futures_util::Stream;
use serde::{Deserialize, Serialize};
use std::{convert::Infallible, sync::Arc};
use tokio_stream::wrappers::{errors::BroadcastStreamRecvError, BroadcastStream};
use tokio_stream::StreamExt;
use trail_observe::ObserveError;
use trail_types::{Event, Metadata};

/// Request body for `POST /api/events`.
#[derive(Debug, Deserialize)]
pub struct TrackRequest {
    /// Event name. Must not be blank.
    pub name: String,
    /// Free-form note.
    #[serde(default)]
    pub note: Option<String>,
    /// Structured metadata.
    #[serde(default)]
    pub metadata: Option<Metadata>,
}

/// Query parameters for `GET /api/events`.
#[derive(Debug, Deserialize)]
pub struct EventsQuery {
    /// Only return the newest `limit` events, still oldest first.
    pub limit: Option<usize>,
}

/// Response wrapper for trail reads.
#[derive(Debug, Serialize)]
pub struct EventsResponse {
    /// The events, oldest first.
    pub events: Vec<Event>,
    /// The number of events returned.
    pub count: usize,
}

fn error_response(status: StatusCode, message: impl Into<String>) -> Response {
    (
        status,
        Json(serde_json::json!({ "error": message.into() })),
    )
        .into_response()
}

/// Handler for `POST /api/events`.
///
/// Responds `201 Created` with the stored event, or `400` for a blank name.
pub async fn track_event_handler(
    Extension(state): Extension<Arc<AppState>>,
    Json(body): Json<TrackRequest>,
) -> Result<(StatusCode, Json<Event>), Response> {
    let engine = state.engine.clone();

    // Recording persists synchronously, which may hit SQLite.
    let event = tokio::task::spawn_blocking(move || {
        engine.record(&body.name, body.note, body.metadata)
    })
    .await
    .map_err(|e| {
        error_response(
            StatusCode::INTERNAL_SERVER_ERROR,
            format!("task join error: {}", e),
        )
    })?
    .map_err(|e| match e {
        ObserveError::EmptyEventName => error_response(StatusCode::BAD_REQUEST, e.to_string()),
    })?;

    tracing::debug!(name = %event.name, id = %event.id, "recorded event");
    Ok((StatusCode::CREATED, Json(event)))
}

/// Handler for `GET /api/events`.
pub async fn list_events_handler(
    Extension(state): Extension<Arc<AppState>>,
    Query(params): Query<EventsQuery>,
) -> Json<EventsResponse> {
    let mut events = state.engine.get_events();
    if let Some(limit) = params.limit {
        let excess = events.len().saturating_sub(limit);
        events.drain(..excess);
    }

    let count = events.len();
    Json(EventsResponse { events, count })
}

/// Handler for `DELETE /api/events`.
pub async fn clear_events_handler(
    Extension(state): Extension<Arc<AppState>>,
) -> Result<StatusCode, Response> {
    let engine = state.engine.clone();
    tokio::task::spawn_blocking(move || engine.clear())
        .await
        .map_err(|e| {
            error_response(
                StatusCode::INTERNAL_SERVER_ERROR,
                format!("task join error: {}", e),
            )
        })?;

    tracing::debug!("cleared trail");
    Ok(StatusCode::NO_CONTENT)
}

/// Handler for `GET /api/events/stream`.
///
/// Each notification is sent as a `trail` event whose data is the full
/// trail, oldest first. Clients that fall behind skip the notifications
/// they missed; the next one carries the whole trail anyway.
pub async fn event_stream_handler(
    Extension(state): Extension<Arc<AppState>>,
) -> Sse<impl Stream<Item = Result<SseEvent, Infallible>>> {
    let rx = state.events_tx.subscribe();
    let stream = BroadcastStream::new(rx);

    let mapped_stream = stream.filter_map(|result| match result {
        Ok(events) => match serde_json::to_string(&events) {
            Ok(data) => Some(Ok(SseEvent::default().event("trail").data(data))),
            Err(e) => {
                tracing::error!("failed to serialize trail notification: {}", e);
                None
            }
        },
        Err(BroadcastStreamRecvError::Lagged(skipped)) => {
            tracing::debug!(skipped, "stream client lagged behind trail notifications");
            None
        }
    });

    Sse::new(mapped_stream).keep_alive(KeepAlive::default())
}
