//! `GET /bridge/events`: the read-only bridge over HTTP.
//!
//! Goes through the process-wide bridge registry rather than the engine in
//! [`AppState`], so it serves exactly what any other bridge consumer sees.

use crate::api_events::EventsResponse;
use crate::AppState;
use axum::{
    extract::Extension,
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use std::sync::Arc;
use trail_observe::bridge;

/// Handler for `GET /bridge/events`.
///
/// Responds `503` when nothing is published under the configured namespace.
pub async fn bridge_events_handler(Extension(state): Extension<Arc<AppState>>) -> Response {
    let Some(reader) = bridge::lookup(&state.bridge_namespace) else {
        return (
            StatusCode::SERVICE_UNAVAILABLE,
            Json(serde_json::json!({
                "error": format!("no trail published under {}", state.bridge_namespace)
            })),
        )
            .into_response();
    };

    let events = reader.get_events();
    let count = events.len();
    Json(EventsResponse { events, count }).into_response()
}
