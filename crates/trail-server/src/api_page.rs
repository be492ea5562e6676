//! `PUT /api/page`: lets the embedding page report its navigation state.
//!
//! Fields left out of the body keep their previous value. New events pick
//! up whatever was reported last.

use crate::AppState;
use axum::{extract::Extension, http::StatusCode, Json};
use serde::Deserialize;
use std::sync::Arc;
use trail_types::Viewport;

/// Request body for `PUT /api/page`.
#[derive(Debug, Default, Deserialize)]
pub struct PageUpdate {
    /// Path and query string.
    pub path: Option<String>,
    /// Document title. An empty string clears it.
    pub title: Option<String>,
    /// Referring URL. An empty string clears it.
    pub referrer: Option<String>,
    /// Viewport dimensions.
    pub viewport: Option<Viewport>,
}

/// Handler for `PUT /api/page`.
pub async fn update_page_handler(
    Extension(state): Extension<Arc<AppState>>,
    Json(update): Json<PageUpdate>,
) -> StatusCode {
    let page = &state.page;
    if let Some(path) = update.path {
        page.navigate(path);
    }
    if let Some(title) = update.title {
        page.set_title(title);
    }
    if let Some(referrer) = update.referrer {
        page.set_referrer(referrer);
    }
    if let Some(Viewport { width, height }) = update.viewport {
        page.resize(width, height);
    }
    StatusCode::NO_CONTENT
}
