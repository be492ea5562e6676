//! The recorded event envelope.

use serde::{Deserialize, Serialize};

/// Opaque caller-supplied payload attached to an event.
///
/// The recorder never inspects or validates it.
pub type Metadata = serde_json::Map<String, serde_json::Value>;

/// Viewport dimensions captured when an event is recorded.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Viewport {
    /// Inner width in CSS pixels.
    pub width: u32,
    /// Inner height in CSS pixels.
    pub height: u32,
}

/// A single recorded action.
///
/// Serialized field names match the persisted representation (`tsMs`,
/// `sessionId`, `pageId`). Optional fields are omitted when absent and
/// tolerated as missing when loaded.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Event {
    /// Unique identifier generated per record.
    pub id: String,
    /// Caller-supplied event name, e.g. `checkout_started`.
    pub name: String,
    /// Free-text hint with no meaning to the recorder.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub note: Option<String>,
    /// Opaque structured payload.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata: Option<Metadata>,
    /// Path and query of the page at record time.
    #[serde(default)]
    pub path: String,
    /// Document title at record time.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    /// Referrer at record time.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub referrer: Option<String>,
    /// ISO 8601 UTC timestamp with millisecond precision.
    pub ts: String,
    /// Epoch milliseconds of the same instant as `ts`.
    pub ts_ms: i64,
    /// Identifier of the browsing session.
    pub session_id: String,
    /// Identifier of the page load.
    pub page_id: String,
    /// Viewport dimensions at record time.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub viewport: Option<Viewport>,
}
