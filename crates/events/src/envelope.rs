//! The event envelope POSTed to webhook endpoints.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tgw_core::types::DbId;

/// `{"id","session_id","type","timestamp","data"}`.
///
/// `id` doubles as the delivery id (`X-Telegram-Delivery`) and stays the same
/// across retries of one event.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WebhookEvent {
    pub id: String,
    pub session_id: DbId,
    #[serde(rename = "type")]
    pub event_type: String,
    pub timestamp: DateTime<Utc>,
    pub data: serde_json::Value,
}

impl WebhookEvent {
    /// Build an envelope with a fresh delivery id stamped now.
    pub fn new(session_id: DbId, event_type: impl Into<String>, data: serde_json::Value) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            session_id,
            event_type: event_type.into(),
            timestamp: Utc::now(),
            data,
        }
    }
}
