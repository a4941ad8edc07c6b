//! Per-session webhook configuration.

use serde::Serialize;
use sqlx::FromRow;
use tgw_core::types::{DbId, Timestamp};

/// A row from `webhook_configs`. One per telegram session.
#[derive(Debug, Clone, FromRow)]
pub struct WebhookConfig {
    pub id: DbId,
    pub session_id: DbId,
    pub url: String,
    pub secret: Option<String>,
    /// Event-type allow-list. Empty or containing `*` means every event.
    pub events: Vec<String>,
    pub is_active: bool,
    pub max_retries: i32,
    pub timeout_ms: i32,
    pub last_error: Option<String>,
    pub last_error_at: Option<Timestamp>,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

/// API view of a webhook config; the secret is reduced to a flag.
#[derive(Debug, Clone, Serialize)]
pub struct WebhookResponse {
    pub id: DbId,
    pub session_id: DbId,
    pub url: String,
    pub has_secret: bool,
    pub events: Vec<String>,
    pub is_active: bool,
    pub max_retries: i32,
    pub timeout_ms: i32,
    pub last_error: Option<String>,
    pub last_error_at: Option<Timestamp>,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

impl From<WebhookConfig> for WebhookResponse {
    fn from(w: WebhookConfig) -> Self {
        Self {
            id: w.id,
            session_id: w.session_id,
            url: w.url,
            has_secret: w.secret.as_deref().is_some_and(|s| !s.is_empty()),
            events: w.events,
            is_active: w.is_active,
            max_retries: w.max_retries,
            timeout_ms: w.timeout_ms,
            last_error: w.last_error,
            last_error_at: w.last_error_at,
            created_at: w.created_at,
            updated_at: w.updated_at,
        }
    }
}

/// Insert-or-replace payload keyed on `session_id`.
#[derive(Debug, Clone)]
pub struct UpsertWebhook {
    pub session_id: DbId,
    pub url: String,
    pub secret: Option<String>,
    pub events: Vec<String>,
    pub max_retries: i32,
    pub timeout_ms: i32,
}
