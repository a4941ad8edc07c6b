//! Webhook config lookup used by delivery workers.

use async_trait::async_trait;
use tgw_core::types::DbId;
use tgw_db::models::webhook::WebhookConfig;
use tgw_db::repositories::WebhookRepo;
use tgw_db::DbPool;

/// What the dispatcher needs from the `webhook_configs` table.
#[async_trait]
pub trait WebhookStore: Send + Sync {
    async fn get_by_session_id(&self, session_id: DbId)
        -> Result<Option<WebhookConfig>, sqlx::Error>;

    /// Persist `last_error` / `last_error_at` after a delivery gave up.
    async fn record_failure(&self, session_id: DbId, error: &str) -> Result<(), sqlx::Error>;
}

/// [`WebhookStore`] over Postgres.
#[derive(Clone)]
pub struct PgWebhookStore {
    pool: DbPool,
}

impl PgWebhookStore {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl WebhookStore for PgWebhookStore {
    async fn get_by_session_id(
        &self,
        session_id: DbId,
    ) -> Result<Option<WebhookConfig>, sqlx::Error> {
        WebhookRepo::find_by_session_id(&self.pool, session_id).await
    }

    async fn record_failure(&self, session_id: DbId, error: &str) -> Result<(), sqlx::Error> {
        WebhookRepo::record_failure(&self.pool, session_id, error).await
    }
}
