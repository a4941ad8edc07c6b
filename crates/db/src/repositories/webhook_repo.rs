//! Repository for the `webhook_configs` table.

use sqlx::PgPool;
use tgw_core::types::DbId;

use crate::models::webhook::{UpsertWebhook, WebhookConfig};

const COLUMNS: &str = "\
    id, session_id, url, secret, events, is_active, max_retries, timeout_ms, \
    last_error, last_error_at, created_at, updated_at";

/// Provides CRUD operations for per-session webhook configs.
pub struct WebhookRepo;

impl WebhookRepo {
    /// Create or replace the config for a session. Replacing re-activates the
    /// webhook and clears the last recorded failure.
    pub async fn upsert(pool: &PgPool, input: &UpsertWebhook) -> Result<WebhookConfig, sqlx::Error> {
        let query = format!(
            "INSERT INTO webhook_configs (session_id, url, secret, events, max_retries, timeout_ms) \
             VALUES ($1, $2, $3, $4, $5, $6) \
             ON CONFLICT ON CONSTRAINT uq_webhook_configs_session DO UPDATE SET \
                 url = EXCLUDED.url, \
                 secret = EXCLUDED.secret, \
                 events = EXCLUDED.events, \
                 max_retries = EXCLUDED.max_retries, \
                 timeout_ms = EXCLUDED.timeout_ms, \
                 is_active = true, \
                 last_error = NULL, \
                 last_error_at = NULL \
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, WebhookConfig>(&query)
            .bind(input.session_id)
            .bind(&input.url)
            .bind(&input.secret)
            .bind(&input.events)
            .bind(input.max_retries)
            .bind(input.timeout_ms)
            .fetch_one(pool)
            .await
    }

    pub async fn find_by_session_id(
        pool: &PgPool,
        session_id: DbId,
    ) -> Result<Option<WebhookConfig>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM webhook_configs WHERE session_id = $1");
        sqlx::query_as::<_, WebhookConfig>(&query)
            .bind(session_id)
            .fetch_optional(pool)
            .await
    }

    pub async fn list_active(pool: &PgPool) -> Result<Vec<WebhookConfig>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM webhook_configs WHERE is_active = true ORDER BY created_at"
        );
        sqlx::query_as::<_, WebhookConfig>(&query).fetch_all(pool).await
    }

    pub async fn delete_by_session_id(pool: &PgPool, session_id: DbId) -> Result<bool, sqlx::Error> {
        let result = sqlx::query("DELETE FROM webhook_configs WHERE session_id = $1")
            .bind(session_id)
            .execute(pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    /// Record the final failure of a delivery.
    pub async fn record_failure(
        pool: &PgPool,
        session_id: DbId,
        error: &str,
    ) -> Result<(), sqlx::Error> {
        sqlx::query(
            "UPDATE webhook_configs SET last_error = $2, last_error_at = NOW() \
             WHERE session_id = $1",
        )
        .bind(session_id)
        .bind(error)
        .execute(pool)
        .await?;
        Ok(())
    }
}
