//! Session store adapter: the persisted records the core reads and writes.

use async_trait::async_trait;
use tgw_core::types::DbId;
use tgw_db::models::telegram_session::{
    AuthState, CompleteAuth, CreateTelegramSession, TelegramSession,
};
use tgw_db::models::webhook::{UpsertWebhook, WebhookConfig};
use tgw_db::repositories::{TelegramSessionRepo, WebhookRepo};
use tgw_db::DbPool;

/// Session records plus the webhook config attached to each.
#[async_trait]
pub trait SessionStore: Send + Sync {
    async fn create(&self, input: &CreateTelegramSession)
        -> Result<TelegramSession, sqlx::Error>;

    async fn get_by_id(&self, id: DbId) -> Result<Option<TelegramSession>, sqlx::Error>;

    async fn get_by_user_and_phone(
        &self,
        user_id: DbId,
        phone: &str,
    ) -> Result<Option<TelegramSession>, sqlx::Error>;

    async fn list_by_user(&self, user_id: DbId) -> Result<Vec<TelegramSession>, sqlx::Error>;

    /// Records eligible for a pool connection.
    async fn list_active(&self) -> Result<Vec<TelegramSession>, sqlx::Error>;

    /// Restart login on an inactive record. `None` if it is active or gone.
    async fn reset_for_login(
        &self,
        id: DbId,
        input: &CreateTelegramSession,
    ) -> Result<Option<TelegramSession>, sqlx::Error>;

    /// Store the sealed blob and identity and mark the record authenticated.
    async fn complete_auth(
        &self,
        id: DbId,
        input: &CompleteAuth,
    ) -> Result<Option<TelegramSession>, sqlx::Error>;

    async fn set_auth_state(&self, id: DbId, state: AuthState) -> Result<bool, sqlx::Error>;

    /// Complete a QR login and move the record off its phone placeholder
    /// onto `phone`, or a unique variant of it when `phone` is taken.
    async fn complete_qr_auth(
        &self,
        id: DbId,
        input: &CompleteAuth,
        phone: &str,
    ) -> Result<Option<TelegramSession>, sqlx::Error>;

    async fn delete(&self, id: DbId) -> Result<bool, sqlx::Error>;

    // ---- webhook configs ----

    async fn get_webhook(&self, session_id: DbId) -> Result<Option<WebhookConfig>, sqlx::Error>;

    async fn upsert_webhook(&self, input: &UpsertWebhook) -> Result<WebhookConfig, sqlx::Error>;

    async fn delete_webhook(&self, session_id: DbId) -> Result<bool, sqlx::Error>;
}

/// [`SessionStore`] over the Postgres repositories.
#[derive(Clone)]
pub struct PgSessionStore {
    pool: DbPool,
}

impl PgSessionStore {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl SessionStore for PgSessionStore {
    async fn create(
        &self,
        input: &CreateTelegramSession,
    ) -> Result<TelegramSession, sqlx::Error> {
        TelegramSessionRepo::create(&self.pool, input).await
    }

    async fn get_by_id(&self, id: DbId) -> Result<Option<TelegramSession>, sqlx::Error> {
        TelegramSessionRepo::find_by_id(&self.pool, id).await
    }

    async fn get_by_user_and_phone(
        &self,
        user_id: DbId,
        phone: &str,
    ) -> Result<Option<TelegramSession>, sqlx::Error> {
        TelegramSessionRepo::find_by_user_and_phone(&self.pool, user_id, phone).await
    }

    async fn list_by_user(&self, user_id: DbId) -> Result<Vec<TelegramSession>, sqlx::Error> {
        TelegramSessionRepo::list_by_user(&self.pool, user_id).await
    }

    async fn list_active(&self) -> Result<Vec<TelegramSession>, sqlx::Error> {
        TelegramSessionRepo::list_active(&self.pool).await
    }

    async fn reset_for_login(
        &self,
        id: DbId,
        input: &CreateTelegramSession,
    ) -> Result<Option<TelegramSession>, sqlx::Error> {
        TelegramSessionRepo::reset_for_login(&self.pool, id, input).await
    }

    async fn complete_auth(
        &self,
        id: DbId,
        input: &CompleteAuth,
    ) -> Result<Option<TelegramSession>, sqlx::Error> {
        TelegramSessionRepo::complete_auth(&self.pool, id, input).await
    }

    async fn set_auth_state(&self, id: DbId, state: AuthState) -> Result<bool, sqlx::Error> {
        TelegramSessionRepo::set_auth_state(&self.pool, id, state).await
    }

    async fn complete_qr_auth(
        &self,
        id: DbId,
        input: &CompleteAuth,
        phone: &str,
    ) -> Result<Option<TelegramSession>, sqlx::Error> {
        TelegramSessionRepo::complete_qr_auth(&self.pool, id, input, phone).await
    }

    async fn delete(&self, id: DbId) -> Result<bool, sqlx::Error> {
        TelegramSessionRepo::delete(&self.pool, id).await
    }

    async fn get_webhook(&self, session_id: DbId) -> Result<Option<WebhookConfig>, sqlx::Error> {
        WebhookRepo::find_by_session_id(&self.pool, session_id).await
    }

    async fn upsert_webhook(&self, input: &UpsertWebhook) -> Result<WebhookConfig, sqlx::Error> {
        WebhookRepo::upsert(&self.pool, input).await
    }

    async fn delete_webhook(&self, session_id: DbId) -> Result<bool, sqlx::Error> {
        WebhookRepo::delete_by_session_id(&self.pool, session_id).await
    }
}
