//! Repository for the `telegram_sessions` table.

use sqlx::PgPool;
use tgw_core::types::DbId;

use crate::models::telegram_session::{
    AuthState, CompleteAuth, CreateTelegramSession, TelegramSession,
};

const COLUMNS: &str = "id, user_id, phone_number, api_id, api_hash_encrypted, session_name, \
                        session_data, auth_state, telegram_user_id, telegram_username, \
                        is_active, created_at, updated_at";

/// Provides CRUD operations for telegram session records.
pub struct TelegramSessionRepo;

impl TelegramSessionRepo {
    /// Insert a new record with an empty session blob and `is_active = false`.
    pub async fn create(
        pool: &PgPool,
        input: &CreateTelegramSession,
    ) -> Result<TelegramSession, sqlx::Error> {
        let query = format!(
            "INSERT INTO telegram_sessions
                (user_id, phone_number, api_id, api_hash_encrypted, session_name, auth_state)
             VALUES ($1, $2, $3, $4, $5, $6)
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, TelegramSession>(&query)
            .bind(input.user_id)
            .bind(&input.phone_number)
            .bind(input.api_id)
            .bind(&input.api_hash_encrypted)
            .bind(&input.session_name)
            .bind(input.auth_state)
            .fetch_one(pool)
            .await
    }

    pub async fn find_by_id(
        pool: &PgPool,
        id: DbId,
    ) -> Result<Option<TelegramSession>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM telegram_sessions WHERE id = $1");
        sqlx::query_as::<_, TelegramSession>(&query)
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    /// Find the most recent record for a phone number across all users.
    pub async fn find_by_phone(
        pool: &PgPool,
        phone: &str,
    ) -> Result<Option<TelegramSession>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM telegram_sessions
             WHERE phone_number = $1
             ORDER BY created_at DESC
             LIMIT 1"
        );
        sqlx::query_as::<_, TelegramSession>(&query)
            .bind(phone)
            .fetch_optional(pool)
            .await
    }

    pub async fn find_by_user_and_phone(
        pool: &PgPool,
        user_id: DbId,
        phone: &str,
    ) -> Result<Option<TelegramSession>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM telegram_sessions WHERE user_id = $1 AND phone_number = $2"
        );
        sqlx::query_as::<_, TelegramSession>(&query)
            .bind(user_id)
            .bind(phone)
            .fetch_optional(pool)
            .await
    }

    /// List a user's records, newest first.
    pub async fn list_by_user(
        pool: &PgPool,
        user_id: DbId,
    ) -> Result<Vec<TelegramSession>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM telegram_sessions WHERE user_id = $1 ORDER BY created_at DESC"
        );
        sqlx::query_as::<_, TelegramSession>(&query)
            .bind(user_id)
            .fetch_all(pool)
            .await
    }

    /// List every record eligible for a pool connection: authenticated,
    /// active, and holding a non-empty blob.
    pub async fn list_active(pool: &PgPool) -> Result<Vec<TelegramSession>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM telegram_sessions
             WHERE auth_state = 'authenticated'
               AND is_active = true
               AND length(session_data) > 0
             ORDER BY created_at"
        );
        sqlx::query_as::<_, TelegramSession>(&query)
            .fetch_all(pool)
            .await
    }

    /// Write the sealed blob together with the upstream identity and flip the
    /// record to `authenticated` + active. This is the only statement that
    /// writes `session_data`.
    pub async fn complete_auth(
        pool: &PgPool,
        id: DbId,
        input: &CompleteAuth,
    ) -> Result<Option<TelegramSession>, sqlx::Error> {
        let query = format!(
            "UPDATE telegram_sessions SET
                session_data = $2,
                telegram_user_id = $3,
                telegram_username = $4,
                auth_state = 'authenticated',
                is_active = true
             WHERE id = $1
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, TelegramSession>(&query)
            .bind(id)
            .bind(&input.session_data)
            .bind(input.telegram_user_id)
            .bind(&input.telegram_username)
            .fetch_optional(pool)
            .await
    }

    /// Move a record to `state` without touching the blob.
    pub async fn set_auth_state(
        pool: &PgPool,
        id: DbId,
        state: AuthState,
    ) -> Result<bool, sqlx::Error> {
        let result = sqlx::query("UPDATE telegram_sessions SET auth_state = $2 WHERE id = $1")
            .bind(id)
            .bind(state)
            .execute(pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    /// Restart login on an existing inactive record with fresh credentials.
    pub async fn reset_for_login(
        pool: &PgPool,
        id: DbId,
        input: &CreateTelegramSession,
    ) -> Result<Option<TelegramSession>, sqlx::Error> {
        let query = format!(
            "UPDATE telegram_sessions SET
                api_id = $2,
                api_hash_encrypted = $3,
                session_name = $4,
                auth_state = $5
             WHERE id = $1 AND is_active = false
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, TelegramSession>(&query)
            .bind(id)
            .bind(input.api_id)
            .bind(&input.api_hash_encrypted)
            .bind(&input.session_name)
            .bind(input.auth_state)
            .fetch_optional(pool)
            .await
    }

    /// [`complete_auth`](Self::complete_auth) for a QR login, which also
    /// replaces the phone placeholder with `phone`. When the owner already
    /// has a record under `phone`, the record id is appended so the row
    /// never stays active under the placeholder.
    pub async fn complete_qr_auth(
        pool: &PgPool,
        id: DbId,
        input: &CompleteAuth,
        phone: &str,
    ) -> Result<Option<TelegramSession>, sqlx::Error> {
        let query = format!(
            "UPDATE telegram_sessions AS t SET
                session_data = $2,
                telegram_user_id = $3,
                telegram_username = $4,
                auth_state = 'authenticated',
                is_active = true,
                phone_number = CASE
                    WHEN EXISTS (
                        SELECT 1 FROM telegram_sessions o
                        WHERE o.user_id = t.user_id
                          AND o.phone_number = $5
                          AND o.id <> t.id
                    ) THEN $5 || '-' || t.id::text
                    ELSE $5
                END
             WHERE t.id = $1
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, TelegramSession>(&query)
            .bind(id)
            .bind(&input.session_data)
            .bind(input.telegram_user_id)
            .bind(&input.telegram_username)
            .bind(phone)
            .fetch_optional(pool)
            .await
    }

    /// Delete a record. Its webhook config goes with it via cascade.
    pub async fn delete(pool: &PgPool, id: DbId) -> Result<bool, sqlx::Error> {
        let result = sqlx::query("DELETE FROM telegram_sessions WHERE id = $1")
            .bind(id)
            .execute(pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }
}
