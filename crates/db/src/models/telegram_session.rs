//! Telegram session record: one upstream account owned by one API user.

use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use tgw_core::types::{DbId, Timestamp};

/// Login progress of a session record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "TEXT", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum AuthState {
    Pending,
    CodeSent,
    PasswordRequired,
    Authenticated,
    Failed,
}

impl AuthState {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::CodeSent => "code_sent",
            Self::PasswordRequired => "password_required",
            Self::Authenticated => "authenticated",
            Self::Failed => "failed",
        }
    }
}

/// Full row from `telegram_sessions`.
///
/// `api_hash_encrypted` and `session_data` are sealed with the process key
/// and must never be serialized.
#[derive(Debug, Clone, FromRow)]
pub struct TelegramSession {
    pub id: DbId,
    pub user_id: DbId,
    pub phone_number: String,
    pub api_id: i32,
    pub api_hash_encrypted: Vec<u8>,
    pub session_name: String,
    pub session_data: Vec<u8>,
    pub auth_state: AuthState,
    pub telegram_user_id: Option<i64>,
    pub telegram_username: Option<String>,
    pub is_active: bool,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

impl TelegramSession {
    /// Whether the session may hold a long-lived pool connection.
    pub fn is_pool_eligible(&self) -> bool {
        self.auth_state == AuthState::Authenticated
            && self.is_active
            && !self.session_data.is_empty()
    }

    /// Whether one-shot operations (send, list, resolve) may run.
    pub fn is_usable(&self) -> bool {
        self.auth_state == AuthState::Authenticated && self.is_active
    }
}

/// Public view of a session record.
#[derive(Debug, Clone, Serialize)]
pub struct SessionResponse {
    pub id: DbId,
    pub phone_number: String,
    pub api_id: i32,
    pub session_name: String,
    pub auth_state: AuthState,
    pub telegram_user_id: Option<i64>,
    pub telegram_username: Option<String>,
    pub is_active: bool,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

impl From<&TelegramSession> for SessionResponse {
    fn from(s: &TelegramSession) -> Self {
        Self {
            id: s.id,
            phone_number: s.phone_number.clone(),
            api_id: s.api_id,
            session_name: s.session_name.clone(),
            auth_state: s.auth_state,
            telegram_user_id: s.telegram_user_id,
            telegram_username: s.telegram_username.clone(),
            is_active: s.is_active,
            created_at: s.created_at,
            updated_at: s.updated_at,
        }
    }
}

/// DTO for inserting a fresh session record at login start.
#[derive(Debug, Clone)]
pub struct CreateTelegramSession {
    pub user_id: DbId,
    pub phone_number: String,
    pub api_id: i32,
    pub api_hash_encrypted: Vec<u8>,
    pub session_name: String,
    pub auth_state: AuthState,
}

/// Result of a successful login, written in one statement.
#[derive(Debug, Clone)]
pub struct CompleteAuth {
    pub session_data: Vec<u8>,
    pub telegram_user_id: i64,
    pub telegram_username: Option<String>,
}
