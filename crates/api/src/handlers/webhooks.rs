//! Per-session webhook configuration and listening control.

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::Json;
use serde::Deserialize;
use tgw_core::types::DbId;
use tgw_db::models::webhook::WebhookResponse;
use tgw_telegram::sessions::{ListeningStatus, PoolStatus, WebhookInput};

use crate::error::AppResult;
use crate::middleware::auth::AuthUser;
use crate::response::DataResponse;
use crate::state::AppState;

/// Body of `POST /sessions/{id}/webhook`. Zero or missing retry/timeout
/// values select the defaults.
#[derive(Debug, Deserialize)]
pub struct ConfigureWebhookRequest {
    pub url: String,
    pub secret: Option<String>,
    #[serde(default)]
    pub events: Vec<String>,
    #[serde(default)]
    pub max_retries: i32,
    #[serde(default)]
    pub timeout_ms: i32,
}

/// POST /api/v1/sessions/{id}/webhook
///
/// Create or replace the session's webhook.
pub async fn configure_webhook(
    user: AuthUser,
    State(state): State<AppState>,
    Path(session_id): Path<DbId>,
    Json(input): Json<ConfigureWebhookRequest>,
) -> AppResult<Json<DataResponse<WebhookResponse>>> {
    let webhook = state
        .sessions
        .set_webhook(
            user.user_id,
            session_id,
            WebhookInput {
                url: input.url,
                secret: input.secret,
                events: input.events,
                max_retries: input.max_retries,
                timeout_ms: input.timeout_ms,
            },
        )
        .await?;
    Ok(Json(DataResponse {
        data: WebhookResponse::from(webhook),
    }))
}

/// GET /api/v1/sessions/{id}/webhook
pub async fn get_webhook(
    user: AuthUser,
    State(state): State<AppState>,
    Path(session_id): Path<DbId>,
) -> AppResult<Json<DataResponse<WebhookResponse>>> {
    let webhook = state.sessions.get_webhook(user.user_id, session_id).await?;
    Ok(Json(DataResponse {
        data: WebhookResponse::from(webhook),
    }))
}

/// DELETE /api/v1/sessions/{id}/webhook
///
/// Also stops the session's listener.
pub async fn delete_webhook(
    user: AuthUser,
    State(state): State<AppState>,
    Path(session_id): Path<DbId>,
) -> AppResult<StatusCode> {
    let deleted = state
        .sessions
        .delete_webhook(user.user_id, session_id)
        .await?;
    tracing::info!(session_id = %session_id, deleted, "Webhook removed");
    Ok(StatusCode::NO_CONTENT)
}

/// POST /api/v1/sessions/{id}/webhook/start
pub async fn start_listening(
    user: AuthUser,
    State(state): State<AppState>,
    Path(session_id): Path<DbId>,
) -> AppResult<Json<DataResponse<ListeningStatus>>> {
    let status = state
        .sessions
        .start_listening(user.user_id, session_id)
        .await?;
    Ok(Json(DataResponse { data: status }))
}

/// POST /api/v1/sessions/{id}/webhook/stop
pub async fn stop_listening(
    user: AuthUser,
    State(state): State<AppState>,
    Path(session_id): Path<DbId>,
) -> AppResult<Json<DataResponse<ListeningStatus>>> {
    let status = state
        .sessions
        .stop_listening(user.user_id, session_id)
        .await?;
    Ok(Json(DataResponse { data: status }))
}

/// GET /api/v1/pool/status
///
/// Admins see every running session, other users only their own.
pub async fn pool_status(
    user: AuthUser,
    State(state): State<AppState>,
) -> Json<DataResponse<PoolStatus>> {
    let status = state
        .sessions
        .pool_status(user.user_id, user.is_admin())
        .await;
    Json(DataResponse { data: status })
}
