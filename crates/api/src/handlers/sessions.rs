//! Handlers for the `/sessions` resource: login start, code verification,
//! listing, and deletion.

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::Json;
use serde::{Deserialize, Serialize};
use tgw_core::types::DbId;
use tgw_telegram::sessions::{AuthMethod, NewSession, SessionDetails};
use validator::Validate;

use crate::error::AppResult;
use crate::middleware::auth::AuthUser;
use crate::response::DataResponse;
use crate::state::AppState;

#[derive(Debug, Deserialize, Validate)]
pub struct CreateSessionRequest {
    #[serde(default)]
    pub auth_method: AuthMethod,
    pub phone: Option<String>,
    #[validate(range(min = 1))]
    pub api_id: i32,
    #[validate(length(equal = 32))]
    pub api_hash: String,
    #[validate(length(max = 100))]
    pub session_name: Option<String>,
}

#[derive(Debug, Deserialize, Validate)]
pub struct VerifyCodeRequest {
    #[validate(length(min = 5, max = 6))]
    pub code: String,
}

/// Returned by `POST /sessions`.
#[derive(Debug, Serialize)]
pub struct CreateSessionResponse {
    pub session: SessionDetails,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub qr_image_base64: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub qr_url: Option<String>,
    pub next_step: String,
}

/// POST /api/v1/sessions
///
/// Start an SMS or QR login. SMS logins continue with
/// `POST /sessions/{id}/verify`; QR logins finish in the background and are
/// polled with `GET /sessions/{id}`.
pub async fn create_session(
    user: AuthUser,
    State(state): State<AppState>,
    Json(input): Json<CreateSessionRequest>,
) -> AppResult<impl IntoResponse> {
    input.validate()?;

    let created = state
        .sessions
        .create_session(
            user.user_id,
            NewSession {
                auth_method: input.auth_method,
                phone: input.phone,
                api_id: input.api_id,
                api_hash: input.api_hash,
                session_name: input.session_name,
            },
        )
        .await?;

    let session_id = created.session.id;
    let next_step = match input.auth_method {
        AuthMethod::Sms => format!("POST /api/v1/sessions/{session_id}/verify with {{\"code\"}}"),
        AuthMethod::Qr => format!("Scan the QR code, then poll GET /api/v1/sessions/{session_id}"),
    };
    let (qr_image_base64, qr_url) = match created.qr {
        Some(qr) => (Some(qr.png_base64), Some(qr.url)),
        None => (None, None),
    };

    let response = CreateSessionResponse {
        session: SessionDetails::from(&created.session),
        qr_image_base64,
        qr_url,
        next_step,
    };
    Ok((StatusCode::CREATED, Json(DataResponse { data: response })))
}

/// POST /api/v1/sessions/{id}/verify
pub async fn verify_code(
    user: AuthUser,
    State(state): State<AppState>,
    Path(session_id): Path<DbId>,
    Json(input): Json<VerifyCodeRequest>,
) -> AppResult<Json<DataResponse<SessionDetails>>> {
    input.validate()?;
    let session = state
        .sessions
        .verify_code(user.user_id, session_id, &input.code)
        .await?;
    Ok(Json(DataResponse {
        data: SessionDetails::from(&session),
    }))
}

/// GET /api/v1/sessions
pub async fn list_sessions(
    user: AuthUser,
    State(state): State<AppState>,
) -> AppResult<Json<DataResponse<Vec<SessionDetails>>>> {
    let sessions = state.sessions.list_sessions(user.user_id).await?;
    Ok(Json(DataResponse {
        data: sessions.iter().map(SessionDetails::from).collect(),
    }))
}

/// GET /api/v1/sessions/{id}
pub async fn get_session(
    user: AuthUser,
    State(state): State<AppState>,
    Path(session_id): Path<DbId>,
) -> AppResult<Json<DataResponse<SessionDetails>>> {
    let session = state.sessions.get_session(user.user_id, session_id).await?;
    Ok(Json(DataResponse {
        data: SessionDetails::from(&session),
    }))
}

/// DELETE /api/v1/sessions/{id}
pub async fn delete_session(
    user: AuthUser,
    State(state): State<AppState>,
    Path(session_id): Path<DbId>,
) -> AppResult<StatusCode> {
    state
        .sessions
        .delete_session(user.user_id, session_id)
        .await?;
    tracing::info!(session_id = %session_id, user_id = %user.user_id, "Session deleted via API");
    Ok(StatusCode::NO_CONTENT)
}
