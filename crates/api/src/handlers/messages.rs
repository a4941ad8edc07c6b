//! Outbound message handlers.
//!
//! Every send is accepted as a job and answered with `202 Accepted`; the
//! outcome is read back from `GET /messages/{job_id}/status`.

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::Json;
use serde::Deserialize;
use tgw_core::messages::{MessageType, MAX_SEND_DELAY_MS};
use tgw_core::types::DbId;
use tgw_telegram::jobs::{BulkSpec, JobReceipt, MessageJob, SendSpec};
use uuid::Uuid;
use validator::Validate;

use crate::error::AppResult;
use crate::middleware::auth::AuthUser;
use crate::response::DataResponse;
use crate::state::AppState;

#[derive(Debug, Deserialize, Validate)]
pub struct TextMessageRequest {
    #[validate(length(min = 1))]
    pub to: String,
    #[validate(length(min = 1, max = 4096))]
    pub text: String,
    #[serde(default)]
    #[validate(range(max = MAX_SEND_DELAY_MS))]
    pub delay_ms: u64,
}

/// Body shared by the media endpoints. The URL field may be named after the
/// endpoint (`photo_url`, `video_url`, ...) or plainly `media_url`.
#[derive(Debug, Deserialize, Validate)]
pub struct MediaMessageRequest {
    #[validate(length(min = 1))]
    pub to: String,
    #[serde(
        alias = "photo_url",
        alias = "video_url",
        alias = "audio_url",
        alias = "file_url"
    )]
    #[validate(url)]
    pub media_url: String,
    pub caption: Option<String>,
    #[serde(default)]
    #[validate(range(max = MAX_SEND_DELAY_MS))]
    pub delay_ms: u64,
}

#[derive(Debug, Deserialize, Validate)]
pub struct BulkMessageRequest {
    #[validate(length(min = 1))]
    pub recipients: Vec<String>,
    #[serde(default)]
    pub text: String,
    #[serde(rename = "type", default)]
    pub message_type: MessageType,
    pub media_url: Option<String>,
    pub caption: Option<String>,
    /// Spacing between consecutive recipients.
    #[serde(default)]
    #[validate(range(max = MAX_SEND_DELAY_MS))]
    pub delay_ms: u64,
}

/// POST /api/v1/sessions/{id}/messages/text
pub async fn send_text(
    user: AuthUser,
    State(state): State<AppState>,
    Path(session_id): Path<DbId>,
    Json(input): Json<TextMessageRequest>,
) -> AppResult<impl IntoResponse> {
    input.validate()?;
    let receipt = state
        .sessions
        .send_message(
            user.user_id,
            session_id,
            SendSpec {
                to: input.to,
                message_type: MessageType::Text,
                text: input.text,
                delay_ms: input.delay_ms,
                ..SendSpec::default()
            },
        )
        .await?;
    Ok((StatusCode::ACCEPTED, Json(DataResponse { data: receipt })))
}

/// POST /api/v1/sessions/{id}/messages/photo
pub async fn send_photo(
    user: AuthUser,
    state: State<AppState>,
    path: Path<DbId>,
    Json(input): Json<MediaMessageRequest>,
) -> AppResult<impl IntoResponse> {
    send_media(user, state, path, MessageType::Photo, input).await
}

/// POST /api/v1/sessions/{id}/messages/video
pub async fn send_video(
    user: AuthUser,
    state: State<AppState>,
    path: Path<DbId>,
    Json(input): Json<MediaMessageRequest>,
) -> AppResult<impl IntoResponse> {
    send_media(user, state, path, MessageType::Video, input).await
}

/// POST /api/v1/sessions/{id}/messages/audio
pub async fn send_audio(
    user: AuthUser,
    state: State<AppState>,
    path: Path<DbId>,
    Json(input): Json<MediaMessageRequest>,
) -> AppResult<impl IntoResponse> {
    send_media(user, state, path, MessageType::Audio, input).await
}

/// POST /api/v1/sessions/{id}/messages/file
pub async fn send_file(
    user: AuthUser,
    state: State<AppState>,
    path: Path<DbId>,
    Json(input): Json<MediaMessageRequest>,
) -> AppResult<impl IntoResponse> {
    send_media(user, state, path, MessageType::File, input).await
}

async fn send_media(
    user: AuthUser,
    State(state): State<AppState>,
    Path(session_id): Path<DbId>,
    message_type: MessageType,
    input: MediaMessageRequest,
) -> AppResult<(StatusCode, Json<DataResponse<JobReceipt>>)> {
    input.validate()?;
    let receipt = state
        .sessions
        .send_message(
            user.user_id,
            session_id,
            SendSpec {
                to: input.to,
                message_type,
                media_url: Some(input.media_url),
                caption: input.caption,
                delay_ms: input.delay_ms,
                ..SendSpec::default()
            },
        )
        .await?;
    Ok((StatusCode::ACCEPTED, Json(DataResponse { data: receipt })))
}

/// POST /api/v1/sessions/{id}/messages/bulk
///
/// Recipients that fail validation are reported individually; the rest are
/// queued `index × delay_ms` apart.
pub async fn send_bulk(
    user: AuthUser,
    State(state): State<AppState>,
    Path(session_id): Path<DbId>,
    Json(input): Json<BulkMessageRequest>,
) -> AppResult<impl IntoResponse> {
    input.validate()?;
    let results = state
        .sessions
        .send_bulk(
            user.user_id,
            session_id,
            BulkSpec {
                recipients: input.recipients,
                message_type: input.message_type,
                text: input.text,
                media_url: input.media_url,
                caption: input.caption,
                delay_ms: input.delay_ms,
            },
        )
        .await?;
    Ok((StatusCode::ACCEPTED, Json(DataResponse { data: results })))
}

/// GET /api/v1/messages/{job_id}/status
pub async fn job_status(
    user: AuthUser,
    State(state): State<AppState>,
    Path(job_id): Path<Uuid>,
) -> AppResult<Json<DataResponse<MessageJob>>> {
    let job = state.sessions.job_status(user.user_id, job_id).await?;
    Ok(Json(DataResponse { data: job }))
}
