//! Chat, contact, history, and peer-resolution handlers.
//!
//! Listings are served through the read-through cache unless `refresh=true`.

use axum::extract::{Path, Query, State};
use axum::Json;
use serde::Deserialize;
use serde_json::json;
use tgw_core::types::DbId;
use tgw_telegram::types::{
    Chat, ChatsQuery, ChatsResponse, ContactsQuery, ContactsResponse, Fetched, HistoryParams,
    HistoryResponse, ResolveRequest, ResolvedPeer,
};

use crate::error::AppResult;
use crate::middleware::auth::AuthUser;
use crate::query::RefreshParams;
use crate::response::DataResponse;
use crate::state::AppState;

/// Query of `DELETE /sessions/{id}/cache`.
#[derive(Debug, Deserialize)]
pub struct InvalidateParams {
    #[serde(rename = "type", default = "default_kind")]
    pub kind: String,
}

fn default_kind() -> String {
    "all".to_string()
}

/// GET /api/v1/sessions/{id}/chats
pub async fn list_chats(
    user: AuthUser,
    State(state): State<AppState>,
    Path(session_id): Path<DbId>,
    Query(query): Query<ChatsQuery>,
) -> AppResult<Json<DataResponse<ChatsResponse>>> {
    let chats = state
        .sessions
        .get_chats(user.user_id, session_id, &query)
        .await?;
    Ok(Json(DataResponse { data: chats }))
}

/// GET /api/v1/sessions/{id}/chats/{chat_id}
pub async fn get_chat(
    user: AuthUser,
    State(state): State<AppState>,
    Path((session_id, chat_id)): Path<(DbId, i64)>,
    Query(params): Query<RefreshParams>,
) -> AppResult<Json<DataResponse<Fetched<Chat>>>> {
    let chat = state
        .sessions
        .get_chat_info(user.user_id, session_id, chat_id, params.refresh)
        .await?;
    Ok(Json(DataResponse { data: chat }))
}

/// GET /api/v1/sessions/{id}/chats/{chat_id}/history
pub async fn chat_history(
    user: AuthUser,
    State(state): State<AppState>,
    Path((session_id, chat_id)): Path<(DbId, i64)>,
    Query(params): Query<HistoryParams>,
) -> AppResult<Json<DataResponse<HistoryResponse>>> {
    let history = state
        .sessions
        .get_history(user.user_id, session_id, chat_id, &params)
        .await?;
    Ok(Json(DataResponse { data: history }))
}

/// GET /api/v1/sessions/{id}/contacts
pub async fn list_contacts(
    user: AuthUser,
    State(state): State<AppState>,
    Path(session_id): Path<DbId>,
    Query(query): Query<ContactsQuery>,
) -> AppResult<Json<DataResponse<ContactsResponse>>> {
    let contacts = state
        .sessions
        .get_contacts(user.user_id, session_id, &query)
        .await?;
    Ok(Json(DataResponse { data: contacts }))
}

/// POST /api/v1/sessions/{id}/resolve
///
/// Body carries either `username` or `phone`.
pub async fn resolve_peer(
    user: AuthUser,
    State(state): State<AppState>,
    Path(session_id): Path<DbId>,
    Json(input): Json<ResolveRequest>,
) -> AppResult<Json<DataResponse<Fetched<ResolvedPeer>>>> {
    let peer = state
        .sessions
        .resolve(user.user_id, session_id, &input)
        .await?;
    Ok(Json(DataResponse { data: peer }))
}

/// DELETE /api/v1/sessions/{id}/cache?type=contacts|chats|all
///
/// `type` defaults to `all`.
pub async fn invalidate_cache(
    user: AuthUser,
    State(state): State<AppState>,
    Path(session_id): Path<DbId>,
    Query(params): Query<InvalidateParams>,
) -> AppResult<Json<DataResponse<serde_json::Value>>> {
    state
        .sessions
        .invalidate_cache(user.user_id, session_id, &params.kind)
        .await?;
    tracing::info!(session_id = %session_id, cache_type = %params.kind, "Cache invalidated");
    Ok(Json(DataResponse {
        data: json!({ "cache_type": params.kind }),
    }))
}
