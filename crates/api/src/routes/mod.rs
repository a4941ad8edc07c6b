pub mod auth;
pub mod health;
pub mod sessions;

use axum::routing::get;
use axum::Router;

use crate::handlers::{messages, webhooks};
use crate::state::AppState;

/// Build the `/api/v1` route tree.
///
/// ```text
/// /auth/...                       accounts and tokens (see routes::auth)
/// /sessions/...                   session lifecycle, chats, messages,
///                                 webhooks (see routes::sessions)
/// /messages/{job_id}/status       message job status
/// /pool/status                    running listeners
/// ```
pub fn api_routes() -> Router<AppState> {
    Router::new()
        .nest("/auth", auth::router())
        .nest("/sessions", sessions::router())
        .route("/messages/{job_id}/status", get(messages::job_status))
        .route("/pool/status", get(webhooks::pool_status))
}
