//! Route definitions for `/sessions` and everything scoped to one session.

use axum::routing::{delete, get, post};
use axum::Router;

use crate::handlers::{chats, messages, sessions, webhooks};
use crate::state::AppState;

/// Routes mounted at `/sessions`.
///
/// ```text
/// POST   /                                  create (sms | qr)
/// GET    /                                  list own sessions
/// GET    /{id}                              get (with login status)
/// DELETE /{id}                              delete
/// POST   /{id}/verify                       submit SMS code
///
/// GET    /{id}/chats                        list chats
/// GET    /{id}/chats/{chat_id}              chat info
/// GET    /{id}/chats/{chat_id}/history      message history
/// GET    /{id}/contacts                     list contacts
/// POST   /{id}/resolve                      resolve username / phone
/// DELETE /{id}/cache                        invalidate cached lookups
///
/// POST   /{id}/messages/text                send text
/// POST   /{id}/messages/photo|video|audio|file
/// POST   /{id}/messages/bulk                send to many recipients
///
/// POST   /{id}/webhook                      configure webhook
/// GET    /{id}/webhook                      get webhook
/// DELETE /{id}/webhook                      delete webhook (stops listening)
/// POST   /{id}/webhook/start                start listening
/// POST   /{id}/webhook/stop                 stop listening
/// ```
pub fn router() -> Router<AppState> {
    Router::new()
        .route(
            "/",
            post(sessions::create_session).get(sessions::list_sessions),
        )
        .route(
            "/{id}",
            get(sessions::get_session).delete(sessions::delete_session),
        )
        .route("/{id}/verify", post(sessions::verify_code))
        // Chats and contacts
        .route("/{id}/chats", get(chats::list_chats))
        .route("/{id}/chats/{chat_id}", get(chats::get_chat))
        .route("/{id}/chats/{chat_id}/history", get(chats::chat_history))
        .route("/{id}/contacts", get(chats::list_contacts))
        .route("/{id}/resolve", post(chats::resolve_peer))
        .route("/{id}/cache", delete(chats::invalidate_cache))
        // Messages
        .route("/{id}/messages/text", post(messages::send_text))
        .route("/{id}/messages/photo", post(messages::send_photo))
        .route("/{id}/messages/video", post(messages::send_video))
        .route("/{id}/messages/audio", post(messages::send_audio))
        .route("/{id}/messages/file", post(messages::send_file))
        .route("/{id}/messages/bulk", post(messages::send_bulk))
        // Webhook and listening
        .route(
            "/{id}/webhook",
            post(webhooks::configure_webhook)
                .get(webhooks::get_webhook)
                .delete(webhooks::delete_webhook),
        )
        .route("/{id}/webhook/start", post(webhooks::start_listening))
        .route("/{id}/webhook/stop", post(webhooks::stop_listening))
}
