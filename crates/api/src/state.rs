use std::sync::Arc;

use tgw_telegram::cache::KeyValueCache;
use tgw_telegram::sessions::SessionService;

use crate::config::ServerConfig;

/// Shared application state available to all Axum handlers via `State<AppState>`.
///
/// This is cheaply cloneable (inner data is behind `Arc` or is already `Clone`).
#[derive(Clone)]
pub struct AppState {
    /// Database connection pool.
    pub pool: tgw_db::DbPool,
    pub config: Arc<ServerConfig>,
    /// Session lifecycle core: logins, chats, messages, webhooks, pool.
    pub sessions: Arc<SessionService>,
    /// Key/value cache (login throttling, health probe).
    pub cache: Arc<dyn KeyValueCache>,
}
