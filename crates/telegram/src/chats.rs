//! Chats, contacts, history, and peer resolution, read through the cache.
//!
//! Every lookup runs a short-lived client against an already validated
//! session record. List results are cached whole and paginated after the
//! cache read. The cache is advisory: read and write failures are logged
//! and the upstream result is served anyway.

use std::sync::Arc;
use std::time::Duration;

use serde::de::DeserializeOwned;
use serde::Serialize;
use tokio_util::sync::CancellationToken;

use tgw_core::cache_keys;
use tgw_core::pagination::{clamp_limit, clamp_offset, paginate};
use tgw_core::types::DbId;
use tgw_db::models::telegram_session::TelegramSession;

use crate::cache::{CacheJsonExt, KeyValueCache};
use crate::config::CacheTtls;
use crate::connector::Connector;
use crate::error::TelegramError;
use crate::mapping;
use crate::types::{
    Chat, ChatsQuery, ChatsResponse, ContactsQuery, ContactsResponse, Fetched, HistoryParams,
    HistoryResponse, ResolveRequest, ResolvedPeer,
};
use crate::upstream::{HistoryQuery, InputPeer, ScopedClient};

/// Number of dialogs fetched from upstream per chats refresh.
const DIALOGS_FETCH_SIZE: i32 = 100;

const CHATS_DEFAULT_LIMIT: i64 = 50;
const CHATS_MAX_LIMIT: i64 = 100;
const CONTACTS_DEFAULT_LIMIT: i64 = 50;
const CONTACTS_MAX_LIMIT: i64 = 200;
const HISTORY_DEFAULT_LIMIT: i64 = 50;
const HISTORY_MAX_LIMIT: i64 = 100;

/// Batch size for cache key scans during invalidation.
const SCAN_BATCH: usize = 100;

/// Which cached data [`ChatService::invalidate`] drops.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CacheKind {
    Contacts,
    Chats,
    All,
}

impl std::str::FromStr for CacheKind {
    type Err = TelegramError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "contacts" => Ok(Self::Contacts),
            "chats" => Ok(Self::Chats),
            "all" => Ok(Self::All),
            other => Err(TelegramError::InvalidKind(other.to_string())),
        }
    }
}

pub struct ChatService {
    connector: Arc<Connector>,
    cache: Arc<dyn KeyValueCache>,
    ttl: CacheTtls,
}

impl ChatService {
    pub fn new(connector: Arc<Connector>, cache: Arc<dyn KeyValueCache>, ttl: CacheTtls) -> Self {
        Self {
            connector,
            cache,
            ttl,
        }
    }

    pub async fn get_chats(
        &self,
        session: &TelegramSession,
        query: &ChatsQuery,
    ) -> Result<ChatsResponse, TelegramError> {
        let limit = clamp_limit(query.limit, CHATS_DEFAULT_LIMIT, CHATS_MAX_LIMIT);
        let offset = clamp_offset(query.offset);
        let key = cache_keys::chats(session.id, query.archived);

        let (all, from_cache) = self
            .read_through(&key, query.refresh, self.ttl.chats, || async {
                let client = self.open(session).await?;
                let page = client
                    .call(client.client().get_dialogs(DIALOGS_FETCH_SIZE))
                    .await;
                client.close().await;
                Ok(mapping::chats_from_dialogs(&page?, query.archived))
            })
            .await?;

        let total_count = all.len();
        let (chats, has_more) = paginate(&all, offset, limit);
        Ok(ChatsResponse {
            chats,
            total_count,
            has_more,
            from_cache,
        })
    }

    pub async fn get_chat_info(
        &self,
        session: &TelegramSession,
        chat_id: i64,
        refresh: bool,
    ) -> Result<Fetched<Chat>, TelegramError> {
        let key = cache_keys::chat_info(session.id, chat_id);
        let (data, from_cache) = self
            .read_through(&key, refresh, self.ttl.chat_info, || async {
                let client = self.open(session).await?;
                let chat = fetch_chat(&client, chat_id).await;
                client.close().await;
                chat
            })
            .await?;
        Ok(Fetched { data, from_cache })
    }

    /// Message history of one chat. Never cached.
    pub async fn get_history(
        &self,
        session: &TelegramSession,
        chat_id: i64,
        params: &HistoryParams,
    ) -> Result<HistoryResponse, TelegramError> {
        let limit = clamp_limit(params.limit, HISTORY_DEFAULT_LIMIT, HISTORY_MAX_LIMIT);
        let query = HistoryQuery {
            limit: limit as i32,
            offset_id: params.offset_id.unwrap_or(0),
            offset_date: params.offset_date.unwrap_or(0),
        };
        let peer = InputPeer::from_marked_id(chat_id);

        let client = self.open(session).await?;
        let page = client.call(client.client().get_history(&peer, query)).await;
        client.close().await;
        let page = page?;

        let messages: Vec<_> = page
            .messages
            .iter()
            .map(|m| mapping::chat_message(m, &page.entities, chat_id))
            .collect();
        Ok(HistoryResponse {
            total_count: messages.len(),
            has_more: messages.len() as i64 == limit,
            messages,
        })
    }

    pub async fn get_contacts(
        &self,
        session: &TelegramSession,
        query: &ContactsQuery,
    ) -> Result<ContactsResponse, TelegramError> {
        let limit = clamp_limit(query.limit, CONTACTS_DEFAULT_LIMIT, CONTACTS_MAX_LIMIT);
        let offset = clamp_offset(query.offset);
        let key = cache_keys::contacts(session.id);

        let (all, from_cache) = self
            .read_through(&key, query.refresh, self.ttl.contacts, || async {
                let client = self.open(session).await?;
                let page = client.call(client.client().get_contacts()).await;
                client.close().await;
                Ok(mapping::contacts_from_page(&page?))
            })
            .await?;

        let total_count = all.len();
        let (contacts, has_more) = paginate(&all, offset, limit);
        Ok(ContactsResponse {
            contacts,
            total_count,
            has_more,
            from_cache,
        })
    }

    /// Resolve a username (preferred) or phone number to a peer.
    pub async fn resolve(
        &self,
        session: &TelegramSession,
        request: &ResolveRequest,
    ) -> Result<Fetched<ResolvedPeer>, TelegramError> {
        let username = request
            .username
            .as_deref()
            .map(|u| u.trim().trim_start_matches('@'))
            .filter(|u| !u.is_empty());
        let phone = request
            .phone
            .as_deref()
            .map(str::trim)
            .filter(|p| !p.is_empty());
        let identifier = match (username, phone) {
            (Some(u), _) => u,
            (None, Some(p)) => p,
            (None, None) => {
                return Err(TelegramError::Validation(
                    "username or phone is required".into(),
                ));
            }
        };

        let key = cache_keys::resolve(session.id, identifier);
        let (data, from_cache) = self
            .read_through(&key, false, self.ttl.resolve, || async {
                let client = self.open(session).await?;
                let raw = match username {
                    Some(u) => client.call(client.client().resolve_username(u)).await,
                    None => client.call(client.client().resolve_phone(identifier)).await,
                };
                client.close().await;
                mapping::resolved_peer(&raw?)
                    .ok_or_else(|| TelegramError::PeerNotFound(identifier.to_string()))
            })
            .await?;
        Ok(Fetched { data, from_cache })
    }

    /// Drop cached data of a session.
    pub async fn invalidate(&self, session_id: DbId, kind: CacheKind) -> Result<(), TelegramError> {
        let mut keys = Vec::new();
        if matches!(kind, CacheKind::Contacts | CacheKind::All) {
            keys.push(cache_keys::contacts(session_id));
        }
        if matches!(kind, CacheKind::Chats | CacheKind::All) {
            keys.push(cache_keys::chats(session_id, true));
            keys.push(cache_keys::chats(session_id, false));
        }
        if kind == CacheKind::All {
            for pattern in [
                cache_keys::chat_info_pattern(session_id),
                cache_keys::resolve_pattern(session_id),
            ] {
                match self.cache.scan_keys(&pattern, SCAN_BATCH).await {
                    Ok(found) => keys.extend(found),
                    Err(e) => tracing::warn!(%pattern, error = %e, "Cache scan failed"),
                }
            }
        }

        self.cache.delete(&keys).await?;
        tracing::debug!(session_id = %session_id, ?kind, keys = keys.len(), "Cache invalidated");
        Ok(())
    }

    // ---- private helpers ----

    async fn open(&self, session: &TelegramSession) -> Result<ScopedClient, TelegramError> {
        self.connector.open(session, CancellationToken::new()).await
    }

    /// Serve `key` from the cache unless `refresh` is set; otherwise run
    /// `fetch` and store its result. Returns the value and whether it came
    /// from the cache.
    async fn read_through<T, F, Fut>(
        &self,
        key: &str,
        refresh: bool,
        ttl: Duration,
        fetch: F,
    ) -> Result<(T, bool), TelegramError>
    where
        T: Serialize + DeserializeOwned + Send + Sync,
        F: FnOnce() -> Fut,
        Fut: std::future::Future<Output = Result<T, TelegramError>>,
    {
        if !refresh {
            match self.cache.get_json::<T>(key).await {
                Ok(Some(cached)) => {
                    tracing::debug!(key, "Cache hit");
                    return Ok((cached, true));
                }
                Ok(None) => {}
                Err(e) => tracing::warn!(key, error = %e, "Cache read failed"),
            }
        }

        let fresh = fetch().await?;
        if let Err(e) = self.cache.set_json(key, &fresh, ttl).await {
            tracing::warn!(key, error = %e, "Cache write failed");
        }
        Ok((fresh, false))
    }
}

async fn fetch_chat(client: &ScopedClient, chat_id: i64) -> Result<Chat, TelegramError> {
    let not_found = || TelegramError::PeerNotFound(chat_id.to_string());
    match InputPeer::from_marked_id(chat_id) {
        InputPeer::User { id, .. } => {
            let users = client.call(client.client().get_users(&[id])).await?;
            users.first().map(mapping::chat_from_user).ok_or_else(not_found)
        }
        InputPeer::Channel { id, .. } => {
            let channels = client.call(client.client().get_channels(&[id])).await?;
            channels
                .first()
                .map(mapping::chat_from_channel)
                .ok_or_else(not_found)
        }
        InputPeer::Chat { .. } => Err(not_found()),
    }
}
