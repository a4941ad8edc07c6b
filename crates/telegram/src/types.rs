//! API-facing shapes for chats, contacts, messages, and webhook event data.
//!
//! Chat ids are bot-API style: users positive, basic groups negative, and
//! channels/supergroups negative with the 10^12 offset applied.

use serde::{Deserialize, Serialize};
use tgw_core::types::{DbId, Timestamp};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChatType {
    Private,
    Group,
    Supergroup,
    Channel,
}

// ---------------------------------------------------------------------------
// Chats, contacts, messages
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Chat {
    pub id: i64,
    #[serde(rename = "type")]
    pub chat_type: ChatType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub first_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_name: Option<String>,
    #[serde(default)]
    pub unread_count: i32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_message_id: Option<i32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_message: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_message_at: Option<Timestamp>,
    #[serde(default)]
    pub is_pinned: bool,
    #[serde(default)]
    pub is_muted: bool,
    #[serde(default)]
    pub is_archived: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Contact {
    pub id: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
    pub first_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,
    pub is_mutual: bool,
    #[serde(default)]
    pub is_blocked: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_seen_at: Option<Timestamp>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub id: i32,
    pub chat_id: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub from_id: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub from_name: Option<String>,
    pub text: String,
    pub date: Timestamp,
    pub is_outgoing: bool,
    #[serde(default)]
    pub is_read: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reply_to_id: Option<i32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub media_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub forward_from: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResolvedPeer {
    pub id: i64,
    #[serde(rename = "type")]
    pub peer_type: ChatType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub first_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
    #[serde(default)]
    pub is_bot: bool,
    #[serde(default)]
    pub is_verified: bool,
}

// ---------------------------------------------------------------------------
// Responses
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize)]
pub struct ChatsResponse {
    pub chats: Vec<Chat>,
    pub total_count: usize,
    pub has_more: bool,
    pub from_cache: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct ContactsResponse {
    pub contacts: Vec<Contact>,
    pub total_count: usize,
    pub has_more: bool,
    pub from_cache: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct HistoryResponse {
    pub messages: Vec<ChatMessage>,
    pub total_count: usize,
    pub has_more: bool,
}

/// A single cached lookup result with its provenance.
#[derive(Debug, Clone, Serialize)]
pub struct Fetched<T> {
    #[serde(flatten)]
    pub data: T,
    pub from_cache: bool,
}

// ---------------------------------------------------------------------------
// Queries
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ChatsQuery {
    pub limit: Option<i64>,
    pub offset: Option<i64>,
    #[serde(default)]
    pub archived: bool,
    #[serde(default)]
    pub refresh: bool,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ContactsQuery {
    pub limit: Option<i64>,
    pub offset: Option<i64>,
    #[serde(default)]
    pub refresh: bool,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct HistoryParams {
    pub limit: Option<i64>,
    pub offset_id: Option<i32>,
    pub offset_date: Option<i32>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ResolveRequest {
    pub username: Option<String>,
    pub phone: Option<String>,
}

// ---------------------------------------------------------------------------
// Webhook event data
// ---------------------------------------------------------------------------

/// Payload of `message.new` and `message.edit`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MessageEventData {
    pub message_id: i32,
    pub chat_id: i64,
    pub chat_type: ChatType,
    pub from_id: Option<i64>,
    pub from_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub media_type: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reply_to_id: Option<i32>,
    pub date: Timestamp,
}

/// Payload of `user.online` and `user.offline`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct UserStatusEventData {
    pub user_id: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,
    pub status: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_seen: Option<Timestamp>,
}

/// Payload of `user.typing`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TypingEventData {
    pub chat_id: i64,
    pub user_id: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,
    pub action: String,
}

/// Payload of `session.started`, `session.stopped`, and `session.error`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SessionEventData {
    pub session_id: DbId,
    pub session_name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub telegram_id: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}
