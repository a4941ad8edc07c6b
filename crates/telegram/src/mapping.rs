//! Shaping of raw protocol data into API types and event payloads.

use std::collections::HashMap;

use chrono::DateTime;
use tgw_core::events::{USER_OFFLINE, USER_ONLINE};
use tgw_core::types::Timestamp;

use crate::types::{
    Chat, ChatMessage, ChatType, Contact, MessageEventData, ResolvedPeer, UserStatusEventData,
};
use crate::upstream::{
    ContactsPage, DialogsPage, Entities, InputPeer, Peer, RawChannel, RawDialog, RawMedia,
    RawMessage, RawUser, RawUserStatus, ResolvedRaw,
};

/// Longest `last_message` preview, in characters.
pub const LAST_MESSAGE_PREVIEW: usize = 100;

/// Folder id of the archive.
const ARCHIVE_FOLDER: i32 = 1;

// ---------------------------------------------------------------------------
// Small helpers
// ---------------------------------------------------------------------------

pub fn unix_to_timestamp(secs: i64) -> Timestamp {
    DateTime::from_timestamp(secs, 0).unwrap_or_default()
}

fn non_empty(s: &str) -> Option<String> {
    (!s.is_empty()).then(|| s.to_string())
}

/// Cut `s` to `max` characters, ending in `...` when shortened.
pub fn truncate(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        return s.to_string();
    }
    let keep = max.saturating_sub(3);
    let mut out: String = s.chars().take(keep).collect();
    out.push_str("...");
    out
}

pub fn display_name(user: &RawUser) -> String {
    if user.last_name.is_empty() {
        user.first_name.clone()
    } else {
        format!("{} {}", user.first_name, user.last_name)
    }
}

pub fn channel_type(channel: &RawChannel) -> ChatType {
    if channel.broadcast {
        ChatType::Channel
    } else {
        ChatType::Supergroup
    }
}

pub fn chat_type_of(peer: Peer, entities: &Entities) -> ChatType {
    match peer {
        Peer::User(_) => ChatType::Private,
        Peer::Chat(_) => ChatType::Group,
        Peer::Channel(id) => entities
            .channels
            .get(&id)
            .map(channel_type)
            .unwrap_or(ChatType::Supergroup),
    }
}

pub fn media_kind(media: RawMedia) -> Option<&'static str> {
    match media {
        RawMedia::Photo => Some("photo"),
        RawMedia::Document => Some("document"),
        RawMedia::Geo => Some("location"),
        RawMedia::Contact => Some("contact"),
        RawMedia::Other => None,
    }
}

/// Status label and, for `offline`, the last-seen time.
pub fn user_status(status: &RawUserStatus) -> (&'static str, Option<Timestamp>) {
    match status {
        RawUserStatus::Online => ("online", None),
        RawUserStatus::Offline { was_online } => ("offline", Some(unix_to_timestamp(*was_online))),
        RawUserStatus::Recently => ("recently", None),
        RawUserStatus::LastWeek => ("last_week", None),
        RawUserStatus::LastMonth => ("last_month", None),
        RawUserStatus::Empty => ("unknown", None),
    }
}

// ---------------------------------------------------------------------------
// Messages
// ---------------------------------------------------------------------------

/// Author of a message: the explicit sender, or the peer of a private chat.
fn author(message: &RawMessage) -> Option<i64> {
    match (message.from, message.peer) {
        (Some(Peer::User(id)), _) => Some(id),
        (None, Peer::User(id)) => Some(id),
        _ => None,
    }
}

fn author_name(author: Option<i64>, entities: &Entities) -> Option<String> {
    author
        .and_then(|id| entities.users.get(&id))
        .map(display_name)
        .filter(|n| !n.is_empty())
}

/// One history entry. `chat_id` is the id the caller asked for.
pub fn chat_message(message: &RawMessage, entities: &Entities, chat_id: i64) -> ChatMessage {
    let from_id = author(message);
    ChatMessage {
        id: message.id,
        chat_id,
        from_id,
        from_name: author_name(from_id, entities),
        text: message.text.clone(),
        date: unix_to_timestamp(message.date),
        is_outgoing: message.out,
        is_read: false,
        reply_to_id: message.reply_to,
        media_type: message.media.and_then(media_kind).map(str::to_string),
        forward_from: message.forwarded.then(|| "forwarded".to_string()),
    }
}

pub fn message_event(message: &RawMessage, entities: &Entities) -> MessageEventData {
    let from_id = author(message);
    MessageEventData {
        message_id: message.id,
        chat_id: message.peer.marked_id(),
        chat_type: chat_type_of(message.peer, entities),
        from_id,
        from_name: author_name(from_id, entities),
        text: non_empty(&message.text),
        media_type: message.media.and_then(media_kind).map(str::to_string),
        reply_to_id: message.reply_to,
        date: unix_to_timestamp(message.date),
    }
}

/// Event type and payload for a status change. Only `online` and `offline`
/// produce events.
pub fn status_event(
    user_id: i64,
    status: &RawUserStatus,
) -> Option<(&'static str, UserStatusEventData)> {
    let event_type = match status {
        RawUserStatus::Online => USER_ONLINE,
        RawUserStatus::Offline { .. } => USER_OFFLINE,
        _ => return None,
    };
    let (label, last_seen) = user_status(status);
    Some((
        event_type,
        UserStatusEventData {
            user_id,
            username: None,
            status: label.to_string(),
            last_seen,
        },
    ))
}

// ---------------------------------------------------------------------------
// Dialogs, contacts, peers
// ---------------------------------------------------------------------------

fn chat_from_dialog(
    dialog: &RawDialog,
    entities: &Entities,
    top_messages: &HashMap<i32, &RawMessage>,
) -> Option<Chat> {
    let mut chat = match dialog.peer {
        Peer::User(id) => {
            let user = entities.users.get(&id)?;
            Chat {
                first_name: non_empty(&user.first_name),
                last_name: non_empty(&user.last_name),
                username: non_empty(&user.username),
                ..empty_chat(dialog.peer.marked_id(), ChatType::Private)
            }
        }
        Peer::Chat(id) => {
            let group = entities.chats.get(&id)?;
            Chat {
                title: non_empty(&group.title),
                ..empty_chat(dialog.peer.marked_id(), ChatType::Group)
            }
        }
        Peer::Channel(id) => {
            let channel = entities.channels.get(&id)?;
            Chat {
                title: non_empty(&channel.title),
                username: non_empty(&channel.username),
                ..empty_chat(dialog.peer.marked_id(), channel_type(channel))
            }
        }
    };

    chat.unread_count = dialog.unread_count;
    chat.is_pinned = dialog.pinned;
    chat.is_muted = dialog.muted;
    chat.is_archived = dialog.folder_id == ARCHIVE_FOLDER;

    if let Some(top) = top_messages.get(&dialog.top_message) {
        chat.last_message_id = Some(top.id);
        chat.last_message = Some(truncate(&top.text, LAST_MESSAGE_PREVIEW));
        chat.last_message_at = Some(unix_to_timestamp(top.date));
    }
    Some(chat)
}

fn empty_chat(id: i64, chat_type: ChatType) -> Chat {
    Chat {
        id,
        chat_type,
        title: None,
        username: None,
        first_name: None,
        last_name: None,
        unread_count: 0,
        last_message_id: None,
        last_message: None,
        last_message_at: None,
        is_pinned: false,
        is_muted: false,
        is_archived: false,
    }
}

/// Shape a dialogs page. Archived dialogs are dropped unless
/// `include_archived` is set. Dialogs whose peer entity is missing are
/// skipped.
pub fn chats_from_dialogs(page: &DialogsPage, include_archived: bool) -> Vec<Chat> {
    let top_messages: HashMap<i32, &RawMessage> =
        page.messages.iter().map(|m| (m.id, m)).collect();

    page.dialogs
        .iter()
        .filter_map(|d| chat_from_dialog(d, &page.entities, &top_messages))
        .filter(|c| include_archived || !c.is_archived)
        .collect()
}

pub fn chat_from_user(user: &RawUser) -> Chat {
    Chat {
        first_name: non_empty(&user.first_name),
        last_name: non_empty(&user.last_name),
        username: non_empty(&user.username),
        ..empty_chat(user.id, ChatType::Private)
    }
}

pub fn chat_from_channel(channel: &RawChannel) -> Chat {
    Chat {
        title: non_empty(&channel.title),
        username: non_empty(&channel.username),
        ..empty_chat(Peer::Channel(channel.id).marked_id(), channel_type(channel))
    }
}

pub fn contacts_from_page(page: &ContactsPage) -> Vec<Contact> {
    page.contacts
        .iter()
        .filter_map(|c| {
            let user = page.entities.users.get(&c.user_id)?;
            let (status, last_seen_at) = match &user.status {
                Some(s) => {
                    let (label, seen) = user_status(s);
                    (Some(label.to_string()), seen)
                }
                None => (None, None),
            };
            Some(Contact {
                id: user.id,
                phone: non_empty(&user.phone),
                first_name: user.first_name.clone(),
                last_name: non_empty(&user.last_name),
                username: non_empty(&user.username),
                is_mutual: c.mutual,
                is_blocked: false,
                status,
                last_seen_at,
            })
        })
        .collect()
}

pub fn resolved_peer(raw: &ResolvedRaw) -> Option<ResolvedPeer> {
    match raw.peer {
        Peer::User(id) => {
            let user = raw.entities.users.get(&id)?;
            Some(ResolvedPeer {
                id: user.id,
                peer_type: ChatType::Private,
                username: non_empty(&user.username),
                first_name: non_empty(&user.first_name),
                last_name: non_empty(&user.last_name),
                title: None,
                phone: non_empty(&user.phone),
                is_bot: user.bot,
                is_verified: user.verified,
            })
        }
        Peer::Channel(id) => {
            let channel = raw.entities.channels.get(&id)?;
            Some(ResolvedPeer {
                id: raw.peer.marked_id(),
                peer_type: channel_type(channel),
                username: non_empty(&channel.username),
                first_name: None,
                last_name: None,
                title: non_empty(&channel.title),
                phone: None,
                is_bot: false,
                is_verified: channel.verified,
            })
        }
        Peer::Chat(_) => None,
    }
}

/// Addressable peer for a resolve result, carrying its access hash.
pub fn input_peer(raw: &ResolvedRaw) -> Option<InputPeer> {
    match raw.peer {
        Peer::User(id) => raw.entities.users.get(&id).map(|u| InputPeer::User {
            id,
            access_hash: u.access_hash,
        }),
        Peer::Channel(id) => raw.entities.channels.get(&id).map(|c| InputPeer::Channel {
            id,
            access_hash: c.access_hash,
        }),
        Peer::Chat(id) => Some(InputPeer::Chat { id }),
    }
}
