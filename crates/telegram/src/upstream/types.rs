//! Raw protocol shapes exchanged with an [`UpstreamClient`](super::UpstreamClient).
//!
//! These mirror what the protocol returns, before any shaping into API
//! types. All shaping lives in [`crate::mapping`].

use std::collections::HashMap;
use std::path::PathBuf;

use tgw_core::messages::MessageType;
use tgw_core::recipient::CHANNEL_ID_OFFSET;

// ---------------------------------------------------------------------------
// Peers and entities
// ---------------------------------------------------------------------------

/// A conversation partner as the protocol identifies it: raw, unmarked ids.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Peer {
    User(i64),
    Chat(i64),
    Channel(i64),
}

impl Peer {
    /// Bot-API style id: users positive, basic groups negated, channels
    /// negated with the channel offset added.
    pub fn marked_id(self) -> i64 {
        match self {
            Peer::User(id) => id,
            Peer::Chat(id) => -id,
            Peer::Channel(id) => -(CHANNEL_ID_OFFSET + id),
        }
    }
}

/// Addressable peer for requests. `access_hash` is 0 when unknown.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputPeer {
    User { id: i64, access_hash: i64 },
    Chat { id: i64 },
    Channel { id: i64, access_hash: i64 },
}

impl InputPeer {
    /// Inverse of [`Peer::marked_id`], with unknown access hashes.
    pub fn from_marked_id(id: i64) -> Self {
        if id > 0 {
            return InputPeer::User { id, access_hash: 0 };
        }
        let raw = id.saturating_neg();
        if raw > CHANNEL_ID_OFFSET {
            InputPeer::Channel {
                id: raw - CHANNEL_ID_OFFSET,
                access_hash: 0,
            }
        } else {
            InputPeer::Chat { id: raw }
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RawUserStatus {
    Empty,
    Online,
    /// Unix seconds of the last time the user was seen.
    Offline { was_online: i64 },
    Recently,
    LastWeek,
    LastMonth,
}

#[derive(Debug, Clone, Default)]
pub struct RawUser {
    pub id: i64,
    pub access_hash: i64,
    pub first_name: String,
    pub last_name: String,
    pub username: String,
    pub phone: String,
    pub bot: bool,
    pub verified: bool,
    pub status: Option<RawUserStatus>,
}

/// A basic group.
#[derive(Debug, Clone, Default)]
pub struct RawChat {
    pub id: i64,
    pub title: String,
}

/// A channel or supergroup; `broadcast` distinguishes the two.
#[derive(Debug, Clone, Default)]
pub struct RawChannel {
    pub id: i64,
    pub access_hash: i64,
    pub title: String,
    pub username: String,
    pub broadcast: bool,
    pub verified: bool,
}

/// Entities referenced by a response, keyed by raw id.
#[derive(Debug, Clone, Default)]
pub struct Entities {
    pub users: HashMap<i64, RawUser>,
    pub chats: HashMap<i64, RawChat>,
    pub channels: HashMap<i64, RawChannel>,
}

impl Entities {
    pub fn with_users(users: impl IntoIterator<Item = RawUser>) -> Self {
        Self {
            users: users.into_iter().map(|u| (u.id, u)).collect(),
            ..Self::default()
        }
    }

    pub fn add_user(&mut self, user: RawUser) {
        self.users.insert(user.id, user);
    }

    pub fn add_chat(&mut self, chat: RawChat) {
        self.chats.insert(chat.id, chat);
    }

    pub fn add_channel(&mut self, channel: RawChannel) {
        self.channels.insert(channel.id, channel);
    }
}

// ---------------------------------------------------------------------------
// Messages and dialogs
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RawMedia {
    Photo,
    Document,
    Geo,
    Contact,
    Other,
}

#[derive(Debug, Clone)]
pub struct RawMessage {
    pub id: i32,
    /// Conversation the message belongs to.
    pub peer: Peer,
    /// Author, absent for channel posts.
    pub from: Option<Peer>,
    pub text: String,
    /// Unix seconds.
    pub date: i64,
    pub out: bool,
    pub reply_to: Option<i32>,
    pub media: Option<RawMedia>,
    pub forwarded: bool,
}

#[derive(Debug, Clone)]
pub struct RawDialog {
    pub peer: Peer,
    pub top_message: i32,
    pub unread_count: i32,
    pub pinned: bool,
    pub muted: bool,
    /// `1` is the archive folder.
    pub folder_id: i32,
}

#[derive(Debug, Clone, Default)]
pub struct DialogsPage {
    pub dialogs: Vec<RawDialog>,
    pub messages: Vec<RawMessage>,
    pub entities: Entities,
}

/// Filter for a history request. Zero means "unset".
#[derive(Debug, Clone, Copy, Default)]
pub struct HistoryQuery {
    pub limit: i32,
    pub offset_id: i32,
    pub offset_date: i32,
}

#[derive(Debug, Clone, Default)]
pub struct HistoryPage {
    pub messages: Vec<RawMessage>,
    pub entities: Entities,
}

#[derive(Debug, Clone)]
pub struct RawContact {
    pub user_id: i64,
    pub mutual: bool,
}

#[derive(Debug, Clone, Default)]
pub struct ContactsPage {
    pub contacts: Vec<RawContact>,
    pub entities: Entities,
}

/// Result of resolving a username or phone number.
#[derive(Debug, Clone)]
pub struct ResolvedRaw {
    pub peer: Peer,
    pub entities: Entities,
}

// ---------------------------------------------------------------------------
// Login
// ---------------------------------------------------------------------------

/// Response of a login-token export or import.
#[derive(Debug, Clone)]
pub enum LoginToken {
    /// Not yet scanned. `expires` is in Unix seconds.
    Token { token: Vec<u8>, expires: i64 },
    /// The login completed; the client is now authorised as `user`.
    Success { user: RawUser },
    /// The token was accepted on another data center.
    MigrateTo { dc_id: i32, token: Vec<u8> },
}

// ---------------------------------------------------------------------------
// Outgoing media and updates
// ---------------------------------------------------------------------------

/// A downloaded file ready to be uploaded and sent.
#[derive(Debug, Clone)]
pub struct OutgoingMedia {
    pub kind: MessageType,
    pub path: PathBuf,
    pub file_name: String,
    pub mime_type: Option<&'static str>,
    pub caption: String,
}

/// An update pushed by the upstream while a client is streaming.
#[derive(Debug, Clone)]
pub enum Update {
    NewMessage {
        message: RawMessage,
        entities: Entities,
    },
    EditMessage {
        message: RawMessage,
        entities: Entities,
    },
    UserTyping {
        user_id: i64,
    },
    UserStatus {
        user_id: i64,
        status: RawUserStatus,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn marked_ids_round_trip_through_input_peers() {
        assert_eq!(Peer::User(7).marked_id(), 7);
        assert_eq!(Peer::Chat(42).marked_id(), -42);
        assert_eq!(Peer::Channel(1234567890).marked_id(), -1001234567890);

        assert_eq!(
            InputPeer::from_marked_id(-1001234567890),
            InputPeer::Channel {
                id: 1234567890,
                access_hash: 0
            }
        );
        assert_eq!(InputPeer::from_marked_id(-42), InputPeer::Chat { id: 42 });
        assert_eq!(
            InputPeer::from_marked_id(7),
            InputPeer::User {
                id: 7,
                access_hash: 0
            }
        );
    }
}
