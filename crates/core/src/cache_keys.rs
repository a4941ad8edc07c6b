//! Key builders for the key/value cache.
//!
//! All keys live in a flat namespace; the `tg:` prefix groups gateway data
//! and `rate:` groups throttling counters.

use std::fmt::Display;

use crate::types::DbId;

/// Phone-code-hash from an SMS login start.
pub fn phone_code(session_id: DbId) -> String {
    format!("tg:code:{session_id}")
}

pub fn message_job(job_id: impl Display) -> String {
    format!("tg:msg:job:{job_id}")
}

pub fn contacts(session_id: DbId) -> String {
    format!("tg:contacts:{session_id}")
}

pub fn chats(session_id: DbId, archived: bool) -> String {
    format!("tg:chats:{session_id}:archived_{archived}")
}

pub fn chat_info(session_id: DbId, chat_id: i64) -> String {
    format!("tg:chat:{session_id}:{chat_id}")
}

/// Pattern matching every chat-info key of a session.
pub fn chat_info_pattern(session_id: DbId) -> String {
    format!("tg:chat:{session_id}:*")
}

pub fn resolve(session_id: DbId, identifier: &str) -> String {
    format!("tg:resolve:{session_id}:{identifier}")
}

pub fn resolve_pattern(session_id: DbId) -> String {
    format!("tg:resolve:{session_id}:*")
}

/// Failed-login counter for a username.
pub fn login_rate(username: &str) -> String {
    format!("rate:login:{}", username.to_lowercase())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn keys_embed_session_and_variant() {
        let id = DbId::nil();
        assert_eq!(
            chats(id, true),
            "tg:chats:00000000-0000-0000-0000-000000000000:archived_true"
        );
        assert_eq!(
            chat_info(id, -42),
            "tg:chat:00000000-0000-0000-0000-000000000000:-42"
        );
        assert_eq!(
            resolve(id, "@ada"),
            "tg:resolve:00000000-0000-0000-0000-000000000000:@ada"
        );
    }

    #[test]
    fn patterns_cover_their_keys() {
        let id = DbId::nil();
        let pattern = chat_info_pattern(id);
        let prefix = pattern.trim_end_matches('*');
        assert!(chat_info(id, 5).starts_with(prefix));
        assert!(resolve(id, "x").starts_with(resolve_pattern(id).trim_end_matches('*')));
    }

    #[test]
    fn login_rate_is_case_insensitive() {
        assert_eq!(login_rate("Ada"), login_rate("ada"));
    }
}
