//! Webhook event type names and allow-list matching.

pub const MESSAGE_NEW: &str = "message.new";
pub const MESSAGE_EDIT: &str = "message.edit";
pub const MESSAGE_DELETE: &str = "message.delete";
pub const USER_ONLINE: &str = "user.online";
pub const USER_OFFLINE: &str = "user.offline";
pub const USER_TYPING: &str = "user.typing";
pub const CHAT_ACTION: &str = "chat.action";
pub const SESSION_STARTED: &str = "session.started";
pub const SESSION_STOPPED: &str = "session.stopped";
pub const SESSION_ERROR: &str = "session.error";

/// Allow-list entry that matches every event type.
pub const WILDCARD: &str = "*";

/// Every event type a webhook may subscribe to.
pub const ALL_EVENT_TYPES: &[&str] = &[
    MESSAGE_NEW,
    MESSAGE_EDIT,
    MESSAGE_DELETE,
    USER_ONLINE,
    USER_OFFLINE,
    USER_TYPING,
    CHAT_ACTION,
    SESSION_STARTED,
    SESSION_STOPPED,
    SESSION_ERROR,
];

/// Whether `event_type` passes a webhook's allow-list.
///
/// An empty list, or one containing `*`, accepts everything.
pub fn is_event_allowed(allow_list: &[String], event_type: &str) -> bool {
    allow_list.is_empty()
        || allow_list
            .iter()
            .any(|e| e == WILDCARD || e == event_type)
}

/// Return the first allow-list entry that is neither a known event type nor `*`.
pub fn first_unknown_event(allow_list: &[String]) -> Option<&str> {
    allow_list
        .iter()
        .map(String::as_str)
        .find(|e| *e != WILDCARD && !ALL_EVENT_TYPES.contains(e))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn list(items: &[&str]) -> Vec<String> {
        items.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn empty_list_allows_everything() {
        assert!(is_event_allowed(&[], MESSAGE_NEW));
        assert!(is_event_allowed(&[], USER_TYPING));
    }

    #[test]
    fn wildcard_allows_everything() {
        let allow = list(&["*"]);
        assert!(is_event_allowed(&allow, SESSION_ERROR));
    }

    #[test]
    fn explicit_list_filters() {
        let allow = list(&["message.new"]);
        assert!(is_event_allowed(&allow, MESSAGE_NEW));
        assert!(!is_event_allowed(&allow, USER_TYPING));
    }

    #[test]
    fn unknown_entries_are_reported() {
        assert_eq!(first_unknown_event(&list(&["message.new", "*"])), None);
        assert_eq!(
            first_unknown_event(&list(&["message.new", "message.created"])),
            Some("message.created")
        );
    }
}
