//! Outbound message kinds and the job status state machine.

use serde::{Deserialize, Serialize};

/// Longest delay a send request may ask for (24 h).
pub const MAX_SEND_DELAY_MS: u64 = 86_400_000;

/// Kind of payload an outbound message carries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum MessageType {
    #[default]
    Text,
    Photo,
    Video,
    Audio,
    File,
}

impl MessageType {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Text => "text",
            Self::Photo => "photo",
            Self::Video => "video",
            Self::Audio => "audio",
            Self::File => "file",
        }
    }

    pub fn is_media(self) -> bool {
        !matches!(self, Self::Text)
    }
}

/// Lifecycle of a message job.
///
/// Allowed transitions form a DAG:
///
/// ```text
/// pending ──────────────┐
///                       ▼
/// scheduled ──────► sending ──► sent
///                       │
///     (any non-terminal) └──► failed
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MessageStatus {
    Pending,
    Scheduled,
    Sending,
    Sent,
    Failed,
}

impl MessageStatus {
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Sent | Self::Failed)
    }

    /// Whether a job in `self` may move to `next`.
    pub fn can_transition_to(self, next: MessageStatus) -> bool {
        use MessageStatus::*;
        matches!(
            (self, next),
            (Pending, Sending)
                | (Scheduled, Sending)
                | (Sending, Sent)
                | (Pending, Failed)
                | (Scheduled, Failed)
                | (Sending, Failed)
        )
    }
}

#[cfg(test)]
mod tests {
    use super::MessageStatus::*;
    use super::*;

    #[test]
    fn forward_path_is_allowed() {
        assert!(Pending.can_transition_to(Sending));
        assert!(Scheduled.can_transition_to(Sending));
        assert!(Sending.can_transition_to(Sent));
        assert!(Sending.can_transition_to(Failed));
        assert!(Scheduled.can_transition_to(Failed));
    }

    #[test]
    fn terminal_states_never_revive() {
        for next in [Pending, Scheduled, Sending, Sent, Failed] {
            assert!(!Sent.can_transition_to(next));
            assert!(!Failed.can_transition_to(next));
        }
    }

    #[test]
    fn no_backward_or_skipping_moves() {
        assert!(!Sending.can_transition_to(Pending));
        assert!(!Sending.can_transition_to(Scheduled));
        assert!(!Pending.can_transition_to(Scheduled));
        assert!(!Pending.can_transition_to(Sent));
        assert!(!Scheduled.can_transition_to(Sent));
    }

    #[test]
    fn serializes_lowercase() {
        assert_eq!(serde_json::to_string(&Scheduled).unwrap(), "\"scheduled\"");
        assert_eq!(serde_json::to_string(&MessageType::File).unwrap(), "\"file\"");
        assert!(MessageType::Photo.is_media());
        assert!(!MessageType::default().is_media());
    }
}
