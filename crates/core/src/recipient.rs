//! Recipient string parsing.
//!
//! Callers address a message with a single string. It is classified as:
//!
//! | Form                        | Meaning                                  |
//! |-----------------------------|------------------------------------------|
//! | `@name`                     | username, resolved upstream              |
//! | `+15551234567`              | phone number, imported as a contact      |
//! | positive integer            | user id                                  |
//! | negative, magnitude > 10^12 | channel / supergroup (offset removed)    |
//! | other negative integer      | basic group chat id                      |
//!
//! Anything else is rejected before any upstream call is made.

use crate::error::CoreError;

/// Offset between bot-API style channel ids and raw channel ids.
pub const CHANNEL_ID_OFFSET: i64 = 1_000_000_000_000;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Recipient {
    Username(String),
    Phone(String),
    UserId(i64),
    ChatId(i64),
    ChannelId(i64),
}

impl Recipient {
    pub fn parse(raw: &str) -> Result<Self, CoreError> {
        let s = raw.trim();

        if let Some(name) = s.strip_prefix('@') {
            if name.is_empty() || name.contains(char::is_whitespace) {
                return Err(invalid(raw));
            }
            return Ok(Self::Username(name.to_string()));
        }

        if let Some(digits) = s.strip_prefix('+') {
            if digits.is_empty() || !digits.chars().all(|c| c.is_ascii_digit()) {
                return Err(invalid(raw));
            }
            return Ok(Self::Phone(s.to_string()));
        }

        let id: i64 = s.parse().map_err(|_| invalid(raw))?;
        match id {
            0 => Err(invalid(raw)),
            id if id > 0 => Ok(Self::UserId(id)),
            id => {
                let chat_id = id.checked_neg().ok_or_else(|| invalid(raw))?;
                if chat_id > CHANNEL_ID_OFFSET {
                    Ok(Self::ChannelId(chat_id - CHANNEL_ID_OFFSET))
                } else {
                    Ok(Self::ChatId(chat_id))
                }
            }
        }
    }
}

fn invalid(raw: &str) -> CoreError {
    CoreError::Validation(format!(
        "invalid recipient {raw:?}: use @username, +phone, or numeric ID"
    ))
}
