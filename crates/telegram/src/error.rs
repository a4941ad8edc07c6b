//! Error kinds surfaced by the session lifecycle core.

use tgw_core::crypto::CryptoError;

use crate::cache::CacheError;
use crate::upstream::UpstreamError;

#[derive(Debug, thiserror::Error)]
pub enum TelegramError {
    #[error("session not found")]
    SessionNotFound,

    #[error("session is not active")]
    SessionNotActive,

    #[error("session belongs to another user")]
    Unauthorized,

    #[error("a session for this phone number already exists")]
    SessionAlreadyExists,

    #[error("phone number is required")]
    InvalidPhoneNumber,

    #[error("invalid verification code")]
    InvalidCode,

    #[error("verification code expired, request a new one")]
    CodeExpired,

    #[error("two-factor password required")]
    PasswordRequired,

    #[error("QR login expired: {0}")]
    QrExpired(String),

    #[error("upstream rejected the request: {0}")]
    UpstreamRejected(String),

    #[error("{0}")]
    InvalidRecipient(String),

    #[error("peer not found: {0}")]
    PeerNotFound(String),

    #[error("stored credentials could not be decrypted")]
    BadCiphertext,

    #[error("no webhook configured for this session")]
    WebhookNotConfigured,

    #[error("invalid cache type: {0}")]
    InvalidKind(String),

    #[error("message job not found")]
    JobNotFound,

    #[error("media download failed: {0}")]
    MediaDownload(String),

    #[error("{0}")]
    Validation(String),

    #[error("timed out: {0}")]
    Timeout(String),

    #[error("store error: {0}")]
    Store(#[from] sqlx::Error),

    #[error("cache error: {0}")]
    Cache(#[from] CacheError),

    #[error("internal error: {0}")]
    Internal(String),
}

impl From<CryptoError> for TelegramError {
    fn from(e: CryptoError) -> Self {
        match e {
            CryptoError::BadCiphertext => TelegramError::BadCiphertext,
            other => TelegramError::Internal(other.to_string()),
        }
    }
}

impl From<UpstreamError> for TelegramError {
    fn from(e: UpstreamError) -> Self {
        match e {
            UpstreamError::InvalidCode => TelegramError::InvalidCode,
            UpstreamError::CodeExpired => TelegramError::CodeExpired,
            UpstreamError::PasswordRequired => TelegramError::PasswordRequired,
            UpstreamError::NotFound(what) => TelegramError::PeerNotFound(what),
            UpstreamError::Cancelled => TelegramError::Timeout("upstream operation cancelled".into()),
            other => TelegramError::UpstreamRejected(other.to_string()),
        }
    }
}

impl TelegramError {
    /// Whether the failure came from a cancelled run context rather than the
    /// operation itself.
    pub fn is_cancellation(&self) -> bool {
        matches!(self, TelegramError::Timeout(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;

    #[test]
    fn upstream_login_failures_keep_their_kind() {
        assert_matches!(
            TelegramError::from(UpstreamError::InvalidCode),
            TelegramError::InvalidCode
        );
        assert_matches!(
            TelegramError::from(UpstreamError::PasswordRequired),
            TelegramError::PasswordRequired
        );
        assert_matches!(
            TelegramError::from(UpstreamError::FloodWait(30)),
            TelegramError::UpstreamRejected(msg) if msg.contains("30")
        );
    }

    #[test]
    fn bad_ciphertext_is_not_internal() {
        assert_matches!(
            TelegramError::from(CryptoError::BadCiphertext),
            TelegramError::BadCiphertext
        );
        assert_matches!(
            TelegramError::from(CryptoError::SealFailed),
            TelegramError::Internal(_)
        );
    }
}
