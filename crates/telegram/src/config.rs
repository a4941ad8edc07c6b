//! Tunables for logins, cache lifetimes, and the message job queue.

use std::time::Duration;

/// Per-operation TTLs of the read-through cache.
#[derive(Debug, Clone)]
pub struct CacheTtls {
    pub contacts: Duration,
    pub chats: Duration,
    pub chat_info: Duration,
    pub resolve: Duration,
}

impl Default for CacheTtls {
    fn default() -> Self {
        Self {
            contacts: Duration::from_secs(300),
            chats: Duration::from_secs(120),
            chat_info: Duration::from_secs(300),
            resolve: Duration::from_secs(600),
        }
    }
}

/// Configuration for the session lifecycle core.
#[derive(Debug, Clone)]
pub struct TelegramConfig {
    /// Number of QR tokens issued before a QR login gives up (default: 3).
    pub qr_max_attempts: u32,
    /// Lifetime of one QR token (default: 120 s).
    pub qr_timeout: Duration,
    /// Interval between login-token polls (default: 2 s).
    pub qr_poll_interval: Duration,
    /// How long a QR start waits for the first token before failing.
    pub qr_first_token_timeout: Duration,
    /// Lifetime of a cached phone-code-hash.
    pub code_ttl: Duration,
    pub cache_ttl: CacheTtls,
    /// Retention of message jobs in the cache (default: 24 h).
    pub job_ttl: Duration,
    /// Wall-clock budget for executing one message job.
    pub job_execution_budget: Duration,
    /// Floor for the per-recipient spacing of bulk sends (default: 0).
    pub bulk_min_spacing: Duration,
    /// Budget for the best-effort upstream logout on session delete.
    pub logout_budget: Duration,
}

impl Default for TelegramConfig {
    fn default() -> Self {
        Self {
            qr_max_attempts: 3,
            qr_timeout: Duration::from_secs(120),
            qr_poll_interval: Duration::from_millis(2000),
            qr_first_token_timeout: Duration::from_secs(15),
            code_ttl: Duration::from_secs(300),
            cache_ttl: CacheTtls::default(),
            job_ttl: Duration::from_secs(86_400),
            job_execution_budget: Duration::from_secs(60),
            bulk_min_spacing: Duration::ZERO,
            logout_budget: Duration::from_secs(10),
        }
    }
}

impl TelegramConfig {
    /// Load configuration from environment variables with defaults.
    ///
    /// | Env Var               | Default |
    /// |-----------------------|---------|
    /// | `QR_MAX_ATTEMPTS`     | `3`     |
    /// | `QR_TIMEOUT_SECS`     | `120`   |
    /// | `QR_POLL_INTERVAL_MS` | `2000`  |
    /// | `CACHE_CONTACTS_TTL`  | `300`   |
    /// | `CACHE_CHATS_TTL`     | `120`   |
    /// | `CACHE_CHAT_INFO_TTL` | `300`   |
    /// | `CACHE_RESOLVE_TTL`   | `600`   |
    /// | `MESSAGE_JOB_TTL_SECS`| `86400` |
    /// | `BULK_MIN_SPACING_MS` | `0`     |
    ///
    /// # Panics
    ///
    /// Panics if a variable is set to something that does not parse, or if
    /// `QR_MAX_ATTEMPTS` is zero.
    pub fn from_env() -> Self {
        let defaults = Self::default();

        let qr_max_attempts: u32 = env_parse("QR_MAX_ATTEMPTS", defaults.qr_max_attempts);
        assert!(qr_max_attempts > 0, "QR_MAX_ATTEMPTS must be at least 1");

        Self {
            qr_max_attempts,
            qr_timeout: Duration::from_secs(env_parse("QR_TIMEOUT_SECS", 120)),
            qr_poll_interval: Duration::from_millis(env_parse("QR_POLL_INTERVAL_MS", 2000)),
            cache_ttl: CacheTtls {
                contacts: Duration::from_secs(env_parse("CACHE_CONTACTS_TTL", 300)),
                chats: Duration::from_secs(env_parse("CACHE_CHATS_TTL", 120)),
                chat_info: Duration::from_secs(env_parse("CACHE_CHAT_INFO_TTL", 300)),
                resolve: Duration::from_secs(env_parse("CACHE_RESOLVE_TTL", 600)),
            },
            job_ttl: Duration::from_secs(env_parse("MESSAGE_JOB_TTL_SECS", 86_400)),
            bulk_min_spacing: Duration::from_millis(env_parse("BULK_MIN_SPACING_MS", 0)),
            ..defaults
        }
    }
}

fn env_parse<T>(name: &str, default: T) -> T
where
    T: std::str::FromStr + ToString,
{
    std::env::var(name)
        .unwrap_or_else(|_| default.to_string())
        .parse()
        .unwrap_or_else(|_| panic!("{name} must be a valid number"))
}
