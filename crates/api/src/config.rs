use std::time::Duration;

use crate::auth::jwt::JwtConfig;

/// Server configuration loaded from environment variables.
///
/// All fields have sensible defaults suitable for local development.
/// In production, override via environment variables.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Bind address (default: `0.0.0.0`).
    pub host: String,
    /// Bind port (default: `3000`).
    pub port: u16,
    /// Allowed CORS origins, parsed from comma-separated `CORS_ORIGINS` env var.
    pub cors_origins: Vec<String>,
    /// HTTP request timeout in seconds (default: `30`).
    pub request_timeout_secs: u64,
    /// Budget for draining background work on shutdown (default: `5`).
    pub shutdown_timeout_secs: u64,
    /// Failed logins allowed per username within one window (default: `10`).
    pub login_rate_limit: u64,
    /// Length of the failed-login window.
    pub login_rate_window: Duration,
    /// JWT token configuration (secret, expiry durations).
    pub jwt: JwtConfig,
}

impl ServerConfig {
    /// Load configuration from environment variables with defaults.
    ///
    /// | Env Var                  | Default                    |
    /// |--------------------------|----------------------------|
    /// | `HOST`                   | `0.0.0.0`                  |
    /// | `PORT`                   | `3000`                     |
    /// | `CORS_ORIGINS`           | `http://localhost:5173`    |
    /// | `REQUEST_TIMEOUT_SECS`   | `30`                       |
    /// | `SHUTDOWN_TIMEOUT_SECS`  | `5`                        |
    /// | `LOGIN_RATE_LIMIT`       | `10`                       |
    /// | `LOGIN_RATE_WINDOW_SECS` | `900`                      |
    pub fn from_env() -> Self {
        let host = std::env::var("HOST").unwrap_or_else(|_| "0.0.0.0".into());

        let port: u16 = std::env::var("PORT")
            .unwrap_or_else(|_| "3000".into())
            .parse()
            .expect("PORT must be a valid u16");

        let cors_origins: Vec<String> = std::env::var("CORS_ORIGINS")
            .unwrap_or_else(|_| "http://localhost:5173".into())
            .split(',')
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect();

        let request_timeout_secs: u64 = std::env::var("REQUEST_TIMEOUT_SECS")
            .unwrap_or_else(|_| "30".into())
            .parse()
            .expect("REQUEST_TIMEOUT_SECS must be a valid u64");

        let shutdown_timeout_secs: u64 = std::env::var("SHUTDOWN_TIMEOUT_SECS")
            .unwrap_or_else(|_| "5".into())
            .parse()
            .expect("SHUTDOWN_TIMEOUT_SECS must be a valid u64");

        let login_rate_limit: u64 = std::env::var("LOGIN_RATE_LIMIT")
            .unwrap_or_else(|_| "10".into())
            .parse()
            .expect("LOGIN_RATE_LIMIT must be a valid u64");

        let login_rate_window_secs: u64 = std::env::var("LOGIN_RATE_WINDOW_SECS")
            .unwrap_or_else(|_| "900".into())
            .parse()
            .expect("LOGIN_RATE_WINDOW_SECS must be a valid u64");

        let jwt = JwtConfig::from_env();

        Self {
            host,
            port,
            cors_origins,
            request_timeout_secs,
            shutdown_timeout_secs,
            login_rate_limit,
            login_rate_window: Duration::from_secs(login_rate_window_secs),
            jwt,
        }
    }
}

/// Connection settings for the backing services.
///
/// Kept apart from [`ServerConfig`] because handlers never need them.
#[derive(Debug, Clone)]
pub struct InfraConfig {
    pub database_url: String,
    /// `None` selects the in-process cache.
    pub redis_url: Option<String>,
    pub redis_pool_size: u32,
    /// 64 hex characters.
    pub encryption_key: String,
}

impl InfraConfig {
    /// | Env Var           | Required | Default |
    /// |-------------------|----------|---------|
    /// | `DATABASE_URL`    | **yes**  | --      |
    /// | `REDIS_URL`       | no       | unset   |
    /// | `REDIS_POOL_SIZE` | no       | `16`    |
    /// | `ENCRYPTION_KEY`  | **yes**  | --      |
    ///
    /// # Panics
    ///
    /// Panics if a required variable is missing or `REDIS_POOL_SIZE` does
    /// not parse.
    pub fn from_env() -> Self {
        let database_url = std::env::var("DATABASE_URL").expect("DATABASE_URL must be set");
        let redis_url = std::env::var("REDIS_URL").ok().filter(|u| !u.trim().is_empty());
        let redis_pool_size: u32 = std::env::var("REDIS_POOL_SIZE")
            .unwrap_or_else(|_| "16".into())
            .parse()
            .expect("REDIS_POOL_SIZE must be a valid u32");
        let encryption_key =
            std::env::var("ENCRYPTION_KEY").expect("ENCRYPTION_KEY must be set in the environment");

        Self {
            database_url,
            redis_url,
            redis_pool_size,
            encryption_key,
        }
    }
}
