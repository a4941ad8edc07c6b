use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde_json::json;
use tgw_core::error::CoreError;
use tgw_telegram::TelegramError;

/// Application-level error type for HTTP handlers.
///
/// Wraps [`CoreError`] and [`TelegramError`] for domain errors and adds
/// HTTP-specific variants. Implements [`IntoResponse`] to produce consistent
/// JSON error responses.
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    /// A domain-level error from `tgw_core`.
    #[error(transparent)]
    Core(#[from] CoreError),

    /// A failure of the session lifecycle core.
    #[error(transparent)]
    Telegram(#[from] TelegramError),

    /// A database error from sqlx.
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Request body failed its declared constraints.
    #[error("Validation failed: {0}")]
    Validation(#[from] validator::ValidationErrors),

    /// A bad request with a human-readable message.
    #[error("Bad request: {0}")]
    BadRequest(String),

    /// An internal error with a human-readable message.
    #[error("Internal error: {0}")]
    InternalError(String),
}

/// Convenience type alias for handler return values.
pub type AppResult<T> = Result<T, AppError>;

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, code, message) = match &self {
            // --- CoreError variants ---
            AppError::Core(core) => match core {
                CoreError::NotFound { entity, id } => (
                    StatusCode::NOT_FOUND,
                    "NOT_FOUND",
                    format!("{entity} with id {id} not found"),
                ),
                CoreError::Validation(msg) => {
                    (StatusCode::BAD_REQUEST, "VALIDATION_ERROR", msg.clone())
                }
                CoreError::Conflict(msg) => (StatusCode::CONFLICT, "CONFLICT", msg.clone()),
                CoreError::Unauthorized(msg) => {
                    (StatusCode::UNAUTHORIZED, "UNAUTHORIZED", msg.clone())
                }
                CoreError::Forbidden(msg) => (StatusCode::FORBIDDEN, "FORBIDDEN", msg.clone()),
                CoreError::TooManyRequests(msg) => {
                    (StatusCode::TOO_MANY_REQUESTS, "RATE_LIMITED", msg.clone())
                }
                CoreError::Internal(msg) => {
                    tracing::error!(error = %msg, "Internal core error");
                    internal()
                }
            },

            AppError::Telegram(err) => classify_telegram_error(err),

            // --- Database errors ---
            AppError::Database(err) => classify_sqlx_error(err),

            // --- HTTP-specific errors ---
            AppError::Validation(errors) => (
                StatusCode::BAD_REQUEST,
                "VALIDATION_ERROR",
                errors.to_string(),
            ),
            AppError::BadRequest(msg) => (StatusCode::BAD_REQUEST, "BAD_REQUEST", msg.clone()),
            AppError::InternalError(msg) => {
                tracing::error!(error = %msg, "Internal error");
                internal()
            }
        };

        let body = json!({
            "error": message,
            "code": code,
        });

        (status, axum::Json(body)).into_response()
    }
}

fn internal() -> (StatusCode, &'static str, String) {
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        "INTERNAL_ERROR",
        "An internal error occurred".to_string(),
    )
}

/// Map a session-core failure onto an HTTP status and error code.
fn classify_telegram_error(err: &TelegramError) -> (StatusCode, &'static str, String) {
    let message = err.to_string();
    match err {
        TelegramError::SessionNotFound => (StatusCode::NOT_FOUND, "SESSION_NOT_FOUND", message),
        TelegramError::SessionNotActive => {
            (StatusCode::BAD_REQUEST, "SESSION_NOT_ACTIVE", message)
        }
        TelegramError::Unauthorized => (StatusCode::FORBIDDEN, "FORBIDDEN", message),
        TelegramError::SessionAlreadyExists => {
            (StatusCode::CONFLICT, "SESSION_ALREADY_EXISTS", message)
        }
        TelegramError::InvalidPhoneNumber => {
            (StatusCode::BAD_REQUEST, "INVALID_PHONE_NUMBER", message)
        }
        TelegramError::InvalidCode => (StatusCode::BAD_REQUEST, "INVALID_CODE", message),
        TelegramError::CodeExpired => (StatusCode::GONE, "CODE_EXPIRED", message),
        TelegramError::PasswordRequired => (StatusCode::FORBIDDEN, "PASSWORD_REQUIRED", message),
        TelegramError::QrExpired(_) => (StatusCode::GONE, "QR_EXPIRED", message),
        TelegramError::UpstreamRejected(_) => {
            (StatusCode::BAD_GATEWAY, "UPSTREAM_REJECTED", message)
        }
        TelegramError::InvalidRecipient(_) => {
            (StatusCode::BAD_REQUEST, "INVALID_RECIPIENT", message)
        }
        TelegramError::PeerNotFound(_) => (StatusCode::NOT_FOUND, "PEER_NOT_FOUND", message),
        TelegramError::WebhookNotConfigured => {
            (StatusCode::BAD_REQUEST, "WEBHOOK_NOT_CONFIGURED", message)
        }
        TelegramError::InvalidKind(_) => (StatusCode::BAD_REQUEST, "INVALID_CACHE_TYPE", message),
        TelegramError::JobNotFound => (StatusCode::NOT_FOUND, "JOB_NOT_FOUND", message),
        TelegramError::MediaDownload(_) => (StatusCode::BAD_GATEWAY, "MEDIA_DOWNLOAD_FAILED", message),
        TelegramError::Validation(_) => (StatusCode::BAD_REQUEST, "VALIDATION_ERROR", message),
        TelegramError::Timeout(_) => (StatusCode::GATEWAY_TIMEOUT, "TIMEOUT", message),
        TelegramError::Store(db) => classify_sqlx_error(db),
        TelegramError::BadCiphertext | TelegramError::Cache(_) | TelegramError::Internal(_) => {
            tracing::error!(error = %err, "Session core failure");
            internal()
        }
    }
}

/// Classify a sqlx error into an HTTP status, error code, and message.
///
/// - `RowNotFound` maps to 404.
/// - Unique constraint violations (constraint name starting with `uq_`) map to 409.
/// - Everything else maps to 500 with a sanitized message.
fn classify_sqlx_error(err: &sqlx::Error) -> (StatusCode, &'static str, String) {
    match err {
        sqlx::Error::RowNotFound => (
            StatusCode::NOT_FOUND,
            "NOT_FOUND",
            "Resource not found".to_string(),
        ),
        sqlx::Error::Database(db_err) => {
            // PostgreSQL unique constraint violation: error code 23505
            if db_err.code().as_deref() == Some("23505") {
                let constraint = db_err.constraint().unwrap_or("unknown");
                if constraint.starts_with("uq_") {
                    return (
                        StatusCode::CONFLICT,
                        "CONFLICT",
                        format!("Duplicate value violates unique constraint: {constraint}"),
                    );
                }
            }
            tracing::error!(error = %db_err, "Database error");
            internal()
        }
        other => {
            tracing::error!(error = %other, "Database error");
            internal()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn status_of(err: TelegramError) -> StatusCode {
        AppError::from(err).into_response().status()
    }

    #[test]
    fn session_core_kinds_map_to_statuses() {
        assert_eq!(status_of(TelegramError::SessionNotFound), StatusCode::NOT_FOUND);
        assert_eq!(status_of(TelegramError::Unauthorized), StatusCode::FORBIDDEN);
        assert_eq!(status_of(TelegramError::SessionNotActive), StatusCode::BAD_REQUEST);
        assert_eq!(status_of(TelegramError::CodeExpired), StatusCode::GONE);
        assert_eq!(status_of(TelegramError::PasswordRequired), StatusCode::FORBIDDEN);
        assert_eq!(
            status_of(TelegramError::QrExpired("3 attempts".into())),
            StatusCode::GONE
        );
        assert_eq!(
            status_of(TelegramError::UpstreamRejected("FLOOD".into())),
            StatusCode::BAD_GATEWAY
        );
        assert_eq!(
            status_of(TelegramError::SessionAlreadyExists),
            StatusCode::CONFLICT
        );
        assert_eq!(
            status_of(TelegramError::WebhookNotConfigured),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            status_of(TelegramError::Timeout("login".into())),
            StatusCode::GATEWAY_TIMEOUT
        );
        assert_eq!(
            status_of(TelegramError::BadCiphertext),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn missing_row_is_not_found() {
        let status = AppError::Database(sqlx::Error::RowNotFound)
            .into_response()
            .status();
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[test]
    fn rate_limit_is_429() {
        let status = AppError::Core(CoreError::TooManyRequests("slow down".into()))
            .into_response()
            .status();
        assert_eq!(status, StatusCode::TOO_MANY_REQUESTS);
    }
}
