//! Handlers for the `/auth` resource (register, login, refresh, logout, me).

use axum::extract::State;
use axum::http::header::USER_AGENT;
use axum::http::{HeaderMap, StatusCode};
use axum::response::IntoResponse;
use axum::Json;
use chrono::Utc;
use serde::{Deserialize, Serialize};
use tgw_core::cache_keys;
use tgw_core::error::CoreError;
use tgw_core::roles::ROLE_USER;
use tgw_core::types::DbId;
use tgw_db::models::refresh_token::CreateRefreshToken;
use tgw_db::models::user::{CreateUser, UserResponse};
use tgw_db::repositories::{RefreshTokenRepo, UserRepo};
use validator::Validate;

use crate::auth::jwt::{generate_access_token, generate_refresh_token, hash_refresh_token};
use crate::auth::password::{hash_password, verify_password};
use crate::error::{AppError, AppResult};
use crate::middleware::auth::AuthUser;
use crate::response::DataResponse;
use crate::state::AppState;

// ---------------------------------------------------------------------------
// Request / response types
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize, Validate)]
pub struct RegisterRequest {
    #[validate(length(min = 3, max = 50))]
    pub username: String,
    #[validate(email)]
    pub email: String,
    #[validate(length(min = 8, max = 128))]
    pub password: String,
}

#[derive(Debug, Deserialize, Validate)]
pub struct LoginRequest {
    #[validate(length(min = 1))]
    pub username: String,
    #[validate(length(min = 1))]
    pub password: String,
}

/// Body of `POST /auth/refresh` and `POST /auth/logout`.
#[derive(Debug, Deserialize)]
pub struct RefreshRequest {
    pub refresh_token: String,
}

/// Returned by register, login, and refresh.
#[derive(Debug, Serialize)]
pub struct AuthResponse {
    pub access_token: String,
    pub refresh_token: String,
    pub token_type: &'static str,
    /// Access token lifetime in seconds.
    pub expires_in: i64,
    pub user: UserInfo,
}

#[derive(Debug, Serialize)]
pub struct UserInfo {
    pub id: DbId,
    pub username: String,
    pub email: String,
    pub role: String,
}

// ---------------------------------------------------------------------------
// Handlers
// ---------------------------------------------------------------------------

/// POST /api/v1/auth/register
///
/// Create a `user`-role account and sign it in.
pub async fn register(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(input): Json<RegisterRequest>,
) -> AppResult<impl IntoResponse> {
    input.validate()?;
    let username = input.username.trim();
    let email = input.email.trim().to_lowercase();

    if UserRepo::exists_by_username(&state.pool, username).await? {
        return Err(AppError::Core(CoreError::Conflict(
            "Username is already taken".into(),
        )));
    }
    if UserRepo::exists_by_email(&state.pool, &email).await? {
        return Err(AppError::Core(CoreError::Conflict(
            "Email is already registered".into(),
        )));
    }

    let password_hash = hash_password(&input.password)
        .map_err(|e| AppError::InternalError(format!("Password hashing error: {e}")))?;

    let user = UserRepo::create(
        &state.pool,
        &CreateUser {
            username: username.to_string(),
            email,
            password_hash,
            role: ROLE_USER.to_string(),
        },
    )
    .await?;
    tracing::info!(user_id = %user.id, username = %user.username, "User registered");

    let response = create_auth_response(
        &state,
        user.id,
        &user.username,
        &user.email,
        &user.role,
        user_agent(&headers),
    )
    .await?;

    Ok((StatusCode::CREATED, Json(response)))
}

/// POST /api/v1/auth/login
///
/// Authenticate with username + password. Failed attempts are counted per
/// username; once the limit is reached further attempts are refused until
/// the window expires.
pub async fn login(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(input): Json<LoginRequest>,
) -> AppResult<Json<AuthResponse>> {
    input.validate()?;
    let rate_key = cache_keys::login_rate(&input.username);

    if failed_attempts(&state, &rate_key).await >= state.config.login_rate_limit {
        return Err(AppError::Core(CoreError::TooManyRequests(
            "Too many failed login attempts. Try again later.".into(),
        )));
    }

    let user = UserRepo::find_by_username(&state.pool, &input.username).await?;
    let verified = match &user {
        Some(user) => verify_password(&input.password, &user.password_hash)
            .map_err(|e| AppError::InternalError(format!("Password verification error: {e}")))?,
        None => false,
    };

    let user = match user {
        Some(user) if verified => user,
        _ => {
            record_failed_attempt(&state, &rate_key).await;
            return Err(AppError::Core(CoreError::Unauthorized(
                "Invalid username or password".into(),
            )));
        }
    };

    if !user.is_active {
        return Err(AppError::Core(CoreError::Forbidden(
            "Account is deactivated".into(),
        )));
    }

    if let Err(e) = state.cache.delete(&[rate_key]).await {
        tracing::warn!(error = %e, "Failed to reset login throttle");
    }
    UserRepo::record_login(&state.pool, user.id).await?;

    let response = create_auth_response(
        &state,
        user.id,
        &user.username,
        &user.email,
        &user.role,
        user_agent(&headers),
    )
    .await?;

    tracing::info!(user_id = %user.id, "User logged in");
    Ok(Json(response))
}

/// POST /api/v1/auth/refresh
///
/// Exchange a valid refresh token for new tokens. The presented token is
/// revoked (rotation).
pub async fn refresh(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(input): Json<RefreshRequest>,
) -> AppResult<Json<AuthResponse>> {
    let token_hash = hash_refresh_token(&input.refresh_token);

    let token = RefreshTokenRepo::find_active_by_hash(&state.pool, &token_hash)
        .await?
        .ok_or_else(|| {
            AppError::Core(CoreError::Unauthorized(
                "Invalid or expired refresh token".into(),
            ))
        })?;

    RefreshTokenRepo::revoke(&state.pool, token.id).await?;

    let user = UserRepo::find_by_id(&state.pool, token.user_id)
        .await?
        .ok_or_else(|| AppError::Core(CoreError::Unauthorized("User no longer exists".into())))?;

    if !user.is_active {
        return Err(AppError::Core(CoreError::Forbidden(
            "Account is deactivated".into(),
        )));
    }

    let response = create_auth_response(
        &state,
        user.id,
        &user.username,
        &user.email,
        &user.role,
        user_agent(&headers),
    )
    .await?;

    Ok(Json(response))
}

/// POST /api/v1/auth/logout
///
/// Revoke one refresh token of the caller. Unknown tokens are ignored.
pub async fn logout(
    State(state): State<AppState>,
    auth_user: AuthUser,
    Json(input): Json<RefreshRequest>,
) -> AppResult<StatusCode> {
    let token_hash = hash_refresh_token(&input.refresh_token);
    if let Some(token) = RefreshTokenRepo::find_active_by_hash(&state.pool, &token_hash).await? {
        if token.user_id == auth_user.user_id {
            RefreshTokenRepo::revoke(&state.pool, token.id).await?;
        }
    }
    Ok(StatusCode::NO_CONTENT)
}

/// POST /api/v1/auth/logout-all
pub async fn logout_all(
    State(state): State<AppState>,
    auth_user: AuthUser,
) -> AppResult<StatusCode> {
    let revoked = RefreshTokenRepo::revoke_all_for_user(&state.pool, auth_user.user_id).await?;
    tracing::info!(user_id = %auth_user.user_id, revoked, "Revoked all refresh tokens");
    Ok(StatusCode::NO_CONTENT)
}

/// GET /api/v1/auth/me
pub async fn me(
    State(state): State<AppState>,
    auth_user: AuthUser,
) -> AppResult<Json<DataResponse<UserResponse>>> {
    let user = UserRepo::find_by_id(&state.pool, auth_user.user_id)
        .await?
        .ok_or(AppError::Core(CoreError::NotFound {
            entity: "User",
            id: auth_user.user_id,
        }))?;
    Ok(Json(DataResponse {
        data: UserResponse::from(user),
    }))
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

/// Generate access + refresh tokens, persist the refresh token hash, and
/// build the response.
async fn create_auth_response(
    state: &AppState,
    user_id: DbId,
    username: &str,
    email: &str,
    role: &str,
    user_agent: Option<String>,
) -> AppResult<AuthResponse> {
    let access_token = generate_access_token(user_id, role, &state.config.jwt)
        .map_err(|e| AppError::InternalError(format!("Token generation error: {e}")))?;

    let (refresh_plaintext, refresh_hash) = generate_refresh_token();
    let expires_at =
        Utc::now() + chrono::Duration::days(state.config.jwt.refresh_token_expiry_days);

    RefreshTokenRepo::create(
        &state.pool,
        &CreateRefreshToken {
            user_id,
            token_hash: refresh_hash,
            expires_at,
            ip_address: None,
            user_agent,
        },
    )
    .await?;

    Ok(AuthResponse {
        access_token,
        refresh_token: refresh_plaintext,
        token_type: "Bearer",
        expires_in: state.config.jwt.access_token_expiry_mins * 60,
        user: UserInfo {
            id: user_id,
            username: username.to_string(),
            email: email.to_string(),
            role: role.to_string(),
        },
    })
}

fn user_agent(headers: &HeaderMap) -> Option<String> {
    headers
        .get(USER_AGENT)
        .and_then(|v| v.to_str().ok())
        .map(str::to_string)
}

/// Failed attempts recorded in the current window; zero when the cache is
/// unreachable.
async fn failed_attempts(state: &AppState, key: &str) -> u64 {
    match state.cache.get(key).await {
        Ok(value) => value.and_then(|v| v.parse().ok()).unwrap_or(0),
        Err(e) => {
            tracing::warn!(error = %e, "Login throttle lookup failed");
            0
        }
    }
}

async fn record_failed_attempt(state: &AppState, key: &str) {
    if let Err(e) = state
        .cache
        .increment_rate_limit(key, state.config.login_rate_window)
        .await
    {
        tracing::warn!(error = %e, "Failed to record login attempt");
    }
}
