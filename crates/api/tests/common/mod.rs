//! Shared harness for the HTTP integration tests.
//!
//! Builds the production router over the per-test database with an
//! in-process cache and the upstream factory that refuses every connection.

#![allow(dead_code)]

use std::sync::Arc;
use std::time::Duration;

use axum::body::Body;
use axum::http::header::{AUTHORIZATION, CONTENT_TYPE};
use axum::http::{Request, Response};
use axum::Router;
use http_body_util::BodyExt;
use sqlx::PgPool;
use tgw_core::crypto::Crypter;
use tgw_core::roles::ROLE_USER;
use tgw_db::models::user::{CreateUser, User};
use tgw_db::repositories::UserRepo;
use tgw_events::DispatcherConfig;
use tgw_telegram::cache::{KeyValueCache, MemoryCache};
use tgw_telegram::upstream::unconfigured::UnconfiguredClientFactory;
use tgw_telegram::TelegramConfig;
use tower::ServiceExt;

use tgw_api::auth::jwt::{generate_access_token, JwtConfig};
use tgw_api::auth::password::hash_password;
use tgw_api::config::ServerConfig;
use tgw_api::engine::Engine;
use tgw_api::router::build_app_router;
use tgw_api::state::AppState;

pub const TEST_PASSWORD: &str = "correct-horse-battery";
const TEST_KEY_HEX: &str = "000102030405060708090a0b0c0d0e0f101112131415161718191a1b1c1d1e1f";

pub fn test_config() -> ServerConfig {
    ServerConfig {
        host: "127.0.0.1".to_string(),
        port: 0,
        cors_origins: vec!["http://localhost:5173".to_string()],
        request_timeout_secs: 30,
        shutdown_timeout_secs: 1,
        login_rate_limit: 3,
        login_rate_window: Duration::from_secs(900),
        jwt: JwtConfig {
            secret: "integration-test-secret".to_string(),
            access_token_expiry_mins: 15,
            refresh_token_expiry_days: 7,
        },
    }
}

pub fn test_crypter() -> Crypter {
    Crypter::from_hex(TEST_KEY_HEX).expect("test key should be valid")
}

/// Router wired exactly like the binary, minus the network listener.
pub fn build_test_app(pool: PgPool) -> Router {
    let config = test_config();
    let cache: Arc<dyn KeyValueCache> = Arc::new(MemoryCache::new());
    let engine = Engine::start(
        pool.clone(),
        Arc::clone(&cache),
        Arc::new(UnconfiguredClientFactory),
        test_crypter(),
        TelegramConfig::default(),
        DispatcherConfig::default(),
    );

    let state = AppState {
        pool,
        config: Arc::new(config.clone()),
        sessions: Arc::clone(&engine.sessions),
        cache,
    };
    build_app_router(state, &config)
}

/// Insert a user with [`TEST_PASSWORD`] and mint an access token for it.
pub async fn create_user_with_token(pool: &PgPool, username: &str, role: &str) -> (User, String) {
    let user = UserRepo::create(
        pool,
        &CreateUser {
            username: username.to_string(),
            email: format!("{username}@example.com"),
            password_hash: hash_password(TEST_PASSWORD).expect("hashing should succeed"),
            role: role.to_string(),
        },
    )
    .await
    .expect("user insert should succeed");
    let token = generate_access_token(user.id, role, &test_config().jwt)
        .expect("token generation should succeed");
    (user, token)
}

pub async fn create_regular_user(pool: &PgPool, username: &str) -> (User, String) {
    create_user_with_token(pool, username, ROLE_USER).await
}

// ---------------------------------------------------------------------------
// Request helpers
// ---------------------------------------------------------------------------

pub async fn body_json(response: Response<Body>) -> serde_json::Value {
    let bytes = response
        .into_body()
        .collect()
        .await
        .expect("body should be readable")
        .to_bytes();
    serde_json::from_slice(&bytes).expect("body should be JSON")
}

async fn send(app: Router, request: Request<Body>) -> Response<Body> {
    app.oneshot(request).await.expect("router is infallible")
}

fn bearer(token: &str) -> String {
    format!("Bearer {token}")
}

pub async fn get(app: Router, uri: &str) -> Response<Body> {
    let request = Request::get(uri).body(Body::empty()).unwrap();
    send(app, request).await
}

pub async fn get_auth(app: Router, uri: &str, token: &str) -> Response<Body> {
    let request = Request::get(uri)
        .header(AUTHORIZATION, bearer(token))
        .body(Body::empty())
        .unwrap();
    send(app, request).await
}

pub async fn post_json(app: Router, uri: &str, body: serde_json::Value) -> Response<Body> {
    let request = Request::post(uri)
        .header(CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .unwrap();
    send(app, request).await
}

pub async fn post_json_auth(
    app: Router,
    uri: &str,
    body: serde_json::Value,
    token: &str,
) -> Response<Body> {
    let request = Request::post(uri)
        .header(CONTENT_TYPE, "application/json")
        .header(AUTHORIZATION, bearer(token))
        .body(Body::from(body.to_string()))
        .unwrap();
    send(app, request).await
}

pub async fn post_auth(app: Router, uri: &str, token: &str) -> Response<Body> {
    let request = Request::post(uri)
        .header(AUTHORIZATION, bearer(token))
        .body(Body::empty())
        .unwrap();
    send(app, request).await
}

pub async fn delete_auth(app: Router, uri: &str, token: &str) -> Response<Body> {
    let request = Request::delete(uri)
        .header(AUTHORIZATION, bearer(token))
        .body(Body::empty())
        .unwrap();
    send(app, request).await
}
