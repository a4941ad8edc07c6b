//! HTTP tests for account registration, login, and token handling.

mod common;

use axum::http::StatusCode;
use axum::Router;
use common::{body_json, get, get_auth, post_auth, post_json, TEST_PASSWORD};
use serde_json::json;
use sqlx::PgPool;

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

async fn register(app: Router, username: &str) -> serde_json::Value {
    let body = json!({
        "username": username,
        "email": format!("{username}@example.com"),
        "password": TEST_PASSWORD,
    });
    let response = post_json(app, "/api/v1/auth/register", body).await;
    assert_eq!(response.status(), StatusCode::CREATED);
    body_json(response).await
}

async fn login(app: Router, username: &str, password: &str) -> axum::response::Response {
    let body = json!({ "username": username, "password": password });
    post_json(app, "/api/v1/auth/login", body).await
}

// ---------------------------------------------------------------------------
// Registration
// ---------------------------------------------------------------------------

#[sqlx::test(migrations = "../../db/migrations")]
async fn register_returns_tokens_and_user(pool: PgPool) {
    let app = common::build_test_app(pool);

    let json = register(app, "alice").await;

    assert!(json["access_token"].is_string());
    assert!(json["refresh_token"].is_string());
    assert_eq!(json["token_type"], "Bearer");
    assert!(json["expires_in"].is_number());
    assert_eq!(json["user"]["username"], "alice");
    assert_eq!(json["user"]["role"], "user");
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn duplicate_username_is_conflict(pool: PgPool) {
    let app = common::build_test_app(pool);
    register(app.clone(), "bob").await;

    let body = json!({
        "username": "bob",
        "email": "other@example.com",
        "password": TEST_PASSWORD,
    });
    let response = post_json(app, "/api/v1/auth/register", body).await;
    assert_eq!(response.status(), StatusCode::CONFLICT);
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn short_password_is_rejected(pool: PgPool) {
    let app = common::build_test_app(pool);
    let body = json!({ "username": "carol", "email": "carol@example.com", "password": "short" });

    let response = post_json(app, "/api/v1/auth/register", body).await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let json = body_json(response).await;
    assert_eq!(json["code"], "VALIDATION_ERROR");
}

// ---------------------------------------------------------------------------
// Login and throttling
// ---------------------------------------------------------------------------

#[sqlx::test(migrations = "../../db/migrations")]
async fn login_with_valid_credentials(pool: PgPool) {
    let (user, _) = common::create_regular_user(&pool, "dave").await;
    let app = common::build_test_app(pool);

    let response = login(app, "dave", TEST_PASSWORD).await;
    assert_eq!(response.status(), StatusCode::OK);
    let json = body_json(response).await;
    assert_eq!(json["user"]["id"], user.id.to_string());
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn wrong_password_is_unauthorized(pool: PgPool) {
    common::create_regular_user(&pool, "erin").await;
    let app = common::build_test_app(pool);

    let response = login(app, "erin", "not-the-password").await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn repeated_failures_are_throttled(pool: PgPool) {
    common::create_regular_user(&pool, "frank").await;
    let app = common::build_test_app(pool);

    // The test config allows three failures per window.
    for _ in 0..3 {
        let response = login(app.clone(), "frank", "wrong-password").await;
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }

    let response = login(app, "frank", TEST_PASSWORD).await;
    assert_eq!(response.status(), StatusCode::TOO_MANY_REQUESTS);
    let json = body_json(response).await;
    assert_eq!(json["code"], "RATE_LIMITED");
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn successful_login_resets_failure_count(pool: PgPool) {
    common::create_regular_user(&pool, "gina").await;
    let app = common::build_test_app(pool);

    for _ in 0..2 {
        login(app.clone(), "gina", "wrong-password").await;
    }
    assert_eq!(login(app.clone(), "gina", TEST_PASSWORD).await.status(), StatusCode::OK);
    for _ in 0..2 {
        login(app.clone(), "gina", "wrong-password").await;
    }
    assert_eq!(login(app, "gina", TEST_PASSWORD).await.status(), StatusCode::OK);
}

// ---------------------------------------------------------------------------
// Tokens
// ---------------------------------------------------------------------------

#[sqlx::test(migrations = "../../db/migrations")]
async fn refresh_rotates_the_token(pool: PgPool) {
    let app = common::build_test_app(pool);
    let json = register(app.clone(), "hank").await;
    let refresh_token = json["refresh_token"].as_str().unwrap().to_string();

    let response = post_json(
        app.clone(),
        "/api/v1/auth/refresh",
        json!({ "refresh_token": refresh_token }),
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);
    let rotated = body_json(response).await;
    assert_ne!(rotated["refresh_token"], refresh_token);

    // The presented token was revoked.
    let response = post_json(
        app,
        "/api/v1/auth/refresh",
        json!({ "refresh_token": refresh_token }),
    )
    .await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn me_requires_a_token(pool: PgPool) {
    let app = common::build_test_app(pool);
    let response = get(app, "/api/v1/auth/me").await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn me_returns_the_caller(pool: PgPool) {
    let (_, token) = common::create_regular_user(&pool, "iris").await;
    let app = common::build_test_app(pool);

    let response = get_auth(app, "/api/v1/auth/me", &token).await;
    assert_eq!(response.status(), StatusCode::OK);
    let json = body_json(response).await;
    assert_eq!(json["data"]["username"], "iris");
    assert!(json["data"].get("password_hash").is_none());
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn logout_all_revokes_refresh_tokens(pool: PgPool) {
    let app = common::build_test_app(pool);
    let json = register(app.clone(), "jack").await;
    let access = json["access_token"].as_str().unwrap().to_string();
    let refresh_token = json["refresh_token"].as_str().unwrap().to_string();

    let response = post_auth(app.clone(), "/api/v1/auth/logout-all", &access).await;
    assert_eq!(response.status(), StatusCode::NO_CONTENT);

    let response = post_json(
        app,
        "/api/v1/auth/refresh",
        json!({ "refresh_token": refresh_token }),
    )
    .await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}
