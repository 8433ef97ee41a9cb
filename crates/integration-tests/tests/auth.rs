//! Registration, login and session cookies over HTTP.

#![allow(clippy::unwrap_used)]

use axum::http::StatusCode;
use marketstall_integration_tests::TestApp;
use serde_json::json;

#[tokio::test]
async fn test_register_then_login_resolves_same_user() {
    let app = TestApp::new();

    let registered = app
        .post(
            "/api/v1/auth/register",
            &json!({ "email": "Ada@Example.com", "password": "analytical" }),
        )
        .await;
    assert_eq!(registered.status, StatusCode::CREATED);
    assert_eq!(registered.body["user"]["email"], "ada@example.com");
    assert!(registered.body["user"].get("passwordHash").is_none());
    let user_id = registered.body["user"]["id"].clone();

    let set_cookie = registered.set_cookie().unwrap();
    assert!(set_cookie.contains("HttpOnly"));
    assert!(set_cookie.contains("SameSite=Lax"));
    assert!(set_cookie.contains("Path=/"));

    let login = app
        .post(
            "/api/v1/auth/login",
            &json!({ "email": "ada@example.com", "password": "analytical" }),
        )
        .await;
    assert_eq!(login.status, StatusCode::OK);

    let me = app
        .get_with_cookie("/api/v1/auth/me", &login.session_cookie().unwrap())
        .await;
    assert_eq!(me.status, StatusCode::OK);
    assert_eq!(me.body["user"]["id"], user_id);
}

#[tokio::test]
async fn test_wrong_password_and_unknown_email_are_indistinguishable() {
    let app = TestApp::new();
    app.register("ada@example.com", "analytical").await;

    let wrong_password = app
        .post(
            "/api/v1/auth/login",
            &json!({ "email": "ada@example.com", "password": "difference" }),
        )
        .await;
    let unknown_email = app
        .post(
            "/api/v1/auth/login",
            &json!({ "email": "babbage@example.com", "password": "analytical" }),
        )
        .await;

    assert_eq!(wrong_password.status, StatusCode::UNAUTHORIZED);
    assert_eq!(wrong_password.status, unknown_email.status);
    assert_eq!(wrong_password.body, unknown_email.body);
    assert_eq!(wrong_password.error(), "invalid email or password");
    assert!(wrong_password.set_cookie().is_none());
}

#[tokio::test]
async fn test_duplicate_registration_conflicts() {
    let app = TestApp::new();
    app.register("ada@example.com", "analytical").await;

    let again = app
        .post(
            "/api/v1/auth/register",
            &json!({ "email": "ADA@example.com", "password": "analytical" }),
        )
        .await;
    assert_eq!(again.status, StatusCode::CONFLICT);
}

#[tokio::test]
async fn test_registration_validation() {
    let app = TestApp::new();

    let short = app
        .post(
            "/api/v1/auth/register",
            &json!({ "email": "ada@example.com", "password": "short" }),
        )
        .await;
    assert_eq!(short.status, StatusCode::BAD_REQUEST);

    let bad_email = app
        .post(
            "/api/v1/auth/register",
            &json!({ "email": "ada", "password": "analytical" }),
        )
        .await;
    assert_eq!(bad_email.status, StatusCode::BAD_REQUEST);

    let missing_field = app
        .post("/api/v1/auth/register", &json!({ "email": "ada@example.com" }))
        .await;
    assert_eq!(missing_field.status, StatusCode::BAD_REQUEST);
    assert!(!missing_field.error().is_empty());
}

#[tokio::test]
async fn test_me_without_session_is_null() {
    let app = TestApp::new();

    let anonymous = app.get("/api/v1/auth/me").await;
    assert_eq!(anonymous.status, StatusCode::OK);
    assert!(anonymous.body["user"].is_null());

    let forged = app.get_with_cookie("/api/v1/auth/me", "auth=1.9999999999.AAAA").await;
    assert_eq!(forged.status, StatusCode::OK);
    assert!(forged.body["user"].is_null());
}

#[tokio::test]
async fn test_my_orders_requires_session() {
    let app = TestApp::new();
    let response = app.get("/api/v1/orders/my").await;
    assert_eq!(response.status, StatusCode::UNAUTHORIZED);
    assert_eq!(response.error(), "not signed in");
}

#[tokio::test]
async fn test_logout_clears_cookie() {
    let app = TestApp::new();
    let cookie = app.register("ada@example.com", "analytical").await;

    let response = app
        .json(
            axum::http::Method::POST,
            "/api/v1/auth/logout",
            &json!({}),
            Some(&cookie),
        )
        .await;
    assert_eq!(response.status, StatusCode::OK);
    let cleared = response.set_cookie().unwrap();
    assert!(cleared.starts_with("auth=;"));
    assert!(cleared.contains("Max-Age=0"));
}
