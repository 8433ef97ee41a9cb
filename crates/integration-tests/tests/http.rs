//! Cross-cutting HTTP behaviour: probes, headers and error shape.

#![allow(clippy::unwrap_used)]

use axum::{
    body::Body,
    http::{Request, StatusCode, header},
};
use marketstall_integration_tests::TestApp;

#[tokio::test]
async fn test_health_probes() {
    let app = TestApp::new();

    let live = app.get("/health").await;
    assert_eq!(live.status, StatusCode::OK);
    assert_eq!(live.body, "ok");

    let ready = app.get("/health/ready").await;
    assert_eq!(ready.status, StatusCode::OK);
}

#[tokio::test]
async fn test_security_headers_on_api_responses() {
    let app = TestApp::new();
    let response = app.get("/api/v1/categories").await;

    let value = |name: &str| response.headers.get(name).unwrap().to_str().unwrap();
    assert_eq!(value("x-content-type-options"), "nosniff");
    assert_eq!(value("x-frame-options"), "DENY");
    assert_eq!(value("referrer-policy"), "no-referrer");
    assert_eq!(value("cache-control"), "no-store");
}

#[tokio::test]
async fn test_request_id_is_echoed_or_generated() {
    let app = TestApp::new();

    let request = Request::get("/health")
        .header("x-request-id", "edge-abc-123")
        .body(Body::empty())
        .unwrap();
    let echoed = app.send(request).await;
    assert_eq!(echoed.headers["x-request-id"], "edge-abc-123");

    let generated = app.get("/health").await;
    assert_eq!(generated.headers["x-request-id"].len(), 36);
}

#[tokio::test]
async fn test_malformed_json_uses_error_body() {
    let app = TestApp::new();
    let request = Request::post("/api/v1/checkout")
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from("{\"items\": [oops"))
        .unwrap();

    let response = app.send(request).await;
    assert_eq!(response.status, StatusCode::BAD_REQUEST);
    assert!(!response.error().is_empty());
}

#[tokio::test]
async fn test_wrong_field_type_is_bad_request() {
    let app = TestApp::new();
    let response = app
        .post(
            "/api/v1/checkout",
            &serde_json::json!({ "items": [{ "productId": "one", "quantity": 1 }] }),
        )
        .await;
    assert_eq!(response.status, StatusCode::BAD_REQUEST);
    assert!(response.body["error"].is_string());
}
