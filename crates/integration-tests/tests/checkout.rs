//! Checkout and order history over HTTP.

#![allow(clippy::unwrap_used)]

use std::sync::Arc;

use axum::http::StatusCode;
use marketstall_integration_tests::TestApp;
use marketstall_storefront::db::Store;
use serde_json::json;

#[tokio::test]
async fn test_checkout_totals_and_decrements_stock() {
    let app = TestApp::new();
    let beans = app.category("Coffee Beans").await;
    let p1 = app.product("House Blend", 1000, 5, beans.id).await;

    let response = app
        .post(
            "/api/v1/checkout",
            &json!({
                "email": "Buyer@Example.com",
                "items": [{ "productId": p1.id.as_i32(), "quantity": 2 }]
            }),
        )
        .await;

    assert_eq!(response.status, StatusCode::CREATED, "{:?}", response.body);
    assert_eq!(response.body["totalCents"], 2000);
    assert_eq!(response.body["status"], "PENDING");
    assert_eq!(response.body["userEmail"], "buyer@example.com");
    assert!(response.body["userId"].is_null());
    assert_eq!(response.body["items"][0]["priceCents"], 1000);
    assert_eq!(response.body["items"][0]["quantity"], 2);

    let stored = app.store.get_product(p1.id).await.unwrap().unwrap();
    assert_eq!(stored.stock, 3);
}

#[tokio::test]
async fn test_unknown_product_performs_no_mutation() {
    let app = TestApp::new();
    let beans = app.category("Coffee Beans").await;
    let p1 = app.product("House Blend", 1000, 5, beans.id).await;

    let response = app
        .post(
            "/api/v1/checkout",
            &json!({
                "email": "buyer@example.com",
                "items": [
                    { "productId": p1.id.as_i32(), "quantity": 1 },
                    { "productId": 999_999, "quantity": 1 }
                ]
            }),
        )
        .await;

    assert_eq!(response.status, StatusCode::NOT_FOUND);
    assert_eq!(app.store.order_count().await, 0);
    assert_eq!(app.store.get_product(p1.id).await.unwrap().unwrap().stock, 5);
}

#[tokio::test]
async fn test_validation_failures_are_bad_requests() {
    let app = TestApp::new();
    let beans = app.category("Coffee Beans").await;
    let p1 = app.product("House Blend", 1000, 2, beans.id).await;
    let id = p1.id.as_i32();

    let empty = app.post("/api/v1/checkout", &json!({ "items": [] })).await;
    assert_eq!(empty.status, StatusCode::BAD_REQUEST);

    let zero = app
        .post(
            "/api/v1/checkout",
            &json!({ "items": [{ "productId": id, "quantity": 0 }] }),
        )
        .await;
    assert_eq!(zero.status, StatusCode::BAD_REQUEST);

    let too_many = app
        .post(
            "/api/v1/checkout",
            &json!({ "items": [{ "productId": id, "quantity": 3 }] }),
        )
        .await;
    assert_eq!(too_many.status, StatusCode::BAD_REQUEST);
    assert!(too_many.error().contains("House Blend"));

    // Two lines for the same product are checked against their sum.
    let split = app
        .post(
            "/api/v1/checkout",
            &json!({ "items": [
                { "productId": id, "quantity": 2 },
                { "productId": id, "quantity": 1 }
            ] }),
        )
        .await;
    assert_eq!(split.status, StatusCode::BAD_REQUEST);

    let bad_email = app
        .post(
            "/api/v1/checkout",
            &json!({ "email": "not-an-email", "items": [{ "productId": id, "quantity": 1 }] }),
        )
        .await;
    assert_eq!(bad_email.status, StatusCode::BAD_REQUEST);

    assert_eq!(app.store.order_count().await, 0);
    assert_eq!(app.store.get_product(p1.id).await.unwrap().unwrap().stock, 2);
}

#[tokio::test]
async fn test_commit_failure_leaves_no_trace() {
    let app = TestApp::new();
    let beans = app.category("Coffee Beans").await;
    let p1 = app.product("House Blend", 1000, 5, beans.id).await;
    app.store.fail_commits(true);

    let response = app
        .post(
            "/api/v1/checkout",
            &json!({ "items": [{ "productId": p1.id.as_i32(), "quantity": 1 }] }),
        )
        .await;

    assert_eq!(response.status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(response.error(), "checkout failed");
    assert_eq!(app.store.order_count().await, 0);
    assert_eq!(app.store.get_product(p1.id).await.unwrap().unwrap().stock, 5);
}

#[tokio::test]
async fn test_concurrent_checkouts_never_oversell() {
    let app = Arc::new(TestApp::new());
    let beans = app.category("Coffee Beans").await;
    let p1 = app.product("Last Bags", 1000, 3, beans.id).await;
    let id = p1.id.as_i32();

    let attempts: Vec<_> = (0..2)
        .map(|_| {
            let app = Arc::clone(&app);
            tokio::spawn(async move {
                app.post(
                    "/api/v1/checkout",
                    &json!({ "items": [{ "productId": id, "quantity": 2 }] }),
                )
                .await
            })
        })
        .collect();

    let mut statuses = Vec::new();
    for attempt in attempts {
        statuses.push(attempt.await.unwrap().status);
    }
    statuses.sort();

    assert_eq!(statuses, [StatusCode::CREATED, StatusCode::BAD_REQUEST]);
    assert_eq!(app.store.get_product(p1.id).await.unwrap().unwrap().stock, 1);
}

#[tokio::test]
async fn test_orders_by_email_both_forms() {
    let app = TestApp::new();
    let beans = app.category("Coffee Beans").await;
    let p1 = app.product("House Blend", 1000, 5, beans.id).await;
    app.post(
        "/api/v1/checkout",
        &json!({
            "email": "guest@example.com",
            "items": [{ "productId": p1.id.as_i32(), "quantity": 1 }]
        }),
    )
    .await;

    let by_path = app.get("/api/v1/orders/by-email/GUEST@example.com").await;
    assert_eq!(by_path.status, StatusCode::OK);
    assert_eq!(by_path.body.as_array().unwrap().len(), 1);

    let by_query = app
        .get("/api/v1/orders/by-email?email=guest%40EXAMPLE.com")
        .await;
    assert_eq!(by_query.body, by_path.body);

    let nobody = app.get("/api/v1/orders/by-email/nobody@example.com").await;
    assert!(nobody.body.as_array().unwrap().is_empty());

    let missing = app.get("/api/v1/orders/by-email").await;
    assert_eq!(missing.status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_signed_in_checkout_records_user() {
    let app = TestApp::new();
    let beans = app.category("Coffee Beans").await;
    let p1 = app.product("House Blend", 1000, 5, beans.id).await;
    let cookie = app.register("member@example.com", "correct horse").await;

    let response = app
        .json(
            axum::http::Method::POST,
            "/api/v1/checkout",
            &json!({ "items": [{ "productId": p1.id.as_i32(), "quantity": 1 }] }),
            Some(&cookie),
        )
        .await;
    assert_eq!(response.status, StatusCode::CREATED);
    assert_eq!(response.body["userEmail"], "member@example.com");
    assert!(response.body["userId"].is_number());

    let mine = app.get_with_cookie("/api/v1/orders/my", &cookie).await;
    assert_eq!(mine.status, StatusCode::OK);
    assert_eq!(mine.body.as_array().unwrap().len(), 1);
    assert_eq!(mine.body[0]["id"], response.body["id"]);
}
