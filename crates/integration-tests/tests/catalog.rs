//! Catalog query over HTTP.

#![allow(clippy::unwrap_used)]

use axum::http::StatusCode;
use marketstall_integration_tests::TestApp;

async fn ten_products(app: &TestApp) {
    let beans = app.category("Coffee Beans").await;
    for i in 1..=10 {
        app.product(&format!("Roast {i}"), 1000 + i, 5, beans.id).await;
    }
}

#[tokio::test]
async fn test_ten_products_paginate_into_two_pages() {
    let app = TestApp::new();
    ten_products(&app).await;

    let first = app.get("/api/v1/products?limit=9").await;
    assert_eq!(first.status, StatusCode::OK);
    assert_eq!(first.body["items"].as_array().unwrap().len(), 9);
    assert_eq!(first.body["total"], 10);
    assert_eq!(first.body["pageCount"], 2);
    assert_eq!(first.body["page"], 1);

    let second = app.get("/api/v1/products?limit=9&page=2").await;
    let items = second.body["items"].as_array().unwrap();
    assert_eq!(items.len(), 1);
    // Newest first, so the last page holds the oldest product.
    assert_eq!(items[0]["name"], "Roast 1");
}

#[tokio::test]
async fn test_defaults_and_junk_paging() {
    let app = TestApp::new();
    ten_products(&app).await;

    let response = app.get("/api/v1/products?page=abc&limit=").await;
    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(response.body["page"], 1);
    assert_eq!(response.body["limit"], 9);

    let clamped = app.get("/api/v1/products?limit=1000&page=-3").await;
    assert_eq!(clamped.body["limit"], 24);
    assert_eq!(clamped.body["page"], 1);
    assert_eq!(clamped.body["items"].as_array().unwrap().len(), 10);
}

#[tokio::test]
async fn test_page_past_the_end_is_empty() {
    let app = TestApp::new();
    ten_products(&app).await;

    let response = app.get("/api/v1/products?page=7").await;
    assert_eq!(response.status, StatusCode::OK);
    assert!(response.body["items"].as_array().unwrap().is_empty());
    assert_eq!(response.body["total"], 10);
    assert_eq!(response.body["pageCount"], 2);
}

#[tokio::test]
async fn test_empty_catalog_has_one_page() {
    let app = TestApp::new();
    let response = app.get("/api/v1/products").await;
    assert_eq!(response.body["total"], 0);
    assert_eq!(response.body["pageCount"], 1);
}

#[tokio::test]
async fn test_text_and_category_filters_combine() {
    let app = TestApp::new();
    let beans = app.category("Coffee Beans").await;
    let gear = app.category("Brewing Gear").await;
    app.product("Espresso Roast", 1500, 3, beans.id).await;
    app.product("Espresso Tamper", 3000, 3, gear.id).await;
    app.product("Filter Roast", 1400, 3, beans.id).await;

    let text_only = app.get("/api/v1/products?q=espresso").await;
    assert_eq!(text_only.body["total"], 2);

    let both = app
        .get("/api/v1/products?q=ESPRESSO&category=brewing%20gear")
        .await;
    assert_eq!(both.body["total"], 1);
    assert_eq!(both.body["items"][0]["name"], "Espresso Tamper");

    let by_slug = app.get("/api/v1/products?category=COFFEE-BEANS").await;
    assert_eq!(by_slug.body["total"], 2);

    let description = app.get("/api/v1/products?q=tamper%20desc").await;
    assert_eq!(description.body["total"], 1);
}

#[tokio::test]
async fn test_like_metacharacters_match_literally() {
    let app = TestApp::new();
    let beans = app.category("Coffee Beans").await;
    app.product("Plain Roast", 1500, 3, beans.id).await;

    let response = app.get("/api/v1/products?q=%25").await;
    assert_eq!(response.body["total"], 0);
}

#[tokio::test]
async fn test_product_detail_by_slug() {
    let app = TestApp::new();
    let beans = app.category("Coffee Beans").await;
    let product = app.product("House Blend", 1400, 8, beans.id).await;

    let response = app.get("/api/v1/products/house-blend").await;
    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(response.body["id"], product.id.as_i32());
    assert_eq!(response.body["priceCents"], 1400);
    assert_eq!(response.body["category"]["slug"], "coffee-beans");

    let missing = app.get("/api/v1/products/nope").await;
    assert_eq!(missing.status, StatusCode::NOT_FOUND);
    assert_eq!(missing.error(), "product not found");
}

#[tokio::test]
async fn test_categories_sorted_by_name() {
    let app = TestApp::new();
    app.category("Tea").await;
    app.category("Brewing Gear").await;
    app.category("Coffee Beans").await;

    let response = app.get("/api/v1/categories").await;
    let names: Vec<&str> = response
        .body
        .as_array()
        .unwrap()
        .iter()
        .map(|c| c["name"].as_str().unwrap())
        .collect();
    assert_eq!(names, ["Brewing Gear", "Coffee Beans", "Tea"]);
}
