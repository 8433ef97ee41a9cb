//! Integration test harness for Marketstall.
//!
//! [`TestApp`] drives the real router over a [`MemoryStore`] with
//! `tower::ServiceExt::oneshot`, so the HTTP contract is exercised without a
//! database or a socket.
//!
//! # Running Tests
//!
//! ```bash
//! # In-process tests
//! cargo test -p marketstall-integration-tests
//!
//! # PostgreSQL isolation tests (needs a scratch database)
//! TEST_DATABASE_URL=postgres://localhost/marketstall_test \
//!     cargo test -p marketstall-integration-tests -- --ignored
//! ```

#![allow(clippy::missing_panics_doc, clippy::unwrap_used)]

use std::sync::Arc;

use axum::{
    Router,
    body::{Body, to_bytes},
    http::{HeaderMap, Method, Request, StatusCode, header},
};
use secrecy::SecretString;
use serde_json::Value;
use tower::ServiceExt;
use url::Url;

use marketstall_core::{CategoryId, Price, Slug};
use marketstall_storefront::config::{LogFormat, StorefrontConfig};
use marketstall_storefront::db::{MemoryStore, Store};
use marketstall_storefront::models::{Category, NewCategory, NewProduct, Product};
use marketstall_storefront::router;
use marketstall_storefront::state::AppState;

/// Admin key configured on every test app.
pub const ADMIN_KEY: &str = "test-admin-key-7f3c9a1e5b2d8046";

/// Session secret for test apps.
const SESSION_SECRET: &str = "integration-test-session-secret-9e4b1c7a2f6d3058";

/// Configuration for an in-process app. The database URL is never dialled.
#[must_use]
pub fn test_config(admin_key: Option<&str>) -> StorefrontConfig {
    StorefrontConfig {
        database_url: SecretString::from("postgres://unused"),
        host: [127, 0, 0, 1].into(),
        port: 0,
        base_url: Url::parse("http://localhost:3000").unwrap(),
        session_secret: SecretString::from(SESSION_SECRET),
        admin_key: admin_key.map(SecretString::from),
        cors_origin: None,
        sentry_dsn: None,
        sentry_environment: None,
        log_format: LogFormat::Text,
    }
}

/// A router wired to an in-memory store.
pub struct TestApp {
    pub store: Arc<MemoryStore>,
    router: Router,
}

impl Default for TestApp {
    fn default() -> Self {
        Self::new()
    }
}

impl TestApp {
    /// App with the admin API enabled under [`ADMIN_KEY`].
    #[must_use]
    pub fn new() -> Self {
        Self::with_config(test_config(Some(ADMIN_KEY)))
    }

    #[must_use]
    pub fn with_config(config: StorefrontConfig) -> Self {
        let store = Arc::new(MemoryStore::new());
        let state = AppState::new(config, store.clone()).unwrap();
        Self {
            store,
            router: router(state),
        }
    }

    /// Send a request through the router.
    pub async fn send(&self, request: Request<Body>) -> TestResponse {
        let response = self.router.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let headers = response.headers().clone();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let body = serde_json::from_slice(&bytes)
            .unwrap_or_else(|_| Value::String(String::from_utf8_lossy(&bytes).into_owned()));
        TestResponse {
            status,
            headers,
            body,
        }
    }

    pub async fn get(&self, uri: &str) -> TestResponse {
        self.send(Request::get(uri).body(Body::empty()).unwrap()).await
    }

    pub async fn get_with_cookie(&self, uri: &str, cookie: &str) -> TestResponse {
        let request = Request::get(uri)
            .header(header::COOKIE, cookie)
            .body(Body::empty())
            .unwrap();
        self.send(request).await
    }

    /// Send `body` as JSON, optionally with a `Cookie` header.
    pub async fn json(
        &self,
        method: Method,
        uri: &str,
        body: &Value,
        cookie: Option<&str>,
    ) -> TestResponse {
        let mut request = Request::builder()
            .method(method)
            .uri(uri)
            .header(header::CONTENT_TYPE, "application/json");
        if let Some(cookie) = cookie {
            request = request.header(header::COOKIE, cookie);
        }
        self.send(request.body(Body::from(body.to_string())).unwrap())
            .await
    }

    pub async fn post(&self, uri: &str, body: &Value) -> TestResponse {
        self.json(Method::POST, uri, body, None).await
    }

    /// Admin request authenticated with [`ADMIN_KEY`] in the header.
    pub async fn admin(&self, method: Method, uri: &str, body: Option<&Value>) -> TestResponse {
        let request = Request::builder()
            .method(method)
            .uri(uri)
            .header("x-admin-key", ADMIN_KEY)
            .header(header::CONTENT_TYPE, "application/json");
        let body = body.map_or_else(Body::empty, |b| Body::from(b.to_string()));
        self.send(request.body(body).unwrap()).await
    }

    /// Insert a category directly through the store.
    pub async fn category(&self, name: &str) -> Category {
        self.store
            .create_category(&NewCategory {
                name: name.to_owned(),
                slug: Slug::normalize(name).unwrap(),
            })
            .await
            .unwrap()
    }

    /// Insert a product directly through the store.
    pub async fn product(
        &self,
        name: &str,
        cents: i64,
        stock: i32,
        category: CategoryId,
    ) -> Product {
        self.store
            .create_product(&NewProduct {
                name: name.to_owned(),
                slug: Slug::normalize(name).unwrap(),
                description: format!("{name} description"),
                price: Price::from_cents(cents).unwrap(),
                image_url: String::new(),
                stock,
                category_id: category,
            })
            .await
            .unwrap()
    }

    /// Register an account and return its `auth=...` cookie pair.
    pub async fn register(&self, email: &str, password: &str) -> String {
        let response = self
            .post(
                "/api/v1/auth/register",
                &serde_json::json!({ "email": email, "password": password }),
            )
            .await;
        assert_eq!(response.status, StatusCode::CREATED, "{:?}", response.body);
        response.session_cookie().unwrap()
    }
}

/// A buffered response.
#[derive(Debug)]
pub struct TestResponse {
    pub status: StatusCode,
    pub headers: HeaderMap,
    /// Parsed JSON, or the raw text as a JSON string.
    pub body: Value,
}

impl TestResponse {
    /// The raw `Set-Cookie` header for the session cookie.
    #[must_use]
    pub fn set_cookie(&self) -> Option<String> {
        self.headers
            .get_all(header::SET_COOKIE)
            .iter()
            .filter_map(|v| v.to_str().ok())
            .find(|v| v.starts_with("auth="))
            .map(str::to_owned)
    }

    /// `auth=<token>` ready to send back in a `Cookie` header.
    #[must_use]
    pub fn session_cookie(&self) -> Option<String> {
        self.set_cookie()
            .and_then(|c| c.split(';').next().map(str::to_owned))
    }

    /// The `error` message of an error body.
    #[must_use]
    pub fn error(&self) -> &str {
        self.body["error"].as_str().unwrap_or_default()
    }
}
