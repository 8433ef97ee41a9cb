//! HTTP route handlers for the storefront API.
//!
//! # Route Structure
//!
//! ```text
//! GET    /health                          - Liveness
//! GET    /health/ready                    - Readiness (store reachable)
//!
//! # Catalog
//! GET    /api/v1/products                 - Filtered, paginated listing
//! GET    /api/v1/products/{slug}          - Product detail
//! GET    /api/v1/categories               - Category list
//!
//! # Checkout and orders
//! POST   /api/v1/checkout                 - Place an order (session optional)
//! GET    /api/v1/orders/by-email/{email}  - Orders for an email
//! GET    /api/v1/orders/by-email?email=   - Same, query form
//! GET    /api/v1/orders/my                - Orders for the signed-in user
//!
//! # Auth
//! POST   /api/v1/auth/register            - Register and sign in
//! POST   /api/v1/auth/login               - Sign in
//! GET    /api/v1/auth/me                  - Current user or null
//! POST   /api/v1/auth/logout              - Clear the session cookie
//!
//! # Admin (x-admin-key header or adminKey query)
//! GET    /api/v1/admin/products           - All products
//! POST   /api/v1/admin/products           - Create product
//! PATCH  /api/v1/admin/products/{id}      - Partial update
//! DELETE /api/v1/admin/products/{id}      - Delete product
//! POST   /api/v1/admin/categories         - Create category
//! GET    /api/v1/admin/orders             - All orders
//! PATCH  /api/v1/admin/orders/{id}        - Change order status
//! ```

pub mod admin;
pub mod auth;
pub mod checkout;
pub mod health;
pub mod orders;
pub mod products;

use axum::{
    Router,
    http::{HeaderName, HeaderValue, Method, header},
    middleware::from_fn,
    routing::{get, patch, post},
};
use tower_http::{
    cors::CorsLayer,
    trace::{DefaultOnResponse, OnResponse, TraceLayer},
};
use tracing::Span;

use crate::middleware::{
    admin::ADMIN_KEY_HEADER, request_id_middleware, security_headers_middleware,
};
use crate::state::AppState;

/// Create the auth routes router.
fn auth_routes() -> Router<AppState> {
    Router::new()
        .route("/register", post(auth::register))
        .route("/login", post(auth::login))
        .route("/me", get(auth::me))
        .route("/logout", post(auth::logout))
}

/// Create the order history routes router.
fn order_routes() -> Router<AppState> {
    Router::new()
        .route("/by-email", get(orders::by_email_query))
        .route("/by-email/{email}", get(orders::by_email_path))
        .route("/my", get(orders::mine))
}

/// Create the admin routes router.
fn admin_routes() -> Router<AppState> {
    Router::new()
        .route(
            "/products",
            get(admin::list_products).post(admin::create_product),
        )
        .route(
            "/products/{id}",
            patch(admin::update_product).delete(admin::delete_product),
        )
        .route("/categories", post(admin::create_category))
        .route("/orders", get(admin::list_orders))
        .route("/orders/{id}", patch(admin::update_order_status))
}

/// Create the versioned API router.
fn api_routes() -> Router<AppState> {
    Router::new()
        .route("/products", get(products::index))
        .route("/products/{slug}", get(products::show))
        .route("/categories", get(products::categories))
        .route("/checkout", post(checkout::place))
        .nest("/orders", order_routes())
        .nest("/auth", auth_routes())
        .nest("/admin", admin_routes())
}

/// Credentialed CORS for a single configured origin.
fn cors_layer(origin: &str) -> Option<CorsLayer> {
    let Ok(origin) = HeaderValue::from_str(origin) else {
        tracing::warn!(origin, "Ignoring unparseable CORS origin");
        return None;
    };

    Some(
        CorsLayer::new()
            .allow_origin(origin)
            .allow_credentials(true)
            .allow_methods([Method::GET, Method::POST, Method::PATCH, Method::DELETE])
            .allow_headers([
                header::CONTENT_TYPE,
                HeaderName::from_static(ADMIN_KEY_HEADER),
            ]),
    )
}

/// Build the full application router with its middleware stack.
///
/// Sentry layers are not included; the binary adds them outermost.
pub fn router(state: AppState) -> Router {
    let mut app = Router::new()
        .route("/health", get(health::health))
        .route("/health/ready", get(health::readiness))
        .nest("/api/v1", api_routes())
        .layer(from_fn(security_headers_middleware));

    if let Some(cors) = state.config().cors_origin.as_deref().and_then(cors_layer) {
        app = app.layer(cors);
    }

    app.layer(from_fn(request_id_middleware))
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(|request: &axum::http::Request<_>| {
                    tracing::info_span!(
                        "http_request",
                        method = %request.method(),
                        uri = %request.uri(),
                        request_id = tracing::field::Empty,
                        status = tracing::field::Empty,
                        latency_ms = tracing::field::Empty,
                    )
                })
                .on_response(
                    |response: &axum::http::Response<_>,
                     latency: std::time::Duration,
                     span: &Span| {
                        span.record("status", response.status().as_u16());
                        span.record(
                            "latency_ms",
                            u64::try_from(latency.as_millis()).unwrap_or(u64::MAX),
                        );
                        DefaultOnResponse::default().on_response(response, latency, span);
                    },
                ),
        )
        .with_state(state)
}
