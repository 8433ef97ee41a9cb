//! HTTP middleware stack for the storefront.
//!
//! # Middleware Order (outermost first)
//!
//! 1. Sentry layers (capture errors, one hub per request)
//! 2. `TraceLayer` (request span with method, uri, status, latency)
//! 3. Request ID (record on span, Sentry scope, response header)
//! 4. CORS (only when an origin is configured)
//! 5. Security headers
//!
//! Authentication is not a layer: handlers opt in with the `OptionalAuth`,
//! `RequireAuth`, and `RequireAdmin` extractors.

pub mod admin;
pub mod auth;
pub mod request_id;
pub mod security_headers;

pub use admin::RequireAdmin;
pub use auth::{OptionalAuth, RequireAuth, removal_cookie, session_cookie};
pub use request_id::request_id_middleware;
pub use security_headers::security_headers_middleware;
