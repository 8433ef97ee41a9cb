//! Marketstall storefront library.
//!
//! The HTTP API for catalog browsing, checkout, accounts and admin, exposed
//! as a library so the binary, the CLI and the integration tests share one
//! router and one store abstraction.

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod config;
pub mod db;
pub mod error;
pub mod extract;
pub mod middleware;
pub mod models;
pub mod routes;
pub mod services;
pub mod state;

pub use routes::router;
