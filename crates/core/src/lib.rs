//! Marketstall Core - Shared domain types.
//!
//! This crate provides the types used across all Marketstall components:
//! - `storefront` - Catalog, checkout, auth and admin HTTP API
//! - `cli` - Command-line tools for migrations and catalog seeding
//!
//! # Architecture
//!
//! The core crate contains only types and pure functions - no I/O, no database
//! access, no HTTP. The optional `postgres` feature adds `sqlx` encoding for the
//! newtypes so they can be bound directly in queries.
//!
//! # Modules
//!
//! - [`types`] - Newtype wrappers for IDs, emails, slugs, prices and statuses

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod types;

pub use types::*;
