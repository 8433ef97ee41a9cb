//! Business logic services for the storefront.
//!
//! # Services
//!
//! - `catalog` - Filtered, paginated product browsing
//! - `checkout` - Cart validation and atomic order placement
//! - `auth` - Password accounts and session tokens
//! - `admin` - Catalog and order management
//!
//! Services borrow a `&dyn Store` per request and hold no state of their own.

pub mod admin;
pub mod auth;
pub mod catalog;
pub mod checkout;
