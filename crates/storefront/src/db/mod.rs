//! Storage for the storefront.
//!
//! # Database: `marketstall`
//!
//! All tables live in the `storefront` schema:
//!
//! - `category` - Product categories
//! - `product` - Catalog entries with live stock
//! - `user` - Accounts and password hashes
//! - `order` - Placed orders with their frozen totals
//! - `order_item` - Purchased lines with their frozen unit prices
//!
//! Handlers reach storage only through the [`Store`] trait. [`PgStore`] is
//! the production implementation; [`MemoryStore`] backs tests.
//!
//! # Migrations
//!
//! Migrations are stored in `crates/storefront/migrations/` and run via:
//! ```bash
//! cargo run -p marketstall-cli -- migrate
//! ```

pub mod categories;
pub mod memory;
pub mod orders;
pub mod postgres;
pub mod products;
pub mod users;

use std::time::Duration;

use async_trait::async_trait;
use secrecy::ExposeSecret;
use sqlx::PgPool;
use sqlx::postgres::PgPoolOptions;
use thiserror::Error;

use marketstall_core::{CategoryId, Email, OrderId, OrderStatus, ProductId, UserId};

use crate::models::{
    Category, NewCategory, NewOrder, NewProduct, Order, Product, ProductChanges, User,
};
use crate::services::catalog::{PageRequest, ProductFilter};
use crate::services::checkout::CheckoutError;

pub use categories::CategoryRepository;
pub use memory::MemoryStore;
pub use orders::OrderRepository;
pub use postgres::PgStore;
pub use products::ProductRepository;
pub use users::UserRepository;

/// Errors that can occur during storage operations.
#[derive(Debug, Error)]
pub enum RepositoryError {
    /// Database error from sqlx.
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Data in the database is corrupted or invalid.
    #[error("data corruption: {0}")]
    DataCorruption(String),

    /// Constraint violation (e.g., unique slug, referenced row).
    #[error("constraint violation: {0}")]
    Conflict(String),
}

impl RepositoryError {
    /// Map unique and foreign-key violations to `Conflict` with `message`.
    pub(crate) fn from_write(e: sqlx::Error, message: &str) -> Self {
        if let sqlx::Error::Database(ref db_err) = e
            && (db_err.is_unique_violation() || db_err.is_foreign_key_violation())
        {
            return Self::Conflict(message.to_owned());
        }
        Self::Database(e)
    }
}

/// Everything the handlers need from storage.
///
/// Implementations must make [`Store::place_order`] atomic: the stock read
/// it validates against and the writes it commits form one unit with
/// respect to other checkouts.
#[async_trait]
pub trait Store: Send + Sync {
    /// Check that the backing store is reachable.
    async fn ping(&self) -> Result<(), RepositoryError>;

    // Categories
    async fn list_categories(&self) -> Result<Vec<Category>, RepositoryError>;
    async fn get_category(&self, id: CategoryId) -> Result<Option<Category>, RepositoryError>;
    /// Returns `Conflict` if the slug is taken.
    async fn create_category(&self, category: &NewCategory) -> Result<Category, RepositoryError>;

    // Products
    /// One page of matching products, newest first, plus the match count.
    async fn search_products(
        &self,
        filter: &ProductFilter,
        page: PageRequest,
    ) -> Result<(Vec<Product>, i64), RepositoryError>;
    async fn list_products(&self) -> Result<Vec<Product>, RepositoryError>;
    async fn get_product(&self, id: ProductId) -> Result<Option<Product>, RepositoryError>;
    async fn get_product_by_slug(&self, slug: &str) -> Result<Option<Product>, RepositoryError>;
    /// Returns `Conflict` if the slug is taken or the category is gone.
    async fn create_product(&self, product: &NewProduct) -> Result<Product, RepositoryError>;
    /// Apply `changes` in one write. `None` when the product does not exist.
    async fn update_product(
        &self,
        id: ProductId,
        changes: &ProductChanges,
    ) -> Result<Option<Product>, RepositoryError>;
    /// `false` when the product does not exist. Returns `Conflict` if an
    /// order references it.
    async fn delete_product(&self, id: ProductId) -> Result<bool, RepositoryError>;

    // Users
    /// Returns `Conflict` if the email is registered.
    async fn create_user(&self, email: &Email, password_hash: &str)
    -> Result<User, RepositoryError>;
    async fn get_user(&self, id: UserId) -> Result<Option<User>, RepositoryError>;
    /// The user and their password hash, for login.
    async fn get_password_hash(
        &self,
        email: &Email,
    ) -> Result<Option<(User, String)>, RepositoryError>;

    // Orders
    /// Validate the cart against current stock and commit the order, its
    /// items and the stock decrements atomically.
    async fn place_order(&self, order: &NewOrder) -> Result<Order, CheckoutError>;
    async fn orders_by_email(&self, email: &Email) -> Result<Vec<Order>, RepositoryError>;
    /// Orders placed by the user's id or under the user's email.
    async fn orders_for_user(&self, user: &User) -> Result<Vec<Order>, RepositoryError>;
    async fn list_orders(&self) -> Result<Vec<Order>, RepositoryError>;
    /// `None` when the order does not exist.
    async fn update_order_status(
        &self,
        id: OrderId,
        status: OrderStatus,
    ) -> Result<Option<Order>, RepositoryError>;
}

/// Create a `PostgreSQL` connection pool with sensible defaults.
///
/// # Arguments
///
/// * `database_url` - `PostgreSQL` connection string (wrapped in `SecretString`)
///
/// # Errors
///
/// Returns `sqlx::Error` if the connection cannot be established.
pub async fn create_pool(database_url: &secrecy::SecretString) -> Result<PgPool, sqlx::Error> {
    PgPoolOptions::new()
        .max_connections(10)
        .min_connections(2)
        .acquire_timeout(Duration::from_secs(10))
        .connect(database_url.expose_secret())
        .await
}
