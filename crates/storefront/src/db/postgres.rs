//! `PostgreSQL` implementation of [`Store`].

use async_trait::async_trait;
use sqlx::PgPool;

use marketstall_core::{CategoryId, Email, OrderId, OrderStatus, ProductId, UserId};

use super::{
    CategoryRepository, OrderRepository, ProductRepository, RepositoryError, Store,
    UserRepository,
};
use crate::models::{
    Category, NewCategory, NewOrder, NewProduct, Order, Product, ProductChanges, User,
};
use crate::services::catalog::{PageRequest, ProductFilter};
use crate::services::checkout::CheckoutError;

/// Store backed by a `PostgreSQL` pool.
#[derive(Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    #[must_use]
    pub const fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl Store for PgStore {
    async fn ping(&self) -> Result<(), RepositoryError> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }

    async fn list_categories(&self) -> Result<Vec<Category>, RepositoryError> {
        CategoryRepository::new(&self.pool).list().await
    }

    async fn get_category(&self, id: CategoryId) -> Result<Option<Category>, RepositoryError> {
        CategoryRepository::new(&self.pool).get(id).await
    }

    async fn create_category(&self, category: &NewCategory) -> Result<Category, RepositoryError> {
        CategoryRepository::new(&self.pool).create(category).await
    }

    async fn search_products(
        &self,
        filter: &ProductFilter,
        page: PageRequest,
    ) -> Result<(Vec<Product>, i64), RepositoryError> {
        ProductRepository::new(&self.pool).search(filter, page).await
    }

    async fn list_products(&self) -> Result<Vec<Product>, RepositoryError> {
        ProductRepository::new(&self.pool).list().await
    }

    async fn get_product(&self, id: ProductId) -> Result<Option<Product>, RepositoryError> {
        ProductRepository::new(&self.pool).get(id).await
    }

    async fn get_product_by_slug(&self, slug: &str) -> Result<Option<Product>, RepositoryError> {
        ProductRepository::new(&self.pool).get_by_slug(slug).await
    }

    async fn create_product(&self, product: &NewProduct) -> Result<Product, RepositoryError> {
        ProductRepository::new(&self.pool).create(product).await
    }

    async fn update_product(
        &self,
        id: ProductId,
        changes: &ProductChanges,
    ) -> Result<Option<Product>, RepositoryError> {
        ProductRepository::new(&self.pool).update(id, changes).await
    }

    async fn delete_product(&self, id: ProductId) -> Result<bool, RepositoryError> {
        ProductRepository::new(&self.pool).delete(id).await
    }

    async fn create_user(
        &self,
        email: &Email,
        password_hash: &str,
    ) -> Result<User, RepositoryError> {
        UserRepository::new(&self.pool)
            .create_with_password(email, password_hash)
            .await
    }

    async fn get_user(&self, id: UserId) -> Result<Option<User>, RepositoryError> {
        UserRepository::new(&self.pool).get_by_id(id).await
    }

    async fn get_password_hash(
        &self,
        email: &Email,
    ) -> Result<Option<(User, String)>, RepositoryError> {
        UserRepository::new(&self.pool).get_password_hash(email).await
    }

    async fn place_order(&self, order: &NewOrder) -> Result<Order, CheckoutError> {
        OrderRepository::new(&self.pool).place(order).await
    }

    async fn orders_by_email(&self, email: &Email) -> Result<Vec<Order>, RepositoryError> {
        OrderRepository::new(&self.pool).list_by_email(email).await
    }

    async fn orders_for_user(&self, user: &User) -> Result<Vec<Order>, RepositoryError> {
        OrderRepository::new(&self.pool).list_for_user(user).await
    }

    async fn list_orders(&self) -> Result<Vec<Order>, RepositoryError> {
        OrderRepository::new(&self.pool).list().await
    }

    async fn update_order_status(
        &self,
        id: OrderId,
        status: OrderStatus,
    ) -> Result<Option<Order>, RepositoryError> {
        OrderRepository::new(&self.pool)
            .update_status(id, status)
            .await
    }
}
