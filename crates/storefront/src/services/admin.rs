//! Catalog and order management behind the admin key.

use serde::{Deserialize, Deserializer};
use thiserror::Error;

use marketstall_core::{CategoryId, OrderId, OrderStatus, Price, ProductId, Slug};

use crate::db::{RepositoryError, Store};
use crate::models::{Category, NewCategory, NewProduct, Order, Product, ProductChanges};

/// Errors from admin operations.
#[derive(Debug, Error)]
pub enum AdminError {
    #[error("{0}")]
    Validation(String),

    #[error("category {0} not found")]
    CategoryNotFound(CategoryId),

    #[error("product {0} not found")]
    ProductNotFound(ProductId),

    #[error("order {0} not found")]
    OrderNotFound(OrderId),

    #[error("invalid order status: {0}")]
    InvalidStatus(String),

    #[error(transparent)]
    Repository(#[from] RepositoryError),
}

/// Distinguish an absent field from an explicit `null`.
///
/// With `#[serde(default)]`, absent stays `None`; `null` becomes `Some(None)`.
fn explicit<'de, D, T>(deserializer: D) -> Result<Option<Option<T>>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    Option::<T>::deserialize(deserializer).map(Some)
}

/// Body of `POST /api/v1/admin/categories`.
#[derive(Debug, Deserialize)]
pub struct CreateCategoryRequest {
    pub name: String,
    #[serde(default)]
    pub slug: Option<String>,
}

/// Body of `POST /api/v1/admin/products`.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateProductRequest {
    pub name: String,
    #[serde(default)]
    pub slug: Option<String>,
    #[serde(default)]
    pub description: String,
    pub price_cents: i64,
    #[serde(default)]
    pub image_url: String,
    #[serde(default)]
    pub stock: i32,
    pub category_id: CategoryId,
}

/// Body of `PATCH /api/v1/admin/products/{id}`. Absent fields are untouched.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateProductRequest {
    #[serde(default)]
    pub name: Option<String>,
    /// `null` or `""` re-derives the slug from the name.
    #[serde(default, deserialize_with = "explicit")]
    pub slug: Option<Option<String>>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub price_cents: Option<i64>,
    #[serde(default)]
    pub image_url: Option<String>,
    #[serde(default)]
    pub stock: Option<i32>,
    #[serde(default)]
    pub category_id: Option<CategoryId>,
}

/// Body of `PATCH /api/v1/admin/orders/{id}`.
#[derive(Debug, Deserialize)]
pub struct UpdateOrderStatusRequest {
    pub status: String,
}

fn validate_name(name: &str) -> Result<String, AdminError> {
    let name = name.trim();
    if name.is_empty() {
        return Err(AdminError::Validation("name must not be empty".to_owned()));
    }
    Ok(name.to_owned())
}

fn validate_price(cents: i64) -> Result<Price, AdminError> {
    Price::from_cents(cents)
        .ok_or_else(|| AdminError::Validation("priceCents must not be negative".to_owned()))
}

fn validate_stock(stock: i32) -> Result<i32, AdminError> {
    if stock < 0 {
        return Err(AdminError::Validation("stock must not be negative".to_owned()));
    }
    Ok(stock)
}

/// Normalize `source` into a slug, reporting which field it came from.
fn slug_from(source: &str, field: &str) -> Result<Slug, AdminError> {
    Slug::normalize(source)
        .map_err(|e| AdminError::Validation(format!("{field}: {e}")))
}

/// Slug for a create: normalized explicit slug, else derived from the name.
fn create_slug(slug: Option<&str>, name: &str) -> Result<Slug, AdminError> {
    match slug.map(str::trim).filter(|s| !s.is_empty()) {
        Some(slug) => slug_from(slug, "slug"),
        None => slug_from(name, "name"),
    }
}

/// Admin operations.
pub struct AdminService<'a> {
    store: &'a dyn Store,
}

impl<'a> AdminService<'a> {
    /// Create a new admin service.
    #[must_use]
    pub const fn new(store: &'a dyn Store) -> Self {
        Self { store }
    }

    /// Create a category.
    ///
    /// # Errors
    ///
    /// Returns `AdminError::Validation` for an empty name or slug, or
    /// `Repository(Conflict)` if the slug is taken.
    pub async fn create_category(
        &self,
        request: CreateCategoryRequest,
    ) -> Result<Category, AdminError> {
        let name = validate_name(&request.name)?;
        let slug = create_slug(request.slug.as_deref(), &name)?;

        let category = self.store.create_category(&NewCategory { name, slug }).await?;
        tracing::info!(category_id = %category.id, slug = %category.slug, "Category created");
        Ok(category)
    }

    /// All products, newest first.
    ///
    /// # Errors
    ///
    /// Returns `AdminError::Repository` if the store fails.
    pub async fn list_products(&self) -> Result<Vec<Product>, AdminError> {
        Ok(self.store.list_products().await?)
    }

    /// Create a product.
    ///
    /// # Errors
    ///
    /// Returns `AdminError::Validation` for invalid fields,
    /// `CategoryNotFound` for an unknown category, or `Repository(Conflict)`
    /// if the slug is taken.
    pub async fn create_product(&self, request: CreateProductRequest) -> Result<Product, AdminError> {
        let name = validate_name(&request.name)?;
        let slug = create_slug(request.slug.as_deref(), &name)?;
        let price = validate_price(request.price_cents)?;
        let stock = validate_stock(request.stock)?;

        self.require_category(request.category_id).await?;

        let product = self
            .store
            .create_product(&NewProduct {
                name,
                slug,
                description: request.description,
                price,
                image_url: request.image_url,
                stock,
                category_id: request.category_id,
            })
            .await?;

        tracing::info!(product_id = %product.id, slug = %product.slug, "Product created");
        Ok(product)
    }

    /// Apply a partial update to a product.
    ///
    /// Every check runs before the single write, so a rejected patch changes
    /// nothing.
    ///
    /// # Errors
    ///
    /// Returns `ProductNotFound` or `CategoryNotFound` for unknown ids,
    /// `Validation` for invalid fields, or `Repository(Conflict)` if the new
    /// slug is taken.
    pub async fn update_product(
        &self,
        id: ProductId,
        request: UpdateProductRequest,
    ) -> Result<Product, AdminError> {
        let current = self
            .store
            .get_product(id)
            .await?
            .ok_or(AdminError::ProductNotFound(id))?;

        let name = request.name.as_deref().map(validate_name).transpose()?;
        let slug = match request.slug {
            None => None,
            Some(slug) => {
                let explicit = slug.as_deref().map(str::trim).filter(|s| !s.is_empty());
                let source_name = name.as_deref().unwrap_or(&current.name);
                Some(create_slug(explicit, source_name)?)
            }
        };
        let price = request.price_cents.map(validate_price).transpose()?;
        let stock = request.stock.map(validate_stock).transpose()?;

        if let Some(category_id) = request.category_id {
            self.require_category(category_id).await?;
        }

        let changes = ProductChanges {
            name,
            slug,
            description: request.description,
            price,
            image_url: request.image_url,
            stock,
            category_id: request.category_id,
        };
        if changes.is_empty() {
            return Ok(current);
        }

        let product = self
            .store
            .update_product(id, &changes)
            .await?
            .ok_or(AdminError::ProductNotFound(id))?;

        tracing::info!(product_id = %id, "Product updated");
        Ok(product)
    }

    /// Delete a product.
    ///
    /// # Errors
    ///
    /// Returns `ProductNotFound` for an unknown id, or `Repository(Conflict)`
    /// if an order references the product.
    pub async fn delete_product(&self, id: ProductId) -> Result<(), AdminError> {
        if !self.store.delete_product(id).await? {
            return Err(AdminError::ProductNotFound(id));
        }
        tracing::info!(product_id = %id, "Product deleted");
        Ok(())
    }

    /// All orders with their items, newest first.
    ///
    /// # Errors
    ///
    /// Returns `AdminError::Repository` if the store fails.
    pub async fn list_orders(&self) -> Result<Vec<Order>, AdminError> {
        Ok(self.store.list_orders().await?)
    }

    /// Move an order to `status`.
    ///
    /// # Errors
    ///
    /// Returns `InvalidStatus` for a value the order table does not accept,
    /// or `OrderNotFound` for an unknown id.
    pub async fn update_order_status(
        &self,
        id: OrderId,
        request: UpdateOrderStatusRequest,
    ) -> Result<Order, AdminError> {
        let status: OrderStatus = request
            .status
            .parse()
            .map_err(|_| AdminError::InvalidStatus(request.status.clone()))?;

        let order = self
            .store
            .update_order_status(id, status)
            .await?
            .ok_or(AdminError::OrderNotFound(id))?;

        tracing::info!(order_id = %id, status = %status, "Order status updated");
        Ok(order)
    }

    async fn require_category(&self, id: CategoryId) -> Result<Category, AdminError> {
        self.store
            .get_category(id)
            .await?
            .ok_or(AdminError::CategoryNotFound(id))
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::db::MemoryStore;

    async fn seeded() -> (MemoryStore, Category, Product) {
        let store = MemoryStore::new();
        let admin = AdminService::new(&store);
        let category = admin
            .create_category(CreateCategoryRequest {
                name: "Brew Gear".to_owned(),
                slug: None,
            })
            .await
            .unwrap();
        let product = admin
            .create_product(CreateProductRequest {
                name: "Pour Over Kettle".to_owned(),
                slug: None,
                description: "Gooseneck".to_owned(),
                price_cents: 4500,
                image_url: String::new(),
                stock: 10,
                category_id: category.id,
            })
            .await
            .unwrap();
        (store, category, product)
    }

    fn patch(json: &str) -> UpdateProductRequest {
        serde_json::from_str(json).unwrap()
    }

    #[test]
    fn test_patch_distinguishes_null_from_absent() {
        assert_eq!(patch("{}").slug, None);
        assert_eq!(patch(r#"{"slug": null}"#).slug, Some(None));
        assert_eq!(patch(r#"{"slug": "x"}"#).slug, Some(Some("x".to_owned())));
    }

    #[tokio::test]
    async fn test_create_derives_slug_from_name() {
        let (_, category, product) = seeded().await;
        assert_eq!(category.slug.as_str(), "brew-gear");
        assert_eq!(product.slug.as_str(), "pour-over-kettle");
    }

    #[tokio::test]
    async fn test_create_normalizes_explicit_slug() {
        let (store, category, _) = seeded().await;
        let product = AdminService::new(&store)
            .create_product(CreateProductRequest {
                name: "Scale".to_owned(),
                slug: Some("  Digital SCALE!! ".to_owned()),
                description: String::new(),
                price_cents: 2000,
                image_url: String::new(),
                stock: 1,
                category_id: category.id,
            })
            .await
            .unwrap();
        assert_eq!(product.slug.as_str(), "digital-scale");
    }

    #[tokio::test]
    async fn test_patch_stock_only_touches_stock() {
        let (store, _, product) = seeded().await;

        let updated = AdminService::new(&store)
            .update_product(product.id, patch(r#"{"stock": 5}"#))
            .await
            .unwrap();

        assert_eq!(updated.stock, 5);
        assert_eq!(updated.name, product.name);
        assert_eq!(updated.price, product.price);
        assert_eq!(updated.category, product.category);
        assert_eq!(updated.slug, product.slug);
    }

    #[tokio::test]
    async fn test_cleared_slug_derives_from_patched_name() {
        let (store, _, product) = seeded().await;
        let admin = AdminService::new(&store);

        let renamed = admin
            .update_product(product.id, patch(r#"{"name": "Travel Kettle", "slug": null}"#))
            .await
            .unwrap();
        assert_eq!(renamed.slug.as_str(), "travel-kettle");

        let kept_name = admin
            .update_product(product.id, patch(r#"{"slug": ""}"#))
            .await
            .unwrap();
        assert_eq!(kept_name.slug.as_str(), "travel-kettle");
    }

    #[tokio::test]
    async fn test_rename_without_slug_keeps_slug() {
        let (store, _, product) = seeded().await;
        let updated = AdminService::new(&store)
            .update_product(product.id, patch(r#"{"name": "Renamed"}"#))
            .await
            .unwrap();
        assert_eq!(updated.slug.as_str(), "pour-over-kettle");
    }

    #[tokio::test]
    async fn test_unknown_category_rejects_whole_patch() {
        let (store, _, product) = seeded().await;

        let err = AdminService::new(&store)
            .update_product(product.id, patch(r#"{"stock": 1, "categoryId": 999}"#))
            .await
            .unwrap_err();

        assert!(matches!(err, AdminError::CategoryNotFound(_)));
        let unchanged = store.get_product(product.id).await.unwrap().unwrap();
        assert_eq!(unchanged.stock, 10);
    }

    #[tokio::test]
    async fn test_negative_values_rejected() {
        let (store, _, product) = seeded().await;
        let admin = AdminService::new(&store);

        assert!(matches!(
            admin.update_product(product.id, patch(r#"{"stock": -1}"#)).await,
            Err(AdminError::Validation(_))
        ));
        assert!(matches!(
            admin.update_product(product.id, patch(r#"{"priceCents": -1}"#)).await,
            Err(AdminError::Validation(_))
        ));
    }

    #[tokio::test]
    async fn test_unknown_status_rejected() {
        let (store, _, _) = seeded().await;
        let err = AdminService::new(&store)
            .update_order_status(
                OrderId::new(1),
                UpdateOrderStatusRequest {
                    status: "LOST".to_owned(),
                },
            )
            .await
            .unwrap_err();
        assert!(matches!(err, AdminError::InvalidStatus(_)));
    }

    #[tokio::test]
    async fn test_delete_unknown_product() {
        let store = MemoryStore::new();
        let err = AdminService::new(&store)
            .delete_product(ProductId::new(404))
            .await
            .unwrap_err();
        assert!(matches!(err, AdminError::ProductNotFound(_)));
    }
}
