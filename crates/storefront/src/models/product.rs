//! Product domain types.

use chrono::{DateTime, Utc};
use serde::Serialize;

use marketstall_core::{CategoryId, Price, ProductId, Slug};

use super::Category;

/// A catalog product with its category resolved.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Product {
    pub id: ProductId,
    pub name: String,
    pub slug: Slug,
    pub description: String,
    #[serde(rename = "priceCents")]
    pub price: Price,
    pub image_url: String,
    /// Units on hand. Never negative.
    pub stock: i32,
    pub category: Category,
    pub created_at: DateTime<Utc>,
}

/// A validated product ready to insert.
#[derive(Debug, Clone)]
pub struct NewProduct {
    pub name: String,
    pub slug: Slug,
    pub description: String,
    pub price: Price,
    pub image_url: String,
    pub stock: i32,
    pub category_id: CategoryId,
}

/// A resolved partial update. `None` leaves the column untouched.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProductChanges {
    pub name: Option<String>,
    pub slug: Option<Slug>,
    pub description: Option<String>,
    pub price: Option<Price>,
    pub image_url: Option<String>,
    pub stock: Option<i32>,
    pub category_id: Option<CategoryId>,
}

impl ProductChanges {
    /// True when the patch would not touch any column.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.name.is_none()
            && self.slug.is_none()
            && self.description.is_none()
            && self.price.is_none()
            && self.image_url.is_none()
            && self.stock.is_none()
            && self.category_id.is_none()
    }

    /// Apply the changes to an in-memory product.
    ///
    /// `category` must be the resolved category when `category_id` is set.
    pub fn apply_to(&self, product: &mut Product, category: Option<Category>) {
        if let Some(name) = &self.name {
            product.name.clone_from(name);
        }
        if let Some(slug) = &self.slug {
            product.slug = slug.clone();
        }
        if let Some(description) = &self.description {
            product.description.clone_from(description);
        }
        if let Some(price) = self.price {
            product.price = price;
        }
        if let Some(image_url) = &self.image_url {
            product.image_url.clone_from(image_url);
        }
        if let Some(stock) = self.stock {
            product.stock = stock;
        }
        if let Some(category) = category {
            product.category = category;
        }
    }
}
