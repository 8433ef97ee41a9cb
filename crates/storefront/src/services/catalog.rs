//! Catalog browsing: filtered, paginated product listings.
//!
//! The filter is a typed value shared by every store. `PostgreSQL` turns it
//! into `WHERE` clauses, the in-memory store evaluates [`ProductFilter::matches`]
//! directly, and both follow the same rules:
//!
//! - `text` matches when it is a case-insensitive substring of the name or
//!   the description
//! - `category` matches when it equals the category slug or name, ignoring case
//! - both present: a product must satisfy both

use serde::Serialize;

use crate::db::{RepositoryError, Store};
use crate::models::{Category, Product};

/// Typed product filter. Blank inputs are dropped at construction; search
/// text is otherwise kept exactly as typed.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProductFilter {
    text: Option<String>,
    category: Option<String>,
}

impl ProductFilter {
    /// Build a filter from raw query inputs.
    #[must_use]
    pub fn new(text: Option<&str>, category: Option<&str>) -> Self {
        Self {
            text: text.filter(|t| !t.trim().is_empty()).map(str::to_owned),
            category: category
                .map(str::trim)
                .filter(|c| !c.is_empty())
                .map(str::to_owned),
        }
    }

    /// Free-text search term.
    #[must_use]
    pub fn text(&self) -> Option<&str> {
        self.text.as_deref()
    }

    /// Category slug or display name.
    #[must_use]
    pub fn category(&self) -> Option<&str> {
        self.category.as_deref()
    }

    /// Evaluate the filter against a product.
    #[must_use]
    pub fn matches(&self, product: &Product) -> bool {
        let text_ok = self.text().is_none_or(|text| {
            let needle = text.to_lowercase();
            product.name.to_lowercase().contains(&needle)
                || product.description.to_lowercase().contains(&needle)
        });
        let category_ok = self
            .category()
            .is_none_or(|category| product.category.matches(category));

        text_ok && category_ok
    }
}

/// Validated page position.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageRequest {
    page: u32,
    limit: u32,
}

impl PageRequest {
    /// Page size when none is requested.
    pub const DEFAULT_LIMIT: u32 = 9;
    /// Largest page size a client may request.
    pub const MAX_LIMIT: u32 = 24;

    /// Build a page request, defaulting and clamping out-of-range values.
    #[must_use]
    pub fn new(page: Option<i64>, limit: Option<i64>) -> Self {
        let page = page
            .unwrap_or(1)
            .clamp(1, i64::from(u32::MAX));
        let limit = limit.map_or(i64::from(Self::DEFAULT_LIMIT), |l| {
            l.clamp(1, i64::from(Self::MAX_LIMIT))
        });

        Self {
            page: u32::try_from(page).unwrap_or(1),
            limit: u32::try_from(limit).unwrap_or(Self::DEFAULT_LIMIT),
        }
    }

    /// 1-based page number.
    #[must_use]
    pub const fn page(&self) -> u32 {
        self.page
    }

    /// Items per page, within `1..=MAX_LIMIT`.
    #[must_use]
    pub const fn limit(&self) -> u32 {
        self.limit
    }

    /// Rows to skip.
    #[must_use]
    pub fn offset(&self) -> i64 {
        i64::from(self.page - 1) * i64::from(self.limit)
    }

    /// `max(1, ceil(total / limit))`.
    #[must_use]
    pub fn page_count(&self, total: i64) -> u32 {
        let total = total.max(0);
        let pages = (total + i64::from(self.limit) - 1) / i64::from(self.limit);
        u32::try_from(pages).unwrap_or(u32::MAX).max(1)
    }
}

impl Default for PageRequest {
    fn default() -> Self {
        Self::new(None, None)
    }
}

/// One page of a product listing.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProductPage {
    pub items: Vec<Product>,
    pub total: i64,
    pub page: u32,
    pub limit: u32,
    pub page_count: u32,
}

/// Read-only catalog operations.
pub struct CatalogService<'a> {
    store: &'a dyn Store,
}

impl<'a> CatalogService<'a> {
    /// Create a new catalog service.
    #[must_use]
    pub const fn new(store: &'a dyn Store) -> Self {
        Self { store }
    }

    /// Search products, newest first.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError` if the store query fails.
    pub async fn search(
        &self,
        filter: &ProductFilter,
        page: PageRequest,
    ) -> Result<ProductPage, RepositoryError> {
        let (items, total) = self.store.search_products(filter, page).await?;

        Ok(ProductPage {
            items,
            total,
            page: page.page(),
            limit: page.limit(),
            page_count: page.page_count(total),
        })
    }

    /// Look up a product by slug.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError` if the store query fails.
    pub async fn product(&self, slug: &str) -> Result<Option<Product>, RepositoryError> {
        self.store.get_product_by_slug(slug).await
    }

    /// All categories, ordered by name.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError` if the store query fails.
    pub async fn categories(&self) -> Result<Vec<Category>, RepositoryError> {
        self.store.list_categories().await
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use chrono::Utc;
    use marketstall_core::{CategoryId, Price, ProductId, Slug};

    use super::*;

    fn category(name: &str, slug: &str) -> Category {
        Category {
            id: CategoryId::new(1),
            name: name.to_owned(),
            slug: Slug::from_stored(slug.to_owned()),
        }
    }

    fn product(name: &str, description: &str, category: Category) -> Product {
        Product {
            id: ProductId::new(1),
            name: name.to_owned(),
            slug: Slug::normalize(name).unwrap(),
            description: description.to_owned(),
            price: Price::from_cents(1200).unwrap(),
            image_url: String::new(),
            stock: 3,
            category,
            created_at: Utc::now(),
        }
    }

    #[test]
    fn test_blank_inputs_are_dropped() {
        let filter = ProductFilter::new(Some("   "), Some(""));
        assert_eq!(filter, ProductFilter::default());
    }

    #[test]
    fn test_search_text_keeps_surrounding_spaces() {
        let filter = ProductFilter::new(Some(" blend"), Some("  beans "));
        assert_eq!(filter.text(), Some(" blend"));
        assert_eq!(filter.category(), Some("beans"));

        let beans = category("Beans", "beans");
        assert!(ProductFilter::new(Some(" blend"), None)
            .matches(&product("House Blend", "Chocolate notes", beans.clone())));
        assert!(!ProductFilter::new(Some(" blend"), None)
            .matches(&product("Blend No. 2", "Chocolate notes", beans)));
    }

    #[test]
    fn test_text_matches_name_or_description() {
        let p = product("Ethiopia Guji", "Bright and floral", category("Beans", "beans"));
        assert!(ProductFilter::new(Some("guji"), None).matches(&p));
        assert!(ProductFilter::new(Some("FLORAL"), None).matches(&p));
        assert!(!ProductFilter::new(Some("chocolate"), None).matches(&p));
    }

    #[test]
    fn test_category_matches_slug_or_name() {
        let p = product("Kettle", "Gooseneck", category("Brew Gear", "brew-gear"));
        assert!(ProductFilter::new(None, Some("brew-gear")).matches(&p));
        assert!(ProductFilter::new(None, Some("brew gear")).matches(&p));
        assert!(!ProductFilter::new(None, Some("beans")).matches(&p));
    }

    #[test]
    fn test_text_and_category_combine_with_and() {
        let p = product("Kettle", "Gooseneck", category("Brew Gear", "brew-gear"));
        assert!(ProductFilter::new(Some("kettle"), Some("brew-gear")).matches(&p));
        assert!(!ProductFilter::new(Some("kettle"), Some("beans")).matches(&p));
        assert!(!ProductFilter::new(Some("grinder"), Some("brew-gear")).matches(&p));
    }

    #[test]
    fn test_page_request_defaults() {
        let page = PageRequest::new(None, None);
        assert_eq!(page.page(), 1);
        assert_eq!(page.limit(), 9);
        assert_eq!(page.offset(), 0);
    }

    #[test]
    fn test_page_request_clamps() {
        assert_eq!(PageRequest::new(Some(0), Some(0)).limit(), 1);
        assert_eq!(PageRequest::new(Some(-4), None).page(), 1);
        assert_eq!(PageRequest::new(None, Some(500)).limit(), 24);
        assert_eq!(PageRequest::new(Some(3), Some(10)).offset(), 20);
    }

    #[test]
    fn test_page_count() {
        let page = PageRequest::new(None, Some(9));
        assert_eq!(page.page_count(0), 1);
        assert_eq!(page.page_count(9), 1);
        assert_eq!(page.page_count(10), 2);
        assert_eq!(page.page_count(18), 2);
        assert_eq!(page.page_count(19), 3);
    }

    #[test]
    fn test_page_count_matches_ceiling_for_every_limit() {
        for limit in 1..=24_i64 {
            let page = PageRequest::new(None, Some(limit));
            for total in 0..=100_i64 {
                let expected = u32::try_from(((total + limit - 1) / limit).max(1)).unwrap();
                assert_eq!(page.page_count(total), expected, "total={total} limit={limit}");
            }
        }
    }
}
