//! Product repository.
//!
//! Catalog search is assembled with [`QueryBuilder`] from a
//! [`ProductFilter`]; every value is bound, never spliced into the SQL.

use chrono::{DateTime, Utc};
use sqlx::{PgPool, Postgres, QueryBuilder};

use marketstall_core::{CategoryId, Price, ProductId, Slug};

use super::RepositoryError;
use crate::models::{Category, NewProduct, Product, ProductChanges};
use crate::services::catalog::{PageRequest, ProductFilter};

/// Columns of a product joined with its category (`p` and `c`).
const PRODUCT_COLUMNS: &str = r"
    p.id, p.name, p.slug, p.description, p.price_cents, p.image_url, p.stock, p.created_at,
    c.id AS category_id, c.name AS category_name, c.slug AS category_slug
";

const PRODUCT_JOIN: &str =
    " FROM storefront.product p JOIN storefront.category c ON c.id = p.category_id";

#[derive(sqlx::FromRow)]
struct ProductRow {
    id: ProductId,
    name: String,
    slug: String,
    description: String,
    price_cents: i64,
    image_url: String,
    stock: i32,
    created_at: DateTime<Utc>,
    category_id: CategoryId,
    category_name: String,
    category_slug: String,
}

impl TryFrom<ProductRow> for Product {
    type Error = RepositoryError;

    fn try_from(row: ProductRow) -> Result<Self, Self::Error> {
        let price = Price::from_cents(row.price_cents).ok_or_else(|| {
            RepositoryError::DataCorruption(format!(
                "negative price on product {}: {}",
                row.id, row.price_cents
            ))
        })?;

        Ok(Self {
            id: row.id,
            name: row.name,
            slug: Slug::from_stored(row.slug),
            description: row.description,
            price,
            image_url: row.image_url,
            stock: row.stock,
            category: Category {
                id: row.category_id,
                name: row.category_name,
                slug: Slug::from_stored(row.category_slug),
            },
            created_at: row.created_at,
        })
    }
}

fn into_products(rows: Vec<ProductRow>) -> Result<Vec<Product>, RepositoryError> {
    rows.into_iter().map(Product::try_from).collect()
}

/// Escape `LIKE` metacharacters so user text matches literally.
fn escape_like(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for c in text.chars() {
        if matches!(c, '%' | '_' | '\\') {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped
}

/// Append the filter's conditions. Expects a preceding `WHERE TRUE`.
fn push_filter(qb: &mut QueryBuilder<'_, Postgres>, filter: &ProductFilter) {
    if let Some(text) = filter.text() {
        let pattern = format!("%{}%", escape_like(text));
        qb.push(" AND (p.name ILIKE ")
            .push_bind(pattern.clone())
            .push(" OR p.description ILIKE ")
            .push_bind(pattern)
            .push(")");
    }
    if let Some(category) = filter.category() {
        qb.push(" AND (lower(c.slug) = lower(")
            .push_bind(category.to_owned())
            .push(") OR lower(c.name) = lower(")
            .push_bind(category.to_owned())
            .push("))");
    }
}

/// Repository for product database operations.
pub struct ProductRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> ProductRepository<'a> {
    /// Create a new product repository.
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// One page of products matching `filter`, newest first, and the total
    /// number of matches.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if either query fails.
    pub async fn search(
        &self,
        filter: &ProductFilter,
        page: PageRequest,
    ) -> Result<(Vec<Product>, i64), RepositoryError> {
        let mut count =
            QueryBuilder::<Postgres>::new(format!("SELECT COUNT(*){PRODUCT_JOIN} WHERE TRUE"));
        push_filter(&mut count, filter);
        let total = count
            .build_query_scalar::<i64>()
            .fetch_one(self.pool)
            .await?;

        let mut query = QueryBuilder::<Postgres>::new(format!(
            "SELECT {PRODUCT_COLUMNS}{PRODUCT_JOIN} WHERE TRUE"
        ));
        push_filter(&mut query, filter);
        query
            .push(" ORDER BY p.created_at DESC, p.id DESC LIMIT ")
            .push_bind(i64::from(page.limit()))
            .push(" OFFSET ")
            .push_bind(page.offset());

        let rows: Vec<ProductRow> = query.build_query_as().fetch_all(self.pool).await?;

        Ok((into_products(rows)?, total))
    }

    /// All products, newest first.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn list(&self) -> Result<Vec<Product>, RepositoryError> {
        let sql = format!(
            "SELECT {PRODUCT_COLUMNS}{PRODUCT_JOIN} ORDER BY p.created_at DESC, p.id DESC"
        );
        let rows = sqlx::query_as::<_, ProductRow>(&sql)
            .fetch_all(self.pool)
            .await?;

        into_products(rows)
    }

    /// Get a product by ID.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn get(&self, id: ProductId) -> Result<Option<Product>, RepositoryError> {
        let sql = format!("SELECT {PRODUCT_COLUMNS}{PRODUCT_JOIN} WHERE p.id = $1");
        let row = sqlx::query_as::<_, ProductRow>(&sql)
            .bind(id)
            .fetch_optional(self.pool)
            .await?;

        row.map(Product::try_from).transpose()
    }

    /// Get a product by slug.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn get_by_slug(&self, slug: &str) -> Result<Option<Product>, RepositoryError> {
        let sql = format!("SELECT {PRODUCT_COLUMNS}{PRODUCT_JOIN} WHERE p.slug = $1");
        let row = sqlx::query_as::<_, ProductRow>(&sql)
            .bind(slug)
            .fetch_optional(self.pool)
            .await?;

        row.map(Product::try_from).transpose()
    }

    /// Insert a product.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Conflict` if the slug exists or the category
    /// does not. Returns `RepositoryError::Database` for other errors.
    pub async fn create(&self, product: &NewProduct) -> Result<Product, RepositoryError> {
        let sql = format!(
            r"
            WITH p AS (
                INSERT INTO storefront.product
                    (name, slug, description, price_cents, image_url, stock, category_id)
                VALUES ($1, $2, $3, $4, $5, $6, $7)
                RETURNING *
            )
            SELECT {PRODUCT_COLUMNS} FROM p JOIN storefront.category c ON c.id = p.category_id
            "
        );
        let row = sqlx::query_as::<_, ProductRow>(&sql)
            .bind(&product.name)
            .bind(product.slug.as_str())
            .bind(&product.description)
            .bind(product.price.cents())
            .bind(&product.image_url)
            .bind(product.stock)
            .bind(product.category_id)
            .fetch_one(self.pool)
            .await
            .map_err(|e| {
                RepositoryError::from_write(e, "product slug already exists or category is missing")
            })?;

        row.try_into()
    }

    /// Apply a partial update in a single statement.
    ///
    /// Unset fields keep the column's current value, so a concurrent stock
    /// decrement is never overwritten by a patch that does not touch stock.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Conflict` if the new slug is taken or the
    /// new category does not exist.
    pub async fn update(
        &self,
        id: ProductId,
        changes: &ProductChanges,
    ) -> Result<Option<Product>, RepositoryError> {
        let sql = format!(
            r"
            WITH p AS (
                UPDATE storefront.product SET
                    name = COALESCE($2, name),
                    slug = COALESCE($3, slug),
                    description = COALESCE($4, description),
                    price_cents = COALESCE($5, price_cents),
                    image_url = COALESCE($6, image_url),
                    stock = COALESCE($7, stock),
                    category_id = COALESCE($8, category_id)
                WHERE id = $1
                RETURNING *
            )
            SELECT {PRODUCT_COLUMNS} FROM p JOIN storefront.category c ON c.id = p.category_id
            "
        );
        let row = sqlx::query_as::<_, ProductRow>(&sql)
            .bind(id)
            .bind(changes.name.as_deref())
            .bind(changes.slug.as_ref().map(Slug::as_str))
            .bind(changes.description.as_deref())
            .bind(changes.price.map(|p| p.cents()))
            .bind(changes.image_url.as_deref())
            .bind(changes.stock)
            .bind(changes.category_id)
            .fetch_optional(self.pool)
            .await
            .map_err(|e| {
                RepositoryError::from_write(e, "product slug already exists or category is missing")
            })?;

        row.map(Product::try_from).transpose()
    }

    /// Delete a product. Returns `false` if it did not exist.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Conflict` if an order item references it.
    pub async fn delete(&self, id: ProductId) -> Result<bool, RepositoryError> {
        let result = sqlx::query("DELETE FROM storefront.product WHERE id = $1")
            .bind(id)
            .execute(self.pool)
            .await
            .map_err(|e| RepositoryError::from_write(e, "product has been ordered"))?;

        Ok(result.rows_affected() > 0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_escape_like_metacharacters() {
        assert_eq!(escape_like("50%_off\\"), "50\\%\\_off\\\\");
        assert_eq!(escape_like("plain"), "plain");
    }

    #[test]
    fn test_push_filter_binds_values() {
        let filter = ProductFilter::new(Some("mug"), Some("kitchen"));
        let mut qb = QueryBuilder::<Postgres>::new("SELECT 1 WHERE TRUE");
        push_filter(&mut qb, &filter);

        let sql = qb.sql();
        assert!(sql.contains("p.name ILIKE $1"));
        assert!(sql.contains("p.description ILIKE $2"));
        assert!(sql.contains("lower(c.slug) = lower($3)"));
        assert!(sql.contains("lower(c.name) = lower($4)"));
        assert!(!sql.contains("mug"));
    }

    #[test]
    fn test_push_filter_empty_filter_adds_nothing() {
        let mut qb = QueryBuilder::<Postgres>::new("SELECT 1 WHERE TRUE");
        push_filter(&mut qb, &ProductFilter::default());
        assert_eq!(qb.sql(), "SELECT 1 WHERE TRUE");
    }
}
