//! Order repository, including the checkout transaction.

use std::collections::HashMap;
use std::fmt::Display;

use chrono::{DateTime, Utc};
use sqlx::PgPool;

use marketstall_core::{Email, OrderId, OrderItemId, OrderStatus, Price, ProductId, UserId};

use super::RepositoryError;
use crate::models::{NewOrder, Order, OrderItem, User};
use crate::services::checkout::{self, CheckoutError, ProductSnapshot};

const ORDER_COLUMNS: &str = "id, user_id, user_email, total_cents, status, created_at";

#[derive(sqlx::FromRow)]
struct OrderRow {
    id: OrderId,
    user_id: Option<UserId>,
    user_email: Option<String>,
    total_cents: i64,
    status: String,
    created_at: DateTime<Utc>,
}

impl OrderRow {
    fn into_order(self, items: Vec<OrderItem>) -> Result<Order, RepositoryError> {
        let user_email = self
            .user_email
            .as_deref()
            .map(Email::parse)
            .transpose()
            .map_err(|e| {
                RepositoryError::DataCorruption(format!("invalid email on order {}: {e}", self.id))
            })?;
        let status = self
            .status
            .parse::<OrderStatus>()
            .map_err(|e| RepositoryError::DataCorruption(e.to_string()))?;

        Ok(Order {
            id: self.id,
            user_id: self.user_id,
            user_email,
            total: stored_price(self.total_cents)?,
            status,
            created_at: self.created_at,
            items,
        })
    }
}

#[derive(sqlx::FromRow)]
struct OrderItemRow {
    id: OrderItemId,
    order_id: OrderId,
    product_id: ProductId,
    quantity: i32,
    price_cents: i64,
}

impl TryFrom<OrderItemRow> for OrderItem {
    type Error = RepositoryError;

    fn try_from(row: OrderItemRow) -> Result<Self, Self::Error> {
        Ok(Self {
            id: row.id,
            order_id: row.order_id,
            product_id: row.product_id,
            quantity: row.quantity,
            price: stored_price(row.price_cents)?,
        })
    }
}

#[derive(sqlx::FromRow)]
struct SnapshotRow {
    id: ProductId,
    name: String,
    price_cents: i64,
    stock: i32,
}

impl TryFrom<SnapshotRow> for ProductSnapshot {
    type Error = RepositoryError;

    fn try_from(row: SnapshotRow) -> Result<Self, Self::Error> {
        Ok(Self {
            id: row.id,
            name: row.name,
            price: stored_price(row.price_cents)?,
            stock: row.stock,
        })
    }
}

fn stored_price(cents: i64) -> Result<Price, RepositoryError> {
    Price::from_cents(cents)
        .ok_or_else(|| RepositoryError::DataCorruption(format!("negative amount: {cents}")))
}

/// Log the cause and collapse it into the generic checkout failure.
fn commit_failed(e: impl Display) -> CheckoutError {
    tracing::error!(error = %e, "Checkout commit failed");
    CheckoutError::Failed
}

/// Repository for order database operations.
pub struct OrderRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> OrderRepository<'a> {
    /// Create a new order repository.
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// Validate the cart and commit the order in one transaction.
    ///
    /// The cart's product rows are locked with `FOR UPDATE` in ascending id
    /// order before validation, so a concurrent checkout of the same
    /// products waits here and then validates against the committed stock.
    /// Dropping the transaction on any early return rolls everything back.
    ///
    /// # Errors
    ///
    /// Returns the validation error from [`checkout::plan`], or
    /// `CheckoutError::Failed` if any statement or the commit fails.
    pub async fn place(&self, order: &NewOrder) -> Result<Order, CheckoutError> {
        if order.lines.is_empty() {
            return Err(CheckoutError::EmptyCart);
        }

        let mut tx = self.pool.begin().await.map_err(commit_failed)?;

        let ids: Vec<i32> = checkout::lock_order(&order.lines)
            .into_iter()
            .map(i32::from)
            .collect();
        let snapshot = sqlx::query_as::<_, SnapshotRow>(
            r"
            SELECT id, name, price_cents, stock
            FROM storefront.product
            WHERE id = ANY($1)
            ORDER BY id
            FOR UPDATE
            ",
        )
        .bind(&ids)
        .fetch_all(&mut *tx)
        .await
        .map_err(commit_failed)?
        .into_iter()
        .map(ProductSnapshot::try_from)
        .collect::<Result<Vec<_>, _>>()
        .map_err(commit_failed)?;

        let plan = checkout::plan(&order.lines, &snapshot)?;

        let order_row = sqlx::query_as::<_, OrderRow>(&format!(
            r#"
            INSERT INTO storefront."order" (user_id, user_email, total_cents, status)
            VALUES ($1, $2, $3, $4)
            RETURNING {ORDER_COLUMNS}
            "#
        ))
        .bind(order.user_id)
        .bind(order.user_email.as_ref())
        .bind(plan.total.cents())
        .bind(OrderStatus::Pending.as_str())
        .fetch_one(&mut *tx)
        .await
        .map_err(commit_failed)?;

        let mut items = Vec::with_capacity(plan.items.len());
        for item in &plan.items {
            let row = sqlx::query_as::<_, OrderItemRow>(
                r"
                INSERT INTO storefront.order_item (order_id, product_id, quantity, price_cents)
                VALUES ($1, $2, $3, $4)
                RETURNING id, order_id, product_id, quantity, price_cents
                ",
            )
            .bind(order_row.id)
            .bind(item.product_id)
            .bind(item.quantity)
            .bind(item.price.cents())
            .fetch_one(&mut *tx)
            .await
            .map_err(commit_failed)?;

            let decremented = sqlx::query(
                r"
                UPDATE storefront.product
                SET stock = stock - $1
                WHERE id = $2 AND stock >= $1
                ",
            )
            .bind(item.quantity)
            .bind(item.product_id)
            .execute(&mut *tx)
            .await
            .map_err(commit_failed)?;

            if decremented.rows_affected() != 1 {
                return Err(commit_failed(format_args!(
                    "stock guard rejected decrement for product {}",
                    item.product_id
                )));
            }

            items.push(OrderItem::try_from(row).map_err(commit_failed)?);
        }

        // Decoded inside the transaction so a bad row rolls back.
        let placed = order_row.into_order(items).map_err(commit_failed)?;
        tx.commit().await.map_err(commit_failed)?;

        Ok(placed)
    }

    /// Orders placed under `email`, newest first.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if a query fails.
    pub async fn list_by_email(&self, email: &Email) -> Result<Vec<Order>, RepositoryError> {
        let rows = sqlx::query_as::<_, OrderRow>(&format!(
            r#"
            SELECT {ORDER_COLUMNS}
            FROM storefront."order"
            WHERE lower(user_email) = lower($1)
            ORDER BY created_at DESC, id DESC
            "#
        ))
        .bind(email)
        .fetch_all(self.pool)
        .await?;

        self.with_items(rows).await
    }

    /// Orders placed by `user` while signed in or under their email.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if a query fails.
    pub async fn list_for_user(&self, user: &User) -> Result<Vec<Order>, RepositoryError> {
        let rows = sqlx::query_as::<_, OrderRow>(&format!(
            r#"
            SELECT {ORDER_COLUMNS}
            FROM storefront."order"
            WHERE user_id = $1 OR lower(user_email) = lower($2)
            ORDER BY created_at DESC, id DESC
            "#
        ))
        .bind(user.id)
        .bind(&user.email)
        .fetch_all(self.pool)
        .await?;

        self.with_items(rows).await
    }

    /// Every order, newest first.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if a query fails.
    pub async fn list(&self) -> Result<Vec<Order>, RepositoryError> {
        let rows = sqlx::query_as::<_, OrderRow>(&format!(
            r#"
            SELECT {ORDER_COLUMNS}
            FROM storefront."order"
            ORDER BY created_at DESC, id DESC
            "#
        ))
        .fetch_all(self.pool)
        .await?;

        self.with_items(rows).await
    }

    /// Set an order's status. Returns `None` if the order does not exist.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if a query fails.
    pub async fn update_status(
        &self,
        id: OrderId,
        status: OrderStatus,
    ) -> Result<Option<Order>, RepositoryError> {
        let row = sqlx::query_as::<_, OrderRow>(&format!(
            r#"
            UPDATE storefront."order"
            SET status = $2
            WHERE id = $1
            RETURNING {ORDER_COLUMNS}
            "#
        ))
        .bind(id)
        .bind(status.as_str())
        .fetch_optional(self.pool)
        .await?;

        match row {
            Some(row) => Ok(self.with_items(vec![row]).await?.pop()),
            None => Ok(None),
        }
    }

    /// Attach line items to order rows with one query.
    async fn with_items(&self, rows: Vec<OrderRow>) -> Result<Vec<Order>, RepositoryError> {
        if rows.is_empty() {
            return Ok(Vec::new());
        }

        let ids: Vec<i32> = rows.iter().map(|r| r.id.as_i32()).collect();
        let item_rows = sqlx::query_as::<_, OrderItemRow>(
            r"
            SELECT id, order_id, product_id, quantity, price_cents
            FROM storefront.order_item
            WHERE order_id = ANY($1)
            ORDER BY id
            ",
        )
        .bind(&ids)
        .fetch_all(self.pool)
        .await?;

        let mut by_order: HashMap<OrderId, Vec<OrderItem>> = HashMap::new();
        for row in item_rows {
            by_order
                .entry(row.order_id)
                .or_default()
                .push(OrderItem::try_from(row)?);
        }

        rows.into_iter()
            .map(|row| {
                let items = by_order.remove(&row.id).unwrap_or_default();
                row.into_order(items)
            })
            .collect()
    }
}
