//! Checkout: validate a cart against a stock snapshot, then place the order.
//!
//! Validation is a pure function ([`plan`]) over a snapshot of the cart's
//! products. Each store calls it from inside its atomic unit (a transaction
//! holding row locks for `PostgreSQL`, the state mutex for the in-memory
//! store), so the snapshot it validates is the one it commits against.

use std::collections::HashMap;

use marketstall_core::{Email, EmailError, Price, ProductId};
use thiserror::Error;
use tracing::instrument;

use crate::db::Store;
use crate::models::{CartLine, NewOrder, Order, User};

/// Errors that can occur while placing an order.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum CheckoutError {
    #[error("cart is empty")]
    EmptyCart,

    #[error("product {0} not found")]
    ProductNotFound(ProductId),

    #[error("quantity must be at least 1")]
    InvalidQuantity,

    #[error("insufficient stock for {0}")]
    InsufficientStock(String),

    #[error("invalid email: {0}")]
    InvalidEmail(#[from] EmailError),

    /// The commit did not go through. Nothing was persisted.
    #[error("checkout failed")]
    Failed,
}

/// The fields of a product that checkout reads, as of the locked read.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProductSnapshot {
    pub id: ProductId,
    pub name: String,
    pub price: Price,
    pub stock: i32,
}

/// One validated line, priced from the snapshot.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PlannedItem {
    pub product_id: ProductId,
    pub quantity: i32,
    pub price: Price,
}

/// The writes a store must commit for a validated cart.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CheckoutPlan {
    pub total: Price,
    pub items: Vec<PlannedItem>,
}

/// Validate `lines` against `snapshot` and compute the order total.
///
/// Lines are checked in cart order and the first failure wins. Repeated
/// lines for one product are checked against their running sum.
///
/// # Errors
///
/// Returns the first validation failure. Arithmetic overflow in quantities
/// or totals is reported as `InvalidQuantity`.
pub fn plan(lines: &[CartLine], snapshot: &[ProductSnapshot]) -> Result<CheckoutPlan, CheckoutError> {
    if lines.is_empty() {
        return Err(CheckoutError::EmptyCart);
    }

    let by_id: HashMap<ProductId, &ProductSnapshot> = snapshot.iter().map(|p| (p.id, p)).collect();
    let mut requested: HashMap<ProductId, i32> = HashMap::new();
    let mut total = Price::ZERO;
    let mut items = Vec::with_capacity(lines.len());

    for line in lines {
        let product = by_id
            .get(&line.product_id)
            .ok_or(CheckoutError::ProductNotFound(line.product_id))?;

        if line.quantity < 1 {
            return Err(CheckoutError::InvalidQuantity);
        }

        let cumulative = requested.entry(product.id).or_insert(0);
        *cumulative = cumulative
            .checked_add(line.quantity)
            .ok_or(CheckoutError::InvalidQuantity)?;
        if product.stock < *cumulative {
            return Err(CheckoutError::InsufficientStock(product.name.clone()));
        }

        let subtotal = product
            .price
            .checked_mul(line.quantity)
            .ok_or(CheckoutError::InvalidQuantity)?;
        total = total
            .checked_add(subtotal)
            .ok_or(CheckoutError::InvalidQuantity)?;

        items.push(PlannedItem {
            product_id: product.id,
            quantity: line.quantity,
            price: product.price,
        });
    }

    Ok(CheckoutPlan { total, items })
}

/// Ids to lock for `lines`, ascending and without repeats.
///
/// Every store locks in this order so two carts sharing products can never
/// wait on each other in a cycle.
#[must_use]
pub fn lock_order(lines: &[CartLine]) -> Vec<ProductId> {
    let mut ids: Vec<ProductId> = lines.iter().map(|line| line.product_id).collect();
    ids.sort_unstable();
    ids.dedup();
    ids
}

/// Places orders for guests and signed-in users.
pub struct CheckoutService<'a> {
    store: &'a dyn Store,
}

impl<'a> CheckoutService<'a> {
    /// Create a new checkout service.
    #[must_use]
    pub const fn new(store: &'a dyn Store) -> Self {
        Self { store }
    }

    /// Resolve the buyer and place the order atomically.
    ///
    /// A signed-in buyer is recorded by id, and their account email is used
    /// when `email` is absent.
    ///
    /// # Errors
    ///
    /// Returns `CheckoutError` if the email is malformed, the cart fails
    /// validation, or the commit fails.
    #[instrument(skip(self, lines, user), fields(lines = lines.len()))]
    pub async fn checkout(
        &self,
        email: Option<&str>,
        lines: Vec<CartLine>,
        user: Option<&User>,
    ) -> Result<Order, CheckoutError> {
        let email = match email.map(str::trim).filter(|e| !e.is_empty()) {
            Some(raw) => Some(Email::parse(raw)?),
            None => user.map(|u| u.email.clone()),
        };

        let order = self
            .store
            .place_order(&NewOrder {
                user_id: user.map(|u| u.id),
                user_email: email,
                lines,
            })
            .await?;

        tracing::info!(
            order_id = %order.id,
            items = order.items.len(),
            total = %order.total,
            "Order placed"
        );

        Ok(order)
    }
}
