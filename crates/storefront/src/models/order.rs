//! Order domain types.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use marketstall_core::{Email, OrderId, OrderItemId, OrderStatus, Price, ProductId, UserId};

/// One requested line of a cart.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CartLine {
    pub product_id: ProductId,
    /// Requested units. Validated at checkout, so it may arrive as zero or negative.
    pub quantity: i32,
}

/// A checkout request after the buyer's identity has been resolved.
#[derive(Debug, Clone)]
pub struct NewOrder {
    pub user_id: Option<UserId>,
    pub user_email: Option<Email>,
    pub lines: Vec<CartLine>,
}

/// A placed order with its line items.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Order {
    pub id: OrderId,
    pub user_id: Option<UserId>,
    pub user_email: Option<Email>,
    /// Sum of `price * quantity` over the items, frozen at checkout.
    #[serde(rename = "totalCents")]
    pub total: Price,
    pub status: OrderStatus,
    pub created_at: DateTime<Utc>,
    pub items: Vec<OrderItem>,
}

/// A purchased line. Immutable once written.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderItem {
    pub id: OrderItemId,
    pub order_id: OrderId,
    pub product_id: ProductId,
    pub quantity: i32,
    /// Unit price at purchase time.
    #[serde(rename = "priceCents")]
    pub price: Price,
}
