//! Domain models for the storefront.
//!
//! These types represent validated domain objects separate from database row
//! types. Each store implementation converts its own rows into these.

pub mod category;
pub mod order;
pub mod product;
pub mod user;

pub use category::{Category, NewCategory};
pub use order::{CartLine, NewOrder, Order, OrderItem};
pub use product::{NewProduct, Product, ProductChanges};
pub use user::User;
