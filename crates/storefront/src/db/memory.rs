//! In-memory [`Store`] for tests and local demos.
//!
//! All state sits behind one async mutex. Checkout validates and commits
//! while holding it, which gives the same isolation as the row locks in
//! [`super::PgStore`]. Writes are staged on copies and only published once
//! every step has succeeded, so a failed checkout leaves no trace.

use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::Mutex;

use marketstall_core::{
    CategoryId, Email, OrderId, OrderItemId, OrderStatus, ProductId, UserId, UserRole,
};

use super::{RepositoryError, Store};
use crate::models::{
    Category, NewCategory, NewOrder, NewProduct, Order, OrderItem, Product, ProductChanges, User,
};
use crate::services::catalog::{PageRequest, ProductFilter};
use crate::services::checkout::{self, CheckoutError, ProductSnapshot};

#[derive(Default)]
struct State {
    categories: Vec<Category>,
    products: Vec<Product>,
    users: Vec<(User, String)>,
    orders: Vec<Order>,
    last_id: i32,
}

impl State {
    fn next_id(&mut self) -> i32 {
        self.last_id += 1;
        self.last_id
    }

    fn category(&self, id: CategoryId) -> Option<&Category> {
        self.categories.iter().find(|c| c.id == id)
    }

    fn product(&self, id: ProductId) -> Option<&Product> {
        self.products.iter().find(|p| p.id == id)
    }

    fn slug_taken(&self, slug: &str, except: Option<ProductId>) -> bool {
        self.products
            .iter()
            .any(|p| p.slug.as_str() == slug && Some(p.id) != except)
    }
}

fn newest_first<T>(items: &mut [T], key: impl Fn(&T) -> (chrono::DateTime<Utc>, i32)) {
    items.sort_by(|a, b| key(b).cmp(&key(a)));
}

/// A [`Store`] that keeps everything in process memory.
#[derive(Default)]
pub struct MemoryStore {
    state: Mutex<State>,
    fail_commits: AtomicBool,
}

impl MemoryStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every checkout fail at commit time, after validation passes.
    pub fn fail_commits(&self, fail: bool) {
        self.fail_commits.store(fail, Ordering::SeqCst);
    }

    /// Number of orders placed so far.
    pub async fn order_count(&self) -> usize {
        self.state.lock().await.orders.len()
    }
}

#[async_trait]
impl Store for MemoryStore {
    async fn ping(&self) -> Result<(), RepositoryError> {
        Ok(())
    }

    async fn list_categories(&self) -> Result<Vec<Category>, RepositoryError> {
        let mut categories = self.state.lock().await.categories.clone();
        categories.sort_by(|a, b| a.name.cmp(&b.name).then(a.id.cmp(&b.id)));
        Ok(categories)
    }

    async fn get_category(&self, id: CategoryId) -> Result<Option<Category>, RepositoryError> {
        Ok(self.state.lock().await.category(id).cloned())
    }

    async fn create_category(&self, category: &NewCategory) -> Result<Category, RepositoryError> {
        let mut state = self.state.lock().await;
        if state.categories.iter().any(|c| c.slug == category.slug) {
            return Err(RepositoryError::Conflict(
                "category slug already exists".to_owned(),
            ));
        }

        let created = Category {
            id: CategoryId::new(state.next_id()),
            name: category.name.clone(),
            slug: category.slug.clone(),
        };
        state.categories.push(created.clone());
        Ok(created)
    }

    async fn search_products(
        &self,
        filter: &ProductFilter,
        page: PageRequest,
    ) -> Result<(Vec<Product>, i64), RepositoryError> {
        let state = self.state.lock().await;
        let mut matches: Vec<Product> = state
            .products
            .iter()
            .filter(|p| filter.matches(p))
            .cloned()
            .collect();
        drop(state);

        newest_first(&mut matches, |p| (p.created_at, p.id.as_i32()));
        let total = i64::try_from(matches.len()).unwrap_or(i64::MAX);
        let offset = usize::try_from(page.offset()).unwrap_or(usize::MAX);
        let limit = usize::try_from(page.limit()).unwrap_or(usize::MAX);
        let items = matches.into_iter().skip(offset).take(limit).collect();

        Ok((items, total))
    }

    async fn list_products(&self) -> Result<Vec<Product>, RepositoryError> {
        let mut products = self.state.lock().await.products.clone();
        newest_first(&mut products, |p| (p.created_at, p.id.as_i32()));
        Ok(products)
    }

    async fn get_product(&self, id: ProductId) -> Result<Option<Product>, RepositoryError> {
        Ok(self.state.lock().await.product(id).cloned())
    }

    async fn get_product_by_slug(&self, slug: &str) -> Result<Option<Product>, RepositoryError> {
        Ok(self
            .state
            .lock()
            .await
            .products
            .iter()
            .find(|p| p.slug.as_str() == slug)
            .cloned())
    }

    async fn create_product(&self, product: &NewProduct) -> Result<Product, RepositoryError> {
        let mut state = self.state.lock().await;
        if state.slug_taken(product.slug.as_str(), None) {
            return Err(RepositoryError::Conflict(
                "product slug already exists".to_owned(),
            ));
        }
        let category = state
            .category(product.category_id)
            .cloned()
            .ok_or_else(|| RepositoryError::Conflict("category is missing".to_owned()))?;

        let created = Product {
            id: ProductId::new(state.next_id()),
            name: product.name.clone(),
            slug: product.slug.clone(),
            description: product.description.clone(),
            price: product.price,
            image_url: product.image_url.clone(),
            stock: product.stock,
            category,
            created_at: Utc::now(),
        };
        state.products.push(created.clone());
        Ok(created)
    }

    async fn update_product(
        &self,
        id: ProductId,
        changes: &ProductChanges,
    ) -> Result<Option<Product>, RepositoryError> {
        let mut state = self.state.lock().await;
        if state.product(id).is_none() {
            return Ok(None);
        }
        if let Some(slug) = &changes.slug
            && state.slug_taken(slug.as_str(), Some(id))
        {
            return Err(RepositoryError::Conflict(
                "product slug already exists".to_owned(),
            ));
        }
        let category = match changes.category_id {
            Some(category_id) => Some(
                state
                    .category(category_id)
                    .cloned()
                    .ok_or_else(|| RepositoryError::Conflict("category is missing".to_owned()))?,
            ),
            None => None,
        };

        let Some(product) = state.products.iter_mut().find(|p| p.id == id) else {
            return Ok(None);
        };
        changes.apply_to(product, category);
        Ok(Some(product.clone()))
    }

    async fn delete_product(&self, id: ProductId) -> Result<bool, RepositoryError> {
        let mut state = self.state.lock().await;
        let ordered = state
            .orders
            .iter()
            .flat_map(|o| &o.items)
            .any(|item| item.product_id == id);
        if ordered {
            return Err(RepositoryError::Conflict("product has been ordered".to_owned()));
        }

        let before = state.products.len();
        state.products.retain(|p| p.id != id);
        Ok(state.products.len() < before)
    }

    async fn create_user(
        &self,
        email: &Email,
        password_hash: &str,
    ) -> Result<User, RepositoryError> {
        let mut state = self.state.lock().await;
        if state.users.iter().any(|(u, _)| u.email == *email) {
            return Err(RepositoryError::Conflict("email already exists".to_owned()));
        }

        let user = User {
            id: UserId::new(state.next_id()),
            email: email.clone(),
            role: UserRole::User,
            created_at: Utc::now(),
        };
        state.users.push((user.clone(), password_hash.to_owned()));
        Ok(user)
    }

    async fn get_user(&self, id: UserId) -> Result<Option<User>, RepositoryError> {
        Ok(self
            .state
            .lock()
            .await
            .users
            .iter()
            .find(|(u, _)| u.id == id)
            .map(|(u, _)| u.clone()))
    }

    async fn get_password_hash(
        &self,
        email: &Email,
    ) -> Result<Option<(User, String)>, RepositoryError> {
        Ok(self
            .state
            .lock()
            .await
            .users
            .iter()
            .find(|(u, _)| u.email == *email)
            .cloned())
    }

    async fn place_order(&self, order: &NewOrder) -> Result<Order, CheckoutError> {
        let mut state = self.state.lock().await;

        let snapshot: Vec<ProductSnapshot> = checkout::lock_order(&order.lines)
            .into_iter()
            .filter_map(|id| state.product(id))
            .map(|p| ProductSnapshot {
                id: p.id,
                name: p.name.clone(),
                price: p.price,
                stock: p.stock,
            })
            .collect();
        let plan = checkout::plan(&order.lines, &snapshot)?;

        // Stage every write on copies; publish only after all of them succeed.
        let mut products = state.products.clone();
        for item in &plan.items {
            let product = products
                .iter_mut()
                .find(|p| p.id == item.product_id)
                .ok_or(CheckoutError::Failed)?;
            if product.stock < item.quantity {
                tracing::error!(product_id = %item.product_id, "Stock guard rejected decrement");
                return Err(CheckoutError::Failed);
            }
            product.stock -= item.quantity;
        }

        let order_id = OrderId::new(state.next_id());
        let mut items = Vec::with_capacity(plan.items.len());
        for item in &plan.items {
            items.push(OrderItem {
                id: OrderItemId::new(state.next_id()),
                order_id,
                product_id: item.product_id,
                quantity: item.quantity,
                price: item.price,
            });
        }
        let placed = Order {
            id: order_id,
            user_id: order.user_id,
            user_email: order.user_email.clone(),
            total: plan.total,
            status: OrderStatus::Pending,
            created_at: Utc::now(),
            items,
        };

        if self.fail_commits.load(Ordering::SeqCst) {
            tracing::error!(order_id = %order_id, "Checkout commit failed");
            return Err(CheckoutError::Failed);
        }

        state.products = products;
        state.orders.push(placed.clone());
        Ok(placed)
    }

    async fn orders_by_email(&self, email: &Email) -> Result<Vec<Order>, RepositoryError> {
        let mut orders: Vec<Order> = self
            .state
            .lock()
            .await
            .orders
            .iter()
            .filter(|o| o.user_email.as_ref() == Some(email))
            .cloned()
            .collect();
        newest_first(&mut orders, |o| (o.created_at, o.id.as_i32()));
        Ok(orders)
    }

    async fn orders_for_user(&self, user: &User) -> Result<Vec<Order>, RepositoryError> {
        let mut orders: Vec<Order> = self
            .state
            .lock()
            .await
            .orders
            .iter()
            .filter(|o| o.user_id == Some(user.id) || o.user_email.as_ref() == Some(&user.email))
            .cloned()
            .collect();
        newest_first(&mut orders, |o| (o.created_at, o.id.as_i32()));
        Ok(orders)
    }

    async fn list_orders(&self) -> Result<Vec<Order>, RepositoryError> {
        let mut orders = self.state.lock().await.orders.clone();
        newest_first(&mut orders, |o| (o.created_at, o.id.as_i32()));
        Ok(orders)
    }

    async fn update_order_status(
        &self,
        id: OrderId,
        status: OrderStatus,
    ) -> Result<Option<Order>, RepositoryError> {
        let mut state = self.state.lock().await;
        let Some(order) = state.orders.iter_mut().find(|o| o.id == id) else {
            return Ok(None);
        };
        order.status = status;
        Ok(Some(order.clone()))
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::sync::Arc;

    use marketstall_core::{Price, Slug};

    use super::*;
    use crate::models::CartLine;

    async fn seeded(stock: i32) -> (MemoryStore, Product) {
        let store = MemoryStore::new();
        let category = store
            .create_category(&NewCategory {
                name: "Mugs".to_owned(),
                slug: Slug::normalize("Mugs").unwrap(),
            })
            .await
            .unwrap();
        let product = store
            .create_product(&NewProduct {
                name: "Enamel Mug".to_owned(),
                slug: Slug::normalize("Enamel Mug").unwrap(),
                description: "Camp classic".to_owned(),
                price: Price::from_cents(1000).unwrap(),
                image_url: String::new(),
                stock,
                category_id: category.id,
            })
            .await
            .unwrap();
        (store, product)
    }

    fn guest_order(product_id: ProductId, quantity: i32) -> NewOrder {
        NewOrder {
            user_id: None,
            user_email: Some(Email::parse("guest@example.com").unwrap()),
            lines: vec![CartLine {
                product_id,
                quantity,
            }],
        }
    }

    #[tokio::test]
    async fn test_place_order_decrements_stock() {
        let (store, product) = seeded(5).await;

        let order = store.place_order(&guest_order(product.id, 2)).await.unwrap();

        assert_eq!(order.total.cents(), 2000);
        assert_eq!(order.status, OrderStatus::Pending);
        assert_eq!(store.get_product(product.id).await.unwrap().unwrap().stock, 3);
    }

    #[tokio::test]
    async fn test_failed_commit_leaves_no_trace() {
        let (store, product) = seeded(5).await;
        store.fail_commits(true);

        let err = store.place_order(&guest_order(product.id, 2)).await.unwrap_err();

        assert_eq!(err, CheckoutError::Failed);
        assert_eq!(store.order_count().await, 0);
        assert_eq!(store.get_product(product.id).await.unwrap().unwrap().stock, 5);
    }

    #[tokio::test]
    async fn test_concurrent_checkouts_never_oversell() {
        let (store, product) = seeded(3).await;
        let store = Arc::new(store);
        let id = product.id;

        let handles: Vec<_> = (0..2)
            .map(|_| {
                let store = Arc::clone(&store);
                tokio::spawn(async move { store.place_order(&guest_order(id, 2)).await })
            })
            .collect();

        let mut placed = 0;
        for handle in handles {
            match handle.await.unwrap() {
                Ok(_) => placed += 1,
                Err(e) => assert_eq!(e, CheckoutError::InsufficientStock("Enamel Mug".to_owned())),
            }
        }

        assert_eq!(placed, 1);
        assert_eq!(store.get_product(product.id).await.unwrap().unwrap().stock, 1);
    }

    #[tokio::test]
    async fn test_delete_ordered_product_conflicts() {
        let (store, product) = seeded(5).await;
        store.place_order(&guest_order(product.id, 1)).await.unwrap();

        let err = store.delete_product(product.id).await.unwrap_err();
        assert!(matches!(err, RepositoryError::Conflict(_)));
    }

    #[tokio::test]
    async fn test_update_to_missing_category_changes_nothing() {
        let (store, product) = seeded(5).await;
        let changes = ProductChanges {
            stock: Some(9),
            category_id: Some(CategoryId::new(999)),
            ..ProductChanges::default()
        };

        let err = store.update_product(product.id, &changes).await.unwrap_err();

        assert!(matches!(err, RepositoryError::Conflict(_)));
        assert_eq!(store.get_product(product.id).await.unwrap().unwrap().stock, 5);
    }
}
