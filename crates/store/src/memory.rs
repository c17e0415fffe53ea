use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::RwLock;

use common::{CustomerId, OrderId, OrderItemId, ProductId};

use crate::model::{Customer, NewOrder, Order, OrderItem, Product, StockUpdate};
use crate::store::{CustomerStore, OrderStore, ProductStore, Store};
use crate::{Result, StoreError};

#[derive(Debug, Default)]
struct MemoryState {
    customers: HashMap<CustomerId, Customer>,
    products: HashMap<ProductId, Product>,
    orders: HashMap<OrderId, Order>,
    forced_conflicts: u32,
}

/// In-memory store implementation for testing.
///
/// This implementation keeps all records in memory and provides the same
/// interface and conflict semantics as the PostgreSQL implementation.
/// `place_order` runs under a single write lock, which makes it atomic in
/// the same way the PostgreSQL transaction is.
#[derive(Clone, Default)]
pub struct InMemoryStore {
    state: Arc<RwLock<MemoryState>>,
}

impl InMemoryStore {
    /// Creates a new empty in-memory store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts (or replaces) a customer record.
    pub async fn insert_customer(&self, customer: Customer) {
        let mut state = self.state.write().await;
        state.customers.insert(customer.id.clone(), customer);
    }

    /// Inserts (or replaces) a product record.
    pub async fn insert_product(&self, product: Product) {
        let mut state = self.state.write().await;
        state.products.insert(product.id.clone(), product);
    }

    /// Removes a product record. Returns true if it existed.
    pub async fn remove_product(&self, id: &ProductId) -> bool {
        let mut state = self.state.write().await;
        state.products.remove(id).is_some()
    }

    /// Returns the current quantity on hand for a product, if it exists.
    pub async fn product_quantity(&self, id: &ProductId) -> Option<i64> {
        let state = self.state.read().await;
        state.products.get(id).map(|p| p.quantity)
    }

    /// Returns the total number of persisted orders.
    pub async fn order_count(&self) -> usize {
        self.state.read().await.orders.len()
    }

    /// Returns a persisted order by ID.
    pub async fn get_order(&self, id: &OrderId) -> Option<Order> {
        self.state.read().await.orders.get(id).cloned()
    }

    /// Forces the next `n` calls to `place_order` to fail with a stock
    /// conflict, for exercising caller retry paths.
    pub async fn fail_next_placements(&self, n: u32) {
        self.state.write().await.forced_conflicts = n;
    }

    /// Clears all records.
    pub async fn clear(&self) {
        let mut state = self.state.write().await;
        state.customers.clear();
        state.products.clear();
        state.orders.clear();
        state.forced_conflicts = 0;
    }
}

/// Validates every update against the current quantities, then applies the
/// whole batch. A failure applies nothing.
fn apply_stock_updates(state: &mut MemoryState, updates: &[StockUpdate]) -> Result<Vec<Product>> {
    for update in updates {
        let product = state
            .products
            .get(&update.product_id)
            .ok_or_else(|| StoreError::UnknownProduct(update.product_id.clone()))?;

        if product.quantity != update.expected {
            return Err(StoreError::StockConflict {
                product_id: update.product_id.clone(),
                expected: update.expected,
                actual: product.quantity,
            });
        }
    }

    let now = Utc::now();
    let mut updated = Vec::with_capacity(updates.len());
    for update in updates {
        let product = state
            .products
            .get_mut(&update.product_id)
            .ok_or_else(|| StoreError::UnknownProduct(update.product_id.clone()))?;
        product.quantity = update.quantity;
        product.updated_at = now;
        updated.push(product.clone());
    }

    Ok(updated)
}

fn build_order(order: NewOrder) -> Order {
    let order_id = OrderId::new();
    let now = Utc::now();
    let items = order
        .items
        .into_iter()
        .map(|item| OrderItem {
            id: OrderItemId::new(),
            order_id,
            product_id: item.product_id,
            price: item.price,
            quantity: item.quantity,
        })
        .collect();

    Order {
        id: order_id,
        customer_id: order.customer_id,
        items,
        created_at: now,
        updated_at: now,
    }
}

#[async_trait]
impl CustomerStore for InMemoryStore {
    async fn find_customer_by_id(&self, id: &CustomerId) -> Result<Option<Customer>> {
        let state = self.state.read().await;
        Ok(state.customers.get(id).cloned())
    }
}

#[async_trait]
impl ProductStore for InMemoryStore {
    async fn find_product_by_name(&self, name: &str) -> Result<Option<Product>> {
        let state = self.state.read().await;
        Ok(state.products.values().find(|p| p.name == name).cloned())
    }

    async fn find_products_by_id(&self, ids: &[ProductId]) -> Result<Vec<Product>> {
        let state = self.state.read().await;
        Ok(ids
            .iter()
            .filter_map(|id| state.products.get(id).cloned())
            .collect())
    }

    async fn update_quantities(&self, updates: &[StockUpdate]) -> Result<Vec<Product>> {
        let mut state = self.state.write().await;
        apply_stock_updates(&mut state, updates)
    }
}

#[async_trait]
impl OrderStore for InMemoryStore {
    async fn create_order(&self, order: NewOrder) -> Result<Order> {
        let mut state = self.state.write().await;
        let order = build_order(order);
        state.orders.insert(order.id, order.clone());
        Ok(order)
    }
}

#[async_trait]
impl Store for InMemoryStore {
    async fn place_order(&self, order: NewOrder, updates: &[StockUpdate]) -> Result<Order> {
        let mut state = self.state.write().await;

        if state.forced_conflicts > 0 {
            state.forced_conflicts -= 1;
            let product_id = updates
                .first()
                .map(|u| u.product_id.clone())
                .unwrap_or_else(|| ProductId::new("injected"));
            let expected = updates.first().map(|u| u.expected).unwrap_or(0);
            return Err(StoreError::StockConflict {
                product_id,
                expected,
                actual: 0,
            });
        }

        // Validate the decrements before inserting anything so a conflict
        // leaves no trace of the order.
        apply_stock_updates(&mut state, updates)?;

        let order = build_order(order);
        state.orders.insert(order.id, order.clone());
        Ok(order)
    }
}
