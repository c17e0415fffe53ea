use async_trait::async_trait;

use common::{CustomerId, ProductId};

use crate::model::{Customer, NewOrder, Order, Product, StockUpdate};
use crate::Result;

/// Lookup of customers by identifier. Read-only; customers are maintained
/// by external collaborators.
#[async_trait]
pub trait CustomerStore: Send + Sync {
    /// Finds a customer by ID. Returns None if no such customer exists.
    async fn find_customer_by_id(&self, id: &CustomerId) -> Result<Option<Customer>>;
}

/// Product lookup and batched stock writes.
#[async_trait]
pub trait ProductStore: Send + Sync {
    /// Finds a product by name. Returns None if no such product exists.
    async fn find_product_by_name(&self, name: &str) -> Result<Option<Product>>;

    /// Returns the products matching the given IDs.
    ///
    /// Unknown IDs are silently omitted from the result; callers that need
    /// full coverage must check it themselves.
    async fn find_products_by_id(&self, ids: &[ProductId]) -> Result<Vec<Product>>;

    /// Applies a batch of quantity updates as one atomic unit.
    ///
    /// Each update re-reads the current record and is refused with
    /// [`StockConflict`](crate::StoreError::StockConflict) if the quantity
    /// no longer equals the snapshot value it was validated against, or
    /// with [`UnknownProduct`](crate::StoreError::UnknownProduct) if the
    /// record is gone. On any failure no update in the batch is applied.
    ///
    /// Returns the updated product records.
    async fn update_quantities(&self, updates: &[StockUpdate]) -> Result<Vec<Product>>;
}

/// Persistence of new orders.
#[async_trait]
pub trait OrderStore: Send + Sync {
    /// Persists an order header and all of its item rows as one durable
    /// unit; on failure no rows are visible.
    ///
    /// Returns the stored order with items attached and ids/timestamps
    /// populated.
    async fn create_order(&self, order: NewOrder) -> Result<Order>;
}

/// Full store surface, adding the transactional composition the order
/// creation workflow needs.
#[async_trait]
pub trait Store: CustomerStore + ProductStore + OrderStore {
    /// Persists an order and applies its stock decrements inside a single
    /// transaction scope.
    ///
    /// Either the order (header and items) and every quantity update become
    /// visible together, or nothing does. Stock updates carry the same
    /// conflict semantics as [`ProductStore::update_quantities`], so a
    /// stale snapshot rolls back the order as well.
    async fn place_order(&self, order: NewOrder, updates: &[StockUpdate]) -> Result<Order>;
}
