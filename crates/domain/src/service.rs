//! Order creation service.
//!
//! The service is the locus of business rules for order placement: it
//! validates a request against current customer and inventory state,
//! snapshots unit prices, and hands the store one atomic write covering
//! the order and every stock decrement.

use std::collections::{HashMap, HashSet};

use common::ProductId;
use store::{NewOrder, NewOrderItem, Order, Product, StockUpdate, Store, StoreError};

use crate::error::OrderError;
use crate::request::CreateOrderRequest;

/// Default bound on validate-and-place retries under stock contention.
const DEFAULT_MAX_ATTEMPTS: u32 = 3;

/// Service for placing orders.
///
/// Constructed with an explicit store implementation; there is no runtime
/// wiring beyond this constructor.
pub struct OrderService<S: Store> {
    store: S,
    max_attempts: u32,
}

impl<S: Store> OrderService<S> {
    /// Creates a new order service with the given store.
    pub fn new(store: S) -> Self {
        Self {
            store,
            max_attempts: DEFAULT_MAX_ATTEMPTS,
        }
    }

    /// Creates a service with a custom retry bound (minimum 1).
    pub fn with_max_attempts(store: S, max_attempts: u32) -> Self {
        Self {
            store,
            max_attempts: max_attempts.max(1),
        }
    }

    /// Returns a reference to the underlying store.
    pub fn store(&self) -> &S {
        &self.store
    }

    /// Places an order.
    ///
    /// Validation happens before any write, in request order, failing on
    /// the first violation: non-empty customer id, non-empty item list,
    /// positive quantities, no duplicate product lines, customer exists,
    /// every product exists, every requested quantity is covered by the
    /// quantity on hand.
    ///
    /// The write phase persists the order (header and items) and applies
    /// every stock decrement as one transaction; nothing is visible to
    /// other callers unless all of it commits. Decrements are conditioned
    /// on the same product snapshot validation ran against, so a
    /// concurrent sale of the same product rolls the transaction back and
    /// the whole validate-and-place sequence is retried against a fresh
    /// snapshot, a bounded number of times.
    ///
    /// Placement is deliberately not idempotent: replaying an identical
    /// request creates a second order and decrements stock again.
    #[tracing::instrument(skip(self, request), fields(customer_id = %request.customer_id))]
    pub async fn create_order(&self, request: CreateOrderRequest) -> Result<Order, OrderError> {
        let result = self.create_order_inner(request).await;

        match &result {
            Ok(order) => {
                metrics::counter!("orders_created_total").increment(1);
                tracing::debug!(order_id = %order.id, items = order.items.len(), "order placed");
            }
            Err(err) => {
                metrics::counter!("orders_rejected_total").increment(1);
                tracing::debug!(error = %err, "order rejected");
            }
        }

        result
    }

    async fn create_order_inner(&self, request: CreateOrderRequest) -> Result<Order, OrderError> {
        validate_request(&request)?;

        let customer = self
            .store
            .find_customer_by_id(&request.customer_id)
            .await?
            .ok_or_else(|| OrderError::CustomerNotFound(request.customer_id.clone()))?;

        // Customers are immutable in this core, so only product state is
        // re-read on retry.
        let mut attempt = 1;
        loop {
            let (items, updates) = self.price_against_snapshot(&request).await?;
            let order = NewOrder {
                customer_id: customer.id.clone(),
                items,
            };

            match self.store.place_order(order, &updates).await {
                Ok(order) => return Ok(order),
                Err(StoreError::StockConflict { product_id, .. }) => {
                    metrics::counter!("order_stock_conflicts_total").increment(1);
                    if attempt >= self.max_attempts {
                        return Err(OrderError::Conflict { attempts: attempt });
                    }
                    tracing::warn!(
                        %product_id,
                        attempt,
                        "stock conflict, retrying with a fresh snapshot"
                    );
                    attempt += 1;
                }
                // The product disappeared between snapshot and commit.
                Err(StoreError::UnknownProduct(id)) => {
                    return Err(OrderError::ProductNotFound(id));
                }
                Err(err) => return Err(err.into()),
            }
        }
    }

    /// Reads one product snapshot and derives both the priced order lines
    /// and the snapshot-conditioned decrements from it, so validation and
    /// the eventual write cannot drift apart.
    async fn price_against_snapshot(
        &self,
        request: &CreateOrderRequest,
    ) -> Result<(Vec<NewOrderItem>, Vec<StockUpdate>), OrderError> {
        let ids: Vec<ProductId> = request
            .items
            .iter()
            .map(|item| item.product_id.clone())
            .collect();

        let products = self.store.find_products_by_id(&ids).await?;
        if products.is_empty() {
            return Err(OrderError::ProductsNotFound(ids));
        }

        let by_id: HashMap<&ProductId, &Product> =
            products.iter().map(|p| (&p.id, p)).collect();

        let mut items = Vec::with_capacity(request.items.len());
        let mut updates = Vec::with_capacity(request.items.len());

        for item in &request.items {
            let product = by_id
                .get(&item.product_id)
                .copied()
                .ok_or_else(|| OrderError::ProductNotFound(item.product_id.clone()))?;

            if i64::from(item.quantity) > product.quantity {
                return Err(OrderError::InsufficientStock {
                    product_id: item.product_id.clone(),
                    available: product.quantity,
                    requested: item.quantity,
                });
            }

            items.push(NewOrderItem {
                product_id: item.product_id.clone(),
                price: product.price,
                quantity: item.quantity,
            });
            updates.push(StockUpdate {
                product_id: item.product_id.clone(),
                expected: product.quantity,
                quantity: product.quantity - i64::from(item.quantity),
            });
        }

        Ok((items, updates))
    }
}

/// Structural validation, before any store access.
fn validate_request(request: &CreateOrderRequest) -> Result<(), OrderError> {
    if request.customer_id.is_empty() {
        return Err(OrderError::InvalidArgument("customer_id must not be empty"));
    }

    if request.items.is_empty() {
        return Err(OrderError::InvalidArgument("items must not be empty"));
    }

    let mut seen = HashSet::new();
    for item in &request.items {
        if item.quantity == 0 {
            return Err(OrderError::InvalidArgument("item quantity must be positive"));
        }
        // Two lines for one product would compute two decrements against
        // the same snapshot, silently losing one of them.
        if !seen.insert(&item.product_id) {
            return Err(OrderError::InvalidArgument(
                "items must not repeat a product",
            ));
        }
    }

    Ok(())
}
