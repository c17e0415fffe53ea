//! Record types persisted by the store.

use chrono::{DateTime, Utc};
use common::{CustomerId, Money, OrderId, OrderItemId, ProductId};
use serde::{Deserialize, Serialize};

/// A customer record. Read-only in this core; customers are created and
/// maintained by external collaborators.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Customer {
    pub id: CustomerId,
    pub name: String,
    pub email: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Customer {
    /// Creates a customer record with fresh timestamps.
    pub fn new(id: impl Into<CustomerId>, name: impl Into<String>, email: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            id: id.into(),
            name: name.into(),
            email: email.into(),
            created_at: now,
            updated_at: now,
        }
    }
}

/// A product record. Only the quantity field is mutated by this core, and
/// only through a stock decrement during order placement.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Product {
    pub id: ProductId,
    pub name: String,
    /// Current unit price. Orders snapshot this value at purchase time.
    pub price: Money,
    /// Quantity on hand. Never negative.
    pub quantity: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Product {
    /// Creates a product record with fresh timestamps.
    pub fn new(
        id: impl Into<ProductId>,
        name: impl Into<String>,
        price: Money,
        quantity: i64,
    ) -> Self {
        let now = Utc::now();
        Self {
            id: id.into(),
            name: name.into(),
            price,
            quantity,
            created_at: now,
            updated_at: now,
        }
    }
}

/// A persisted order with its items attached.
///
/// Orders are immutable once created: no status transitions, edits, or
/// deletions happen in this core.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Order {
    pub id: OrderId,
    pub customer_id: CustomerId,
    pub items: Vec<OrderItem>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Order {
    /// Total order amount across all items.
    pub fn total_amount(&self) -> Money {
        self.items
            .iter()
            .fold(Money::zero(), |acc, item| acc + item.total_price())
    }
}

/// A persisted order line: one product, the purchased quantity, and the
/// unit price captured at purchase time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderItem {
    pub id: OrderItemId,
    pub order_id: OrderId,
    pub product_id: ProductId,
    /// Unit price frozen at order time. Later product price changes never
    /// alter this value.
    pub price: Money,
    pub quantity: u32,
}

impl OrderItem {
    /// Returns the total price for this item (quantity * unit price).
    pub fn total_price(&self) -> Money {
        self.price.multiply(self.quantity)
    }
}

/// An order ready for persistence. Ids and timestamps are assigned by the
/// store when the order is written.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewOrder {
    pub customer_id: CustomerId,
    pub items: Vec<NewOrderItem>,
}

/// A line of a [`NewOrder`], priced at validation time.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewOrderItem {
    pub product_id: ProductId,
    pub price: Money,
    pub quantity: u32,
}

/// A post-purchase quantity write, conditioned on the snapshot value the
/// caller validated against.
///
/// The store refuses the write if the product's current quantity no longer
/// equals `expected`; this is what makes the read-check-decrement sequence
/// safe against lost updates under concurrency.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StockUpdate {
    pub product_id: ProductId,
    /// Quantity observed at validation time.
    pub expected: i64,
    /// New quantity to write.
    pub quantity: i64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn order_total_amount_sums_items() {
        let order_id = OrderId::new();
        let order = Order {
            id: order_id,
            customer_id: CustomerId::new("c-001"),
            items: vec![
                OrderItem {
                    id: OrderItemId::new(),
                    order_id,
                    product_id: ProductId::new("SKU-001"),
                    price: Money::from_cents(1000),
                    quantity: 2,
                },
                OrderItem {
                    id: OrderItemId::new(),
                    order_id,
                    product_id: ProductId::new("SKU-002"),
                    price: Money::from_cents(500),
                    quantity: 1,
                },
            ],
            created_at: Utc::now(),
            updated_at: Utc::now(),
        };

        assert_eq!(order.total_amount().cents(), 2500);
    }

    #[test]
    fn order_item_total_price() {
        let item = OrderItem {
            id: OrderItemId::new(),
            order_id: OrderId::new(),
            product_id: ProductId::new("SKU-001"),
            price: Money::from_cents(499),
            quantity: 3,
        };
        assert_eq!(item.total_price().cents(), 1497);
    }

    #[test]
    fn product_new_sets_matching_timestamps() {
        let product = Product::new("SKU-001", "Widget", Money::from_cents(500), 10);
        assert_eq!(product.created_at, product.updated_at);
        assert_eq!(product.quantity, 10);
    }
}
