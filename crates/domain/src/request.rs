//! Caller-facing request types for order placement.

use common::{CustomerId, ProductId};
use serde::{Deserialize, Serialize};

/// A request to place an order: a customer and the products they want.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreateOrderRequest {
    pub customer_id: CustomerId,
    pub items: Vec<ItemRequest>,
}

impl CreateOrderRequest {
    /// Creates a new order request.
    pub fn new(customer_id: impl Into<CustomerId>, items: Vec<ItemRequest>) -> Self {
        Self {
            customer_id: customer_id.into(),
            items,
        }
    }
}

/// One requested line: a product and the quantity to purchase.
///
/// The unit price is not part of the request; it is snapshotted from the
/// product record at validation time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ItemRequest {
    pub product_id: ProductId,
    pub quantity: u32,
}

impl ItemRequest {
    /// Creates a new item request.
    pub fn new(product_id: impl Into<ProductId>, quantity: u32) -> Self {
        Self {
            product_id: product_id.into(),
            quantity,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn request_serialization_roundtrip() {
        let request = CreateOrderRequest::new(
            "c-001",
            vec![ItemRequest::new("SKU-001", 2), ItemRequest::new("SKU-002", 1)],
        );
        let json = serde_json::to_string(&request).unwrap();
        let deserialized: CreateOrderRequest = serde_json::from_str(&json).unwrap();
        assert_eq!(request, deserialized);
    }
}
