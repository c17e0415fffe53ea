//! Domain error types.

use common::{CustomerId, ProductId};
use store::StoreError;
use thiserror::Error;

/// Errors that can occur while placing an order.
///
/// Every variant is a whole-request failure: no order rows or stock
/// changes are ever left behind by a failed placement.
#[derive(Debug, Error)]
pub enum OrderError {
    /// The request was malformed before any state was consulted.
    #[error("invalid argument: {0}")]
    InvalidArgument(&'static str),

    /// No customer exists with the requested ID.
    #[error("customer not found: {0}")]
    CustomerNotFound(CustomerId),

    /// The batch product lookup matched none of the requested IDs.
    #[error("products not found: {0:?}")]
    ProductsNotFound(Vec<ProductId>),

    /// A requested product ID had no matching product record.
    #[error("product not found: {0}")]
    ProductNotFound(ProductId),

    /// A requested quantity exceeds the product's quantity on hand.
    #[error(
        "insufficient stock for product {product_id}: {available} available, {requested} requested"
    )]
    InsufficientStock {
        product_id: ProductId,
        available: i64,
        requested: u32,
    },

    /// Concurrent stock contention persisted through every retry.
    #[error("order placement failed after {attempts} attempts due to concurrent stock contention")]
    Conflict { attempts: u32 },

    /// An error occurred in the store.
    #[error("store error: {0}")]
    Store(#[from] StoreError),
}
