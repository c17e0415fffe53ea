use common::ProductId;
use thiserror::Error;

/// Errors that can occur when interacting with the store.
#[derive(Debug, Error)]
pub enum StoreError {
    /// A product's quantity no longer matches the snapshot it was validated
    /// against. The whole write batch is rolled back; callers may re-read
    /// and retry.
    #[error(
        "stock conflict for product {product_id}: expected quantity {expected}, found {actual}"
    )]
    StockConflict {
        product_id: ProductId,
        expected: i64,
        actual: i64,
    },

    /// A stock update referenced a product that does not exist (or was
    /// deleted after the snapshot was taken).
    #[error("unknown product: {0}")]
    UnknownProduct(ProductId),

    /// A database error occurred.
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    /// A database migration error occurred.
    #[error("migration error: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),
}

/// Result type for store operations.
pub type Result<T> = std::result::Result<T, StoreError>;
