//! Storage layer for the order placement system.
//!
//! This crate defines the store traits ([`CustomerStore`], [`ProductStore`],
//! [`OrderStore`] and the transactional [`Store`] composition) together with
//! two implementations: an in-memory store for tests and a PostgreSQL store
//! backed by `sqlx`.

pub mod config;
pub mod error;
pub mod memory;
pub mod model;
pub mod postgres;
pub mod store;

pub use config::DatabaseConfig;
pub use error::{Result, StoreError};
pub use memory::InMemoryStore;
pub use model::{Customer, NewOrder, NewOrderItem, Order, OrderItem, Product, StockUpdate};
pub use postgres::PostgresStore;
pub use store::{CustomerStore, OrderStore, ProductStore, Store};
