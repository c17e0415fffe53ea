//! Shared types for the order placement system.
//!
//! Identifier newtypes and the cents-based [`Money`] type used across the
//! store and domain crates.

pub mod types;

pub use types::{CustomerId, Money, OrderId, OrderItemId, ProductId};
