//! Order creation workflow for the order placement system.
//!
//! This crate provides:
//! - [`CreateOrderRequest`] — the caller-facing request shape
//! - [`OrderService`] — validation, price snapshotting, and atomic
//!   persistence of new orders with stock decrements
//! - [`OrderError`] — the failure taxonomy for order placement

pub mod error;
pub mod request;
pub mod service;

pub use error::OrderError;
pub use request::{CreateOrderRequest, ItemRequest};
pub use service::OrderService;
