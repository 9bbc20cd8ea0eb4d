//! Shared types and domain logic for the Distribution Order Management
//! backend.
//!
//! This crate holds the typed domain records (products, orders, users),
//! the tax-variant price calculator and the stock-level primitives, so the
//! business rules can be exercised without a running server or database.

pub mod models;
pub mod pricing;
pub mod stock;
pub mod types;
pub mod validation;

pub use models::*;
pub use pricing::*;
pub use stock::*;
pub use types::*;
pub use validation::*;
