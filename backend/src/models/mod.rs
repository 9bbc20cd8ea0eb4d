//! Database models for the Distribution Order Management backend
//!
//! Re-exports models from the shared crate and adds backend-specific rows

pub use shared::models::*;
