//! Shared types for the pharmacy marketplace.

pub mod types;

pub use types::{CartId, CategoryId, MedicineId, OrderId, ReviewId, UserId};
