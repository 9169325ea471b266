//! Domain layer for the pharmacy marketplace.
//!
//! This crate holds the pure business logic, free of any I/O:
//! - the order status state machine and its transition table
//! - the checkout builder that turns a cart snapshot into a frozen order
//! - the authorization policy for order access and status changes
//! - catalog, cart, and review validation rules
//!
//! Persistence and HTTP live in the `store` and `api` crates and call
//! into these types from inside their transaction boundaries.

pub mod actor;
pub mod cart;
pub mod error;
pub mod medicine;
pub mod order;
pub mod review;

pub use actor::{Actor, Role};
pub use cart::{CartItemView, CartLine, CartView};
pub use error::DomainError;
pub use medicine::{Medicine, MedicineUpdate, NewMedicine};
pub use order::{
    Money, Order, OrderDraft, OrderLine, OrderStatus, ShippingDetails, TransitionPlan, can_view,
    plan_self_cancel, plan_transition,
};
pub use review::{Review, validate_rating};
