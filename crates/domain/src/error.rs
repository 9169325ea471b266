//! Domain error types.

use common::MedicineId;
use thiserror::Error;

use crate::order::OrderStatus;

/// Errors raised by domain rules.
///
/// Every variant corresponds to one kind of client-visible failure; the
/// API layer maps each kind to an HTTP status code exactly once.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DomainError {
    /// The cart has no items to check out.
    #[error("Cart is empty")]
    EmptyCart,

    /// The medicine exists but is not currently purchasable.
    #[error("Medicine {medicine_id} is not available")]
    MedicineUnavailable { medicine_id: MedicineId },

    /// Requested quantity exceeds the stock on hand.
    #[error(
        "Insufficient stock for medicine {medicine_id}: requested {requested}, available {available}"
    )]
    InsufficientStock {
        medicine_id: MedicineId,
        requested: i64,
        available: i64,
    },

    /// The requested status change is not in the transition table.
    #[error("Illegal status transition from {from} to {to}")]
    IllegalTransition { from: OrderStatus, to: OrderStatus },

    /// Customer self-cancel is only allowed while the order is still PLACED.
    #[error("Order in status {status} can no longer be cancelled")]
    CancelNotAllowed { status: OrderStatus },

    /// The actor is not allowed to perform the operation.
    #[error("{0}")]
    Forbidden(String),

    /// A request field is missing or malformed.
    #[error("{0}")]
    Validation(String),

    /// A status string did not name a known order status.
    #[error("Unknown order status: {0}")]
    UnknownStatus(String),

    /// Review rating outside the 1..=5 range.
    #[error("Rating must be between 1 and 5, got {rating}")]
    InvalidRating { rating: i16 },

    /// Reviews require a delivered order containing the medicine.
    #[error("Only medicines from a delivered order can be reviewed")]
    ReviewNotAllowed,
}
