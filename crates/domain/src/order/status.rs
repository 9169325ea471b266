//! Order status state machine.

use serde::{Deserialize, Serialize};

use crate::error::DomainError;

/// The status of an order in its lifecycle.
///
/// Status transitions:
/// ```text
/// PLACED ──┬──► CONFIRMS ──► PROCESSING ──► SHIPPED ──► DELIVERED
///          │        │            │
///          ├────────┘            │
///          │                     │
///          └──► CANCELLED ◄──────┘
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "UPPERCASE")]
pub enum OrderStatus {
    /// Order has been placed and stock reserved.
    #[default]
    Placed,

    /// Seller has acknowledged the order.
    Confirms,

    /// Order is being prepared for shipment.
    Processing,

    /// Order has left the pharmacy.
    Shipped,

    /// Order reached the customer (terminal state).
    Delivered,

    /// Order was cancelled and its stock restored (terminal state).
    Cancelled,
}

impl OrderStatus {
    /// Every status, in lifecycle order.
    pub const ALL: [OrderStatus; 6] = [
        OrderStatus::Placed,
        OrderStatus::Confirms,
        OrderStatus::Processing,
        OrderStatus::Shipped,
        OrderStatus::Delivered,
        OrderStatus::Cancelled,
    ];

    /// Returns the statuses reachable from this one.
    pub fn allowed_targets(&self) -> &'static [OrderStatus] {
        match self {
            OrderStatus::Placed => &[
                OrderStatus::Processing,
                OrderStatus::Cancelled,
                OrderStatus::Confirms,
            ],
            OrderStatus::Confirms => &[OrderStatus::Processing, OrderStatus::Cancelled],
            OrderStatus::Processing => &[OrderStatus::Shipped, OrderStatus::Cancelled],
            OrderStatus::Shipped => &[OrderStatus::Delivered],
            OrderStatus::Delivered | OrderStatus::Cancelled => &[],
        }
    }

    /// Returns true if `target` is directly reachable from this status.
    pub fn can_transition_to(&self, target: OrderStatus) -> bool {
        self.allowed_targets().contains(&target)
    }

    /// Returns true if this is a terminal status.
    pub fn is_terminal(&self) -> bool {
        matches!(self, OrderStatus::Delivered | OrderStatus::Cancelled)
    }

    /// Returns the status name as used on the wire.
    pub fn as_str(&self) -> &'static str {
        match self {
            OrderStatus::Placed => "PLACED",
            OrderStatus::Confirms => "CONFIRMS",
            OrderStatus::Processing => "PROCESSING",
            OrderStatus::Shipped => "SHIPPED",
            OrderStatus::Delivered => "DELIVERED",
            OrderStatus::Cancelled => "CANCELLED",
        }
    }
}

impl std::fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for OrderStatus {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_uppercase().as_str() {
            "PLACED" => Ok(OrderStatus::Placed),
            "CONFIRMS" => Ok(OrderStatus::Confirms),
            "PROCESSING" => Ok(OrderStatus::Processing),
            "SHIPPED" => Ok(OrderStatus::Shipped),
            "DELIVERED" => Ok(OrderStatus::Delivered),
            "CANCELLED" => Ok(OrderStatus::Cancelled),
            other => Err(DomainError::UnknownStatus(other.to_string())),
        }
    }
}

/// Validates a requested status change against the transition table.
///
/// Cancellation of shipped or delivered orders is rejected by an explicit
/// guard in addition to the table lookup.
pub fn validate_transition(from: OrderStatus, to: OrderStatus) -> Result<(), DomainError> {
    if to == OrderStatus::Cancelled
        && matches!(from, OrderStatus::Shipped | OrderStatus::Delivered)
    {
        return Err(DomainError::IllegalTransition { from, to });
    }

    if !from.can_transition_to(to) {
        return Err(DomainError::IllegalTransition { from, to });
    }

    Ok(())
}
