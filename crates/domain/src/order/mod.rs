//! Orders: the frozen aggregate, its state machine, and the policies
//! governing who may move it.

mod checkout;
mod policy;
mod status;
mod value_objects;

pub use checkout::OrderDraft;
pub use policy::{TransitionPlan, can_view, plan_self_cancel, plan_transition};
pub use status::{OrderStatus, validate_transition};
pub use value_objects::{Money, OrderLine, ShippingDetails};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use common::{OrderId, UserId};

/// An order with its frozen lines.
///
/// Immutable after creation except for `status` and `updated_at`; the
/// lines and total are a snapshot of the cart at the moment of checkout.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Order {
    pub id: OrderId,
    pub user_id: UserId,
    pub status: OrderStatus,
    pub total: Money,
    pub shipping: ShippingDetails,
    pub lines: Vec<OrderLine>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Order {
    /// Returns true if any line was sold by the given seller.
    pub fn contains_seller(&self, seller_id: UserId) -> bool {
        self.lines.iter().any(|line| line.seller_id == seller_id)
    }

    /// Returns the total quantity across all lines.
    pub fn total_quantity(&self) -> u32 {
        self.lines.iter().map(|line| line.quantity).sum()
    }
}
