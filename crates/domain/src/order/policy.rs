//! Authorization policy for order access and status changes.
//!
//! All role-based decisions funnel through the functions here so the
//! store implementations never branch on roles themselves.

use common::UserId;

use crate::actor::{Actor, Role};
use crate::error::DomainError;

use super::status::validate_transition;
use super::{Order, OrderStatus};

/// What a validated transition request commits the caller to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransitionPlan {
    /// Target equals the current status; nothing to write.
    Noop,
    /// Move to the target status; `restock` is set when entering
    /// `CANCELLED`, and the stock restoration must happen in the same
    /// transaction as the status write.
    Apply { restock: bool },
}

/// Returns true if the actor may see the order at all.
pub fn can_view(actor: &Actor, order: &Order) -> bool {
    match actor.role {
        Role::Admin => true,
        Role::Seller => order.contains_seller(actor.id),
        Role::Customer => order.user_id == actor.id,
    }
}

/// Validates a status change request by an admin or seller.
///
/// Authorization is checked before the idempotent same-status
/// short-circuit, so out-of-scope actors never get a success echo.
pub fn plan_transition(
    actor: &Actor,
    order: &Order,
    target: OrderStatus,
) -> Result<TransitionPlan, DomainError> {
    match actor.role {
        Role::Admin => {}
        Role::Seller => {
            if !order.contains_seller(actor.id) {
                return Err(DomainError::Forbidden(
                    "Order contains no medicines sold by this seller".to_string(),
                ));
            }
        }
        Role::Customer => {
            return Err(DomainError::Forbidden(
                "Customers cannot change order status directly".to_string(),
            ));
        }
    }

    if target == order.status {
        return Ok(TransitionPlan::Noop);
    }

    validate_transition(order.status, target)?;

    Ok(TransitionPlan::Apply {
        restock: target == OrderStatus::Cancelled,
    })
}

/// Validates a customer cancelling their own order.
///
/// Only the owner may cancel, and only while the order is still PLACED.
/// A successful plan always restores stock.
pub fn plan_self_cancel(user_id: UserId, order: &Order) -> Result<(), DomainError> {
    if order.user_id != user_id {
        return Err(DomainError::Forbidden(
            "Only the order's owner can cancel it".to_string(),
        ));
    }

    if order.status != OrderStatus::Placed {
        return Err(DomainError::CancelNotAllowed {
            status: order.status,
        });
    }

    Ok(())
}
