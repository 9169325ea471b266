//! Checkout: turning a cart snapshot into a validated order draft.

use crate::cart::CartLine;
use crate::error::DomainError;

use super::value_objects::{Money, OrderLine};

/// A validated, fully priced order ready to be persisted.
///
/// Produced inside the order-creation transaction from a locked cart
/// snapshot; the caller persists the lines, reserves the stock, and
/// clears the cart atomically.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OrderDraft {
    pub lines: Vec<OrderLine>,
    pub total: Money,
}

impl OrderDraft {
    /// Validates cart lines and freezes them into order lines.
    ///
    /// Fails on the first empty cart, inactive medicine, or short stock;
    /// prices are frozen at the medicine's current price.
    pub fn build(cart: &[CartLine]) -> Result<OrderDraft, DomainError> {
        if cart.is_empty() {
            return Err(DomainError::EmptyCart);
        }

        let mut lines = Vec::with_capacity(cart.len());
        let mut total = Money::zero();

        for item in cart {
            if !item.is_active {
                return Err(DomainError::MedicineUnavailable {
                    medicine_id: item.medicine_id,
                });
            }

            let requested = i64::from(item.quantity);
            if requested > item.stock {
                return Err(DomainError::InsufficientStock {
                    medicine_id: item.medicine_id,
                    requested,
                    available: item.stock,
                });
            }

            let line = OrderLine {
                medicine_id: item.medicine_id,
                medicine_name: item.medicine_name.clone(),
                seller_id: item.seller_id,
                quantity: item.quantity,
                unit_price: item.price,
            };
            total += line.total_price();
            lines.push(line);
        }

        Ok(OrderDraft { lines, total })
    }
}
