//! Cart views and the checkout snapshot.

use serde::{Deserialize, Serialize};

use common::{CartId, MedicineId, UserId};

use crate::order::Money;

/// A customer-facing view of their cart.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CartView {
    pub items: Vec<CartItemView>,
    pub total: Money,
}

impl CartView {
    /// Builds a view from cart items, summing the snapshot prices.
    pub fn new(items: Vec<CartItemView>) -> Self {
        let total = items
            .iter()
            .fold(Money::zero(), |acc, item| acc + item.line_total());
        Self { items, total }
    }

    /// An empty cart, shown before the first add.
    pub fn empty() -> Self {
        Self::new(Vec::new())
    }
}

/// One line of a cart as shown to the customer.
///
/// `unit_price` is the snapshot refreshed on every cart mutation; the
/// authoritative price is re-read from the catalog at checkout.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CartItemView {
    pub medicine_id: MedicineId,
    pub medicine_name: String,
    pub quantity: u32,
    pub unit_price: Money,
}

impl CartItemView {
    /// Returns quantity times the snapshot unit price.
    pub fn line_total(&self) -> Money {
        self.unit_price.multiply(self.quantity)
    }
}

/// One cart line joined with the current state of its medicine.
///
/// Loaded inside the order-creation transaction, with the medicine rows
/// locked, so the price, stock, and availability seen here are the ones
/// the order will commit against.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CartLine {
    pub cart_id: CartId,
    pub medicine_id: MedicineId,
    pub medicine_name: String,
    pub seller_id: UserId,
    pub quantity: u32,
    /// Current catalog price, not the cart's stale snapshot.
    pub price: Money,
    pub stock: i64,
    pub is_active: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cart_view_totals_snapshot_prices() {
        let items = vec![
            CartItemView {
                medicine_id: MedicineId::new(),
                medicine_name: "Aspirin".to_string(),
                quantity: 3,
                unit_price: Money::from_cents(1000),
            },
            CartItemView {
                medicine_id: MedicineId::new(),
                medicine_name: "Vitamin C".to_string(),
                quantity: 1,
                unit_price: Money::from_cents(500),
            },
        ];
        let view = CartView::new(items);
        assert_eq!(view.total.cents(), 3500);
    }

    #[test]
    fn empty_cart_has_zero_total() {
        let view = CartView::empty();
        assert!(view.items.is_empty());
        assert_eq!(view.total, Money::zero());
    }
}
