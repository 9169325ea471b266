//! Value objects for the order domain.

use serde::{Deserialize, Serialize};

use common::{MedicineId, UserId};

use crate::error::DomainError;

/// Money amount in integer cents to avoid floating point issues.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct Money(i64);

impl Money {
    /// Creates a new amount from cents.
    pub fn from_cents(cents: i64) -> Self {
        Self(cents)
    }

    /// Returns zero money.
    pub fn zero() -> Self {
        Self(0)
    }

    /// Returns the amount in cents.
    pub fn cents(&self) -> i64 {
        self.0
    }

    /// Returns true if the amount is negative.
    pub fn is_negative(&self) -> bool {
        self.0 < 0
    }

    /// Multiplies by a quantity.
    pub fn multiply(&self, quantity: u32) -> Money {
        Money(self.0 * i64::from(quantity))
    }
}

impl std::fmt::Display for Money {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.0 < 0 {
            write!(f, "-${}.{:02}", (self.0 / 100).abs(), self.0.abs() % 100)
        } else {
            write!(f, "${}.{:02}", self.0 / 100, self.0 % 100)
        }
    }
}

impl std::ops::Add for Money {
    type Output = Money;

    fn add(self, rhs: Self) -> Self::Output {
        Money(self.0 + rhs.0)
    }
}

impl std::ops::AddAssign for Money {
    fn add_assign(&mut self, rhs: Self) {
        self.0 += rhs.0;
    }
}

/// Shipping details captured when an order is placed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShippingDetails {
    /// Recipient name; optional, falls back to the account profile.
    pub name: Option<String>,
    /// Contact phone number, required.
    pub phone: String,
    /// Delivery address, required.
    pub address: String,
}

impl ShippingDetails {
    /// Trims all fields and validates that phone and address are present.
    pub fn validated(self) -> Result<Self, DomainError> {
        let name = self
            .name
            .map(|n| n.trim().to_string())
            .filter(|n| !n.is_empty());
        let phone = self.phone.trim().to_string();
        let address = self.address.trim().to_string();

        if phone.is_empty() {
            return Err(DomainError::Validation(
                "shipping_phone must not be empty".to_string(),
            ));
        }
        if address.is_empty() {
            return Err(DomainError::Validation(
                "shipping_address must not be empty".to_string(),
            ));
        }

        Ok(Self {
            name,
            phone,
            address,
        })
    }
}

/// A frozen order line.
///
/// Captures the medicine's identity, seller, and unit price at the moment
/// the order was placed; later catalog changes never touch it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderLine {
    pub medicine_id: MedicineId,
    pub medicine_name: String,
    pub seller_id: UserId,
    pub quantity: u32,
    pub unit_price: Money,
}

impl OrderLine {
    /// Returns the total price for this line.
    pub fn total_price(&self) -> Money {
        self.unit_price.multiply(self.quantity)
    }
}
