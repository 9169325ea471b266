//! Catalog entries and their validation rules.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use common::{CategoryId, MedicineId, UserId};

use crate::error::DomainError;
use crate::order::Money;

/// A medicine listed in the catalog.
///
/// `stock` is only ever mutated through the atomic reserve/restore
/// operations of the store; it is never read-then-written outside a
/// transaction boundary.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Medicine {
    pub id: MedicineId,
    pub name: String,
    pub price: Money,
    pub stock: i64,
    pub is_active: bool,
    pub seller_id: UserId,
    pub category_id: CategoryId,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Fields for listing a new medicine.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewMedicine {
    pub name: String,
    pub price: Money,
    pub stock: i64,
    pub category_id: CategoryId,
}

impl NewMedicine {
    /// Trims the name and validates price and stock bounds.
    pub fn validated(self) -> Result<Self, DomainError> {
        let name = self.name.trim().to_string();
        if name.is_empty() {
            return Err(DomainError::Validation(
                "name must not be empty".to_string(),
            ));
        }
        if self.price.is_negative() {
            return Err(DomainError::Validation(
                "price must not be negative".to_string(),
            ));
        }
        if self.stock < 0 {
            return Err(DomainError::Validation(
                "stock must not be negative".to_string(),
            ));
        }
        Ok(Self { name, ..self })
    }
}

/// A partial update to a medicine by its seller or an admin.
///
/// `restock` is an additive delta applied through the same atomic
/// increment as cancellation restocks.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MedicineUpdate {
    pub price: Option<Money>,
    pub is_active: Option<bool>,
    pub restock: Option<i64>,
}

impl MedicineUpdate {
    /// Validates field bounds; an all-empty update is rejected.
    pub fn validated(self) -> Result<Self, DomainError> {
        if self.price.is_none() && self.is_active.is_none() && self.restock.is_none() {
            return Err(DomainError::Validation(
                "update must change at least one field".to_string(),
            ));
        }
        if self.price.is_some_and(|p| p.is_negative()) {
            return Err(DomainError::Validation(
                "price must not be negative".to_string(),
            ));
        }
        if self.restock.is_some_and(|delta| delta <= 0) {
            return Err(DomainError::Validation(
                "restock must be a positive quantity".to_string(),
            ));
        }
        Ok(self)
    }
}
