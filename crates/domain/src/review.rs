//! Medicine reviews.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use common::{MedicineId, ReviewId, UserId};

use crate::error::DomainError;

/// A customer's review of a medicine they received.
///
/// At most one per (user, medicine); only permitted once the user has a
/// delivered order containing the medicine.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Review {
    pub id: ReviewId,
    pub user_id: UserId,
    pub medicine_id: MedicineId,
    pub rating: i16,
    pub comment: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// Validates a rating against the 1..=5 scale.
pub fn validate_rating(rating: i16) -> Result<(), DomainError> {
    if !(1..=5).contains(&rating) {
        return Err(DomainError::InvalidRating { rating });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ratings_outside_scale_are_rejected() {
        assert!(validate_rating(0).is_err());
        assert!(validate_rating(6).is_err());
        assert!(validate_rating(-3).is_err());
        for rating in 1..=5 {
            assert!(validate_rating(rating).is_ok());
        }
    }
}
