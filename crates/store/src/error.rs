use thiserror::Error;

use domain::DomainError;

/// Errors that can occur when interacting with the store.
#[derive(Debug, Error)]
pub enum StoreError {
    /// A domain rule rejected the operation.
    #[error(transparent)]
    Domain(#[from] DomainError),

    /// The requested entity does not exist, or is outside the actor's
    /// scope and must not be revealed to exist.
    #[error("{entity} not found")]
    NotFound { entity: &'static str },

    /// The user already reviewed this medicine.
    #[error("Review already exists for this medicine")]
    DuplicateReview,

    /// A database error occurred.
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// A database migration error occurred.
    #[error("Migration error: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),
}

impl StoreError {
    /// Shorthand for a not-found error on the given entity.
    pub fn not_found(entity: &'static str) -> Self {
        StoreError::NotFound { entity }
    }
}

/// Result type for store operations.
pub type Result<T> = std::result::Result<T, StoreError>;
