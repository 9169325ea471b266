//! Persistence layer for the pharmacy marketplace.
//!
//! The [`PharmacyStore`] trait is the transaction boundary of the system:
//! every method is one atomic unit, and any method that touches both
//! order state and medicine stock performs all of its reads and writes
//! inside a single transaction. Two implementations are provided:
//!
//! - [`PostgresStore`] — SQL transactions with row locks on the medicine
//!   rows being decremented or incremented.
//! - [`MemoryStore`] — a single write lock as the transaction boundary;
//!   used in tests and as the default backend for local runs.

pub mod error;
pub mod memory;
pub mod postgres;

pub use error::{Result, StoreError};
pub use memory::MemoryStore;
pub use postgres::PostgresStore;

use async_trait::async_trait;

use common::{MedicineId, OrderId, UserId};
use domain::{
    Actor, CartView, Medicine, MedicineUpdate, NewMedicine, Order, OrderStatus, Review,
    ShippingDetails,
};

/// A page of results requested by a client.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Page {
    page: u32,
    per_page: u32,
}

impl Page {
    pub const DEFAULT_PER_PAGE: u32 = 20;
    pub const MAX_PER_PAGE: u32 = 100;

    /// Builds a page from optional query parameters, clamping the page to
    /// be 1-based and the page size to `MAX_PER_PAGE`.
    pub fn new(page: Option<u32>, per_page: Option<u32>) -> Self {
        Self {
            page: page.unwrap_or(1).max(1),
            per_page: per_page
                .unwrap_or(Self::DEFAULT_PER_PAGE)
                .clamp(1, Self::MAX_PER_PAGE),
        }
    }

    /// Maximum number of rows on this page.
    pub fn limit(&self) -> i64 {
        i64::from(self.per_page)
    }

    /// Number of rows to skip before this page.
    pub fn offset(&self) -> i64 {
        i64::from(self.page - 1) * i64::from(self.per_page)
    }
}

impl Default for Page {
    fn default() -> Self {
        Self::new(None, None)
    }
}

/// Storage operations for the marketplace.
///
/// Role scoping is enforced inside the store by consulting the policy
/// functions of the domain crate, so both backends behave identically.
#[async_trait]
pub trait PharmacyStore: Send + Sync {
    // -- Catalog --

    /// Lists a new medicine for the given seller.
    async fn create_medicine(&self, seller_id: UserId, new: NewMedicine) -> Result<Medicine>;

    /// Fetches a single medicine.
    async fn get_medicine(&self, id: MedicineId) -> Result<Medicine>;

    /// Lists medicines, optionally including inactive ones.
    async fn list_medicines(&self, include_inactive: bool, page: Page) -> Result<Vec<Medicine>>;

    /// Applies a partial update; only the owning seller or an admin may
    /// update a medicine. Restock deltas use the same atomic increment as
    /// cancellation restocks.
    async fn update_medicine(
        &self,
        actor: &Actor,
        id: MedicineId,
        update: MedicineUpdate,
    ) -> Result<Medicine>;

    // -- Cart --

    /// Returns the user's cart; an empty view if they have none yet.
    async fn get_cart(&self, user_id: UserId) -> Result<CartView>;

    /// Sets the quantity for a medicine in the user's cart, creating the
    /// cart lazily and refreshing the unit price snapshot. Quantity zero
    /// removes the line.
    async fn upsert_cart_item(
        &self,
        user_id: UserId,
        medicine_id: MedicineId,
        quantity: u32,
    ) -> Result<CartView>;

    /// Removes a medicine from the user's cart.
    async fn remove_cart_item(
        &self,
        user_id: UserId,
        medicine_id: MedicineId,
    ) -> Result<CartView>;

    // -- Orders --

    /// Converts the user's cart into an order: validates every line,
    /// freezes prices, reserves stock, and clears the cart, all in one
    /// transaction. Nothing persists on failure.
    async fn place_order(&self, user_id: UserId, shipping: ShippingDetails) -> Result<Order>;

    /// Fetches an order visible to the actor; out-of-scope orders are
    /// reported as not found.
    async fn get_order(&self, actor: &Actor, id: OrderId) -> Result<Order>;

    /// Lists orders in the actor's scope, newest first.
    async fn list_orders(&self, actor: &Actor, page: Page) -> Result<Vec<Order>>;

    /// Drives the order status state machine as an admin or seller.
    /// Transitions into `CANCELLED` restore stock in the same transaction.
    async fn transition_order(
        &self,
        actor: &Actor,
        id: OrderId,
        target: OrderStatus,
    ) -> Result<Order>;

    /// Customer self-cancel: owner only, `PLACED` only, restores stock.
    async fn cancel_own_order(&self, user_id: UserId, id: OrderId) -> Result<Order>;

    // -- Reviews --

    /// Records a review; requires a delivered order containing the
    /// medicine and at most one review per (user, medicine).
    async fn create_review(
        &self,
        user_id: UserId,
        medicine_id: MedicineId,
        rating: i16,
        comment: Option<String>,
    ) -> Result<Review>;

    /// Lists reviews for a medicine, newest first.
    async fn list_reviews(&self, medicine_id: MedicineId) -> Result<Vec<Review>>;
}
