//! In-memory store implementation for tests and local runs.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::RwLock;

use common::{CartId, MedicineId, OrderId, ReviewId, UserId};
use domain::{
    Actor, CartItemView, CartLine, CartView, DomainError, Medicine, MedicineUpdate, NewMedicine,
    Order, OrderDraft, OrderStatus, Review, Role, ShippingDetails, TransitionPlan, can_view,
    plan_self_cancel, plan_transition, validate_rating,
};

use crate::error::{Result, StoreError};
use crate::{Page, PharmacyStore};

#[derive(Debug, Clone)]
struct StoredCartItem {
    medicine_id: MedicineId,
    quantity: u32,
    unit_price: domain::Money,
}

#[derive(Debug, Clone)]
struct StoredCart {
    id: CartId,
    items: Vec<StoredCartItem>,
}

#[derive(Default)]
struct MemoryState {
    medicines: HashMap<MedicineId, Medicine>,
    carts: HashMap<UserId, StoredCart>,
    orders: Vec<Order>,
    reviews: Vec<Review>,
}

/// In-memory store.
///
/// Provides the same interface and semantics as the PostgreSQL
/// implementation; the state write lock is the transaction boundary, so
/// every operation is atomic and validations never interleave with
/// mutations from other requests.
#[derive(Clone, Default)]
pub struct MemoryStore {
    state: Arc<RwLock<MemoryState>>,
}

impl MemoryStore {
    /// Creates a new empty in-memory store.
    pub fn new() -> Self {
        Self::default()
    }

    fn cart_view(state: &MemoryState, user_id: UserId) -> Result<CartView> {
        let Some(cart) = state.carts.get(&user_id) else {
            return Ok(CartView::empty());
        };

        let items = cart
            .items
            .iter()
            .map(|item| {
                let medicine = state
                    .medicines
                    .get(&item.medicine_id)
                    .ok_or_else(|| StoreError::not_found("Medicine"))?;
                Ok(CartItemView {
                    medicine_id: item.medicine_id,
                    medicine_name: medicine.name.clone(),
                    quantity: item.quantity,
                    unit_price: item.unit_price,
                })
            })
            .collect::<Result<Vec<_>>>()?;

        Ok(CartView::new(items))
    }

    fn restore_stock(state: &mut MemoryState, order_index: usize) {
        let lines: Vec<(MedicineId, u32)> = state.orders[order_index]
            .lines
            .iter()
            .map(|line| (line.medicine_id, line.quantity))
            .collect();
        for (medicine_id, quantity) in lines {
            if let Some(medicine) = state.medicines.get_mut(&medicine_id) {
                medicine.stock += i64::from(quantity);
                medicine.updated_at = Utc::now();
            }
        }
    }
}

#[async_trait]
impl PharmacyStore for MemoryStore {
    async fn create_medicine(&self, seller_id: UserId, new: NewMedicine) -> Result<Medicine> {
        let new = new.validated()?;
        let now = Utc::now();
        let medicine = Medicine {
            id: MedicineId::new(),
            name: new.name,
            price: new.price,
            stock: new.stock,
            is_active: true,
            seller_id,
            category_id: new.category_id,
            created_at: now,
            updated_at: now,
        };

        let mut state = self.state.write().await;
        state.medicines.insert(medicine.id, medicine.clone());
        Ok(medicine)
    }

    async fn get_medicine(&self, id: MedicineId) -> Result<Medicine> {
        let state = self.state.read().await;
        state
            .medicines
            .get(&id)
            .cloned()
            .ok_or_else(|| StoreError::not_found("Medicine"))
    }

    async fn list_medicines(&self, include_inactive: bool, page: Page) -> Result<Vec<Medicine>> {
        let state = self.state.read().await;
        let mut medicines: Vec<Medicine> = state
            .medicines
            .values()
            .filter(|m| include_inactive || m.is_active)
            .cloned()
            .collect();
        medicines.sort_by(|a, b| b.created_at.cmp(&a.created_at));

        Ok(medicines
            .into_iter()
            .skip(page.offset() as usize)
            .take(page.limit() as usize)
            .collect())
    }

    async fn update_medicine(
        &self,
        actor: &Actor,
        id: MedicineId,
        update: MedicineUpdate,
    ) -> Result<Medicine> {
        let update = update.validated()?;
        let mut state = self.state.write().await;

        let medicine = state
            .medicines
            .get_mut(&id)
            .ok_or_else(|| StoreError::not_found("Medicine"))?;

        if actor.role != Role::Admin && medicine.seller_id != actor.id {
            return Err(DomainError::Forbidden(
                "Only the owning seller can update this medicine".to_string(),
            )
            .into());
        }

        if let Some(price) = update.price {
            medicine.price = price;
        }
        if let Some(is_active) = update.is_active {
            medicine.is_active = is_active;
        }
        if let Some(delta) = update.restock {
            medicine.stock += delta;
        }
        medicine.updated_at = Utc::now();

        Ok(medicine.clone())
    }

    async fn get_cart(&self, user_id: UserId) -> Result<CartView> {
        let state = self.state.read().await;
        Self::cart_view(&state, user_id)
    }

    async fn upsert_cart_item(
        &self,
        user_id: UserId,
        medicine_id: MedicineId,
        quantity: u32,
    ) -> Result<CartView> {
        let mut state = self.state.write().await;

        let medicine = state
            .medicines
            .get(&medicine_id)
            .ok_or_else(|| StoreError::not_found("Medicine"))?;
        if !medicine.is_active {
            return Err(DomainError::MedicineUnavailable { medicine_id }.into());
        }
        let unit_price = medicine.price;

        let cart = state.carts.entry(user_id).or_insert_with(|| StoredCart {
            id: CartId::new(),
            items: Vec::new(),
        });

        if quantity == 0 {
            cart.items.retain(|item| item.medicine_id != medicine_id);
        } else if let Some(item) = cart
            .items
            .iter_mut()
            .find(|item| item.medicine_id == medicine_id)
        {
            item.quantity = quantity;
            item.unit_price = unit_price;
        } else {
            cart.items.push(StoredCartItem {
                medicine_id,
                quantity,
                unit_price,
            });
        }

        Self::cart_view(&state, user_id)
    }

    async fn remove_cart_item(
        &self,
        user_id: UserId,
        medicine_id: MedicineId,
    ) -> Result<CartView> {
        let mut state = self.state.write().await;

        if let Some(cart) = state.carts.get_mut(&user_id) {
            cart.items.retain(|item| item.medicine_id != medicine_id);
        }

        Self::cart_view(&state, user_id)
    }

    async fn place_order(&self, user_id: UserId, shipping: ShippingDetails) -> Result<Order> {
        let shipping = shipping.validated()?;
        let mut state = self.state.write().await;

        let cart_lines = match state.carts.get(&user_id) {
            Some(cart) => cart
                .items
                .iter()
                .map(|item| {
                    let medicine = state
                        .medicines
                        .get(&item.medicine_id)
                        .ok_or_else(|| StoreError::not_found("Medicine"))?;
                    Ok(CartLine {
                        cart_id: cart.id,
                        medicine_id: medicine.id,
                        medicine_name: medicine.name.clone(),
                        seller_id: medicine.seller_id,
                        quantity: item.quantity,
                        price: medicine.price,
                        stock: medicine.stock,
                        is_active: medicine.is_active,
                    })
                })
                .collect::<Result<Vec<_>>>()?,
            None => Vec::new(),
        };

        let draft = OrderDraft::build(&cart_lines)?;

        // Reserve stock; the draft already validated every line under
        // this same lock.
        for line in &draft.lines {
            if let Some(medicine) = state.medicines.get_mut(&line.medicine_id) {
                medicine.stock -= i64::from(line.quantity);
                medicine.updated_at = Utc::now();
            }
        }

        if let Some(cart) = state.carts.get_mut(&user_id) {
            cart.items.clear();
        }

        let now = Utc::now();
        let order = Order {
            id: OrderId::new(),
            user_id,
            status: OrderStatus::Placed,
            total: draft.total,
            shipping,
            lines: draft.lines,
            created_at: now,
            updated_at: now,
        };
        state.orders.push(order.clone());

        Ok(order)
    }

    async fn get_order(&self, actor: &Actor, id: OrderId) -> Result<Order> {
        let state = self.state.read().await;
        let order = state
            .orders
            .iter()
            .find(|order| order.id == id)
            .ok_or_else(|| StoreError::not_found("Order"))?;

        if !can_view(actor, order) {
            return Err(StoreError::not_found("Order"));
        }

        Ok(order.clone())
    }

    async fn list_orders(&self, actor: &Actor, page: Page) -> Result<Vec<Order>> {
        let state = self.state.read().await;

        Ok(state
            .orders
            .iter()
            .rev()
            .filter(|order| can_view(actor, order))
            .skip(page.offset() as usize)
            .take(page.limit() as usize)
            .cloned()
            .collect())
    }

    async fn transition_order(
        &self,
        actor: &Actor,
        id: OrderId,
        target: OrderStatus,
    ) -> Result<Order> {
        let mut state = self.state.write().await;

        let index = state
            .orders
            .iter()
            .position(|order| order.id == id)
            .ok_or_else(|| StoreError::not_found("Order"))?;

        let plan = plan_transition(actor, &state.orders[index], target)?;

        match plan {
            TransitionPlan::Noop => Ok(state.orders[index].clone()),
            TransitionPlan::Apply { restock } => {
                if restock {
                    Self::restore_stock(&mut state, index);
                }
                let order = &mut state.orders[index];
                order.status = target;
                order.updated_at = Utc::now();
                Ok(order.clone())
            }
        }
    }

    async fn cancel_own_order(&self, user_id: UserId, id: OrderId) -> Result<Order> {
        let mut state = self.state.write().await;

        let index = state
            .orders
            .iter()
            .position(|order| order.id == id)
            .ok_or_else(|| StoreError::not_found("Order"))?;

        plan_self_cancel(user_id, &state.orders[index])?;

        Self::restore_stock(&mut state, index);
        let order = &mut state.orders[index];
        order.status = OrderStatus::Cancelled;
        order.updated_at = Utc::now();
        Ok(order.clone())
    }

    async fn create_review(
        &self,
        user_id: UserId,
        medicine_id: MedicineId,
        rating: i16,
        comment: Option<String>,
    ) -> Result<Review> {
        validate_rating(rating)?;
        let mut state = self.state.write().await;

        let delivered = state.orders.iter().any(|order| {
            order.user_id == user_id
                && order.status == OrderStatus::Delivered
                && order.lines.iter().any(|line| line.medicine_id == medicine_id)
        });
        if !delivered {
            return Err(DomainError::ReviewNotAllowed.into());
        }

        let duplicate = state
            .reviews
            .iter()
            .any(|review| review.user_id == user_id && review.medicine_id == medicine_id);
        if duplicate {
            return Err(StoreError::DuplicateReview);
        }

        let review = Review {
            id: ReviewId::new(),
            user_id,
            medicine_id,
            rating,
            comment,
            created_at: Utc::now(),
        };
        state.reviews.push(review.clone());
        Ok(review)
    }

    async fn list_reviews(&self, medicine_id: MedicineId) -> Result<Vec<Review>> {
        let state = self.state.read().await;
        Ok(state
            .reviews
            .iter()
            .rev()
            .filter(|review| review.medicine_id == medicine_id)
            .cloned()
            .collect())
    }
}
