//! Cart endpoints.

use std::sync::Arc;

use axum::Json;
use axum::extract::{Path, State};
use serde::Deserialize;
use uuid::Uuid;

use common::MedicineId;
use domain::{CartView, Role};
use store::PharmacyStore;

use crate::AppState;
use crate::auth::{Identity, require_role};
use crate::error::ApiError;

use super::Envelope;
use super::medicines::parse_medicine_id;

#[derive(Deserialize)]
pub struct UpsertCartItemRequest {
    pub medicine_id: Option<Uuid>,
    pub quantity: Option<u32>,
}

/// GET /cart — the caller's cart; empty before the first add.
#[tracing::instrument(skip(state))]
pub async fn get<S: PharmacyStore + 'static>(
    State(state): State<Arc<AppState<S>>>,
    Identity(actor): Identity,
) -> Result<Json<Envelope<CartView>>, ApiError> {
    require_role(&actor, &[Role::Customer])?;

    let cart = state.store.get_cart(actor.id).await?;
    Ok(Envelope::new("Cart retrieved", cart))
}

/// PUT /cart/items — set the quantity for a medicine; zero removes it.
#[tracing::instrument(skip(state, req))]
pub async fn upsert_item<S: PharmacyStore + 'static>(
    State(state): State<Arc<AppState<S>>>,
    Identity(actor): Identity,
    Json(req): Json<UpsertCartItemRequest>,
) -> Result<Json<Envelope<CartView>>, ApiError> {
    require_role(&actor, &[Role::Customer])?;

    let medicine_id = req
        .medicine_id
        .map(MedicineId::from_uuid)
        .ok_or_else(|| ApiError::BadRequest("medicine_id is required".to_string()))?;
    let quantity = req
        .quantity
        .ok_or_else(|| ApiError::BadRequest("quantity is required".to_string()))?;

    let cart = state
        .store
        .upsert_cart_item(actor.id, medicine_id, quantity)
        .await?;

    Ok(Envelope::new("Cart updated", cart))
}

/// DELETE /cart/items/:medicine_id — remove a medicine from the cart.
#[tracing::instrument(skip(state))]
pub async fn remove_item<S: PharmacyStore + 'static>(
    State(state): State<Arc<AppState<S>>>,
    Identity(actor): Identity,
    Path(medicine_id): Path<String>,
) -> Result<Json<Envelope<CartView>>, ApiError> {
    require_role(&actor, &[Role::Customer])?;

    let cart = state
        .store
        .remove_cart_item(actor.id, parse_medicine_id(&medicine_id)?)
        .await?;

    Ok(Envelope::new("Cart updated", cart))
}
