//! Catalog endpoints.

use std::sync::Arc;

use axum::Json;
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use serde::Deserialize;
use uuid::Uuid;

use common::{CategoryId, MedicineId};
use domain::{Medicine, MedicineUpdate, Money, NewMedicine, Role};
use store::{PharmacyStore, StoreError};

use crate::AppState;
use crate::auth::{Identity, require_role};
use crate::error::ApiError;

use super::{Envelope, PageQuery};

// -- Request types --

#[derive(Deserialize)]
pub struct CreateMedicineRequest {
    pub name: Option<String>,
    pub price_cents: Option<i64>,
    pub stock: Option<i64>,
    pub category_id: Option<Uuid>,
}

#[derive(Deserialize)]
pub struct UpdateMedicineRequest {
    pub price_cents: Option<i64>,
    pub is_active: Option<bool>,
    pub restock: Option<i64>,
}

// -- Handlers --

/// POST /medicine — list a new medicine for the calling seller.
#[tracing::instrument(skip(state, req))]
pub async fn create<S: PharmacyStore + 'static>(
    State(state): State<Arc<AppState<S>>>,
    Identity(actor): Identity,
    Json(req): Json<CreateMedicineRequest>,
) -> Result<(StatusCode, Json<Envelope<Medicine>>), ApiError> {
    require_role(&actor, &[Role::Seller, Role::Admin])?;

    let price_cents = req
        .price_cents
        .ok_or_else(|| ApiError::BadRequest("price_cents is required".to_string()))?;

    let new = NewMedicine {
        name: req.name.unwrap_or_default(),
        price: Money::from_cents(price_cents),
        stock: req.stock.unwrap_or(0),
        category_id: req
            .category_id
            .map(CategoryId::from_uuid)
            .unwrap_or_default(),
    };

    let medicine = state.store.create_medicine(actor.id, new).await?;

    Ok((
        StatusCode::CREATED,
        Envelope::new("Medicine created", medicine),
    ))
}

/// GET /medicine — list the catalog; sellers and admins also see
/// inactive entries.
#[tracing::instrument(skip(state))]
pub async fn list<S: PharmacyStore + 'static>(
    State(state): State<Arc<AppState<S>>>,
    identity: Option<Identity>,
    Query(page): Query<PageQuery>,
) -> Result<Json<Envelope<Vec<Medicine>>>, ApiError> {
    let include_inactive =
        identity.is_some_and(|Identity(a)| matches!(a.role, Role::Seller | Role::Admin));
    let medicines = state
        .store
        .list_medicines(include_inactive, page.into())
        .await?;

    Ok(Envelope::new("Medicines retrieved", medicines))
}

/// GET /medicine/:id — fetch a single medicine.
#[tracing::instrument(skip(state))]
pub async fn get<S: PharmacyStore + 'static>(
    State(state): State<Arc<AppState<S>>>,
    identity: Option<Identity>,
    Path(id): Path<String>,
) -> Result<Json<Envelope<Medicine>>, ApiError> {
    let medicine = state.store.get_medicine(parse_medicine_id(&id)?).await?;

    let privileged =
        identity.is_some_and(|Identity(a)| matches!(a.role, Role::Seller | Role::Admin));
    if !medicine.is_active && !privileged {
        return Err(StoreError::not_found("Medicine").into());
    }

    Ok(Envelope::new("Medicine retrieved", medicine))
}

/// PATCH /medicine/:id — price, activation, or restock update by the
/// owning seller or an admin.
#[tracing::instrument(skip(state, req))]
pub async fn update<S: PharmacyStore + 'static>(
    State(state): State<Arc<AppState<S>>>,
    Identity(actor): Identity,
    Path(id): Path<String>,
    Json(req): Json<UpdateMedicineRequest>,
) -> Result<Json<Envelope<Medicine>>, ApiError> {
    require_role(&actor, &[Role::Seller, Role::Admin])?;

    let update = MedicineUpdate {
        price: req.price_cents.map(Money::from_cents),
        is_active: req.is_active,
        restock: req.restock,
    };

    let medicine = state
        .store
        .update_medicine(&actor, parse_medicine_id(&id)?, update)
        .await?;

    Ok(Envelope::new("Medicine updated", medicine))
}

pub(super) fn parse_medicine_id(id: &str) -> Result<MedicineId, ApiError> {
    let uuid = uuid::Uuid::parse_str(id)
        .map_err(|e| ApiError::BadRequest(format!("Invalid medicine id: {e}")))?;
    Ok(MedicineId::from_uuid(uuid))
}
