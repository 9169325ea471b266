//! Review endpoints.

use std::sync::Arc;

use axum::Json;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use serde::Deserialize;
use uuid::Uuid;

use common::MedicineId;
use domain::{Review, Role};
use store::PharmacyStore;

use crate::AppState;
use crate::auth::{Identity, require_role};
use crate::error::ApiError;

use super::Envelope;
use super::medicines::parse_medicine_id;

#[derive(Deserialize)]
pub struct CreateReviewRequest {
    pub medicine_id: Option<Uuid>,
    pub rating: Option<i16>,
    pub comment: Option<String>,
}

/// POST /review — review a medicine from a delivered order.
#[tracing::instrument(skip(state, req))]
pub async fn create<S: PharmacyStore + 'static>(
    State(state): State<Arc<AppState<S>>>,
    Identity(actor): Identity,
    Json(req): Json<CreateReviewRequest>,
) -> Result<(StatusCode, Json<Envelope<Review>>), ApiError> {
    require_role(&actor, &[Role::Customer])?;

    let medicine_id = req
        .medicine_id
        .map(MedicineId::from_uuid)
        .ok_or_else(|| ApiError::BadRequest("medicine_id is required".to_string()))?;
    let rating = req
        .rating
        .ok_or_else(|| ApiError::BadRequest("rating is required".to_string()))?;

    let review = state
        .store
        .create_review(actor.id, medicine_id, rating, req.comment)
        .await?;

    Ok((
        StatusCode::CREATED,
        Envelope::new("Review created", review),
    ))
}

/// GET /medicine/:id/reviews — list reviews for a medicine.
#[tracing::instrument(skip(state))]
pub async fn list_for_medicine<S: PharmacyStore + 'static>(
    State(state): State<Arc<AppState<S>>>,
    Path(id): Path<String>,
) -> Result<Json<Envelope<Vec<Review>>>, ApiError> {
    let reviews = state.store.list_reviews(parse_medicine_id(&id)?).await?;
    Ok(Envelope::new("Reviews retrieved", reviews))
}
