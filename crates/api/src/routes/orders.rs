//! Order placement, retrieval, tracking, and status endpoints.

use std::str::FromStr;
use std::sync::Arc;

use axum::Json;
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use metrics::counter;
use serde::{Deserialize, Serialize};

use common::OrderId;
use domain::{Order, OrderStatus, Role, ShippingDetails};
use store::PharmacyStore;

use crate::AppState;
use crate::auth::{Identity, require_role};
use crate::error::ApiError;

use super::{Envelope, PageQuery};

// -- Request types --

#[derive(Deserialize)]
pub struct PlaceOrderRequest {
    pub shipping_name: Option<String>,
    pub shipping_phone: Option<String>,
    pub shipping_address: Option<String>,
}

#[derive(Deserialize)]
pub struct UpdateStatusRequest {
    pub status: String,
}

// -- Response types --

#[derive(Serialize)]
pub struct OrderResponse {
    pub id: String,
    pub user_id: String,
    pub status: String,
    pub total_cents: i64,
    pub shipping_name: Option<String>,
    pub shipping_phone: String,
    pub shipping_address: String,
    pub items: Vec<OrderItemResponse>,
    pub created_at: String,
    pub updated_at: String,
}

#[derive(Serialize)]
pub struct OrderItemResponse {
    pub medicine_id: String,
    pub medicine_name: String,
    pub quantity: u32,
    pub unit_price_cents: i64,
}

#[derive(Serialize)]
pub struct TrackResponse {
    pub status: String,
}

impl From<Order> for OrderResponse {
    fn from(order: Order) -> Self {
        let items = order
            .lines
            .into_iter()
            .map(|line| OrderItemResponse {
                medicine_id: line.medicine_id.to_string(),
                medicine_name: line.medicine_name,
                quantity: line.quantity,
                unit_price_cents: line.unit_price.cents(),
            })
            .collect();

        Self {
            id: order.id.to_string(),
            user_id: order.user_id.to_string(),
            status: order.status.to_string(),
            total_cents: order.total.cents(),
            shipping_name: order.shipping.name,
            shipping_phone: order.shipping.phone,
            shipping_address: order.shipping.address,
            items,
            created_at: order.created_at.to_rfc3339(),
            updated_at: order.updated_at.to_rfc3339(),
        }
    }
}

// -- Handlers --

/// POST /order — convert the caller's cart into an order.
#[tracing::instrument(skip(state, req))]
pub async fn create<S: PharmacyStore + 'static>(
    State(state): State<Arc<AppState<S>>>,
    Identity(actor): Identity,
    Json(req): Json<PlaceOrderRequest>,
) -> Result<(StatusCode, Json<Envelope<OrderResponse>>), ApiError> {
    require_role(&actor, &[Role::Customer])?;

    let shipping = ShippingDetails {
        name: req.shipping_name,
        phone: req.shipping_phone.unwrap_or_default(),
        address: req.shipping_address.unwrap_or_default(),
    };

    let order = state.store.place_order(actor.id, shipping).await?;
    counter!("orders_placed_total").increment(1);

    Ok((
        StatusCode::CREATED,
        Envelope::new("Order placed", OrderResponse::from(order)),
    ))
}

/// GET /order — list orders in the caller's scope.
#[tracing::instrument(skip(state))]
pub async fn list<S: PharmacyStore + 'static>(
    State(state): State<Arc<AppState<S>>>,
    Identity(actor): Identity,
    Query(page): Query<PageQuery>,
) -> Result<Json<Envelope<Vec<OrderResponse>>>, ApiError> {
    let orders = state.store.list_orders(&actor, page.into()).await?;
    let responses: Vec<OrderResponse> = orders.into_iter().map(OrderResponse::from).collect();

    Ok(Envelope::new("Orders retrieved", responses))
}

/// GET /order/:id — fetch a single order in the caller's scope.
#[tracing::instrument(skip(state))]
pub async fn get<S: PharmacyStore + 'static>(
    State(state): State<Arc<AppState<S>>>,
    Identity(actor): Identity,
    Path(id): Path<String>,
) -> Result<Json<Envelope<OrderResponse>>, ApiError> {
    let order = state.store.get_order(&actor, parse_order_id(&id)?).await?;

    Ok(Envelope::new("Order retrieved", OrderResponse::from(order)))
}

/// GET /order/:id/track — return only the order's status.
#[tracing::instrument(skip(state))]
pub async fn track<S: PharmacyStore + 'static>(
    State(state): State<Arc<AppState<S>>>,
    Identity(actor): Identity,
    Path(id): Path<String>,
) -> Result<Json<Envelope<TrackResponse>>, ApiError> {
    let order = state.store.get_order(&actor, parse_order_id(&id)?).await?;

    Ok(Envelope::new(
        "Order status retrieved",
        TrackResponse {
            status: order.status.to_string(),
        },
    ))
}

/// PATCH /order/:id/cancel — customer self-cancel of a PLACED order.
#[tracing::instrument(skip(state))]
pub async fn cancel<S: PharmacyStore + 'static>(
    State(state): State<Arc<AppState<S>>>,
    Identity(actor): Identity,
    Path(id): Path<String>,
) -> Result<Json<Envelope<OrderResponse>>, ApiError> {
    let order = state
        .store
        .cancel_own_order(actor.id, parse_order_id(&id)?)
        .await?;
    counter!("orders_cancelled_total").increment(1);

    Ok(Envelope::new("Order cancelled", OrderResponse::from(order)))
}

/// PATCH /order/seller/:id/status — seller/admin-driven status change.
#[tracing::instrument(skip(state, req))]
pub async fn update_status<S: PharmacyStore + 'static>(
    State(state): State<Arc<AppState<S>>>,
    Identity(actor): Identity,
    Path(id): Path<String>,
    Json(req): Json<UpdateStatusRequest>,
) -> Result<Json<Envelope<OrderResponse>>, ApiError> {
    require_role(&actor, &[Role::Seller, Role::Admin])?;

    let target = OrderStatus::from_str(&req.status)?;
    let order = state
        .store
        .transition_order(&actor, parse_order_id(&id)?, target)
        .await?;
    counter!("order_transitions_total", "target" => target.as_str()).increment(1);

    Ok(Envelope::new("Order status updated", OrderResponse::from(order)))
}

fn parse_order_id(id: &str) -> Result<OrderId, ApiError> {
    let uuid = uuid::Uuid::parse_str(id)
        .map_err(|e| ApiError::BadRequest(format!("Invalid order id: {e}")))?;
    Ok(OrderId::from_uuid(uuid))
}
