//! HTTP API server for the pharmacy marketplace.
//!
//! Exposes the order lifecycle, catalog, cart, and review endpoints with
//! structured logging (tracing) and Prometheus metrics. Identity arrives
//! as gateway-validated headers and is turned into a [`domain::Actor`]
//! before any handler runs.

pub mod auth;
pub mod config;
pub mod error;
pub mod routes;

use std::sync::Arc;

use axum::Router;
use axum::routing::{delete, get, patch, post, put};
use metrics_exporter_prometheus::PrometheusHandle;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use store::PharmacyStore;

/// Shared application state accessible from all handlers.
pub struct AppState<S: PharmacyStore> {
    pub store: S,
}

impl<S: PharmacyStore> AppState<S> {
    /// Creates application state over the given store.
    pub fn new(store: S) -> Arc<Self> {
        Arc::new(Self { store })
    }
}

/// Creates the Axum application router with all routes and shared state.
pub fn create_app<S: PharmacyStore + 'static>(
    state: Arc<AppState<S>>,
    metrics_handle: PrometheusHandle,
) -> Router {
    let metrics_router = Router::new()
        .route("/metrics", get(routes::metrics::render))
        .with_state(metrics_handle);

    Router::new()
        .route("/health", get(routes::health::check))
        .route(
            "/order",
            post(routes::orders::create::<S>).get(routes::orders::list::<S>),
        )
        .route("/order/{id}", get(routes::orders::get::<S>))
        .route("/order/{id}/track", get(routes::orders::track::<S>))
        .route("/order/{id}/cancel", patch(routes::orders::cancel::<S>))
        .route(
            "/order/seller/{id}/status",
            patch(routes::orders::update_status::<S>),
        )
        .route(
            "/medicine",
            post(routes::medicines::create::<S>).get(routes::medicines::list::<S>),
        )
        .route(
            "/medicine/{id}",
            get(routes::medicines::get::<S>).patch(routes::medicines::update::<S>),
        )
        .route(
            "/medicine/{id}/reviews",
            get(routes::reviews::list_for_medicine::<S>),
        )
        .route("/review", post(routes::reviews::create::<S>))
        .route("/cart", get(routes::cart::get::<S>))
        .route("/cart/items", put(routes::cart::upsert_item::<S>))
        .route(
            "/cart/items/{medicine_id}",
            delete(routes::cart::remove_item::<S>),
        )
        .with_state(state)
        .merge(metrics_router)
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .layer(TraceLayer::new_for_http())
}
