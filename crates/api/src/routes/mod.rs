//! HTTP route handlers.

pub mod cart;
pub mod health;
pub mod medicines;
pub mod metrics;
pub mod orders;
pub mod reviews;

use serde::{Deserialize, Serialize};

use store::Page;

/// Response envelope: `{ "message": ..., "data": ... }`.
#[derive(Serialize)]
pub struct Envelope<T> {
    pub message: String,
    pub data: T,
}

impl<T: Serialize> Envelope<T> {
    pub fn new(message: impl Into<String>, data: T) -> axum::Json<Self> {
        axum::Json(Self {
            message: message.into(),
            data,
        })
    }
}

/// Pagination query parameters, `?page=` and `?per_page=`.
#[derive(Debug, Default, Deserialize)]
pub struct PageQuery {
    pub page: Option<u32>,
    pub per_page: Option<u32>,
}

impl From<PageQuery> for Page {
    fn from(query: PageQuery) -> Self {
        Page::new(query.page, query.per_page)
    }
}
