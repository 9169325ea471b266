//! Actor extraction from gateway-injected identity headers.
//!
//! The authenticating gateway validates the session and forwards the
//! principal as `x-user-id` and `x-user-role` headers; handlers receive
//! it through the [`Identity`] extractor. Requests without a valid
//! identity are rejected with 401 before any handler logic runs.

use axum::extract::{FromRequestParts, OptionalFromRequestParts};
use axum::http::request::Parts;

use common::UserId;
use domain::{Actor, Role};

use crate::error::ApiError;

pub const USER_ID_HEADER: &str = "x-user-id";
pub const USER_ROLE_HEADER: &str = "x-user-role";

/// The authenticated actor on a request.
#[derive(Debug, Clone, Copy)]
pub struct Identity(pub Actor);

fn parse_actor(parts: &Parts) -> Result<Option<Actor>, ApiError> {
    let Some(id_value) = parts.headers.get(USER_ID_HEADER) else {
        return Ok(None);
    };

    let id = id_value
        .to_str()
        .ok()
        .and_then(|s| s.parse::<uuid::Uuid>().ok())
        .ok_or_else(|| ApiError::Unauthorized("Invalid user id header".to_string()))?;

    let role = parts
        .headers
        .get(USER_ROLE_HEADER)
        .and_then(|v| v.to_str().ok())
        .and_then(|s| s.parse::<Role>().ok())
        .ok_or_else(|| ApiError::Unauthorized("Invalid user role header".to_string()))?;

    Ok(Some(Actor::new(UserId::from_uuid(id), role)))
}

impl<S> FromRequestParts<S> for Identity
where
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parse_actor(parts)?
            .map(Identity)
            .ok_or_else(|| ApiError::Unauthorized("Missing identity headers".to_string()))
    }
}

impl<S> OptionalFromRequestParts<S> for Identity
where
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        _state: &S,
    ) -> Result<Option<Self>, Self::Rejection> {
        Ok(parse_actor(parts)?.map(Identity))
    }
}

/// Rejects actors whose role is not in `allowed`.
pub fn require_role(actor: &Actor, allowed: &[Role]) -> Result<(), ApiError> {
    if allowed.contains(&actor.role) {
        Ok(())
    } else {
        Err(ApiError::Store(
            domain::DomainError::Forbidden(format!(
                "Role {} is not allowed to perform this operation",
                actor.role
            ))
            .into(),
        ))
    }
}
