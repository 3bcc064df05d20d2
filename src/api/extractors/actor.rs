use axum::{
    extract::FromRequestParts,
    http::request::Parts,
};
use tracing::Span;

use crate::domain::models::actor::{role, Actor};
use crate::error::AppError;

const ACTOR_ID_HEADER: &str = "X-Actor-Id";
const ACTOR_ROLE_HEADER: &str = "X-Actor-Role";

/// Identity injected by the authenticating gateway. The engine never sees
/// credentials; it trusts these headers the way it trusts its reverse
/// proxy to have verified them.
pub struct GatewayActor(pub Actor);

/// Present on authenticated calls, absent on the public submission path.
pub struct MaybeActor(pub Option<Actor>);

fn actor_from_parts(parts: &Parts) -> Result<Option<Actor>, AppError> {
    let Some(id_header) = parts.headers.get(ACTOR_ID_HEADER) else {
        return Ok(None);
    };

    let id = id_header
        .to_str()
        .map_err(|_| AppError::Unauthorized)?
        .to_string();
    if id.is_empty() {
        return Err(AppError::Unauthorized);
    }

    let role_value = parts
        .headers
        .get(ACTOR_ROLE_HEADER)
        .ok_or(AppError::Unauthorized)?
        .to_str()
        .map_err(|_| AppError::Unauthorized)?
        .to_uppercase();

    if !role::is_valid(&role_value) {
        return Err(AppError::Forbidden(format!("Unknown role '{}'", role_value)));
    }

    let actor = Actor { id, role: role_value };
    Span::current().record("actor_id", actor.id.as_str());
    Ok(Some(actor))
}

impl<S> FromRequestParts<S> for GatewayActor
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        match actor_from_parts(parts)? {
            Some(actor) => Ok(GatewayActor(actor)),
            None => Err(AppError::Unauthorized),
        }
    }
}

impl<S> FromRequestParts<S> for MaybeActor
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        Ok(MaybeActor(actor_from_parts(parts)?))
    }
}
