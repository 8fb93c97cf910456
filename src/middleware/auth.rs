// src/middleware/auth.rs

use axum::{
    extract::{FromRequestParts, Request, State},
    http::{header::AUTHORIZATION, request::Parts},
    middleware::Next,
    response::Response,
};

use crate::{common::error::AppError, config::AppState, models::auth::Actor};

// Verifies the bearer token and stores the Actor in the request extensions
pub async fn auth_guard(
    State(app_state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Result<Response, AppError> {
    let token = request
        .headers()
        .get(AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.strip_prefix("Bearer "))
        .ok_or(AppError::InvalidToken)?;

    let actor = app_state.auth_service.validate_token(token)?;
    tracing::debug!("🔑 {} ({:?}) on workshop {}", actor.name, actor.role, actor.workshop_id);

    request.extensions_mut().insert(actor);
    Ok(next.run(request).await)
}

// Handlers take the actor directly instead of digging in extensions
pub struct AuthenticatedActor(pub Actor);

impl<S> FromRequestParts<S> for AuthenticatedActor
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<Actor>()
            .cloned()
            .map(AuthenticatedActor)
            .ok_or(AppError::InvalidToken)
    }
}
