use axum::{
    body::Body,
    extract::State,
    http::{header::AUTHORIZATION, Request},
    middleware::Next,
    response::Response,
};
use std::sync::Arc;
use tracing::warn;

use crate::model::actor::Actor;
use crate::service::identity_service::IdentityResolver;
use crate::util::error::HandlerError;

pub struct AuthState {
    pub resolver: Arc<dyn IdentityResolver>,
}

/// Resolves the bearer token into an [`Actor`] request extension. Requests
/// without an `Authorization` header continue as anonymous.
pub async fn identify(
    State(state): State<Arc<AuthState>>,
    mut req: Request<Body>,
    next: Next,
) -> Result<Response, HandlerError> {
    let actor = {
        let header = req
            .headers()
            .get(AUTHORIZATION)
            .map(|value| value.to_str())
            .transpose()
            .map_err(|_| HandlerError::unauthorized("Malformed authorization header"))?;
        state.resolver.resolve_header(header).map_err(|e| {
            warn!("Rejected credentials: {}", e);
            HandlerError::unauthorized(e.to_string())
        })?
    };

    req.extensions_mut().insert(actor);
    Ok(next.run(req).await)
}

fn actor_of(req: &Request<Body>) -> Actor {
    req.extensions().get::<Actor>().cloned().unwrap_or(Actor::Anonymous)
}

pub async fn require_authenticated(req: Request<Body>, next: Next) -> Result<Response, HandlerError> {
    if !actor_of(&req).is_authenticated() {
        return Err(HandlerError::unauthorized("Authentication required"));
    }
    Ok(next.run(req).await)
}

pub async fn require_staff(req: Request<Body>, next: Next) -> Result<Response, HandlerError> {
    match actor_of(&req) {
        Actor::Staff { .. } => Ok(next.run(req).await),
        Actor::Account { .. } => Err(HandlerError::forbidden("Staff access required")),
        Actor::Anonymous => Err(HandlerError::unauthorized("Authentication required")),
    }
}
