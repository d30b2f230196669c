use crate::{
    auth::{verify_jwt, ActorKind},
    error::AppError,
    state::AppState,
};
use axum::{
    async_trait,
    body::Body,
    extract::{FromRequestParts, State},
    http::{request::Parts, Request},
    middleware::Next,
    response::Response,
};
use uuid::Uuid;

/// The verified identity behind a request or WebSocket connection.
#[derive(Debug, Clone)]
pub struct Actor {
    pub id: Uuid,
    pub kind: ActorKind,
    pub username: String,
}

/// Pull a bearer token out of the Authorization header, falling back to a
/// `token=` query parameter for WebSocket clients that cannot set headers.
fn extract_token(auth_header: Option<&str>, query: &str) -> Option<String> {
    if let Some(header) = auth_header {
        return header.strip_prefix("Bearer ").map(str::to_string);
    }

    query
        .split('&')
        .find_map(|p| p.strip_prefix("token="))
        .map(str::to_string)
}

pub async fn auth_middleware(
    State(state): State<AppState>,
    mut req: Request<Body>,
    next: Next,
) -> Result<Response, AppError> {
    let auth_header = req
        .headers()
        .get("Authorization")
        .and_then(|h| h.to_str().ok());
    let query = req.uri().query().unwrap_or("");

    let token = extract_token(auth_header, query)
        .ok_or_else(|| AppError::Unauthorized("Missing credentials".to_string()))?;

    let claims = verify_jwt(&token, &state.config.jwt_secret)?;

    let actor_id = Uuid::parse_str(&claims.sub)
        .map_err(|_| AppError::Unauthorized("Invalid token".to_string()))?;

    // The token subject must still exist in its identity space.
    let exists = match claims.kind {
        ActorKind::Manager => state.user_repository.find_by_id(actor_id).await?.is_some(),
        ActorKind::Client => state
            .client_user_repository
            .find_by_id(actor_id)
            .await?
            .is_some(),
    };
    if !exists {
        return Err(AppError::Unauthorized("User not found".to_string()));
    }

    req.extensions_mut().insert(Actor {
        id: actor_id,
        kind: claims.kind,
        username: claims.username,
    });

    Ok(next.run(req).await)
}

/// Extractor for the authenticated actor stored by [`auth_middleware`].
pub struct AuthActor(pub Actor);

#[async_trait]
impl<S> FromRequestParts<S> for AuthActor
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<Actor>()
            .cloned()
            .map(AuthActor)
            .ok_or_else(|| AppError::Unauthorized("Missing credentials".to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extract_token_prefers_header() {
        let token = extract_token(Some("Bearer abc"), "token=def");
        assert_eq!(token.as_deref(), Some("abc"));
    }

    #[test]
    fn test_extract_token_from_query() {
        let token = extract_token(None, "foo=1&token=def&bar=2");
        assert_eq!(token.as_deref(), Some("def"));
    }

    #[test]
    fn test_extract_token_missing() {
        assert!(extract_token(None, "foo=1").is_none());
        assert!(extract_token(Some("Basic abc"), "").is_none());
    }
}
