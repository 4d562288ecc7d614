//! Bearer authentication middleware

use axum::{
    async_trait,
    extract::{FromRequestParts, Request, State},
    http::{header::AUTHORIZATION, request::Parts},
    middleware::Next,
    response::Response,
};
use rentory_inventory::domain::UserId;
use tracing::{debug, warn};

use crate::{error::ApiError, server::AppState};

/// Caller identity attached to every authenticated request
#[derive(Debug, Clone, PartialEq)]
pub struct AuthContext {
    /// Token subject; every record read or written is scoped to it
    pub user_id: UserId,
}

/// Token from an `Authorization: Bearer <token>` header
pub fn extract_bearer_token(parts: &Parts) -> Option<&str> {
    parts
        .headers
        .get(AUTHORIZATION)
        .and_then(|h| h.to_str().ok())
        .and_then(|h| h.strip_prefix("Bearer "))
        .map(str::trim)
        .filter(|t| !t.is_empty())
}

/// Validate the bearer token and attach an [`AuthContext`]
pub async fn auth_middleware(
    State(state): State<AppState>,
    req: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let (mut parts, body) = req.into_parts();

    let token = extract_bearer_token(&parts).ok_or_else(|| ApiError::MissingAuthentication {
        message: "Missing bearer token".to_string(),
    })?;

    let claims = state.jwt.validate(token).map_err(|e| {
        warn!("Token validation failed: {}", e);
        ApiError::Authentication {
            message: "Invalid token".to_string(),
        }
    })?;

    debug!("Authenticated request for user {}", claims.sub);
    parts.extensions.insert(AuthContext {
        user_id: UserId::new(claims.sub),
    });

    Ok(next.run(Request::from_parts(parts, body)).await)
}

#[async_trait]
impl<S> FromRequestParts<S> for AuthContext
where
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<AuthContext>()
            .cloned()
            .ok_or_else(|| ApiError::MissingAuthentication {
                message: "Request was not authenticated".to_string(),
            })
    }
}
