//! Bearer-token interceptor for protected routes.

use axum::{
    extract::{Request, State},
    http::{header, HeaderMap},
    middleware::Next,
    response::Response,
};
use std::sync::Arc;

use crate::auth::TokenIssuer;
use crate::error::{MarketplaceError, Result};

/// Verifies the bearer token and attaches the caller's `Identity` to the
/// request extensions. Never touches the store.
pub async fn require_auth(State(tokens): State<Arc<TokenIssuer>>, mut request: Request, next: Next) -> Result<Response> {
    let identity = tokens.verify_access(bearer_token(request.headers())?)?;
    tracing::debug!(user_id = identity.id, role = %identity.role, "authenticated request");
    request.extensions_mut().insert(identity);
    Ok(next.run(request).await)
}

fn bearer_token(headers: &HeaderMap) -> Result<&str> {
    let missing = || MarketplaceError::Unauthenticated("Access denied. No token provided.".to_string());
    let value = headers.get(header::AUTHORIZATION).ok_or_else(missing)?.to_str().map_err(|_| missing())?;
    let (scheme, token) = value.split_once(' ').ok_or_else(missing)?;
    if !scheme.eq_ignore_ascii_case("bearer") || token.trim().is_empty() {
        return Err(missing());
    }
    Ok(token.trim())
}
