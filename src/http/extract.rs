//! Extractors whose rejections render as `MarketplaceError` JSON.

use axum::{
    async_trait,
    extract::{FromRequest, FromRequestParts, Path, Request},
    http::request::Parts,
    Json,
};
use serde::de::DeserializeOwned;

use crate::auth::Identity;
use crate::domain::Role;
use crate::error::{MarketplaceError, Result};

/// `Json<T>` whose malformed or incomplete bodies are `InvalidInput`.
pub struct ApiJson<T>(pub T);

#[async_trait]
impl<T, S> FromRequest<S> for ApiJson<T>
where
    T: DeserializeOwned,
    S: Send + Sync,
{
    type Rejection = MarketplaceError;

    async fn from_request(req: Request, state: &S) -> Result<Self> {
        let Json(value) = Json::<T>::from_request(req, state).await.map_err(|e| MarketplaceError::InvalidInput(e.body_text()))?;
        Ok(Self(value))
    }
}

pub struct ApiPath<T>(pub T);

#[async_trait]
impl<T, S> FromRequestParts<S> for ApiPath<T>
where
    T: DeserializeOwned + Send,
    S: Send + Sync,
{
    type Rejection = MarketplaceError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self> {
        let Path(value) = Path::<T>::from_request_parts(parts, state).await.map_err(|e| MarketplaceError::InvalidInput(e.body_text()))?;
        Ok(Self(value))
    }
}

/// The identity `require_auth` attached to the request.
pub struct Caller(pub Identity);

impl Caller {
    /// The caller's id, provided they hold `role`.
    pub fn as_role(&self, role: Role) -> Result<i64> {
        self.0.require(role)?;
        Ok(self.0.id)
    }
}

#[async_trait]
impl<S: Send + Sync> FromRequestParts<S> for Caller {
    type Rejection = MarketplaceError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self> {
        parts
            .extensions
            .get::<Identity>()
            .cloned()
            .map(Caller)
            .ok_or_else(|| MarketplaceError::Unauthenticated("Access denied. No token provided.".to_string()))
    }
}
