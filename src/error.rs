//! Crate error type and its HTTP rendering.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

use crate::domain::{CartError, OrderError, PriceError, ProductError, QuantityError};

#[derive(Error, Debug)]
pub enum MarketplaceError {
    #[error("{0}")]
    InvalidInput(String),

    #[error("{0}")]
    Unauthenticated(String),

    #[error("{0}")]
    Forbidden(String),

    #[error("{0}")]
    NotFoundOrUnauthorized(String),

    #[error("{0}")]
    NotFound(String),

    #[error("{0}")]
    InvalidState(String),

    #[error("store failure: {0}")]
    StoreFailure(String),

    #[error("media error: {0}")]
    Media(#[from] std::io::Error),

    #[error("internal error: {0}")]
    Internal(String),
}

impl MarketplaceError {
    pub fn status(&self) -> StatusCode {
        match self {
            Self::InvalidInput(_) | Self::InvalidState(_) => StatusCode::BAD_REQUEST,
            Self::Unauthenticated(_) => StatusCode::UNAUTHORIZED,
            Self::Forbidden(_) => StatusCode::FORBIDDEN,
            Self::NotFoundOrUnauthorized(_) | Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::StoreFailure(_) | Self::Media(_) | Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for MarketplaceError {
    fn into_response(self) -> Response {
        let status = self.status();
        let message = if status.is_server_error() {
            tracing::error!(error = %self, "request failed");
            "Internal server error".to_string()
        } else {
            tracing::warn!(status = status.as_u16(), error = %self, "request rejected");
            self.to_string()
        };
        (status, Json(json!({ "message": message, "status": status.as_u16() }))).into_response()
    }
}

impl From<sqlx::Error> for MarketplaceError {
    fn from(err: sqlx::Error) -> Self { Self::StoreFailure(err.to_string()) }
}

impl From<QuantityError> for MarketplaceError {
    fn from(err: QuantityError) -> Self {
        match err {
            QuantityError::BelowMinimum => Self::InvalidState(err.to_string()),
            QuantityError::NotPositive | QuantityError::TooLarge => Self::InvalidInput(err.to_string()),
        }
    }
}

impl From<PriceError> for MarketplaceError {
    fn from(err: PriceError) -> Self { Self::InvalidInput(err.to_string()) }
}

impl From<CartError> for MarketplaceError {
    fn from(err: CartError) -> Self {
        match err {
            CartError::NotFoundOrUnauthorized => Self::NotFoundOrUnauthorized(err.to_string()),
            CartError::InvalidQuantity(q) => q.into(),
        }
    }
}

impl From<OrderError> for MarketplaceError {
    fn from(err: OrderError) -> Self { Self::InvalidState(err.to_string()) }
}

impl From<ProductError> for MarketplaceError {
    fn from(err: ProductError) -> Self {
        match err {
            ProductError::MissingName => Self::InvalidInput(err.to_string()),
            ProductError::NotOwner => Self::Forbidden(err.to_string()),
        }
    }
}

pub type Result<T> = std::result::Result<T, MarketplaceError>;
