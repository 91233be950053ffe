//! Product Aggregate

use chrono::{DateTime, Utc};
use serde::Serialize;
use crate::domain::value_objects::Price;

/// A catalog entry owned by exactly one seller. The name is fixed at creation.
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Product {
    pub id: i64,
    pub name: String,
    pub description: String,
    pub price: Price,
    #[serde(rename = "image")]
    pub image_path: Option<String>,
    pub seller_id: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Clone, Debug)]
pub struct NewProduct {
    pub name: String,
    pub description: String,
    pub price: Price,
    pub image_path: Option<String>,
    pub seller_id: i64,
}

impl NewProduct {
    pub fn new(seller_id: i64, name: &str, description: &str, price: Price, image_path: Option<String>) -> Result<Self, ProductError> {
        let name = name.trim();
        if name.is_empty() { return Err(ProductError::MissingName); }
        Ok(Self { name: name.to_string(), description: description.trim().to_string(), price, image_path, seller_id })
    }
}

impl Product {
    pub fn is_owned_by(&self, seller_id: i64) -> bool { self.seller_id == seller_id }

    pub fn ensure_owned_by(&self, seller_id: i64) -> Result<(), ProductError> {
        if self.is_owned_by(seller_id) { Ok(()) } else { Err(ProductError::NotOwner) }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)] pub enum ProductError { MissingName, NotOwner }
impl std::error::Error for ProductError {}
impl std::fmt::Display for ProductError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::MissingName => write!(f, "product name is required"),
            Self::NotOwner => write!(f, "Access denied: you are not authorized to update this product"),
        }
    }
}
