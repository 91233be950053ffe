//! `/api/seller` handlers, including the two multipart upload forms.

use axum::{
    extract::{multipart::MultipartRejection, Multipart, State},
    http::StatusCode,
    Json,
};
use rust_decimal::Decimal;
use serde::Deserialize;
use serde_json::{json, Value};
use std::collections::HashMap;
use std::str::FromStr;

use super::{ApiJson, ApiPath, AppState, Caller};
use crate::domain::Role;
use crate::error::{MarketplaceError, Result};
use crate::services::{ImageUpload, ProductDraft};

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SetPriceBody {
    pub product_id: i64,
    pub new_price: Decimal,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateDescriptionBody {
    pub product_id: i64,
    pub new_description: String,
}

/// Text fields plus the optional `image` file part.
#[derive(Debug, Default)]
struct UploadForm {
    fields: HashMap<String, String>,
    image: Option<ImageUpload>,
}

impl UploadForm {
    async fn read(multipart: std::result::Result<Multipart, MultipartRejection>) -> Result<Self> {
        let mut multipart = multipart.map_err(|e| MarketplaceError::InvalidInput(e.body_text()))?;
        let bad_form = |e: axum::extract::multipart::MultipartError| MarketplaceError::InvalidInput(e.body_text());
        let mut form = Self::default();
        while let Some(field) = multipart.next_field().await.map_err(bad_form)? {
            let name = field.name().unwrap_or_default().to_string();
            if name == "image" {
                let content_type = field.content_type().map(str::to_string);
                let bytes = field.bytes().await.map_err(bad_form)?;
                if !bytes.is_empty() {
                    form.image = Some(ImageUpload { content_type, bytes: bytes.to_vec() });
                }
            } else {
                let value = field.text().await.map_err(bad_form)?;
                form.fields.insert(name, value);
            }
        }
        Ok(form)
    }

    fn text(&self, name: &str) -> Result<&str> {
        self.fields
            .get(name)
            .map(|v| v.trim())
            .filter(|v| !v.is_empty())
            .ok_or_else(|| MarketplaceError::InvalidInput(format!("{} is required", name)))
    }

    fn parsed<T: FromStr>(&self, name: &str) -> Result<T> {
        self.text(name)?.parse().map_err(|_| MarketplaceError::InvalidInput(format!("{} must be a number", name)))
    }
}

fn product_body(message: &str, product: impl serde::Serialize) -> Json<Value> {
    Json(json!({ "message": message, "product": product }))
}

pub async fn add_product(
    State(state): State<AppState>,
    caller: Caller,
    multipart: std::result::Result<Multipart, MultipartRejection>,
) -> Result<(StatusCode, Json<Value>)> {
    let seller_id = caller.as_role(Role::Seller)?;
    let mut form = UploadForm::read(multipart).await?;
    let draft = ProductDraft {
        name: form.text("name")?.to_string(),
        description: form.text("description")?.to_string(),
        price: form.parsed::<Decimal>("price")?,
        image: form.image.take(),
    };
    let product = state.services.catalog.create(seller_id, draft).await?;
    Ok((StatusCode::CREATED, product_body("Product added successfully", product)))
}

pub async fn set_price(State(state): State<AppState>, caller: Caller, ApiJson(body): ApiJson<SetPriceBody>) -> Result<Json<Value>> {
    let seller_id = caller.as_role(Role::Seller)?;
    let product = state.services.catalog.update_price(seller_id, body.product_id, body.new_price).await?;
    Ok(product_body("Product price updated successfully.", product))
}

pub async fn upload_image(
    State(state): State<AppState>,
    caller: Caller,
    multipart: std::result::Result<Multipart, MultipartRejection>,
) -> Result<Json<Value>> {
    let seller_id = caller.as_role(Role::Seller)?;
    let mut form = UploadForm::read(multipart).await?;
    let product_id = form.parsed::<i64>("productId")?;
    let image = form.image.take().ok_or_else(|| MarketplaceError::InvalidInput("image is required".to_string()))?;
    let product = state.services.catalog.update_image(seller_id, product_id, image).await?;
    Ok(product_body("Product image updated successfully.", product))
}

pub async fn update_description(
    State(state): State<AppState>,
    caller: Caller,
    ApiJson(body): ApiJson<UpdateDescriptionBody>,
) -> Result<Json<Value>> {
    let seller_id = caller.as_role(Role::Seller)?;
    let product = state.services.catalog.update_description(seller_id, body.product_id, &body.new_description).await?;
    Ok(product_body("Product description updated successfully.", product))
}

pub async fn products_by_seller(State(state): State<AppState>, _caller: Caller, ApiPath(seller_id): ApiPath<i64>) -> Result<Json<Value>> {
    let products = state.services.catalog.list_by_seller(seller_id).await?;
    Ok(Json(json!({ "products": products })))
}

pub async fn delete_product(State(state): State<AppState>, caller: Caller, ApiPath(product_id): ApiPath<i64>) -> Result<Json<Value>> {
    let seller_id = caller.as_role(Role::Seller)?;
    state.services.catalog.delete(seller_id, product_id).await?;
    Ok(Json(json!({ "message": "Product deleted successfully" })))
}
