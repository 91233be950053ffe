//! `/api/customer` handlers. Cart responses always carry the whole cart.

use axum::{extract::State, http::StatusCode, Json};
use serde::Deserialize;
use serde_json::{json, Value};

use super::{ApiJson, AppState, Caller};
use crate::domain::{Cart, CartAction, Role};
use crate::error::Result;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AddToCartBody {
    pub product_id: i64,
    pub quantity: i64,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EditCartBody {
    pub cart_item_id: i64,
    pub action: CartAction,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CartItemBody {
    pub cart_item_id: i64,
}

fn cart_body(message: &str, cart: &Cart) -> Json<Value> {
    Json(json!({ "message": message, "cart": cart.view() }))
}

pub async fn list_products(State(state): State<AppState>, _caller: Caller) -> Result<Json<Value>> {
    let products = state.services.catalog.list_all().await?;
    Ok(Json(json!({ "products": products })))
}

pub async fn add_to_cart(State(state): State<AppState>, caller: Caller, ApiJson(body): ApiJson<AddToCartBody>) -> Result<(StatusCode, Json<Value>)> {
    let customer_id = caller.as_role(Role::Customer)?;
    let (cart, created) = state.services.carts.add(customer_id, body.product_id, body.quantity).await?;
    Ok(if created {
        (StatusCode::CREATED, cart_body("Product added to cart", &cart))
    } else {
        (StatusCode::OK, cart_body("Cart updated", &cart))
    })
}

pub async fn edit_cart(State(state): State<AppState>, caller: Caller, ApiJson(body): ApiJson<EditCartBody>) -> Result<Json<Value>> {
    let customer_id = caller.as_role(Role::Customer)?;
    let cart = state.services.carts.edit(customer_id, body.cart_item_id, body.action).await?;
    Ok(cart_body("Cart quantity updated", &cart))
}

pub async fn remove_from_cart(State(state): State<AppState>, caller: Caller, ApiJson(body): ApiJson<CartItemBody>) -> Result<Json<Value>> {
    let customer_id = caller.as_role(Role::Customer)?;
    let cart = state.services.carts.remove(customer_id, body.cart_item_id).await?;
    Ok(cart_body("Item removed from cart", &cart))
}

pub async fn view_cart(State(state): State<AppState>, caller: Caller) -> Result<Json<Value>> {
    let customer_id = caller.as_role(Role::Customer)?;
    let cart = state.services.carts.view(customer_id).await?;
    Ok(cart_body("Cart retrieved successfully", &cart))
}

pub async fn buy(State(state): State<AppState>, caller: Caller) -> Result<(StatusCode, Json<Value>)> {
    let customer_id = caller.as_role(Role::Customer)?;
    let order = state.services.orders.place_order(customer_id).await?;
    Ok((StatusCode::CREATED, Json(json!({ "message": "Order placed successfully", "order": order }))))
}

pub async fn order_history(State(state): State<AppState>, caller: Caller) -> Result<Json<Value>> {
    let customer_id = caller.as_role(Role::Customer)?;
    let orders = state.services.orders.history(customer_id).await?;
    Ok(Json(json!({ "orders": orders })))
}
