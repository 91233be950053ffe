//! HTTP surface: router, shared state and the per-group interceptor chain.

mod customer;
mod extract;
mod seller;
mod users;

#[cfg(test)]
mod tests;

use axum::{
    extract::DefaultBodyLimit,
    http::HeaderValue,
    middleware,
    routing::{delete, get, post, put},
    Json, Router,
};
use std::sync::Arc;
use tower_http::{cors::CorsLayer, services::ServeDir, trace::TraceLayer};

use crate::auth::{require_auth, TokenIssuer};
use crate::media::{MediaStore, PUBLIC_PREFIX};
use crate::services::Services;

pub use extract::{ApiJson, ApiPath, Caller};

/// Headroom for multipart framing and text fields on top of the image cap.
const FORM_OVERHEAD_BYTES: usize = 64 * 1024;

#[derive(Clone)]
pub struct AppState {
    pub services: Services,
    pub tokens: Arc<TokenIssuer>,
    pub media: Arc<MediaStore>,
}

/// Allows the configured origin, or any origin when none is set.
pub fn cors_layer(origin: Option<&str>) -> CorsLayer {
    match origin.and_then(|o| HeaderValue::from_str(o).ok()) {
        Some(origin) => CorsLayer::new().allow_origin(origin).allow_methods(tower_http::cors::Any).allow_headers(tower_http::cors::Any),
        None => CorsLayer::permissive(),
    }
}

pub fn router(state: AppState, cors: CorsLayer) -> Router {
    let authenticated = || middleware::from_fn_with_state(state.tokens.clone(), require_auth);

    let users = Router::new()
        .route("/register", post(users::register))
        .route("/login", post(users::login))
        .route("/logout", post(users::logout))
        .route("/refresh", post(users::refresh));

    let customer = Router::new()
        .route("/products", get(customer::list_products))
        .route("/cart", get(customer::view_cart).post(customer::add_to_cart).delete(customer::remove_from_cart))
        .route("/cart/edit", post(customer::edit_cart))
        .route("/buy", post(customer::buy))
        .route("/orders", get(customer::order_history))
        .route_layer(authenticated());

    let seller = Router::new()
        .route("/add-product", post(seller::add_product))
        .route("/set-price", put(seller::set_price))
        .route("/upload-image", put(seller::upload_image))
        .route("/update-description", put(seller::update_description))
        .route("/products/:seller_id", get(seller::products_by_seller))
        .route("/delete-product/:product_id", delete(seller::delete_product))
        .route_layer(authenticated());

    let body_limit = state.media.max_bytes() + FORM_OVERHEAD_BYTES;
    let media = ServeDir::new(state.media.root());

    Router::new()
        .route("/health", get(|| async { Json(serde_json::json!({"status": "healthy", "service": "opensase-marketplace"})) }))
        .nest("/api/users", users)
        .route("/api/dashboard", get(users::dashboard).route_layer(authenticated()))
        .nest("/api/customer", customer)
        .nest("/api/seller", seller)
        .nest_service(PUBLIC_PREFIX.trim_end_matches('/'), media)
        .layer(DefaultBodyLimit::max(body_limit))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
