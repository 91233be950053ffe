//! Storage seams, one narrow trait per entity.
//!
//! Every mutating method that touches caller-owned rows takes the owner id
//! and scopes its write by it, so a store never mutates another caller's
//! rows even if a service check were skipped.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::sync::Arc;
use uuid::Uuid;

use crate::domain::{CartEntry, CartLine, NewProduct, NewUser, Order, OrderDraft, Price, Product, Quantity, User};
use crate::error::Result;

pub mod memory;
pub mod postgres;

pub use memory::MemoryStore;
pub use postgres::PgStore;

#[async_trait]
pub trait UserRepository: Send + Sync {
    /// Fails with `InvalidInput` when the username is taken.
    async fn create(&self, user: NewUser) -> Result<User>;
    async fn find_by_username(&self, username: &str) -> Result<Option<User>>;
    async fn store_refresh_token(&self, token_id: Uuid, user_id: i64, expires_at: DateTime<Utc>) -> Result<()>;
    /// True when the token exists, is unrevoked and unexpired.
    async fn refresh_token_active(&self, token_id: Uuid) -> Result<bool>;
    /// Returns false if the token was unknown or already revoked.
    async fn revoke_refresh_token(&self, token_id: Uuid) -> Result<bool>;
}

#[async_trait]
pub trait ProductRepository: Send + Sync {
    async fn insert(&self, product: NewProduct) -> Result<Product>;
    async fn find(&self, id: i64) -> Result<Option<Product>>;
    async fn list_all(&self) -> Result<Vec<Product>>;
    async fn list_by_seller(&self, seller_id: i64) -> Result<Vec<Product>>;
    async fn update_price(&self, id: i64, seller_id: i64, price: Price) -> Result<Option<Product>>;
    async fn update_description(&self, id: i64, seller_id: i64, description: &str) -> Result<Option<Product>>;
    async fn update_image(&self, id: i64, seller_id: i64, image_path: Option<&str>) -> Result<Option<Product>>;
    async fn delete(&self, id: i64, seller_id: i64) -> Result<bool>;
}

#[async_trait]
pub trait CartRepository: Send + Sync {
    /// Atomically creates the line or adds `quantity` to the existing one.
    /// Returns true when a new line was created.
    async fn add(&self, customer_id: i64, product_id: i64, quantity: Quantity) -> Result<bool>;
    async fn find_line(&self, line_id: i64) -> Result<Option<CartLine>>;
    /// Applies `delta` only if the result stays at or above 1; `None` otherwise
    /// or when the line is not the customer's.
    async fn adjust_quantity(&self, line_id: i64, customer_id: i64, delta: i32) -> Result<Option<Quantity>>;
    async fn remove(&self, line_id: i64, customer_id: i64) -> Result<bool>;
    async fn entries(&self, customer_id: i64) -> Result<Vec<CartEntry>>;
}

#[async_trait]
pub trait OrderRepository: Send + Sync {
    /// In one transaction: verifies the cart still matches `draft`, writes the
    /// order and its items, and clears the customer's cart.
    async fn commit(&self, draft: OrderDraft) -> Result<Order>;
    async fn list_for_customer(&self, customer_id: i64) -> Result<Vec<Order>>;
}

#[derive(Clone)]
pub struct Repositories {
    pub users: Arc<dyn UserRepository>,
    pub products: Arc<dyn ProductRepository>,
    pub carts: Arc<dyn CartRepository>,
    pub orders: Arc<dyn OrderRepository>,
}

impl Repositories {
    pub fn postgres(store: PgStore) -> Self {
        let store = Arc::new(store);
        Self { users: store.clone(), products: store.clone(), carts: store.clone(), orders: store }
    }

    pub fn in_memory(store: Arc<MemoryStore>) -> Self {
        Self { users: store.clone(), products: store.clone(), carts: store.clone(), orders: store }
    }
}
