//! Application services: the operations behind every HTTP route.
//!
//! Services receive an already-verified caller id and never see tokens or
//! requests. All storage goes through the repository traits.

pub mod accounts;
pub mod cart;
pub mod catalog;
pub mod orders;

pub use accounts::{AccountService, AuthSession, LoginRequest, RegisterRequest};
pub use cart::CartService;
pub use catalog::{CatalogService, ImageUpload, ProductDraft};
pub use orders::OrderService;

use std::sync::Arc;

use crate::auth::TokenIssuer;
use crate::media::MediaStore;
use crate::publisher::EventPublisher;
use crate::repository::Repositories;

#[derive(Clone)]
pub struct Services {
    pub accounts: Arc<AccountService>,
    pub carts: Arc<CartService>,
    pub orders: Arc<OrderService>,
    pub catalog: Arc<CatalogService>,
}

impl Services {
    pub fn new(repos: Repositories, tokens: Arc<TokenIssuer>, media: Arc<MediaStore>, events: EventPublisher) -> Self {
        Self {
            accounts: Arc::new(AccountService::new(repos.users.clone(), tokens)),
            carts: Arc::new(CartService::new(repos.carts.clone(), repos.products.clone())),
            orders: Arc::new(OrderService::new(repos.carts.clone(), repos.orders.clone(), events.clone())),
            catalog: Arc::new(CatalogService::new(repos.products, media, events)),
        }
    }
}
