//! OpenSASE Marketplace
//!
//! Two-sided marketplace backend: sellers list products, customers keep a
//! cart and check it out into immutable orders.
//!
//! ## Features
//! - Account registration and signed session tokens
//! - Seller catalog management with product images
//! - Customer carts with atomic quantity updates
//! - Transactional whole-cart checkout and order history
//! - Optional domain events over NATS

pub mod auth;
pub mod config;
pub mod domain;
pub mod error;
pub mod http;
pub mod media;
pub mod publisher;
pub mod repository;
pub mod services;

pub use config::AppConfig;
pub use error::{MarketplaceError, Result};
