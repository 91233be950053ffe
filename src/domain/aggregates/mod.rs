//! Aggregates module
pub mod product;
pub mod order;
pub mod cart;
pub mod user;

pub use product::{NewProduct, Product, ProductError};
pub use order::{DraftLine, Order, OrderDraft, OrderError, OrderItem};
pub use cart::{Cart, CartAction, CartEntry, CartError, CartLine, CartProduct, CartView};
pub use user::{NewUser, User, UserSummary};
