//! Marketplace domain: value objects, aggregates and events.
pub mod aggregates;
pub mod events;
pub mod value_objects;

pub use aggregates::*;
pub use events::{DomainEvent, OrderEvent, ProductEvent};
pub use value_objects::{Price, PriceError, Quantity, QuantityError, Role, RoleError};
