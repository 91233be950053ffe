//! Domain events
use rust_decimal::Decimal;
use serde::Serialize;
use crate::domain::aggregates::{Order, Product};

#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(untagged)]
pub enum DomainEvent {
    Product(ProductEvent),
    Order(OrderEvent),
}

#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ProductEvent {
    Created { product_id: i64, seller_id: i64, price: Decimal },
    PriceChanged { product_id: i64, old_price: Decimal, new_price: Decimal },
    Deleted { product_id: i64, seller_id: i64 },
}

#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum OrderEvent {
    Placed { order_id: i64, customer_id: i64, total: Decimal, item_count: usize },
}

impl DomainEvent {
    pub fn product_created(p: &Product) -> Self {
        Self::Product(ProductEvent::Created { product_id: p.id, seller_id: p.seller_id, price: p.price.amount() })
    }
    pub fn order_placed(o: &Order) -> Self {
        Self::Order(OrderEvent::Placed { order_id: o.id, customer_id: o.customer_id, total: o.total_price, item_count: o.items.len() })
    }

    /// NATS subject the event is published on.
    pub fn subject(&self) -> &'static str {
        match self {
            Self::Product(ProductEvent::Created { .. }) => "marketplace.product.created",
            Self::Product(ProductEvent::PriceChanged { .. }) => "marketplace.product.price_changed",
            Self::Product(ProductEvent::Deleted { .. }) => "marketplace.product.deleted",
            Self::Order(OrderEvent::Placed { .. }) => "marketplace.order.placed",
        }
    }
}
