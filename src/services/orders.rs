//! Order engine: whole-cart checkout and order history.

use std::sync::Arc;
use tracing::{info, instrument};

use crate::domain::{DomainEvent, Order, OrderDraft};
use crate::error::Result;
use crate::publisher::EventPublisher;
use crate::repository::{CartRepository, OrderRepository};

pub struct OrderService {
    carts: Arc<dyn CartRepository>,
    orders: Arc<dyn OrderRepository>,
    events: EventPublisher,
}

impl OrderService {
    pub fn new(carts: Arc<dyn CartRepository>, orders: Arc<dyn OrderRepository>, events: EventPublisher) -> Self {
        Self { carts, orders, events }
    }

    /// Prices every line in the cart, then writes the order and clears the
    /// cart in one store transaction.
    #[instrument(name = "orders::place", skip(self), err(Display))]
    pub async fn place_order(&self, customer_id: i64) -> Result<Order> {
        let entries = self.carts.entries(customer_id).await?;
        let draft = OrderDraft::from_cart(customer_id, &entries)?;
        let order = self.orders.commit(draft).await?;
        info!(order_id = order.id, total = %order.total_price, items = order.items.len(), "order placed");
        self.events.publish(DomainEvent::order_placed(&order)).await;
        Ok(order)
    }

    /// Newest first.
    pub async fn history(&self, customer_id: i64) -> Result<Vec<Order>> {
        self.orders.list_for_customer(customer_id).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{NewProduct, Price, Product};
    use crate::error::MarketplaceError;
    use crate::repository::ProductRepository;
    use crate::services::fixtures::{harness, Harness};
    use rust_decimal::Decimal;

    async fn product(h: &Harness, name: &str, cents: i64) -> Product {
        let price = Price::new(Decimal::new(cents, 2)).unwrap();
        h.store.insert(NewProduct::new(100, name, "", price, None).unwrap()).await.unwrap()
    }

    #[tokio::test]
    async fn test_checkout_scenario() {
        let h = harness();
        let p = product(&h, "Notebook", 999).await;
        let s = &h.services;
        let (cart, _) = s.carts.add(1, p.id, 1).await.unwrap();
        assert_eq!(cart.entries()[0].line.quantity.value(), 1);
        let (cart, _) = s.carts.add(1, p.id, 2).await.unwrap();
        assert_eq!(cart.len(), 1);
        assert_eq!(cart.entries()[0].line.quantity.value(), 3);

        let order = s.orders.place_order(1).await.unwrap();
        assert_eq!(order.total_price, Decimal::new(2997, 2));
        assert_eq!(order.items.len(), 1);
        assert_eq!((order.items[0].product_id, order.items[0].quantity.value()), (p.id, 3));
        assert!(s.carts.view(1).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_empty_cart_checkout_rejected() {
        let h = harness();
        let err = h.services.orders.place_order(1).await.unwrap_err();
        assert!(matches!(err, MarketplaceError::InvalidState(m) if m == "cart is empty"));
        assert_eq!(h.store.order_count().unwrap(), 0);
    }

    #[tokio::test]
    async fn test_order_price_is_snapshot() {
        let h = harness();
        let p = product(&h, "Pen", 250).await;
        let s = &h.services;
        s.carts.add(1, p.id, 2).await.unwrap();
        let order = s.orders.place_order(1).await.unwrap();

        s.catalog.update_price(100, p.id, Decimal::new(10_000, 2)).await.unwrap();
        let history = s.orders.history(1).await.unwrap();
        assert_eq!(history[0].id, order.id);
        assert_eq!(history[0].items[0].price.amount(), Decimal::new(250, 2));
        assert_eq!(history[0].total_price, Decimal::new(500, 2));
    }

    #[tokio::test]
    async fn test_failed_checkout_writes_nothing() {
        let h = harness();
        let a = product(&h, "A", 100).await;
        let b = product(&h, "B", 200).await;
        let s = &h.services;
        s.carts.add(1, a.id, 1).await.unwrap();
        s.carts.add(1, b.id, 2).await.unwrap();
        let before = s.carts.view(1).await.unwrap().view();

        h.store.arm_checkout_fault();
        assert!(matches!(s.orders.place_order(1).await, Err(MarketplaceError::StoreFailure(_))));
        assert_eq!(h.store.order_count().unwrap(), 0);
        assert!(s.orders.history(1).await.unwrap().is_empty());
        assert_eq!(s.carts.view(1).await.unwrap().view(), before);

        let order = s.orders.place_order(1).await.unwrap();
        assert_eq!(order.total_price, Decimal::new(500, 2));
        assert!(s.carts.view(1).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_oversized_total_is_rejected_without_writing() {
        let h = harness();
        let p = product(&h, "Yacht", 999_999_999_999).await;
        let s = &h.services;
        s.carts.add(1, p.id, 2).await.unwrap();

        let err = s.orders.place_order(1).await.unwrap_err();
        assert!(matches!(err, MarketplaceError::InvalidState(m) if m.contains("order total")));
        assert_eq!(h.store.order_count().unwrap(), 0);
        assert_eq!(s.carts.view(1).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_history_is_per_customer_and_newest_first() {
        let h = harness();
        let p = product(&h, "Cup", 100).await;
        let s = &h.services;
        s.carts.add(1, p.id, 1).await.unwrap();
        let first = s.orders.place_order(1).await.unwrap();
        s.carts.add(1, p.id, 2).await.unwrap();
        let second = s.orders.place_order(1).await.unwrap();

        let ids: Vec<i64> = s.orders.history(1).await.unwrap().iter().map(|o| o.id).collect();
        assert_eq!(ids, vec![second.id, first.id]);
        assert!(s.orders.history(2).await.unwrap().is_empty());
    }
}
