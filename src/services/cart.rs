//! Cart engine: every mutation answers with the caller's whole cart.

use std::sync::Arc;
use tracing::{debug, instrument};

use crate::domain::{Cart, CartAction, CartError, Quantity, QuantityError};
use crate::error::{MarketplaceError, Result};
use crate::repository::{CartRepository, ProductRepository};

pub struct CartService {
    carts: Arc<dyn CartRepository>,
    products: Arc<dyn ProductRepository>,
}

impl CartService {
    pub fn new(carts: Arc<dyn CartRepository>, products: Arc<dyn ProductRepository>) -> Self { Self { carts, products } }

    /// Returns the refreshed cart and whether a new line was created.
    #[instrument(name = "cart::add", skip(self), err(Display))]
    pub async fn add(&self, customer_id: i64, product_id: i64, quantity: i64) -> Result<(Cart, bool)> {
        let quantity = Quantity::new(quantity)?;
        if self.products.find(product_id).await?.is_none() {
            return Err(MarketplaceError::NotFound("Product not found".to_string()));
        }
        let created = self.carts.add(customer_id, product_id, quantity).await?;
        debug!(created, "cart line upserted");
        Ok((self.view(customer_id).await?, created))
    }

    #[instrument(name = "cart::edit", skip(self), err(Display))]
    pub async fn edit(&self, customer_id: i64, line_id: i64, action: CartAction) -> Result<Cart> {
        let line = self.carts.find_line(line_id).await?.ok_or(CartError::NotFoundOrUnauthorized)?;
        line.ensure_owned_by(customer_id)?;
        line.next_quantity(action)?;
        if self.carts.adjust_quantity(line_id, customer_id, action.delta()).await?.is_none() {
            // Lost a race with another edit or removal of the same line.
            return Err(match self.carts.find_line(line_id).await? {
                Some(l) if l.customer_id == customer_id => QuantityError::BelowMinimum.into(),
                _ => CartError::NotFoundOrUnauthorized.into(),
            });
        }
        self.view(customer_id).await
    }

    #[instrument(name = "cart::remove", skip(self), err(Display))]
    pub async fn remove(&self, customer_id: i64, line_id: i64) -> Result<Cart> {
        if !self.carts.remove(line_id, customer_id).await? {
            return Err(CartError::NotFoundOrUnauthorized.into());
        }
        self.view(customer_id).await
    }

    /// An empty cart is a normal result.
    pub async fn view(&self, customer_id: i64) -> Result<Cart> {
        Ok(Cart::new(self.carts.entries(customer_id).await?))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{NewProduct, Price, Product};
    use crate::repository::ProductRepository;
    use crate::services::fixtures::{harness, Harness};
    use rust_decimal::Decimal;

    async fn product(h: &Harness, cents: i64) -> Product {
        let price = Price::new(Decimal::new(cents, 2)).unwrap();
        h.store.insert(NewProduct::new(100, "Lamp", "Desk lamp", price, None).unwrap()).await.unwrap()
    }

    #[tokio::test]
    async fn test_repeat_add_increments_single_line() {
        let h = harness();
        let p = product(&h, 999).await;
        let carts = &h.services.carts;
        let (cart, created) = carts.add(1, p.id, 2).await.unwrap();
        assert!(created);
        assert_eq!(cart.len(), 1);
        let (cart, created) = carts.add(1, p.id, 2).await.unwrap();
        assert!(!created);
        assert_eq!(cart.len(), 1);
        assert_eq!(cart.entries()[0].line.quantity.value(), 4);
    }

    #[tokio::test]
    async fn test_add_rejects_bad_input() {
        let h = harness();
        let p = product(&h, 100).await;
        let carts = &h.services.carts;
        assert!(matches!(carts.add(1, p.id, 0).await, Err(MarketplaceError::InvalidInput(_))));
        assert!(matches!(carts.add(1, p.id, -3).await, Err(MarketplaceError::InvalidInput(_))));
        assert!(matches!(carts.add(1, p.id + 1000, 1).await, Err(MarketplaceError::NotFound(_))));
    }

    #[tokio::test]
    async fn test_decrease_floor_leaves_quantity() {
        let h = harness();
        let p = product(&h, 100).await;
        let carts = &h.services.carts;
        let (cart, _) = carts.add(1, p.id, 1).await.unwrap();
        let line_id = cart.entries()[0].line.id;
        let err = carts.edit(1, line_id, CartAction::Decrease).await.unwrap_err();
        assert!(matches!(err, MarketplaceError::InvalidState(m) if m == "quantity can't be less than 1"));
        assert_eq!(carts.view(1).await.unwrap().entries()[0].line.quantity.value(), 1);

        let cart = carts.edit(1, line_id, CartAction::Increase).await.unwrap();
        assert_eq!(cart.entries()[0].line.quantity.value(), 2);
        let cart = carts.edit(1, line_id, CartAction::Decrease).await.unwrap();
        assert_eq!(cart.entries()[0].line.quantity.value(), 1);
    }

    #[tokio::test]
    async fn test_foreign_lines_are_invisible() {
        let h = harness();
        let p = product(&h, 100).await;
        let carts = &h.services.carts;
        let (cart, _) = carts.add(1, p.id, 3).await.unwrap();
        let line_id = cart.entries()[0].line.id;

        for err in [
            carts.edit(2, line_id, CartAction::Increase).await.unwrap_err(),
            carts.remove(2, line_id).await.unwrap_err(),
            carts.edit(2, 9_999, CartAction::Increase).await.unwrap_err(),
        ] {
            assert!(matches!(err, MarketplaceError::NotFoundOrUnauthorized(_)));
        }
        assert!(carts.view(2).await.unwrap().is_empty());
        assert_eq!(carts.view(1).await.unwrap().entries()[0].line.quantity.value(), 3);
    }

    #[tokio::test]
    async fn test_remove_and_empty_view() {
        let h = harness();
        let p = product(&h, 100).await;
        let carts = &h.services.carts;
        let (cart, _) = carts.add(1, p.id, 5).await.unwrap();
        let cart = carts.remove(1, cart.entries()[0].line.id).await.unwrap();
        assert!(cart.is_empty());
        assert!(carts.view(1).await.unwrap().view().is_empty());
    }

    #[tokio::test]
    async fn test_concurrent_adds_sum() {
        let h = harness();
        let p = product(&h, 100).await;
        let carts = h.services.carts.clone();
        let tasks: Vec<_> = (0..16)
            .map(|_| {
                let carts = carts.clone();
                tokio::spawn(async move { carts.add(1, p.id, 1).await.map(|_| ()) })
            })
            .collect();
        for t in tasks {
            t.await.unwrap().unwrap();
        }
        let cart = carts.view(1).await.unwrap();
        assert_eq!(cart.len(), 1);
        assert_eq!(cart.entries()[0].line.quantity.value(), 16);
    }
}
