//! Cart Aggregate

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use crate::domain::value_objects::{Price, Quantity, QuantityError};

/// One (product, quantity) entry in a customer's pending purchase set.
#[derive(Clone, Debug, PartialEq)]
pub struct CartLine {
    pub id: i64,
    pub customer_id: i64,
    pub product_id: i64,
    pub quantity: Quantity,
}

/// Product fields joined onto a cart line for display and pricing.
#[derive(Clone, Debug, PartialEq)]
pub struct CartProduct {
    pub name: String,
    pub description: String,
    pub price: Price,
    pub image_path: Option<String>,
}

#[derive(Clone, Debug, PartialEq)]
pub struct CartEntry {
    pub line: CartLine,
    pub product: CartProduct,
}

impl CartEntry {
    /// `None` on overflow.
    pub fn line_total(&self) -> Option<Decimal> { self.product.price.times(self.line.quantity) }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CartAction { Increase, Decrease }

impl CartAction {
    pub fn delta(&self) -> i32 {
        match self { Self::Increase => 1, Self::Decrease => -1 }
    }
}

impl CartLine {
    /// Ownership mismatch and absence are reported identically.
    pub fn ensure_owned_by(&self, customer_id: i64) -> Result<(), CartError> {
        if self.customer_id == customer_id { Ok(()) } else { Err(CartError::NotFoundOrUnauthorized) }
    }

    pub fn next_quantity(&self, action: CartAction) -> Result<Quantity, CartError> {
        let next = match action {
            CartAction::Increase => self.quantity.increment(),
            CartAction::Decrease => self.quantity.decrement(),
        };
        next.map_err(CartError::from)
    }
}

/// The caller's full cart, as returned by every cart operation.
#[derive(Clone, Debug, Default)]
pub struct Cart {
    entries: Vec<CartEntry>,
}

impl Cart {
    pub fn new(mut entries: Vec<CartEntry>) -> Self {
        entries.sort_by_key(|e| e.line.id);
        Self { entries }
    }
    pub fn entries(&self) -> &[CartEntry] { &self.entries }
    pub fn is_empty(&self) -> bool { self.entries.is_empty() }
    pub fn len(&self) -> usize { self.entries.len() }
    pub fn subtotal(&self) -> Option<Decimal> {
        self.entries.iter().try_fold(Decimal::ZERO, |acc, e| acc.checked_add(e.line_total()?))
    }
    pub fn line_for(&self, product_id: i64) -> Option<&CartEntry> { self.entries.iter().find(|e| e.line.product_id == product_id) }
    pub fn view(&self) -> Vec<CartView> { self.entries.iter().map(CartView::from).collect() }
}

/// Wire shape of a cart line.
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CartView {
    pub cart_item_id: i64,
    pub product_id: i64,
    pub name: String,
    pub description: String,
    pub price: Price,
    pub quantity: Quantity,
    pub image: Option<String>,
}

impl From<&CartEntry> for CartView {
    fn from(e: &CartEntry) -> Self {
        Self {
            cart_item_id: e.line.id, product_id: e.line.product_id, name: e.product.name.clone(),
            description: e.product.description.clone(), price: e.product.price, quantity: e.line.quantity,
            image: e.product.image_path.clone(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)] pub enum CartError { NotFoundOrUnauthorized, InvalidQuantity(QuantityError) }
impl std::error::Error for CartError {}
impl std::fmt::Display for CartError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::NotFoundOrUnauthorized => write!(f, "Cart item not found or unauthorized"),
            Self::InvalidQuantity(e) => write!(f, "{}", e),
        }
    }
}
impl From<QuantityError> for CartError {
    fn from(e: QuantityError) -> Self { Self::InvalidQuantity(e) }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;

    pub(crate) fn entry(id: i64, customer_id: i64, product_id: i64, qty: i64, price_cents: i64) -> CartEntry {
        CartEntry {
            line: CartLine { id, customer_id, product_id, quantity: Quantity::new(qty).unwrap() },
            product: CartProduct {
                name: format!("Product {}", product_id), description: String::new(),
                price: Price::new(Decimal::new(price_cents, 2)).unwrap(), image_path: None,
            },
        }
    }

    #[test]
    fn test_decrease_at_one_rejected() {
        let e = entry(1, 10, 7, 1, 999);
        assert_eq!(e.line.next_quantity(CartAction::Decrease), Err(CartError::InvalidQuantity(QuantityError::BelowMinimum)));
        assert_eq!(e.line.next_quantity(CartAction::Increase).unwrap().value(), 2);
    }
    #[test]
    fn test_foreign_line_is_ambiguous() {
        let e = entry(1, 10, 7, 1, 999);
        assert_eq!(e.line.ensure_owned_by(11), Err(CartError::NotFoundOrUnauthorized));
        assert!(e.line.ensure_owned_by(10).is_ok());
    }
    #[test]
    fn test_cart_subtotal_and_order() {
        let cart = Cart::new(vec![entry(5, 1, 2, 2, 250), entry(3, 1, 7, 3, 999)]);
        assert_eq!(cart.entries()[0].line.id, 3);
        assert_eq!(cart.subtotal(), Some(Decimal::new(3497, 2)));
        assert_eq!(cart.line_for(2).unwrap().line.quantity.value(), 2);
    }
    #[test]
    fn test_view_shape() {
        let json = serde_json::to_value(Cart::new(vec![entry(1, 1, 7, 3, 999)]).view()).unwrap();
        assert_eq!(json[0]["cartItemId"], 1);
        assert_eq!(json[0]["productId"], 7);
        assert_eq!(json[0]["quantity"], 3);
        assert!(json[0]["image"].is_null());
    }
}
