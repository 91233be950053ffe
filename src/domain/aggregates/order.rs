//! Order Aggregate

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::Serialize;
use crate::domain::aggregates::cart::CartEntry;
use crate::domain::value_objects::{Price, Quantity};

/// An immutable record of a completed purchase.
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Order {
    pub id: i64,
    pub customer_id: i64,
    pub total_price: Decimal,
    pub created_at: DateTime<Utc>,
    pub items: Vec<OrderItem>,
}

/// Frozen copy of a cart line. `price` is the product price at purchase time.
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderItem {
    pub id: i64,
    pub order_id: i64,
    pub product_id: i64,
    pub product_name: String,
    pub quantity: Quantity,
    pub price: Price,
}

/// An order priced from the cart, not yet persisted.
#[derive(Clone, Debug, PartialEq)]
pub struct OrderDraft {
    pub customer_id: i64,
    pub total_price: Decimal,
    pub lines: Vec<DraftLine>,
}

#[derive(Clone, Debug, PartialEq)]
pub struct DraftLine {
    pub cart_line_id: i64,
    pub product_id: i64,
    pub product_name: String,
    pub quantity: Quantity,
    pub price: Price,
}

impl OrderDraft {
    /// Prices every line of the cart at the products' current price.
    pub fn from_cart(customer_id: i64, entries: &[CartEntry]) -> Result<Self, OrderError> {
        if entries.is_empty() { return Err(OrderError::EmptyCart); }
        let mut lines: Vec<DraftLine> = entries.iter().map(|e| DraftLine {
            cart_line_id: e.line.id, product_id: e.line.product_id, product_name: e.product.name.clone(),
            quantity: e.line.quantity, price: e.product.price,
        }).collect();
        lines.sort_by_key(|l| l.cart_line_id);
        let total_price = lines
            .iter()
            .try_fold(Decimal::ZERO, |acc, l| acc.checked_add(l.price.times(l.quantity)?))
            .filter(|total| *total <= Price::MAX)
            .ok_or(OrderError::TotalTooLarge)?;
        Ok(Self { customer_id, total_price, lines })
    }

    /// Ids of the cart lines this draft consumes.
    pub fn cart_line_ids(&self) -> Vec<i64> { self.lines.iter().map(|l| l.cart_line_id).collect() }

    /// True when `entries` is exactly the cart this draft was priced from.
    pub fn matches(&self, entries: &[CartEntry]) -> bool {
        match Self::from_cart(self.customer_id, entries) {
            Ok(current) => current == *self,
            Err(_) => false,
        }
    }

    /// Materialises the order once the store has assigned ids.
    pub fn into_order(self, order_id: i64, created_at: DateTime<Utc>, mut next_item_id: impl FnMut() -> i64) -> Order {
        let items = self.lines.into_iter().map(|l| OrderItem {
            id: next_item_id(), order_id, product_id: l.product_id, product_name: l.product_name, quantity: l.quantity, price: l.price,
        }).collect();
        Order { id: order_id, customer_id: self.customer_id, total_price: self.total_price, created_at, items }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)] pub enum OrderError { EmptyCart, StaleCart, TotalTooLarge }
impl std::error::Error for OrderError {}
impl std::fmt::Display for OrderError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::EmptyCart => write!(f, "cart is empty"),
            Self::StaleCart => write!(f, "cart changed during checkout"),
            Self::TotalTooLarge => write!(f, "order total can't exceed 9999999999.99"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::aggregates::cart::tests::entry;

    #[test]
    fn test_empty_cart_rejected() {
        assert_eq!(OrderDraft::from_cart(1, &[]), Err(OrderError::EmptyCart));
    }
    #[test]
    fn test_total_uses_current_price() {
        let draft = OrderDraft::from_cart(1, &[entry(1, 1, 7, 3, 999), entry(2, 1, 8, 1, 100)]).unwrap();
        assert_eq!(draft.total_price, Decimal::new(3097, 2));
        assert_eq!(draft.lines[0].price.amount(), Decimal::new(999, 2));
    }
    #[test]
    fn test_total_beyond_column_range_rejected() {
        assert_eq!(OrderDraft::from_cart(1, &[entry(1, 1, 7, 2_000_000_001, 500)]), Err(OrderError::TotalTooLarge));
        assert_eq!(OrderDraft::from_cart(1, &[entry(1, 1, 7, 2, 999_999_999_999)]), Err(OrderError::TotalTooLarge));
        let at_limit = OrderDraft::from_cart(1, &[entry(1, 1, 7, 1, 999_999_999_999)]).unwrap();
        assert_eq!(at_limit.total_price, Price::MAX);
    }
    #[test]
    fn test_cart_line_ids_follow_lines() {
        let draft = OrderDraft::from_cart(1, &[entry(9, 1, 7, 1, 100), entry(4, 1, 8, 1, 100)]).unwrap();
        assert_eq!(draft.cart_line_ids(), vec![4, 9]);
    }
    #[test]
    fn test_matches_detects_changes() {
        let entries = vec![entry(1, 1, 7, 3, 999)];
        let draft = OrderDraft::from_cart(1, &entries).unwrap();
        assert!(draft.matches(&entries));
        assert!(!draft.matches(&[entry(1, 1, 7, 4, 999)]));
        assert!(!draft.matches(&[entry(1, 1, 7, 3, 1099)]));
        assert!(!draft.matches(&[]));
    }
    #[test]
    fn test_into_order_snapshots_lines() {
        let draft = OrderDraft::from_cart(4, &[entry(1, 4, 7, 2, 500), entry(2, 4, 9, 1, 150)]).unwrap();
        let mut next = 100;
        let order = draft.into_order(12, Utc::now(), || { next += 1; next });
        assert_eq!(order.id, 12);
        assert_eq!(order.items.len(), 2);
        assert_eq!(order.items[0].id, 101);
        assert!(order.items.iter().all(|i| i.order_id == 12));
        assert_eq!(order.total_price, Decimal::new(1150, 2));
    }
}
