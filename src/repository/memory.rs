//! In-process store implementing every repository trait.
//!
//! One mutex guards all tables, so each repository call is atomic with
//! respect to every other. Checkout stages its writes on a copy of the
//! tables and swaps it in only when every step succeeded.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::{BTreeMap, HashMap};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Mutex, MutexGuard};
use uuid::Uuid;

use super::{CartRepository, OrderRepository, ProductRepository, UserRepository};
use crate::domain::{
    CartEntry, CartLine, CartProduct, NewProduct, NewUser, Order, OrderDraft, OrderError, Price, Product, Quantity, User,
};
use crate::error::{MarketplaceError, Result};

#[derive(Clone, Debug)]
struct RefreshRecord { user_id: i64, expires_at: DateTime<Utc>, revoked: bool }

#[derive(Clone, Debug, Default)]
struct Tables {
    seq: i64,
    users: BTreeMap<i64, User>,
    refresh_tokens: HashMap<Uuid, RefreshRecord>,
    products: BTreeMap<i64, Product>,
    cart: BTreeMap<i64, CartLine>,
    orders: BTreeMap<i64, Order>,
}

impl Tables {
    fn next_id(&mut self) -> i64 { self.seq += 1; self.seq }

    fn entries(&self, customer_id: i64) -> Vec<CartEntry> {
        self.cart.values()
            .filter(|l| l.customer_id == customer_id)
            .filter_map(|l| {
                let p = self.products.get(&l.product_id)?;
                Some(CartEntry {
                    line: l.clone(),
                    product: CartProduct { name: p.name.clone(), description: p.description.clone(), price: p.price, image_path: p.image_path.clone() },
                })
            })
            .collect()
    }

    fn owned_product(&mut self, id: i64, seller_id: i64) -> Option<&mut Product> {
        self.products.get_mut(&id).filter(|p| p.seller_id == seller_id)
    }
}

#[derive(Debug, Default)]
pub struct MemoryStore {
    tables: Mutex<Tables>,
    fail_next_checkout: AtomicBool,
}

impl MemoryStore {
    pub fn new() -> Self { Self::default() }

    /// Makes the next checkout fail after the order is staged but before the
    /// cart is cleared.
    pub fn arm_checkout_fault(&self) { self.fail_next_checkout.store(true, Ordering::SeqCst); }

    pub fn order_count(&self) -> Result<usize> { Ok(self.lock()?.orders.len()) }

    fn lock(&self) -> Result<MutexGuard<'_, Tables>> {
        self.tables.lock().map_err(|_| MarketplaceError::StoreFailure("memory store lock poisoned".into()))
    }

    fn update_product(&self, id: i64, seller_id: i64, apply: impl FnOnce(&mut Product)) -> Result<Option<Product>> {
        let mut t = self.lock()?;
        Ok(t.owned_product(id, seller_id).map(|p| {
            apply(p);
            p.updated_at = Utc::now();
            p.clone()
        }))
    }
}

#[async_trait]
impl UserRepository for MemoryStore {
    async fn create(&self, user: NewUser) -> Result<User> {
        let mut t = self.lock()?;
        if t.users.values().any(|u| u.username == user.username) {
            return Err(MarketplaceError::InvalidInput("username already exists".into()));
        }
        let id = t.next_id();
        let user = User { id, username: user.username, password_hash: user.password_hash, role: user.role, created_at: Utc::now() };
        t.users.insert(id, user.clone());
        Ok(user)
    }

    async fn find_by_username(&self, username: &str) -> Result<Option<User>> {
        Ok(self.lock()?.users.values().find(|u| u.username == username).cloned())
    }

    async fn store_refresh_token(&self, token_id: Uuid, user_id: i64, expires_at: DateTime<Utc>) -> Result<()> {
        self.lock()?.refresh_tokens.insert(token_id, RefreshRecord { user_id, expires_at, revoked: false });
        Ok(())
    }

    async fn refresh_token_active(&self, token_id: Uuid) -> Result<bool> {
        let t = self.lock()?;
        Ok(t.refresh_tokens.get(&token_id).is_some_and(|r| !r.revoked && r.expires_at > Utc::now() && t.users.contains_key(&r.user_id)))
    }

    async fn revoke_refresh_token(&self, token_id: Uuid) -> Result<bool> {
        let mut t = self.lock()?;
        match t.refresh_tokens.get_mut(&token_id) {
            Some(r) if !r.revoked => {
                r.revoked = true;
                Ok(true)
            }
            _ => Ok(false),
        }
    }
}

#[async_trait]
impl ProductRepository for MemoryStore {
    async fn insert(&self, p: NewProduct) -> Result<Product> {
        let mut t = self.lock()?;
        let id = t.next_id();
        let now = Utc::now();
        let product = Product {
            id, name: p.name, description: p.description, price: p.price, image_path: p.image_path, seller_id: p.seller_id,
            created_at: now, updated_at: now,
        };
        t.products.insert(id, product.clone());
        Ok(product)
    }

    async fn find(&self, id: i64) -> Result<Option<Product>> { Ok(self.lock()?.products.get(&id).cloned()) }

    async fn list_all(&self) -> Result<Vec<Product>> { Ok(self.lock()?.products.values().cloned().collect()) }

    async fn list_by_seller(&self, seller_id: i64) -> Result<Vec<Product>> {
        Ok(self.lock()?.products.values().filter(|p| p.seller_id == seller_id).cloned().collect())
    }

    async fn update_price(&self, id: i64, seller_id: i64, price: Price) -> Result<Option<Product>> {
        self.update_product(id, seller_id, |p| p.price = price)
    }

    async fn update_description(&self, id: i64, seller_id: i64, description: &str) -> Result<Option<Product>> {
        self.update_product(id, seller_id, |p| p.description = description.to_string())
    }

    async fn update_image(&self, id: i64, seller_id: i64, image_path: Option<&str>) -> Result<Option<Product>> {
        self.update_product(id, seller_id, |p| p.image_path = image_path.map(str::to_string))
    }

    async fn delete(&self, id: i64, seller_id: i64) -> Result<bool> {
        let mut t = self.lock()?;
        if t.owned_product(id, seller_id).is_none() {
            return Ok(false);
        }
        t.products.remove(&id);
        t.cart.retain(|_, l| l.product_id != id);
        Ok(true)
    }
}

#[async_trait]
impl CartRepository for MemoryStore {
    async fn add(&self, customer_id: i64, product_id: i64, quantity: Quantity) -> Result<bool> {
        let mut t = self.lock()?;
        if !t.products.contains_key(&product_id) {
            return Err(MarketplaceError::NotFound("Product not found".into()));
        }
        if let Some(line) = t.cart.values_mut().find(|l| l.customer_id == customer_id && l.product_id == product_id) {
            line.quantity = line.quantity.add(quantity)?;
            return Ok(false);
        }
        let id = t.next_id();
        t.cart.insert(id, CartLine { id, customer_id, product_id, quantity });
        Ok(true)
    }

    async fn find_line(&self, line_id: i64) -> Result<Option<CartLine>> { Ok(self.lock()?.cart.get(&line_id).cloned()) }

    async fn adjust_quantity(&self, line_id: i64, customer_id: i64, delta: i32) -> Result<Option<Quantity>> {
        let mut t = self.lock()?;
        let Some(line) = t.cart.get_mut(&line_id).filter(|l| l.customer_id == customer_id) else { return Ok(None) };
        match Quantity::new(i64::from(line.quantity.value()) + i64::from(delta)) {
            Ok(q) => {
                line.quantity = q;
                Ok(Some(q))
            }
            Err(_) => Ok(None),
        }
    }

    async fn remove(&self, line_id: i64, customer_id: i64) -> Result<bool> {
        let mut t = self.lock()?;
        if t.cart.get(&line_id).is_some_and(|l| l.customer_id == customer_id) {
            t.cart.remove(&line_id);
            return Ok(true);
        }
        Ok(false)
    }

    async fn entries(&self, customer_id: i64) -> Result<Vec<CartEntry>> { Ok(self.lock()?.entries(customer_id)) }
}

#[async_trait]
impl OrderRepository for MemoryStore {
    async fn commit(&self, draft: OrderDraft) -> Result<Order> {
        let mut t = self.lock()?;
        if !draft.matches(&t.entries(draft.customer_id)) {
            return Err(OrderError::StaleCart.into());
        }

        let mut staged = t.clone();
        let consumed = draft.cart_line_ids();
        let order_id = staged.next_id();
        let order = draft.into_order(order_id, Utc::now(), || staged.next_id());
        staged.orders.insert(order_id, order.clone());

        if self.fail_next_checkout.swap(false, Ordering::SeqCst) {
            return Err(MarketplaceError::StoreFailure("injected checkout fault".into()));
        }

        for line_id in consumed {
            staged.cart.remove(&line_id);
        }
        *t = staged;
        Ok(order)
    }

    async fn list_for_customer(&self, customer_id: i64) -> Result<Vec<Order>> {
        Ok(self.lock()?.orders.values().rev().filter(|o| o.customer_id == customer_id).cloned().collect())
    }
}
