//! PostgreSQL repositories (sqlx).

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sqlx::{postgres::PgPoolOptions, PgPool};
use std::collections::HashMap;
use uuid::Uuid;

use super::{CartRepository, OrderRepository, ProductRepository, UserRepository};
use crate::domain::{
    CartEntry, CartLine, CartProduct, NewProduct, NewUser, Order, OrderDraft, OrderError, OrderItem, Price, Product, Quantity, Role, User,
};
use crate::error::{MarketplaceError, Result};

const PRODUCT_COLUMNS: &str = "id, name, description, price, image_path, seller_id, created_at, updated_at";
const CART_SELECT: &str = "SELECT c.id, c.customer_id, c.product_id, c.quantity, p.name, p.description, p.price, p.image_path \
     FROM cart_items c JOIN products p ON p.id = c.product_id WHERE c.customer_id = $1 ORDER BY c.id";

#[derive(Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub fn new(pool: PgPool) -> Self { Self { pool } }

    pub async fn connect(url: &str, max_connections: u32) -> Result<Self> {
        let pool = PgPoolOptions::new().max_connections(max_connections).connect(url).await?;
        Ok(Self::new(pool))
    }

    pub async fn migrate(&self) -> std::result::Result<(), sqlx::migrate::MigrateError> {
        sqlx::migrate!("./migrations").run(&self.pool).await
    }

    pub fn pool(&self) -> &PgPool { &self.pool }
}

#[derive(sqlx::FromRow)]
struct UserRow { id: i64, username: String, password_hash: String, role: String, created_at: DateTime<Utc> }

impl TryFrom<UserRow> for User {
    type Error = MarketplaceError;
    fn try_from(r: UserRow) -> Result<Self> {
        let role: Role = r.role.parse().map_err(|e| MarketplaceError::StoreFailure(format!("user {}: {}", r.id, e)))?;
        Ok(User { id: r.id, username: r.username, password_hash: r.password_hash, role, created_at: r.created_at })
    }
}

#[derive(sqlx::FromRow)]
struct ProductRow {
    id: i64, name: String, description: String, price: Decimal, image_path: Option<String>, seller_id: i64,
    created_at: DateTime<Utc>, updated_at: DateTime<Utc>,
}

impl TryFrom<ProductRow> for Product {
    type Error = MarketplaceError;
    fn try_from(r: ProductRow) -> Result<Self> {
        Ok(Product {
            id: r.id, name: r.name, description: r.description, price: stored_price(r.price)?, image_path: r.image_path,
            seller_id: r.seller_id, created_at: r.created_at, updated_at: r.updated_at,
        })
    }
}

#[derive(sqlx::FromRow)]
struct CartEntryRow {
    id: i64, customer_id: i64, product_id: i64, quantity: i32,
    name: String, description: String, price: Decimal, image_path: Option<String>,
}

impl TryFrom<CartEntryRow> for CartEntry {
    type Error = MarketplaceError;
    fn try_from(r: CartEntryRow) -> Result<Self> {
        Ok(CartEntry {
            line: CartLine { id: r.id, customer_id: r.customer_id, product_id: r.product_id, quantity: stored_quantity(r.quantity)? },
            product: CartProduct { name: r.name, description: r.description, price: stored_price(r.price)?, image_path: r.image_path },
        })
    }
}

#[derive(sqlx::FromRow)]
struct OrderRow { id: i64, customer_id: i64, total_price: Decimal, created_at: DateTime<Utc> }

#[derive(sqlx::FromRow)]
struct OrderItemRow { id: i64, order_id: i64, product_id: i64, product_name: String, quantity: i32, price: Decimal }

impl TryFrom<OrderItemRow> for OrderItem {
    type Error = MarketplaceError;
    fn try_from(r: OrderItemRow) -> Result<Self> {
        Ok(OrderItem {
            id: r.id, order_id: r.order_id, product_id: r.product_id, product_name: r.product_name,
            quantity: stored_quantity(r.quantity)?, price: stored_price(r.price)?,
        })
    }
}

fn stored_price(d: Decimal) -> Result<Price> {
    Price::new(d).map_err(|e| MarketplaceError::StoreFailure(format!("stored price {}: {}", d, e)))
}

fn stored_quantity(q: i32) -> Result<Quantity> {
    Quantity::try_from(q).map_err(|e| MarketplaceError::StoreFailure(format!("stored quantity {}: {}", q, e)))
}

fn db_quantity(q: Quantity) -> i32 { i32::try_from(q.value()).unwrap_or(i32::MAX) }

fn is_unique_violation(e: &sqlx::Error) -> bool {
    matches!(e, sqlx::Error::Database(db) if db.is_unique_violation())
}

fn is_foreign_key_violation(e: &sqlx::Error) -> bool {
    matches!(e, sqlx::Error::Database(db) if db.is_foreign_key_violation())
}

fn convert_rows<R, T>(rows: Vec<R>) -> Result<Vec<T>>
where
    T: TryFrom<R, Error = MarketplaceError>,
{
    rows.into_iter().map(T::try_from).collect()
}

#[async_trait]
impl UserRepository for PgStore {
    async fn create(&self, user: NewUser) -> Result<User> {
        let row = sqlx::query_as::<_, UserRow>(
            "INSERT INTO users (username, password_hash, role) VALUES ($1, $2, $3) RETURNING id, username, password_hash, role, created_at",
        )
        .bind(&user.username).bind(&user.password_hash).bind(user.role.as_str())
        .fetch_one(&self.pool).await
        .map_err(|e| if is_unique_violation(&e) { MarketplaceError::InvalidInput("username already exists".into()) } else { e.into() })?;
        row.try_into()
    }

    async fn find_by_username(&self, username: &str) -> Result<Option<User>> {
        sqlx::query_as::<_, UserRow>("SELECT id, username, password_hash, role, created_at FROM users WHERE username = $1")
            .bind(username).fetch_optional(&self.pool).await?
            .map(User::try_from).transpose()
    }

    async fn store_refresh_token(&self, token_id: Uuid, user_id: i64, expires_at: DateTime<Utc>) -> Result<()> {
        sqlx::query("INSERT INTO refresh_tokens (id, user_id, expires_at) VALUES ($1, $2, $3)")
            .bind(token_id).bind(user_id).bind(expires_at).execute(&self.pool).await?;
        Ok(())
    }

    async fn refresh_token_active(&self, token_id: Uuid) -> Result<bool> {
        let (active,): (bool,) = sqlx::query_as(
            "SELECT EXISTS (SELECT 1 FROM refresh_tokens WHERE id = $1 AND revoked_at IS NULL AND expires_at > NOW())",
        )
        .bind(token_id).fetch_one(&self.pool).await?;
        Ok(active)
    }

    async fn revoke_refresh_token(&self, token_id: Uuid) -> Result<bool> {
        let done = sqlx::query("UPDATE refresh_tokens SET revoked_at = NOW() WHERE id = $1 AND revoked_at IS NULL")
            .bind(token_id).execute(&self.pool).await?;
        Ok(done.rows_affected() > 0)
    }
}

#[async_trait]
impl ProductRepository for PgStore {
    async fn insert(&self, p: NewProduct) -> Result<Product> {
        let sql = format!(
            "INSERT INTO products (name, description, price, image_path, seller_id) VALUES ($1, $2, $3, $4, $5) RETURNING {}",
            PRODUCT_COLUMNS
        );
        sqlx::query_as::<_, ProductRow>(&sql)
            .bind(&p.name).bind(&p.description).bind(p.price.amount()).bind(&p.image_path).bind(p.seller_id)
            .fetch_one(&self.pool).await?
            .try_into()
    }

    async fn find(&self, id: i64) -> Result<Option<Product>> {
        let sql = format!("SELECT {} FROM products WHERE id = $1", PRODUCT_COLUMNS);
        sqlx::query_as::<_, ProductRow>(&sql).bind(id).fetch_optional(&self.pool).await?.map(Product::try_from).transpose()
    }

    async fn list_all(&self) -> Result<Vec<Product>> {
        let sql = format!("SELECT {} FROM products ORDER BY id", PRODUCT_COLUMNS);
        convert_rows(sqlx::query_as::<_, ProductRow>(&sql).fetch_all(&self.pool).await?)
    }

    async fn list_by_seller(&self, seller_id: i64) -> Result<Vec<Product>> {
        let sql = format!("SELECT {} FROM products WHERE seller_id = $1 ORDER BY id", PRODUCT_COLUMNS);
        convert_rows(sqlx::query_as::<_, ProductRow>(&sql).bind(seller_id).fetch_all(&self.pool).await?)
    }

    async fn update_price(&self, id: i64, seller_id: i64, price: Price) -> Result<Option<Product>> {
        let sql = format!(
            "UPDATE products SET price = $3, updated_at = NOW() WHERE id = $1 AND seller_id = $2 RETURNING {}",
            PRODUCT_COLUMNS
        );
        sqlx::query_as::<_, ProductRow>(&sql)
            .bind(id).bind(seller_id).bind(price.amount())
            .fetch_optional(&self.pool).await?.map(Product::try_from).transpose()
    }

    async fn update_description(&self, id: i64, seller_id: i64, description: &str) -> Result<Option<Product>> {
        let sql = format!(
            "UPDATE products SET description = $3, updated_at = NOW() WHERE id = $1 AND seller_id = $2 RETURNING {}",
            PRODUCT_COLUMNS
        );
        sqlx::query_as::<_, ProductRow>(&sql)
            .bind(id).bind(seller_id).bind(description)
            .fetch_optional(&self.pool).await?.map(Product::try_from).transpose()
    }

    async fn update_image(&self, id: i64, seller_id: i64, image_path: Option<&str>) -> Result<Option<Product>> {
        let sql = format!(
            "UPDATE products SET image_path = $3, updated_at = NOW() WHERE id = $1 AND seller_id = $2 RETURNING {}",
            PRODUCT_COLUMNS
        );
        sqlx::query_as::<_, ProductRow>(&sql)
            .bind(id).bind(seller_id).bind(image_path)
            .fetch_optional(&self.pool).await?.map(Product::try_from).transpose()
    }

    async fn delete(&self, id: i64, seller_id: i64) -> Result<bool> {
        let done = sqlx::query("DELETE FROM products WHERE id = $1 AND seller_id = $2")
            .bind(id).bind(seller_id).execute(&self.pool).await?;
        Ok(done.rows_affected() > 0)
    }
}

#[async_trait]
impl CartRepository for PgStore {
    async fn add(&self, customer_id: i64, product_id: i64, quantity: Quantity) -> Result<bool> {
        let (inserted,): (bool,) = sqlx::query_as(
            "INSERT INTO cart_items (customer_id, product_id, quantity) VALUES ($1, $2, $3) \
             ON CONFLICT (customer_id, product_id) DO UPDATE SET quantity = cart_items.quantity + EXCLUDED.quantity \
             RETURNING (xmax = 0)",
        )
        .bind(customer_id).bind(product_id).bind(db_quantity(quantity))
        .fetch_one(&self.pool).await
        .map_err(|e| if is_foreign_key_violation(&e) { MarketplaceError::NotFound("Product not found".into()) } else { e.into() })?;
        Ok(inserted)
    }

    async fn find_line(&self, line_id: i64) -> Result<Option<CartLine>> {
        let row: Option<(i64, i64, i64, i32)> =
            sqlx::query_as("SELECT id, customer_id, product_id, quantity FROM cart_items WHERE id = $1")
                .bind(line_id).fetch_optional(&self.pool).await?;
        row.map(|(id, customer_id, product_id, quantity)| {
            Ok(CartLine { id, customer_id, product_id, quantity: stored_quantity(quantity)? })
        })
        .transpose()
    }

    async fn adjust_quantity(&self, line_id: i64, customer_id: i64, delta: i32) -> Result<Option<Quantity>> {
        let row: Option<(i32,)> = sqlx::query_as(
            "UPDATE cart_items SET quantity = quantity + $3 WHERE id = $1 AND customer_id = $2 AND quantity + $3 >= 1 RETURNING quantity",
        )
        .bind(line_id).bind(customer_id).bind(delta)
        .fetch_optional(&self.pool).await?;
        row.map(|(q,)| stored_quantity(q)).transpose()
    }

    async fn remove(&self, line_id: i64, customer_id: i64) -> Result<bool> {
        let done = sqlx::query("DELETE FROM cart_items WHERE id = $1 AND customer_id = $2")
            .bind(line_id).bind(customer_id).execute(&self.pool).await?;
        Ok(done.rows_affected() > 0)
    }

    async fn entries(&self, customer_id: i64) -> Result<Vec<CartEntry>> {
        convert_rows(sqlx::query_as::<_, CartEntryRow>(CART_SELECT).bind(customer_id).fetch_all(&self.pool).await?)
    }
}

#[async_trait]
impl OrderRepository for PgStore {
    async fn commit(&self, draft: OrderDraft) -> Result<Order> {
        let mut tx = self.pool.begin().await?;

        let locked = format!("{} FOR UPDATE OF c", CART_SELECT);
        let current: Vec<CartEntry> =
            convert_rows(sqlx::query_as::<_, CartEntryRow>(&locked).bind(draft.customer_id).fetch_all(&mut *tx).await?)?;
        if !draft.matches(&current) {
            return Err(OrderError::StaleCart.into());
        }

        let (order_id, created_at): (i64, DateTime<Utc>) =
            sqlx::query_as("INSERT INTO orders (customer_id, total_price) VALUES ($1, $2) RETURNING id, created_at")
                .bind(draft.customer_id).bind(draft.total_price)
                .fetch_one(&mut *tx).await?;

        let mut item_ids = Vec::with_capacity(draft.lines.len());
        for line in &draft.lines {
            let (id,): (i64,) = sqlx::query_as(
                "INSERT INTO order_items (order_id, product_id, product_name, quantity, price) VALUES ($1, $2, $3, $4, $5) RETURNING id",
            )
            .bind(order_id).bind(line.product_id).bind(&line.product_name).bind(db_quantity(line.quantity)).bind(line.price.amount())
            .fetch_one(&mut *tx).await?;
            item_ids.push(id);
        }

        // Only the locked lines; a line added concurrently stays in the cart.
        let consumed = draft.cart_line_ids();
        sqlx::query("DELETE FROM cart_items WHERE customer_id = $1 AND id = ANY($2)")
            .bind(draft.customer_id).bind(&consumed[..])
            .execute(&mut *tx).await?;
        tx.commit().await?;

        let mut ids = item_ids.into_iter();
        Ok(draft.into_order(order_id, created_at, || ids.next().unwrap_or_default()))
    }

    async fn list_for_customer(&self, customer_id: i64) -> Result<Vec<Order>> {
        let orders = sqlx::query_as::<_, OrderRow>(
            "SELECT id, customer_id, total_price, created_at FROM orders WHERE customer_id = $1 ORDER BY created_at DESC, id DESC",
        )
        .bind(customer_id).fetch_all(&self.pool).await?;
        if orders.is_empty() {
            return Ok(Vec::new());
        }

        let ids: Vec<i64> = orders.iter().map(|o| o.id).collect();
        let items: Vec<OrderItem> = convert_rows(
            sqlx::query_as::<_, OrderItemRow>(
                "SELECT id, order_id, product_id, product_name, quantity, price FROM order_items WHERE order_id = ANY($1) ORDER BY id",
            )
            .bind(&ids[..]).fetch_all(&self.pool).await?,
        )?;
        let mut by_order: HashMap<i64, Vec<OrderItem>> = HashMap::new();
        for item in items {
            by_order.entry(item.order_id).or_default().push(item);
        }

        Ok(orders.into_iter().map(|o| Order {
            items: by_order.remove(&o.id).unwrap_or_default(),
            id: o.id, customer_id: o.customer_id, total_price: o.total_price, created_at: o.created_at,
        }).collect())
    }
}
