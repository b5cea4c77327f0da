//! # Order Repository
//!
//! Order placement and history.
//!
//! ## Placement
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  BEGIN                                                                 │
//! │    write_cart (status = completed, version check)  ← 409 if stale      │
//! │    INSERT INTO orders ...                         ← number collision?  │
//! │        └── regenerate order number, retry                              │
//! │    INSERT INTO order_items ... (frozen lines)                          │
//! │  COMMIT                                                                │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//! `orders.cart_id` is unique, so a cart converts into at most one order.
//!
//! ## Status Changes
//! `UPDATE ... WHERE status = <status we validated against>`: a concurrent
//! change makes the update match no row and surfaces as a conflict.

use chrono::{DateTime, Utc};
use sqlx::{SqliteConnection, SqlitePool};
use tracing::{debug, info, warn};

use crate::error::{DbError, DbResult};
use crate::repository::cart::write_cart;
use bazaar_core::{
    generate_order_number, Cart, CartStatus, LineOption, Order, OrderItem, OrderStatus,
    PaymentMethod,
};

const ORDER_NUMBER_ATTEMPTS: usize = 5;

const ORDER_COLUMNS: &str = r#"
    id, tenant_id, user_id, order_number, cart_id, address_id, coupon_id, coupon_code,
    subtotal_cents, tax_cents, delivery_fee_cents, platform_fee_cents,
    coupon_discount_cents, total_cents, distance_meters, duration_seconds,
    status, payment_method, created_at
"#;

#[derive(Debug, sqlx::FromRow)]
struct OrderRow {
    id: String,
    tenant_id: String,
    user_id: String,
    order_number: String,
    cart_id: String,
    address_id: String,
    coupon_id: Option<String>,
    coupon_code: Option<String>,
    subtotal_cents: i64,
    tax_cents: i64,
    delivery_fee_cents: i64,
    platform_fee_cents: i64,
    coupon_discount_cents: i64,
    total_cents: i64,
    distance_meters: i64,
    duration_seconds: i64,
    status: OrderStatus,
    payment_method: PaymentMethod,
    created_at: DateTime<Utc>,
}

#[derive(Debug, sqlx::FromRow)]
struct OrderItemRow {
    product_id: String,
    quantity: i64,
    unit_price_cents: i64,
    line_total_cents: i64,
    options_json: String,
}

impl OrderRow {
    fn into_order(self, items: Vec<OrderItem>) -> Order {
        Order {
            id: self.id,
            tenant_id: self.tenant_id,
            user_id: self.user_id,
            order_number: self.order_number,
            cart_id: self.cart_id,
            address_id: self.address_id,
            coupon_id: self.coupon_id,
            coupon_code: self.coupon_code,
            items,
            subtotal_cents: self.subtotal_cents,
            tax_cents: self.tax_cents,
            delivery_fee_cents: self.delivery_fee_cents,
            platform_fee_cents: self.platform_fee_cents,
            coupon_discount_cents: self.coupon_discount_cents,
            total_cents: self.total_cents,
            distance_meters: self.distance_meters,
            duration_seconds: self.duration_seconds,
            status: self.status,
            payment_method: self.payment_method,
            created_at: self.created_at,
        }
    }
}

impl TryFrom<OrderItemRow> for OrderItem {
    type Error = DbError;

    fn try_from(row: OrderItemRow) -> DbResult<Self> {
        let options: Vec<LineOption> = serde_json::from_str(&row.options_json)?;
        Ok(OrderItem {
            product_id: row.product_id,
            quantity: row.quantity,
            unit_price_cents: row.unit_price_cents,
            line_total_cents: row.line_total_cents,
            options,
        })
    }
}

async fn insert_order_row(conn: &mut SqliteConnection, order: &Order) -> DbResult<()> {
    sqlx::query(
        r#"
        INSERT INTO orders (
            id, tenant_id, user_id, order_number, cart_id, address_id, coupon_id, coupon_code,
            subtotal_cents, tax_cents, delivery_fee_cents, platform_fee_cents,
            coupon_discount_cents, total_cents, distance_meters, duration_seconds,
            status, payment_method, created_at
        ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15, ?16, ?17, ?18, ?19)
        "#,
    )
    .bind(&order.id)
    .bind(&order.tenant_id)
    .bind(&order.user_id)
    .bind(&order.order_number)
    .bind(&order.cart_id)
    .bind(&order.address_id)
    .bind(&order.coupon_id)
    .bind(&order.coupon_code)
    .bind(order.subtotal_cents)
    .bind(order.tax_cents)
    .bind(order.delivery_fee_cents)
    .bind(order.platform_fee_cents)
    .bind(order.coupon_discount_cents)
    .bind(order.total_cents)
    .bind(order.distance_meters)
    .bind(order.duration_seconds)
    .bind(order.status)
    .bind(order.payment_method)
    .bind(order.created_at)
    .execute(&mut *conn)
    .await?;

    Ok(())
}

/// Repository for order database operations.
#[derive(Debug, Clone)]
pub struct OrderRepository {
    pool: SqlitePool,
}

impl OrderRepository {
    /// Creates a new OrderRepository.
    pub fn new(pool: SqlitePool) -> Self {
        OrderRepository { pool }
    }

    /// Completes `cart` and stores `order` in one transaction.
    ///
    /// `cart` must already be transitioned to `Completed` and still carry
    /// the version it was loaded with.
    ///
    /// ## Returns
    /// * `Ok(Order)` - the stored order (its number may differ from the
    ///   one passed in after a collision)
    /// * `Err(DbError::Conflict)` - the cart changed since it was loaded
    /// * `Err(DbError::UniqueViolation)` - the cart already has an order
    pub async fn place(&self, cart: &Cart, order: &Order) -> DbResult<Order> {
        if cart.status != CartStatus::Completed {
            return Err(DbError::Internal(format!(
                "cart {} must be completed before placing an order",
                cart.id
            )));
        }

        let now = Utc::now();
        let mut tx = self.pool.begin().await?;
        write_cart(&mut tx, cart, now).await?;

        let mut order = order.clone();
        let mut attempt = 0;
        loop {
            attempt += 1;
            match insert_order_row(&mut tx, &order).await {
                Ok(()) => break,
                Err(DbError::UniqueViolation { field, .. })
                    if field.contains("order_number") && attempt < ORDER_NUMBER_ATTEMPTS =>
                {
                    warn!(order_number = %order.order_number, "Order number collision, retrying");
                    order.order_number = generate_order_number();
                }
                Err(DbError::UniqueViolation { field, .. }) if field.contains("cart_id") => {
                    return Err(DbError::duplicate("order for cart", &cart.id));
                }
                Err(e) => return Err(e),
            }
        }

        for (position, item) in order.items.iter().enumerate() {
            sqlx::query(
                r#"
                INSERT INTO order_items (
                    order_id, position, product_id, quantity,
                    unit_price_cents, line_total_cents, options_json
                ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
                "#,
            )
            .bind(&order.id)
            .bind(position as i64)
            .bind(&item.product_id)
            .bind(item.quantity)
            .bind(item.unit_price_cents)
            .bind(item.line_total_cents)
            .bind(serde_json::to_string(&item.options)?)
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;

        info!(
            order_number = %order.order_number,
            cart_id = %cart.id,
            total = %order.total(),
            "Order placed"
        );
        Ok(order)
    }

    async fn load_items(&self, order_id: &str) -> DbResult<Vec<OrderItem>> {
        let rows = sqlx::query_as::<_, OrderItemRow>(
            r#"
            SELECT product_id, quantity, unit_price_cents, line_total_cents, options_json
            FROM order_items WHERE order_id = ?1 ORDER BY position
            "#,
        )
        .bind(order_id)
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(OrderItem::try_from).collect()
    }

    /// The user's orders, newest first.
    pub async fn list(&self, tenant_id: &str, user_id: &str) -> DbResult<Vec<Order>> {
        let sql = format!(
            "SELECT {ORDER_COLUMNS} FROM orders WHERE tenant_id = ?1 AND user_id = ?2 ORDER BY created_at DESC"
        );
        let rows = sqlx::query_as::<_, OrderRow>(&sql)
            .bind(tenant_id)
            .bind(user_id)
            .fetch_all(&self.pool)
            .await?;

        let mut orders = Vec::with_capacity(rows.len());
        for row in rows {
            let items = self.load_items(&row.id).await?;
            orders.push(row.into_order(items));
        }

        debug!(count = orders.len(), user_id = %user_id, "Listed orders");
        Ok(orders)
    }

    pub async fn get_by_number(
        &self,
        tenant_id: &str,
        user_id: &str,
        order_number: &str,
    ) -> DbResult<Option<Order>> {
        let sql = format!(
            "SELECT {ORDER_COLUMNS} FROM orders WHERE tenant_id = ?1 AND user_id = ?2 AND order_number = ?3"
        );
        let row = sqlx::query_as::<_, OrderRow>(&sql)
            .bind(tenant_id)
            .bind(user_id)
            .bind(order_number)
            .fetch_optional(&self.pool)
            .await?;

        self.hydrate(row).await
    }

    /// Any order of the tenant, for store staff.
    pub async fn get_for_tenant(&self, tenant_id: &str, order_number: &str) -> DbResult<Option<Order>> {
        let sql = format!("SELECT {ORDER_COLUMNS} FROM orders WHERE tenant_id = ?1 AND order_number = ?2");
        let row = sqlx::query_as::<_, OrderRow>(&sql)
            .bind(tenant_id)
            .bind(order_number)
            .fetch_optional(&self.pool)
            .await?;

        self.hydrate(row).await
    }

    /// All orders of the tenant, newest first, optionally in one status.
    pub async fn list_for_tenant(
        &self,
        tenant_id: &str,
        status: Option<OrderStatus>,
    ) -> DbResult<Vec<Order>> {
        let sql = format!(
            r#"
            SELECT {ORDER_COLUMNS} FROM orders
            WHERE tenant_id = ?1 AND (?2 IS NULL OR status = ?2)
            ORDER BY created_at DESC
            "#
        );
        let rows = sqlx::query_as::<_, OrderRow>(&sql)
            .bind(tenant_id)
            .bind(status)
            .fetch_all(&self.pool)
            .await?;

        let mut orders = Vec::with_capacity(rows.len());
        for row in rows {
            let items = self.load_items(&row.id).await?;
            orders.push(row.into_order(items));
        }
        Ok(orders)
    }

    /// Stores `order.status`, provided the row is still in `from`.
    ///
    /// ## Returns
    /// * `Err(DbError::Conflict)` - the status changed since `order` was loaded
    pub async fn update_status(&self, order: &Order, from: OrderStatus) -> DbResult<Order> {
        let result = sqlx::query(
            "UPDATE orders SET status = ?3 WHERE tenant_id = ?1 AND id = ?2 AND status = ?4",
        )
        .bind(&order.tenant_id)
        .bind(&order.id)
        .bind(order.status)
        .bind(from)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::conflict("Order", &order.order_number));
        }

        info!(
            order_number = %order.order_number,
            from = from.as_str(),
            to = order.status.as_str(),
            "Order status changed"
        );
        Ok(order.clone())
    }

    async fn hydrate(&self, row: Option<OrderRow>) -> DbResult<Option<Order>> {
        match row {
            Some(row) => {
                let items = self.load_items(&row.id).await?;
                Ok(Some(row.into_order(items)))
            }
            None => Ok(None),
        }
    }
}
