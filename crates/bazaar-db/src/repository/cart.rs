//! # Cart Repository
//!
//! Versioned reads and writes of carts and their lines.
//!
//! ## Optimistic Concurrency
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  load cart (version = 3)                                               │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  mutate + re-price in memory                                           │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  BEGIN                                                                 │
//! │    UPDATE carts SET ..., version = 4 WHERE id = ? AND version = 3      │
//! │    0 rows? → ROLLBACK, DbError::Conflict (409)                         │
//! │    DELETE FROM cart_items WHERE cart_id = ?                            │
//! │    INSERT INTO cart_items ... (one row per line, in order)             │
//! │  COMMIT                                                                │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Expiry
//! An active cart untouched for `ttl_days` is abandoned the next time it is
//! loaded, or by [`CartRepository::sweep_expired`].

use chrono::{DateTime, Duration, Utc};
use sqlx::{SqliteConnection, SqlitePool};
use tracing::{debug, info};

use crate::error::{DbError, DbResult};
use bazaar_core::{Cart, CartLineItem, CartStatus, LineOption};

const CART_COLUMNS: &str = r#"
    id, tenant_id, user_id, status,
    subtotal_cents, tax_cents, delivery_fee_cents, platform_fee_cents,
    coupon_discount_cents, total_cents, distance_meters, duration_seconds,
    address_id, coupon_id, version, created_at, updated_at
"#;

#[derive(Debug, sqlx::FromRow)]
struct CartRow {
    id: String,
    tenant_id: String,
    user_id: String,
    status: CartStatus,
    subtotal_cents: i64,
    tax_cents: i64,
    delivery_fee_cents: i64,
    platform_fee_cents: i64,
    coupon_discount_cents: i64,
    total_cents: i64,
    distance_meters: i64,
    duration_seconds: i64,
    address_id: Option<String>,
    coupon_id: Option<String>,
    version: i64,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

#[derive(Debug, sqlx::FromRow)]
struct CartItemRow {
    product_id: String,
    quantity: i64,
    unit_price_cents: i64,
    line_total_cents: i64,
    options_json: String,
}

impl CartRow {
    fn into_cart(self, items: Vec<CartLineItem>) -> Cart {
        Cart {
            id: self.id,
            tenant_id: self.tenant_id,
            user_id: self.user_id,
            items,
            status: self.status,
            subtotal_cents: self.subtotal_cents,
            tax_cents: self.tax_cents,
            delivery_fee_cents: self.delivery_fee_cents,
            platform_fee_cents: self.platform_fee_cents,
            coupon_discount_cents: self.coupon_discount_cents,
            total_cents: self.total_cents,
            distance_meters: self.distance_meters,
            duration_seconds: self.duration_seconds,
            address_id: self.address_id,
            coupon_id: self.coupon_id,
            version: self.version,
            created_at: self.created_at,
            updated_at: self.updated_at,
        }
    }
}

impl TryFrom<CartItemRow> for CartLineItem {
    type Error = DbError;

    fn try_from(row: CartItemRow) -> DbResult<Self> {
        let options: Vec<LineOption> = serde_json::from_str(&row.options_json)?;
        Ok(CartLineItem {
            product_id: row.product_id,
            quantity: row.quantity,
            unit_price_cents: row.unit_price_cents,
            line_total_cents: row.line_total_cents,
            options,
        })
    }
}

/// Writes `cart` over the stored row whose version is `cart.version`,
/// bumping the version. Shared with order placement so both run inside
/// the caller's transaction.
pub(crate) async fn write_cart(
    conn: &mut SqliteConnection,
    cart: &Cart,
    now: DateTime<Utc>,
) -> DbResult<()> {
    let result = sqlx::query(
        r#"
        UPDATE carts SET
            status = ?3,
            subtotal_cents = ?4,
            tax_cents = ?5,
            delivery_fee_cents = ?6,
            platform_fee_cents = ?7,
            coupon_discount_cents = ?8,
            total_cents = ?9,
            distance_meters = ?10,
            duration_seconds = ?11,
            address_id = ?12,
            coupon_id = ?13,
            version = version + 1,
            updated_at = ?14
        WHERE id = ?1 AND version = ?2
        "#,
    )
    .bind(&cart.id)
    .bind(cart.version)
    .bind(cart.status)
    .bind(cart.subtotal_cents)
    .bind(cart.tax_cents)
    .bind(cart.delivery_fee_cents)
    .bind(cart.platform_fee_cents)
    .bind(cart.coupon_discount_cents)
    .bind(cart.total_cents)
    .bind(cart.distance_meters)
    .bind(cart.duration_seconds)
    .bind(&cart.address_id)
    .bind(&cart.coupon_id)
    .bind(now)
    .execute(&mut *conn)
    .await?;

    if result.rows_affected() == 0 {
        debug!(cart_id = %cart.id, version = cart.version, "Stale cart version");
        return Err(DbError::conflict("Cart", &cart.id));
    }

    sqlx::query("DELETE FROM cart_items WHERE cart_id = ?1")
        .bind(&cart.id)
        .execute(&mut *conn)
        .await?;

    for (position, item) in cart.items.iter().enumerate() {
        sqlx::query(
            r#"
            INSERT INTO cart_items (
                cart_id, position, product_id, quantity,
                unit_price_cents, line_total_cents, options_json
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
            "#,
        )
        .bind(&cart.id)
        .bind(position as i64)
        .bind(&item.product_id)
        .bind(item.quantity)
        .bind(item.unit_price_cents)
        .bind(item.line_total_cents)
        .bind(serde_json::to_string(&item.options)?)
        .execute(&mut *conn)
        .await?;
    }

    Ok(())
}

/// Repository for cart database operations.
#[derive(Debug, Clone)]
pub struct CartRepository {
    pool: SqlitePool,
}

impl CartRepository {
    /// Creates a new CartRepository.
    pub fn new(pool: SqlitePool) -> Self {
        CartRepository { pool }
    }

    async fn load_items(&self, cart_id: &str) -> DbResult<Vec<CartLineItem>> {
        let rows = sqlx::query_as::<_, CartItemRow>(
            r#"
            SELECT product_id, quantity, unit_price_cents, line_total_cents, options_json
            FROM cart_items WHERE cart_id = ?1 ORDER BY position
            "#,
        )
        .bind(cart_id)
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(CartLineItem::try_from).collect()
    }

    /// Gets a cart by id, in any status.
    pub async fn get(&self, tenant_id: &str, id: &str) -> DbResult<Option<Cart>> {
        let sql = format!("SELECT {CART_COLUMNS} FROM carts WHERE tenant_id = ?1 AND id = ?2");
        let row = sqlx::query_as::<_, CartRow>(&sql)
            .bind(tenant_id)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        match row {
            Some(row) => {
                let items = self.load_items(&row.id).await?;
                Ok(Some(row.into_cart(items)))
            }
            None => Ok(None),
        }
    }

    /// Gets the user's active cart without applying expiry.
    pub async fn find_active(&self, tenant_id: &str, user_id: &str) -> DbResult<Option<Cart>> {
        let sql = format!(
            "SELECT {CART_COLUMNS} FROM carts WHERE tenant_id = ?1 AND user_id = ?2 AND status = 'active'"
        );
        let row = sqlx::query_as::<_, CartRow>(&sql)
            .bind(tenant_id)
            .bind(user_id)
            .fetch_optional(&self.pool)
            .await?;

        match row {
            Some(row) => {
                let items = self.load_items(&row.id).await?;
                Ok(Some(row.into_cart(items)))
            }
            None => Ok(None),
        }
    }

    /// Gets the user's active cart, abandoning it first if it has expired.
    pub async fn load_active(
        &self,
        tenant_id: &str,
        user_id: &str,
        ttl_days: i64,
        now: DateTime<Utc>,
    ) -> DbResult<Option<Cart>> {
        let Some(cart) = self.find_active(tenant_id, user_id).await? else {
            return Ok(None);
        };

        if !cart.is_expired(now, ttl_days) {
            return Ok(Some(cart));
        }

        info!(cart_id = %cart.id, "Abandoning expired cart");
        sqlx::query(
            r#"
            UPDATE carts SET status = 'abandoned', version = version + 1, updated_at = ?3
            WHERE id = ?1 AND version = ?2 AND status = 'active'
            "#,
        )
        .bind(&cart.id)
        .bind(cart.version)
        .bind(now)
        .execute(&self.pool)
        .await?;

        Ok(None)
    }

    /// Creates a new empty active cart.
    ///
    /// If a concurrent request created one first, that cart is returned.
    pub async fn create_active(&self, tenant_id: &str, user_id: &str) -> DbResult<Cart> {
        let cart = Cart::new(tenant_id, user_id);
        debug!(cart_id = %cart.id, user_id = %user_id, "Creating cart");

        let inserted = sqlx::query(
            r#"
            INSERT INTO carts (id, tenant_id, user_id, status, version, created_at, updated_at)
            VALUES (?1, ?2, ?3, 'active', 0, ?4, ?4)
            "#,
        )
        .bind(&cart.id)
        .bind(&cart.tenant_id)
        .bind(&cart.user_id)
        .bind(cart.created_at)
        .execute(&self.pool)
        .await;

        match inserted.map_err(DbError::from) {
            Ok(_) => Ok(cart),
            Err(DbError::UniqueViolation { .. }) => self
                .find_active(tenant_id, user_id)
                .await?
                .ok_or_else(|| DbError::not_found("Cart", user_id)),
            Err(e) => Err(e),
        }
    }

    /// Loads the active cart or creates an empty one.
    pub async fn get_or_create_active(
        &self,
        tenant_id: &str,
        user_id: &str,
        ttl_days: i64,
    ) -> DbResult<Cart> {
        match self.load_active(tenant_id, user_id, ttl_days, Utc::now()).await? {
            Some(cart) => Ok(cart),
            None => self.create_active(tenant_id, user_id).await,
        }
    }

    /// Persists a cart if nobody else wrote it since it was loaded.
    ///
    /// ## Returns
    /// * `Ok(Cart)` - the cart with its new version and timestamp
    /// * `Err(DbError::Conflict)` - the stored version moved on
    pub async fn save(&self, cart: &Cart) -> DbResult<Cart> {
        let now = Utc::now();
        let mut tx = self.pool.begin().await?;
        write_cart(&mut tx, cart, now).await?;
        tx.commit().await?;

        debug!(cart_id = %cart.id, version = cart.version + 1, "Cart saved");

        let mut saved = cart.clone();
        saved.version += 1;
        saved.updated_at = now;
        Ok(saved)
    }

    /// Abandons every active cart idle since before `now − ttl_days`.
    pub async fn sweep_expired(&self, now: DateTime<Utc>, ttl_days: i64) -> DbResult<u64> {
        let cutoff = now - Duration::days(ttl_days);
        let result = sqlx::query(
            r#"
            UPDATE carts SET status = 'abandoned', version = version + 1, updated_at = ?1
            WHERE status = 'active' AND updated_at < ?2
            "#,
        )
        .bind(now)
        .bind(cutoff)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() > 0 {
            info!(count = result.rows_affected(), "Abandoned expired carts");
        }
        Ok(result.rows_affected())
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Database, DbConfig};
    use bazaar_core::LineUpdate;

    async fn db() -> Database {
        Database::new(DbConfig::in_memory()).await.unwrap()
    }

    fn update(product_id: &str, quantity: i64) -> LineUpdate {
        LineUpdate {
            product_id: product_id.to_string(),
            quantity,
            options: vec![LineOption {
                title: "Size".to_string(),
                value: "Large".to_string(),
            }],
        }
    }

    #[tokio::test]
    async fn test_create_and_save_roundtrip() {
        let db = db().await;
        let repo = db.carts();

        let mut cart = repo.get_or_create_active("t-1", "u-1", 7).await.unwrap();
        assert_eq!(cart.version, 0);

        cart.upsert_lines(&[update("p-1", 2), update("p-2", 1)]).unwrap();
        cart.subtotal_cents = 1234;
        let saved = repo.save(&cart).await.unwrap();
        assert_eq!(saved.version, 1);

        let loaded = repo.find_active("t-1", "u-1").await.unwrap().unwrap();
        assert_eq!(loaded.version, 1);
        assert_eq!(loaded.subtotal_cents, 1234);
        assert_eq!(loaded.items.len(), 2);
        assert_eq!(loaded.items[0].product_id, "p-1");
        assert_eq!(loaded.items[0].options[0].value, "Large");
    }

    #[tokio::test]
    async fn test_stale_version_conflicts() {
        let db = db().await;
        let repo = db.carts();

        let cart = repo.get_or_create_active("t-1", "u-1", 7).await.unwrap();
        let mut first = cart.clone();
        let mut second = cart;

        first.upsert_lines(&[update("p-1", 1)]).unwrap();
        repo.save(&first).await.unwrap();

        second.upsert_lines(&[update("p-2", 1)]).unwrap();
        let result = repo.save(&second).await;
        assert!(matches!(result, Err(DbError::Conflict { .. })));

        // the first write survived untouched
        let loaded = repo.find_active("t-1", "u-1").await.unwrap().unwrap();
        assert_eq!(loaded.items.len(), 1);
        assert_eq!(loaded.items[0].product_id, "p-1");
    }

    #[tokio::test]
    async fn test_one_active_cart_per_user() {
        let db = db().await;
        let repo = db.carts();

        let a = repo.create_active("t-1", "u-1").await.unwrap();
        let b = repo.create_active("t-1", "u-1").await.unwrap();
        assert_eq!(a.id, b.id);
    }

    #[tokio::test]
    async fn test_lazy_expiry() {
        let db = db().await;
        let repo = db.carts();

        let cart = repo.get_or_create_active("t-1", "u-1", 7).await.unwrap();
        let later = Utc::now() + Duration::days(8);

        assert!(repo.load_active("t-1", "u-1", 7, later).await.unwrap().is_none());

        let old = repo.get("t-1", &cart.id).await.unwrap().unwrap();
        assert_eq!(old.status, CartStatus::Abandoned);

        // a fresh cart replaces it
        let fresh = repo.get_or_create_active("t-1", "u-1", 7).await.unwrap();
        assert_ne!(fresh.id, cart.id);
    }

    #[tokio::test]
    async fn test_sweep_expired() {
        let db = db().await;
        let repo = db.carts();

        repo.get_or_create_active("t-1", "u-1", 7).await.unwrap();
        repo.get_or_create_active("t-1", "u-2", 7).await.unwrap();

        assert_eq!(repo.sweep_expired(Utc::now(), 7).await.unwrap(), 0);
        let later = Utc::now() + Duration::days(8);
        assert_eq!(repo.sweep_expired(later, 7).await.unwrap(), 2);
        assert!(repo.find_active("t-1", "u-1").await.unwrap().is_none());
    }
}
