//! # Product Repository
//!
//! Database operations for the catalog.
//!
//! ## Key Operations
//! - CRUD and soft delete
//! - Batch lookup for cart pricing
//! - Timed disable and the re-enable sweep
//!
//! ## Availability Lifecycle
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  active=1 ──► disable(re_enable_at) ──► active=0, re_enabled_at=T      │
//! │                                              │                          │
//! │                 re-enable job (every N secs) │ now >= T                 │
//! │                                              ▼                          │
//! │                                  active=1, re_enabled_at=NULL           │
//! │                                                                         │
//! │  is_deleted=1 is permanent: the product prices as "not found".         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use sqlx::{QueryBuilder, Sqlite, SqlitePool};
use tracing::debug;

use crate::error::{DbError, DbResult};
use bazaar_core::Product;

pub(crate) const PRODUCT_COLUMNS: &str = r#"
    id, tenant_id, name, product_code, description,
    price_cents, strike_price_cents, gst_bps,
    active, is_deleted, re_enabled_at, created_at, updated_at
"#;

/// Repository for product database operations.
#[derive(Debug, Clone)]
pub struct ProductRepository {
    pool: SqlitePool,
}

impl ProductRepository {
    /// Creates a new ProductRepository.
    pub fn new(pool: SqlitePool) -> Self {
        ProductRepository { pool }
    }

    /// Inserts a new product.
    ///
    /// ## Returns
    /// * `Err(DbError::UniqueViolation)` - product code already used by this tenant
    pub async fn insert(&self, product: &Product) -> DbResult<Product> {
        debug!(code = %product.product_code, tenant = %product.tenant_id, "Inserting product");

        sqlx::query(
            r#"
            INSERT INTO products (
                id, tenant_id, name, product_code, description,
                price_cents, strike_price_cents, gst_bps,
                active, is_deleted, re_enabled_at, created_at, updated_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13)
            "#,
        )
        .bind(&product.id)
        .bind(&product.tenant_id)
        .bind(&product.name)
        .bind(&product.product_code)
        .bind(&product.description)
        .bind(product.price_cents)
        .bind(product.strike_price_cents)
        .bind(product.gst_bps)
        .bind(product.active)
        .bind(product.is_deleted)
        .bind(product.re_enabled_at)
        .bind(product.created_at)
        .bind(product.updated_at)
        .execute(&self.pool)
        .await
        .map_err(|e| match DbError::from(e) {
            DbError::UniqueViolation { .. } => {
                DbError::duplicate("productCode", &product.product_code)
            }
            other => other,
        })?;

        Ok(product.clone())
    }

    /// Gets a product that has not been deleted.
    pub async fn get(&self, tenant_id: &str, id: &str) -> DbResult<Option<Product>> {
        let sql = format!(
            "SELECT {PRODUCT_COLUMNS} FROM products WHERE tenant_id = ?1 AND id = ?2 AND is_deleted = 0"
        );
        let product = sqlx::query_as::<_, Product>(&sql)
            .bind(tenant_id)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(product)
    }

    /// Lists the tenant's products, sorted by name.
    ///
    /// Disabled products are included only when `include_inactive` is set.
    pub async fn list(&self, tenant_id: &str, include_inactive: bool) -> DbResult<Vec<Product>> {
        let sql = format!(
            r#"
            SELECT {PRODUCT_COLUMNS} FROM products
            WHERE tenant_id = ?1 AND is_deleted = 0 AND (active = 1 OR ?2)
            ORDER BY name
            "#
        );
        let products = sqlx::query_as::<_, Product>(&sql)
            .bind(tenant_id)
            .bind(include_inactive)
            .fetch_all(&self.pool)
            .await?;

        debug!(count = products.len(), "Listed products");
        Ok(products)
    }

    /// Loads several products at once, keyed by id.
    ///
    /// Deleted products are returned too; the pricing engine decides what
    /// to do with them. Unknown ids are simply absent from the map.
    pub async fn get_many(
        &self,
        tenant_id: &str,
        ids: &[String],
    ) -> DbResult<HashMap<String, Product>> {
        if ids.is_empty() {
            return Ok(HashMap::new());
        }

        let mut builder: QueryBuilder<Sqlite> =
            QueryBuilder::new(format!("SELECT {PRODUCT_COLUMNS} FROM products WHERE tenant_id = "));
        builder.push_bind(tenant_id);
        builder.push(" AND id IN (");
        let mut separated = builder.separated(", ");
        for id in ids {
            separated.push_bind(id);
        }
        separated.push_unseparated(")");

        let products = builder
            .build_query_as::<Product>()
            .fetch_all(&self.pool)
            .await?;

        Ok(products.into_iter().map(|p| (p.id.clone(), p)).collect())
    }

    /// Updates an existing product's editable fields.
    pub async fn update(&self, product: &Product) -> DbResult<()> {
        debug!(id = %product.id, "Updating product");

        let result = sqlx::query(
            r#"
            UPDATE products SET
                name = ?3,
                product_code = ?4,
                description = ?5,
                price_cents = ?6,
                strike_price_cents = ?7,
                gst_bps = ?8,
                active = ?9,
                re_enabled_at = ?10,
                updated_at = ?11
            WHERE tenant_id = ?1 AND id = ?2 AND is_deleted = 0
            "#,
        )
        .bind(&product.tenant_id)
        .bind(&product.id)
        .bind(&product.name)
        .bind(&product.product_code)
        .bind(&product.description)
        .bind(product.price_cents)
        .bind(product.strike_price_cents)
        .bind(product.gst_bps)
        .bind(product.active)
        .bind(product.re_enabled_at)
        .bind(Utc::now())
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("Product", &product.id));
        }

        Ok(())
    }

    /// Switches a product off, optionally until `re_enable_at`.
    pub async fn disable(
        &self,
        tenant_id: &str,
        id: &str,
        re_enable_at: Option<DateTime<Utc>>,
    ) -> DbResult<()> {
        debug!(id = %id, re_enable_at = ?re_enable_at, "Disabling product");

        let result = sqlx::query(
            r#"
            UPDATE products SET active = 0, re_enabled_at = ?3, updated_at = ?4
            WHERE tenant_id = ?1 AND id = ?2 AND is_deleted = 0
            "#,
        )
        .bind(tenant_id)
        .bind(id)
        .bind(re_enable_at)
        .bind(Utc::now())
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("Product", id));
        }

        Ok(())
    }

    /// Marks a product deleted.
    pub async fn soft_delete(&self, tenant_id: &str, id: &str) -> DbResult<()> {
        debug!(id = %id, "Soft deleting product");

        let result = sqlx::query(
            r#"
            UPDATE products SET is_deleted = 1, active = 0, re_enabled_at = NULL, updated_at = ?3
            WHERE tenant_id = ?1 AND id = ?2 AND is_deleted = 0
            "#,
        )
        .bind(tenant_id)
        .bind(id)
        .bind(Utc::now())
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("Product", id));
        }

        Ok(())
    }

    /// Re-enables every disabled product whose `re_enabled_at` has passed,
    /// across all tenants. Returns how many were switched back on.
    pub async fn reenable_due(&self, now: DateTime<Utc>) -> DbResult<u64> {
        let result = sqlx::query(
            r#"
            UPDATE products SET active = 1, re_enabled_at = NULL, updated_at = ?1
            WHERE active = 0 AND is_deleted = 0
              AND re_enabled_at IS NOT NULL AND re_enabled_at <= ?1
            "#,
        )
        .bind(now)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected())
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::{Database, DbConfig};
    use chrono::Duration;
    use uuid::Uuid;

    pub(crate) fn sample_product(tenant_id: &str, code: &str, price_cents: i64) -> Product {
        let now = Utc::now();
        Product {
            id: Uuid::new_v4().to_string(),
            tenant_id: tenant_id.to_string(),
            name: format!("Product {code}"),
            product_code: code.to_string(),
            description: None,
            price_cents,
            strike_price_cents: price_cents,
            gst_bps: 500,
            active: true,
            is_deleted: false,
            re_enabled_at: None,
            created_at: now,
            updated_at: now,
        }
    }

    async fn db() -> Database {
        Database::new(DbConfig::in_memory()).await.unwrap()
    }

    #[tokio::test]
    async fn test_insert_and_get() {
        let db = db().await;
        let product = sample_product("t-1", "DOSA", 8000);
        db.products().insert(&product).await.unwrap();

        let loaded = db.products().get("t-1", &product.id).await.unwrap().unwrap();
        assert_eq!(loaded.price_cents, 8000);
        assert_eq!(loaded.gst_bps, 500);

        // tenant isolation
        assert!(db.products().get("t-2", &product.id).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_duplicate_code() {
        let db = db().await;
        db.products().insert(&sample_product("t-1", "DOSA", 8000)).await.unwrap();
        let result = db.products().insert(&sample_product("t-1", "DOSA", 9000)).await;
        assert!(matches!(result, Err(DbError::UniqueViolation { .. })));

        // other tenants may reuse the code
        db.products().insert(&sample_product("t-2", "DOSA", 9000)).await.unwrap();
    }

    #[tokio::test]
    async fn test_get_many() {
        let db = db().await;
        let a = sample_product("t-1", "A", 100);
        let b = sample_product("t-1", "B", 200);
        db.products().insert(&a).await.unwrap();
        db.products().insert(&b).await.unwrap();

        let ids = vec![a.id.clone(), b.id.clone(), "missing".to_string()];
        let map = db.products().get_many("t-1", &ids).await.unwrap();
        assert_eq!(map.len(), 2);
        assert_eq!(map[&b.id].price_cents, 200);
    }

    #[tokio::test]
    async fn test_disable_and_reenable() {
        let db = db().await;
        let product = sample_product("t-1", "IDLI", 4000);
        db.products().insert(&product).await.unwrap();

        let now = Utc::now();
        db.products()
            .disable("t-1", &product.id, Some(now - Duration::seconds(1)))
            .await
            .unwrap();

        let listed = db.products().list("t-1", false).await.unwrap();
        assert!(listed.is_empty());

        let count = db.products().reenable_due(now).await.unwrap();
        assert_eq!(count, 1);

        let loaded = db.products().get("t-1", &product.id).await.unwrap().unwrap();
        assert!(loaded.active);
        assert!(loaded.re_enabled_at.is_none());
    }

    #[tokio::test]
    async fn test_future_reenable_not_due() {
        let db = db().await;
        let product = sample_product("t-1", "VADA", 3000);
        db.products().insert(&product).await.unwrap();

        let now = Utc::now();
        db.products()
            .disable("t-1", &product.id, Some(now + Duration::hours(1)))
            .await
            .unwrap();

        assert_eq!(db.products().reenable_due(now).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_soft_delete_hides_product() {
        let db = db().await;
        let product = sample_product("t-1", "UPMA", 3000);
        db.products().insert(&product).await.unwrap();

        db.products().soft_delete("t-1", &product.id).await.unwrap();
        assert!(db.products().get("t-1", &product.id).await.unwrap().is_none());

        let map = db
            .products()
            .get_many("t-1", &[product.id.clone()])
            .await
            .unwrap();
        assert!(map[&product.id].is_deleted);
    }
}
