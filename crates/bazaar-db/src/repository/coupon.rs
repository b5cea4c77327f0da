//! # Coupon Repository

use sqlx::SqlitePool;
use tracing::debug;

use crate::error::{DbError, DbResult};
use bazaar_core::{Coupon, Money};

const COUPON_COLUMNS: &str =
    "id, tenant_id, code, discount_bps, min_price_cents, max_price_cents, active, created_at";

/// Repository for coupon database operations.
#[derive(Debug, Clone)]
pub struct CouponRepository {
    pool: SqlitePool,
}

impl CouponRepository {
    /// Creates a new CouponRepository.
    pub fn new(pool: SqlitePool) -> Self {
        CouponRepository { pool }
    }

    /// Inserts a coupon. Codes are unique per tenant.
    pub async fn insert(&self, coupon: &Coupon) -> DbResult<Coupon> {
        debug!(code = %coupon.code, "Inserting coupon");

        sqlx::query(
            r#"
            INSERT INTO coupons (
                id, tenant_id, code, discount_bps, min_price_cents, max_price_cents, active, created_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
            "#,
        )
        .bind(&coupon.id)
        .bind(&coupon.tenant_id)
        .bind(&coupon.code)
        .bind(coupon.discount_bps)
        .bind(coupon.min_price_cents)
        .bind(coupon.max_price_cents)
        .bind(coupon.active)
        .bind(coupon.created_at)
        .execute(&self.pool)
        .await
        .map_err(|e| match DbError::from(e) {
            DbError::UniqueViolation { .. } => DbError::duplicate("code", &coupon.code),
            other => other,
        })?;

        Ok(coupon.clone())
    }

    pub async fn get(&self, tenant_id: &str, id: &str) -> DbResult<Option<Coupon>> {
        let sql = format!("SELECT {COUPON_COLUMNS} FROM coupons WHERE tenant_id = ?1 AND id = ?2");
        let coupon = sqlx::query_as::<_, Coupon>(&sql)
            .bind(tenant_id)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(coupon)
    }

    /// All coupons of a tenant, newest first.
    pub async fn list(&self, tenant_id: &str) -> DbResult<Vec<Coupon>> {
        let sql = format!(
            "SELECT {COUPON_COLUMNS} FROM coupons WHERE tenant_id = ?1 ORDER BY created_at DESC"
        );
        let coupons = sqlx::query_as::<_, Coupon>(&sql)
            .bind(tenant_id)
            .fetch_all(&self.pool)
            .await?;

        Ok(coupons)
    }

    /// Active coupons whose `[min, max]` window contains `total`.
    pub async fn list_applicable(&self, tenant_id: &str, total: Money) -> DbResult<Vec<Coupon>> {
        let sql = format!(
            r#"
            SELECT {COUPON_COLUMNS} FROM coupons
            WHERE tenant_id = ?1 AND active = 1
              AND min_price_cents <= ?2 AND max_price_cents >= ?2
            ORDER BY discount_bps DESC
            "#
        );
        let coupons = sqlx::query_as::<_, Coupon>(&sql)
            .bind(tenant_id)
            .bind(total.cents())
            .fetch_all(&self.pool)
            .await?;

        debug!(count = coupons.len(), total = %total, "Applicable coupons");
        Ok(coupons)
    }

    /// Switches a coupon on or off.
    pub async fn set_active(&self, tenant_id: &str, id: &str, active: bool) -> DbResult<()> {
        let result = sqlx::query("UPDATE coupons SET active = ?3 WHERE tenant_id = ?1 AND id = ?2")
            .bind(tenant_id)
            .bind(id)
            .bind(active)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("Coupon", id));
        }
        debug!(id = %id, active, "Coupon toggled");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Database, DbConfig};
    use chrono::Utc;

    fn coupon(id: &str, code: &str, min: i64, max: i64) -> Coupon {
        Coupon {
            id: id.to_string(),
            tenant_id: "t-1".to_string(),
            code: code.to_string(),
            discount_bps: 1000,
            min_price_cents: min,
            max_price_cents: max,
            active: true,
            created_at: Utc::now(),
        }
    }

    #[tokio::test]
    async fn test_applicable_window() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        db.coupons().insert(&coupon("c-1", "SMALL", 0, 10000)).await.unwrap();
        db.coupons().insert(&coupon("c-2", "BIG", 20000, 100000)).await.unwrap();

        let small = db
            .coupons()
            .list_applicable("t-1", Money::from_cents(5000))
            .await
            .unwrap();
        assert_eq!(small.len(), 1);
        assert_eq!(small[0].code, "SMALL");

        db.coupons().set_active("t-1", "c-2", false).await.unwrap();
        let big = db
            .coupons()
            .list_applicable("t-1", Money::from_cents(20000))
            .await
            .unwrap();
        assert!(big.is_empty());
    }

    #[tokio::test]
    async fn test_duplicate_code() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        db.coupons().insert(&coupon("c-1", "SAVE", 0, 100)).await.unwrap();
        let result = db.coupons().insert(&coupon("c-2", "SAVE", 0, 100)).await;
        assert!(matches!(result, Err(DbError::UniqueViolation { .. })));
    }
}
