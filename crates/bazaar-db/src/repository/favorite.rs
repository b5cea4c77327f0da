//! # Favorite Repository
//!
//! A user's saved products. Adding twice is a no-op; deleted products
//! drop out of the list but keep their row.

use chrono::Utc;
use sqlx::SqlitePool;
use tracing::debug;

use crate::error::DbResult;
use crate::repository::product::PRODUCT_COLUMNS;
use bazaar_core::Product;

/// Repository for favorites.
#[derive(Debug, Clone)]
pub struct FavoriteRepository {
    pool: SqlitePool,
}

impl FavoriteRepository {
    /// Creates a new FavoriteRepository.
    pub fn new(pool: SqlitePool) -> Self {
        FavoriteRepository { pool }
    }

    /// Saves `product_id` for the user. Returns `false` if it was already saved.
    pub async fn add(&self, tenant_id: &str, user_id: &str, product_id: &str) -> DbResult<bool> {
        let result = sqlx::query(
            r#"
            INSERT INTO favorites (tenant_id, user_id, product_id, created_at)
            VALUES (?1, ?2, ?3, ?4)
            ON CONFLICT (tenant_id, user_id, product_id) DO NOTHING
            "#,
        )
        .bind(tenant_id)
        .bind(user_id)
        .bind(product_id)
        .bind(Utc::now())
        .execute(&self.pool)
        .await?;

        let added = result.rows_affected() > 0;
        debug!(product_id = %product_id, added, "Favorite saved");
        Ok(added)
    }

    /// Removes a favorite. Returns `false` if it was not saved.
    pub async fn remove(&self, tenant_id: &str, user_id: &str, product_id: &str) -> DbResult<bool> {
        let result = sqlx::query(
            "DELETE FROM favorites WHERE tenant_id = ?1 AND user_id = ?2 AND product_id = ?3",
        )
        .bind(tenant_id)
        .bind(user_id)
        .bind(product_id)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() > 0)
    }

    /// The user's favorite products that still exist, sorted by name.
    pub async fn list_products(&self, tenant_id: &str, user_id: &str) -> DbResult<Vec<Product>> {
        let sql = format!(
            r#"
            SELECT {PRODUCT_COLUMNS} FROM products
            WHERE tenant_id = ?1 AND is_deleted = 0
              AND id IN (SELECT product_id FROM favorites WHERE tenant_id = ?1 AND user_id = ?2)
            ORDER BY name
            "#
        );
        let products = sqlx::query_as::<_, Product>(&sql)
            .bind(tenant_id)
            .bind(user_id)
            .fetch_all(&self.pool)
            .await?;

        Ok(products)
    }
}

#[cfg(test)]
mod tests {
    use crate::repository::product::tests::sample_product;
    use crate::{Database, DbConfig};

    #[tokio::test]
    async fn test_add_is_idempotent_and_remove_reports_missing() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let product = sample_product("t-1", "FAV-1", 5000);
        db.products().insert(&product).await.unwrap();

        assert!(db.favorites().add("t-1", "u-1", &product.id).await.unwrap());
        assert!(!db.favorites().add("t-1", "u-1", &product.id).await.unwrap());

        let listed = db.favorites().list_products("t-1", "u-1").await.unwrap();
        assert_eq!(listed.len(), 1);
        assert_eq!(listed[0].id, product.id);

        // scoped to the user
        assert!(db.favorites().list_products("t-1", "u-2").await.unwrap().is_empty());

        assert!(db.favorites().remove("t-1", "u-1", &product.id).await.unwrap());
        assert!(!db.favorites().remove("t-1", "u-1", &product.id).await.unwrap());
        assert!(db.favorites().list_products("t-1", "u-1").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_deleted_products_drop_out() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let product = sample_product("t-1", "FAV-2", 5000);
        db.products().insert(&product).await.unwrap();
        db.favorites().add("t-1", "u-1", &product.id).await.unwrap();

        db.products().soft_delete("t-1", &product.id).await.unwrap();

        assert!(db.favorites().list_products("t-1", "u-1").await.unwrap().is_empty());
    }
}
