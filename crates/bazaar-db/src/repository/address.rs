//! # Address Repository
//!
//! Saved delivery addresses. A user only ever sees their own.

use sqlx::SqlitePool;
use tracing::debug;

use crate::error::{DbError, DbResult};
use bazaar_core::Address;

const ADDRESS_COLUMNS: &str = "id, tenant_id, user_id, label, line, latitude, longitude, created_at";

/// Repository for address database operations.
#[derive(Debug, Clone)]
pub struct AddressRepository {
    pool: SqlitePool,
}

impl AddressRepository {
    /// Creates a new AddressRepository.
    pub fn new(pool: SqlitePool) -> Self {
        AddressRepository { pool }
    }

    pub async fn insert(&self, address: &Address) -> DbResult<Address> {
        debug!(user_id = %address.user_id, "Inserting address");

        sqlx::query(
            r#"
            INSERT INTO addresses (id, tenant_id, user_id, label, line, latitude, longitude, created_at)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
            "#,
        )
        .bind(&address.id)
        .bind(&address.tenant_id)
        .bind(&address.user_id)
        .bind(&address.label)
        .bind(&address.line)
        .bind(address.latitude)
        .bind(address.longitude)
        .bind(address.created_at)
        .execute(&self.pool)
        .await?;

        Ok(address.clone())
    }

    pub async fn get(&self, tenant_id: &str, user_id: &str, id: &str) -> DbResult<Option<Address>> {
        let sql = format!(
            "SELECT {ADDRESS_COLUMNS} FROM addresses WHERE tenant_id = ?1 AND user_id = ?2 AND id = ?3"
        );
        let address = sqlx::query_as::<_, Address>(&sql)
            .bind(tenant_id)
            .bind(user_id)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(address)
    }

    pub async fn list(&self, tenant_id: &str, user_id: &str) -> DbResult<Vec<Address>> {
        let sql = format!(
            "SELECT {ADDRESS_COLUMNS} FROM addresses WHERE tenant_id = ?1 AND user_id = ?2 ORDER BY created_at"
        );
        let addresses = sqlx::query_as::<_, Address>(&sql)
            .bind(tenant_id)
            .bind(user_id)
            .fetch_all(&self.pool)
            .await?;

        Ok(addresses)
    }

    pub async fn delete(&self, tenant_id: &str, user_id: &str, id: &str) -> DbResult<()> {
        let result =
            sqlx::query("DELETE FROM addresses WHERE tenant_id = ?1 AND user_id = ?2 AND id = ?3")
                .bind(tenant_id)
                .bind(user_id)
                .bind(id)
                .execute(&self.pool)
                .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("Address", id));
        }
        Ok(())
    }
}
