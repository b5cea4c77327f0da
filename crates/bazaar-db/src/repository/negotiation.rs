//! # Negotiation Repository
//!
//! Stores negotiation attempts and resolves the price overrides they
//! produce.
//!
//! ## Override Resolution
//! ```text
//! negotiation_attempts (latest attempt per user+product+offer)
//!        │  JOIN offer_products (slot = 'negotiate', same offer)
//!        │  JOIN offers (is_active = 1)
//!        ▼
//! { product_id → resulting_price }   fed to the pricing engine
//! ```
//! Deactivating the offer, or removing the product from it, drops the
//! override without touching the attempt history. Attempts belong to the
//! offer they were made under: a new negotiate offer starts a fresh
//! attempt count.

use std::collections::HashMap;

use sqlx::SqlitePool;
use tracing::debug;

use crate::error::{DbError, DbResult};
use bazaar_core::{Money, NegotiationAttempt};

/// Repository for negotiation attempts.
#[derive(Debug, Clone)]
pub struct NegotiationRepository {
    pool: SqlitePool,
}

impl NegotiationRepository {
    /// Creates a new NegotiationRepository.
    pub fn new(pool: SqlitePool) -> Self {
        NegotiationRepository { pool }
    }

    /// A user's attempts on one product under `offer_id`, oldest first.
    pub async fn list_for(
        &self,
        tenant_id: &str,
        user_id: &str,
        product_id: &str,
        offer_id: &str,
    ) -> DbResult<Vec<NegotiationAttempt>> {
        let attempts = sqlx::query_as::<_, NegotiationAttempt>(
            r#"
            SELECT id, tenant_id, user_id, product_id, offer_id, attempt_no,
                   proposed_cents, resulting_price_cents, outcome, created_at
            FROM negotiation_attempts
            WHERE tenant_id = ?1 AND user_id = ?2 AND product_id = ?3 AND offer_id = ?4
            ORDER BY attempt_no
            "#,
        )
        .bind(tenant_id)
        .bind(user_id)
        .bind(product_id)
        .bind(offer_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(attempts)
    }

    /// Records an attempt.
    ///
    /// ## Returns
    /// * `Err(DbError::UniqueViolation)` - a concurrent request already
    ///   recorded this attempt number
    pub async fn record(&self, attempt: &NegotiationAttempt) -> DbResult<NegotiationAttempt> {
        debug!(
            product_id = %attempt.product_id,
            attempt_no = attempt.attempt_no,
            outcome = ?attempt.outcome,
            "Recording negotiation attempt"
        );

        sqlx::query(
            r#"
            INSERT INTO negotiation_attempts (
                id, tenant_id, user_id, product_id, offer_id, attempt_no,
                proposed_cents, resulting_price_cents, outcome, created_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)
            "#,
        )
        .bind(&attempt.id)
        .bind(&attempt.tenant_id)
        .bind(&attempt.user_id)
        .bind(&attempt.product_id)
        .bind(&attempt.offer_id)
        .bind(attempt.attempt_no)
        .bind(attempt.proposed_cents)
        .bind(attempt.resulting_price_cents)
        .bind(attempt.outcome)
        .bind(attempt.created_at)
        .execute(&self.pool)
        .await
        .map_err(|e| match DbError::from(e) {
            DbError::UniqueViolation { .. } => {
                DbError::duplicate("negotiation attempt", attempt.attempt_no.to_string())
            }
            other => other,
        })?;

        Ok(attempt.clone())
    }

    /// Latest negotiated price per product for a user, limited to products
    /// still held by an active negotiate offer.
    pub async fn active_overrides(
        &self,
        tenant_id: &str,
        user_id: &str,
    ) -> DbResult<HashMap<String, Money>> {
        let rows: Vec<(String, i64)> = sqlx::query_as(
            r#"
            SELECT a.product_id, a.resulting_price_cents
            FROM negotiation_attempts a
            INNER JOIN offer_products op
                ON op.tenant_id = a.tenant_id
               AND op.product_id = a.product_id
               AND op.slot = 'negotiate'
               AND op.offer_id = a.offer_id
            INNER JOIN offers o ON o.id = op.offer_id AND o.is_active = 1
            WHERE a.tenant_id = ?1 AND a.user_id = ?2
              AND a.attempt_no = (
                  SELECT MAX(b.attempt_no) FROM negotiation_attempts b
                  WHERE b.tenant_id = a.tenant_id
                    AND b.user_id = a.user_id
                    AND b.product_id = a.product_id
                    AND b.offer_id = a.offer_id
              )
            "#,
        )
        .bind(tenant_id)
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows
            .into_iter()
            .map(|(product_id, cents)| (product_id, Money::from_cents(cents)))
            .collect())
    }
}
