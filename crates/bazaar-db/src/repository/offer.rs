//! # Offer Repository
//!
//! Offer documents plus the `offer_products` membership index.
//!
//! ## Exclusivity
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    SINGLE TRANSACTION                                   │
//! │                                                                         │
//! │  1. INSERT / UPDATE offers (terms_json = tagged document)              │
//! │  2. DELETE FROM offer_products WHERE offer_id = ?                      │
//! │  3. INSERT INTO offer_products (tenant, product, slot, offer)          │
//! │        PRIMARY KEY (tenant_id, product_id, slot)                       │
//! │        └── second catalog/negotiate offer for a product → 409          │
//! │                                                                         │
//! │  COMMIT ← document and index never disagree                            │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Flat offers occupy no slot and write no index rows.

use chrono::{DateTime, Utc};
use sqlx::{SqliteConnection, SqlitePool};
use tracing::debug;

use crate::error::{DbError, DbResult};
use bazaar_core::{Offer, OfferKind, OfferSlot, OfferTerms};

const OFFER_COLUMNS: &str = "o.id, o.tenant_id, o.kind, o.is_active, o.terms_json, o.created_at, o.updated_at";

#[derive(Debug, sqlx::FromRow)]
struct OfferRow {
    id: String,
    tenant_id: String,
    kind: OfferKind,
    is_active: bool,
    terms_json: String,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl TryFrom<OfferRow> for Offer {
    type Error = DbError;

    fn try_from(row: OfferRow) -> DbResult<Self> {
        let terms: OfferTerms = serde_json::from_str(&row.terms_json)?;
        if terms.kind() != row.kind {
            return Err(DbError::Serialization(format!(
                "offer {} is stored as {} but its document is {}",
                row.id,
                row.kind.as_str(),
                terms.kind().as_str()
            )));
        }

        Ok(Offer {
            id: row.id,
            tenant_id: row.tenant_id,
            is_active: row.is_active,
            terms,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

// Rewrites the index rows of `offer` inside the caller's transaction.
async fn write_membership(conn: &mut SqliteConnection, offer: &Offer) -> DbResult<()> {
    sqlx::query("DELETE FROM offer_products WHERE offer_id = ?1")
        .bind(&offer.id)
        .execute(&mut *conn)
        .await?;

    let Some(slot) = offer.terms.slot() else {
        return Ok(());
    };

    for product_id in offer.terms.product_ids() {
        let holder: Option<String> = sqlx::query_scalar(
            "SELECT offer_id FROM offer_products WHERE tenant_id = ?1 AND product_id = ?2 AND slot = ?3",
        )
        .bind(&offer.tenant_id)
        .bind(product_id)
        .bind(slot)
        .fetch_optional(&mut *conn)
        .await?;

        if let Some(other) = holder {
            debug!(product_id = %product_id, offer_id = %other, slot = slot.as_str(), "Product already in an offer");
            return Err(DbError::duplicate(
                format!("{} offer for product", slot.as_str()),
                product_id,
            ));
        }

        // The primary key still guards against a concurrent writer.
        sqlx::query(
            "INSERT INTO offer_products (tenant_id, product_id, slot, offer_id) VALUES (?1, ?2, ?3, ?4)",
        )
        .bind(&offer.tenant_id)
        .bind(product_id)
        .bind(slot)
        .bind(&offer.id)
        .execute(&mut *conn)
        .await?;
    }

    Ok(())
}

/// Repository for offer database operations.
#[derive(Debug, Clone)]
pub struct OfferRepository {
    pool: SqlitePool,
}

impl OfferRepository {
    /// Creates a new OfferRepository.
    pub fn new(pool: SqlitePool) -> Self {
        OfferRepository { pool }
    }

    /// Inserts an offer and its membership rows.
    ///
    /// ## Returns
    /// * `Err(DbError::UniqueViolation)` - a listed product already belongs
    ///   to another offer in the same slot
    pub async fn insert(&self, offer: &Offer) -> DbResult<Offer> {
        debug!(offer_id = %offer.id, kind = offer.kind().as_str(), "Inserting offer");

        let mut tx = self.pool.begin().await?;

        sqlx::query(
            r#"
            INSERT INTO offers (id, tenant_id, kind, is_active, terms_json, created_at, updated_at)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
            "#,
        )
        .bind(&offer.id)
        .bind(&offer.tenant_id)
        .bind(offer.kind())
        .bind(offer.is_active)
        .bind(serde_json::to_string(&offer.terms)?)
        .bind(offer.created_at)
        .bind(offer.updated_at)
        .execute(&mut *tx)
        .await?;

        write_membership(&mut tx, offer).await?;
        tx.commit().await?;

        Ok(offer.clone())
    }

    /// Replaces a stored offer's document, flag and membership rows.
    pub async fn update(&self, offer: &Offer) -> DbResult<Offer> {
        debug!(offer_id = %offer.id, "Updating offer");

        let now = Utc::now();
        let mut tx = self.pool.begin().await?;

        let result = sqlx::query(
            r#"
            UPDATE offers SET is_active = ?3, terms_json = ?4, updated_at = ?5
            WHERE tenant_id = ?1 AND id = ?2 AND kind = ?6
            "#,
        )
        .bind(&offer.tenant_id)
        .bind(&offer.id)
        .bind(offer.is_active)
        .bind(serde_json::to_string(&offer.terms)?)
        .bind(now)
        .bind(offer.kind())
        .execute(&mut *tx)
        .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("Offer", &offer.id));
        }

        write_membership(&mut tx, offer).await?;
        tx.commit().await?;

        let mut saved = offer.clone();
        saved.updated_at = now;
        Ok(saved)
    }

    pub async fn get(&self, tenant_id: &str, id: &str) -> DbResult<Option<Offer>> {
        let sql = format!("SELECT {OFFER_COLUMNS} FROM offers o WHERE o.tenant_id = ?1 AND o.id = ?2");
        let row = sqlx::query_as::<_, OfferRow>(&sql)
            .bind(tenant_id)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        row.map(Offer::try_from).transpose()
    }

    /// Lists offers, newest first, optionally of one kind only.
    pub async fn list(
        &self,
        tenant_id: &str,
        kind: Option<OfferKind>,
        active_only: bool,
    ) -> DbResult<Vec<Offer>> {
        let sql = format!(
            r#"
            SELECT {OFFER_COLUMNS} FROM offers o
            WHERE o.tenant_id = ?1
              AND (?2 IS NULL OR o.kind = ?2)
              AND (o.is_active = 1 OR NOT ?3)
            ORDER BY o.created_at DESC
            "#
        );
        let rows = sqlx::query_as::<_, OfferRow>(&sql)
            .bind(tenant_id)
            .bind(kind)
            .bind(active_only)
            .fetch_all(&self.pool)
            .await?;

        rows.into_iter().map(Offer::try_from).collect()
    }

    /// The active offer holding `product_id` in `slot`, if any.
    pub async fn active_for_product(
        &self,
        tenant_id: &str,
        product_id: &str,
        slot: OfferSlot,
    ) -> DbResult<Option<Offer>> {
        let sql = format!(
            r#"
            SELECT {OFFER_COLUMNS} FROM offers o
            INNER JOIN offer_products op ON op.offer_id = o.id
            WHERE op.tenant_id = ?1 AND op.product_id = ?2 AND op.slot = ?3
              AND o.is_active = 1
            "#
        );
        let row = sqlx::query_as::<_, OfferRow>(&sql)
            .bind(tenant_id)
            .bind(product_id)
            .bind(slot)
            .fetch_optional(&self.pool)
            .await?;

        row.map(Offer::try_from).transpose()
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Database, DbConfig};
    use bazaar_core::offer::{DiscountItem, DiscountTerms, FlatTerms, MrpItem, MrpTerms, NegotiateItem, NegotiateTerms};

    async fn db() -> Database {
        Database::new(DbConfig::in_memory()).await.unwrap()
    }

    fn offer(id: &str, terms: OfferTerms) -> Offer {
        let now = Utc::now();
        Offer {
            id: id.to_string(),
            tenant_id: "t-1".to_string(),
            is_active: true,
            terms,
            created_at: now,
            updated_at: now,
        }
    }

    fn discount(product_id: &str) -> OfferTerms {
        OfferTerms::Discount(DiscountTerms {
            items: vec![DiscountItem {
                product_id: product_id.to_string(),
                discount_bps: 1000,
            }],
        })
    }

    fn mrp(product_id: &str) -> OfferTerms {
        OfferTerms::Mrp(MrpTerms {
            items: vec![MrpItem {
                product_id: product_id.to_string(),
                mrp_reduction_cents: 500,
            }],
        })
    }

    fn negotiate(product_id: &str) -> OfferTerms {
        OfferTerms::Negotiate(NegotiateTerms {
            success_bps: 1000,
            failure_bps: 500,
            max_attempts: None,
            items: vec![NegotiateItem {
                product_id: product_id.to_string(),
                floor_price_cents: 100,
            }],
        })
    }

    #[tokio::test]
    async fn test_insert_get_roundtrip() {
        let db = db().await;
        db.offers().insert(&offer("o-1", discount("p-1"))).await.unwrap();

        let loaded = db.offers().get("t-1", "o-1").await.unwrap().unwrap();
        assert_eq!(loaded.kind(), OfferKind::Discount);
        assert_eq!(loaded.terms.product_ids(), vec!["p-1"]);
    }

    #[tokio::test]
    async fn test_catalog_slot_is_exclusive() {
        let db = db().await;
        db.offers().insert(&offer("o-1", discount("p-1"))).await.unwrap();

        // discount and mrp share the catalog slot
        let result = db.offers().insert(&offer("o-2", mrp("p-1"))).await;
        assert!(matches!(result, Err(DbError::UniqueViolation { .. })));

        // the failed insert left nothing behind
        assert!(db.offers().get("t-1", "o-2").await.unwrap().is_none());

        // negotiate is a separate slot
        db.offers().insert(&offer("o-3", negotiate("p-1"))).await.unwrap();
        let result = db.offers().insert(&offer("o-4", negotiate("p-1"))).await;
        assert!(matches!(result, Err(DbError::UniqueViolation { .. })));
    }

    #[tokio::test]
    async fn test_update_moves_membership() {
        let db = db().await;
        let mut o = offer("o-1", discount("p-1"));
        db.offers().insert(&o).await.unwrap();

        o.terms = discount("p-2");
        db.offers().update(&o).await.unwrap();

        // p-1 is free again
        db.offers().insert(&offer("o-2", mrp("p-1"))).await.unwrap();

        let holder = db
            .offers()
            .active_for_product("t-1", "p-2", OfferSlot::Catalog)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(holder.id, "o-1");
    }

    #[tokio::test]
    async fn test_inactive_offer_not_resolved() {
        let db = db().await;
        let mut o = offer("o-1", negotiate("p-1"));
        db.offers().insert(&o).await.unwrap();

        o.is_active = false;
        db.offers().update(&o).await.unwrap();

        let holder = db
            .offers()
            .active_for_product("t-1", "p-1", OfferSlot::Negotiate)
            .await
            .unwrap();
        assert!(holder.is_none());
    }

    #[tokio::test]
    async fn test_list_by_kind() {
        let db = db().await;
        db.offers().insert(&offer("o-1", discount("p-1"))).await.unwrap();
        db.offers()
            .insert(&offer(
                "o-2",
                OfferTerms::Flat(FlatTerms {
                    percentage_bps: 500,
                }),
            ))
            .await
            .unwrap();

        let all = db.offers().list("t-1", None, false).await.unwrap();
        assert_eq!(all.len(), 2);

        let flat = db.offers().list("t-1", Some(OfferKind::Flat), false).await.unwrap();
        assert_eq!(flat.len(), 1);
        assert_eq!(flat[0].id, "o-2");
    }
}
