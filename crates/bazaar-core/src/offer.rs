//! # Offers
//!
//! An offer is one of four mutually exclusive forms, selected by a `type`
//! tag in its JSON document.
//!
//! ```text
//! ┌───────────┬───────────────────────────────────────┬──────────┐
//! │  type     │  payload                              │  slot    │
//! ├───────────┼───────────────────────────────────────┼──────────┤
//! │  flat     │  percentageBps (store-wide)           │  -       │
//! │  negotiate│  successBps, failureBps, maxAttempts, │ negotiate│
//! │           │  items[{productId, floorPriceCents}]  │          │
//! │  discount │  items[{productId, discountBps}]      │  catalog │
//! │  mrp      │  items[{productId, mrpReductionCents}]│  catalog │
//! └───────────┴───────────────────────────────────────┴──────────┘
//! ```
//!
//! A product may sit in at most one offer per slot. The database enforces
//! this with a unique index; this module only keeps each document
//! internally consistent.

use std::collections::HashSet;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::error::{CoreError, CoreResult, ValidationError};
use crate::money::Money;
use crate::validation::{validate_bps, validate_id, validate_price_cents, ValidationResult};

// =============================================================================
// Kinds and Slots
// =============================================================================

/// The variant of an offer, without its payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "lowercase"))]
#[serde(rename_all = "lowercase")]
#[ts(export)]
pub enum OfferKind {
    Flat,
    Negotiate,
    Discount,
    Mrp,
}

impl OfferKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            OfferKind::Flat => "flat",
            OfferKind::Negotiate => "negotiate",
            OfferKind::Discount => "discount",
            OfferKind::Mrp => "mrp",
        }
    }

    /// The exclusivity slot products of this kind occupy.
    pub fn slot(&self) -> Option<OfferSlot> {
        match self {
            OfferKind::Flat => None,
            OfferKind::Negotiate => Some(OfferSlot::Negotiate),
            OfferKind::Discount | OfferKind::Mrp => Some(OfferSlot::Catalog),
        }
    }
}

impl std::str::FromStr for OfferKind {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "flat" => Ok(OfferKind::Flat),
            "negotiate" => Ok(OfferKind::Negotiate),
            "discount" => Ok(OfferKind::Discount),
            "mrp" => Ok(OfferKind::Mrp),
            other => Err(ValidationError::InvalidFormat {
                field: "type".to_string(),
                reason: format!("unknown offer type '{other}'"),
            }),
        }
    }
}

/// Exclusivity group. Discount and MRP share the catalog slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "lowercase"))]
#[serde(rename_all = "lowercase")]
pub enum OfferSlot {
    Catalog,
    Negotiate,
}

impl OfferSlot {
    pub fn as_str(&self) -> &'static str {
        match self {
            OfferSlot::Catalog => "catalog",
            OfferSlot::Negotiate => "negotiate",
        }
    }
}

// =============================================================================
// Payloads
// =============================================================================

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct FlatTerms {
    pub percentage_bps: u32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct NegotiateItem {
    pub product_id: String,
    pub floor_price_cents: i64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct NegotiateTerms {
    /// Reduction applied to the reference price when the offer is at or
    /// above the floor.
    pub success_bps: u32,
    /// Reduction applied when the offer is below the floor.
    pub failure_bps: u32,
    /// Falls back to the configured default when absent.
    #[serde(default)]
    pub max_attempts: Option<u32>,
    #[serde(default)]
    pub items: Vec<NegotiateItem>,
}

impl NegotiateTerms {
    /// Floor price of `product_id`, if it is listed.
    pub fn floor_price(&self, product_id: &str) -> Option<Money> {
        self.items
            .iter()
            .find(|i| i.product_id == product_id)
            .map(|i| Money::from_cents(i.floor_price_cents))
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct DiscountItem {
    pub product_id: String,
    pub discount_bps: u32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct DiscountTerms {
    #[serde(default)]
    pub items: Vec<DiscountItem>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct MrpItem {
    pub product_id: String,
    pub mrp_reduction_cents: i64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct MrpTerms {
    #[serde(default)]
    pub items: Vec<MrpItem>,
}

/// The offer document, tagged by `type`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[serde(tag = "type", rename_all = "lowercase")]
#[ts(export)]
pub enum OfferTerms {
    Flat(FlatTerms),
    Negotiate(NegotiateTerms),
    Discount(DiscountTerms),
    Mrp(MrpTerms),
}

/// A single product entry for add/update item operations.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[serde(tag = "type", rename_all = "lowercase")]
#[ts(export)]
pub enum OfferItem {
    Negotiate(NegotiateItem),
    Discount(DiscountItem),
    Mrp(MrpItem),
}

impl OfferItem {
    pub fn product_id(&self) -> &str {
        match self {
            OfferItem::Negotiate(item) => &item.product_id,
            OfferItem::Discount(item) => &item.product_id,
            OfferItem::Mrp(item) => &item.product_id,
        }
    }

    pub fn kind(&self) -> OfferKind {
        match self {
            OfferItem::Negotiate(_) => OfferKind::Negotiate,
            OfferItem::Discount(_) => OfferKind::Discount,
            OfferItem::Mrp(_) => OfferKind::Mrp,
        }
    }
}

// Upserts `item` into `items`, keyed by product id.
fn put_item<T: Clone>(
    items: &mut Vec<T>,
    item: T,
    key: impl Fn(&T) -> &str,
    must_exist: bool,
) -> CoreResult<()> {
    let product_id = key(&item).to_string();
    match items.iter_mut().find(|i| key(i) == product_id) {
        Some(existing) if must_exist => {
            *existing = item;
            Ok(())
        }
        Some(_) => Err(CoreError::OfferItemExists(product_id)),
        None if must_exist => Err(CoreError::OfferItemNotFound(product_id)),
        None => {
            items.push(item);
            Ok(())
        }
    }
}

impl OfferTerms {
    pub fn kind(&self) -> OfferKind {
        match self {
            OfferTerms::Flat(_) => OfferKind::Flat,
            OfferTerms::Negotiate(_) => OfferKind::Negotiate,
            OfferTerms::Discount(_) => OfferKind::Discount,
            OfferTerms::Mrp(_) => OfferKind::Mrp,
        }
    }

    pub fn slot(&self) -> Option<OfferSlot> {
        self.kind().slot()
    }

    /// Products referenced by this offer, in document order.
    pub fn product_ids(&self) -> Vec<&str> {
        match self {
            OfferTerms::Flat(_) => Vec::new(),
            OfferTerms::Negotiate(t) => t.items.iter().map(|i| i.product_id.as_str()).collect(),
            OfferTerms::Discount(t) => t.items.iter().map(|i| i.product_id.as_str()).collect(),
            OfferTerms::Mrp(t) => t.items.iter().map(|i| i.product_id.as_str()).collect(),
        }
    }

    /// Checks ranges and internal consistency.
    pub fn validate(&self) -> ValidationResult<()> {
        match self {
            OfferTerms::Flat(t) => validate_bps("percentageBps", t.percentage_bps)?,
            OfferTerms::Negotiate(t) => {
                validate_bps("successBps", t.success_bps)?;
                validate_bps("failureBps", t.failure_bps)?;
                if t.failure_bps > t.success_bps {
                    return Err(ValidationError::MustNotExceed {
                        field: "failureBps".to_string(),
                        other: "successBps".to_string(),
                    });
                }
                if t.max_attempts == Some(0) {
                    return Err(ValidationError::MustBePositive {
                        field: "maxAttempts".to_string(),
                    });
                }
                for item in &t.items {
                    validate_price_cents("floorPriceCents", item.floor_price_cents)?;
                }
            }
            OfferTerms::Discount(t) => {
                for item in &t.items {
                    validate_bps("discountBps", item.discount_bps)?;
                }
            }
            OfferTerms::Mrp(t) => {
                for item in &t.items {
                    validate_price_cents("mrpReductionCents", item.mrp_reduction_cents)?;
                }
            }
        }

        let mut seen = HashSet::new();
        for product_id in self.product_ids() {
            validate_id("productId", product_id)?;
            if !seen.insert(product_id) {
                return Err(ValidationError::Duplicate {
                    field: "productId".to_string(),
                    value: product_id.to_string(),
                });
            }
        }

        Ok(())
    }

    fn put(&mut self, item: OfferItem, must_exist: bool) -> CoreResult<()> {
        match (self, item) {
            (OfferTerms::Negotiate(t), OfferItem::Negotiate(item)) => {
                validate_price_cents("floorPriceCents", item.floor_price_cents)?;
                put_item(&mut t.items, item, |i| i.product_id.as_str(), must_exist)
            }
            (OfferTerms::Discount(t), OfferItem::Discount(item)) => {
                validate_bps("discountBps", item.discount_bps)?;
                put_item(&mut t.items, item, |i| i.product_id.as_str(), must_exist)
            }
            (OfferTerms::Mrp(t), OfferItem::Mrp(item)) => {
                validate_price_cents("mrpReductionCents", item.mrp_reduction_cents)?;
                put_item(&mut t.items, item, |i| i.product_id.as_str(), must_exist)
            }
            (OfferTerms::Flat(_), _) => Err(CoreError::OfferHasNoItems("flat".to_string())),
            (terms, item) => Err(CoreError::OfferKindMismatch {
                offer_id: String::new(),
                stored: terms.kind().as_str().to_string(),
                requested: item.kind().as_str().to_string(),
            }),
        }
    }

    /// Adds a product; fails if it is already listed.
    pub fn add_item(&mut self, item: OfferItem) -> CoreResult<()> {
        self.put(item, false)
    }

    /// Replaces the values of products already listed.
    ///
    /// Applies every item or none.
    pub fn update_items(&mut self, items: Vec<OfferItem>) -> CoreResult<()> {
        let mut next = self.clone();
        for item in items {
            next.put(item, true)?;
        }
        *self = next;
        Ok(())
    }

    /// Removes a product from the offer.
    pub fn remove_item(&mut self, product_id: &str) -> CoreResult<()> {
        let removed = match self {
            OfferTerms::Flat(_) => return Err(CoreError::OfferHasNoItems("flat".to_string())),
            OfferTerms::Negotiate(t) => {
                let before = t.items.len();
                t.items.retain(|i| i.product_id != product_id);
                before != t.items.len()
            }
            OfferTerms::Discount(t) => {
                let before = t.items.len();
                t.items.retain(|i| i.product_id != product_id);
                before != t.items.len()
            }
            OfferTerms::Mrp(t) => {
                let before = t.items.len();
                t.items.retain(|i| i.product_id != product_id);
                before != t.items.len()
            }
        };

        if removed {
            Ok(())
        } else {
            Err(CoreError::OfferItemNotFound(product_id.to_string()))
        }
    }

    /// Floor price of `product_id` in a negotiate offer.
    pub fn floor_price(&self, product_id: &str) -> Option<Money> {
        match self {
            OfferTerms::Negotiate(t) => t.floor_price(product_id),
            _ => None,
        }
    }
}

// =============================================================================
// Offer
// =============================================================================

/// A stored offer.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct Offer {
    pub id: String,
    pub tenant_id: String,
    pub is_active: bool,
    pub terms: OfferTerms,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
    #[ts(as = "String")]
    pub updated_at: DateTime<Utc>,
}

impl Offer {
    pub fn kind(&self) -> OfferKind {
        self.terms.kind()
    }

    /// Replaces the terms, keeping the variant.
    pub fn replace_terms(&mut self, terms: OfferTerms) -> CoreResult<()> {
        if terms.kind() != self.kind() {
            return Err(CoreError::OfferKindMismatch {
                offer_id: self.id.clone(),
                stored: self.kind().as_str().to_string(),
                requested: terms.kind().as_str().to_string(),
            });
        }
        terms.validate()?;
        self.terms = terms;
        Ok(())
    }

    /// Adds an item, naming this offer in any kind mismatch.
    pub fn add_item(&mut self, item: OfferItem) -> CoreResult<()> {
        self.terms.add_item(item).map_err(|e| self.with_id(e))
    }

    pub fn update_items(&mut self, items: Vec<OfferItem>) -> CoreResult<()> {
        self.terms.update_items(items).map_err(|e| self.with_id(e))
    }

    pub fn remove_item(&mut self, product_id: &str) -> CoreResult<()> {
        self.terms.remove_item(product_id)
    }

    fn with_id(&self, err: CoreError) -> CoreError {
        match err {
            CoreError::OfferKindMismatch {
                stored, requested, ..
            } => CoreError::OfferKindMismatch {
                offer_id: self.id.clone(),
                stored,
                requested,
            },
            other => other,
        }
    }

    /// The catalog discount this offer grants `product_id`, if any.
    pub fn catalog_discount(&self, product_id: &str, list_price: Money) -> Option<CatalogDiscount> {
        if !self.is_active {
            return None;
        }

        match &self.terms {
            OfferTerms::Discount(t) => t.items.iter().find(|i| i.product_id == product_id).map(|i| {
                CatalogDiscount {
                    offer_id: self.id.clone(),
                    kind: OfferKind::Discount,
                    discount_bps: Some(i.discount_bps),
                    mrp_reduction_cents: None,
                    discounted_price_cents: list_price
                        .apply_percentage_discount(i.discount_bps)
                        .non_negative()
                        .cents(),
                }
            }),
            OfferTerms::Mrp(t) => t.items.iter().find(|i| i.product_id == product_id).map(|i| {
                CatalogDiscount {
                    offer_id: self.id.clone(),
                    kind: OfferKind::Mrp,
                    discount_bps: None,
                    mrp_reduction_cents: Some(i.mrp_reduction_cents),
                    discounted_price_cents: (list_price
                        - Money::from_cents(i.mrp_reduction_cents))
                    .non_negative()
                    .cents(),
                }
            }),
            _ => None,
        }
    }
}

/// Read-time view of a product's catalog offer, for display.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct CatalogDiscount {
    pub offer_id: String,
    pub kind: OfferKind,
    pub discount_bps: Option<u32>,
    pub mrp_reduction_cents: Option<i64>,
    pub discounted_price_cents: i64,
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn negotiate() -> OfferTerms {
        OfferTerms::Negotiate(NegotiateTerms {
            success_bps: 1000,
            failure_bps: 500,
            max_attempts: Some(3),
            items: vec![NegotiateItem {
                product_id: "p-1".to_string(),
                floor_price_cents: 8000,
            }],
        })
    }

    fn offer(terms: OfferTerms) -> Offer {
        let now = Utc::now();
        Offer {
            id: "o-1".to_string(),
            tenant_id: "t-1".to_string(),
            is_active: true,
            terms,
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn test_terms_tagged_json() {
        let json = r#"{"type":"discount","items":[{"productId":"p-1","discountBps":1500}]}"#;
        let terms: OfferTerms = serde_json::from_str(json).unwrap();
        assert_eq!(terms.kind(), OfferKind::Discount);
        assert_eq!(terms.product_ids(), vec!["p-1"]);

        let flat = serde_json::to_value(OfferTerms::Flat(FlatTerms {
            percentage_bps: 500,
        }))
        .unwrap();
        assert_eq!(flat["type"], "flat");
        assert_eq!(flat["percentageBps"], 500);
    }

    #[test]
    fn test_unknown_type_rejected() {
        let result: Result<OfferTerms, _> = serde_json::from_str(r#"{"type":"bogus"}"#);
        assert!(result.is_err());
    }

    #[test]
    fn test_slots() {
        assert_eq!(OfferKind::Discount.slot(), Some(OfferSlot::Catalog));
        assert_eq!(OfferKind::Mrp.slot(), Some(OfferSlot::Catalog));
        assert_eq!(OfferKind::Negotiate.slot(), Some(OfferSlot::Negotiate));
        assert_eq!(OfferKind::Flat.slot(), None);
    }

    #[test]
    fn test_validate_failure_not_above_success() {
        assert!(negotiate().validate().is_ok());

        let bad = OfferTerms::Negotiate(NegotiateTerms {
            success_bps: 500,
            failure_bps: 1000,
            max_attempts: None,
            items: Vec::new(),
        });
        assert!(matches!(
            bad.validate(),
            Err(ValidationError::MustNotExceed { .. })
        ));
    }

    #[test]
    fn test_validate_duplicate_products() {
        let terms = OfferTerms::Discount(DiscountTerms {
            items: vec![
                DiscountItem {
                    product_id: "p-1".to_string(),
                    discount_bps: 100,
                },
                DiscountItem {
                    product_id: "p-1".to_string(),
                    discount_bps: 200,
                },
            ],
        });
        assert!(matches!(
            terms.validate(),
            Err(ValidationError::Duplicate { .. })
        ));
    }

    #[test]
    fn test_add_update_remove_items() {
        let mut o = offer(negotiate());

        let item = OfferItem::Negotiate(NegotiateItem {
            product_id: "p-2".to_string(),
            floor_price_cents: 4000,
        });
        o.add_item(item.clone()).unwrap();
        assert!(matches!(o.add_item(item), Err(CoreError::OfferItemExists(_))));

        o.update_items(vec![OfferItem::Negotiate(NegotiateItem {
            product_id: "p-2".to_string(),
            floor_price_cents: 4500,
        })])
        .unwrap();
        assert_eq!(o.terms.floor_price("p-2"), Some(Money::from_cents(4500)));

        let missing = o.update_items(vec![OfferItem::Negotiate(NegotiateItem {
            product_id: "p-9".to_string(),
            floor_price_cents: 1,
        })]);
        assert!(matches!(missing, Err(CoreError::OfferItemNotFound(_))));

        o.remove_item("p-2").unwrap();
        assert!(o.remove_item("p-2").is_err());
    }

    #[test]
    fn test_item_kind_mismatch_names_offer() {
        let mut o = offer(negotiate());
        let err = o
            .add_item(OfferItem::Mrp(MrpItem {
                product_id: "p-3".to_string(),
                mrp_reduction_cents: 100,
            }))
            .unwrap_err();
        match err {
            CoreError::OfferKindMismatch { offer_id, .. } => assert_eq!(offer_id, "o-1"),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_replace_terms_requires_same_kind() {
        let mut o = offer(negotiate());
        let result = o.replace_terms(OfferTerms::Flat(FlatTerms {
            percentage_bps: 100,
        }));
        assert!(matches!(result, Err(CoreError::OfferKindMismatch { .. })));
    }

    #[test]
    fn test_catalog_discount() {
        let o = offer(OfferTerms::Mrp(MrpTerms {
            items: vec![MrpItem {
                product_id: "p-1".to_string(),
                mrp_reduction_cents: 2500,
            }],
        }));
        let view = o.catalog_discount("p-1", Money::from_cents(10000)).unwrap();
        assert_eq!(view.discounted_price_cents, 7500);
        assert!(o.catalog_discount("p-2", Money::from_cents(10000)).is_none());

        let d = offer(OfferTerms::Discount(DiscountTerms {
            items: vec![DiscountItem {
                product_id: "p-1".to_string(),
                discount_bps: 1000,
            }],
        }));
        let view = d.catalog_discount("p-1", Money::from_cents(10000)).unwrap();
        assert_eq!(view.discounted_price_cents, 9000);
    }
}
