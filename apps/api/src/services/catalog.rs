//! Product reads with their offers resolved at read time.
//!
//! Products carry no discount fields of their own. The active discount or
//! MRP offer holding a product is looked up when the product is read, so
//! switching an offer off is visible immediately.

use serde::Serialize;

use bazaar_core::{CatalogDiscount, Offer, OfferSlot, OfferTerms, Product};

use crate::error::ApiResult;
use crate::AppState;

/// A product as the storefront sees it.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProductView {
    #[serde(flatten)]
    pub product: Product,
    /// Active discount or MRP offer, for display.
    pub offer: Option<CatalogDiscount>,
    /// Whether an active negotiate offer lists the product.
    pub negotiable: bool,
}

impl ProductView {
    /// Builds the view from the tenant's active offers.
    pub fn resolve(product: Product, active_offers: &[Offer]) -> Self {
        let offer = active_offers
            .iter()
            .find_map(|o| o.catalog_discount(&product.id, product.price()));
        let negotiable = active_offers.iter().any(|o| lists_for_negotiation(o, &product.id));

        ProductView {
            product,
            offer,
            negotiable,
        }
    }
}

fn lists_for_negotiation(offer: &Offer, product_id: &str) -> bool {
    offer.is_active
        && matches!(&offer.terms, OfferTerms::Negotiate(t) if t.floor_price(product_id).is_some())
}

/// Sellable products of a tenant with their offers.
pub async fn list_products(state: &AppState, tenant_id: &str) -> ApiResult<Vec<ProductView>> {
    let products = state.db.products().list(tenant_id, false).await?;
    let offers = state.db.offers().list(tenant_id, None, true).await?;

    Ok(products
        .into_iter()
        .map(|p| ProductView::resolve(p, &offers))
        .collect())
}

/// The user's favorite products with their offers.
pub async fn list_favorites(
    state: &AppState,
    tenant_id: &str,
    user_id: &str,
) -> ApiResult<Vec<ProductView>> {
    let products = state.db.favorites().list_products(tenant_id, user_id).await?;
    if products.is_empty() {
        return Ok(Vec::new());
    }
    let offers = state.db.offers().list(tenant_id, None, true).await?;

    Ok(products
        .into_iter()
        .map(|p| ProductView::resolve(p, &offers))
        .collect())
}

/// One product with its offers, `None` if missing or deleted.
pub async fn get_product(
    state: &AppState,
    tenant_id: &str,
    product_id: &str,
) -> ApiResult<Option<ProductView>> {
    let Some(product) = state.db.products().get(tenant_id, product_id).await? else {
        return Ok(None);
    };

    let offers = state.db.offers();
    let mut held = Vec::with_capacity(2);
    for slot in [OfferSlot::Catalog, OfferSlot::Negotiate] {
        if let Some(offer) = offers.active_for_product(tenant_id, product_id, slot).await? {
            held.push(offer);
        }
    }

    Ok(Some(ProductView::resolve(product, &held)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use bazaar_core::offer::{DiscountItem, DiscountTerms, NegotiateItem, NegotiateTerms};
    use bazaar_core::OfferKind;
    use chrono::Utc;

    fn product(id: &str, price: i64) -> Product {
        let now = Utc::now();
        Product {
            id: id.to_string(),
            tenant_id: "t-1".to_string(),
            name: "Masala Dosa".to_string(),
            product_code: "DOSA-01".to_string(),
            description: None,
            price_cents: price,
            strike_price_cents: price,
            gst_bps: 500,
            active: true,
            is_deleted: false,
            re_enabled_at: None,
            created_at: now,
            updated_at: now,
        }
    }

    fn offer(id: &str, is_active: bool, terms: OfferTerms) -> Offer {
        let now = Utc::now();
        Offer {
            id: id.to_string(),
            tenant_id: "t-1".to_string(),
            is_active,
            terms,
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn test_resolve_discount_and_negotiation() {
        let offers = vec![
            offer(
                "o-1",
                true,
                OfferTerms::Discount(DiscountTerms {
                    items: vec![DiscountItem {
                        product_id: "p-1".to_string(),
                        discount_bps: 1000,
                    }],
                }),
            ),
            offer(
                "o-2",
                true,
                OfferTerms::Negotiate(NegotiateTerms {
                    success_bps: 1000,
                    failure_bps: 500,
                    max_attempts: None,
                    items: vec![NegotiateItem {
                        product_id: "p-1".to_string(),
                        floor_price_cents: 8000,
                    }],
                }),
            ),
        ];

        let view = ProductView::resolve(product("p-1", 10000), &offers);
        let discount = view.offer.unwrap();
        assert_eq!(discount.kind, OfferKind::Discount);
        assert_eq!(discount.discounted_price_cents, 9000);
        assert!(view.negotiable);

        let other = ProductView::resolve(product("p-2", 10000), &offers);
        assert!(other.offer.is_none());
        assert!(!other.negotiable);
    }

    #[test]
    fn test_inactive_offers_are_ignored() {
        let offers = vec![offer(
            "o-1",
            false,
            OfferTerms::Discount(DiscountTerms {
                items: vec![DiscountItem {
                    product_id: "p-1".to_string(),
                    discount_bps: 1000,
                }],
            }),
        )];

        let view = ProductView::resolve(product("p-1", 10000), &offers);
        assert!(view.offer.is_none());
    }

    #[test]
    fn test_view_flattens_product() {
        let view = ProductView::resolve(product("p-1", 10000), &[]);
        let json = serde_json::to_value(&view).unwrap();
        assert_eq!(json["id"], "p-1");
        assert_eq!(json["priceCents"], 10000);
        assert_eq!(json["negotiable"], false);
    }
}
