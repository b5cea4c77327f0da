//! # Domain Types
//!
//! Core domain types used throughout Bazaar.
//!
//! ## Type Hierarchy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Domain Types                                    │
//! │                                                                         │
//! │  ┌─────────────────┐   ┌─────────────────┐   ┌─────────────────┐       │
//! │  │    Product      │   │     Coupon      │   │    Address      │       │
//! │  │  ─────────────  │   │  ─────────────  │   │  ─────────────  │       │
//! │  │  price_cents    │   │  discount_bps   │   │  latitude       │       │
//! │  │  gst_bps        │   │  min/max price  │   │  longitude      │       │
//! │  └─────────────────┘   └─────────────────┘   └─────────────────┘       │
//! │                                                                         │
//! │  ┌─────────────────┐   ┌─────────────────┐   ┌─────────────────┐       │
//! │  │    TaxRate      │   │     Order       │   │  RouteEstimate  │       │
//! │  │  bps (u32)      │   │  frozen lines   │   │  metres/seconds │       │
//! │  │  500 = 5% GST   │   │  OrderStatus    │   └─────────────────┘       │
//! │  └─────────────────┘   └─────────────────┘                              │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Every entity carries a `tenant_id`; repositories never read across
//! tenants.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::cart::{Cart, LineOption};
use crate::error::{CoreError, CoreResult, ValidationError};
use crate::money::Money;

// =============================================================================
// Tax Rate
// =============================================================================

/// Tax rate represented in basis points (bps).
///
/// 1 basis point = 0.01%. GST slabs are 0, 500, 1200, 1800 and 2800 bps.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct TaxRate(u32);

impl TaxRate {
    /// Creates a tax rate from basis points.
    #[inline]
    pub const fn from_bps(bps: u32) -> Self {
        TaxRate(bps)
    }

    /// Returns the rate in basis points.
    #[inline]
    pub const fn bps(&self) -> u32 {
        self.0
    }

    /// Zero tax rate.
    #[inline]
    pub const fn zero() -> Self {
        TaxRate(0)
    }
}

impl Default for TaxRate {
    fn default() -> Self {
        TaxRate::zero()
    }
}

// =============================================================================
// Product
// =============================================================================

/// A product in a tenant's catalog.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct Product {
    /// Unique identifier (UUID v4).
    pub id: String,

    /// Tenant this product belongs to.
    pub tenant_id: String,

    /// Display name.
    pub name: String,

    /// Business identifier printed on invoices.
    pub product_code: String,

    pub description: Option<String>,

    /// Selling price in paise.
    pub price_cents: i64,

    /// MRP shown struck through next to the selling price.
    pub strike_price_cents: i64,

    /// GST rate in basis points (500 = 5%).
    pub gst_bps: u32,

    /// Whether the product can currently be added to carts.
    pub active: bool,

    /// Soft delete marker. Deleted products price as "not found".
    pub is_deleted: bool,

    /// When a disabled product should be switched back on.
    #[ts(as = "Option<String>")]
    pub re_enabled_at: Option<DateTime<Utc>>,

    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,

    #[ts(as = "String")]
    pub updated_at: DateTime<Utc>,
}

impl Product {
    /// Returns the selling price as Money.
    #[inline]
    pub fn price(&self) -> Money {
        Money::from_cents(self.price_cents)
    }

    /// Returns the MRP as Money.
    #[inline]
    pub fn strike_price(&self) -> Money {
        Money::from_cents(self.strike_price_cents)
    }

    /// Returns the GST rate.
    #[inline]
    pub fn gst(&self) -> TaxRate {
        TaxRate::from_bps(self.gst_bps)
    }

    /// Checks if the product may be added to a cart.
    pub fn is_sellable(&self) -> bool {
        self.active && !self.is_deleted
    }
}

// =============================================================================
// Coupon
// =============================================================================

/// A percentage coupon valid for cart totals within `[min, max]`.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct Coupon {
    pub id: String,
    pub tenant_id: String,
    pub code: String,
    /// Discount in basis points of the gross cart total.
    pub discount_bps: u32,
    pub min_price_cents: i64,
    pub max_price_cents: i64,
    pub active: bool,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
}

impl Coupon {
    /// Checks whether the coupon may be applied to `total`.
    pub fn applies_to(&self, total: Money) -> bool {
        self.active && total.cents() >= self.min_price_cents && total.cents() <= self.max_price_cents
    }

    /// Discount granted on `total`.
    pub fn discount_on(&self, total: Money) -> Money {
        total.percentage_of(self.discount_bps)
    }
}

// =============================================================================
// Geography
// =============================================================================

/// A latitude/longitude pair in decimal degrees.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct GeoPoint {
    pub latitude: f64,
    pub longitude: f64,
}

impl GeoPoint {
    pub const fn new(latitude: f64, longitude: f64) -> Self {
        GeoPoint {
            latitude,
            longitude,
        }
    }
}

/// Road distance and travel time between the store and a delivery address.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct RouteEstimate {
    pub distance_meters: i64,
    pub duration_seconds: i64,
}

impl RouteEstimate {
    /// Whole minutes, rounded up, for display.
    pub fn duration_minutes(&self) -> i64 {
        (self.duration_seconds + 59) / 60
    }
}

/// A user's saved delivery address.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct Address {
    pub id: String,
    pub tenant_id: String,
    pub user_id: String,
    pub label: String,
    pub line: String,
    pub latitude: f64,
    pub longitude: f64,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
}

impl Address {
    pub fn location(&self) -> GeoPoint {
        GeoPoint::new(self.latitude, self.longitude)
    }
}

// =============================================================================
// Orders
// =============================================================================

/// Fulfilment status of an order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "lowercase"))]
#[serde(rename_all = "lowercase")]
#[ts(export)]
pub enum OrderStatus {
    #[default]
    Pending,
    Accepted,
    Picked,
    Delivered,
    Rejected,
    Cancelled,
}

impl OrderStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            OrderStatus::Pending => "pending",
            OrderStatus::Accepted => "accepted",
            OrderStatus::Picked => "picked",
            OrderStatus::Delivered => "delivered",
            OrderStatus::Rejected => "rejected",
            OrderStatus::Cancelled => "cancelled",
        }
    }

    /// Orders in these states no longer count as "active".
    pub fn is_final(&self) -> bool {
        matches!(
            self,
            OrderStatus::Delivered | OrderStatus::Rejected | OrderStatus::Cancelled
        )
    }

    /// Valid fulfilment transitions.
    ///
    /// ```text
    /// pending ──► accepted ──► picked ──► delivered
    ///    │           │
    ///    ├──► rejected
    ///    └───────────┴──► cancelled
    /// ```
    pub fn can_transition_to(&self, next: OrderStatus) -> bool {
        if self.is_final() {
            return false;
        }
        matches!(
            (self, next),
            (OrderStatus::Pending, OrderStatus::Accepted)
                | (OrderStatus::Pending, OrderStatus::Rejected)
                | (OrderStatus::Pending, OrderStatus::Cancelled)
                | (OrderStatus::Accepted, OrderStatus::Picked)
                | (OrderStatus::Accepted, OrderStatus::Cancelled)
                | (OrderStatus::Picked, OrderStatus::Delivered)
        )
    }
}

impl std::fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "snake_case"))]
#[serde(rename_all = "snake_case")]
#[ts(export)]
pub enum PaymentMethod {
    #[default]
    Online,
    CashOnDelivery,
}

const ORDER_NUMBER_ALPHABET: &[u8; 36] = b"0123456789ABCDEFGHIJKLMNOPQRSTUVWXYZ";

/// Generates a human order number such as `ORD-7K2Q9X`.
///
/// Six base-36 characters from a random UUID. Uniqueness is enforced by
/// the `orders` table; callers retry on collision.
pub fn generate_order_number() -> String {
    let bytes = uuid::Uuid::new_v4().into_bytes();
    let suffix: String = bytes[..6]
        .iter()
        .map(|b| ORDER_NUMBER_ALPHABET[(*b as usize) % ORDER_NUMBER_ALPHABET.len()] as char)
        .collect();
    format!("ORD-{suffix}")
}

/// A line frozen onto an order at checkout.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct OrderItem {
    pub product_id: String,
    pub quantity: i64,
    pub unit_price_cents: i64,
    pub line_total_cents: i64,
    pub options: Vec<LineOption>,
}

/// A placed order. All amounts are copied from the priced cart.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct Order {
    pub id: String,
    pub tenant_id: String,
    pub user_id: String,
    /// Human readable number, e.g. `ORD-7K2Q9X`.
    pub order_number: String,
    pub cart_id: String,
    pub address_id: String,
    pub coupon_id: Option<String>,
    pub coupon_code: Option<String>,
    pub items: Vec<OrderItem>,
    pub subtotal_cents: i64,
    pub tax_cents: i64,
    pub delivery_fee_cents: i64,
    pub platform_fee_cents: i64,
    pub coupon_discount_cents: i64,
    pub total_cents: i64,
    pub distance_meters: i64,
    pub duration_seconds: i64,
    pub status: OrderStatus,
    pub payment_method: PaymentMethod,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
}

impl Order {
    /// Freezes a priced cart into a pending order.
    ///
    /// The cart must hold at least one line and carry the delivery address
    /// it was priced against.
    pub fn from_cart(
        cart: &Cart,
        coupon_code: Option<String>,
        payment_method: PaymentMethod,
    ) -> CoreResult<Order> {
        if cart.is_empty() {
            return Err(CoreError::EmptyCart);
        }
        let address_id = cart
            .address_id
            .clone()
            .ok_or_else(|| ValidationError::Required {
                field: "addressId".to_string(),
            })?;

        let items = cart
            .items
            .iter()
            .map(|line| OrderItem {
                product_id: line.product_id.clone(),
                quantity: line.quantity,
                unit_price_cents: line.unit_price_cents,
                line_total_cents: line.line_total_cents,
                options: line.options.clone(),
            })
            .collect();

        Ok(Order {
            id: uuid::Uuid::new_v4().to_string(),
            tenant_id: cart.tenant_id.clone(),
            user_id: cart.user_id.clone(),
            order_number: generate_order_number(),
            cart_id: cart.id.clone(),
            address_id,
            coupon_id: cart.coupon_id.clone(),
            coupon_code,
            items,
            subtotal_cents: cart.subtotal_cents,
            tax_cents: cart.tax_cents,
            delivery_fee_cents: cart.delivery_fee_cents,
            platform_fee_cents: cart.platform_fee_cents,
            coupon_discount_cents: cart.coupon_discount_cents,
            total_cents: cart.total_cents,
            distance_meters: cart.distance_meters,
            duration_seconds: cart.duration_seconds,
            status: OrderStatus::Pending,
            payment_method,
            created_at: Utc::now(),
        })
    }

    pub fn total(&self) -> Money {
        Money::from_cents(self.total_cents)
    }

    /// Moves the order along its fulfilment flow.
    pub fn transition(&mut self, next: OrderStatus) -> CoreResult<()> {
        if !self.status.can_transition_to(next) {
            return Err(CoreError::InvalidOrderTransition {
                from: self.status.as_str().to_string(),
                to: next.as_str().to_string(),
            });
        }
        self.status = next;
        Ok(())
    }

    /// Customer-side cancellation, allowed until the store accepts.
    pub fn cancel_by_customer(&mut self) -> CoreResult<()> {
        if self.status != OrderStatus::Pending {
            return Err(CoreError::OrderNotCancellable(self.order_number.clone()));
        }
        self.transition(OrderStatus::Cancelled)
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    #[test]
    fn test_coupon_bounds_are_inclusive() {
        let coupon = Coupon {
            id: "c-1".to_string(),
            tenant_id: "t-1".to_string(),
            code: "SAVE10".to_string(),
            discount_bps: 1000,
            min_price_cents: 10000,
            max_price_cents: 50000,
            active: true,
            created_at: Utc::now(),
        };

        assert!(coupon.applies_to(Money::from_cents(10000)));
        assert!(coupon.applies_to(Money::from_cents(50000)));
        assert!(!coupon.applies_to(Money::from_cents(9999)));
        assert!(!coupon.applies_to(Money::from_cents(50001)));
        assert_eq!(coupon.discount_on(Money::from_cents(21500)).cents(), 2150);
    }

    #[test]
    fn test_route_minutes_round_up() {
        let route = RouteEstimate {
            distance_meters: 1000,
            duration_seconds: 61,
        };
        assert_eq!(route.duration_minutes(), 2);
    }

    #[test]
    fn test_order_number_format() {
        let number = generate_order_number();
        assert_eq!(number.len(), 10);
        assert!(number.starts_with("ORD-"));
        assert!(number[4..]
            .chars()
            .all(|c| c.is_ascii_digit() || c.is_ascii_uppercase()));
    }

    #[test]
    fn test_order_status_final() {
        assert!(OrderStatus::Delivered.is_final());
        assert!(!OrderStatus::Pending.is_final());
    }

    #[test]
    fn test_order_status_transitions() {
        use OrderStatus::*;
        assert!(Pending.can_transition_to(Accepted));
        assert!(Pending.can_transition_to(Rejected));
        assert!(Pending.can_transition_to(Cancelled));
        assert!(Accepted.can_transition_to(Picked));
        assert!(Accepted.can_transition_to(Cancelled));
        assert!(Picked.can_transition_to(Delivered));

        assert!(!Pending.can_transition_to(Delivered));
        assert!(!Accepted.can_transition_to(Rejected));
        assert!(!Picked.can_transition_to(Cancelled));
        assert!(!Delivered.can_transition_to(Pending));
        assert!(!Cancelled.can_transition_to(Accepted));
        assert!(!Pending.can_transition_to(Pending));
    }

    #[test]
    fn test_customer_cancel_only_while_pending() {
        let mut cart = Cart::new("t-1", "u-1");
        cart.items
            .push(crate::cart::CartLineItem::new("p-1", 1, Vec::new()));
        cart.address_id = Some("a-1".to_string());

        let mut order = Order::from_cart(&cart, None, PaymentMethod::Online).unwrap();
        let mut accepted = order.clone();

        order.cancel_by_customer().unwrap();
        assert_eq!(order.status, OrderStatus::Cancelled);

        accepted.transition(OrderStatus::Accepted).unwrap();
        assert!(matches!(
            accepted.cancel_by_customer(),
            Err(CoreError::OrderNotCancellable(_))
        ));
        assert!(matches!(
            accepted.transition(OrderStatus::Delivered),
            Err(CoreError::InvalidOrderTransition { .. })
        ));
        assert_eq!(accepted.status, OrderStatus::Accepted);
    }

    #[test]
    fn test_order_from_cart() {
        let mut cart = Cart::new("t-1", "u-1");
        assert!(matches!(
            Order::from_cart(&cart, None, PaymentMethod::Online),
            Err(CoreError::EmptyCart)
        ));

        cart.items
            .push(crate::cart::CartLineItem::new("p-1", 2, Vec::new()));
        assert!(matches!(
            Order::from_cart(&cart, None, PaymentMethod::Online),
            Err(CoreError::Validation(_))
        ));

        cart.address_id = Some("a-1".to_string());
        cart.total_cents = 21500;
        let order = Order::from_cart(&cart, None, PaymentMethod::CashOnDelivery).unwrap();
        assert_eq!(order.cart_id, cart.id);
        assert_eq!(order.items.len(), 1);
        assert_eq!(order.total(), Money::from_cents(21500));
        assert_eq!(order.status, OrderStatus::Pending);
    }
}
