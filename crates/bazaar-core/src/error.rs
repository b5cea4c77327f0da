//! # Error Types
//!
//! Domain-specific error types for bazaar-core.
//!
//! ## Error Hierarchy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Error Types                                     │
//! │                                                                         │
//! │  bazaar-core errors (this file)                                        │
//! │  ├── CoreError        - Business rule violations                       │
//! │  └── ValidationError  - Input validation failures                      │
//! │                                                                         │
//! │  bazaar-db errors (separate crate)                                     │
//! │  └── DbError          - Database operation failures                    │
//! │                                                                         │
//! │  HTTP errors (apps/api)                                                │
//! │  └── ApiError         - What clients see (JSON envelope)               │
//! │                                                                         │
//! │  Flow: ValidationError → CoreError → DbError → ApiError → Client       │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use thiserror::Error;

// =============================================================================
// Core Error
// =============================================================================

/// Core business logic errors.
///
/// Each variant maps to one HTTP status in the API layer: the `*NotFound`
/// variants are 404, `Validation` is 400, everything else is 422.
#[derive(Debug, Error)]
pub enum CoreError {
    /// Product cannot be found, or has been soft deleted.
    #[error("Product not found: {0}")]
    ProductNotFound(String),

    /// Product exists but is disabled.
    #[error("Product {0} is currently unavailable")]
    ProductUnavailable(String),

    /// Address cannot be found for this user.
    #[error("Address not found: {0}")]
    AddressNotFound(String),

    /// Coupon cannot be found.
    #[error("Coupon not found: {0}")]
    CouponNotFound(String),

    /// Offer cannot be found.
    #[error("Offer not found: {0}")]
    OfferNotFound(String),

    /// Order cannot be found.
    #[error("Order not found: {0}")]
    OrderNotFound(String),

    /// Attempted to change the quantity of, or remove, a line that is not
    /// in the cart.
    #[error("Product {0} is not in the cart")]
    LineNotInCart(String),

    /// Cart has exceeded maximum allowed lines.
    #[error("Cart cannot have more than {max} items")]
    CartTooLarge { max: usize },

    /// Item quantity exceeds maximum allowed.
    #[error("Quantity {requested} exceeds maximum allowed ({max})")]
    QuantityTooLarge { requested: i64, max: i64 },

    /// Cart is not in a state that allows the requested operation.
    ///
    /// ## When This Occurs
    /// ```text
    /// active ──► completed   ✓
    /// active ──► abandoned   ✓
    /// completed ──► *       ✗ InvalidCartTransition
    /// abandoned ──► *       ✗ InvalidCartTransition
    /// ```
    #[error("Cart cannot move from {from} to {to}")]
    InvalidCartTransition { from: String, to: String },

    /// Order status change outside the fulfilment flow.
    ///
    /// ## When This Occurs
    /// ```text
    /// pending  ──► accepted | rejected | cancelled   ✓
    /// accepted ──► picked | cancelled                ✓
    /// picked   ──► delivered                         ✓
    /// anything else                                  ✗ InvalidOrderTransition
    /// ```
    #[error("Order cannot move from {from} to {to}")]
    InvalidOrderTransition { from: String, to: String },

    /// Customers may only cancel orders nobody has accepted yet.
    #[error("Order {0} can no longer be cancelled")]
    OrderNotCancellable(String),

    /// Checkout was attempted on a cart with no lines.
    #[error("Cart is empty")]
    EmptyCart,

    /// Coupon exists but is switched off.
    #[error("Coupon {0} is not active")]
    CouponInactive(String),

    /// Cart total lies outside the coupon's `[min, max]` window.
    #[error("Coupon {code} applies to totals between {min_cents} and {max_cents} paise, cart total is {total_cents}")]
    CouponNotApplicable {
        code: String,
        min_cents: i64,
        max_cents: i64,
        total_cents: i64,
    },

    /// A negotiate floor may not exceed the product's selling price.
    #[error("Floor price {floor_cents} for product {product_id} is above its price {price_cents}")]
    FloorAboveListPrice {
        product_id: String,
        floor_cents: i64,
        price_cents: i64,
    },

    /// Product is not part of any active negotiate offer.
    #[error("Product {0} is not open for negotiation")]
    NotNegotiable(String),

    /// The user already used every attempt for this product.
    #[error("Negotiation attempts exhausted for product {product_id} (max {max})")]
    NegotiationExhausted { product_id: String, max: u32 },

    /// Offer update tried to change the offer's variant.
    #[error("Offer {offer_id} is a {stored} offer, cannot update it as {requested}")]
    OfferKindMismatch {
        offer_id: String,
        stored: String,
        requested: String,
    },

    /// Product already listed in this offer.
    #[error("Product {0} is already part of this offer")]
    OfferItemExists(String),

    /// Product is not listed in this offer.
    #[error("Product {0} is not part of this offer")]
    OfferItemNotFound(String),

    /// Item operations on an offer variant that has no item list (flat).
    #[error("{0} offers have no product items")]
    OfferHasNoItems(String),

    /// Product is not in the user's favorites.
    #[error("Product {0} is not in favorites")]
    FavoriteNotFound(String),

    /// A cart amount left the representable range.
    #[error("Cart amount is too large")]
    AmountOverflow,

    /// Validation error (wraps ValidationError).
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),
}

impl CoreError {
    /// Whether this error means "the thing you asked for does not exist".
    pub fn is_not_found(&self) -> bool {
        matches!(
            self,
            CoreError::ProductNotFound(_)
                | CoreError::AddressNotFound(_)
                | CoreError::CouponNotFound(_)
                | CoreError::OfferNotFound(_)
                | CoreError::OrderNotFound(_)
                | CoreError::FavoriteNotFound(_)
        )
    }
}

// =============================================================================
// Validation Error
// =============================================================================

/// Input validation errors.
///
/// These errors occur when user input doesn't meet requirements.
/// Used for early validation before business logic runs.
#[derive(Debug, Error)]
pub enum ValidationError {
    /// A required field is missing or empty.
    #[error("{field} is required")]
    Required { field: String },

    /// Field value is too long.
    #[error("{field} must be at most {max} characters")]
    TooLong { field: String, max: usize },

    /// Numeric value is out of range.
    #[error("{field} must be between {min} and {max}")]
    OutOfRange { field: String, min: i64, max: i64 },

    /// Value must be positive.
    #[error("{field} must be positive")]
    MustBePositive { field: String },

    /// Invalid format (e.g., invalid UUID, invalid coordinates).
    #[error("{field} has invalid format: {reason}")]
    InvalidFormat { field: String, reason: String },

    /// Two fields that must respect an ordering do not.
    #[error("{field} must not exceed {other}")]
    MustNotExceed { field: String, other: String },

    /// Duplicate value (e.g., the same product twice in one request).
    #[error("{field} '{value}' appears more than once")]
    Duplicate { field: String, value: String },
}

// =============================================================================
// Result Type Alias
// =============================================================================

/// Convenience type alias for Results with CoreError.
pub type CoreResult<T> = Result<T, CoreError>;

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_messages() {
        let err = CoreError::NegotiationExhausted {
            product_id: "p-1".to_string(),
            max: 3,
        };
        assert_eq!(
            err.to_string(),
            "Negotiation attempts exhausted for product p-1 (max 3)"
        );

        let err = CoreError::ProductNotFound("p-9".to_string());
        assert_eq!(err.to_string(), "Product not found: p-9");
    }

    #[test]
    fn test_validation_error_messages() {
        let err = ValidationError::Required {
            field: "productId".to_string(),
        };
        assert_eq!(err.to_string(), "productId is required");

        let err = ValidationError::MustNotExceed {
            field: "failureBps".to_string(),
            other: "successBps".to_string(),
        };
        assert_eq!(err.to_string(), "failureBps must not exceed successBps");
    }

    #[test]
    fn test_validation_converts_to_core_error() {
        let validation_err = ValidationError::Required {
            field: "name".to_string(),
        };
        let core_err: CoreError = validation_err.into();
        assert!(matches!(core_err, CoreError::Validation(_)));
    }

    #[test]
    fn test_not_found_classification() {
        assert!(CoreError::CouponNotFound("c".to_string()).is_not_found());
        assert!(!CoreError::EmptyCart.is_not_found());
        assert!(!CoreError::LineNotInCart("p".to_string()).is_not_found());
        assert!(CoreError::FavoriteNotFound("p".to_string()).is_not_found());
        assert!(!CoreError::AmountOverflow.is_not_found());
    }
}
