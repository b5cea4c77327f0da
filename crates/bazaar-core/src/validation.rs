//! # Validation Module
//!
//! Input validation utilities for Bazaar.
//!
//! ## Validation Strategy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                      Validation Layers                                  │
//! │                                                                         │
//! │  Layer 1: HTTP extractor (apps/api)                                    │
//! │  ├── Type validation (JSON deserialization)                            │
//! │  └── Malformed bodies → 400 before the handler runs                    │
//! │           │                                                             │
//! │           ▼                                                             │
//! │  Layer 2: THIS MODULE                                                  │
//! │  └── Business rule validation, before storage is touched               │
//! │           │                                                             │
//! │           ▼                                                             │
//! │  Layer 3: Database (SQLite)                                            │
//! │  ├── NOT NULL / CHECK constraints                                      │
//! │  └── UNIQUE constraints (offer exclusivity, attempt numbers)           │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Usage
//! ```rust
//! use bazaar_core::validation::{validate_quantity, validate_product_name};
//!
//! assert!(validate_product_name("Masala Dosa").is_ok());
//! assert!(validate_quantity(5).is_ok());
//! assert!(validate_quantity(0).is_err());
//! ```

use std::collections::HashSet;

use crate::cart::LineUpdate;
use crate::error::ValidationError;
use crate::{FULL_BPS, MAX_CART_ITEMS, MAX_ITEM_QUANTITY, MAX_PRICE_CENTS};

/// Result type for validation operations.
pub type ValidationResult<T> = Result<T, ValidationError>;

// =============================================================================
// String Validators
// =============================================================================

fn validate_required_text(field: &str, value: &str, max: usize) -> ValidationResult<()> {
    let value = value.trim();

    if value.is_empty() {
        return Err(ValidationError::Required {
            field: field.to_string(),
        });
    }

    if value.chars().count() > max {
        return Err(ValidationError::TooLong {
            field: field.to_string(),
            max,
        });
    }

    Ok(())
}

/// Validates a product name.
///
/// ## Rules
/// - Must not be empty
/// - At most 200 characters
pub fn validate_product_name(name: &str) -> ValidationResult<()> {
    validate_required_text("name", name, 200)
}

/// Validates a product code.
///
/// ## Rules
/// - Must not be empty, at most 50 characters
/// - Letters, numbers, hyphens and underscores only
///
/// ```rust
/// use bazaar_core::validation::validate_product_code;
///
/// assert!(validate_product_code("DOSA-01").is_ok());
/// assert!(validate_product_code("has space").is_err());
/// ```
pub fn validate_product_code(code: &str) -> ValidationResult<()> {
    validate_required_text("productCode", code, 50)?;

    if !code
        .trim()
        .chars()
        .all(|c| c.is_alphanumeric() || c == '-' || c == '_')
    {
        return Err(ValidationError::InvalidFormat {
            field: "productCode".to_string(),
            reason: "must contain only letters, numbers, hyphens, and underscores".to_string(),
        });
    }

    Ok(())
}

/// Validates a coupon code: non-empty, at most 32 characters.
pub fn validate_coupon_code(code: &str) -> ValidationResult<()> {
    validate_required_text("code", code, 32)
}

/// Validates an address label and line.
pub fn validate_address_text(label: &str, line: &str) -> ValidationResult<()> {
    validate_required_text("label", label, 50)?;
    validate_required_text("line", line, 500)
}

/// Validates an identifier supplied by a client (product id, coupon id, ...).
pub fn validate_id(field: &str, id: &str) -> ValidationResult<()> {
    validate_required_text(field, id, 64)
}

// =============================================================================
// Numeric Validators
// =============================================================================

/// Validates a quantity value.
///
/// ## Rules
/// - Must be positive (> 0)
/// - Must not exceed MAX_ITEM_QUANTITY (999)
///
/// ## User Workflow
/// ```text
/// POST /cart/update { productId, quantity: 5 }
///       │
///       ▼
/// validate_quantity(5) ← THIS FUNCTION
///       │
///       ├── qty <= 0?  → 400 "quantity must be positive"
///       ├── qty > 999? → 400 "quantity must be between 1 and 999"
///       └── OK → products are resolved, cart is re-priced
/// ```
pub fn validate_quantity(qty: i64) -> ValidationResult<()> {
    if qty <= 0 {
        return Err(ValidationError::MustBePositive {
            field: "quantity".to_string(),
        });
    }

    if qty > MAX_ITEM_QUANTITY {
        return Err(ValidationError::OutOfRange {
            field: "quantity".to_string(),
            min: 1,
            max: MAX_ITEM_QUANTITY,
        });
    }

    Ok(())
}

/// Validates a price in paise.
///
/// ```rust
/// use bazaar_core::validation::validate_price_cents;
///
/// assert!(validate_price_cents("price", 1099).is_ok());
/// assert!(validate_price_cents("price", 0).is_ok());
/// assert!(validate_price_cents("price", -100).is_err());
/// assert!(validate_price_cents("price", i64::MAX).is_err());
/// ```
pub fn validate_price_cents(field: &str, cents: i64) -> ValidationResult<()> {
    if !(0..=MAX_PRICE_CENTS).contains(&cents) {
        return Err(ValidationError::OutOfRange {
            field: field.to_string(),
            min: 0,
            max: MAX_PRICE_CENTS,
        });
    }

    Ok(())
}

/// Validates a percentage in basis points (0 to 10000).
pub fn validate_bps(field: &str, bps: u32) -> ValidationResult<()> {
    if bps > FULL_BPS {
        return Err(ValidationError::OutOfRange {
            field: field.to_string(),
            min: 0,
            max: FULL_BPS as i64,
        });
    }

    Ok(())
}

/// Validates that `lower` does not exceed `upper`.
pub fn validate_ordered(
    lower_field: &str,
    lower: i64,
    upper_field: &str,
    upper: i64,
) -> ValidationResult<()> {
    if lower > upper {
        return Err(ValidationError::MustNotExceed {
            field: lower_field.to_string(),
            other: upper_field.to_string(),
        });
    }

    Ok(())
}

/// Validates WGS84 coordinates.
pub fn validate_coordinates(latitude: f64, longitude: f64) -> ValidationResult<()> {
    if !latitude.is_finite() || !(-90.0..=90.0).contains(&latitude) {
        return Err(ValidationError::InvalidFormat {
            field: "latitude".to_string(),
            reason: "must be between -90 and 90".to_string(),
        });
    }

    if !longitude.is_finite() || !(-180.0..=180.0).contains(&longitude) {
        return Err(ValidationError::InvalidFormat {
            field: "longitude".to_string(),
            reason: "must be between -180 and 180".to_string(),
        });
    }

    Ok(())
}

// =============================================================================
// Collection Validators
// =============================================================================

/// Validates the number of distinct lines a cart would hold.
pub fn validate_cart_size(lines: usize) -> ValidationResult<()> {
    if lines > MAX_CART_ITEMS {
        return Err(ValidationError::OutOfRange {
            field: "cart items".to_string(),
            min: 0,
            max: MAX_CART_ITEMS as i64,
        });
    }

    Ok(())
}

/// Validates a batch cart update before any product is looked up.
///
/// Every entry needs a product id and a legal quantity, and a product may
/// appear only once per batch.
pub fn validate_line_updates(updates: &[LineUpdate]) -> ValidationResult<()> {
    if updates.is_empty() {
        return Err(ValidationError::Required {
            field: "items".to_string(),
        });
    }

    validate_cart_size(updates.len())?;

    let mut seen = HashSet::new();
    for update in updates {
        validate_id("productId", &update.product_id)?;
        validate_quantity(update.quantity)?;

        if !seen.insert(update.product_id.as_str()) {
            return Err(ValidationError::Duplicate {
                field: "productId".to_string(),
                value: update.product_id.clone(),
            });
        }
    }

    Ok(())
}

// =============================================================================
// Unit Tests
// =============================================================================
