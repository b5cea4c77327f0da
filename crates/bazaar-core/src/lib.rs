//! # bazaar-core: Pure Business Logic for Bazaar
//!
//! This crate is the **heart** of Bazaar. It contains the cart pricing
//! engine, offer rules and negotiation rules as pure functions with zero
//! I/O dependencies.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                        Bazaar Architecture                              │
//! │                                                                         │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │          Mobile / Web clients, Admin & Employee front-ends      │   │
//! │  └─────────────────────────────┬───────────────────────────────────┘   │
//! │                                │ HTTP/JSON                              │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │                    apps/api (axum)                              │   │
//! │  │    /cart, /orders, /offers, /products, /addresses, /admin      │   │
//! │  └─────────────────────────────┬───────────────────────────────────┘   │
//! │                                │                                        │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │               ★ bazaar-core (THIS CRATE) ★                      │   │
//! │  │                                                                 │   │
//! │  │   ┌────────┐ ┌────────┐ ┌────────┐ ┌─────────┐ ┌────────────┐  │   │
//! │  │   │ money  │ │  cart  │ │ offer  │ │ pricing │ │ negotiation│  │   │
//! │  │   └────────┘ └────────┘ └────────┘ └─────────┘ └────────────┘  │   │
//! │  │                                                                 │   │
//! │  │   NO I/O • NO DATABASE • NO NETWORK • PURE FUNCTIONS           │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! │                                │                                        │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │                    bazaar-db (Database Layer)                   │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Modules
//!
//! - [`types`] - Domain types (Product, Coupon, Address, Order, ...)
//! - [`money`] - Money type with integer arithmetic (no floating point!)
//! - [`cart`] - Cart, line items and the cart status state machine
//! - [`offer`] - Offer tagged union (flat / negotiate / discount / mrp)
//! - [`negotiation`] - Attempt-limited price bargaining
//! - [`pricing`] - The cart pricing engine
//! - [`error`] - Domain error types
//! - [`validation`] - Business rule validation
//!
//! ## Example Usage
//!
//! ```rust
//! use bazaar_core::money::Money;
//!
//! // Create money from paise (never from floats!)
//! let price = Money::from_cents(10000); // ₹100.00
//!
//! // 5% GST, in basis points
//! let tax = price.percentage_of(500);
//! assert_eq!(tax.cents(), 500);
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod cart;
pub mod error;
pub mod money;
pub mod negotiation;
pub mod offer;
pub mod pricing;
pub mod types;
pub mod validation;

// =============================================================================
// Re-exports for Convenience
// =============================================================================

pub use cart::{Cart, CartLineItem, CartStatus, LineOption, LineUpdate};
pub use error::{CoreError, CoreResult, ValidationError};
pub use money::Money;
pub use negotiation::{AttemptOutcome, AttemptResult, NegotiationAttempt};
pub use offer::{CatalogDiscount, Offer, OfferKind, OfferSlot, OfferTerms};
pub use pricing::{CartPricing, LineQuote, PricingConfig, PricingEngine, PricingInput};
pub use types::*;

// =============================================================================
// Crate-Level Constants
// =============================================================================

/// Maximum distinct lines allowed in a single cart.
pub const MAX_CART_ITEMS: usize = 100;

/// Maximum quantity of a single line.
pub const MAX_ITEM_QUANTITY: i64 = 999;

/// Largest accepted price or fee, in paise (₹1 crore).
///
/// Keeps `price × MAX_ITEM_QUANTITY × MAX_CART_ITEMS` well inside `i64`.
pub const MAX_PRICE_CENTS: i64 = 1_000_000_000;

/// Days of inactivity after which an active cart is abandoned.
pub const DEFAULT_CART_TTL_DAYS: i64 = 7;

/// Negotiation attempts allowed when an offer does not set its own cap.
pub const DEFAULT_MAX_NEGOTIATION_ATTEMPTS: u32 = 3;

/// One hundred percent, in basis points.
pub const FULL_BPS: u32 = 10_000;
