//! # Repository Module
//!
//! Database repository implementations for Bazaar.
//!
//! ## Repository Pattern
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  HTTP handler                                                           │
//! │       │  db.carts().find_active(tenant, user)                          │
//! │       ▼                                                                 │
//! │  CartRepository                                                        │
//! │  ├── find_active / create_active                                       │
//! │  ├── save (optimistic version check)                                   │
//! │  └── sweep_expired                                                     │
//! │       │  SQL                                                            │
//! │       ▼                                                                 │
//! │  SQLite                                                                │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Every query is scoped by `tenant_id`.
//!
//! ## Available Repositories
//!
//! - [`product::ProductRepository`] - Catalog CRUD and the re-enable sweep
//! - [`cart::CartRepository`] - Versioned cart reads and writes
//! - [`offer::OfferRepository`] - Offer documents and the membership index
//! - [`coupon::CouponRepository`] - Coupons
//! - [`negotiation::NegotiationRepository`] - Attempts and price overrides
//! - [`address::AddressRepository`] - Saved delivery addresses
//! - [`order::OrderRepository`] - Checkout, order history and status changes
//! - [`favorite::FavoriteRepository`] - Saved products

pub mod address;
pub mod cart;
pub mod coupon;
pub mod favorite;
pub mod negotiation;
pub mod offer;
pub mod order;
pub mod product;
