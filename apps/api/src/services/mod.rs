//! Request-independent workflows shared by several route modules.
//!
//! - [`cart`] - loading, mutating and re-pricing the active cart
//! - [`catalog`] - product reads with their resolved offers

pub mod cart;
pub mod catalog;
