//! Core types for the storefront.
//!
//! This module provides type-safe wrappers for common domain concepts.

pub mod id;
pub mod identity;
pub mod price;
pub mod product;
pub mod status;

pub use id::*;
pub use identity::Identity;
pub use price::{CurrencyCode, Price};
pub use product::Product;
pub use status::*;
