//! Shahi Core - Shared types and cart state for the Shahi Medicals storefront.
//!
//! This crate provides the pieces every other component builds on:
//! - `storefront` - Cart synchronization, backend client, catalog and checkout
//! - `cli` - Command-line front end driving the storefront library
//!
//! # Architecture
//!
//! The core crate contains only types and pure logic - no I/O, no HTTP
//! clients, no filesystem access. The cart reducer and the snapshot codec
//! live here so they can be tested without a runtime.
//!
//! # Modules
//!
//! - [`types`] - Newtype wrappers for IDs, prices, products, identity and statuses
//! - [`cart`] - Cart state, the reducer that mutates it, and snapshot encoding

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod cart;
pub mod types;

pub use cart::{CartAction, CartLine, CartState};
pub use types::*;
