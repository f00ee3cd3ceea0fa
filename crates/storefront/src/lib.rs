//! Shahi Medicals storefront library.
//!
//! Cart synchronization, the product catalog and checkout against the hosted
//! backend. The command-line tool and the integration tests drive everything
//! through this crate.

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod backend;
pub mod cart;
pub mod config;
pub mod error;
pub mod services;
pub mod session;
pub mod state;
