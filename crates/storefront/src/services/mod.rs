//! Business logic services for the storefront.
//!
//! - `catalog` - Active product listing, category filtering and staff
//!   catalog management
//! - `checkout` - Order placement from the cart, plus staff order listing,
//!   status updates and deletion

pub mod catalog;
pub mod checkout;

pub use catalog::{CatalogError, CatalogService, NewProduct};
pub use checkout::{CheckoutError, CustomerInfo, OrderReceipt, OrderSummary, OrderedItem};
