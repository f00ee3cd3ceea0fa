//! Catalog product as seen by the cart.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::ProductId;

/// A product offered by the pharmacy.
///
/// Cart lines carry a full copy of the product so a persisted cart can be
/// rendered (and totalled) without reaching the backend.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Product {
    pub id: ProductId,
    pub name: String,
    #[serde(default)]
    pub description: String,
    /// Unit price.
    pub price: Decimal,
    #[serde(default)]
    pub category: String,
    /// Image URL (may be empty).
    #[serde(default)]
    pub image: String,
    #[serde(default)]
    pub stock: i32,
    #[serde(default)]
    pub manufacturer: String,
    /// Whether a prescription is required to dispense.
    #[serde(default)]
    pub prescription: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dosage: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub side_effects: Option<String>,
}

impl Product {
    /// Product with only the fields a cart needs; everything else is blank.
    #[must_use]
    pub fn new(id: impl Into<ProductId>, name: impl Into<String>, price: Decimal) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            description: String::new(),
            price,
            category: String::new(),
            image: String::new(),
            stock: 0,
            manufacturer: String::new(),
            prescription: false,
            dosage: None,
            side_effects: None,
        }
    }

    /// Returns `true` if at least one unit is in stock.
    #[must_use]
    pub const fn in_stock(&self) -> bool {
        self.stock > 0
    }
}
