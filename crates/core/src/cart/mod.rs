//! Cart state and the reducer that mutates it.
//!
//! [`CartState`] is only ever changed through [`CartState::apply`]. Each
//! [`CartAction`] is total: there are no error cases, unknown product ids are
//! no-ops, and the derived `total` and `count` are recomputed from the lines
//! after every action so they can never drift.
//!
//! # Example
//!
//! ```rust
//! use rust_decimal::Decimal;
//! use shahi_core::{CartAction, CartState, Product, ProductId};
//!
//! let product = Product {
//!     id: ProductId::new("1"),
//!     name: "Paracetamol 500mg".to_string(),
//!     description: String::new(),
//!     price: Decimal::new(2599, 2),
//!     category: "Pain Relief".to_string(),
//!     image: String::new(),
//!     stock: 150,
//!     manufacturer: "PharmaCorp".to_string(),
//!     prescription: false,
//!     dosage: None,
//!     side_effects: None,
//! };
//!
//! let mut cart = CartState::new();
//! cart.apply(CartAction::AddLine(product.clone()));
//! cart.apply(CartAction::AddLine(product));
//!
//! assert_eq!(cart.count(), 2);
//! assert_eq!(cart.total(), Decimal::new(5198, 2));
//! ```

pub mod snapshot;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::types::{Product, ProductId};

/// One product in the cart and how many of it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CartLine {
    /// Denormalized product so the line can be rendered offline.
    pub product: Product,
    /// Always at least 1 for lines held by a [`CartState`].
    pub quantity: u32,
}

impl CartLine {
    /// Create a new line.
    #[must_use]
    pub const fn new(product: Product, quantity: u32) -> Self {
        Self { product, quantity }
    }

    /// Unit price times quantity.
    #[must_use]
    pub fn line_total(&self) -> Decimal {
        self.product.price * Decimal::from(self.quantity)
    }
}

/// A state transition for the cart.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CartAction {
    /// Add one unit of a product, creating the line if needed.
    AddLine(Product),
    /// Drop the line for a product.
    RemoveLine(ProductId),
    /// Set the quantity of an existing line. Zero or less removes it.
    SetQuantity {
        product_id: ProductId,
        quantity: i64,
    },
    /// Drop every line.
    Clear,
    /// Replace all lines with a restored snapshot.
    LoadSnapshot(Vec<CartLine>),
}

/// In-memory cart.
///
/// Invariants:
/// - at most one line per product id, kept in insertion order
/// - `total` is the sum of unit price times quantity over `lines`
/// - `count` is the sum of quantities over `lines`
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct CartState {
    lines: Vec<CartLine>,
    total: Decimal,
    count: u64,
}

impl CartState {
    /// Create an empty cart.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a cart from existing lines, as [`CartAction::LoadSnapshot`] would.
    #[must_use]
    pub fn from_lines(lines: Vec<CartLine>) -> Self {
        let mut state = Self {
            lines,
            ..Self::default()
        };
        state.recompute();
        state
    }

    /// Lines in insertion order.
    #[must_use]
    pub fn lines(&self) -> &[CartLine] {
        &self.lines
    }

    /// Sum of line totals.
    #[must_use]
    pub const fn total(&self) -> Decimal {
        self.total
    }

    /// Number of units across all lines.
    #[must_use]
    pub const fn count(&self) -> u64 {
        self.count
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    /// Look up the line for a product.
    #[must_use]
    pub fn line(&self, product_id: &ProductId) -> Option<&CartLine> {
        self.lines.iter().find(|line| &line.product.id == product_id)
    }

    /// Quantity held for a product, 0 if absent.
    #[must_use]
    pub fn quantity_of(&self, product_id: &ProductId) -> u32 {
        self.line(product_id).map_or(0, |line| line.quantity)
    }

    /// Apply an action and recompute the derived fields.
    pub fn apply(&mut self, action: CartAction) {
        match action {
            CartAction::AddLine(product) => {
                if let Some(line) = self
                    .lines
                    .iter_mut()
                    .find(|line| line.product.id == product.id)
                {
                    line.quantity = line.quantity.saturating_add(1);
                } else {
                    self.lines.push(CartLine::new(product, 1));
                }
            }
            CartAction::RemoveLine(product_id) => {
                self.lines.retain(|line| line.product.id != product_id);
            }
            CartAction::SetQuantity {
                product_id,
                quantity,
            } => {
                let quantity = quantity.max(0);
                if quantity == 0 {
                    self.lines.retain(|line| line.product.id != product_id);
                } else if let Some(line) = self
                    .lines
                    .iter_mut()
                    .find(|line| line.product.id == product_id)
                {
                    line.quantity = u32::try_from(quantity).unwrap_or(u32::MAX);
                }
            }
            CartAction::Clear => self.lines.clear(),
            CartAction::LoadSnapshot(lines) => self.lines = lines,
        }

        self.recompute();
    }

    /// Consume the state and return its lines.
    #[must_use]
    pub fn into_lines(self) -> Vec<CartLine> {
        self.lines
    }

    fn recompute(&mut self) {
        self.total = self.lines.iter().map(CartLine::line_total).sum();
        self.count = self.lines.iter().map(|line| u64::from(line.quantity)).sum();
    }
}

/// Functional form of [`CartState::apply`].
#[must_use]
pub fn reduce(mut state: CartState, action: CartAction) -> CartState {
    state.apply(action);
    state
}

/// Product with the given id and price in cents.
#[cfg(test)]
pub(crate) fn test_product(id: &str, cents: i64) -> Product {
    Product::new(id, format!("Product {id}"), Decimal::new(cents, 2))
}
