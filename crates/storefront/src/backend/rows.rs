//! Row shapes for backend tables and their conversions to domain types.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use shahi_core::{OrderId, OrderStatus, Product, ProductId, UserId};

/// Table names.
pub mod tables {
    pub const PRODUCTS: &str = "products";
    pub const CART_ITEMS: &str = "cart_items";
    pub const ORDERS: &str = "orders";
    pub const ORDER_ITEMS: &str = "order_items";
}

/// Manufacturer shown for products from the backend catalog.
pub const HOUSE_MANUFACTURER: &str = "Shahi Medicals";

/// Category used when a product row has none.
pub const DEFAULT_CATEGORY: &str = "General";

/// A row of the `products` table.
#[derive(Debug, Clone, Deserialize)]
pub struct ProductRow {
    pub id: ProductId,
    pub name: String,
    pub description: Option<String>,
    pub price: Decimal,
    pub image_url: Option<String>,
    pub category: Option<String>,
    #[serde(default)]
    pub stock_quantity: i32,
    #[serde(default = "default_true")]
    pub is_active: bool,
    pub created_at: Option<DateTime<Utc>>,
}

const fn default_true() -> bool {
    true
}

impl From<ProductRow> for Product {
    fn from(row: ProductRow) -> Self {
        Self {
            id: row.id,
            name: row.name,
            description: row.description.unwrap_or_default(),
            price: row.price,
            category: row
                .category
                .filter(|c| !c.is_empty())
                .unwrap_or_else(|| DEFAULT_CATEGORY.to_string()),
            image: row.image_url.unwrap_or_default(),
            stock: row.stock_quantity,
            manufacturer: HOUSE_MANUFACTURER.to_string(),
            prescription: false,
            dosage: None,
            side_effects: None,
        }
    }
}

/// Columns written when creating or editing a product.
#[derive(Debug, Clone, Serialize)]
pub struct ProductWrite<'a> {
    pub name: &'a str,
    pub description: &'a str,
    pub price: Decimal,
    pub image_url: &'a str,
    pub category: &'a str,
    pub stock_quantity: i32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub is_active: Option<bool>,
}

/// Soft-delete patch for `products`.
#[derive(Debug, Clone, Copy, Serialize)]
pub struct ProductActivePatch {
    pub is_active: bool,
}

/// A row of the `cart_items` table, keyed by `(user_id, product_id)`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CartItemRow {
    pub user_id: UserId,
    pub product_id: ProductId,
    pub quantity: u32,
}

/// Conflict target for cart upserts.
pub const CART_ITEM_KEY: &str = "user_id,product_id";

/// Columns written when placing an order.
#[derive(Debug, Clone, Serialize)]
pub struct NewOrderRow<'a> {
    pub user_id: &'a UserId,
    pub total_amount: Decimal,
    pub status: OrderStatus,
    pub shipping_address: &'a str,
    pub phone: &'a str,
}

/// A row of the `orders` table.
#[derive(Debug, Clone, Deserialize)]
pub struct OrderRow {
    pub id: OrderId,
    pub user_id: UserId,
    pub total_amount: Decimal,
    pub status: String,
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub shipping_address: Option<String>,
    #[serde(default)]
    pub phone: Option<String>,
}

impl OrderRow {
    /// Parsed status; unknown values are reported as pending.
    #[must_use]
    pub fn status(&self) -> OrderStatus {
        self.status.parse().unwrap_or_default()
    }
}

/// A row of the `order_items` table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OrderItemRow<'a> {
    pub order_id: &'a OrderId,
    pub product_id: &'a ProductId,
    pub quantity: u32,
    /// Unit price at the time of purchase.
    pub price: Decimal,
}

/// Columns for order listings: every order column plus its items, each
/// with the ordered product's name.
pub const ORDER_WITH_ITEMS: &str = "*,order_items(product_id,quantity,price,products(name))";

/// An `orders` row with its embedded `order_items`.
#[derive(Debug, Clone, Deserialize)]
pub struct OrderWithItemsRow {
    #[serde(flatten)]
    pub order: OrderRow,
    #[serde(default)]
    pub order_items: Vec<OrderItemDetailRow>,
}

/// An embedded `order_items` row.
#[derive(Debug, Clone, Deserialize)]
pub struct OrderItemDetailRow {
    pub product_id: ProductId,
    pub quantity: u32,
    pub price: Decimal,
    /// Missing when the product row has since been deleted.
    #[serde(default)]
    pub products: Option<ProductNameRow>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ProductNameRow {
    pub name: String,
}
