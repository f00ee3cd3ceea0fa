//! Order placement from the current cart.
//!
//! Checkout writes an `orders` row with the cart total and one `order_items`
//! row per line (unit price at time of purchase), then empties the cart.
//! Unlike cart synchronization, checkout failures are returned to the caller
//! and leave the cart as it was.
//!
//! Staff sessions can also list, re-status and delete orders.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use thiserror::Error;
use tracing::{info, instrument};

use shahi_core::{OrderId, OrderStatus, ProductId, UserId};

use crate::backend::rows::{
    NewOrderRow, ORDER_WITH_ITEMS, OrderItemRow, OrderRow, OrderWithItemsRow, tables,
};
use crate::backend::{BackendClient, BackendError, Filter};
use crate::cart::{CartController, RemoteMirror, SnapshotStore};
use crate::session::Capabilities;

/// Number of trailing id characters shown to customers as the order reference.
const REFERENCE_LEN: usize = 8;

/// Errors from checkout and order management.
#[derive(Debug, Error)]
pub enum CheckoutError {
    /// Only signed-in customers can place orders.
    #[error("authentication required: please sign in to place an order")]
    AuthenticationRequired,

    /// A required delivery field was left blank.
    #[error("missing information: {0} is required")]
    MissingInformation(&'static str),

    /// Nothing to order.
    #[error("cart is empty")]
    EmptyCart,

    /// The session lacks the order management capability.
    #[error("order management requires staff access")]
    Forbidden,

    /// Backend request failed.
    #[error("backend error: {0}")]
    Backend(#[from] BackendError),
}

/// Delivery details entered at checkout.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CustomerInfo {
    pub name: String,
    pub phone: String,
    pub address: String,
    pub email: Option<String>,
}

impl CustomerInfo {
    /// First required field that is blank, in form order.
    fn missing_field(&self) -> Option<&'static str> {
        [
            ("name", &self.name),
            ("phone", &self.phone),
            ("address", &self.address),
        ]
        .into_iter()
        .find(|(_, value)| value.trim().is_empty())
        .map(|(field, _)| field)
    }
}

/// Confirmation of a placed order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OrderReceipt {
    pub order_id: OrderId,
    /// Short reference for the customer (last characters of the id).
    pub reference: String,
    pub total: Decimal,
    pub item_count: u64,
    pub status: OrderStatus,
}

/// An order as shown to staff, with what was bought.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OrderSummary {
    pub order_id: OrderId,
    pub reference: String,
    pub user_id: UserId,
    pub total: Decimal,
    pub status: OrderStatus,
    pub created_at: Option<DateTime<Utc>>,
    pub shipping_address: Option<String>,
    pub phone: Option<String>,
    pub items: Vec<OrderedItem>,
}

/// One line of a placed order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OrderedItem {
    pub product_id: ProductId,
    pub product_name: String,
    pub quantity: u32,
    /// Unit price paid.
    pub price: Decimal,
}

/// Name shown for items whose product no longer exists.
const UNKNOWN_PRODUCT: &str = "Unknown Product";

impl From<OrderWithItemsRow> for OrderSummary {
    fn from(row: OrderWithItemsRow) -> Self {
        let status = row.order.status();
        let items = row
            .order_items
            .into_iter()
            .map(|item| OrderedItem {
                product_id: item.product_id,
                product_name: item
                    .products
                    .map_or_else(|| UNKNOWN_PRODUCT.to_string(), |p| p.name),
                quantity: item.quantity,
                price: item.price,
            })
            .collect();

        Self {
            reference: order_reference(&row.order.id),
            order_id: row.order.id,
            user_id: row.order.user_id,
            total: row.order.total_amount,
            status,
            created_at: row.order.created_at,
            shipping_address: row.order.shipping_address,
            phone: row.order.phone,
            items,
        }
    }
}

/// Short customer-facing reference for an order id.
#[must_use]
pub fn order_reference(order_id: &OrderId) -> String {
    let chars: Vec<char> = order_id.as_str().chars().collect();
    let start = chars.len().saturating_sub(REFERENCE_LEN);
    chars.get(start..).unwrap_or_default().iter().collect()
}

/// Place an order for everything in the cart.
///
/// # Errors
///
/// Checked in order: `AuthenticationRequired` when anonymous,
/// `MissingInformation` for a blank name, phone or address, `EmptyCart`,
/// then `Backend` if either insert fails.
#[instrument(skip(cart, backend, customer), fields(identity = %cart.identity()))]
pub async fn place_order<S, M>(
    cart: &mut CartController<S, M>,
    backend: &BackendClient,
    customer: &CustomerInfo,
) -> Result<OrderReceipt, CheckoutError>
where
    S: SnapshotStore,
    M: RemoteMirror,
{
    let user_id = cart
        .identity()
        .user_id()
        .cloned()
        .ok_or(CheckoutError::AuthenticationRequired)?;

    if let Some(field) = customer.missing_field() {
        return Err(CheckoutError::MissingInformation(field));
    }

    if cart.state().is_empty() {
        return Err(CheckoutError::EmptyCart);
    }

    let total = cart.state().total();
    let item_count = cart.state().count();

    let order = NewOrderRow {
        user_id: &user_id,
        total_amount: total,
        status: OrderStatus::Pending,
        shipping_address: customer.address.trim(),
        phone: customer.phone.trim(),
    };
    let created: Vec<OrderRow> = backend.insert_returning(tables::ORDERS, &[order]).await?;
    let order = created.into_iter().next().ok_or_else(|| {
        BackendError::NotFound("order insert returned no row".to_string())
    })?;

    {
        let items: Vec<OrderItemRow<'_>> = cart
            .state()
            .lines()
            .iter()
            .map(|line| OrderItemRow {
                order_id: &order.id,
                product_id: &line.product.id,
                quantity: line.quantity,
                price: line.product.price,
            })
            .collect();
        backend.insert(tables::ORDER_ITEMS, &items).await?;
    }

    let receipt = OrderReceipt {
        reference: order_reference(&order.id),
        status: order.status(),
        order_id: order.id,
        total,
        item_count,
    };
    info!(
        order_id = %receipt.order_id,
        total = %receipt.total,
        items = receipt.item_count,
        "Order placed"
    );

    cart.clear_cart();
    Ok(receipt)
}

const fn require_manage(capabilities: Capabilities) -> Result<(), CheckoutError> {
    if capabilities.manage_orders {
        Ok(())
    } else {
        Err(CheckoutError::Forbidden)
    }
}

/// Every order with its items, newest first.
///
/// # Errors
///
/// Returns `CheckoutError::Forbidden` without staff access, or a backend error.
#[instrument(skip(backend))]
pub async fn list_orders(
    backend: &BackendClient,
    capabilities: Capabilities,
) -> Result<Vec<OrderSummary>, CheckoutError> {
    require_manage(capabilities)?;

    let rows: Vec<OrderWithItemsRow> = backend
        .select_columns(tables::ORDERS, ORDER_WITH_ITEMS, &[], Some("created_at.desc"))
        .await?;
    Ok(rows.into_iter().map(OrderSummary::from).collect())
}

/// Move an order to a new status.
///
/// # Errors
///
/// Returns `CheckoutError::Forbidden` without staff access, or a backend error.
#[instrument(skip(backend))]
pub async fn update_order_status(
    backend: &BackendClient,
    capabilities: Capabilities,
    order_id: &OrderId,
    status: OrderStatus,
) -> Result<(), CheckoutError> {
    #[derive(serde::Serialize)]
    struct StatusPatch {
        status: OrderStatus,
    }

    require_manage(capabilities)?;

    backend
        .update(
            tables::ORDERS,
            &[Filter::eq("id", order_id)],
            &StatusPatch { status },
        )
        .await?;

    info!("Order status changed");
    Ok(())
}

/// Delete an order and its items.
///
/// Items are deleted first since they reference the order row. If that
/// step fails the order is left in place.
///
/// # Errors
///
/// Returns `CheckoutError::Forbidden` without staff access, or a backend error.
#[instrument(skip(backend))]
pub async fn delete_order(
    backend: &BackendClient,
    capabilities: Capabilities,
    order_id: &OrderId,
) -> Result<(), CheckoutError> {
    require_manage(capabilities)?;

    backend
        .delete(tables::ORDER_ITEMS, &[Filter::eq("order_id", order_id)])
        .await?;
    backend
        .delete(tables::ORDERS, &[Filter::eq("id", order_id)])
        .await?;

    info!("Order deleted");
    Ok(())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use serde_json::{Value, json};
    use wiremock::matchers::{method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    use shahi_core::Identity;
    use shahi_core::cart::snapshot;

    use super::*;
    use crate::backend::test_support::{client, offline};
    use crate::cart::MemorySnapshotStore;
    use crate::cart::test_support::{MirrorCall, RecordingMirror, product};

    const ORDER_ID: &str = "2b7e1516-28ae-4d2a-a6d2-abf7158809cf";

    fn customer() -> CustomerInfo {
        CustomerInfo {
            name: "Ayesha Khan".to_string(),
            phone: "0300-1234567".to_string(),
            address: "12 Mall Road, Lahore".to_string(),
            email: None,
        }
    }

    #[test]
    fn test_order_reference_takes_last_eight() {
        let id = OrderId::new(ORDER_ID);
        assert_eq!(order_reference(&id), "158809cf");
        assert_eq!(order_reference(&OrderId::new("abc")), "abc");
    }

    #[test]
    fn test_missing_field_reports_first_blank() {
        let mut info = customer();
        info.phone = "  ".to_string();
        info.address = String::new();
        assert_eq!(info.missing_field(), Some("phone"));
        assert_eq!(customer().missing_field(), None);
    }

    #[tokio::test]
    async fn test_checkout_requires_sign_in_first() {
        let mut cart = CartController::new(MemorySnapshotStore::new(), RecordingMirror::default());

        let result = place_order(&mut cart, &offline(), &CustomerInfo::default()).await;
        assert!(matches!(result, Err(CheckoutError::AuthenticationRequired)));
    }

    #[tokio::test]
    async fn test_checkout_validates_before_cart() {
        let mut cart = CartController::new(MemorySnapshotStore::new(), RecordingMirror::default());
        cart.set_identity(Identity::User(UserId::new("u1")));

        let mut info = customer();
        info.name = String::new();
        let result = place_order(&mut cart, &offline(), &info).await;
        assert!(matches!(result, Err(CheckoutError::MissingInformation("name"))));

        let result = place_order(&mut cart, &offline(), &customer()).await;
        assert!(matches!(result, Err(CheckoutError::EmptyCart)));
    }

    #[tokio::test]
    async fn test_failed_checkout_keeps_cart() {
        let mut cart = CartController::new(MemorySnapshotStore::new(), RecordingMirror::default());
        cart.set_identity(Identity::User(UserId::new("u1")));
        cart.add_item(product("p1", 2599)).unwrap();

        let result = place_order(&mut cart, &offline(), &customer()).await;
        assert!(matches!(result, Err(CheckoutError::Backend(_))));
        assert_eq!(cart.state().count(), 1);
        cart.flush().await;
    }

    #[tokio::test]
    async fn test_successful_checkout_writes_order_and_clears_cart() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/rest/v1/orders"))
            .respond_with(ResponseTemplate::new(201).set_body_json(json!([{
                "id": ORDER_ID,
                "user_id": "u1",
                "total_amount": "59.48",
                "status": "pending",
                "created_at": "2025-02-01T09:30:00Z"
            }])))
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path("/rest/v1/order_items"))
            .respond_with(ResponseTemplate::new(201))
            .expect(1)
            .mount(&server)
            .await;

        let store = MemorySnapshotStore::new();
        let mirror = RecordingMirror::default();
        let mut cart = CartController::new(store.clone(), mirror.clone());
        cart.set_identity(Identity::User(UserId::new("u1")));
        let p1 = product("p1", 2599);
        cart.add_item(p1.clone()).unwrap();
        cart.add_item(p1).unwrap();
        cart.add_item(product("p2", 750)).unwrap();

        let receipt = place_order(&mut cart, &client(&server.uri()), &customer())
            .await
            .unwrap();
        cart.flush().await;

        assert_eq!(receipt.order_id, OrderId::new(ORDER_ID));
        assert_eq!(receipt.reference, "158809cf");
        assert_eq!(receipt.total, Decimal::new(5948, 2));
        assert_eq!(receipt.item_count, 3);
        assert_eq!(receipt.status, OrderStatus::Pending);

        assert!(cart.state().is_empty());
        assert!(snapshot::decode(&store.get("cart_u1").unwrap()).unwrap().is_empty());
        assert!(mirror.calls().contains(&MirrorCall::Clear(UserId::new("u1"))));

        let requests = server.received_requests().await.unwrap();
        let order = requests
            .iter()
            .find(|r| r.url.path() == "/rest/v1/orders")
            .unwrap();
        assert_eq!(
            order.headers.get("Prefer").unwrap().to_str().unwrap(),
            "return=representation"
        );
        let body: Value = order.body_json().unwrap();
        assert_eq!(body[0]["user_id"], "u1");
        assert_eq!(body[0]["total_amount"], "59.48");
        assert_eq!(body[0]["status"], "pending");
        assert_eq!(body[0]["shipping_address"], "12 Mall Road, Lahore");
        assert_eq!(body[0]["phone"], "0300-1234567");

        let items = requests
            .iter()
            .find(|r| r.url.path() == "/rest/v1/order_items")
            .unwrap();
        let body: Value = items.body_json().unwrap();
        assert_eq!(
            body,
            json!([
                {"order_id": ORDER_ID, "product_id": "p1", "quantity": 2, "price": "25.99"},
                {"order_id": ORDER_ID, "product_id": "p2", "quantity": 1, "price": "7.50"}
            ])
        );
    }

    #[tokio::test]
    async fn test_order_management_requires_staff() {
        let customer = Capabilities::default();
        let id = OrderId::new("o1");

        assert!(matches!(
            update_order_status(&offline(), customer, &id, OrderStatus::Shipped).await,
            Err(CheckoutError::Forbidden)
        ));
        assert!(matches!(
            list_orders(&offline(), customer).await,
            Err(CheckoutError::Forbidden)
        ));
        assert!(matches!(
            delete_order(&offline(), customer, &id).await,
            Err(CheckoutError::Forbidden)
        ));
    }

    #[tokio::test]
    async fn test_list_orders_newest_first_with_items() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/rest/v1/orders"))
            .and(query_param("select", ORDER_WITH_ITEMS))
            .and(query_param("order", "created_at.desc"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!([
                {
                    "id": ORDER_ID,
                    "user_id": "u2",
                    "total_amount": 12.5,
                    "status": "shipped",
                    "created_at": "2025-02-02T08:00:00Z",
                    "shipping_address": "4 Canal View",
                    "phone": "0321-7654321",
                    "order_items": [
                        {"product_id": "p3", "quantity": 1, "price": "12.50", "products": null}
                    ]
                },
                {
                    "id": "o-older",
                    "user_id": "u1",
                    "total_amount": "51.98",
                    "status": "pending",
                    "created_at": "2025-02-01T09:30:00Z",
                    "order_items": [
                        {"product_id": "p1", "quantity": 2, "price": "25.99", "products": {"name": "Paracetamol 500mg"}}
                    ]
                }
            ])))
            .expect(1)
            .mount(&server)
            .await;

        let orders = list_orders(&client(&server.uri()), Capabilities::staff())
            .await
            .unwrap();

        assert_eq!(orders.len(), 2);
        let newest = &orders[0];
        assert_eq!(newest.reference, "158809cf");
        assert_eq!(newest.status, OrderStatus::Shipped);
        assert_eq!(newest.total, Decimal::new(125, 1));
        assert_eq!(newest.shipping_address.as_deref(), Some("4 Canal View"));
        assert_eq!(newest.items[0].product_name, UNKNOWN_PRODUCT);

        let older = &orders[1];
        assert_eq!(older.phone, None);
        assert_eq!(
            older.items,
            [OrderedItem {
                product_id: ProductId::new("p1"),
                product_name: "Paracetamol 500mg".to_string(),
                quantity: 2,
                price: Decimal::new(2599, 2),
            }]
        );
    }

    #[tokio::test]
    async fn test_delete_order_removes_items_then_order() {
        let server = MockServer::start().await;
        Mock::given(method("DELETE"))
            .and(path("/rest/v1/order_items"))
            .and(query_param("order_id", "eq.o1"))
            .respond_with(ResponseTemplate::new(204))
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(method("DELETE"))
            .and(path("/rest/v1/orders"))
            .and(query_param("id", "eq.o1"))
            .respond_with(ResponseTemplate::new(204))
            .expect(1)
            .mount(&server)
            .await;

        delete_order(&client(&server.uri()), Capabilities::staff(), &OrderId::new("o1"))
            .await
            .unwrap();

        let paths: Vec<String> = server
            .received_requests()
            .await
            .unwrap()
            .iter()
            .map(|r| r.url.path().to_string())
            .collect();
        assert_eq!(paths, ["/rest/v1/order_items", "/rest/v1/orders"]);
    }

    #[tokio::test]
    async fn test_delete_order_keeps_order_when_items_fail() {
        let server = MockServer::start().await;
        Mock::given(method("DELETE"))
            .and(path("/rest/v1/order_items"))
            .respond_with(ResponseTemplate::new(500).set_body_string("boom"))
            .mount(&server)
            .await;
        Mock::given(method("DELETE"))
            .and(path("/rest/v1/orders"))
            .respond_with(ResponseTemplate::new(204))
            .expect(0)
            .mount(&server)
            .await;

        let result =
            delete_order(&client(&server.uri()), Capabilities::staff(), &OrderId::new("o1")).await;
        assert!(matches!(
            result,
            Err(CheckoutError::Backend(BackendError::Api { status: 500, .. }))
        ));
    }

    #[tokio::test]
    async fn test_update_order_status_patches_order() {
        let server = MockServer::start().await;
        Mock::given(method("PATCH"))
            .and(path("/rest/v1/orders"))
            .and(query_param("id", "eq.o1"))
            .respond_with(ResponseTemplate::new(204))
            .expect(1)
            .mount(&server)
            .await;

        update_order_status(
            &client(&server.uri()),
            Capabilities::staff(),
            &OrderId::new("o1"),
            OrderStatus::Delivered,
        )
        .await
        .unwrap();

        let requests = server.received_requests().await.unwrap();
        let body: Value = requests[0].body_json().unwrap();
        assert_eq!(body, json!({"status": "delivered"}));
    }
}
