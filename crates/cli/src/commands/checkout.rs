//! Checkout and order management commands.

use shahi_core::{OrderId, OrderStatus, Price};
use shahi_storefront::error::AppError;
use shahi_storefront::services::CustomerInfo;
use shahi_storefront::services::checkout::{
    delete_order, list_orders, place_order, update_order_status,
};
use shahi_storefront::session::SessionContext;
use shahi_storefront::state::{AppState, StorefrontCart};

/// Place an order for the whole cart.
///
/// # Errors
///
/// Returns an error if the user is anonymous, a delivery field is blank, the
/// cart is empty, or the backend rejects the order.
pub async fn place(
    state: &AppState,
    cart: &mut StorefrontCart,
    customer: &CustomerInfo,
) -> Result<(), AppError> {
    let receipt = place_order(cart, state.backend(), customer).await?;

    tracing::info!("Order placed successfully!");
    tracing::info!("  Reference: #{}", receipt.reference);
    tracing::info!("  Items: {}", receipt.item_count);
    tracing::info!("  Total: {}", Price::from(receipt.total).display());
    tracing::info!("  Status: {}", receipt.status);
    Ok(())
}

/// Log every order with its items, newest first.
///
/// # Errors
///
/// Returns an error without staff access or if the backend request fails.
pub async fn list(state: &AppState, session: &SessionContext) -> Result<(), AppError> {
    let orders = list_orders(state.backend(), session.capabilities()).await?;
    tracing::info!("{} order(s)", orders.len());

    for order in &orders {
        let placed = order
            .created_at
            .map_or_else(|| "-".to_string(), |at| at.format("%Y-%m-%d %H:%M").to_string());
        tracing::info!(
            "  #{} | {} | {} | {} | {}",
            order.reference,
            placed,
            order.user_id,
            Price::from(order.total).display(),
            order.status,
        );
        for item in &order.items {
            tracing::info!(
                "      {} x{} @ {}",
                item.product_name,
                item.quantity,
                Price::from(item.price).display(),
            );
        }
    }
    Ok(())
}

/// Move an order to a new status.
///
/// # Errors
///
/// Returns an error for an unknown status, without staff access, or if the
/// backend rejects the update.
pub async fn set_status(
    state: &AppState,
    session: &SessionContext,
    order_id: &str,
    status: &str,
) -> Result<(), AppError> {
    let status: OrderStatus = status.parse().map_err(AppError::BadRequest)?;
    let order_id = OrderId::new(order_id);

    update_order_status(state.backend(), session.capabilities(), &order_id, status).await?;
    tracing::info!("Order {order_id} is now {status}");
    Ok(())
}

/// Delete an order and its items.
///
/// # Errors
///
/// Returns an error without staff access or if the backend rejects a delete.
pub async fn delete(
    state: &AppState,
    session: &SessionContext,
    order_id: &str,
) -> Result<(), AppError> {
    let order_id = OrderId::new(order_id);
    delete_order(state.backend(), session.capabilities(), &order_id).await?;
    tracing::info!("Deleted order {order_id}");
    Ok(())
}
