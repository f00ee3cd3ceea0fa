//! Cart commands.
//!
//! The cart is restored from the local snapshot for `--user`, changed, and
//! written back. Remote mirror writes are awaited before the process exits.

use shahi_core::{Price, ProductId};
use shahi_storefront::error::{AppError, add_breadcrumb};
use shahi_storefront::state::{AppState, StorefrontCart};

/// Add one unit of a catalog product.
///
/// # Errors
///
/// Returns an error if the product is not in the catalog or the user is
/// not signed in.
pub async fn add(
    state: &AppState,
    cart: &mut StorefrontCart,
    product_id: &ProductId,
) -> Result<(), AppError> {
    let product = state.catalog().product(product_id).await?;
    if !product.in_stock() {
        tracing::warn!(product_id = %product_id, "Adding a product that is out of stock");
    }

    cart.add_item(product)?;
    add_breadcrumb("cart", "Added item", Some(&[("product_id", product_id.as_str())]));
    Ok(())
}

/// Remove a product entirely.
///
/// # Errors
///
/// Returns an error if the user is not signed in.
pub fn remove(cart: &mut StorefrontCart, product_id: &ProductId) -> Result<(), AppError> {
    cart.remove_item(product_id)?;
    add_breadcrumb("cart", "Removed item", Some(&[("product_id", product_id.as_str())]));
    Ok(())
}

/// Set the quantity of a product already in the cart.
///
/// # Errors
///
/// Returns an error if the user is not signed in.
pub fn set(
    cart: &mut StorefrontCart,
    product_id: &ProductId,
    quantity: i64,
) -> Result<(), AppError> {
    if cart.state().line(product_id).is_none() {
        tracing::warn!(product_id = %product_id, "Product is not in the cart");
    }

    cart.update_quantity(product_id, quantity)?;
    add_breadcrumb("cart", "Changed quantity", Some(&[("product_id", product_id.as_str())]));
    Ok(())
}

/// Empty the cart.
pub fn clear(cart: &mut StorefrontCart) {
    cart.clear_cart();
    add_breadcrumb("cart", "Cleared cart", None);
}

/// Log the cart contents and totals.
pub fn show(cart: &StorefrontCart) {
    let state = cart.state();
    if state.is_empty() {
        tracing::info!("Cart is empty ({})", cart.identity());
        return;
    }

    tracing::info!("Cart for {}:", cart.identity());
    for line in state.lines() {
        tracing::info!(
            "  {:>3} x {} [{}] @ {} = {}",
            line.quantity,
            line.product.name,
            line.product.id,
            Price::from(line.product.price).display(),
            Price::from(line.line_total()).display(),
        );
    }
    tracing::info!(
        "  {} item(s), total {}",
        state.count(),
        Price::from(state.total()).display()
    );
}
