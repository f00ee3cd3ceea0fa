//! Catalog commands.

use rust_decimal::Decimal;

use shahi_core::{Price, ProductId};
use shahi_storefront::error::AppError;
use shahi_storefront::services::NewProduct;
use shahi_storefront::session::SessionContext;
use shahi_storefront::state::AppState;

/// Log every active product, or only those in one category.
///
/// # Errors
///
/// Returns an error if the catalog cannot be fetched.
pub async fn list(state: &AppState, category: Option<&str>) -> Result<(), AppError> {
    let products = match category {
        Some(category) => {
            let products = state.catalog().products_in_category(category).await?;
            tracing::info!("{} product(s) in {category}", products.len());
            products
        }
        None => {
            let products = state.catalog().active_products().await?;
            tracing::info!("{} active product(s)", products.len());
            products.to_vec()
        }
    };

    for product in products.iter() {
        let rx = if product.prescription { " [Rx]" } else { "" };
        tracing::info!(
            "  {} | {}{} | {} | {} | stock {}",
            product.id,
            product.name,
            rx,
            product.category,
            Price::from(product.price).display(),
            product.stock,
        );
    }
    Ok(())
}

/// Add a product to the catalog.
///
/// # Errors
///
/// Returns an error without staff access, for invalid fields, or if the
/// backend rejects the insert.
pub async fn create(
    state: &AppState,
    session: &SessionContext,
    product: &NewProduct,
) -> Result<(), AppError> {
    let created = state
        .catalog()
        .create_product(session.capabilities(), product)
        .await?;
    tracing::info!("Created product {} ({})", created.name, created.id);
    Ok(())
}

/// Fields to change on an existing product.
#[derive(Debug, Default)]
pub struct ProductChanges {
    pub name: Option<String>,
    pub price: Option<Decimal>,
    pub stock: Option<i32>,
    pub category: Option<String>,
    pub description: Option<String>,
}

/// Edit an active product, keeping any field not given.
///
/// # Errors
///
/// Returns an error if the product is not active, without staff access, for
/// invalid fields, or if the backend rejects the update.
pub async fn update(
    state: &AppState,
    session: &SessionContext,
    product_id: &ProductId,
    changes: ProductChanges,
) -> Result<(), AppError> {
    let mut product = state.catalog().product(product_id).await?;
    if let Some(name) = changes.name {
        product.name = name;
    }
    if let Some(price) = changes.price {
        product.price = price;
    }
    if let Some(stock) = changes.stock {
        product.stock = stock;
    }
    if let Some(category) = changes.category {
        product.category = category;
    }
    if let Some(description) = changes.description {
        product.description = description;
    }

    state
        .catalog()
        .update_product(session.capabilities(), &product)
        .await?;
    tracing::info!("Updated product {} ({})", product.name, product.id);
    Ok(())
}

/// Hide a product from the storefront.
///
/// # Errors
///
/// Returns an error without staff access or if the backend rejects the update.
pub async fn deactivate(
    state: &AppState,
    session: &SessionContext,
    product_id: &ProductId,
) -> Result<(), AppError> {
    state
        .catalog()
        .deactivate_product(session.capabilities(), product_id)
        .await?;
    tracing::info!("Deactivated product {product_id}");
    Ok(())
}
