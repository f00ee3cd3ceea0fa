//! Remote mirror of the cart in the backend's `cart_items` table.
//!
//! The mirror is written to but never read back by the cart. Local snapshots
//! remain the source of truth for restoring a cart on this device.

use std::future::Future;

use tracing::instrument;

use shahi_core::{ProductId, UserId};

use crate::backend::rows::{CART_ITEM_KEY, CartItemRow, tables};
use crate::backend::{BackendClient, BackendError, Filter};

/// Destination for per-user cart rows.
pub trait RemoteMirror: Send + Sync + 'static {
    /// Write the quantity for a `(user, product)` pair, replacing any existing row.
    fn upsert(&self, row: CartItemRow) -> impl Future<Output = Result<(), BackendError>> + Send;

    /// Delete the row for a `(user, product)` pair.
    fn delete(
        &self,
        user_id: UserId,
        product_id: ProductId,
    ) -> impl Future<Output = Result<(), BackendError>> + Send;

    /// Delete every row belonging to a user.
    fn clear(&self, user_id: UserId) -> impl Future<Output = Result<(), BackendError>> + Send;
}

impl RemoteMirror for BackendClient {
    #[instrument(skip(self), fields(user_id = %row.user_id, product_id = %row.product_id))]
    async fn upsert(&self, row: CartItemRow) -> Result<(), BackendError> {
        BackendClient::upsert(self, tables::CART_ITEMS, &[row], CART_ITEM_KEY).await
    }

    #[instrument(skip(self))]
    async fn delete(&self, user_id: UserId, product_id: ProductId) -> Result<(), BackendError> {
        BackendClient::delete(
            self,
            tables::CART_ITEMS,
            &[
                Filter::eq("user_id", &user_id),
                Filter::eq("product_id", &product_id),
            ],
        )
        .await
    }

    #[instrument(skip(self))]
    async fn clear(&self, user_id: UserId) -> Result<(), BackendError> {
        BackendClient::delete(self, tables::CART_ITEMS, &[Filter::eq("user_id", &user_id)]).await
    }
}
