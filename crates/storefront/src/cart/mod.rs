//! Cart synchronization.
//!
//! [`CartController`] owns the in-memory [`CartState`] for the current
//! shopper and keeps two copies of it up to date:
//!
//! - a **local snapshot** in a [`SnapshotStore`], rewritten after every
//!   change and reloaded whenever the identity changes. This is what restores
//!   a cart across sessions on the same device.
//! - a **remote mirror** behind [`RemoteMirror`], written fire-and-forget.
//!   Failed writes are logged and dropped; they never roll back local state
//!   and the mirror is never read back.
//!
//! Writes to the mirror run as independent tasks with no ordering between
//! them, so two quick quantity changes for the same product can land in
//! either order remotely.
//!
//! # Example
//!
//! ```rust,ignore
//! let mut cart = CartController::new(FileSnapshotStore::new(dir), backend);
//! cart.set_identity(Identity::User(user_id));
//! cart.add_item(product)?;
//! cart.flush().await;
//! ```

pub mod mirror;
pub mod store;

use std::sync::Arc;

use thiserror::Error;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, instrument, warn};

use shahi_core::cart::snapshot::{self, legacy_snapshot_key, snapshot_key};
use shahi_core::{CartAction, CartLine, CartState, Identity, Product, ProductId, UserId};

use crate::backend::rows::CartItemRow;

pub use mirror::RemoteMirror;
pub use store::{FileSnapshotStore, MemorySnapshotStore, SnapshotStore, SnapshotStoreError};

/// Errors reported to callers of cart mutators.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CartError {
    /// The shopper must sign in before changing the cart.
    #[error("authentication required: you need to be logged in to change your cart")]
    AuthenticationRequired,
}

/// Owner of the current cart and its synchronization.
///
/// Construct one per application root and pass it by reference to whatever
/// renders or mutates the cart. Mutators are synchronous; remote writes are
/// spawned on the current Tokio runtime.
pub struct CartController<S, M> {
    state: CartState,
    identity: Identity,
    store: S,
    mirror: Arc<M>,
    in_flight: Vec<JoinHandle<()>>,
}

impl<S, M> CartController<S, M>
where
    S: SnapshotStore,
    M: RemoteMirror,
{
    /// Create a controller with an empty, anonymous cart.
    #[must_use]
    pub fn new(store: S, mirror: M) -> Self {
        Self {
            state: CartState::new(),
            identity: Identity::Anonymous,
            store,
            mirror: Arc::new(mirror),
            in_flight: Vec::new(),
        }
    }

    /// Current cart (lines, total and count).
    #[must_use]
    pub const fn state(&self) -> &CartState {
        &self.state
    }

    /// Identity the cart currently belongs to.
    #[must_use]
    pub const fn identity(&self) -> &Identity {
        &self.identity
    }

    /// Switch to a new identity.
    ///
    /// Signing in (or switching users) replaces the cart with that user's
    /// local snapshot, or an empty cart if none exists or it cannot be read.
    /// When no snapshot exists yet, a cart saved by the web storefront is
    /// carried over and its old key removed once the new snapshot is written.
    /// Signing out clears the cart without touching any stored snapshot.
    /// Setting the identity that is already active does nothing.
    #[instrument(skip(self), fields(from = %self.identity))]
    pub fn set_identity(&mut self, identity: Identity) {
        if identity == self.identity {
            return;
        }
        self.identity = identity;

        let Some(key) = snapshot_key(&self.identity) else {
            debug!("Signed out, clearing cart");
            self.state.apply(CartAction::Clear);
            return;
        };

        let (lines, legacy_key) = match self.read_snapshot(&key) {
            Some(lines) => (lines, None),
            None => legacy_snapshot_key(&self.identity)
                .and_then(|legacy| Some((self.read_snapshot(&legacy)?, Some(legacy))))
                .unwrap_or_default(),
        };

        info!(lines = lines.len(), "Restored cart from local snapshot");
        self.state.apply(CartAction::LoadSnapshot(lines));
        let saved = self.persist();

        if let Some(legacy) = legacy_key.filter(|_| saved) {
            match self.store.remove(&legacy) {
                Ok(()) => info!(from = %legacy, to = %key, "Migrated web storefront cart"),
                Err(e) => warn!(key = %legacy, error = %e, "Failed to remove migrated snapshot"),
            }
        }
    }

    /// Add one unit of a product.
    ///
    /// # Errors
    ///
    /// Returns `CartError::AuthenticationRequired` when nobody is signed in;
    /// the cart is left untouched.
    #[instrument(skip(self, product), fields(product_id = %product.id))]
    pub fn add_item(&mut self, product: Product) -> Result<(), CartError> {
        let user_id = self.require_user()?;
        let product_id = product.id.clone();

        self.dispatch(CartAction::AddLine(product));
        self.sync_line(user_id, product_id);
        Ok(())
    }

    /// Remove a product's line. Removing an absent product is a no-op.
    ///
    /// # Errors
    ///
    /// Returns `CartError::AuthenticationRequired` when nobody is signed in.
    #[instrument(skip(self))]
    pub fn remove_item(&mut self, product_id: &ProductId) -> Result<(), CartError> {
        let user_id = self.require_user()?;

        self.dispatch(CartAction::RemoveLine(product_id.clone()));
        self.sync_line(user_id, product_id.clone());
        Ok(())
    }

    /// Set a product's quantity. Zero or negative removes the line.
    ///
    /// # Errors
    ///
    /// Returns `CartError::AuthenticationRequired` when nobody is signed in.
    #[instrument(skip(self))]
    pub fn update_quantity(&mut self, product_id: &ProductId, quantity: i64) -> Result<(), CartError> {
        let user_id = self.require_user()?;

        self.dispatch(CartAction::SetQuantity {
            product_id: product_id.clone(),
            quantity,
        });
        self.sync_line(user_id, product_id.clone());
        Ok(())
    }

    /// Empty the cart. While signed in this also clears the remote mirror.
    #[instrument(skip(self))]
    pub fn clear_cart(&mut self) {
        self.dispatch(CartAction::Clear);

        if let Some(user_id) = self.identity.user_id().cloned() {
            let mirror = Arc::clone(&self.mirror);
            self.spawn_write(async move {
                if let Err(e) = mirror.clear(user_id.clone()).await {
                    error!(user_id = %user_id, error = %e, "Failed to clear remote cart");
                }
            });
        }
    }

    /// Wait for every in-flight remote write to finish.
    ///
    /// Write failures have already been logged and are not reported here.
    pub async fn flush(&mut self) {
        for handle in std::mem::take(&mut self.in_flight) {
            if let Err(e) = handle.await {
                warn!(error = %e, "Remote cart write task did not complete");
            }
        }
    }

    /// Number of remote writes that have not finished yet.
    #[must_use]
    pub fn pending_writes(&self) -> usize {
        self.in_flight.iter().filter(|h| !h.is_finished()).count()
    }

    // =========================================================================
    // Internals
    // =========================================================================

    fn require_user(&self) -> Result<UserId, CartError> {
        self.identity.user_id().cloned().ok_or_else(|| {
            debug!("Cart change refused for anonymous shopper");
            CartError::AuthenticationRequired
        })
    }

    /// Apply an action and persist the result for the current identity.
    fn dispatch(&mut self, action: CartAction) {
        self.state.apply(action);
        self.persist();
    }

    /// Stored lines under `key`: `None` when nothing usable is stored there,
    /// empty when the snapshot exists but is unreadable.
    fn read_snapshot(&self, key: &str) -> Option<Vec<CartLine>> {
        match self.store.load(key) {
            Ok(Some(raw)) => Some(snapshot::decode(&raw).unwrap_or_else(|e| {
                warn!(key = %key, error = %e, "Discarding unreadable cart snapshot");
                Vec::new()
            })),
            Ok(None) => None,
            Err(e) => {
                warn!(key = %key, error = %e, "Failed to read cart snapshot");
                None
            }
        }
    }

    /// Write the current lines for the current identity. Returns whether a
    /// snapshot was written; failures are logged and never surface.
    fn persist(&self) -> bool {
        let Some(key) = snapshot_key(&self.identity) else {
            return false;
        };

        let result = snapshot::encode(self.state.lines())
            .map_err(|e| e.to_string())
            .and_then(|raw| self.store.save(&key, &raw).map_err(|e| e.to_string()));

        if let Err(e) = &result {
            warn!(key = %key, error = %e, "Failed to persist cart snapshot");
        }
        result.is_ok()
    }

    /// Mirror the current quantity of one product: upsert if held, delete if not.
    fn sync_line(&mut self, user_id: UserId, product_id: ProductId) {
        let quantity = self.state.quantity_of(&product_id);
        let mirror = Arc::clone(&self.mirror);

        self.spawn_write(async move {
            let result = if quantity == 0 {
                mirror.delete(user_id.clone(), product_id.clone()).await
            } else {
                mirror
                    .upsert(CartItemRow {
                        user_id: user_id.clone(),
                        product_id: product_id.clone(),
                        quantity,
                    })
                    .await
            };

            if let Err(e) = result {
                error!(
                    user_id = %user_id,
                    product_id = %product_id,
                    quantity,
                    error = %e,
                    "Failed to sync cart item"
                );
            }
        });
    }

    fn spawn_write<F>(&mut self, write: F)
    where
        F: Future<Output = ()> + Send + 'static,
    {
        self.in_flight.retain(|h| !h.is_finished());
        self.in_flight.push(tokio::spawn(write));
    }
}
