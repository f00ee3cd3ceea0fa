//! Application state shared by every storefront entry point.

use std::sync::Arc;

use crate::backend::{BackendClient, BackendError};
use crate::cart::{CartController, FileSnapshotStore};
use crate::config::StorefrontConfig;
use crate::services::CatalogService;
use crate::session::SessionContext;

/// Cart controller wired to on-disk snapshots and the hosted backend.
pub type StorefrontCart = CartController<FileSnapshotStore, BackendClient>;

/// Application state shared across the storefront.
///
/// This struct is cheaply cloneable via `Arc` and provides access to the
/// backend client, the catalog cache and configuration.
#[derive(Clone)]
pub struct AppState {
    inner: Arc<AppStateInner>,
}

struct AppStateInner {
    config: StorefrontConfig,
    backend: BackendClient,
    catalog: CatalogService,
}

impl AppState {
    /// Create a new application state.
    ///
    /// # Errors
    ///
    /// Returns an error if the backend client cannot be built.
    pub fn new(config: StorefrontConfig) -> Result<Self, BackendError> {
        let backend = BackendClient::new(&config.backend)?;
        let catalog = CatalogService::new(backend.clone(), config.catalog_cache_ttl);

        Ok(Self {
            inner: Arc::new(AppStateInner {
                config,
                backend,
                catalog,
            }),
        })
    }

    /// Get a reference to the storefront configuration.
    #[must_use]
    pub fn config(&self) -> &StorefrontConfig {
        &self.inner.config
    }

    /// Get a reference to the backend client.
    #[must_use]
    pub fn backend(&self) -> &BackendClient {
        &self.inner.backend
    }

    /// Get a reference to the catalog service.
    #[must_use]
    pub fn catalog(&self) -> &CatalogService {
        &self.inner.catalog
    }

    /// Build the cart for a session and load that shopper's snapshot.
    ///
    /// Must be called from within a Tokio runtime, since cart mutators spawn
    /// their remote writes on it.
    #[must_use]
    pub fn cart_for(&self, session: &SessionContext) -> StorefrontCart {
        let store = FileSnapshotStore::new(&self.inner.config.snapshot_dir);
        let mut cart = CartController::new(store, self.inner.backend.clone());
        cart.set_identity(session.identity().clone());
        cart
    }
}
