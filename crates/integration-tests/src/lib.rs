//! Integration tests for the Shahi Medicals storefront.
//!
//! # Running Tests
//!
//! ```bash
//! cargo test -p shahi-integration-tests
//! ```
//!
//! # Test Categories
//!
//! - `cart_sync` - Cart controller behavior across sign-in, sign-out and
//!   user switches, with a recording remote mirror
//! - `file_snapshots` - Cart restore from on-disk snapshots across
//!   controller instances
//!
//! No test here talks to a real backend. The helpers below stand in for it.

#![cfg_attr(not(test), forbid(unsafe_code))]

use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use rust_decimal::Decimal;

use shahi_core::{Product, ProductId, UserId};
use shahi_storefront::backend::BackendError;
use shahi_storefront::backend::rows::CartItemRow;
use shahi_storefront::cart::RemoteMirror;

/// A catalog product with a price in paise.
#[must_use]
pub fn product(id: &str, name: &str, paise: i64) -> Product {
    Product {
        stock: 100,
        ..Product::new(id, name, Decimal::new(paise, 2))
    }
}

/// One write received by a [`RecordingMirror`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MirrorWrite {
    Upsert {
        user_id: UserId,
        product_id: ProductId,
        quantity: u32,
    },
    Delete {
        user_id: UserId,
        product_id: ProductId,
    },
    Clear {
        user_id: UserId,
    },
}

/// Remote mirror that records every write it completes.
///
/// Clones share the same log, so a test keeps one clone and hands the other
/// to the controller.
#[derive(Debug, Clone, Default)]
pub struct RecordingMirror {
    writes: Arc<Mutex<Vec<MirrorWrite>>>,
    delay: Option<Duration>,
    offline: bool,
}

impl RecordingMirror {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// A mirror whose writes all fail after being recorded.
    #[must_use]
    pub fn offline() -> Self {
        Self {
            offline: true,
            ..Self::default()
        }
    }

    /// A mirror that sleeps before completing each write.
    #[must_use]
    pub fn slow(delay: Duration) -> Self {
        Self {
            delay: Some(delay),
            ..Self::default()
        }
    }

    /// Writes completed so far, in completion order.
    #[must_use]
    pub fn writes(&self) -> Vec<MirrorWrite> {
        self.writes
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    async fn record(&self, write: MirrorWrite) -> Result<(), BackendError> {
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        self.writes
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(write);

        if self.offline {
            Err(BackendError::Api {
                status: 503,
                message: "Service Unavailable".to_string(),
            })
        } else {
            Ok(())
        }
    }
}

impl RemoteMirror for RecordingMirror {
    async fn upsert(&self, row: CartItemRow) -> Result<(), BackendError> {
        self.record(MirrorWrite::Upsert {
            user_id: row.user_id,
            product_id: row.product_id,
            quantity: row.quantity,
        })
        .await
    }

    async fn delete(&self, user_id: UserId, product_id: ProductId) -> Result<(), BackendError> {
        self.record(MirrorWrite::Delete {
            user_id,
            product_id,
        })
        .await
    }

    async fn clear(&self, user_id: UserId) -> Result<(), BackendError> {
        self.record(MirrorWrite::Clear { user_id }).await
    }
}
