//! Persisted cart snapshots.
//!
//! A snapshot is the JSON form of a user's cart lines, stored on the device
//! under `cart_<user id>`. Snapshots are written as a versioned envelope:
//!
//! ```json
//! {"version": 1, "lines": [{"product": {"id": "1", "name": "...", "price": "25.99"}, "quantity": 2}]}
//! ```
//!
//! Carts saved by the web storefront live under `shahiMedicalsCart_<user id>`
//! as a bare array (`[{"product": {...}, "quantity": 2}]`). [`decode`] accepts
//! that shape too, and [`legacy_snapshot_key`] names where to find it so a
//! cart can be carried over the first time a user signs in here.
//!
//! Stored content is never trusted: [`decode`] validates the shape, the
//! version and every line. Callers treat any [`SnapshotError`] as an empty
//! cart.

use std::collections::HashSet;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::CartLine;
use crate::types::Identity;

/// Current envelope version.
pub const SNAPSHOT_VERSION: u32 = 1;

/// Prefix for snapshot storage keys.
pub const SNAPSHOT_KEY_PREFIX: &str = "cart_";

/// Prefix used by the web storefront for its cart storage keys.
pub const LEGACY_SNAPSHOT_KEY_PREFIX: &str = "shahiMedicalsCart_";

/// Reasons a stored snapshot was rejected.
#[derive(Debug, thiserror::Error)]
pub enum SnapshotError {
    /// Not JSON, or JSON that does not match the line schema.
    #[error("malformed snapshot: {0}")]
    Malformed(#[from] serde_json::Error),
    /// Valid JSON that is neither an envelope nor a legacy array.
    #[error("unrecognised snapshot shape: expected object or array, got {0}")]
    UnexpectedShape(&'static str),
    /// Envelope written by a newer (or unknown) release.
    #[error("unsupported snapshot version {0}")]
    UnsupportedVersion(u64),
    /// A line breaks a cart invariant.
    #[error("invalid line {index}: {reason}")]
    InvalidLine {
        /// Position of the offending line.
        index: usize,
        /// What was wrong with it.
        reason: &'static str,
    },
}

#[derive(Serialize)]
struct EnvelopeRef<'a> {
    version: u32,
    lines: &'a [CartLine],
}

#[derive(Deserialize)]
struct Envelope {
    version: u64,
    lines: Vec<CartLine>,
}

/// Storage key for an identity's snapshot. Anonymous carts are never stored.
#[must_use]
pub fn snapshot_key(identity: &Identity) -> Option<String> {
    identity
        .user_id()
        .map(|id| format!("{SNAPSHOT_KEY_PREFIX}{id}"))
}

/// Key the web storefront stored this identity's cart under, if any.
#[must_use]
pub fn legacy_snapshot_key(identity: &Identity) -> Option<String> {
    identity
        .user_id()
        .map(|id| format!("{LEGACY_SNAPSHOT_KEY_PREFIX}{id}"))
}

/// Serialize lines into the current envelope format.
///
/// # Errors
///
/// Returns `serde_json::Error` if serialization fails.
pub fn encode(lines: &[CartLine]) -> Result<String, serde_json::Error> {
    serde_json::to_string(&EnvelopeRef {
        version: SNAPSHOT_VERSION,
        lines,
    })
}

/// Parse and validate a stored snapshot.
///
/// # Errors
///
/// Returns `SnapshotError` if the content is not valid JSON, has an
/// unexpected shape or version, or contains a line that would break a cart
/// invariant (zero quantity, empty product id, duplicate product).
pub fn decode(raw: &str) -> Result<Vec<CartLine>, SnapshotError> {
    let value: Value = serde_json::from_str(raw)?;

    let lines = match value {
        Value::Array(_) => serde_json::from_value::<Vec<CartLine>>(value)?,
        Value::Object(ref map) => {
            let version = map.get("version").and_then(Value::as_u64).unwrap_or(0);
            if version != u64::from(SNAPSHOT_VERSION) {
                return Err(SnapshotError::UnsupportedVersion(version));
            }
            serde_json::from_value::<Envelope>(value)?.lines
        }
        Value::Null => return Err(SnapshotError::UnexpectedShape("null")),
        Value::Bool(_) => return Err(SnapshotError::UnexpectedShape("boolean")),
        Value::Number(_) => return Err(SnapshotError::UnexpectedShape("number")),
        Value::String(_) => return Err(SnapshotError::UnexpectedShape("string")),
    };

    validate(&lines)?;
    Ok(lines)
}

fn validate(lines: &[CartLine]) -> Result<(), SnapshotError> {
    let mut seen = HashSet::with_capacity(lines.len());

    for (index, line) in lines.iter().enumerate() {
        if line.quantity == 0 {
            return Err(SnapshotError::InvalidLine {
                index,
                reason: "quantity must be at least 1",
            });
        }
        if line.product.id.as_str().is_empty() {
            return Err(SnapshotError::InvalidLine {
                index,
                reason: "product id is empty",
            });
        }
        if !seen.insert(&line.product.id) {
            return Err(SnapshotError::InvalidLine {
                index,
                reason: "duplicate product",
            });
        }
    }

    Ok(())
}
