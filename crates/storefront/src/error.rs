//! Unified error handling with Sentry integration.
//!
//! Provides a unified `AppError` that entry points return. Errors are
//! reported to Sentry once, at the edge, via [`AppError::report`], and shown
//! to shoppers through [`AppError::user_message`] so backend details never
//! reach them.

use thiserror::Error;

use crate::backend::BackendError;
use crate::cart::{CartError, SnapshotStoreError};
use crate::config::ConfigError;
use crate::services::{CatalogError, CheckoutError};

/// Application-level error type for the storefront.
#[derive(Debug, Error)]
pub enum AppError {
    /// Configuration could not be loaded.
    #[error("Config error: {0}")]
    Config(#[from] ConfigError),

    /// Backend request failed.
    #[error("Backend error: {0}")]
    Backend(#[from] BackendError),

    /// Cart mutation was refused.
    #[error("Cart error: {0}")]
    Cart(#[from] CartError),

    /// Local snapshot storage failed.
    #[error("Snapshot storage error: {0}")]
    Snapshot(#[from] SnapshotStoreError),

    /// Catalog operation failed.
    #[error("Catalog error: {0}")]
    Catalog(#[from] CatalogError),

    /// Checkout or order management failed.
    #[error("Checkout error: {0}")]
    Checkout(#[from] CheckoutError),

    /// Bad input from the user.
    #[error("Bad request: {0}")]
    BadRequest(String),
}

impl AppError {
    /// Whether this error is a fault on our side rather than the user's.
    #[must_use]
    pub const fn is_internal(&self) -> bool {
        match self {
            Self::Config(_) | Self::Backend(_) | Self::Snapshot(_) => true,
            Self::Catalog(err) => matches!(err, CatalogError::Backend(_)),
            Self::Checkout(err) => matches!(err, CheckoutError::Backend(_)),
            Self::Cart(_) | Self::BadRequest(_) => false,
        }
    }

    /// Message that is safe to show to a shopper.
    #[must_use]
    pub fn user_message(&self) -> String {
        match self {
            Self::Config(_) | Self::Snapshot(_) => "Internal error".to_string(),
            Self::Backend(BackendError::RateLimited(secs)) => {
                format!("Too many requests, please retry in {secs} seconds")
            }
            Self::Backend(_)
            | Self::Catalog(CatalogError::Backend(_))
            | Self::Checkout(CheckoutError::Backend(_)) => {
                "The store is unavailable right now, please try again".to_string()
            }
            Self::Cart(err) => err.to_string(),
            Self::Catalog(err) => err.to_string(),
            Self::Checkout(err) => err.to_string(),
            Self::BadRequest(msg) => msg.clone(),
        }
    }

    /// Capture internal errors to Sentry and log them.
    ///
    /// User errors are only logged at debug level.
    pub fn report(&self) {
        if self.is_internal() {
            let event_id = sentry::capture_error(self);
            tracing::error!(
                error = %self,
                sentry_event_id = %event_id,
                "Storefront error"
            );
        } else {
            tracing::debug!(error = %self, "User error");
        }
    }
}

/// Result type alias for `AppError`.
pub type Result<T> = std::result::Result<T, AppError>;

/// Set the Sentry user context from a user ID.
///
/// Call this after sign-in to associate errors with users.
pub fn set_sentry_user(user_id: &impl ToString, email: Option<&str>) {
    sentry::configure_scope(|scope| {
        scope.set_user(Some(sentry::User {
            id: Some(user_id.to_string()),
            email: email.map(String::from),
            ..Default::default()
        }));
    });
}

/// Add a breadcrumb for user actions.
///
/// Breadcrumbs appear in Sentry error reports to show the trail of cart
/// actions leading up to an error.
///
/// # Example
///
/// ```rust,ignore
/// add_breadcrumb("cart", "Added item", Some(&[("product_id", "123")]));
/// ```
pub fn add_breadcrumb(category: &str, message: &str, data: Option<&[(&str, &str)]>) {
    let mut breadcrumb = sentry::Breadcrumb {
        category: Some(category.to_string()),
        message: Some(message.to_string()),
        level: sentry::Level::Info,
        ..Default::default()
    };

    if let Some(pairs) = data {
        for (key, value) in pairs {
            breadcrumb.data.insert(
                (*key).to_string(),
                serde_json::Value::String((*value).to_string()),
            );
        }
    }

    sentry::add_breadcrumb(breadcrumb);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_app_error_display() {
        let err = AppError::BadRequest("quantity must be a number".to_string());
        assert_eq!(err.to_string(), "Bad request: quantity must be a number");

        let err = AppError::from(CartError::AuthenticationRequired);
        assert!(err.to_string().starts_with("Cart error: authentication required"));
    }

    #[test]
    fn test_internal_classification() {
        assert!(AppError::from(BackendError::RateLimited(5)).is_internal());
        assert!(AppError::from(CheckoutError::Backend(BackendError::NotFound("x".into()))).is_internal());
        assert!(!AppError::from(CartError::AuthenticationRequired).is_internal());
        assert!(!AppError::from(CheckoutError::EmptyCart).is_internal());
        assert!(!AppError::from(CatalogError::Forbidden).is_internal());
    }

    #[test]
    fn test_user_message_hides_backend_details() {
        let err = AppError::from(BackendError::Api {
            status: 500,
            message: "relation \"orders\" does not exist".to_string(),
        });
        assert!(!err.user_message().contains("orders"));

        let err = AppError::from(CatalogError::Backend(BackendError::NotFound(
            "products".to_string(),
        )));
        assert!(!err.user_message().contains("products"));
    }

    #[test]
    fn test_user_message_passes_user_errors_through() {
        let err = AppError::from(CheckoutError::MissingInformation("phone"));
        assert_eq!(err.user_message(), "missing information: phone is required");

        let err = AppError::from(BackendError::RateLimited(30));
        assert_eq!(
            err.user_message(),
            "Too many requests, please retry in 30 seconds"
        );
    }
}
