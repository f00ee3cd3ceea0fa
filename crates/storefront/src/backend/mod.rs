//! Client for the hosted backend's REST table API.
//!
//! # Architecture
//!
//! - Every table is exposed at `<base>/rest/v1/<table>` with PostgREST
//!   conventions: filters are query parameters (`user_id=eq.<id>`), upserts
//!   use `Prefer: resolution=merge-duplicates`, and inserts can return the
//!   written rows with `Prefer: return=representation`.
//! - Requests carry the public anon key in `apikey` and either the signed-in
//!   user's access token or the anon key as the bearer token.
//! - The client is table-agnostic. Cart, catalog and checkout code map rows
//!   to domain types through [`rows`].
//!
//! # Example
//!
//! ```rust,ignore
//! use shahi_storefront::backend::{BackendClient, Filter};
//! use shahi_storefront::backend::rows::ProductRow;
//!
//! let client = BackendClient::new(&config.backend)?;
//! let rows: Vec<ProductRow> = client
//!     .select("products", &[Filter::eq("is_active", "true")], Some("created_at.desc"))
//!     .await?;
//! ```

pub mod rows;

use std::sync::Arc;

use reqwest::Method;
use secrecy::{ExposeSecret, SecretString};
use serde::Serialize;
use serde::de::DeserializeOwned;
use thiserror::Error;
use tracing::{debug, instrument};
use url::Url;

use crate::config::BackendConfig;

/// How much of an error body is kept for logs and messages.
const ERROR_BODY_PREVIEW: usize = 200;

/// Errors that can occur when talking to the backend.
#[derive(Debug, Error)]
pub enum BackendError {
    /// HTTP request failed.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Endpoint URL could not be built.
    #[error("Invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    /// Backend answered with a non-success status.
    #[error("API error ({status}): {message}")]
    Api {
        /// HTTP status code.
        status: u16,
        /// Error description extracted from the body.
        message: String,
    },

    /// JSON parsing failed.
    #[error("JSON parse error: {0}")]
    Parse(#[from] serde_json::Error),

    /// Resource not found.
    #[error("Not found: {0}")]
    NotFound(String),

    /// Rate limited by the backend.
    #[error("Rate limited, retry after {0} seconds")]
    RateLimited(u64),
}

/// Error body returned by the REST layer.
#[derive(Debug, Clone, serde::Deserialize)]
struct ApiErrorBody {
    #[serde(default)]
    message: String,
    #[serde(default)]
    code: Option<String>,
    #[serde(default)]
    details: Option<String>,
    #[serde(default)]
    hint: Option<String>,
}

/// Turn an error response body into a readable message.
fn format_api_error(body: &str) -> String {
    let Ok(parsed) = serde_json::from_str::<ApiErrorBody>(body) else {
        let preview: String = body.chars().take(ERROR_BODY_PREVIEW).collect();
        return if preview.is_empty() {
            "(empty response body)".to_string()
        } else {
            preview
        };
    };

    let mut parts = Vec::new();
    if !parsed.message.is_empty() {
        parts.push(parsed.message);
    }
    if let Some(code) = parsed.code {
        parts.push(format!("code: {code}"));
    }
    if let Some(details) = parsed.details {
        parts.push(format!("details: {details}"));
    }
    if let Some(hint) = parsed.hint {
        parts.push(format!("hint: {hint}"));
    }

    if parts.is_empty() {
        "(no error details provided)".to_string()
    } else {
        parts.join("; ")
    }
}

/// A single `column=op.value` query filter.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Filter {
    column: String,
    expression: String,
}

impl Filter {
    /// Equality filter (`column=eq.value`).
    #[must_use]
    pub fn eq(column: &str, value: impl std::fmt::Display) -> Self {
        Self {
            column: column.to_string(),
            expression: format!("eq.{value}"),
        }
    }
}

/// What an insert or upsert should hand back.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Returning {
    Minimal,
    Representation,
}

// =============================================================================
// BackendClient
// =============================================================================

/// Client for the backend table API.
///
/// Cheap to clone; clones share the connection pool.
#[derive(Clone)]
pub struct BackendClient {
    inner: Arc<BackendClientInner>,
}

struct BackendClientInner {
    client: reqwest::Client,
    rest_url: Url,
    anon_key: SecretString,
    access_token: Option<SecretString>,
}

impl BackendClient {
    /// Create a new backend client.
    ///
    /// # Errors
    ///
    /// Returns `BackendError::InvalidUrl` if the REST endpoint cannot be
    /// derived from the configured base URL.
    pub fn new(config: &BackendConfig) -> Result<Self, BackendError> {
        Ok(Self {
            inner: Arc::new(BackendClientInner {
                client: reqwest::Client::new(),
                rest_url: rest_endpoint(&config.url)?,
                anon_key: config.anon_key.clone(),
                access_token: config.access_token.clone(),
            }),
        })
    }

    /// URL for a table, with filters applied as query parameters.
    fn table_url(
        &self,
        table: &str,
        filters: &[Filter],
        extra: &[(&str, &str)],
    ) -> Result<Url, BackendError> {
        let mut url = self.inner.rest_url.join(table)?;
        {
            let mut pairs = url.query_pairs_mut();
            for filter in filters {
                pairs.append_pair(&filter.column, &filter.expression);
            }
            for (key, value) in extra {
                pairs.append_pair(key, value);
            }
        }
        Ok(url)
    }

    fn request(&self, method: Method, url: Url) -> reqwest::RequestBuilder {
        let bearer = self
            .inner
            .access_token
            .as_ref()
            .unwrap_or(&self.inner.anon_key);

        self.inner
            .client
            .request(method, url)
            .header("apikey", self.inner.anon_key.expose_secret())
            .bearer_auth(bearer.expose_secret())
            .header("Content-Type", "application/json")
    }

    /// Send a request and return the response body on success.
    async fn send(&self, request: reqwest::RequestBuilder) -> Result<String, BackendError> {
        let response = request.send().await?;
        let status = response.status();

        if status == reqwest::StatusCode::TOO_MANY_REQUESTS {
            let retry_after = response
                .headers()
                .get("Retry-After")
                .and_then(|v| v.to_str().ok())
                .and_then(|s| s.parse::<u64>().ok())
                .unwrap_or(1);
            return Err(BackendError::RateLimited(retry_after));
        }

        let body = response.text().await?;

        if status == reqwest::StatusCode::NOT_FOUND {
            return Err(BackendError::NotFound(format_api_error(&body)));
        }

        if !status.is_success() {
            tracing::error!(
                status = %status,
                body = %body.chars().take(500).collect::<String>(),
                "Backend returned non-success status"
            );
            return Err(BackendError::Api {
                status: status.as_u16(),
                message: format_api_error(&body),
            });
        }

        Ok(body)
    }

    fn parse_rows<T: DeserializeOwned>(body: &str) -> Result<Vec<T>, BackendError> {
        serde_json::from_str(body).map_err(|e| {
            tracing::error!(
                error = %e,
                body = %body.chars().take(500).collect::<String>(),
                "Failed to parse backend response"
            );
            BackendError::Parse(e)
        })
    }

    // =========================================================================
    // Table Operations
    // =========================================================================

    /// Select rows matching all filters.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails or rows cannot be parsed.
    pub async fn select<T: DeserializeOwned>(
        &self,
        table: &str,
        filters: &[Filter],
        order: Option<&str>,
    ) -> Result<Vec<T>, BackendError> {
        self.select_columns(table, "*", filters, order).await
    }

    /// Select rows with an explicit column list, which may embed related
    /// tables (`*,order_items(*)`).
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails or rows cannot be parsed.
    #[instrument(skip(self, filters))]
    pub async fn select_columns<T: DeserializeOwned>(
        &self,
        table: &str,
        columns: &str,
        filters: &[Filter],
        order: Option<&str>,
    ) -> Result<Vec<T>, BackendError> {
        let mut extra = vec![("select", columns)];
        if let Some(order) = order {
            extra.push(("order", order));
        }
        let url = self.table_url(table, filters, &extra)?;

        let body = self.send(self.request(Method::GET, url)).await?;
        let rows = Self::parse_rows(&body)?;
        debug!(count = rows.len(), "Selected rows");
        Ok(rows)
    }

    /// Insert rows and return what the backend stored.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails or rows cannot be parsed.
    #[instrument(skip(self, rows))]
    pub async fn insert_returning<B, T>(&self, table: &str, rows: &B) -> Result<Vec<T>, BackendError>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        let body = self
            .write(table, rows, None, Returning::Representation)
            .await?;
        Self::parse_rows(&body)
    }

    /// Insert rows without reading them back.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails.
    #[instrument(skip(self, rows))]
    pub async fn insert<B>(&self, table: &str, rows: &B) -> Result<(), BackendError>
    where
        B: Serialize + ?Sized,
    {
        self.write(table, rows, None, Returning::Minimal).await?;
        Ok(())
    }

    /// Insert rows, overwriting any that collide on `on_conflict` columns.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails.
    #[instrument(skip(self, rows))]
    pub async fn upsert<B>(&self, table: &str, rows: &B, on_conflict: &str) -> Result<(), BackendError>
    where
        B: Serialize + ?Sized,
    {
        self.write(table, rows, Some(on_conflict), Returning::Minimal)
            .await?;
        Ok(())
    }

    async fn write<B>(
        &self,
        table: &str,
        rows: &B,
        on_conflict: Option<&str>,
        returning: Returning,
    ) -> Result<String, BackendError>
    where
        B: Serialize + ?Sized,
    {
        let extra: Vec<(&str, &str)> = on_conflict
            .map(|columns| vec![("on_conflict", columns)])
            .unwrap_or_default();
        let url = self.table_url(table, &[], &extra)?;

        let mut prefer = vec![match returning {
            Returning::Minimal => "return=minimal",
            Returning::Representation => "return=representation",
        }];
        if on_conflict.is_some() {
            prefer.push("resolution=merge-duplicates");
        }

        let request = self
            .request(Method::POST, url)
            .header("Prefer", prefer.join(","))
            .body(serde_json::to_vec(rows)?);

        self.send(request).await
    }

    /// Patch every row matching the filters.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails.
    #[instrument(skip(self, filters, patch))]
    pub async fn update<B>(&self, table: &str, filters: &[Filter], patch: &B) -> Result<(), BackendError>
    where
        B: Serialize + ?Sized,
    {
        let url = self.table_url(table, filters, &[])?;
        let request = self
            .request(Method::PATCH, url)
            .header("Prefer", "return=minimal")
            .body(serde_json::to_vec(patch)?);
        self.send(request).await?;
        Ok(())
    }

    /// Delete every row matching the filters.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails.
    #[instrument(skip(self, filters))]
    pub async fn delete(&self, table: &str, filters: &[Filter]) -> Result<(), BackendError> {
        let url = self.table_url(table, filters, &[])?;
        self.send(self.request(Method::DELETE, url)).await?;
        Ok(())
    }
}

/// `<base>/rest/v1/`, keeping any path prefix on the base URL.
fn rest_endpoint(base: &Url) -> Result<Url, url::ParseError> {
    let mut base = base.clone();
    if !base.path().ends_with('/') {
        let path = format!("{}/", base.path());
        base.set_path(&path);
    }
    base.join("rest/v1/")
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
pub(crate) mod test_support {
    use secrecy::SecretString;
    use url::Url;

    use super::BackendClient;
    use crate::config::BackendConfig;

    /// Anon key sent by [`client`].
    pub const ANON_KEY: &str = "anon";

    /// Client for a backend at `base` with no signed-in user.
    pub fn client(base: &str) -> BackendClient {
        BackendClient::new(&BackendConfig {
            url: Url::parse(base).unwrap(),
            anon_key: SecretString::from(ANON_KEY),
            access_token: None,
        })
        .unwrap()
    }

    /// Client that nothing answers, for requests that must fail.
    pub fn offline() -> BackendClient {
        client("http://127.0.0.1:9")
    }
}
