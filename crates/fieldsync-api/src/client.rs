//! Backend HTTP client
//!
//! Speaks the tenant-scoped REST dialect of the backend: every request
//! goes to `{base_url}/api/{slug}/{path}` with an optional bearer token,
//! the company/branch context travels as `empr`/`fili` query parameters,
//! and list endpoints answer either `{"results": [...]}` or a bare array.
//!
//! ## Failure classification
//!
//! `deliver` maps every failure into the [`RemoteError`] taxonomy that
//! drives the sync processor: transport errors become `Connectivity`,
//! rejected responses whose body names a business-rule violation become
//! `Business`, and everything else keeps its HTTP status. Classification
//! happens here because only the adapter sees both the transport error
//! and the raw response body.

use std::time::Duration;

use anyhow::{Context, Result};
use reqwest::{Client, Method, RequestBuilder, StatusCode};
use serde_json::Value;
use tracing::{debug, warn};

use fieldsync_core::config::Config;
use fieldsync_core::domain::errors::RemoteError;
use fieldsync_core::domain::queue::{HttpAction, QueuedOperation};
use fieldsync_core::domain::reference::{Customer, Product};

/// Bulk endpoint serving customer reference data
const CUSTOMERS_BULK_PATH: &str = "Os/entidades/mega/";
/// Bulk endpoint serving product reference data
const PRODUCTS_BULK_PATH: &str = "Os/produtos/mega/";
/// Free-text customer search endpoint
const CUSTOMERS_SEARCH_PATH: &str = "entidades/entidades/";
/// Free-text product search endpoint
const PRODUCTS_SEARCH_PATH: &str = "produtos/produtos/";

/// Timeout for the HEAD reachability probe
const PROBE_TIMEOUT: Duration = Duration::from_secs(5);
/// Timeout for a single queued-operation delivery
const DELIVERY_TIMEOUT: Duration = Duration::from_secs(30);
/// Timeout for reference fetch and search requests; bounds how long a
/// stalled network can delay the cached fallback
const REFERENCE_TIMEOUT: Duration = Duration::from_secs(10);

/// Lowercased body substrings the backend uses for business-rule
/// rejections (negative stock, duplicate/unique key collisions)
const BUSINESS_ERROR_MARKERS: &[&str] = &["estoque negativo", "unique", "duplicad"];

/// Longest response body carried inside an error, to keep logs readable
const MAX_ERROR_BODY_LEN: usize = 300;

// ============================================================================
// RemoteClient
// ============================================================================

/// HTTP client for the backend API
///
/// Wraps `reqwest::Client` with bearer authentication, tenant-scoped URL
/// construction, and the response-shape tolerance the backend requires.
pub struct RemoteClient {
    /// The underlying HTTP client
    client: Client,
    /// Scheme and host, without the `/api/{slug}` suffix
    base_url: String,
    /// Tenant slug inserted into every endpoint URL
    slug: String,
    /// Bearer token, when the deployment requires authentication
    bearer_token: Option<String>,
    /// Company context sent as the `empr` query parameter
    company: String,
    /// Branch context sent as the `fili` query parameter
    branch: String,
    /// Rows requested per product search
    search_limit: u32,
}

impl RemoteClient {
    /// Creates a new client from the application configuration
    pub fn new(config: &Config) -> Self {
        let base_url = config.api.base_url.clone();
        Self::with_base_url(config, base_url)
    }

    /// Creates a new client with a custom base URL (useful for testing)
    ///
    /// # Arguments
    /// * `config` - Application configuration for slug, token, and context
    /// * `base_url` - Base URL overriding `config.api.base_url`
    pub fn with_base_url(config: &Config, base_url: impl Into<String>) -> Self {
        Self {
            client: Client::new(),
            base_url: base_url.into(),
            slug: config.api.slug.clone(),
            bearer_token: config.api.bearer_token.clone(),
            company: config.api.company.clone(),
            branch: config.api.branch.clone(),
            search_limit: config.cache.search_limit,
        }
    }

    /// Builds the full URL for a tenant-scoped endpoint path
    fn endpoint_url(&self, path: &str) -> String {
        format!(
            "{}/api/{}/{}",
            self.base_url.trim_end_matches('/'),
            self.slug,
            path
        )
    }

    /// Creates an authenticated request builder for the given method and path
    fn request(&self, method: Method, path: &str) -> RequestBuilder {
        let mut builder = self.client.request(method, self.endpoint_url(path));
        if let Some(ref token) = self.bearer_token {
            builder = builder.bearer_auth(token);
        }
        builder
    }

    /// Sends one queued operation to the backend
    ///
    /// Issues exactly one request using the entry's stored method, resource
    /// path, and payload. Returns the decoded response body on success
    /// (`Value::Null` for an empty body) or a classified [`RemoteError`].
    pub async fn deliver(&self, entry: &QueuedOperation) -> Result<Value, RemoteError> {
        let method = match entry.action() {
            HttpAction::Post => Method::POST,
            HttpAction::Put => Method::PUT,
            HttpAction::Patch => Method::PATCH,
            HttpAction::Delete => Method::DELETE,
        };

        debug!(
            resource = entry.target_resource(),
            action = %entry.action(),
            "Delivering queued operation"
        );

        let response = self
            .request(method, entry.target_resource())
            .timeout(DELIVERY_TIMEOUT)
            .json(entry.payload())
            .send()
            .await
            .map_err(connectivity_error)?;

        let status = response.status();
        let body = response.text().await.map_err(connectivity_error)?;

        if !status.is_success() {
            let error = classify_rejection(status, &body);
            warn!(
                resource = entry.target_resource(),
                status = status.as_u16(),
                "Delivery rejected: {}",
                error
            );
            return Err(error);
        }

        if body.trim().is_empty() {
            return Ok(Value::Null);
        }

        serde_json::from_str(&body)
            .map_err(|e| RemoteError::Decode(format!("Invalid JSON in response: {}", e)))
    }

    /// Cheap reachability check against the backend root
    ///
    /// Sends a HEAD request to the bare base URL. Any response below 500
    /// means the backend is reachable; transport failures and server errors
    /// both count as offline.
    pub async fn probe_connectivity(&self) -> bool {
        let url = format!("{}/", self.base_url.trim_end_matches('/'));

        match self.client.head(&url).timeout(PROBE_TIMEOUT).send().await {
            Ok(response) => response.status().as_u16() < 500,
            Err(e) => {
                debug!(error = %e, "Connectivity probe failed");
                false
            }
        }
    }

    /// Bulk-fetches customer reference data, up to `limit` rows
    ///
    /// The endpoint takes the full tenant context (`empr` and `fili`).
    pub async fn fetch_customers(&self, limit: u32) -> Result<Vec<Customer>> {
        debug!(limit, "Fetching customer reference data");

        let body: Value = self
            .request(Method::GET, CUSTOMERS_BULK_PATH)
            .query(&[
                ("empr", self.company.as_str()),
                ("fili", self.branch.as_str()),
            ])
            .query(&[("limit", limit)])
            .timeout(REFERENCE_TIMEOUT)
            .send()
            .await
            .context("Failed to fetch customer reference data")?
            .error_for_status()
            .context("Customer reference fetch returned error status")?
            .json()
            .await
            .context("Failed to parse customer reference response")?;

        rows_from_body(&body).context("Failed to decode customer rows")
    }

    /// Bulk-fetches product reference data, up to `limit` rows
    ///
    /// Unlike the customer endpoint, products are scoped to the company
    /// only; the branch is not part of the context here.
    pub async fn fetch_products(&self, limit: u32) -> Result<Vec<Product>> {
        debug!(limit, "Fetching product reference data");

        let body: Value = self
            .request(Method::GET, PRODUCTS_BULK_PATH)
            .query(&[("empr", self.company.as_str())])
            .query(&[("limit", limit)])
            .timeout(REFERENCE_TIMEOUT)
            .send()
            .await
            .context("Failed to fetch product reference data")?
            .error_for_status()
            .context("Product reference fetch returned error status")?
            .json()
            .await
            .context("Failed to parse product reference response")?;

        rows_from_body(&body).context("Failed to decode product rows")
    }

    /// Searches customers on the backend by free-text term
    ///
    /// `company` adds an `empresa` equality filter when present.
    pub async fn search_customers(
        &self,
        term: &str,
        company: Option<&str>,
    ) -> Result<Vec<Customer>> {
        debug!(term, "Searching customers on the backend");

        let mut request = self
            .request(Method::GET, CUSTOMERS_SEARCH_PATH)
            .query(&[
                ("empr", self.company.as_str()),
                ("fili", self.branch.as_str()),
            ])
            .query(&[("search", term)]);

        if let Some(company) = company {
            request = request.query(&[("empresa", company)]);
        }

        let body: Value = request
            .timeout(REFERENCE_TIMEOUT)
            .send()
            .await
            .context("Failed to search customers")?
            .error_for_status()
            .context("Customer search returned error status")?
            .json()
            .await
            .context("Failed to parse customer search response")?;

        rows_from_body(&body).context("Failed to decode customer search rows")
    }

    /// Searches products on the backend by free-text term
    pub async fn search_products(&self, term: &str) -> Result<Vec<Product>> {
        debug!(term, "Searching products on the backend");

        let body: Value = self
            .request(Method::GET, PRODUCTS_SEARCH_PATH)
            .query(&[
                ("empr", self.company.as_str()),
                ("fili", self.branch.as_str()),
            ])
            .query(&[("search", term)])
            .query(&[("limit", self.search_limit)])
            .timeout(REFERENCE_TIMEOUT)
            .send()
            .await
            .context("Failed to search products")?
            .error_for_status()
            .context("Product search returned error status")?
            .json()
            .await
            .context("Failed to parse product search response")?;

        rows_from_body(&body).context("Failed to decode product search rows")
    }
}

// ============================================================================
// Classification helpers
// ============================================================================

/// Map a transport-level reqwest error to the connectivity class
fn connectivity_error(e: reqwest::Error) -> RemoteError {
    RemoteError::Connectivity(e.to_string())
}

/// Classify a non-success response into the delivery-failure taxonomy
fn classify_rejection(status: StatusCode, body: &str) -> RemoteError {
    let lowered = body.to_lowercase();
    if BUSINESS_ERROR_MARKERS
        .iter()
        .any(|marker| lowered.contains(marker))
    {
        return RemoteError::Business(truncate_body(body));
    }

    RemoteError::Status {
        status: status.as_u16(),
        message: truncate_body(body),
    }
}

/// Cap a response body for inclusion in errors and logs
fn truncate_body(body: &str) -> String {
    if body.chars().count() <= MAX_ERROR_BODY_LEN {
        body.to_string()
    } else {
        let mut truncated: String = body.chars().take(MAX_ERROR_BODY_LEN).collect();
        truncated.push_str("...");
        truncated
    }
}

/// Extract the row array from a list response
///
/// List endpoints answer `{"results": [...]}` or a bare array depending on
/// the endpoint, so both shapes are accepted.
fn rows_from_body<T: serde::de::DeserializeOwned>(body: &Value) -> Result<Vec<T>> {
    let rows = match body.get("results") {
        Some(results) => results,
        None => body,
    };

    serde_json::from_value(rows.clone()).map_err(|e| anyhow::anyhow!("Unexpected list shape: {}", e))
}
