//! Vendor Tag Adapters
//!
//! Trait-based abstraction over the tag APIs of Qualys, CrowdStrike and
//! NinjaOne. Each adapter decodes its vendor's wire format into canonical
//! [`Tag`]s and applies canonical tags back with the vendor's own
//! create/update semantics.

use async_trait::async_trait;
use reqwest::{Client, Response};
use serde::Deserialize;
use tracing::debug;

use super::error::TagSyncError;
use super::types::{Tag, UpsertAction, Vendor};

pub mod crowdstrike;
pub mod ninjaone;
pub mod qualys;

pub use crowdstrike::{CrowdStrikeAdapter, CrowdStrikeCredentials};
pub use ninjaone::{NinjaOneAdapter, NinjaOneCredentials};
pub use qualys::{QualysAdapter, QualysCredentials};

/// Trait for vendor tag platforms
#[async_trait]
pub trait TagAdapter: Send + Sync {
    /// Get the vendor type
    fn vendor(&self) -> Vendor;

    /// Establish the session used by every later call
    async fn authenticate(&mut self) -> Result<(), TagSyncError>;

    /// List all remote tags with normalized names, in remote order
    async fn list_tags(&self) -> Result<Vec<Tag>, TagSyncError>;

    /// Create or update a single tag
    async fn upsert_tag(&self, tag: &Tag) -> Result<UpsertAction, TagSyncError>;
}

/// OAuth2 token response
#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    #[serde(default)]
    expires_in: Option<u64>,
}

/// Exchange client credentials for a bearer token at `url`.
///
/// `accept` decides which status codes count as success.
pub(crate) async fn fetch_bearer_token(
    http: &Client,
    vendor: Vendor,
    url: &str,
    form: &[(&str, &str)],
    accept: fn(reqwest::StatusCode) -> bool,
) -> Result<String, TagSyncError> {
    debug!(vendor = %vendor, url = %url, "Requesting OAuth2 token");

    let response = http
        .post(url)
        .header("Accept", "application/json")
        .form(form)
        .send()
        .await
        .map_err(|e| TagSyncError::auth(vendor, format!("token request failed: {}", e)))?;

    let status = response.status();
    if !accept(status) {
        let text = response.text().await.unwrap_or_default();
        return Err(TagSyncError::auth(
            vendor,
            format!("token HTTP {}: {}", status.as_u16(), text),
        ));
    }

    let token: TokenResponse = response
        .json()
        .await
        .map_err(|e| TagSyncError::auth(vendor, format!("token decode error: {}", e)))?;

    if token.access_token.is_empty() {
        return Err(TagSyncError::auth(vendor, "token response has empty access_token"));
    }

    debug!(vendor = %vendor, expires_in = ?token.expires_in, "OAuth2 token acquired");
    Ok(token.access_token)
}

/// Render a non-success response as `HTTP <code>: <body>`
pub(crate) async fn describe_failure(response: Response) -> String {
    let status = response.status();
    let text = response.text().await.unwrap_or_default();
    format!("HTTP {}: {}", status.as_u16(), text.trim())
}

/// Join a configured base URL and an API path
pub(crate) fn endpoint(base_url: &str, path: &str) -> String {
    format!("{}{}", base_url.trim_end_matches('/'), path)
}

/// Reject names that would normalize to nothing before any remote call
pub(crate) fn require_name(vendor: Vendor, tag: &Tag) -> Result<(), TagSyncError> {
    if tag.name.trim().is_empty() {
        return Err(TagSyncError::upsert(vendor, &tag.name, "tag name is empty"));
    }
    Ok(())
}
