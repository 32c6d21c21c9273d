//! NinjaOne asset tag adapter
//!
//! NinjaOne exposes tags as a plain REST resource, so an upsert has to pick
//! between creating a new tag and renaming an existing one by id.

use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use super::{describe_failure, endpoint, fetch_bearer_token, require_name, TagAdapter};
use crate::tags::error::TagSyncError;
use crate::tags::types::{Tag, UpsertAction, Vendor};

const TOKEN_PATH: &str = "/oauth2/token";
const TAGS_PATH: &str = "/core-resources/assetTags";

/// Default OAuth2 scope for tag management
pub const DEFAULT_SCOPE: &str = "monitoring management";

/// NinjaOne API client credentials
#[derive(Clone)]
pub struct NinjaOneCredentials {
    /// Regional instance, e.g. `https://app.ninjarmm.com`
    pub base_url: String,
    pub client_id: String,
    pub client_secret: String,
    pub scope: String,
}

impl std::fmt::Debug for NinjaOneCredentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NinjaOneCredentials")
            .field("base_url", &self.base_url)
            .field("client_id", &self.client_id)
            .field("client_secret", &"<redacted>")
            .field("scope", &self.scope)
            .finish()
    }
}

// ============================================================
// Wire Types
// ============================================================

#[derive(Debug, Deserialize)]
struct TagList {
    #[serde(default)]
    data: Option<Vec<NinjaTag>>,
}

/// Tag ids arrive as numbers or numeric strings depending on the endpoint
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum NinjaTagId {
    Number(u64),
    Text(String),
}

impl NinjaTagId {
    fn as_u64(&self) -> Option<u64> {
        match self {
            NinjaTagId::Number(n) => Some(*n),
            NinjaTagId::Text(s) => s.trim().parse().ok(),
        }
    }
}

/// Raw NinjaOne tag record
#[derive(Debug, Deserialize)]
struct NinjaTag {
    #[serde(default)]
    id: Option<NinjaTagId>,
    #[serde(default)]
    name: String,
}

impl NinjaTag {
    fn into_tag(self) -> Tag {
        Tag::new(self.id.as_ref().and_then(NinjaTagId::as_u64), &self.name)
    }
}

#[derive(Debug, Serialize)]
struct TagBody<'a> {
    name: &'a str,
}

/// How a canonical tag is applied to NinjaOne
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum TagWrite {
    /// No known id: `POST /core-resources/assetTags`
    Create,
    /// Known id: `PUT /core-resources/assetTags/{id}`
    Rename(u64),
}

impl TagWrite {
    fn for_tag(tag: &Tag) -> Self {
        match tag.known_id() {
            Some(id) => TagWrite::Rename(id),
            None => TagWrite::Create,
        }
    }
}

// ============================================================
// Adapter
// ============================================================

/// NinjaOne tag adapter
pub struct NinjaOneAdapter {
    http: Client,
    credentials: NinjaOneCredentials,
    token: Option<String>,
}

impl NinjaOneAdapter {
    /// Create an unauthenticated adapter
    pub fn new(credentials: NinjaOneCredentials, http: Client) -> Self {
        Self {
            http,
            credentials,
            token: None,
        }
    }

    /// Create and fetch the bearer token
    pub async fn connect(
        credentials: NinjaOneCredentials,
        http: Client,
    ) -> Result<Self, TagSyncError> {
        let mut adapter = Self::new(credentials, http);
        adapter.authenticate().await?;
        Ok(adapter)
    }

    fn token(&self) -> Result<&str, TagSyncError> {
        self.token
            .as_deref()
            .ok_or_else(|| TagSyncError::auth(Vendor::NinjaOne, "not authenticated"))
    }

    fn url(&self, path: &str) -> String {
        endpoint(&self.credentials.base_url, path)
    }
}

#[async_trait]
impl TagAdapter for NinjaOneAdapter {
    fn vendor(&self) -> Vendor {
        Vendor::NinjaOne
    }

    async fn authenticate(&mut self) -> Result<(), TagSyncError> {
        let creds = &self.credentials;
        if creds.client_id.is_empty() || creds.client_secret.is_empty() {
            return Err(TagSyncError::auth(
                Vendor::NinjaOne,
                "client_id and client_secret are required",
            ));
        }

        let form = [
            ("grant_type", "client_credentials"),
            ("client_id", creds.client_id.as_str()),
            ("client_secret", creds.client_secret.as_str()),
            ("scope", creds.scope.as_str()),
        ];

        let token = fetch_bearer_token(
            &self.http,
            Vendor::NinjaOne,
            &self.url(TOKEN_PATH),
            &form,
            |status| status == StatusCode::OK,
        )
        .await?;

        self.token = Some(token);
        info!("NinjaOne session established");
        Ok(())
    }

    async fn list_tags(&self) -> Result<Vec<Tag>, TagSyncError> {
        let token = self.token()?;

        let response = self
            .http
            .get(self.url(TAGS_PATH))
            .bearer_auth(token)
            .header("Accept", "application/json")
            .send()
            .await
            .map_err(|e| TagSyncError::fetch(Vendor::NinjaOne, format!("request failed: {}", e)))?;

        if response.status() != StatusCode::OK {
            return Err(TagSyncError::fetch(
                Vendor::NinjaOne,
                describe_failure(response).await,
            ));
        }

        let body: TagList = response
            .json()
            .await
            .map_err(|e| TagSyncError::fetch(Vendor::NinjaOne, format!("decode error: {}", e)))?;

        let tags: Vec<Tag> = body
            .data
            .unwrap_or_default()
            .into_iter()
            .map(NinjaTag::into_tag)
            .collect();

        info!("Listed {} NinjaOne tags", tags.len());
        Ok(tags)
    }

    async fn upsert_tag(&self, tag: &Tag) -> Result<UpsertAction, TagSyncError> {
        let token = self.token()?;
        require_name(Vendor::NinjaOne, tag)?;

        let body = TagBody { name: &tag.name };

        let (request, expected, action) = match TagWrite::for_tag(tag) {
            TagWrite::Rename(id) => (
                self.http.put(format!("{}/{}", self.url(TAGS_PATH), id)),
                StatusCode::NO_CONTENT,
                UpsertAction::Updated,
            ),
            TagWrite::Create => (
                self.http.post(self.url(TAGS_PATH)),
                StatusCode::CREATED,
                UpsertAction::Created,
            ),
        };

        let response = request
            .bearer_auth(token)
            .json(&body)
            .send()
            .await
            .map_err(|e| {
                TagSyncError::upsert(Vendor::NinjaOne, &tag.name, format!("request failed: {}", e))
            })?;

        if response.status() != expected {
            return Err(TagSyncError::upsert(
                Vendor::NinjaOne,
                &tag.name,
                describe_failure(response).await,
            ));
        }

        debug!(tag = %tag.name, action = ?action, "Applied NinjaOne tag");
        Ok(action)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use wiremock::matchers::{body_json, body_string_contains, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn credentials(base_url: &str) -> NinjaOneCredentials {
        NinjaOneCredentials {
            base_url: base_url.to_string(),
            client_id: "ninja-id".to_string(),
            client_secret: "ninja-secret".to_string(),
            scope: DEFAULT_SCOPE.to_string(),
        }
    }

    async fn connected(server: &MockServer) -> NinjaOneAdapter {
        Mock::given(method("POST"))
            .and(path(TOKEN_PATH))
            .and(body_string_contains("grant_type=client_credentials"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "access_token": "ninja-token",
                "expires_in": 3600,
                "token_type": "Bearer"
            })))
            .mount(server)
            .await;

        NinjaOneAdapter::connect(credentials(&server.uri()), Client::new())
            .await
            .unwrap()
    }

    #[test]
    fn test_write_decision_keyed_on_id() {
        assert_eq!(TagWrite::for_tag(&Tag::named("new")), TagWrite::Create);
        assert_eq!(TagWrite::for_tag(&Tag::new(Some(0), "new")), TagWrite::Create);
        assert_eq!(TagWrite::for_tag(&Tag::new(Some(17), "old")), TagWrite::Rename(17));
    }

    #[test]
    fn test_ninja_tag_id_formats() {
        let list: TagList = serde_json::from_value(json!({
            "data": [
                { "id": 4, "name": "Numeric Id" },
                { "id": "5", "name": "String Id" },
                { "name": "No Id" }
            ]
        }))
        .unwrap();

        let tags: Vec<Tag> = list.data.unwrap().into_iter().map(NinjaTag::into_tag).collect();
        assert_eq!(
            tags,
            vec![
                Tag::new(Some(4), "numeric-id"),
                Tag::new(Some(5), "string-id"),
                Tag::named("no-id"),
            ]
        );
    }

    #[tokio::test]
    async fn test_authenticate_requires_200() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path(TOKEN_PATH))
            .respond_with(
                ResponseTemplate::new(400).set_body_json(json!({ "error": "invalid_client" })),
            )
            .mount(&server)
            .await;

        let err = NinjaOneAdapter::connect(credentials(&server.uri()), Client::new())
            .await
            .err()
            .unwrap();

        assert!(matches!(err, TagSyncError::Auth { .. }));
        assert!(err.to_string().contains("invalid_client"));
    }

    #[tokio::test]
    async fn test_list_tags() {
        let server = MockServer::start().await;
        let adapter = connected(&server).await;

        Mock::given(method("GET"))
            .and(path(TAGS_PATH))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "data": [
                    { "id": 1, "name": "Finance Laptops" },
                    { "id": 2, "name": "servers" }
                ]
            })))
            .mount(&server)
            .await;

        let tags = adapter.list_tags().await.unwrap();
        assert_eq!(
            tags,
            vec![Tag::new(Some(1), "finance-laptops"), Tag::new(Some(2), "servers")]
        );
    }

    #[tokio::test]
    async fn test_list_tags_empty_data() {
        let server = MockServer::start().await;
        let adapter = connected(&server).await;

        Mock::given(method("GET"))
            .and(path(TAGS_PATH))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "data": [] })))
            .mount(&server)
            .await;

        assert!(adapter.list_tags().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_list_tags_http_error_is_fetch_error() {
        let server = MockServer::start().await;
        let adapter = connected(&server).await;

        Mock::given(method("GET"))
            .and(path(TAGS_PATH))
            .respond_with(ResponseTemplate::new(500).set_body_string("upstream unavailable"))
            .mount(&server)
            .await;

        let err = adapter.list_tags().await.unwrap_err();
        assert!(matches!(err, TagSyncError::Fetch { .. }));
        assert!(err.to_string().contains("HTTP 500"));
        assert!(err.to_string().contains("upstream unavailable"));
    }

    #[tokio::test]
    async fn test_upsert_without_id_creates() {
        let server = MockServer::start().await;
        let adapter = connected(&server).await;

        Mock::given(method("POST"))
            .and(path(TAGS_PATH))
            .and(body_json(json!({ "name": "kiosks" })))
            .respond_with(
                ResponseTemplate::new(201).set_body_json(json!({ "id": 30, "name": "kiosks" })),
            )
            .expect(1)
            .mount(&server)
            .await;

        Mock::given(method("PUT"))
            .respond_with(ResponseTemplate::new(204))
            .expect(0)
            .mount(&server)
            .await;

        let action = adapter.upsert_tag(&Tag::named("Kiosks")).await.unwrap();
        assert_eq!(action, UpsertAction::Created);
    }

    #[tokio::test]
    async fn test_upsert_with_id_renames() {
        let server = MockServer::start().await;
        let adapter = connected(&server).await;

        Mock::given(method("PUT"))
            .and(path("/core-resources/assetTags/42"))
            .and(body_json(json!({ "name": "kiosks" })))
            .respond_with(ResponseTemplate::new(204))
            .expect(1)
            .mount(&server)
            .await;

        Mock::given(method("POST"))
            .and(path(TAGS_PATH))
            .respond_with(ResponseTemplate::new(201))
            .expect(0)
            .mount(&server)
            .await;

        let action = adapter.upsert_tag(&Tag::new(Some(42), "kiosks")).await.unwrap();
        assert_eq!(action, UpsertAction::Updated);
    }

    #[tokio::test]
    async fn test_create_with_wrong_status_fails() {
        let server = MockServer::start().await;
        let adapter = connected(&server).await;

        Mock::given(method("POST"))
            .and(path(TAGS_PATH))
            .respond_with(ResponseTemplate::new(200))
            .mount(&server)
            .await;

        let err = adapter.upsert_tag(&Tag::named("kiosks")).await.unwrap_err();
        assert!(matches!(err, TagSyncError::Upsert { .. }));
        assert!(err.to_string().contains("HTTP 200"));
    }

    #[tokio::test]
    async fn test_rename_with_wrong_status_fails() {
        let server = MockServer::start().await;
        let adapter = connected(&server).await;

        Mock::given(method("PUT"))
            .and(path("/core-resources/assetTags/7"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "id": 7 })))
            .expect(1)
            .mount(&server)
            .await;

        let err = adapter.upsert_tag(&Tag::new(Some(7), "kiosks")).await.unwrap_err();
        assert!(matches!(err, TagSyncError::Upsert { .. }));
        assert!(err.to_string().contains("HTTP 200"));
    }

    #[tokio::test]
    async fn test_rename_server_error_fails() {
        let server = MockServer::start().await;
        let adapter = connected(&server).await;

        Mock::given(method("PUT"))
            .and(path("/core-resources/assetTags/7"))
            .respond_with(ResponseTemplate::new(500))
            .mount(&server)
            .await;

        let err = adapter.upsert_tag(&Tag::new(Some(7), "kiosks")).await.unwrap_err();
        assert!(matches!(err, TagSyncError::Upsert { .. }));
        assert!(err.to_string().contains("HTTP 500"));
    }
}
