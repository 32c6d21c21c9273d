//! CrowdStrike Falcon tagging adapter
//!
//! OAuth2 client credentials against `/oauth2/token`, then bearer calls to
//! the tags entities endpoint. Falcon treats a POST of resource names as
//! upsert-by-name, so no lookup is needed before applying a tag.

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use super::{describe_failure, endpoint, fetch_bearer_token, require_name, TagAdapter};
use crate::tags::error::TagSyncError;
use crate::tags::types::{Tag, UpsertAction, Vendor};

const TOKEN_PATH: &str = "/oauth2/token";
const TAGS_PATH: &str = "/tags/entities/tags/v1";

/// CrowdStrike API client credentials
#[derive(Clone)]
pub struct CrowdStrikeCredentials {
    /// Cloud API base, e.g. `https://api.us-2.crowdstrike.com`
    pub base_url: String,
    pub client_id: String,
    pub client_secret: String,
    /// Child CID when authenticating from a Flight Control parent
    pub member_cid: Option<String>,
}

impl std::fmt::Debug for CrowdStrikeCredentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CrowdStrikeCredentials")
            .field("base_url", &self.base_url)
            .field("client_id", &self.client_id)
            .field("client_secret", &"<redacted>")
            .field("member_cid", &self.member_cid)
            .finish()
    }
}

/// `{ "resources": [...] }` envelope used in both directions
#[derive(Debug, Default, Serialize, Deserialize)]
struct Resources {
    #[serde(default)]
    resources: Option<Vec<String>>,
}

/// CrowdStrike tag adapter
pub struct CrowdStrikeAdapter {
    http: Client,
    credentials: CrowdStrikeCredentials,
    token: Option<String>,
}

impl CrowdStrikeAdapter {
    /// Create an unauthenticated adapter
    pub fn new(credentials: CrowdStrikeCredentials, http: Client) -> Self {
        Self {
            http,
            credentials,
            token: None,
        }
    }

    /// Create and fetch the bearer token
    pub async fn connect(
        credentials: CrowdStrikeCredentials,
        http: Client,
    ) -> Result<Self, TagSyncError> {
        let mut adapter = Self::new(credentials, http);
        adapter.authenticate().await?;
        Ok(adapter)
    }

    fn token(&self) -> Result<&str, TagSyncError> {
        self.token
            .as_deref()
            .ok_or_else(|| TagSyncError::auth(Vendor::CrowdStrike, "not authenticated"))
    }

    fn url(&self, path: &str) -> String {
        endpoint(&self.credentials.base_url, path)
    }
}

#[async_trait]
impl TagAdapter for CrowdStrikeAdapter {
    fn vendor(&self) -> Vendor {
        Vendor::CrowdStrike
    }

    async fn authenticate(&mut self) -> Result<(), TagSyncError> {
        let creds = &self.credentials;
        if creds.client_id.is_empty() || creds.client_secret.is_empty() {
            return Err(TagSyncError::auth(
                Vendor::CrowdStrike,
                "client_id and client_secret are required",
            ));
        }

        let mut form = vec![
            ("client_id", creds.client_id.as_str()),
            ("client_secret", creds.client_secret.as_str()),
        ];
        if let Some(cid) = creds.member_cid.as_deref() {
            form.push(("member_cid", cid));
        }

        let token = fetch_bearer_token(
            &self.http,
            Vendor::CrowdStrike,
            &self.url(TOKEN_PATH),
            &form,
            |status| status.is_success(),
        )
        .await?;

        self.token = Some(token);
        info!("CrowdStrike session established");
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
            .map_err(|e| {
                TagSyncError::fetch(Vendor::CrowdStrike, format!("request failed: {}", e))
            })?;

        if !response.status().is_success() {
            return Err(TagSyncError::fetch(
                Vendor::CrowdStrike,
                describe_failure(response).await,
            ));
        }

        let body: Resources = response
            .json()
            .await
            .map_err(|e| TagSyncError::fetch(Vendor::CrowdStrike, format!("decode error: {}", e)))?;

        let tags: Vec<Tag> = body
            .resources
            .unwrap_or_default()
            .iter()
            .map(|name| Tag::named(name))
            .collect();

        info!("Listed {} CrowdStrike tags", tags.len());
        Ok(tags)
    }

    async fn upsert_tag(&self, tag: &Tag) -> Result<UpsertAction, TagSyncError> {
        let token = self.token()?;
        require_name(Vendor::CrowdStrike, tag)?;

        let body = Resources {
            resources: Some(vec![tag.name.clone()]),
        };

        let response = self
            .http
            .post(self.url(TAGS_PATH))
            .bearer_auth(token)
            .json(&body)
            .send()
            .await
            .map_err(|e| {
                let reason = format!("request failed: {}", e);
                TagSyncError::upsert(Vendor::CrowdStrike, &tag.name, reason)
            })?;

        if !response.status().is_success() {
            return Err(TagSyncError::upsert(
                Vendor::CrowdStrike,
                &tag.name,
                describe_failure(response).await,
            ));
        }

        debug!(tag = %tag.name, "Applied CrowdStrike tag");
        Ok(UpsertAction::Applied)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use wiremock::matchers::{body_json, body_string_contains, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn credentials(base_url: &str) -> CrowdStrikeCredentials {
        CrowdStrikeCredentials {
            base_url: base_url.to_string(),
            client_id: "falcon-id".to_string(),
            client_secret: "falcon-secret".to_string(),
            member_cid: None,
        }
    }

    async fn mount_token(server: &MockServer) {
        Mock::given(method("POST"))
            .and(path(TOKEN_PATH))
            .and(body_string_contains("client_id=falcon-id"))
            .respond_with(ResponseTemplate::new(201).set_body_json(json!({
                "access_token": "cs-token",
                "token_type": "bearer",
                "expires_in": 1799
            })))
            .expect(1)
            .mount(server)
            .await;
    }

    #[test]
    fn test_credentials_debug_redacts_secret() {
        let rendered = format!("{:?}", credentials("https://api.crowdstrike.com"));
        assert!(rendered.contains("falcon-id"));
        assert!(!rendered.contains("falcon-secret"));
    }

    #[tokio::test]
    async fn test_authenticate_rejects_bad_credentials() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path(TOKEN_PATH))
            .respond_with(ResponseTemplate::new(401).set_body_string("access denied"))
            .mount(&server)
            .await;

        let err = CrowdStrikeAdapter::connect(credentials(&server.uri()), Client::new())
            .await
            .err()
            .unwrap();

        assert!(matches!(err, TagSyncError::Auth { .. }));
        assert!(err.to_string().contains("401"));
    }

    #[tokio::test]
    async fn test_authenticate_rejects_undecodable_token() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path(TOKEN_PATH))
            .respond_with(ResponseTemplate::new(201).set_body_json(json!({ "unexpected": true })))
            .mount(&server)
            .await;

        let err = CrowdStrikeAdapter::connect(credentials(&server.uri()), Client::new())
            .await
            .err()
            .unwrap();

        assert!(matches!(err, TagSyncError::Auth { .. }));
    }

    #[tokio::test]
    async fn test_list_tags_normalizes_resources() {
        let server = MockServer::start().await;
        mount_token(&server).await;

        Mock::given(method("GET"))
            .and(path(TAGS_PATH))
            .and(header("authorization", "Bearer cs-token"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "meta": { "query_time": 0.01 },
                "resources": ["Prod Servers", "  DMZ ", "already-ok"],
                "errors": []
            })))
            .mount(&server)
            .await;

        let adapter = CrowdStrikeAdapter::connect(credentials(&server.uri()), Client::new())
            .await
            .unwrap();
        let tags = adapter.list_tags().await.unwrap();

        assert_eq!(
            tags,
            vec![
                Tag::named("prod-servers"),
                Tag::named("dmz"),
                Tag::named("already-ok"),
            ]
        );
    }

    #[tokio::test]
    async fn test_list_tags_null_resources_is_empty() {
        let server = MockServer::start().await;
        mount_token(&server).await;

        Mock::given(method("GET"))
            .and(path(TAGS_PATH))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "resources": null })))
            .mount(&server)
            .await;

        let adapter = CrowdStrikeAdapter::connect(credentials(&server.uri()), Client::new())
            .await
            .unwrap();

        assert!(adapter.list_tags().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_list_tags_server_error_is_fetch_error() {
        let server = MockServer::start().await;
        mount_token(&server).await;

        Mock::given(method("GET"))
            .and(path(TAGS_PATH))
            .respond_with(ResponseTemplate::new(503))
            .mount(&server)
            .await;

        let adapter = CrowdStrikeAdapter::connect(credentials(&server.uri()), Client::new())
            .await
            .unwrap();
        let err = adapter.list_tags().await.unwrap_err();

        assert!(matches!(err, TagSyncError::Fetch { .. }));
    }

    #[tokio::test]
    async fn test_upsert_posts_resource_name() {
        let server = MockServer::start().await;
        mount_token(&server).await;

        Mock::given(method("POST"))
            .and(path(TAGS_PATH))
            .and(body_json(json!({ "resources": ["prod-servers"] })))
            .respond_with(ResponseTemplate::new(201))
            .expect(1)
            .mount(&server)
            .await;

        let adapter = CrowdStrikeAdapter::connect(credentials(&server.uri()), Client::new())
            .await
            .unwrap();
        let action = adapter.upsert_tag(&Tag::named("Prod Servers")).await.unwrap();

        assert_eq!(action, UpsertAction::Applied);
    }

    #[tokio::test]
    async fn test_upsert_rejected_is_upsert_error() {
        let server = MockServer::start().await;
        mount_token(&server).await;

        Mock::given(method("POST"))
            .and(path(TAGS_PATH))
            .respond_with(ResponseTemplate::new(400).set_body_string("invalid tag"))
            .mount(&server)
            .await;

        let adapter = CrowdStrikeAdapter::connect(credentials(&server.uri()), Client::new())
            .await
            .unwrap();
        let err = adapter.upsert_tag(&Tag::named("x")).await.unwrap_err();

        assert!(matches!(err, TagSyncError::Upsert { .. }));
        assert!(err.to_string().contains("invalid tag"));
    }
}
