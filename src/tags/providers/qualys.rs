//! Qualys QPS Tagging API adapter
//!
//! Tags live under `/qps/rest/2.0/{search,update}/am/tag` and speak
//! `ServiceRequest`/`ServiceResponse` XML. Authentication is HTTP Basic
//! on every request.

use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use super::{describe_failure, endpoint, require_name, TagAdapter};
use crate::tags::error::TagSyncError;
use crate::tags::types::{Tag, UpsertAction, Vendor};

const SEARCH_TAG_PATH: &str = "/qps/rest/2.0/search/am/tag";
const UPDATE_TAG_PATH: &str = "/qps/rest/2.0/update/am/tag";
const PAGE_SIZE: u32 = 1000;
const RESPONSE_SUCCESS: &str = "SUCCESS";

/// Qualys connection settings
#[derive(Clone)]
pub struct QualysCredentials {
    /// Platform API server, e.g. `https://qualysapi.qualys.com`
    pub base_url: String,
    pub username: String,
    pub password: String,
}

impl std::fmt::Debug for QualysCredentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("QualysCredentials")
            .field("base_url", &self.base_url)
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .finish()
    }
}

/// Basic-auth session
struct QualysSession {
    username: String,
    password: String,
}

// ============================================================
// Wire Types
// ============================================================

#[derive(Debug, Serialize)]
#[serde(rename = "ServiceRequest")]
struct SearchRequest {
    preferences: Preferences,
}

#[derive(Debug, Serialize)]
struct Preferences {
    #[serde(rename = "startFromOffset")]
    start_from_offset: u32,
    #[serde(rename = "limitResults")]
    limit_results: u32,
}

#[derive(Debug, Serialize)]
#[serde(rename = "ServiceRequest")]
struct UpdateRequest {
    data: UpdateData,
}

#[derive(Debug, Serialize)]
struct UpdateData {
    #[serde(rename = "Tag")]
    tag: TagName,
}

#[derive(Debug, Serialize)]
struct TagName {
    name: String,
}

#[derive(Debug, Deserialize)]
struct ServiceResponse {
    #[serde(rename = "responseCode")]
    response_code: String,
    #[serde(default)]
    count: u32,
    #[serde(rename = "hasMoreRecords", default)]
    has_more_records: bool,
    #[serde(default)]
    data: Option<ResponseData>,
    #[serde(rename = "responseErrorDetails", default)]
    error_details: Option<ErrorDetails>,
}

#[derive(Debug, Default, Deserialize)]
struct ResponseData {
    #[serde(rename = "Tag", default)]
    tags: Vec<QualysTag>,
}

#[derive(Debug, Deserialize)]
struct ErrorDetails {
    #[serde(rename = "errorMessage", default)]
    error_message: String,
}

/// Raw Qualys tag record
#[derive(Debug, Deserialize)]
struct QualysTag {
    id: u64,
    #[serde(default)]
    name: String,
}

impl QualysTag {
    fn into_tag(self) -> Tag {
        Tag::new(Some(self.id), &self.name)
    }
}

impl ServiceResponse {
    fn failure_reason(&self) -> String {
        match &self.error_details {
            Some(details) if !details.error_message.is_empty() => {
                format!("{}: {}", self.response_code, details.error_message)
            }
            _ => self.response_code.clone(),
        }
    }
}

fn search_body(offset: u32) -> Result<String, quick_xml::DeError> {
    quick_xml::se::to_string(&SearchRequest {
        preferences: Preferences {
            start_from_offset: offset,
            limit_results: PAGE_SIZE,
        },
    })
}

/// Build the update request; the serializer escapes XML specials in `name`
fn update_body(name: &str) -> Result<String, quick_xml::DeError> {
    quick_xml::se::to_string(&UpdateRequest {
        data: UpdateData {
            tag: TagName {
                name: name.to_string(),
            },
        },
    })
}

fn parse_response(body: &str) -> Result<ServiceResponse, quick_xml::DeError> {
    quick_xml::de::from_str(body)
}

// ============================================================
// Adapter
// ============================================================

/// Qualys tag adapter
pub struct QualysAdapter {
    http: Client,
    credentials: QualysCredentials,
    session: Option<QualysSession>,
}

impl QualysAdapter {
    /// Create an unauthenticated adapter
    pub fn new(credentials: QualysCredentials, http: Client) -> Self {
        Self {
            http,
            credentials,
            session: None,
        }
    }

    /// Create and authenticate
    pub async fn connect(
        credentials: QualysCredentials,
        http: Client,
    ) -> Result<Self, TagSyncError> {
        let mut adapter = Self::new(credentials, http);
        adapter.authenticate().await?;
        Ok(adapter)
    }

    fn session(&self) -> Result<&QualysSession, TagSyncError> {
        self.session
            .as_ref()
            .ok_or_else(|| TagSyncError::auth(Vendor::Qualys, "not authenticated"))
    }

    async fn post_xml(
        &self,
        session: &QualysSession,
        path: &str,
        body: String,
    ) -> reqwest::Result<reqwest::Response> {
        self.http
            .post(endpoint(&self.credentials.base_url, path))
            .basic_auth(&session.username, Some(&session.password))
            .header("Content-Type", "text/xml")
            .header("Accept", "application/xml")
            .body(body)
            .send()
            .await
    }
}

#[async_trait]
impl TagAdapter for QualysAdapter {
    fn vendor(&self) -> Vendor {
        Vendor::Qualys
    }

    async fn authenticate(&mut self) -> Result<(), TagSyncError> {
        if self.credentials.username.is_empty() || self.credentials.password.is_empty() {
            return Err(TagSyncError::auth(
                Vendor::Qualys,
                "username and password are required",
            ));
        }

        self.session = Some(QualysSession {
            username: self.credentials.username.clone(),
            password: self.credentials.password.clone(),
        });

        debug!(user = %self.credentials.username, "Qualys basic-auth session ready");
        Ok(())
    }

    async fn list_tags(&self) -> Result<Vec<Tag>, TagSyncError> {
        let session = self.session()?;

        let mut tags = Vec::new();
        let mut offset = 1;

        loop {
            let body =
                search_body(offset).map_err(|e| TagSyncError::fetch(Vendor::Qualys, e))?;

            let response = self
                .post_xml(session, SEARCH_TAG_PATH, body)
                .await
                .map_err(|e| {
                    TagSyncError::fetch(Vendor::Qualys, format!("request failed: {}", e))
                })?;

            if response.status() != StatusCode::OK {
                return Err(TagSyncError::fetch(
                    Vendor::Qualys,
                    describe_failure(response).await,
                ));
            }

            let text = response
                .text()
                .await
                .map_err(|e| TagSyncError::fetch(Vendor::Qualys, e))?;

            let page = parse_response(&text).map_err(|e| {
                TagSyncError::fetch(Vendor::Qualys, format!("XML decode error: {}", e))
            })?;

            if page.response_code != RESPONSE_SUCCESS {
                return Err(TagSyncError::fetch(Vendor::Qualys, page.failure_reason()));
            }

            let has_more = page.has_more_records;
            let count = page.count;
            let records = page.data.unwrap_or_default().tags;
            let received = records.len();
            tags.extend(records.into_iter().map(QualysTag::into_tag));

            debug!(
                offset = offset,
                received = received,
                has_more = has_more,
                "Fetched Qualys tag page"
            );

            if !has_more || received == 0 {
                break;
            }
            offset += count.max(received as u32);
        }

        info!("Listed {} Qualys tags", tags.len());
        Ok(tags)
    }

    async fn upsert_tag(&self, tag: &Tag) -> Result<UpsertAction, TagSyncError> {
        let session = self.session()?;
        require_name(Vendor::Qualys, tag)?;

        let body = update_body(&tag.name)
            .map_err(|e| TagSyncError::upsert(Vendor::Qualys, &tag.name, e))?;

        let response = self
            .post_xml(session, UPDATE_TAG_PATH, body)
            .await
            .map_err(|e| {
                TagSyncError::upsert(Vendor::Qualys, &tag.name, format!("request failed: {}", e))
            })?;

        if response.status() != StatusCode::OK {
            return Err(TagSyncError::upsert(
                Vendor::Qualys,
                &tag.name,
                describe_failure(response).await,
            ));
        }

        let text = response
            .text()
            .await
            .map_err(|e| TagSyncError::upsert(Vendor::Qualys, &tag.name, e))?;

        let parsed = parse_response(&text).map_err(|e| {
            debug!(tag = %tag.name, body = %text, "Undecodable Qualys update response");
            TagSyncError::upsert(Vendor::Qualys, &tag.name, format!("XML decode error: {}", e))
        })?;

        if parsed.response_code != RESPONSE_SUCCESS {
            return Err(TagSyncError::upsert(
                Vendor::Qualys,
                &tag.name,
                parsed.failure_reason(),
            ));
        }

        debug!(tag = %tag.name, "Applied Qualys tag");
        Ok(UpsertAction::Applied)
    }
}
