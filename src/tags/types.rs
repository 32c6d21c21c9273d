//! Canonical Tag Types
//!
//! The vendor-agnostic tag model shared by every adapter, plus the
//! reports produced by sync runs.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Tag platform identifier
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Vendor {
    Qualys,
    CrowdStrike,
    NinjaOne,
}

impl Vendor {
    /// Default tag file name for this vendor (e.g. `qualys_tags.yml`)
    pub fn default_tags_file(&self) -> String {
        format!("{}_tags.yml", self)
    }

    /// Human-readable platform name
    pub fn display_name(&self) -> &'static str {
        match self {
            Vendor::Qualys => "Qualys",
            Vendor::CrowdStrike => "CrowdStrike",
            Vendor::NinjaOne => "NinjaOne",
        }
    }
}

impl std::fmt::Display for Vendor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Vendor::Qualys => write!(f, "qualys"),
            Vendor::CrowdStrike => write!(f, "crowdstrike"),
            Vendor::NinjaOne => write!(f, "ninjaone"),
        }
    }
}

/// Canonicalize a tag name: trim, lower-case, and collapse each run of
/// internal whitespace into a single hyphen.
pub fn normalize_name(name: &str) -> String {
    name.split_whitespace()
        .map(str::to_lowercase)
        .collect::<Vec<_>>()
        .join("-")
}

/// A canonical tag
///
/// Tags from different platforms are equivalent when their normalized names
/// are equal. `id` is platform-local and never compared across platforms.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Tag {
    /// Vendor-assigned identifier, absent until the tag exists remotely
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<u64>,
    /// Normalized tag name
    pub name: String,
}

impl Tag {
    /// Create a tag, normalizing the name
    pub fn new(id: Option<u64>, name: &str) -> Self {
        Self {
            id,
            name: normalize_name(name),
        }
    }

    /// Create a tag that has not been assigned an id yet
    pub fn named(name: &str) -> Self {
        Self::new(None, name)
    }

    /// Re-apply name normalization
    pub fn canonical(self) -> Self {
        Self::new(self.id, &self.name)
    }

    /// The id if it identifies an existing remote tag. `0` counts as unset.
    pub fn known_id(&self) -> Option<u64> {
        self.id.filter(|id| *id != 0)
    }
}

/// What a successful upsert did on the remote side
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum UpsertAction {
    /// A new tag was created
    Created,
    /// An existing tag was renamed by id
    Updated,
    /// The vendor upserted by name; create and update are indistinguishable
    Applied,
}

/// A single tag that failed to apply during a push
#[derive(Debug, Clone, Serialize)]
pub struct TagFailure {
    pub name: String,
    pub error: String,
}

/// Result of a pull (fetch and save)
#[derive(Debug, Clone, Serialize)]
pub struct PullReport {
    pub vendor: Vendor,
    /// File the tags were written to
    pub path: PathBuf,
    /// Number of tags written
    pub written: usize,
    pub timestamp: chrono::DateTime<chrono::Utc>,
}

/// Result of a push (load and apply)
#[derive(Debug, Clone, Serialize)]
pub struct PushReport {
    pub vendor: Vendor,
    /// File the tags were read from
    pub path: PathBuf,
    /// Tags attempted, whether or not they succeeded
    pub processed: usize,
    pub created: usize,
    pub updated: usize,
    pub applied: usize,
    pub failed: usize,
    pub failures: Vec<TagFailure>,
    pub timestamp: chrono::DateTime<chrono::Utc>,
}

impl PushReport {
    pub(crate) fn new(vendor: Vendor, path: PathBuf) -> Self {
        Self {
            vendor,
            path,
            processed: 0,
            created: 0,
            updated: 0,
            applied: 0,
            failed: 0,
            failures: Vec::new(),
            timestamp: chrono::Utc::now(),
        }
    }

    pub(crate) fn record_success(&mut self, action: UpsertAction) {
        self.processed += 1;
        match action {
            UpsertAction::Created => self.created += 1,
            UpsertAction::Updated => self.updated += 1,
            UpsertAction::Applied => self.applied += 1,
        }
    }

    pub(crate) fn record_failure(&mut self, name: &str, error: String) {
        self.processed += 1;
        self.failed += 1;
        self.failures.push(TagFailure {
            name: name.to_string(),
            error,
        });
    }

    /// Number of tags applied successfully
    pub fn succeeded(&self) -> usize {
        self.processed - self.failed
    }
}

/// Result of a sync (pull immediately followed by push)
#[derive(Debug, Clone, Serialize)]
pub struct SyncReport {
    pub pull: PullReport,
    pub push: PushReport,
}
