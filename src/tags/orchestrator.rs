//! Tag Sync Orchestrator
//!
//! Drives the pull (list → normalize → save), push (load → normalize → upsert each)
//! and sync (pull then push) flows for a single vendor.

use std::path::{Path, PathBuf};
use tracing::{error, info, warn};

use super::error::TagSyncError;
use super::providers::TagAdapter;
use super::store::{load_tags, save_tags};
use super::types::{PullReport, PushReport, SyncReport, Tag, Vendor};

/// Tag file locations for one vendor
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TagPaths {
    /// File read by `push`
    pub input: PathBuf,
    /// File written by `pull` and read back by `sync`
    pub output: PathBuf,
}

impl TagPaths {
    /// Vendor default (`<vendor>_tags.yml`) inside `dir` for both directions
    pub fn for_vendor(vendor: Vendor, dir: &Path) -> Self {
        let path = dir.join(vendor.default_tags_file());
        Self {
            input: path.clone(),
            output: path,
        }
    }
}

/// Tag sync agent for a single vendor
pub struct TagSyncAgent {
    /// Authenticated vendor adapter
    adapter: Box<dyn TagAdapter>,
    /// Tag file locations
    paths: TagPaths,
}

impl TagSyncAgent {
    /// Create an agent around an already authenticated adapter
    pub fn new(adapter: Box<dyn TagAdapter>, paths: TagPaths) -> Self {
        info!(
            vendor = %adapter.vendor(),
            input = %paths.input.display(),
            output = %paths.output.display(),
            "TagSyncAgent initialized"
        );
        Self { adapter, paths }
    }

    pub fn vendor(&self) -> Vendor {
        self.adapter.vendor()
    }

    pub fn paths(&self) -> &TagPaths {
        &self.paths
    }

    /// Fetch remote tags and write them to the output file
    pub async fn pull(&self) -> Result<PullReport, TagSyncError> {
        let vendor = self.vendor();
        info!(vendor = %vendor, "Starting tag pull");

        let tags: Vec<Tag> = self
            .adapter
            .list_tags()
            .await
            .inspect_err(|e| error!(vendor = %vendor, error = %e, "Failed to list tags"))?
            .into_iter()
            .map(Tag::canonical)
            .collect();

        save_tags(&tags, &self.paths.output)?;

        info!(
            vendor = %vendor,
            count = tags.len(),
            path = %self.paths.output.display(),
            "Tag pull complete"
        );

        Ok(PullReport {
            vendor,
            path: self.paths.output.clone(),
            written: tags.len(),
            timestamp: chrono::Utc::now(),
        })
    }

    /// Load the input file and apply every tag
    pub async fn push(&self) -> Result<PushReport, TagSyncError> {
        self.push_from(&self.paths.input).await
    }

    /// Pull, then push the file that was just written
    pub async fn sync(&self) -> Result<SyncReport, TagSyncError> {
        info!(vendor = %self.vendor(), "Starting tag sync");

        let pull = self.pull().await?;
        let push = self.push_from(&pull.path).await?;

        Ok(SyncReport { pull, push })
    }

    /// Apply each tag from `path` in order, normalizing names first. A failed
    /// tag is recorded and the batch continues; a fatal error (lost session)
    /// aborts it.
    async fn push_from(&self, path: &Path) -> Result<PushReport, TagSyncError> {
        let vendor = self.vendor();
        let tags: Vec<Tag> = load_tags(path)?.into_iter().map(Tag::canonical).collect();

        info!(vendor = %vendor, count = tags.len(), path = %path.display(), "Starting tag push");

        let mut report = PushReport::new(vendor, path.to_path_buf());

        for tag in &tags {
            match self.adapter.upsert_tag(tag).await {
                Ok(action) => report.record_success(action),
                Err(e) if e.is_fatal() => {
                    error!(vendor = %vendor, tag = %tag.name, error = %e, "Aborting tag push");
                    return Err(e);
                }
                Err(e) => {
                    warn!(vendor = %vendor, tag = %tag.name, error = %e, "Failed to upsert tag");
                    report.record_failure(&tag.name, e.to_string());
                }
            }
        }

        info!(
            vendor = %vendor,
            processed = report.processed,
            created = report.created,
            updated = report.updated,
            applied = report.applied,
            failed = report.failed,
            "Tag push complete"
        );

        Ok(report)
    }
}
