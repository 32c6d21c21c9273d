//! Tag File Store
//!
//! Whole-file YAML persistence of a tag set. The file is the hand-off
//! point between a pull (`get`) and a push (`create`):
//!
//! ```yaml
//! tags:
//! - id: 12
//!   name: web-servers
//! - name: new-tag
//! ```

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use tracing::debug;

use super::error::TagSyncError;
use super::types::Tag;

#[derive(Debug, Serialize)]
struct TagFileOut<'a> {
    tags: &'a [Tag],
}

#[derive(Debug, Default, Deserialize)]
struct TagFileIn {
    #[serde(default)]
    tags: Option<Vec<Tag>>,
}

/// Write tags to `path`, replacing any existing file
pub fn save_tags(tags: &[Tag], path: &Path) -> Result<(), TagSyncError> {
    let yaml = serde_yaml::to_string(&TagFileOut { tags })
        .map_err(|e| TagSyncError::io(path, format!("serialization failed: {}", e)))?;

    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent).map_err(|e| TagSyncError::io(path, e))?;
    }

    fs::write(path, yaml).map_err(|e| TagSyncError::io(path, e))?;

    debug!(path = %path.display(), count = tags.len(), "Saved tag file");
    Ok(())
}

/// Read tags from `path`. An empty document or empty `tags` list is an
/// empty set, not an error.
pub fn load_tags(path: &Path) -> Result<Vec<Tag>, TagSyncError> {
    let content = fs::read_to_string(path).map_err(|e| TagSyncError::io(path, e))?;

    if content.trim().is_empty() {
        debug!(path = %path.display(), "Tag file is empty");
        return Ok(Vec::new());
    }

    let doc: Option<TagFileIn> = serde_yaml::from_str(&content)
        .map_err(|e| TagSyncError::io(path, format!("invalid tag file: {}", e)))?;

    let tags = doc.and_then(|d| d.tags).unwrap_or_default();

    debug!(path = %path.display(), count = tags.len(), "Loaded tag file");
    Ok(tags)
}
