//! Cross-Platform Tag Sync
//!
//! Keeps one normalized tag vocabulary across Qualys, CrowdStrike Falcon
//! and NinjaOne.
//!
//! ## Architecture
//!
//! - **Canonical model**: [`Tag`] with names normalized by [`normalize_name`]
//! - **Adapters**: one [`TagAdapter`] per vendor, owning auth and wire format
//! - **Store**: YAML tag files used as the hand-off between get and create
//! - **Orchestrator**: [`TagSyncAgent`] running pull, push and sync flows

mod error;
mod orchestrator;
pub mod providers;
pub mod store;
mod types;

pub use error::TagSyncError;
pub use orchestrator::{TagPaths, TagSyncAgent};
pub use providers::TagAdapter;
pub use types::{
    normalize_name, PullReport, PushReport, SyncReport, Tag, TagFailure, UpsertAction, Vendor,
};
