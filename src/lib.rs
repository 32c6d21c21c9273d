//! synctags Library
//!
//! Normalized tag sync across security platform APIs.

pub mod config;
pub mod tags;

pub use tags::{Tag, TagAdapter, TagSyncAgent, TagSyncError, Vendor};
