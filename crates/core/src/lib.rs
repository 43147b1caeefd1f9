//! Core domain types shared across assetcat crates.
//!
//! This crate defines:
//! - Application configuration (catalog, storage, asset location, lookups)
//! - Manifest and deletion record types and batch discriminators
//! - Deletion detection over a manifest snapshot

pub mod config;
pub mod deletions;
pub mod error;
pub mod record;

pub use deletions::{ManifestIndex, detect_deletions, read_filename_list};
pub use error::{Error, Result};
pub use record::{DeletionRecord, ManifestRecord, MatchMode, RecordType};
