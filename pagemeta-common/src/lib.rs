//! Common types and utilities shared across PageMeta crates.
//!
//! This crate defines the metadata record every other crate passes around
//! and the observability helpers used by the binary and integration tests.
//! It is intentionally lightweight so that all crates can depend on it
//! without introducing heavy transitive costs.
//!
//! # Overview
//!
//! - [`MetadataRecord`]: title/description/image/site name of one page
//! - [`observability`]: Centralised tracing/logging initialisation
//!
//! # Examples
//!
//! ```rust
//! use pagemeta_common::MetadataRecord;
//!
//! let record = MetadataRecord::default();
//! assert!(record.is_empty());
//! assert_eq!(record.site_name, "");
//! ```
use serde::{Deserialize, Serialize};

pub mod observability;

/// Human-readable metadata extracted from a single web page.
///
/// Every field defaults to the empty string; a record always exists even
/// when nothing was discovered. The serialized field names (`title`,
/// `description`, `image`, `site_name`) are the on-disk cache format.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct MetadataRecord {
    /// Page title, raw as extracted or cleaned for display.
    pub title: String,
    /// Page summary text.
    pub description: String,
    /// Absolute or relative URL of a preview image.
    pub image: String,
    /// Human-readable site/brand label.
    pub site_name: String,
}

impl MetadataRecord {
    /// True when no field carries any text.
    pub fn is_empty(&self) -> bool {
        self.title.is_empty()
            && self.description.is_empty()
            && self.image.is_empty()
            && self.site_name.is_empty()
    }
}
