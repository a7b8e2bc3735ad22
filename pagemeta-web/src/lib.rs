//! Page metadata discovery.
//!
//! - Syntactic URL pre-filter and normalization (`validate`)
//! - Streaming `<head>` scan for title and meta tags (`extract`)
//! - Title cleanup and site-name heuristics (`title`)
//!
//! Nothing here touches the network or the filesystem; bytes come in from
//! the fetcher and a [`pagemeta_common::MetadataRecord`] comes out.

pub mod extract;
pub mod title;
pub mod validate;

pub use extract::{MetaScanner, Scan, extract_from_str};
pub use validate::{ValidationError, looks_like_url, normalize_url};
