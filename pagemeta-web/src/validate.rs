//! Syntactic URL pre-filter.
//!
//! A query is only ever fetched after it passes [`looks_like_url`]; the
//! check says nothing about reachability.

use regex::Regex;
use std::borrow::Cow;
use std::sync::OnceLock;
use thiserror::Error;
use url::Url;

/// Optional `http`/`https`/`ftp`/`ftps` scheme, at least two dot-separated
/// host labels, then an optional tail of path/query/fragment characters.
const URL_SHAPE: &str = concat!(
    r"^(((ht|f)tps?)://)?",
    r"[0-9A-Za-z_-]+(\.[0-9A-Za-z_-]+)+",
    r"([0-9A-Za-z_.,@?^=%&:/~+#-]*[0-9A-Za-z_@?^=%&/~+#-])?$",
);

static URL_SHAPE_RE: OnceLock<Regex> = OnceLock::new();

fn url_shape() -> &'static Regex {
    URL_SHAPE_RE.get_or_init(|| Regex::new(URL_SHAPE).expect("URL shape pattern is valid"))
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ValidationError {
    #[error("not a web address: {0}")]
    Shape(String),
    #[error("cannot parse {input}: {reason}")]
    Parse { input: String, reason: String },
}

/// True when `query` has the shape of a web address.
pub fn looks_like_url(query: &str) -> bool {
    url_shape().is_match(query)
}

/// Turn a query that passed [`looks_like_url`] into a fetchable URL,
/// defaulting to `http://` when no scheme was typed.
pub fn normalize_url(query: &str) -> Result<Url, ValidationError> {
    let shape = url_shape()
        .captures(query)
        .ok_or_else(|| ValidationError::Shape(query.to_string()))?;
    // group 1 is the leading `scheme://`; a `://` later in the query doesn't count
    let candidate: Cow<'_, str> = if shape.get(1).is_some() {
        Cow::Borrowed(query)
    } else {
        Cow::Owned(format!("http://{query}"))
    };
    Url::parse(&candidate).map_err(|e| ValidationError::Parse {
        input: query.to_string(),
        reason: e.to_string(),
    })
}
