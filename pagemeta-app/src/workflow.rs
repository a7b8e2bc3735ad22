//! The lookup flow: validate, consult the cache, fetch and scan on a miss,
//! store, present.
//!
//! [`Workflow`] is the explicit context object holding the fetcher and the
//! cache, so tests can run it against a mock server and an in-memory store.

use crate::command::Command;
use crate::feedback::Feedback;
use pagemeta_cache::{CacheKey, CacheStore, DEFAULT_MAX_AGE, MetaCache};
use pagemeta_common::MetadataRecord;
use pagemeta_http::{HttpError, PageFetcher};
use pagemeta_web::{MetaScanner, Scan, ValidationError, normalize_url};
use std::time::Duration;
use thiserror::Error;
use url::Url;

#[derive(Debug, Error)]
pub enum LookupError {
    #[error(transparent)]
    Validation(#[from] ValidationError),
    #[error(transparent)]
    Transport(#[from] HttpError),
}

pub struct Workflow<S> {
    fetcher: PageFetcher,
    cache: MetaCache<S>,
    max_age: Duration,
}

impl<S: CacheStore> Workflow<S> {
    pub fn new(fetcher: PageFetcher, store: S) -> Self {
        Self {
            fetcher,
            cache: MetaCache::new(store),
            max_age: DEFAULT_MAX_AGE,
        }
    }

    pub fn with_max_age(mut self, max_age: Duration) -> Self {
        self.max_age = max_age;
        self
    }

    pub fn cache(&self) -> &MetaCache<S> {
        &self.cache
    }

    /// Answer one launcher query. Never fails: errors become a single item.
    pub async fn run(&self, query: &str) -> Feedback {
        match Command::parse(query) {
            Command::Help => Feedback::help(),
            Command::Invalid(q) => {
                tracing::info!(query = %q, "pagemeta.query.invalid");
                Feedback::bad_format()
            }
            Command::Lookup(q) => match self.lookup(&q).await {
                Ok(record) => Feedback::page(&q, &record),
                Err(err) => {
                    tracing::warn!(query = %q, message = %err, "pagemeta.lookup.failed");
                    Feedback::error(err.to_string())
                }
            },
        }
    }

    /// Cached record while it is fresh, otherwise a fresh fetch and scan
    /// whose raw result replaces the cache entry. A failed fetch is returned
    /// as an error even when a stale record exists.
    pub async fn lookup(&self, query: &str) -> Result<MetadataRecord, LookupError> {
        let url = normalize_url(query)?;
        let key = CacheKey::for_url(url.as_str());

        let cached = self.load_cached(&key);
        if !self.cache.is_expired(&key, self.max_age) {
            if let Some(record) = cached {
                tracing::debug!(key = %key, "pagemeta.lookup.cache_hit");
                return Ok(record);
            }
        }

        tracing::debug!(
            key = %key,
            url = %url,
            stale = cached.is_some(),
            "pagemeta.lookup.refresh"
        );
        let record = self.fetch_and_extract(&url).await?;

        if let Err(err) = self.cache.store(&key, &record) {
            tracing::warn!(key = %key, message = %err, "pagemeta.cache.store_failed");
        }
        Ok(record)
    }

    fn load_cached(&self, key: &CacheKey) -> Option<MetadataRecord> {
        if !self.cache.exists(key) {
            return None;
        }
        match self.cache.load(key) {
            Ok(record) => record,
            Err(err) => {
                tracing::warn!(key = %key, message = %err, "pagemeta.cache.load_failed");
                None
            }
        }
    }

    async fn fetch_and_extract(&self, url: &Url) -> Result<MetadataRecord, HttpError> {
        let mut page = self.fetcher.fetch(url).await?;
        let mut scanner = MetaScanner::new();
        while let Some(chunk) = page.chunk().await? {
            if scanner.feed(&chunk) == Scan::Done {
                break;
            }
        }
        let reached_body = scanner.is_done();
        let record = scanner.finish();
        tracing::debug!(
            status = %page.status(),
            final_url = %page.url(),
            bytes = page.bytes_received(),
            reached_body,
            empty = record.is_empty(),
            "pagemeta.lookup.fetched"
        );
        Ok(record)
    }
}
