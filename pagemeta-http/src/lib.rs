//! Single-attempt page fetcher with a browser identity and safe logging.
//!
//! - One `GET` per call, no retries: failures go straight back to the caller
//! - Fixed desktop-browser `User-Agent` so bot filters serve the real page
//! - TLS certificate verification is configurable and off by default
//! - The body is handed out chunk by chunk through [`FetchedPage`]; dropping
//!   the page releases the connection on every exit path
//! - Optional *raw* request/response logging via `PAGEMETA_HTTP_RAW=1`
//!
//! Example (no_run):
//! ```no_run
//! # async fn demo() -> Result<(), pagemeta_http::HttpError> {
//! use pagemeta_http::{FetchOptions, PageFetcher};
//!
//! let fetcher = PageFetcher::new(FetchOptions::default())?;
//! let url = reqwest::Url::parse("https://example.com/").unwrap();
//! let mut page = fetcher.fetch(&url).await?;
//! while let Some(chunk) = page.chunk().await? {
//!     println!("{} bytes", chunk.len());
//! }
//! # Ok(()) }
//! ```
//!
//! Observability: structured `tracing` events are emitted for request start,
//! response headers, body progress, final errors, and (optionally) raw
//! request/response lines (target `http.raw`) when `PAGEMETA_HTTP_RAW=1`.

use bytes::Bytes;
use reqwest::header::{HeaderMap, HeaderValue, USER_AGENT};
use reqwest::{Client, Response, StatusCode, Url};
use std::env;
use std::time::{Duration, Instant};
use thiserror::Error;

/// Desktop Chrome on macOS; some sites refuse or trim pages for unknown agents.
pub const DEFAULT_USER_AGENT: &str = "Mozilla/5.0 (Macintosh; Intel Mac OS X 11_2_1) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/89.0.4389.128 Safari/537.36";

// ==============================
// Raw logging toggles
// ==============================

const RAW_ENV: &str = "PAGEMETA_HTTP_RAW";

fn raw_enabled() -> bool {
    matches!(
        env::var(RAW_ENV).as_deref(),
        Ok("1") | Ok("true") | Ok("yes")
    )
}

/// Render a best-effort curl command for repro/debug.
fn make_curl(url: &Url, headers: &HeaderMap) -> String {
    let mut parts = vec!["curl".to_string(), "-XGET".to_string()];
    for (name, val) in headers.iter() {
        let v = val.to_str().unwrap_or("");
        parts.push(format!(
            "-H '{}: {}'",
            name.as_str(),
            v.replace('\'', r"'\''")
        ));
    }
    parts.push(format!("'{}'", url.as_str()));
    parts.join(" ")
}

/// Redact cookies before logging response headers.
fn redact_headers(h: &HeaderMap) -> Vec<(String, String)> {
    h.iter()
        .map(|(k, v)| {
            let key = k.as_str().to_string();
            let mut val = v.to_str().unwrap_or("").to_string();
            if key.eq_ignore_ascii_case("set-cookie") || key.eq_ignore_ascii_case("cookie") {
                val = "<redacted>".into();
            }
            (key, val)
        })
        .collect()
}

// ==============================
// Errors
// ==============================

#[derive(Debug, Error)]
pub enum HttpError {
    #[error("invalid URL: {0}")]
    Url(String),
    #[error("request build failed: {0}")]
    Build(String),
    #[error("request timed out: {0}")]
    Timeout(String),
    #[error("connection failed: {0}")]
    Connect(String),
    #[error("network error: {0}")]
    Network(String),
    #[error("body read failed: {0}")]
    Body(String),
}

impl HttpError {
    fn from_send(err: reqwest::Error) -> Self {
        let message = err.to_string();
        if err.is_timeout() {
            HttpError::Timeout(message)
        } else if err.is_connect() {
            HttpError::Connect(message)
        } else if err.is_builder() {
            HttpError::Build(message)
        } else {
            HttpError::Network(message)
        }
    }
}

// ==============================
// Options
// ==============================

/// Knobs for the underlying client.
///
/// ```
/// use pagemeta_http::{FetchOptions, DEFAULT_USER_AGENT};
/// use std::time::Duration;
///
/// let opts = FetchOptions::default().with_timeout(Some(Duration::from_secs(30)));
/// assert_eq!(opts.user_agent, DEFAULT_USER_AGENT);
/// assert!(!opts.verify_tls);
/// assert_eq!(opts.timeout.unwrap().as_secs(), 30);
/// ```
#[derive(Clone, Debug)]
pub struct FetchOptions {
    pub user_agent: String,
    /// When false, invalid or self-signed certificates are accepted.
    pub verify_tls: bool,
    /// Whole-request timeout; `None` leaves the transport default in place.
    pub timeout: Option<Duration>,
    /// TCP/TLS connect phase only.
    pub connect_timeout: Option<Duration>,
}

impl Default for FetchOptions {
    fn default() -> Self {
        Self {
            user_agent: DEFAULT_USER_AGENT.to_string(),
            verify_tls: false,
            timeout: None,
            connect_timeout: None,
        }
    }
}

impl FetchOptions {
    pub fn with_user_agent(mut self, ua: impl Into<String>) -> Self {
        self.user_agent = ua.into();
        self
    }

    pub fn with_verify_tls(mut self, verify: bool) -> Self {
        self.verify_tls = verify;
        self
    }

    pub fn with_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_connect_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.connect_timeout = timeout;
        self
    }
}

// ==============================
// Fetcher
// ==============================

#[derive(Clone)]
pub struct PageFetcher {
    inner: Client,
    headers: HeaderMap,
    opts: FetchOptions,
}

impl PageFetcher {
    /// Build the client. A malformed `User-Agent` or a TLS backend failure
    /// surfaces as [`HttpError::Build`].
    ///
    /// ```
    /// use pagemeta_http::{FetchOptions, HttpError, PageFetcher};
    ///
    /// let err = PageFetcher::new(FetchOptions::default().with_user_agent("bad\nagent"));
    /// assert!(matches!(err, Err(HttpError::Build(_))));
    /// ```
    pub fn new(opts: FetchOptions) -> Result<Self, HttpError> {
        let ua = HeaderValue::from_str(&opts.user_agent)
            .map_err(|e| HttpError::Build(format!("invalid User-Agent header: {e}")))?;
        let mut headers = HeaderMap::new();
        headers.insert(USER_AGENT, ua);

        let mut builder = Client::builder().danger_accept_invalid_certs(!opts.verify_tls);
        if let Some(timeout) = opts.timeout {
            builder = builder.timeout(timeout);
        }
        if let Some(timeout) = opts.connect_timeout {
            builder = builder.connect_timeout(timeout);
        }
        let inner = builder
            .build()
            .map_err(|e| HttpError::Build(e.to_string()))?;

        Ok(Self {
            inner,
            headers,
            opts,
        })
    }

    pub fn options(&self) -> &FetchOptions {
        &self.opts
    }

    /// Issue a single `GET`. Any status is a successful fetch; the caller
    /// decides what to do with error pages.
    pub async fn fetch(&self, url: &Url) -> Result<FetchedPage, HttpError> {
        match url.scheme() {
            "http" | "https" => {}
            other => {
                return Err(HttpError::Url(format!("unsupported scheme: {other}")));
            }
        }

        // Lightweight request id without extra deps
        let req_id = format!(
            "r{:x}",
            std::time::SystemTime::now()
                .duration_since(std::time::UNIX_EPOCH)
                .unwrap_or_default()
                .as_nanos()
        );

        tracing::debug!(
            req_id=%req_id,
            host_path=%format!("{}{}", url.host_str().unwrap_or("-"), url.path()),
            verify_tls=self.opts.verify_tls,
            timeout_ms=?self.opts.timeout.map(|t| t.as_millis() as u64),
            "http.request.start"
        );

        if raw_enabled() {
            let curl = make_curl(url, &self.headers);
            tracing::debug!(target: "http.raw", %req_id, %curl, "request");
        }

        let t0 = Instant::now();
        let response = self
            .inner
            .get(url.clone())
            .headers(self.headers.clone())
            .send()
            .await
            .map_err(|err| {
                let err = HttpError::from_send(err);
                tracing::warn!(
                    req_id=%req_id,
                    message=%err,
                    "http.network_error.send"
                );
                err
            })?;

        let status = response.status();
        let final_url = response.url().clone();
        let redirected = final_url != *url;
        tracing::debug!(
            req_id=%req_id,
            %status,
            duration_ms=t0.elapsed().as_millis() as u64,
            content_length=?response.content_length(),
            redirected,
            "http.response.headers"
        );

        if raw_enabled() {
            let hdrs = redact_headers(response.headers());
            tracing::info!(
                target: "http.raw",
                %req_id,
                status=%status,
                headers=?hdrs
            );
        }

        if !status.is_success() {
            tracing::warn!(req_id=%req_id, %status, "http.response.non_success");
        }

        Ok(FetchedPage {
            req_id,
            status,
            final_url,
            response,
            received: 0,
        })
    }
}

// ==============================
// Response body
// ==============================

/// An in-flight response whose body has not been consumed yet.
pub struct FetchedPage {
    req_id: String,
    status: StatusCode,
    final_url: Url,
    response: Response,
    received: usize,
}

impl FetchedPage {
    pub fn status(&self) -> StatusCode {
        self.status
    }

    /// URL after redirects.
    pub fn url(&self) -> &Url {
        &self.final_url
    }

    pub fn bytes_received(&self) -> usize {
        self.received
    }

    /// Next piece of the body, `None` once the body is exhausted.
    pub async fn chunk(&mut self) -> Result<Option<Bytes>, HttpError> {
        match self.response.chunk().await {
            Ok(Some(bytes)) => {
                self.received += bytes.len();
                tracing::trace!(
                    req_id=%self.req_id,
                    chunk_len=bytes.len(),
                    received=self.received,
                    "http.response.chunk"
                );
                Ok(Some(bytes))
            }
            Ok(None) => {
                tracing::debug!(
                    req_id=%self.req_id,
                    received=self.received,
                    "http.response.complete"
                );
                Ok(None)
            }
            Err(err) => {
                let message = err.to_string();
                tracing::warn!(
                    req_id=%self.req_id,
                    received=self.received,
                    message=%message,
                    "http.network_error.body"
                );
                Err(HttpError::Body(message))
            }
        }
    }
}

impl Drop for FetchedPage {
    fn drop(&mut self) {
        tracing::trace!(
            req_id=%self.req_id,
            received=self.received,
            "http.response.released"
        );
    }
}
