//! Minimal HTTP client with safe logging, retries, redirect limits and cookie auth.
//!
//! - Request options: headers, `Auth`, query params, timeout, retries
//! - JSON, text and raw-bytes response helpers sharing one send/retry loop
//! - Redirects are followed up to a configurable cap; overflowing it yields
//!   [`HttpError::TooManyRedirects`] instead of a generic network error
//! - Redacts sensitive query params, cookies and auth headers in logs
//! - Retries 429/5xx with exponential backoff and `Retry-After` support
//! - Optional *raw* request/response logging via `NLM_HTTP_RAW=1`
//! - [`HttpClient::trace_redirects`] walks a redirect chain hop by hop for diagnostics
//!
//! Example (no_run):
//! ```rust
//! # async fn demo() -> Result<(), nlm_http::HttpError> {
//! let client = nlm_http::HttpClient::new("https://api.example.com")?;
//! let got: serde_json::Value = client
//!     .get_json("v1/items", nlm_http::RequestOpts::default())
//!     .await?;
//! # Ok(()) }
//! ```
//!
//! Security: logs only ever include the auth kind, never the cookie itself.

use reqwest::header::{COOKIE, HeaderMap, HeaderValue, LOCATION, RETRY_AFTER};
use reqwest::{Client, Method, StatusCode, Url, redirect};
use serde::Deserialize;
use serde::de::DeserializeOwned;
use std::borrow::Cow;
use std::env;
use std::time::Duration;
use thiserror::Error;
use tokio::time::sleep;

// ==============================
// Raw logging toggles
// ==============================

const RAW_ENV: &str = "NLM_HTTP_RAW";
const RAW_MAX_BODY: usize = 64 * 1024;
const SNIPPET_MAX: usize = 500;

pub const DEFAULT_MAX_REDIRECTS: usize = 20;

const SECRET_QUERY_KEYS: &[&str] = &[
    "access_token",
    "authorization",
    "auth",
    "key",
    "api_key",
    "token",
    "secret",
    "client_secret",
    "bearer",
    "at",
    "f.sid",
    "sid",
    "sig",
    "signature",
];

const SECRET_HEADERS: &[&str] = &["authorization", "cookie", "set-cookie", "x-csrf-token"];

fn raw_enabled() -> bool {
    matches!(
        env::var(RAW_ENV).as_deref(),
        Ok("1") | Ok("true") | Ok("yes")
    )
}

fn is_secret_query_key(k: &str) -> bool {
    let lower = k.to_ascii_lowercase();
    SECRET_QUERY_KEYS.contains(&lower.as_str())
}

fn cookie_header(opts: &RequestOpts<'_>) -> Result<Option<HeaderValue>, HttpError> {
    match &opts.auth {
        Some(Auth::Cookies(cookie)) => HeaderValue::from_str(cookie)
            .map(Some)
            .map_err(|e| HttpError::Build(format!("invalid Cookie header: {e}"))),
        None => Ok(None),
    }
}

fn is_secret_header(k: &str) -> bool {
    SECRET_HEADERS.iter().any(|s| k.eq_ignore_ascii_case(s))
}

/// Render a best-effort curl command for repro/debug, with secrets redacted.
fn make_curl(method: &Method, url: &Url, headers: &HeaderMap) -> String {
    let mut parts = vec!["curl".to_string(), format!("-X{}", method)];
    for (name, val) in redact_headers(headers) {
        parts.push(format!("-H '{}: {}'", name, val.replace('\'', r"'\''")));
    }
    let (host_path, q) = redact_query(url);
    let query = q
        .iter()
        .map(|(k, v)| format!("{k}={v}"))
        .collect::<Vec<_>>()
        .join("&");
    if query.is_empty() {
        parts.push(format!("'{}://{}'", url.scheme(), host_path));
    } else {
        parts.push(format!("'{}://{}?{}'", url.scheme(), host_path, query));
    }
    parts.join(" ")
}

fn redact_headers(h: &HeaderMap) -> Vec<(String, String)> {
    h.iter()
        .map(|(k, v)| {
            let key = k.as_str().to_string();
            let val = if is_secret_header(&key) {
                "<redacted>".to_string()
            } else {
                v.to_str().unwrap_or("").to_string()
            };
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
    #[error("network error: {0}")]
    Network(String),
    #[error("too many redirects (limit {limit}) while fetching {host_path}")]
    TooManyRedirects { limit: usize, host_path: String },
    #[error("decode error: {0}, body_snippet: {1}")]
    Decode(String, String),
    #[error("server returned error {status}: {message}, request_id={request_id}")]
    Api {
        status: StatusCode,
        message: String,
        request_id: String,
    },
}

impl HttpError {
    /// Whether the failure was a redirect loop (typically an expired session).
    pub fn is_redirect_loop(&self) -> bool {
        matches!(self, HttpError::TooManyRedirects { .. })
    }
}

// ==============================
// Auth & Request Options
// ==============================

/// Authentication strategies supported by the HTTP client helpers.
///
/// ```
/// use nlm_http::Auth;
///
/// let Auth::Cookies(value) = Auth::Cookies("SID=abc; HSID=def");
/// assert!(value.starts_with("SID="));
/// ```
#[derive(Clone, Debug)]
pub enum Auth<'a> {
    /// Pre-rendered `Cookie:` header value from a browser session.
    Cookies(&'a str),
}

impl Auth<'_> {
    fn kind(&self) -> &'static str {
        match self {
            Auth::Cookies(_) => "cookies",
        }
    }
}

/// Per-request tuning knobs for the HTTP client.
///
/// ```
/// use nlm_http::{Auth, RequestOpts};
/// use std::time::Duration;
///
/// let opts = RequestOpts {
///     timeout: Some(Duration::from_secs(120)),
///     retries: Some(0),
///     auth: Some(Auth::Cookies("SID=abc")),
///     allow_absolute: true,
///     ..Default::default()
/// };
///
/// assert_eq!(opts.timeout.unwrap().as_secs(), 120);
/// assert!(opts.allow_absolute);
/// ```
#[derive(Clone, Debug, Default)]
pub struct RequestOpts<'a> {
    pub timeout: Option<Duration>,
    pub retries: Option<usize>,
    pub auth: Option<Auth<'a>>,
    pub headers: Option<HeaderMap>,
    pub query: Option<Vec<(&'a str, Cow<'a, str>)>>,
    /// If true and `path` is an absolute URL, use it as-is (ignore base).
    pub allow_absolute: bool,
}

/// A fully read response body together with its status and headers.
#[derive(Debug, Clone)]
pub struct RawResponse {
    pub status: StatusCode,
    pub headers: HeaderMap,
    /// Final URL after following redirects.
    pub url: Url,
    pub body: Vec<u8>,
}

impl RawResponse {
    pub fn content_type(&self) -> Option<&str> {
        self.headers
            .get(reqwest::header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
    }

    pub fn content_len(&self) -> usize {
        self.headers
            .get(reqwest::header::CONTENT_LENGTH)
            .and_then(|v| v.to_str().ok())
            .and_then(|s| s.parse::<usize>().ok())
            .unwrap_or(self.body.len())
    }
}

/// One response observed while walking a redirect chain.
#[derive(Debug, Clone)]
pub struct RedirectHop {
    pub status: StatusCode,
    pub url: Url,
    pub location: Option<String>,
}

/// Result of [`HttpClient::trace_redirects`]; the last hop is the final response.
#[derive(Debug, Clone)]
pub struct RedirectTrace {
    pub hops: Vec<RedirectHop>,
}

impl RedirectTrace {
    /// Number of redirects followed before the final response.
    pub fn redirect_count(&self) -> usize {
        self.hops.len().saturating_sub(1)
    }

    pub fn first(&self) -> Option<&RedirectHop> {
        self.hops.first()
    }

    pub fn last(&self) -> Option<&RedirectHop> {
        self.hops.last()
    }
}

// ==============================
// Client
// ==============================

#[derive(Clone)]
pub struct HttpClient {
    base: Url,
    inner: Client,
    pub default_timeout: Duration,
    pub max_retries: usize,
    pub max_redirects: usize,
}

fn build_inner(max_redirects: usize) -> Result<Client, HttpError> {
    Client::builder()
        .connect_timeout(Duration::from_secs(5))
        .redirect(redirect::Policy::limited(max_redirects))
        .build()
        .map_err(|e| HttpError::Build(e.to_string()))
}

impl HttpClient {
    /// Construct a client anchored to a base URL.
    ///
    /// ```no_run
    /// use nlm_http::{HttpClient, HttpError};
    /// use std::time::Duration;
    ///
    /// let client = HttpClient::new("https://notebooklm.google.com/")?;
    /// assert_eq!(client.default_timeout, Duration::from_secs(15));
    /// assert_eq!(client.max_retries, 2);
    /// assert_eq!(client.max_redirects, 20);
    /// # Ok::<(), HttpError>(())
    /// ```
    pub fn new(base: &str) -> Result<Self, HttpError> {
        let base = Url::parse(base).map_err(|e| HttpError::Url(e.to_string()))?;
        Ok(Self {
            base,
            inner: build_inner(DEFAULT_MAX_REDIRECTS)?,
            default_timeout: Duration::from_secs(15),
            max_retries: 2,
            max_redirects: DEFAULT_MAX_REDIRECTS,
        })
    }

    pub fn with_timeout(mut self, dur: Duration) -> Self {
        self.default_timeout = dur;
        self
    }

    pub fn with_retries(mut self, n: usize) -> Self {
        self.max_retries = n;
        self
    }

    /// Replace the redirect cap. The underlying connection pool is rebuilt.
    pub fn with_max_redirects(mut self, n: usize) -> Result<Self, HttpError> {
        self.inner = build_inner(n)?;
        self.max_redirects = n;
        Ok(self)
    }

    pub fn base(&self) -> &Url {
        &self.base
    }

    /// GET JSON with per-request options.
    pub async fn get_json<T>(&self, path: &str, opts: RequestOpts<'_>) -> Result<T, HttpError>
    where
        T: DeserializeOwned,
    {
        let resp = self.send(Method::GET, path, opts).await?;
        let snippet = snip_body(&resp.body);
        serde_json::from_slice::<T>(&resp.body).map_err(|e| {
            tracing::warn!(
                serde_line=%e.line(),
                serde_col=%e.column(),
                serde_err=%e.to_string(),
                body_snippet=%snippet,
                "http.response.decode_error"
            );
            HttpError::Decode(e.to_string(), snippet)
        })
    }

    /// GET a body as (lossy) UTF-8 text, e.g. an HTML page.
    pub async fn get_text(&self, path: &str, opts: RequestOpts<'_>) -> Result<String, HttpError> {
        let resp = self.send(Method::GET, path, opts).await?;
        Ok(String::from_utf8_lossy(&resp.body).into_owned())
    }

    /// Walk the redirect chain of a GET one hop at a time without following it.
    ///
    /// Every response is recorded with its status and `Location`. The cookie
    /// header is only sent to the starting host. Exceeding `max_redirects`
    /// yields [`HttpError::TooManyRedirects`].
    pub async fn trace_redirects(
        &self,
        path: &str,
        opts: RequestOpts<'_>,
    ) -> Result<RedirectTrace, HttpError> {
        let mut url = self.resolve(path, opts.allow_absolute)?;
        if let Some(q) = &opts.query {
            url.query_pairs_mut()
                .extend_pairs(q.iter().map(|(k, v)| (*k, v.as_ref())));
        }
        let start_host = url.host_str().map(str::to_string);
        let timeout = opts.timeout.unwrap_or(self.default_timeout);
        let cookie = cookie_header(&opts)?;
        let no_follow = Client::builder()
            .connect_timeout(Duration::from_secs(5))
            .redirect(redirect::Policy::none())
            .build()
            .map_err(|e| HttpError::Build(e.to_string()))?;

        let mut hops: Vec<RedirectHop> = Vec::new();
        loop {
            let mut headers = opts.headers.clone().unwrap_or_default();
            if let Some(c) = &cookie {
                if url.host_str() == start_host.as_deref() {
                    headers.insert(COOKIE, c.clone());
                }
            }
            let (host_path, _) = redact_query(&url);
            let resp = no_follow
                .get(url.clone())
                .timeout(timeout)
                .headers(headers)
                .send()
                .await
                .map_err(|e| HttpError::Network(e.to_string()))?;
            let status = resp.status();
            let location = resp
                .headers()
                .get(LOCATION)
                .and_then(|v| v.to_str().ok())
                .map(str::to_string);
            tracing::debug!(
                hop = hops.len(),
                %status,
                host_path = %host_path,
                has_location = location.is_some(),
                "http.redirect.hop"
            );

            let next = match (&location, status.is_redirection()) {
                (Some(loc), true) => Some(
                    url.join(loc)
                        .map_err(|e| HttpError::Url(format!("bad Location {loc:?}: {e}")))?,
                ),
                _ => None,
            };
            hops.push(RedirectHop {
                status,
                url: url.clone(),
                location,
            });
            match next {
                Some(_) if hops.len() > self.max_redirects => {
                    tracing::warn!(
                        host_path = %host_path,
                        limit = self.max_redirects,
                        "http.too_many_redirects"
                    );
                    return Err(HttpError::TooManyRedirects {
                        limit: self.max_redirects,
                        host_path,
                    });
                }
                Some(next) => url = next,
                None => return Ok(RedirectTrace { hops }),
            }
        }
    }

    /// GET a body as raw bytes along with status/headers, e.g. a media download.
    pub async fn get_bytes(
        &self,
        path: &str,
        opts: RequestOpts<'_>,
    ) -> Result<RawResponse, HttpError> {
        self.send(Method::GET, path, opts).await
    }

    fn resolve(&self, path: &str, allow_absolute: bool) -> Result<Url, HttpError> {
        if allow_absolute {
            if let Ok(abs) = Url::parse(path) {
                return Ok(abs);
            }
        }
        self.base
            .join(path)
            .map_err(|e| HttpError::Url(e.to_string()))
    }

    // ==============================
    // Core request implementation
    // ==============================

    async fn send(
        &self,
        method: Method,
        path: &str,
        opts: RequestOpts<'_>,
    ) -> Result<RawResponse, HttpError> {
        let url = self.resolve(path, opts.allow_absolute)?;

        let mut attempt = 0usize;
        let max_retries = opts.retries.unwrap_or(self.max_retries);
        let timeout = opts.timeout.unwrap_or(self.default_timeout);
        let auth_kind = opts.auth.as_ref().map(Auth::kind).unwrap_or("none");

        loop {
            // ----- Build request -----
            let mut rb = self
                .inner
                .request(method.clone(), url.clone())
                .timeout(timeout);

            if let Some(q) = &opts.query {
                let pairs: Vec<(&str, &str)> = q.iter().map(|(k, v)| (*k, v.as_ref())).collect();
                rb = rb.query(&pairs);
            }

            let mut merged = opts.headers.clone().unwrap_or_default();
            if let Some(cookie) = cookie_header(&opts)? {
                merged.insert(COOKIE, cookie);
            }
            rb = rb.headers(merged.clone());

            // ----- Safe request logging (pre-send) -----
            let (host_path, mut redacted_q) = redact_query(&url);
            if let Some(q) = &opts.query {
                redacted_q.extend(q.iter().map(|(k, v)| {
                    let v = if is_secret_query_key(k) {
                        "<redacted>".to_string()
                    } else {
                        v.as_ref().to_string()
                    };
                    ((*k).to_string(), v)
                }));
            }

            let req_id = format!(
                "r{:x}",
                std::time::SystemTime::now()
                    .duration_since(std::time::UNIX_EPOCH)
                    .unwrap_or_default()
                    .as_nanos()
            );

            tracing::debug!(
                req_id=%req_id,
                attempt=attempt + 1,
                max_retries,
                method=%method,
                host_path=%host_path,
                query=?redacted_q,
                timeout_ms=timeout.as_millis() as u64,
                max_redirects=self.max_redirects,
                auth_kind,
                "http.request.start"
            );

            if raw_enabled() {
                let curl = make_curl(&method, &url, &merged);
                tracing::debug!(target: "http.raw", %req_id, %curl, "request");
            }

            // ----- Send -----
            let t0 = std::time::Instant::now();
            let resp = match rb.send().await {
                Ok(resp) => resp,
                Err(err) if err.is_redirect() => {
                    tracing::warn!(
                        req_id=%req_id,
                        host_path=%host_path,
                        limit=self.max_redirects,
                        "http.too_many_redirects"
                    );
                    return Err(HttpError::TooManyRedirects {
                        limit: self.max_redirects,
                        host_path,
                    });
                }
                Err(err) => {
                    let message = err.to_string();
                    if attempt < max_retries {
                        attempt += 1;
                        let delay = backoff(attempt);
                        tracing::warn!(
                            req_id=%req_id,
                            attempt,
                            max_retries,
                            backoff_ms=delay.as_millis() as u64,
                            message=%message,
                            "http.retrying.network_send"
                        );
                        sleep(delay).await;
                        continue;
                    }
                    tracing::warn!(
                        req_id=%req_id,
                        attempt,
                        max_retries,
                        message=%message,
                        "http.network_error.send"
                    );
                    return Err(HttpError::Network(message));
                }
            };
            let status = resp.status();
            let headers = resp.headers().clone();
            let final_url = resp.url().clone();
            let bytes = match resp.bytes().await {
                Ok(bytes) => bytes,
                Err(err) => {
                    let message = err.to_string();
                    if attempt < max_retries {
                        attempt += 1;
                        let delay = backoff(attempt);
                        tracing::warn!(
                            req_id=%req_id,
                            attempt,
                            max_retries,
                            backoff_ms=delay.as_millis() as u64,
                            message=%message,
                            "http.retrying.network_body"
                        );
                        sleep(delay).await;
                        continue;
                    }
                    tracing::warn!(
                        req_id=%req_id,
                        attempt,
                        max_retries,
                        message=%message,
                        "http.network_error.body"
                    );
                    return Err(HttpError::Network(message));
                }
            };
            let dur_ms = t0.elapsed().as_millis() as u64;

            let req_hdr_id = headers
                .get("x-request-id")
                .or_else(|| headers.get("x-correlation-id"))
                .and_then(|v| v.to_str().ok())
                .unwrap_or("-")
                .to_string();
            let redirected = final_url != url;

            tracing::debug!(
                req_id=%req_id,
                %status,
                duration_ms=dur_ms,
                body_len=bytes.len(),
                redirected,
                x_request_id=%req_hdr_id,
                content_type=?headers.get(reqwest::header::CONTENT_TYPE),
                "http.response.headers"
            );

            if raw_enabled() {
                let hdrs = redact_headers(&headers);
                let truncated = bytes.len() > RAW_MAX_BODY;
                let text = String::from_utf8_lossy(&bytes[..bytes.len().min(RAW_MAX_BODY)]);
                tracing::info!(
                    target:"http.raw",
                    %req_id,
                    status=%status,
                    duration_ms=dur_ms,
                    headers=?hdrs,
                    body=%text,
                    truncated
                );
            }

            // ----- Success path -----
            if status.is_success() {
                return Ok(RawResponse {
                    status,
                    headers,
                    url: final_url,
                    body: bytes.to_vec(),
                });
            }

            // ----- Non-success: maybe retry -----
            let snippet = snip_body(&bytes);
            let message = extract_error_message(&bytes);
            let is_429 = status == StatusCode::TOO_MANY_REQUESTS;
            let is_5xx = status.is_server_error();

            if (is_429 || is_5xx) && attempt < max_retries {
                attempt += 1;
                let delay = match retry_after_delay_secs(&headers) {
                    Some(secs) => Duration::from_secs(secs),
                    None if is_429 => backoff(attempt).max(Duration::from_millis(1100)),
                    None => backoff(attempt),
                };
                tracing::warn!(
                    req_id=%req_id,
                    %status,
                    attempt,
                    max_retries,
                    backoff_ms=delay.as_millis() as u64,
                    message=%message,
                    body_snippet=%snippet,
                    "http.retrying"
                );
                sleep(delay).await;
                continue;
            }

            tracing::warn!(
                req_id=%req_id,
                %status,
                message=%message,
                x_request_id=%req_hdr_id,
                body_snippet=%snippet,
                "http.error"
            );
            return Err(HttpError::Api {
                status,
                message,
                request_id: req_hdr_id,
            });
        }
    }
}

// ==============================
// Helpers
// ==============================

fn backoff(attempt: usize) -> Duration {
    let shift = attempt.saturating_sub(1).min(16) as u32;
    Duration::from_millis(200u64.saturating_mul(1u64 << shift))
}

fn extract_error_message(body: &[u8]) -> String {
    // {"error":{"message":"..."}}
    #[derive(Deserialize)]
    struct Envelope {
        error: Detail,
    }
    #[derive(Deserialize)]
    struct Detail {
        message: String,
    }

    // {"message":"..."} or {"detail":"..."} or {"error":"..."}
    #[derive(Deserialize)]
    struct Msg {
        #[serde(default)]
        message: String,
        #[serde(default)]
        detail: String,
        #[serde(default)]
        error: String,
    }

    if let Ok(env) = serde_json::from_slice::<Envelope>(body) {
        return env.error.message;
    }
    if let Ok(m) = serde_json::from_slice::<Msg>(body) {
        for s in [m.message, m.detail, m.error] {
            if !s.is_empty() {
                return s;
            }
        }
    }
    snip_body(body)
}

fn retry_after_delay_secs(h: &HeaderMap) -> Option<u64> {
    h.get(RETRY_AFTER)
        .and_then(|v| v.to_str().ok())?
        .parse()
        .ok()
}

fn snip_body(body: &[u8]) -> String {
    let mut snip = String::from_utf8_lossy(body).to_string();
    if snip.len() > SNIPPET_MAX {
        let mut cut = SNIPPET_MAX;
        while !snip.is_char_boundary(cut) {
            cut -= 1;
        }
        snip.truncate(cut);
        snip.push_str("...");
    }
    snip
}

/// "host + path" plus the redacted query list, for logging.
fn redact_query(url: &Url) -> (String, Vec<(String, String)>) {
    let host_path = format!("{}{}", url.host_str().unwrap_or("-"), url.path());
    let redacted = url
        .query_pairs()
        .map(|(k, v)| {
            let k = k.to_string();
            let v = if is_secret_query_key(&k) {
                "<redacted>".to_string()
            } else {
                v.to_string()
            };
            (k, v)
        })
        .collect::<Vec<_>>();
    (host_path, redacted)
}
