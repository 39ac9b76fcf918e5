//! GET-only HTTP collaborator for the provider clients.
//!
//! [`HttpClient::get_raw`] reports what the upstream said rather than judging
//! it: decoded JSON when the body parses, the numeric status, and the body
//! text. Non-2xx answers are ordinary return values. [`HttpError`] is reserved
//! for the cases where no response exists (bad URL, unusable credential,
//! network failure).
//!
//! ```no_run
//! # async fn demo() -> Result<(), twinbird_http::HttpError> {
//! let client = twinbird_http::HttpClient::new("https://api.example.com")?;
//! let got = client
//!     .get_raw("v1/items", twinbird_http::RequestOpts::default())
//!     .await?;
//! println!("{} {}", got.status, got.text);
//! # Ok(()) }
//! ```
//!
//! Logging never includes credentials: auth headers and secret-looking query
//! parameters are replaced with `<redacted>`. Setting `TWINBIRD_HTTP_RAW=1`
//! adds a curl line and the (capped) response body under target `http.raw`.

use reqwest::header::{AUTHORIZATION, HeaderMap, HeaderName, HeaderValue};
use reqwest::{Client, StatusCode, Url};
use serde_json::Value;
use std::borrow::Cow;
use std::time::{Duration, Instant, SystemTime, UNIX_EPOCH};
use thiserror::Error;

const RAW_ENV: &str = "TWINBIRD_HTTP_RAW";
const RAW_BODY_CAP: usize = 64 * 1024;
const SNIPPET_CAP: usize = 500;
const REDACTED: &str = "<redacted>";

const SECRET_HEADERS: [&str; 3] = ["authorization", "x-rapidapi-key", "x-api-key"];
const SECRET_PARAMS: [&str; 9] = [
    "access_token",
    "api_key",
    "apikey",
    "auth",
    "bearer",
    "key",
    "rapidapi_key",
    "secret",
    "token",
];

#[derive(Debug, Error)]
pub enum HttpError {
    #[error("invalid URL: {0}")]
    Url(String),
    #[error("request build failed: {0}")]
    Build(String),
    #[error("network error: {0}")]
    Network(String),
}

/// How a request authenticates.
///
/// ```
/// use twinbird_http::Auth;
///
/// let bearer = Auth::Bearer("token");
/// assert_eq!(bearer.label(), "bearer");
/// assert_eq!(Auth::None.label(), "none");
/// ```
#[derive(Clone, Debug)]
pub enum Auth<'a> {
    /// `Authorization: Bearer <token>`
    Bearer(&'a str),
    /// Pre-built credential headers (e.g. the RapidAPI key/host pair).
    Headers(HeaderMap),
    None,
}

impl Auth<'_> {
    pub fn label(&self) -> &'static str {
        match self {
            Auth::Bearer(_) => "bearer",
            Auth::Headers(_) => "headers",
            Auth::None => "none",
        }
    }
}

/// Per-request knobs; everything is optional.
///
/// ```
/// use twinbird_http::RequestOpts;
/// use std::time::Duration;
///
/// let opts = RequestOpts {
///     timeout: Some(Duration::from_secs(30)),
///     query: Some(vec![("tweet_id", "42".into())]),
///     ..Default::default()
/// };
/// assert!(opts.auth.is_none());
/// ```
#[derive(Clone, Debug, Default)]
pub struct RequestOpts<'a> {
    pub timeout: Option<Duration>,
    pub auth: Option<Auth<'a>>,
    pub headers: Option<HeaderMap>,
    pub query: Option<Vec<(&'a str, Cow<'a, str>)>>,
}

/// Everything the upstream returned.
#[derive(Debug, Clone, PartialEq)]
pub struct RawResponse {
    pub json: Option<Value>,
    pub status: u16,
    pub text: String,
}

impl RawResponse {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    /// The decoded body, only when the status is 2xx and the body is a
    /// non-empty JSON value. Anything else counts as "no data".
    pub fn body(&self) -> Option<&Value> {
        if !self.is_success() {
            return None;
        }
        match &self.json {
            None | Some(Value::Null) => None,
            Some(Value::Object(map)) if map.is_empty() => None,
            Some(Value::Array(items)) if items.is_empty() => None,
            Some(other) => Some(other),
        }
    }
}

#[derive(Clone)]
pub struct HttpClient {
    base: Url,
    inner: Client,
    pub default_timeout: Duration,
}

impl HttpClient {
    /// Client rooted at `base`; request paths are joined onto it.
    ///
    /// ```no_run
    /// use twinbird_http::{HttpClient, HttpError};
    /// use std::time::Duration;
    ///
    /// let client = HttpClient::new("https://api.example.com/v2")?;
    /// assert_eq!(client.base().as_str(), "https://api.example.com/v2/");
    /// assert_eq!(client.default_timeout, Duration::from_secs(15));
    /// # Ok::<(), HttpError>(())
    /// ```
    pub fn new(base: &str) -> Result<Self, HttpError> {
        // Url::join replaces the last segment unless the base ends with '/'.
        let rooted = format!("{}/", base.trim_end_matches('/'));
        let base = Url::parse(&rooted).map_err(|e| HttpError::Url(e.to_string()))?;
        let inner = Client::builder()
            .connect_timeout(Duration::from_secs(5))
            .user_agent(concat!("twinbird/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| HttpError::Build(e.to_string()))?;
        Ok(Self {
            base,
            inner,
            default_timeout: Duration::from_secs(15),
        })
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.default_timeout = timeout;
        self
    }

    pub fn base(&self) -> &Url {
        &self.base
    }

    /// GET `path` (relative to the base) and return whatever came back.
    pub async fn get_raw(&self, path: &str, opts: RequestOpts<'_>) -> Result<RawResponse, HttpError> {
        let mut url = self
            .base
            .join(path.trim_start_matches('/'))
            .map_err(|e| HttpError::Url(e.to_string()))?;
        if let Some(pairs) = &opts.query {
            url.query_pairs_mut()
                .extend_pairs(pairs.iter().map(|(k, v)| (*k, v.as_ref())));
        }

        let headers = request_headers(&opts)?;
        let timeout = opts.timeout.unwrap_or(self.default_timeout);
        let req_id = request_id();
        let auth = opts.auth.as_ref().map_or("none", Auth::label);

        tracing::debug!(
            %req_id,
            url = %redact_url(&url),
            auth,
            timeout_ms = timeout.as_millis() as u64,
            "http.get"
        );
        if raw_logging() {
            tracing::debug!(target: "http.raw", %req_id, curl = %curl_line(&url, &headers), "request");
        }

        let started = Instant::now();
        let resp = self
            .inner
            .get(url)
            .headers(headers)
            .timeout(timeout)
            .send()
            .await
            .map_err(|e| network_error(&req_id, "send", e))?;
        let status = resp.status();
        let resp_headers = resp.headers().clone();
        let bytes = resp
            .bytes()
            .await
            .map_err(|e| network_error(&req_id, "body", e))?;
        let elapsed_ms = started.elapsed().as_millis() as u64;

        log_response(&req_id, status, &resp_headers, &bytes, elapsed_ms);

        let json = match serde_json::from_slice::<Value>(&bytes) {
            Ok(v) => Some(v),
            Err(_) if bytes.is_empty() => None,
            Err(e) => {
                tracing::debug!(%req_id, error = %e, body = %snippet(&bytes), "http.body_not_json");
                None
            }
        };

        Ok(RawResponse {
            json,
            status: status.as_u16(),
            text: String::from_utf8_lossy(&bytes).into_owned(),
        })
    }
}

/// The header pair a RapidAPI gateway expects.
pub fn rapidapi_headers(api_key: &str, host: &str) -> Result<HeaderMap, HttpError> {
    let value = |raw: &str, what: &str| {
        HeaderValue::from_str(raw.trim())
            .map_err(|e| HttpError::Build(format!("invalid {what} header: {e}")))
    };
    let mut headers = HeaderMap::new();
    headers.insert(HeaderName::from_static("x-rapidapi-key"), value(api_key, "API key")?);
    headers.insert(HeaderName::from_static("x-rapidapi-host"), value(host, "API host")?);
    Ok(headers)
}

fn request_headers(opts: &RequestOpts<'_>) -> Result<HeaderMap, HttpError> {
    let mut headers = opts.headers.clone().unwrap_or_default();
    match &opts.auth {
        Some(Auth::Bearer(token)) => {
            let token = clean_token(token)?;
            let value = HeaderValue::from_str(&format!("Bearer {token}"))
                .map_err(|e| HttpError::Build(format!("invalid Authorization header: {e}")))?;
            headers.insert(AUTHORIZATION, value);
        }
        Some(Auth::Headers(extra)) => {
            for (name, value) in extra {
                headers.insert(name.clone(), value.clone());
            }
        }
        Some(Auth::None) | None => {}
    }
    Ok(headers)
}

/// Tokens pasted from dashboards often carry quotes or line breaks.
fn clean_token(raw: &str) -> Result<String, HttpError> {
    let token: String = raw
        .trim()
        .trim_matches(['"', '\''])
        .chars()
        .filter(|c| !c.is_ascii_whitespace())
        .collect();
    if !token.is_ascii() {
        return Err(HttpError::Build("bearer token contains non-ASCII characters".into()));
    }
    if token.bytes().any(|b| b.is_ascii_control()) {
        return Err(HttpError::Build("bearer token contains control characters".into()));
    }
    Ok(token)
}

fn network_error(req_id: &str, stage: &'static str, err: reqwest::Error) -> HttpError {
    tracing::warn!(%req_id, stage, error = %err, "http.network_error");
    HttpError::Network(err.to_string())
}

fn log_response(req_id: &str, status: StatusCode, headers: &HeaderMap, bytes: &[u8], elapsed_ms: u64) {
    let upstream_id = headers
        .get("x-request-id")
        .or_else(|| headers.get("x-correlation-id"))
        .and_then(|v| v.to_str().ok())
        .unwrap_or("-");

    tracing::debug!(
        %req_id,
        %status,
        elapsed_ms,
        body_len = bytes.len(),
        upstream_id,
        "http.response"
    );

    if raw_logging() {
        let cut = bytes.len().min(RAW_BODY_CAP);
        tracing::info!(
            target: "http.raw",
            %req_id,
            %status,
            headers = ?redact_headers(headers),
            body = %String::from_utf8_lossy(&bytes[..cut]),
            truncated = bytes.len() > RAW_BODY_CAP,
            "response"
        );
    }

    if matches!(status, StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN) {
        tracing::error!(
            %req_id,
            %status,
            message = %error_message(bytes),
            "http.credentials_rejected"
        );
    } else if !status.is_success() {
        tracing::warn!(%req_id, %status, message = %error_message(bytes), upstream_id, "http.status");
    }
}

fn raw_logging() -> bool {
    matches!(
        std::env::var(RAW_ENV).as_deref(),
        Ok("1" | "true" | "yes")
    )
}

fn request_id() -> String {
    let nanos = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_nanos();
    format!("r{nanos:x}")
}

fn is_secret_header(name: &str) -> bool {
    SECRET_HEADERS.iter().any(|s| name.eq_ignore_ascii_case(s))
}

fn is_secret_param(name: &str) -> bool {
    SECRET_PARAMS.iter().any(|s| name.eq_ignore_ascii_case(s))
}

fn redact_headers(headers: &HeaderMap) -> Vec<(String, String)> {
    headers
        .iter()
        .map(|(name, value)| {
            let shown = if is_secret_header(name.as_str()) {
                REDACTED.to_string()
            } else {
                value.to_str().unwrap_or("<binary>").to_string()
            };
            (name.as_str().to_string(), shown)
        })
        .collect()
}

fn redact_url(url: &Url) -> Url {
    let pairs: Vec<(String, String)> = url
        .query_pairs()
        .map(|(k, v)| {
            let v = if is_secret_param(&k) {
                REDACTED.to_string()
            } else {
                v.into_owned()
            };
            (k.into_owned(), v)
        })
        .collect();
    let mut shown = url.clone();
    if pairs.is_empty() {
        shown.set_query(None);
    } else {
        shown.query_pairs_mut().clear().extend_pairs(pairs);
    }
    shown
}

/// A pasteable curl command with secrets blanked out.
fn curl_line(url: &Url, headers: &HeaderMap) -> String {
    let mut line = String::from("curl -XGET");
    for (name, value) in redact_headers(headers) {
        line.push_str(&format!(" -H '{name}: {}'", value.replace('\'', r"'\''")));
    }
    line.push_str(&format!(" '{}'", redact_url(url)));
    line
}

/// Best human-readable message from an error body.
///
/// Understands the platform's `{"errors": [{detail|message|title}]}` and the
/// flat `{message|detail|error}` shape gateways use; otherwise a snippet.
fn error_message(body: &[u8]) -> String {
    const KEYS: [&str; 4] = ["detail", "message", "title", "error"];
    let pick = |obj: &Value| {
        KEYS.iter()
            .filter_map(|k| obj.get(*k).and_then(Value::as_str))
            .find(|s| !s.is_empty())
            .map(str::to_string)
    };

    if let Ok(v) = serde_json::from_slice::<Value>(body) {
        let nested = v
            .get("errors")
            .and_then(Value::as_array)
            .and_then(|errs| errs.first())
            .and_then(pick);
        if let Some(msg) = nested.or_else(|| pick(&v)) {
            return msg;
        }
    }
    snippet(body)
}

fn snippet(body: &[u8]) -> String {
    let text = String::from_utf8_lossy(body);
    if text.len() <= SNIPPET_CAP {
        return text.into_owned();
    }
    let mut cut = SNIPPET_CAP;
    while !text.is_char_boundary(cut) {
        cut -= 1;
    }
    format!("{}...", &text[..cut])
}
