//! Translate a canonical search request into each provider's query parameters.
//!
//! The proxy has no query language for engagement thresholds, so `min:<metric>:<n>`
//! operators embedded in the free-text query are lifted into dedicated params.
//! Timestamps collapse to calendar dates; anything unparsable is dropped.
use chrono::{DateTime, NaiveDate, NaiveDateTime};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::borrow::Cow;
use std::sync::LazyLock;

pub const DEFAULT_PROXY_LIMIT: &str = "10";

pub const OFFICIAL_TWEET_FIELDS: &str = "author_id,attachments,conversation_id,created_at,in_reply_to_user_id,lang,possibly_sensitive,public_metrics,referenced_tweets";
pub const OFFICIAL_USER_FIELDS: &str =
    "created_at,description,location,profile_image_url,protected,public_metrics,url,verified";
pub const OFFICIAL_MEDIA_FIELDS: &str = "media_key,type,url,preview_image_url";
pub const OFFICIAL_EXPANSIONS: &str = "author_id,attachments.media_keys";

static MIN_RETWEETS: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"min:retweets:(\d+)").expect("static regex"));
static MIN_REPLIES: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"min:replies:(\d+)").expect("static regex"));
static MIN_LIKES: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"min:likes:(\d+)").expect("static regex"));

/// Provider-independent search request.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct CanonicalSearchQuery {
    pub query: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_results: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub start_time: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub end_time: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub lang: Option<String>,
}

impl CanonicalSearchQuery {
    pub fn new(query: impl Into<String>) -> Self {
        Self {
            query: query.into(),
            ..Self::default()
        }
    }
}

/// Query parameters understood by the proxy's `search/search` endpoint.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ProxySearchParams {
    pub query: String,
    pub limit: String,
    pub start_date: Option<String>,
    pub end_date: Option<String>,
    pub language: Option<String>,
    pub min_retweets: Option<String>,
    pub min_replies: Option<String>,
    pub min_likes: Option<String>,
}

impl ProxySearchParams {
    /// Ordered key/value pairs; absent options produce no key.
    pub fn to_query(&self) -> Vec<(&'static str, Cow<'_, str>)> {
        let mut pairs: Vec<(&'static str, Cow<'_, str>)> = vec![
            ("query", Cow::Borrowed(self.query.as_str())),
            ("limit", Cow::Borrowed(self.limit.as_str())),
        ];
        let optional = [
            ("start_date", &self.start_date),
            ("end_date", &self.end_date),
            ("language", &self.language),
            ("min_retweets", &self.min_retweets),
            ("min_replies", &self.min_replies),
            ("min_likes", &self.min_likes),
        ];
        for (key, value) in optional {
            if let Some(v) = value {
                pairs.push((key, Cow::Borrowed(v.as_str())));
            }
        }
        pairs
    }
}

/// Canonical query -> proxy params. Pure; never fails.
///
/// ```
/// use twinbird_social::twitter::query::{translate, CanonicalSearchQuery};
///
/// let q = CanonicalSearchQuery {
///     start_time: Some("2024-01-01T00:00:00Z".into()),
///     ..CanonicalSearchQuery::new("python min:retweets:5 min:likes:100")
/// };
/// let params = translate(&q);
/// assert_eq!(params.limit, "10");
/// assert_eq!(params.start_date.as_deref(), Some("2024-01-01"));
/// assert_eq!(params.min_retweets.as_deref(), Some("5"));
/// assert_eq!(params.min_likes.as_deref(), Some("100"));
/// assert_eq!(params.min_replies, None);
/// ```
pub fn translate(query: &CanonicalSearchQuery) -> ProxySearchParams {
    ProxySearchParams {
        query: query.query.clone(),
        limit: query
            .max_results
            .map(|n| n.to_string())
            .unwrap_or_else(|| DEFAULT_PROXY_LIMIT.to_string()),
        start_date: query.start_time.as_deref().and_then(iso_to_date),
        end_date: query.end_time.as_deref().and_then(iso_to_date),
        language: query.lang.clone(),
        min_retweets: first_capture(&MIN_RETWEETS, &query.query),
        min_replies: first_capture(&MIN_REPLIES, &query.query),
        min_likes: first_capture(&MIN_LIKES, &query.query),
    }
}

/// Canonical query -> official v2 search params.
///
/// The official search endpoint has no language parameter, so `lang` becomes a
/// `lang:` operator. Timestamps pass through verbatim; `max_results` is clamped
/// to the endpoint's accepted range.
pub fn official_search_params(query: &CanonicalSearchQuery) -> Vec<(&'static str, Cow<'static, str>)> {
    let mut q = query.query.trim().to_string();
    if let Some(lang) = query.lang.as_deref().filter(|l| !l.is_empty()) {
        if !q.contains("lang:") {
            q = format!("{q} lang:{lang}");
        }
    }

    let mut params: Vec<(&'static str, Cow<'static, str>)> = vec![("query", q.into())];
    if let Some(n) = query.max_results {
        params.push(("max_results", n.clamp(10, 100).to_string().into()));
    }
    if let Some(start) = &query.start_time {
        params.push(("start_time", start.clone().into()));
    }
    if let Some(end) = &query.end_time {
        params.push(("end_time", end.clone().into()));
    }
    params.push(("tweet.fields", OFFICIAL_TWEET_FIELDS.into()));
    params.push(("user.fields", OFFICIAL_USER_FIELDS.into()));
    params.push(("media.fields", OFFICIAL_MEDIA_FIELDS.into()));
    params.push(("expansions", OFFICIAL_EXPANSIONS.into()));
    params
}

fn first_capture(re: &Regex, haystack: &str) -> Option<String> {
    re.captures(haystack)
        .and_then(|c| c.get(1))
        .map(|m| m.as_str().to_string())
}

/// ISO-8601 timestamp (or bare date) -> `YYYY-MM-DD` in the timestamp's own offset.
fn iso_to_date(raw: &str) -> Option<String> {
    let raw = raw.trim();
    let normalized: Cow<'_, str> = match raw.strip_suffix('Z').or_else(|| raw.strip_suffix('z')) {
        Some(head) => format!("{head}+00:00").into(),
        None => raw.into(),
    };

    let date = DateTime::parse_from_rfc3339(&normalized)
        .map(|dt| dt.date_naive())
        .or_else(|_| DateTime::parse_from_str(&normalized, "%Y-%m-%d %H:%M:%S%.f%:z").map(|dt| dt.date_naive()))
        .or_else(|_| NaiveDateTime::parse_from_str(&normalized, "%Y-%m-%dT%H:%M:%S%.f").map(|dt| dt.date()))
        .or_else(|_| NaiveDateTime::parse_from_str(&normalized, "%Y-%m-%dT%H:%M").map(|dt| dt.date()))
        .or_else(|_| NaiveDateTime::parse_from_str(&normalized, "%Y-%m-%d %H:%M:%S%.f").map(|dt| dt.date()))
        .or_else(|_| NaiveDate::parse_from_str(&normalized, "%Y-%m-%d"));

    match date {
        Ok(d) => Some(d.format("%Y-%m-%d").to_string()),
        Err(e) => {
            tracing::debug!(value = raw, error = %e, "dropping unparsable search date");
            None
        }
    }
}
