//! Proxy JSON -> canonical tweet/user/media.
//!
//! The normalizers are total over JSON objects: missing or `null` fields take
//! defaults, and an object without an identifier normalizes to `None` ("no
//! entity"). The only failure is a field holding the wrong JSON kind, which is
//! reported as [`NormalizeError`] instead of being guessed at.
use serde_json::{Map, Value};

use super::types::{
    Attachments, CanonicalMedia, CanonicalTweet, CanonicalUser, MediaKind, ReferenceKind,
    ReferencedTweet, TweetMetrics, UNKNOWN_RETWEET_TARGET, UserMetrics,
};

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum NormalizeError {
    #[error("{field}: expected {expected}, found {found}")]
    UnexpectedType {
        field: String,
        expected: &'static str,
        found: &'static str,
    },

    #[error("malformed {context} body: {message}")]
    Malformed {
        context: &'static str,
        message: String,
    },
}

fn kind_of(v: &Value) -> &'static str {
    match v {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

/// Typed, path-aware accessors over one JSON object.
#[derive(Clone, Copy)]
pub(crate) struct Fields<'a> {
    scope: &'a str,
    map: &'a Map<String, Value>,
}

impl<'a> Fields<'a> {
    /// `null` -> `None`; object -> accessors; anything else is a type error.
    pub(crate) fn of(scope: &'a str, value: &'a Value) -> Result<Option<Self>, NormalizeError> {
        match value {
            Value::Null => Ok(None),
            Value::Object(map) => Ok(Some(Self { scope, map })),
            other => Err(NormalizeError::UnexpectedType {
                field: scope.to_string(),
                expected: "object",
                found: kind_of(other),
            }),
        }
    }

    fn mismatch(&self, key: &str, expected: &'static str, found: &Value) -> NormalizeError {
        NormalizeError::UnexpectedType {
            field: format!("{}.{}", self.scope, key),
            expected,
            found: kind_of(found),
        }
    }

    fn get(&self, key: &str) -> Option<&'a Value> {
        self.map.get(key).filter(|v| !v.is_null())
    }

    fn string(&self, key: &str) -> Result<Option<String>, NormalizeError> {
        match self.get(key) {
            None => Ok(None),
            Some(Value::String(s)) => Ok(Some(s.clone())),
            Some(other) => Err(self.mismatch(key, "string", other)),
        }
    }

    /// Identifiers arrive as strings or integers; empty strings count as absent.
    pub(crate) fn id(&self, key: &str) -> Result<Option<String>, NormalizeError> {
        match self.get(key) {
            None => Ok(None),
            Some(Value::String(s)) if s.is_empty() => Ok(None),
            Some(Value::String(s)) => Ok(Some(s.clone())),
            Some(Value::Number(n)) if n.is_u64() || n.is_i64() => Ok(Some(n.to_string())),
            Some(other) => Err(self.mismatch(key, "string or integer id", other)),
        }
    }

    fn count(&self, key: &str) -> Result<u64, NormalizeError> {
        match self.get(key) {
            None => Ok(0),
            Some(v @ Value::Number(n)) => n
                .as_u64()
                .ok_or_else(|| self.mismatch(key, "non-negative integer", v)),
            Some(other) => Err(self.mismatch(key, "non-negative integer", other)),
        }
    }

    fn flag(&self, key: &str) -> Result<bool, NormalizeError> {
        match self.get(key) {
            None => Ok(false),
            Some(Value::Bool(b)) => Ok(*b),
            Some(Value::Number(n)) => Ok(n.as_f64().is_some_and(|f| f != 0.0)),
            Some(other) => Err(self.mismatch(key, "boolean", other)),
        }
    }

    /// Nested scopes are named after the key that holds them ("user", ...).
    pub(crate) fn object(&self, key: &'a str) -> Result<Option<Fields<'a>>, NormalizeError> {
        match self.get(key) {
            None => Ok(None),
            Some(Value::Object(map)) => Ok(Some(Fields { scope: key, map })),
            Some(other) => Err(self.mismatch(key, "object", other)),
        }
    }

    fn list(&self, key: &str) -> Result<&'a [Value], NormalizeError> {
        match self.get(key) {
            None => Ok(&[]),
            Some(Value::Array(items)) => Ok(items.as_slice()),
            Some(other) => Err(self.mismatch(key, "array", other)),
        }
    }
}

/// Normalize one proxy tweet.
///
/// ```
/// use serde_json::json;
/// use twinbird_social::twitter::normalize::normalize_tweet;
///
/// let tweet = normalize_tweet(&json!({
///     "tweet_id": "1",
///     "text": "hi",
///     "user": {"user_id": "7"},
///     "media_url": ["https://img/1.jpg"],
///     "favorite_count": 3
/// }))
/// .unwrap()
/// .unwrap();
///
/// assert_eq!(tweet.author_id.as_deref(), Some("7"));
/// assert_eq!(tweet.public_metrics.like_count, 3);
/// assert_eq!(tweet.attachments.unwrap().media_keys, vec!["media_1_0"]);
/// ```
pub fn normalize_tweet(raw: &Value) -> Result<Option<CanonicalTweet>, NormalizeError> {
    Ok(normalize_tweet_parts(raw)?.map(|parts| parts.tweet))
}

/// One tweet together with the author and media it carries inline.
pub(crate) struct TweetParts {
    pub(crate) tweet: CanonicalTweet,
    pub(crate) author: Option<CanonicalUser>,
    pub(crate) media: Vec<CanonicalMedia>,
}

pub(crate) fn normalize_tweet_parts(raw: &Value) -> Result<Option<TweetParts>, NormalizeError> {
    let Some(t) = Fields::of("tweet", raw)? else {
        return Ok(None);
    };
    let Some(id) = t.id("tweet_id")? else {
        return Ok(None);
    };

    let author = match t.object("user")? {
        Some(user) => user_from_fields(&user)?,
        None => None,
    };

    let media = media_from_fields(&t, &id)?;
    let attachments = (!media.is_empty()).then(|| Attachments {
        media_keys: media.iter().map(|m| m.media_key.clone()).collect(),
    });

    let mut references = Vec::new();
    if let Some(target) = t.id("in_reply_to_status_id")? {
        references.push(ReferencedTweet {
            kind: ReferenceKind::RepliedTo,
            id: target,
        });
    }
    if let Some(target) = t.id("quoted_status_id")? {
        references.push(ReferencedTweet {
            kind: ReferenceKind::Quoted,
            id: target,
        });
    }
    if t.flag("retweet")? {
        references.push(ReferencedTweet {
            kind: ReferenceKind::Retweeted,
            id: UNKNOWN_RETWEET_TARGET.to_string(),
        });
    }

    let tweet = CanonicalTweet {
        text: t.string("text")?.unwrap_or_default(),
        created_at: t.string("creation_date")?,
        author_id: author.as_ref().map(|a| a.id.clone()),
        conversation_id: t.id("conversation_id")?,
        lang: t.string("language")?,
        possibly_sensitive: false,
        in_reply_to_user_id: None,
        public_metrics: TweetMetrics {
            retweet_count: t.count("retweet_count")?,
            reply_count: t.count("reply_count")?,
            like_count: t.count("favorite_count")?,
            quote_count: t.count("quote_count")?,
            bookmark_count: 0,
        },
        attachments,
        referenced_tweets: (!references.is_empty()).then_some(references),
        id,
    };
    Ok(Some(TweetParts { tweet, author, media }))
}

/// Normalize one proxy user. `verified` is the OR of the legacy and blue marks.
pub fn normalize_user(raw: &Value) -> Result<Option<CanonicalUser>, NormalizeError> {
    let Some(u) = Fields::of("user", raw)? else {
        return Ok(None);
    };
    user_from_fields(&u)
}

pub(crate) fn user_from_fields(u: &Fields<'_>) -> Result<Option<CanonicalUser>, NormalizeError> {
    let Some(id) = u.id("user_id")? else {
        return Ok(None);
    };
    let legacy_verified = u.flag("is_verified")?;
    let blue_verified = u.flag("is_blue_verified")?;

    Ok(Some(CanonicalUser {
        id,
        name: u.string("name")?.unwrap_or_default(),
        username: u.string("username")?.unwrap_or_default(),
        created_at: u.string("creation_date")?,
        description: u.string("description")?.unwrap_or_default(),
        protected: u.flag("is_private")?,
        verified: legacy_verified || blue_verified,
        location: u.string("location")?.unwrap_or_default(),
        profile_image_url: u.string("profile_pic_url")?.unwrap_or_default(),
        url: u.string("external_url")?.unwrap_or_default(),
        public_metrics: UserMetrics {
            followers_count: u.count("follower_count")?,
            following_count: u.count("following_count")?,
            tweet_count: u.count("number_of_tweets")?,
            listed_count: 0,
        },
    }))
}

/// Media attached to one proxy tweet: photos in order, then the video.
///
/// Keys are synthesized (`media_{id}_{i}`, `video_{id}`) because the proxy has
/// no stable media identifiers. A tweet without an id has no media.
pub fn tweet_media(raw: &Value) -> Result<Vec<CanonicalMedia>, NormalizeError> {
    let Some(t) = Fields::of("tweet", raw)? else {
        return Ok(Vec::new());
    };
    match t.id("tweet_id")? {
        Some(id) => media_from_fields(&t, &id),
        None => Ok(Vec::new()),
    }
}

fn media_from_fields(t: &Fields<'_>, tweet_id: &str) -> Result<Vec<CanonicalMedia>, NormalizeError> {
    let mut media = Vec::new();

    for (i, entry) in t.list("media_url")?.iter().enumerate() {
        let url = match entry {
            Value::String(s) => s.clone(),
            other => {
                return Err(NormalizeError::UnexpectedType {
                    field: format!("tweet.media_url[{i}]"),
                    expected: "string",
                    found: kind_of(other),
                });
            }
        };
        media.push(CanonicalMedia {
            media_key: format!("media_{tweet_id}_{i}"),
            kind: MediaKind::Photo,
            url: Some(url),
            tweet_ids: vec![tweet_id.to_string()],
        });
    }

    if let Some(url) = video_url(t)? {
        media.push(CanonicalMedia {
            media_key: format!("video_{tweet_id}"),
            kind: MediaKind::Video,
            url,
            tweet_ids: vec![tweet_id.to_string()],
        });
    }

    Ok(media)
}

/// `video_url` is either a plain URL or a list of variants (strings or `{url}`
/// objects); the first variant wins.
///
/// Outer `None`: no video. `Some(None)`: a video whose variant carries no URL.
fn video_url(t: &Fields<'_>) -> Result<Option<Option<String>>, NormalizeError> {
    let mismatch = |found: &Value| NormalizeError::UnexpectedType {
        field: "tweet.video_url".to_string(),
        expected: "string or array of variants",
        found: kind_of(found),
    };
    let non_empty = |s: &String| (!s.is_empty()).then(|| s.clone());

    match t.get("video_url") {
        None => Ok(None),
        Some(Value::String(s)) if s.is_empty() => Ok(None),
        Some(Value::String(s)) => Ok(Some(Some(s.clone()))),
        Some(Value::Array(variants)) => match variants.first() {
            None => Ok(None),
            Some(Value::String(s)) => Ok(Some(non_empty(s))),
            Some(Value::Object(variant)) => match variant.get("url") {
                Some(Value::String(s)) => Ok(Some(non_empty(s))),
                None | Some(Value::Null) => Ok(Some(None)),
                Some(other) => Err(mismatch(other)),
            },
            Some(other) => Err(mismatch(other)),
        },
        Some(other) => Err(mismatch(other)),
    }
}
