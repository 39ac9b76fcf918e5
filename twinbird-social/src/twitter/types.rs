//! Canonical tweet/user/media records and the `{data, includes, meta}` envelope.
//!
//! Both providers are normalized into these shapes. Optional members are
//! `Option`s that are omitted from the serialized form when absent, so a
//! consumer can test for field presence (e.g. `attachments`) rather than
//! for an empty container.
use serde::de::{DeserializeOwned, Error as _};
use serde::ser::SerializeMap;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::Value;

/// Target id recorded for a retweet relation when the source does not expose
/// the original tweet id.
pub const UNKNOWN_RETWEET_TARGET: &str = "unknown";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CanonicalTweet {
    pub id: String,
    #[serde(default)]
    pub text: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub author_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub conversation_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub lang: Option<String>,
    #[serde(default)]
    pub possibly_sensitive: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub in_reply_to_user_id: Option<String>,
    #[serde(default)]
    pub public_metrics: TweetMetrics,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub attachments: Option<Attachments>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub referenced_tweets: Option<Vec<ReferencedTweet>>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct TweetMetrics {
    #[serde(default)]
    pub retweet_count: u64,
    #[serde(default)]
    pub reply_count: u64,
    #[serde(default)]
    pub like_count: u64,
    #[serde(default)]
    pub quote_count: u64,
    #[serde(default)]
    pub bookmark_count: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Attachments {
    #[serde(default)]
    pub media_keys: Vec<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReferenceKind {
    RepliedTo,
    Quoted,
    Retweeted,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReferencedTweet {
    #[serde(rename = "type")]
    pub kind: ReferenceKind,
    pub id: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CanonicalUser {
    pub id: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub username: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<String>,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub protected: bool,
    #[serde(default)]
    pub verified: bool,
    #[serde(default)]
    pub location: String,
    #[serde(default)]
    pub profile_image_url: String,
    #[serde(default)]
    pub url: String,
    #[serde(default)]
    pub public_metrics: UserMetrics,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct UserMetrics {
    #[serde(default)]
    pub followers_count: u64,
    #[serde(default)]
    pub following_count: u64,
    #[serde(default)]
    pub tweet_count: u64,
    #[serde(default)]
    pub listed_count: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MediaKind {
    Photo,
    Video,
    AnimatedGif,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CanonicalMedia {
    pub media_key: String,
    #[serde(rename = "type")]
    pub kind: MediaKind,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    #[serde(default)]
    pub tweet_ids: Vec<String>,
}

// ==============================
// Envelope
// ==============================

/// Anything that can sit in `Envelope::data` and report how many entities it holds.
pub trait EnvelopeData {
    fn result_count(&self) -> usize;
}

impl<T> EnvelopeData for Vec<T> {
    fn result_count(&self) -> usize {
        self.len()
    }
}

/// A single entity or nothing. Nothing serializes as `{}`.
#[derive(Debug, Clone, PartialEq)]
pub struct Single<T>(pub Option<T>);

impl<T> Single<T> {
    pub fn some(value: T) -> Self {
        Self(Some(value))
    }

    pub fn none() -> Self {
        Self(None)
    }

    pub fn as_ref(&self) -> Option<&T> {
        self.0.as_ref()
    }

    pub fn into_inner(self) -> Option<T> {
        self.0
    }
}

impl<T> Default for Single<T> {
    fn default() -> Self {
        Self(None)
    }
}

impl<T> From<Option<T>> for Single<T> {
    fn from(value: Option<T>) -> Self {
        Self(value)
    }
}

impl<T> EnvelopeData for Single<T> {
    fn result_count(&self) -> usize {
        usize::from(self.0.is_some())
    }
}

impl<T: Serialize> Serialize for Single<T> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match &self.0 {
            Some(inner) => inner.serialize(serializer),
            None => serializer.serialize_map(Some(0))?.end(),
        }
    }
}

impl<'de, T: DeserializeOwned> Deserialize<'de> for Single<T> {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = Value::deserialize(deserializer)?;
        match raw {
            Value::Null => Ok(Self(None)),
            Value::Object(ref map) if map.is_empty() => Ok(Self(None)),
            other => serde_json::from_value(other)
                .map(|v| Self(Some(v)))
                .map_err(D::Error::custom),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Includes {
    #[serde(default)]
    pub users: Vec<CanonicalUser>,
    #[serde(default)]
    pub media: Vec<CanonicalMedia>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Meta {
    #[serde(default)]
    pub result_count: usize,
}

/// `{data, includes?, meta}` wrapper returned by every operation.
///
/// `meta.result_count` is derived from `data` when the envelope is built, so it
/// cannot drift from the payload.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Envelope<D> {
    pub data: D,
    #[serde(default, alias = "included", skip_serializing_if = "Option::is_none")]
    pub includes: Option<Includes>,
    #[serde(default)]
    pub meta: Meta,
}

impl<D: EnvelopeData> Envelope<D> {
    pub fn new(data: D) -> Self {
        let meta = Meta {
            result_count: data.result_count(),
        };
        Self {
            data,
            includes: None,
            meta,
        }
    }

    pub fn with_includes(mut self, includes: Includes) -> Self {
        self.includes = Some(includes);
        self
    }

    pub fn is_empty(&self) -> bool {
        self.meta.result_count == 0
    }
}

impl<D: EnvelopeData + Default> Envelope<D> {
    /// Zero envelope: empty data, no includes, `result_count == 0`.
    pub fn empty() -> Self {
        Self::new(D::default())
    }
}

pub type TweetEnvelope = Envelope<Single<CanonicalTweet>>;
pub type TweetsEnvelope = Envelope<Vec<CanonicalTweet>>;
pub type UserEnvelope = Envelope<Single<CanonicalUser>>;
pub type UsersEnvelope = Envelope<Vec<CanonicalUser>>;

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn tweet(id: &str) -> CanonicalTweet {
        CanonicalTweet {
            id: id.into(),
            text: "hello".into(),
            created_at: None,
            author_id: Some("7".into()),
            conversation_id: None,
            lang: Some("en".into()),
            possibly_sensitive: false,
            in_reply_to_user_id: None,
            public_metrics: TweetMetrics::default(),
            attachments: None,
            referenced_tweets: None,
        }
    }

    #[test]
    fn empty_single_serializes_as_empty_object() {
        let env = TweetEnvelope::empty();
        let v = serde_json::to_value(&env).unwrap();
        assert_eq!(v, json!({"data": {}, "meta": {"result_count": 0}}));
    }

    #[test]
    fn result_count_tracks_data() {
        assert_eq!(TweetEnvelope::new(Single::some(tweet("1"))).meta.result_count, 1);
        assert_eq!(
            TweetsEnvelope::new(vec![tweet("1"), tweet("2")]).meta.result_count,
            2
        );
        assert!(TweetsEnvelope::empty().is_empty());
    }

    #[test]
    fn absent_optionals_are_omitted() {
        let v = serde_json::to_value(tweet("1")).unwrap();
        let obj = v.as_object().unwrap();
        assert!(!obj.contains_key("attachments"));
        assert!(!obj.contains_key("referenced_tweets"));
        assert!(!obj.contains_key("created_at"));
        assert_eq!(v["public_metrics"]["bookmark_count"], json!(0));
    }

    #[test]
    fn reference_kind_uses_wire_names() {
        let r = ReferencedTweet {
            kind: ReferenceKind::RepliedTo,
            id: "5".into(),
        };
        assert_eq!(
            serde_json::to_value(&r).unwrap(),
            json!({"type": "replied_to", "id": "5"})
        );
    }

    #[test]
    fn includes_accepts_included_alias() {
        let env: TweetsEnvelope = serde_json::from_value(json!({
            "data": [],
            "included": {"users": [{"id": "1"}], "media": []},
            "meta": {"result_count": 0}
        }))
        .unwrap();
        assert_eq!(env.includes.unwrap().users[0].id, "1");
    }

    #[test]
    fn single_deserializes_empty_object_as_none() {
        let env: UserEnvelope =
            serde_json::from_value(json!({"data": {}, "meta": {"result_count": 0}})).unwrap();
        assert!(env.data.as_ref().is_none());
    }
}
