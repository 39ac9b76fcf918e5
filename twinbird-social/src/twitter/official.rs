//! Official v2 bodies -> canonical envelopes.
//!
//! The official API already speaks the canonical vocabulary, so each entity is
//! a lenient serde pass: unknown fields are ignored, absent ones defaulted.
//! An entity without an `id` is no entity; in a list it is dropped like any
//! entry that fails to decode. The `includes` block is kept and
//! `meta.result_count` recomputed from what survived.
use serde::Deserialize;
use serde::de::DeserializeOwned;
use serde_json::Value;

use super::normalize::NormalizeError;
use super::types::{
    CanonicalTweet, CanonicalUser, Envelope, EnvelopeData, Includes, Single, TweetEnvelope,
    TweetsEnvelope, UserEnvelope, UsersEnvelope,
};

#[derive(Deserialize)]
struct V2Body {
    #[serde(default)]
    data: Option<Value>,
    #[serde(default)]
    includes: Option<Includes>,
}

fn has_id(entry: &Value) -> bool {
    match entry.get("id") {
        Some(Value::String(id)) => !id.is_empty(),
        Some(Value::Number(_)) => true,
        _ => false,
    }
}

fn malformed(context: &'static str, e: serde_json::Error) -> NormalizeError {
    NormalizeError::Malformed {
        context,
        message: e.to_string(),
    }
}

/// `data` of a single-entity body. A present entity that fails to decode is
/// an error.
fn single<T: DeserializeOwned>(
    context: &'static str,
    data: Option<Value>,
) -> Result<Single<T>, NormalizeError> {
    match data {
        Some(entry) if has_id(&entry) => serde_json::from_value(entry)
            .map(Single::some)
            .map_err(|e| malformed(context, e)),
        Some(Value::Null) | None => Ok(Single::none()),
        Some(_) => {
            tracing::warn!(context, "official entity without id");
            Ok(Single::none())
        }
    }
}

/// `data` of a list body. Id-less or undecodable entries are dropped.
fn list<T: DeserializeOwned>(
    context: &'static str,
    data: Option<Value>,
) -> Result<Vec<T>, NormalizeError> {
    let entries = match data {
        Some(Value::Array(entries)) => entries,
        Some(Value::Null) | None => return Ok(Vec::new()),
        Some(other) => {
            return Err(NormalizeError::Malformed {
                context,
                message: format!("expected a list under data, found {other}"),
            });
        }
    };

    let mut kept = Vec::with_capacity(entries.len());
    for (index, entry) in entries.into_iter().enumerate() {
        if !has_id(&entry) {
            tracing::warn!(context, index, "dropping official entry without id");
            continue;
        }
        match serde_json::from_value(entry) {
            Ok(item) => kept.push(item),
            Err(error) => {
                tracing::warn!(context, index, %error, "dropping malformed official entry")
            }
        }
    }
    Ok(kept)
}

fn parse<D: EnvelopeData>(
    context: &'static str,
    body: &Value,
    data: fn(&'static str, Option<Value>) -> Result<D, NormalizeError>,
) -> Result<Envelope<D>, NormalizeError> {
    let parsed: V2Body =
        serde_json::from_value(body.clone()).map_err(|e| malformed(context, e))?;
    let envelope = Envelope::new(data(context, parsed.data)?);
    Ok(match parsed.includes {
        Some(includes) if !envelope.is_empty() => envelope.with_includes(includes),
        _ => envelope,
    })
}

pub fn tweet_envelope(body: &Value) -> Result<TweetEnvelope, NormalizeError> {
    parse("official tweet", body, single::<CanonicalTweet>)
}

pub fn tweets_envelope(body: &Value) -> Result<TweetsEnvelope, NormalizeError> {
    parse("official tweets", body, list::<CanonicalTweet>)
}

pub fn user_envelope(body: &Value) -> Result<UserEnvelope, NormalizeError> {
    parse("official user", body, single::<CanonicalUser>)
}

pub fn users_envelope(body: &Value) -> Result<UsersEnvelope, NormalizeError> {
    parse("official users", body, list::<CanonicalUser>)
}
