//! Batch proxy responses -> canonical envelopes.
//!
//! Entries that carry no id, or that fail validation, are dropped from the
//! batch; the rest of the batch is unaffected.
use serde_json::Value;

use super::normalize::{normalize_tweet_parts, normalize_user};
use super::types::{
    CanonicalUser, Envelope, Includes, Single, TweetsEnvelope, UsersEnvelope,
};

pub fn empty_list<T>() -> Envelope<Vec<T>> {
    Envelope::new(Vec::new())
}

pub fn empty_single<T>() -> Envelope<Single<T>> {
    Envelope::new(Single::none())
}

/// Raw entries under `key`, or the value itself when it is already a list.
fn entries<'a>(raw: &'a Value, key: &str) -> &'a [Value] {
    match raw {
        Value::Array(items) => items,
        Value::Object(map) => match map.get(key) {
            Some(Value::Array(items)) => items,
            _ => &[],
        },
        _ => &[],
    }
}

/// Search results (a bare list, or `{"results": [...]}`) -> tweets with their
/// authors and media in `includes`.
pub fn assemble_search_envelope(raw: &Value) -> TweetsEnvelope {
    let mut tweets = Vec::new();
    let mut includes = Includes::default();

    for (index, entry) in entries(raw, "results").iter().enumerate() {
        let parts = match normalize_tweet_parts(entry) {
            Ok(Some(parts)) => parts,
            Ok(None) => {
                tracing::debug!(index, "dropping search entry without tweet_id");
                continue;
            }
            Err(error) => {
                tracing::warn!(index, %error, "dropping malformed search entry");
                continue;
            }
        };

        if let Some(author) = parts.author {
            push_unique(&mut includes.users, author);
        }
        includes.media.extend(parts.media);
        tweets.push(parts.tweet);
    }

    if tweets.is_empty() {
        return empty_list();
    }
    Envelope::new(tweets).with_includes(includes)
}

/// Followings (a bare list, or `{"following": [...]}`) -> users.
pub fn assemble_users_envelope(raw: &Value) -> UsersEnvelope {
    let mut users = Vec::new();
    for (index, entry) in entries(raw, "following").iter().enumerate() {
        match normalize_user(entry) {
            Ok(Some(user)) => push_unique(&mut users, user),
            Ok(None) => tracing::debug!(index, "dropping following entry without user_id"),
            Err(error) => tracing::warn!(index, %error, "dropping malformed following entry"),
        }
    }
    Envelope::new(users)
}

fn push_unique(users: &mut Vec<CanonicalUser>, user: CanonicalUser) {
    if !users.iter().any(|u| u.id == user.id) {
        users.push(user);
    }
}
