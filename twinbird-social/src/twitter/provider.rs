//! The operation set every data source implements.
//!
//! Transport problems never surface as errors here: a failed call produces the
//! zero envelope and whatever status/text came back. Only a body that parses
//! but holds the wrong JSON kinds is reported, as [`NormalizeError`].
use async_trait::async_trait;
use serde_json::Value;
use twinbird_common::ProviderKind;
use twinbird_http::{HttpError, RawResponse};

use super::normalize::NormalizeError;
use super::query::CanonicalSearchQuery;
use super::types::{Envelope, TweetEnvelope, TweetsEnvelope, UserEnvelope, UsersEnvelope};

/// An envelope plus the transport outcome it was built from.
///
/// `status` is `None` when no response was received at all.
#[derive(Debug, Clone, PartialEq)]
pub struct Dispatched<E> {
    pub envelope: E,
    pub status: Option<u16>,
    pub raw_text: String,
}

impl<E> Dispatched<E> {
    pub fn map<F>(self, f: impl FnOnce(E) -> F) -> Dispatched<F> {
        Dispatched {
            envelope: f(self.envelope),
            status: self.status,
            raw_text: self.raw_text,
        }
    }
}

pub type ProviderResult<E> = Result<Dispatched<E>, NormalizeError>;

#[async_trait]
pub trait TwitterProvider: Send + Sync {
    fn kind(&self) -> ProviderKind;

    async fn get_tweet(&self, tweet_id: &str) -> ProviderResult<TweetEnvelope>;

    /// One `get_tweet` per id, in order. Ids that fail or come back empty are
    /// skipped; status and text are those of the last call made.
    async fn get_tweets_by_ids(&self, tweet_ids: &[String]) -> ProviderResult<TweetsEnvelope> {
        let mut tweets = Vec::with_capacity(tweet_ids.len());
        let mut status = None;
        let mut raw_text = String::new();

        for id in tweet_ids {
            match self.get_tweet(id).await {
                Ok(one) => {
                    status = one.status;
                    raw_text = one.raw_text;
                    match one.envelope.data.into_inner() {
                        Some(tweet) => tweets.push(tweet),
                        None => tracing::debug!(provider = %self.kind(), tweet_id = %id, "no tweet"),
                    }
                }
                Err(error) => {
                    tracing::warn!(provider = %self.kind(), tweet_id = %id, %error, "skipping tweet");
                }
            }
        }

        Ok(Dispatched {
            envelope: Envelope::new(tweets),
            status,
            raw_text,
        })
    }

    async fn get_user(&self, user_id: &str) -> ProviderResult<UserEnvelope>;

    async fn get_user_by_username(&self, username: &str) -> ProviderResult<UserEnvelope>;

    async fn get_user_followings(
        &self,
        user_id: &str,
        limit: Option<u32>,
    ) -> ProviderResult<UsersEnvelope>;

    async fn search_recent(&self, query: &CanonicalSearchQuery) -> ProviderResult<TweetsEnvelope>;

    async fn search_archive(&self, query: &CanonicalSearchQuery) -> ProviderResult<TweetsEnvelope>;
}

/// Turn one HTTP outcome into a dispatched envelope.
///
/// `build` only sees 2xx bodies that are non-empty objects or arrays; anything
/// else becomes `empty()`.
pub(crate) fn finish<E>(
    provider: ProviderKind,
    operation: &'static str,
    outcome: Result<RawResponse, HttpError>,
    empty: impl FnOnce() -> E,
    build: impl FnOnce(&Value) -> Result<E, NormalizeError>,
) -> ProviderResult<E> {
    let resp = match outcome {
        Ok(resp) => resp,
        Err(error) => {
            tracing::warn!(%provider, operation, %error, "request failed; returning empty envelope");
            return Ok(Dispatched {
                envelope: empty(),
                status: None,
                raw_text: String::new(),
            });
        }
    };

    let envelope = match resp.body() {
        Some(body) => build(body).inspect_err(|error| {
            tracing::warn!(%provider, operation, status = resp.status, %error, "malformed body");
        })?,
        None => {
            tracing::debug!(%provider, operation, status = resp.status, "no usable body; returning empty envelope");
            empty()
        }
    };

    Ok(Dispatched {
        envelope,
        status: Some(resp.status),
        raw_text: resp.text,
    })
}
