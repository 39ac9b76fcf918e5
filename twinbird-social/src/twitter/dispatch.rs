//! Route logical operations to the provider chosen at configuration time.
use regex::Regex;
use serde::Serialize;
use serde_json::Value;
use std::sync::{Arc, LazyLock};
use twinbird_common::{ProviderKind, TwinbirdError};
use twinbird_config::TwinbirdConfig;

use super::client::OfficialProvider;
use super::normalize::NormalizeError;
use super::provider::{Dispatched, TwitterProvider};
use super::proxy::ProxyProvider;
use super::query::CanonicalSearchQuery;
use super::types::{TweetEnvelope, TweetsEnvelope, UserEnvelope, UsersEnvelope};

static STATUS_URL: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)(?:^|[/.])(?:twitter|x)\.com/[^/?#]+/status(?:es)?/(\d+)").expect("static regex")
});

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Operation {
    GetTweet { tweet_id: String },
    GetTweetsByIds { tweet_ids: Vec<String> },
    GetUser { user_id: String },
    GetUserByUsername { username: String },
    GetUserFollowings { user_id: String, limit: Option<u32> },
    SearchRecent(CanonicalSearchQuery),
    SearchArchive(CanonicalSearchQuery),
}

impl Operation {
    pub fn name(&self) -> &'static str {
        match self {
            Self::GetTweet { .. } => "get_tweet",
            Self::GetTweetsByIds { .. } => "get_tweets_by_ids",
            Self::GetUser { .. } => "get_user",
            Self::GetUserByUsername { .. } => "get_user_by_username",
            Self::GetUserFollowings { .. } => "get_user_followings",
            Self::SearchRecent(_) => "search_recent",
            Self::SearchArchive(_) => "search_archive",
        }
    }
}

/// Whatever envelope an operation produced. Serializes as the bare envelope.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Payload {
    Tweet(TweetEnvelope),
    Tweets(TweetsEnvelope),
    User(UserEnvelope),
    Users(UsersEnvelope),
}

impl Payload {
    pub fn result_count(&self) -> usize {
        match self {
            Self::Tweet(e) => e.meta.result_count,
            Self::Tweets(e) => e.meta.result_count,
            Self::User(e) => e.meta.result_count,
            Self::Users(e) => e.meta.result_count,
        }
    }

    pub fn to_value(&self) -> serde_json::Result<Value> {
        serde_json::to_value(self)
    }
}

/// Provider for `cfg.provider`, built from the matching config section.
pub fn build_provider(cfg: &TwinbirdConfig) -> Result<Arc<dyn TwitterProvider>, TwinbirdError> {
    build_provider_for(cfg, cfg.provider)
}

/// Like [`build_provider`] but for an explicit kind (used to probe both sides).
pub fn build_provider_for(
    cfg: &TwinbirdConfig,
    kind: ProviderKind,
) -> Result<Arc<dyn TwitterProvider>, TwinbirdError> {
    let provider: Arc<dyn TwitterProvider> = match kind {
        ProviderKind::Official => Arc::new(
            OfficialProvider::from_config(cfg)
                .map_err(|e| TwinbirdError::Provider(format!("official provider: {e}")))?,
        ),
        ProviderKind::Proxy => Arc::new(ProxyProvider::from_config(cfg)?),
    };
    Ok(provider)
}

#[derive(Clone)]
pub struct Dispatcher {
    provider: Arc<dyn TwitterProvider>,
}

impl Dispatcher {
    pub fn new(provider: Arc<dyn TwitterProvider>) -> Self {
        Self { provider }
    }

    pub fn from_config(cfg: &TwinbirdConfig) -> Result<Self, TwinbirdError> {
        build_provider(cfg).map(Self::new)
    }

    pub fn kind(&self) -> ProviderKind {
        self.provider.kind()
    }

    pub fn provider(&self) -> &Arc<dyn TwitterProvider> {
        &self.provider
    }

    pub async fn dispatch(&self, operation: Operation) -> Result<Dispatched<Payload>, NormalizeError> {
        let name = operation.name();
        tracing::debug!(provider = %self.kind(), operation = name, "dispatch");

        let p = &self.provider;
        let out = match operation {
            Operation::GetTweet { tweet_id } => p.get_tweet(&tweet_id).await?.map(Payload::Tweet),
            Operation::GetTweetsByIds { tweet_ids } => {
                p.get_tweets_by_ids(&tweet_ids).await?.map(Payload::Tweets)
            }
            Operation::GetUser { user_id } => p.get_user(&user_id).await?.map(Payload::User),
            Operation::GetUserByUsername { username } => {
                p.get_user_by_username(&username).await?.map(Payload::User)
            }
            Operation::GetUserFollowings { user_id, limit } => p
                .get_user_followings(&user_id, limit)
                .await?
                .map(Payload::Users),
            Operation::SearchRecent(query) => p.search_recent(&query).await?.map(Payload::Tweets),
            Operation::SearchArchive(query) => p.search_archive(&query).await?.map(Payload::Tweets),
        };

        tracing::info!(
            provider = %self.kind(),
            operation = name,
            status = ?out.status,
            result_count = out.envelope.result_count(),
            "dispatched"
        );
        Ok(out)
    }
}

/// Status id from a tweet URL, or the input itself when it is already an id.
///
/// ```
/// use twinbird_social::twitter::dispatch::tweet_id_from_url;
///
/// assert_eq!(
///     tweet_id_from_url("https://x.com/someone/status/1517995317697916928?s=20").as_deref(),
///     Some("1517995317697916928")
/// );
/// assert_eq!(tweet_id_from_url("1517995317697916928").as_deref(), Some("1517995317697916928"));
/// assert_eq!(tweet_id_from_url("https://example.com/a/status/1"), None);
/// ```
pub fn tweet_id_from_url(input: &str) -> Option<String> {
    let input = input.trim();
    if !input.is_empty() && input.bytes().all(|b| b.is_ascii_digit()) {
        return Some(input.to_string());
    }
    STATUS_URL
        .captures(input)
        .and_then(|c| c.get(1))
        .map(|m| m.as_str().to_string())
}
