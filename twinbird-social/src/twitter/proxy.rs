//! RapidAPI proxy provider.
//!
//! The proxy answers in its own flat shape; every response goes through the
//! normalizers or the assembler before it leaves this module.
use async_trait::async_trait;
use serde_json::Value;
use std::borrow::Cow;
use std::time::Duration;
use twinbird_common::{ProviderKind, TwinbirdError};
use twinbird_config::TwinbirdConfig;
use twinbird_http::{Auth, HttpClient, HttpError, RawResponse, RequestOpts, rapidapi_headers};

use super::assemble::{assemble_search_envelope, assemble_users_envelope, empty_list, empty_single};
use super::normalize::{NormalizeError, normalize_tweet, normalize_user};
use super::provider::{ProviderResult, TwitterProvider, finish};
use super::query::{CanonicalSearchQuery, translate};
use super::types::{Envelope, TweetEnvelope, TweetsEnvelope, UserEnvelope, UsersEnvelope};

pub const DEFAULT_FOLLOWING_LIMIT: u32 = 40;

#[derive(Clone)]
pub struct ProxyProvider {
    http: HttpClient,
    api_key: String,
    host: String,
}

impl ProxyProvider {
    pub fn new(api_key: impl Into<String>, host: impl Into<String>, base_url: &str) -> Result<Self, HttpError> {
        let provider = Self {
            http: HttpClient::new(base_url)?,
            api_key: api_key.into(),
            host: host.into(),
        };
        // Reject unusable header values up front.
        rapidapi_headers(&provider.api_key, &provider.host)?;
        Ok(provider)
    }

    pub fn from_config(cfg: &TwinbirdConfig) -> Result<Self, TwinbirdError> {
        let api_key = cfg.proxy.api_key.clone().ok_or_else(|| {
            TwinbirdError::Config("proxy provider requires proxy.api_key (RAPID_API_KEY)".into())
        })?;
        let provider = Self::new(api_key, cfg.proxy.host.clone(), &cfg.proxy.resolved_base_url())
            .map_err(|e| TwinbirdError::Http(e.to_string()))?;
        Ok(provider.with_timeout(Duration::from_secs(cfg.http.timeout_secs)))
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.http = self.http.with_timeout(timeout);
        self
    }

    async fn get<'q>(
        &self,
        endpoint: &str,
        query: Vec<(&'q str, Cow<'q, str>)>,
    ) -> Result<RawResponse, HttpError> {
        let headers = rapidapi_headers(&self.api_key, &self.host)?;
        self.http
            .get_raw(
                endpoint,
                RequestOpts {
                    auth: Some(Auth::Headers(headers)),
                    query: Some(query),
                    ..Default::default()
                },
            )
            .await
    }

    async fn user_details(
        &self,
        operation: &'static str,
        key: &'static str,
        value: &str,
    ) -> ProviderResult<UserEnvelope> {
        let outcome = self.get("user/details", vec![(key, value.into())]).await;
        finish(self.kind(), operation, outcome, empty_single, single_user)
    }
}

fn single_tweet(body: &Value) -> Result<TweetEnvelope, NormalizeError> {
    Ok(Envelope::new(normalize_tweet(body)?.into()))
}

fn single_user(body: &Value) -> Result<UserEnvelope, NormalizeError> {
    Ok(Envelope::new(normalize_user(body)?.into()))
}

fn search(body: &Value) -> Result<TweetsEnvelope, NormalizeError> {
    Ok(assemble_search_envelope(body))
}

fn followings(body: &Value) -> Result<UsersEnvelope, NormalizeError> {
    Ok(assemble_users_envelope(body))
}

#[async_trait]
impl TwitterProvider for ProxyProvider {
    fn kind(&self) -> ProviderKind {
        ProviderKind::Proxy
    }

    async fn get_tweet(&self, tweet_id: &str) -> ProviderResult<TweetEnvelope> {
        let outcome = self.get("tweet/details", vec![("tweet_id", tweet_id.into())]).await;
        finish(self.kind(), "get_tweet", outcome, empty_single, single_tweet)
    }

    async fn get_user(&self, user_id: &str) -> ProviderResult<UserEnvelope> {
        self.user_details("get_user", "user_id", user_id).await
    }

    async fn get_user_by_username(&self, username: &str) -> ProviderResult<UserEnvelope> {
        let handle = username.trim().trim_start_matches('@');
        self.user_details("get_user_by_username", "username", handle).await
    }

    async fn get_user_followings(
        &self,
        user_id: &str,
        limit: Option<u32>,
    ) -> ProviderResult<UsersEnvelope> {
        let limit = limit.unwrap_or(DEFAULT_FOLLOWING_LIMIT).to_string();
        let outcome = self
            .get(
                "user/following",
                vec![("user_id", user_id.into()), ("limit", limit.into())],
            )
            .await;
        finish(self.kind(), "get_user_followings", outcome, empty_list, followings)
    }

    async fn search_recent(&self, query: &CanonicalSearchQuery) -> ProviderResult<TweetsEnvelope> {
        let params = translate(query);
        let outcome = self.get("search/search", params.to_query()).await;
        finish(self.kind(), "search", outcome, empty_list, search)
    }

    /// The proxy has no separate archive index; this is `search_recent`.
    async fn search_archive(&self, query: &CanonicalSearchQuery) -> ProviderResult<TweetsEnvelope> {
        self.search_recent(query).await
    }
}
