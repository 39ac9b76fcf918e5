//! Official v2 API provider.
//!
//! Requests always ask for the field lists and expansions needed to fill every
//! canonical field, so official envelopes carry the same paths as proxy ones.
use async_trait::async_trait;
use std::borrow::Cow;
use std::time::Duration;
use twinbird_common::ProviderKind;
use twinbird_config::TwinbirdConfig;
use twinbird_http::{Auth, HttpClient, HttpError, RawResponse, RequestOpts};

use super::assemble::{empty_list, empty_single};
use super::official;
use super::provider::{ProviderResult, TwitterProvider, finish};
use super::query::{
    CanonicalSearchQuery, OFFICIAL_EXPANSIONS, OFFICIAL_MEDIA_FIELDS, OFFICIAL_TWEET_FIELDS,
    OFFICIAL_USER_FIELDS, official_search_params,
};
use super::types::{TweetEnvelope, TweetsEnvelope, UserEnvelope, UsersEnvelope};

type Params = Vec<(&'static str, Cow<'static, str>)>;

#[derive(Clone)]
pub struct OfficialProvider {
    http: HttpClient,
    bearer: Option<String>,
}

impl OfficialProvider {
    pub fn new(bearer_token: Option<String>, base_url: &str) -> Result<Self, HttpError> {
        Ok(Self {
            http: HttpClient::new(base_url)?,
            bearer: bearer_token,
        })
    }

    pub fn from_config(cfg: &TwinbirdConfig) -> Result<Self, HttpError> {
        let provider = Self::new(cfg.official.bearer_token.clone(), &cfg.official.base_url)?;
        Ok(provider.with_timeout(Duration::from_secs(cfg.http.timeout_secs)))
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.http = self.http.with_timeout(timeout);
        self
    }

    async fn get(&self, path: &str, query: Params) -> Result<RawResponse, HttpError> {
        let auth = match self.bearer.as_deref() {
            Some(token) => Auth::Bearer(token),
            None => Auth::None,
        };
        self.http
            .get_raw(
                path,
                RequestOpts {
                    auth: Some(auth),
                    query: Some(query),
                    ..Default::default()
                },
            )
            .await
    }

    async fn search(
        &self,
        operation: &'static str,
        path: &str,
        query: &CanonicalSearchQuery,
    ) -> ProviderResult<TweetsEnvelope> {
        let outcome = self.get(path, official_search_params(query)).await;
        finish(self.kind(), operation, outcome, empty_list, official::tweets_envelope)
    }
}

fn tweet_params() -> Params {
    vec![
        ("tweet.fields", OFFICIAL_TWEET_FIELDS.into()),
        ("user.fields", OFFICIAL_USER_FIELDS.into()),
        ("media.fields", OFFICIAL_MEDIA_FIELDS.into()),
        ("expansions", OFFICIAL_EXPANSIONS.into()),
    ]
}

fn user_params() -> Params {
    vec![("user.fields", OFFICIAL_USER_FIELDS.into())]
}

fn segment(raw: &str) -> String {
    url::form_urlencoded::byte_serialize(raw.trim().as_bytes()).collect()
}

#[async_trait]
impl TwitterProvider for OfficialProvider {
    fn kind(&self) -> ProviderKind {
        ProviderKind::Official
    }

    async fn get_tweet(&self, tweet_id: &str) -> ProviderResult<TweetEnvelope> {
        let path = format!("2/tweets/{}", segment(tweet_id));
        let outcome = self.get(&path, tweet_params()).await;
        finish(self.kind(), "get_tweet", outcome, empty_single, official::tweet_envelope)
    }

    async fn get_user(&self, user_id: &str) -> ProviderResult<UserEnvelope> {
        let path = format!("2/users/{}", segment(user_id));
        let outcome = self.get(&path, user_params()).await;
        finish(self.kind(), "get_user", outcome, empty_single, official::user_envelope)
    }

    async fn get_user_by_username(&self, username: &str) -> ProviderResult<UserEnvelope> {
        let handle = username.trim().trim_start_matches('@');
        let path = format!("2/users/by/username/{}", segment(handle));
        let outcome = self.get(&path, user_params()).await;
        finish(self.kind(), "get_user_by_username", outcome, empty_single, official::user_envelope)
    }

    async fn get_user_followings(
        &self,
        user_id: &str,
        limit: Option<u32>,
    ) -> ProviderResult<UsersEnvelope> {
        let path = format!("2/users/{}/following", segment(user_id));
        let mut params = user_params();
        if let Some(n) = limit {
            params.push(("max_results", n.clamp(1, 1000).to_string().into()));
        }
        let outcome = self.get(&path, params).await;
        finish(self.kind(), "get_user_followings", outcome, empty_list, official::users_envelope)
    }

    async fn search_recent(&self, query: &CanonicalSearchQuery) -> ProviderResult<TweetsEnvelope> {
        self.search("search_recent", "2/tweets/search/recent", query).await
    }

    async fn search_archive(&self, query: &CanonicalSearchQuery) -> ProviderResult<TweetsEnvelope> {
        self.search("search_archive", "2/tweets/search/all", query).await
    }
}
