mod common;

use serde_json::{Value, json};
use std::sync::Arc;
use twinbird_social::twitter::fields::diff;
use twinbird_social::twitter::normalize::NormalizeError;
use twinbird_social::twitter::query::CanonicalSearchQuery;
use twinbird_social::twitter::types::{MediaKind, ReferenceKind};
use twinbird_social::twitter::{
    Dispatcher, OfficialProvider, Operation, Payload, ProxyProvider, TwitterProvider,
};
use wiremock::matchers::{header, method, path, query_param, query_param_is_missing};
use wiremock::{Mock, MockServer, ResponseTemplate};

const HOST: &str = "twitter154.p.rapidapi.com";

fn proxy(server: &MockServer) -> ProxyProvider {
    ProxyProvider::new("k-test", HOST, &server.uri()).unwrap()
}

fn official(server: &MockServer) -> OfficialProvider {
    OfficialProvider::new(Some("tok".into()), &server.uri()).unwrap()
}

fn proxy_user() -> Value {
    json!({
        "user_id": "96479162",
        "name": "Omar",
        "username": "omarmhaimdat",
        "creation_date": "Sat Sep 19 10:00:00 +0000 2009",
        "description": "builder",
        "is_private": false,
        "is_verified": false,
        "is_blue_verified": true,
        "location": "Paris",
        "profile_pic_url": "https://pbs/pic.jpg",
        "external_url": "https://example.com",
        "follower_count": 10,
        "following_count": 2,
        "number_of_tweets": 300
    })
}

fn proxy_tweet(id: &str) -> Value {
    json!({
        "tweet_id": id,
        "text": "hello",
        "creation_date": "Sat Apr 23 22:00:00 +0000 2022",
        "conversation_id": id,
        "language": "en",
        "user": proxy_user(),
        "retweet_count": 1,
        "reply_count": 2,
        "favorite_count": 3,
        "quote_count": 0,
        "media_url": ["https://pbs/img.jpg"]
    })
}

fn official_user() -> Value {
    json!({
        "id": "96479162",
        "name": "Omar",
        "username": "omarmhaimdat",
        "created_at": "2009-09-19T10:00:00.000Z",
        "description": "builder",
        "protected": false,
        "verified": true,
        "location": "Paris",
        "profile_image_url": "https://pbs/pic.jpg",
        "url": "https://example.com",
        "public_metrics": {"followers_count": 10, "following_count": 2, "tweet_count": 300, "listed_count": 4}
    })
}

fn official_tweet(id: &str) -> Value {
    json!({
        "id": id,
        "text": "hello",
        "created_at": "2022-04-23T22:00:00.000Z",
        "author_id": "96479162",
        "conversation_id": id,
        "lang": "en",
        "possibly_sensitive": false,
        "edit_history_tweet_ids": [id],
        "public_metrics": {"retweet_count": 1, "reply_count": 2, "like_count": 3, "quote_count": 0, "bookmark_count": 0},
        "attachments": {"media_keys": ["3_1"]}
    })
}

#[tokio::test]
async fn proxy_tweet_is_normalized_with_transport_details() {
    common::init_test_tracing();
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/tweet/details"))
        .and(query_param("tweet_id", "42"))
        .and(header("x-rapidapi-key", "k-test"))
        .and(header("x-rapidapi-host", HOST))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "tweet_id": "42",
            "text": "rt",
            "retweet": true,
            "user": {"user_id": "7"}
        })))
        .expect(1)
        .mount(&server)
        .await;

    let out = proxy(&server).get_tweet("42").await.unwrap();
    assert_eq!(out.status, Some(200));
    assert!(out.raw_text.contains("\"tweet_id\""));

    let tweet = out.envelope.data.as_ref().unwrap();
    assert_eq!(tweet.author_id.as_deref(), Some("7"));
    assert!(tweet.attachments.is_none());
    let refs = tweet.referenced_tweets.as_ref().unwrap();
    assert_eq!(refs[0].kind, ReferenceKind::Retweeted);
    assert_eq!(refs[0].id, "unknown");
    assert_eq!(out.envelope.meta.result_count, 1);
}

#[tokio::test]
async fn non_success_yields_zero_envelope_and_status() {
    common::init_test_tracing();
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/user/details"))
        .respond_with(ResponseTemplate::new(503).set_body_string("upstream down"))
        .mount(&server)
        .await;

    let out = proxy(&server).get_user("1").await.unwrap();
    assert_eq!(out.status, Some(503));
    assert_eq!(out.raw_text, "upstream down");
    assert!(out.envelope.is_empty());
    assert_eq!(
        serde_json::to_value(&out.envelope).unwrap(),
        json!({"data": {}, "meta": {"result_count": 0}})
    );
}

#[tokio::test]
async fn unreachable_upstream_has_no_status() {
    common::init_test_tracing();
    let provider = ProxyProvider::new("k-test", HOST, "http://127.0.0.1:9").unwrap();
    let q = CanonicalSearchQuery::new("rust");
    let out = provider.search_recent(&q).await.unwrap();
    assert_eq!(out.status, None);
    assert!(out.raw_text.is_empty());
    assert_eq!(out.envelope.meta.result_count, 0);
    assert!(out.envelope.includes.is_none());
}

#[tokio::test]
async fn fan_out_skips_failures_and_keeps_order() {
    common::init_test_tracing();
    let server = MockServer::start().await;
    for id in ["1", "3"] {
        Mock::given(method("GET"))
            .and(path("/tweet/details"))
            .and(query_param("tweet_id", id))
            .respond_with(ResponseTemplate::new(200).set_body_json(proxy_tweet(id)))
            .mount(&server)
            .await;
    }
    Mock::given(method("GET"))
        .and(path("/tweet/details"))
        .and(query_param("tweet_id", "2"))
        .respond_with(ResponseTemplate::new(404).set_body_json(json!({"detail": "not found"})))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/tweet/details"))
        .and(query_param("tweet_id", "4"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"tweet_id": "4", "user": "bad"})))
        .mount(&server)
        .await;

    let ids: Vec<String> = ["3", "2", "4", "1"].map(String::from).to_vec();
    let out = proxy(&server).get_tweets_by_ids(&ids).await.unwrap();
    let got: Vec<&str> = out.envelope.data.iter().map(|t| t.id.as_str()).collect();
    assert_eq!(got, vec!["3", "1"]);
    assert_eq!(out.envelope.meta.result_count, 2);
    assert_eq!(out.status, Some(200));
}

#[tokio::test]
async fn search_translates_params_and_archive_is_recent() {
    common::init_test_tracing();
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/search/search"))
        .and(query_param("query", "python min:retweets:5 min:likes:100"))
        .and(query_param("limit", "10"))
        .and(query_param("start_date", "2024-01-01"))
        .and(query_param("language", "en"))
        .and(query_param("min_retweets", "5"))
        .and(query_param("min_likes", "100"))
        .and(query_param_is_missing("min_replies"))
        .and(query_param_is_missing("end_date"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "results": [proxy_tweet("1"), {"text": "no id"}, proxy_tweet("2")]
        })))
        .expect(2)
        .mount(&server)
        .await;

    let q = CanonicalSearchQuery {
        start_time: Some("2024-01-01T00:00:00Z".into()),
        end_time: Some("not-a-date".into()),
        lang: Some("en".into()),
        ..CanonicalSearchQuery::new("python min:retweets:5 min:likes:100")
    };
    let p = proxy(&server);
    let recent = p.search_recent(&q).await.unwrap();
    let archive = p.search_archive(&q).await.unwrap();
    assert_eq!(recent, archive);

    assert_eq!(recent.envelope.meta.result_count, 2);
    let includes = recent.envelope.includes.unwrap();
    assert_eq!(includes.users.len(), 1);
    assert!(includes.users[0].verified);
    assert_eq!(includes.media.len(), 2);
    assert_eq!(includes.media[1].media_key, "media_2_0");
    assert_eq!(includes.media[1].kind, MediaKind::Photo);
}

#[tokio::test]
async fn followings_default_limit_through_dispatcher() {
    common::init_test_tracing();
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/user/following"))
        .and(query_param("user_id", "96479162"))
        .and(query_param("limit", "40"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "following": [proxy_user(), {"user_id": "5", "name": "Five"}]
        })))
        .expect(1)
        .mount(&server)
        .await;

    let dispatcher = Dispatcher::new(Arc::new(proxy(&server)));
    let out = dispatcher
        .dispatch(Operation::GetUserFollowings {
            user_id: "96479162".into(),
            limit: None,
        })
        .await
        .unwrap();
    let Payload::Users(env) = out.envelope else {
        panic!("expected users payload");
    };
    assert_eq!(env.meta.result_count, 2);
    assert_eq!(env.data[1].public_metrics.listed_count, 0);
}

#[tokio::test]
async fn username_lookup_strips_at_sign() {
    common::init_test_tracing();
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/user/details"))
        .and(query_param("username", "omarmhaimdat"))
        .respond_with(ResponseTemplate::new(200).set_body_json(proxy_user()))
        .expect(1)
        .mount(&server)
        .await;

    let dispatcher = Dispatcher::new(Arc::new(proxy(&server)));
    let out = dispatcher
        .dispatch(Operation::GetUserByUsername {
            username: "@omarmhaimdat".into(),
        })
        .await
        .unwrap();
    assert_eq!(out.envelope.result_count(), 1);
}

#[tokio::test]
async fn malformed_proxy_body_is_reported() {
    common::init_test_tracing();
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/user/details"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"user_id": "1", "follower_count": "many"})))
        .mount(&server)
        .await;

    let err = proxy(&server).get_user("1").await.unwrap_err();
    assert!(matches!(err, NormalizeError::UnexpectedType { ref field, .. } if field == "user.follower_count"));
}

#[tokio::test]
async fn official_uses_bearer_and_v2_paths() {
    common::init_test_tracing();
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/2/tweets/20"))
        .and(header("authorization", "Bearer tok"))
        .and(query_param("expansions", "author_id,attachments.media_keys"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "data": official_tweet("20"),
            "includes": {"users": [official_user()]}
        })))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/2/tweets/search/all"))
        .and(query_param("query", "rust lang:en"))
        .and(query_param("max_results", "100"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "data": [official_tweet("21"), official_tweet("22")],
            "meta": {"result_count": 2, "newest_id": "22"}
        })))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/2/users/by/username/omarmhaimdat"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "errors": [{"title": "Not Found Error"}]
        })))
        .expect(1)
        .mount(&server)
        .await;

    let p = official(&server);
    let tweet = p.get_tweet("20").await.unwrap();
    assert_eq!(tweet.envelope.data.as_ref().unwrap().author_id.as_deref(), Some("96479162"));
    assert_eq!(tweet.envelope.includes.unwrap().users[0].public_metrics.listed_count, 4);

    let q = CanonicalSearchQuery {
        max_results: Some(500),
        lang: Some("en".into()),
        ..CanonicalSearchQuery::new("rust")
    };
    let archive = p.search_archive(&q).await.unwrap();
    assert_eq!(archive.envelope.meta.result_count, 2);

    let missing = p.get_user_by_username("omarmhaimdat").await.unwrap();
    assert_eq!(missing.status, Some(200));
    assert!(missing.envelope.is_empty());
}

#[tokio::test]
async fn official_page_with_idless_entry_keeps_the_rest() {
    common::init_test_tracing();
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/2/users/96479162/following"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "data": [official_user(), {"name": "ghost"}],
            "meta": {"result_count": 2}
        })))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/2/tweets/30"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"data": {"text": "ghost"}})))
        .mount(&server)
        .await;

    let p = official(&server);
    let following = p.get_user_followings("96479162", Some(10)).await.unwrap();
    assert_eq!(following.envelope.meta.result_count, 1);
    assert_eq!(following.envelope.data[0].id, "96479162");

    let tweet = p.get_tweet("30").await.unwrap();
    assert_eq!(tweet.status, Some(200));
    assert!(tweet.envelope.is_empty());
}

#[tokio::test]
async fn official_and_proxy_envelopes_share_field_paths() {
    common::init_test_tracing();
    let server = MockServer::start().await;

    // Proxy side.
    Mock::given(method("GET"))
        .and(path("/user/details"))
        .respond_with(ResponseTemplate::new(200).set_body_json(proxy_user()))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/search/search"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([proxy_tweet("1")])))
        .mount(&server)
        .await;

    // Official side.
    Mock::given(method("GET"))
        .and(path("/2/users/96479162"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"data": official_user()})))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/2/tweets/search/recent"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "data": [official_tweet("1")],
            "includes": {
                "users": [official_user()],
                "media": [{"media_key": "3_1", "type": "photo", "url": "https://pbs/img.jpg"}]
            },
            "meta": {"result_count": 1}
        })))
        .mount(&server)
        .await;

    let proxy = Dispatcher::new(Arc::new(proxy(&server)));
    let official = Dispatcher::new(Arc::new(official(&server)));
    let q = CanonicalSearchQuery::new("rust");

    for op in [
        Operation::GetUser { user_id: "96479162".into() },
        Operation::SearchRecent(q),
    ] {
        let a = proxy.dispatch(op.clone()).await.unwrap().envelope.to_value().unwrap();
        let b = official.dispatch(op.clone()).await.unwrap().envelope.to_value().unwrap();
        let d = diff(&a, &b);
        assert!(d.is_match(), "{}: {d}", op.name());
    }
}
