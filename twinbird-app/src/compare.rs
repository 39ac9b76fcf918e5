//! `twinbird compare`: run the same probes against both providers and report
//! which canonical field paths only one side produces.
use anyhow::{Context, Result};
use twinbird_common::ProviderKind;
use twinbird_config::TwinbirdConfig;
use twinbird_social::twitter::dispatch::build_provider_for;
use twinbird_social::twitter::fields::{FieldDiff, diff};
use twinbird_social::twitter::query::CanonicalSearchQuery;
use twinbird_social::twitter::{Dispatcher, Operation};

use crate::cli::CompareArgs;

pub struct ProbeReport {
    pub probe: &'static str,
    pub official_status: Option<u16>,
    pub proxy_status: Option<u16>,
    /// `Err` when either side's body could not be normalized.
    pub diff: Result<FieldDiff, String>,
}

pub fn probes(args: &CompareArgs) -> Vec<(&'static str, Operation)> {
    vec![
        (
            "tweet",
            Operation::GetTweet {
                tweet_id: args.tweet_id.clone(),
            },
        ),
        (
            "user",
            Operation::GetUser {
                user_id: args.user_id.clone(),
            },
        ),
        (
            "username",
            Operation::GetUserByUsername {
                username: args.username.clone(),
            },
        ),
        (
            "following",
            Operation::GetUserFollowings {
                user_id: args.user_id.clone(),
                limit: Some(args.limit),
            },
        ),
        (
            "search",
            Operation::SearchRecent(CanonicalSearchQuery {
                max_results: Some(args.limit),
                ..CanonicalSearchQuery::new(args.query.clone())
            }),
        ),
    ]
}

/// Build both providers from one config and compare them.
pub async fn run(cfg: &TwinbirdConfig, args: &CompareArgs) -> Result<()> {
    if cfg.official.bearer_token.is_none() {
        tracing::warn!("no bearer token; official probes will come back empty");
    }
    let official = Dispatcher::new(
        build_provider_for(cfg, ProviderKind::Official).context("building official provider")?,
    );
    let proxy = Dispatcher::new(
        build_provider_for(cfg, ProviderKind::Proxy).context("building proxy provider")?,
    );

    let reports = compare(&official, &proxy, probes(args), args.show).await;
    print!("{}", render(&reports));
    Ok(())
}

pub async fn compare(
    official: &Dispatcher,
    proxy: &Dispatcher,
    probes: Vec<(&'static str, Operation)>,
    show: bool,
) -> Vec<ProbeReport> {
    let mut reports = Vec::with_capacity(probes.len());
    for (probe, op) in probes {
        let (a, b) = tokio::join!(official.dispatch(op.clone()), proxy.dispatch(op));
        let official_status = a.as_ref().ok().and_then(|d| d.status);
        let proxy_status = b.as_ref().ok().and_then(|d| d.status);

        let diff = (|| -> Result<FieldDiff> {
            let va = a.context("official body")?.envelope.to_value()?;
            let vb = b.context("proxy body")?.envelope.to_value()?;
            if show {
                println!("--- {probe} / official ---\n{}", serde_json::to_string_pretty(&va)?);
                println!("--- {probe} / proxy ---\n{}", serde_json::to_string_pretty(&vb)?);
            }
            Ok(diff(&va, &vb))
        })();
        if let Err(error) = &diff {
            tracing::warn!(probe, error = %format!("{error:#}"), "probe failed");
        }

        reports.push(ProbeReport {
            probe,
            official_status,
            proxy_status,
            diff: diff.map_err(|e| format!("{e:#}")),
        });
    }
    reports
}

fn status(s: Option<u16>) -> String {
    s.map_or_else(|| "no response".to_string(), |code| code.to_string())
}

/// `a` is the official side, `b` the proxy.
pub fn render(reports: &[ProbeReport]) -> String {
    let mut out = String::new();
    for r in reports {
        out.push_str(&format!(
            "== {} (official: {}, proxy: {})\n",
            r.probe,
            status(r.official_status),
            status(r.proxy_status)
        ));
        match &r.diff {
            Ok(diff) => out.push_str(&diff.to_string()),
            Err(error) => out.push_str(&format!("error: {error}\n")),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::sync::Arc;
    use twinbird_social::twitter::{OfficialProvider, ProxyProvider};
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[test]
    fn five_probes_in_fixed_order() {
        let args = CompareArgs {
            tweet_id: "1".into(),
            user_id: "2".into(),
            username: "three".into(),
            query: "four".into(),
            limit: 5,
            show: false,
        };
        let names: Vec<&str> = probes(&args).into_iter().map(|(n, _)| n).collect();
        assert_eq!(names, vec!["tweet", "user", "username", "following", "search"]);
    }

    #[tokio::test]
    async fn reports_paths_missing_on_one_side() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/user/details"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "user_id": "2", "name": "n", "username": "u"
            })))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/2/users/2"))
            .respond_with(ResponseTemplate::new(401).set_body_json(json!({"title": "Unauthorized"})))
            .mount(&server)
            .await;

        let official = Dispatcher::new(Arc::new(OfficialProvider::new(None, &server.uri()).unwrap()));
        let proxy = Dispatcher::new(Arc::new(ProxyProvider::new("k", "h", &server.uri()).unwrap()));
        let probes = vec![("user", Operation::GetUser { user_id: "2".into() })];

        let reports = compare(&official, &proxy, probes, false).await;
        assert_eq!(reports[0].official_status, Some(401));
        assert_eq!(reports[0].proxy_status, Some(200));
        let diff = reports[0].diff.as_ref().unwrap();
        assert!(diff.only_in_b.contains("data.public_metrics.listed_count"));
        assert!(diff.only_in_a.is_empty());

        let text = render(&reports);
        assert!(text.starts_with("== user (official: 401, proxy: 200)\n"));
        assert!(text.contains("only in b"));
    }

    #[tokio::test]
    async fn malformed_body_is_recorded_and_comparison_continues() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/tweet/details"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "tweet_id": "1", "user": "not-an-object"
            })))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/user/details"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"user_id": "2"})))
            .mount(&server)
            .await;

        let official = Dispatcher::new(Arc::new(OfficialProvider::new(None, &server.uri()).unwrap()));
        let proxy = Dispatcher::new(Arc::new(ProxyProvider::new("k", "h", &server.uri()).unwrap()));
        let probes = vec![
            ("tweet", Operation::GetTweet { tweet_id: "1".into() }),
            ("user", Operation::GetUser { user_id: "2".into() }),
        ];

        let reports = compare(&official, &proxy, probes, false).await;
        assert_eq!(reports.len(), 2);
        assert_eq!(reports[0].proxy_status, None);
        let error = reports[0].diff.as_ref().unwrap_err();
        assert!(error.contains("proxy body"), "{error}");
        assert!(reports[1].diff.is_ok());
        assert_eq!(reports[1].proxy_status, Some(200));

        let text = render(&reports);
        assert!(text.contains("== tweet (official: 404, proxy: no response)\nerror: proxy body"));
    }
}
