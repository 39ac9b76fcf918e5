//! Command-line surface of the `twinbird` binary.
use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;
use twinbird_common::ProviderKind;
use twinbird_social::twitter::dispatch::tweet_id_from_url;
use twinbird_social::twitter::query::CanonicalSearchQuery;
use twinbird_social::twitter::Operation;

/// Fetch tweets and users from the official API or the RapidAPI proxy in one canonical shape.
#[derive(Parser, Debug)]
#[command(name = "twinbird", version, about)]
pub struct Cli {
    /// YAML config file (defaults to ./twinbird.yaml when present, else the environment)
    #[arg(long, short = 'c', env = "TWINBIRD_CONFIG", global = true)]
    pub config: Option<PathBuf>,

    /// Override the configured provider (official | proxy)
    #[arg(long, short = 'p', global = true)]
    pub provider: Option<ProviderKind>,

    /// Print the upstream status and raw body to stderr
    #[arg(long, global = true)]
    pub raw: bool,

    /// Single-line JSON instead of pretty-printed
    #[arg(long, global = true)]
    pub compact: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// One tweet by id or status URL
    Tweet { id: String },

    /// Several tweets, fetched one by one
    Tweets {
        #[arg(required = true, num_args = 1..)]
        ids: Vec<String>,
    },

    /// One user by numeric id
    User { user_id: String },

    /// One user by handle (a leading @ is ignored)
    Username { username: String },

    /// Accounts a user follows
    Following {
        user_id: String,
        #[arg(long)]
        limit: Option<u32>,
    },

    /// Search tweets
    Search(SearchArgs),

    /// Fetch the same probes from both providers and diff their field paths
    Compare(CompareArgs),
}

#[derive(Args, Debug, Clone)]
pub struct SearchArgs {
    /// Free text; may embed min:retweets:N, min:replies:N, min:likes:N
    pub query: String,

    #[arg(long)]
    pub max_results: Option<u32>,

    /// ISO-8601 lower bound
    #[arg(long)]
    pub start_time: Option<String>,

    /// ISO-8601 upper bound
    #[arg(long)]
    pub end_time: Option<String>,

    #[arg(long)]
    pub lang: Option<String>,

    /// Use the full-archive endpoint
    #[arg(long)]
    pub archive: bool,
}

impl SearchArgs {
    pub fn to_query(&self) -> CanonicalSearchQuery {
        CanonicalSearchQuery {
            query: self.query.clone(),
            max_results: self.max_results,
            start_time: self.start_time.clone(),
            end_time: self.end_time.clone(),
            lang: self.lang.clone(),
        }
    }
}

#[derive(Args, Debug, Clone)]
pub struct CompareArgs {
    #[arg(long, default_value = "1517995317697916928")]
    pub tweet_id: String,

    #[arg(long, default_value = "96479162")]
    pub user_id: String,

    #[arg(long, default_value = "omarmhaimdat")]
    pub username: String,

    #[arg(long, default_value = "python")]
    pub query: String,

    /// Page size for the following and search probes
    #[arg(long, default_value_t = 5)]
    pub limit: u32,

    /// Also print both envelopes for every probe
    #[arg(long)]
    pub show: bool,
}

impl Command {
    /// The dispatcher operation behind a fetch subcommand; `None` for `compare`.
    pub fn operation(&self) -> anyhow::Result<Option<Operation>> {
        Ok(Some(match self {
            Command::Tweet { id } => Operation::GetTweet {
                tweet_id: parse_tweet_id(id)?,
            },
            Command::Tweets { ids } => Operation::GetTweetsByIds {
                tweet_ids: ids
                    .iter()
                    .map(|id| parse_tweet_id(id))
                    .collect::<anyhow::Result<_>>()?,
            },
            Command::User { user_id } => Operation::GetUser {
                user_id: user_id.clone(),
            },
            Command::Username { username } => Operation::GetUserByUsername {
                username: username.clone(),
            },
            Command::Following { user_id, limit } => Operation::GetUserFollowings {
                user_id: user_id.clone(),
                limit: *limit,
            },
            Command::Search(args) if args.archive => Operation::SearchArchive(args.to_query()),
            Command::Search(args) => Operation::SearchRecent(args.to_query()),
            Command::Compare(_) => return Ok(None),
        }))
    }
}

fn parse_tweet_id(raw: &str) -> anyhow::Result<String> {
    tweet_id_from_url(raw).ok_or_else(|| anyhow::anyhow!("not a tweet id or status URL: {raw}"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tweet_accepts_status_url() {
        let cli = Cli::try_parse_from(["twinbird", "tweet", "https://x.com/a/status/77"]).unwrap();
        assert_eq!(
            cli.command.operation().unwrap(),
            Some(Operation::GetTweet { tweet_id: "77".into() })
        );
    }

    #[test]
    fn tweets_rejects_garbage_ids() {
        let cli = Cli::try_parse_from(["twinbird", "tweets", "1", "nope"]).unwrap();
        assert!(cli.command.operation().is_err());
        assert!(Cli::try_parse_from(["twinbird", "tweets"]).is_err());
    }

    #[test]
    fn search_flags_build_query() {
        let cli = Cli::try_parse_from([
            "twinbird",
            "search",
            "rust min:likes:10",
            "--lang",
            "en",
            "--max-results",
            "20",
            "--archive",
            "--provider",
            "official",
        ])
        .unwrap();
        assert_eq!(cli.provider, Some(ProviderKind::Official));
        let Some(Operation::SearchArchive(q)) = cli.command.operation().unwrap() else {
            panic!("expected archive search");
        };
        assert_eq!(q.lang.as_deref(), Some("en"));
        assert_eq!(q.max_results, Some(20));
    }

    #[test]
    fn compare_has_defaults_and_no_operation() {
        let cli = Cli::try_parse_from(["twinbird", "compare"]).unwrap();
        assert!(cli.command.operation().unwrap().is_none());
        let Command::Compare(args) = cli.command else {
            panic!("expected compare");
        };
        assert_eq!(args.username, "omarmhaimdat");
        assert_eq!(args.limit, 5);
    }

    #[test]
    fn unknown_provider_is_rejected() {
        assert!(Cli::try_parse_from(["twinbird", "--provider", "mastodon", "user", "1"]).is_err());
    }
}
