//! Loader for twinbird configuration with YAML + environment overlays.
//!
//! Two entry points:
//!
//! - [`TwinbirdConfigLoader`]: YAML files/snippets merged with
//!   `TWINBIRD__`-prefixed environment variables (`TWINBIRD__PROXY__API_KEY`
//!   maps to `proxy.api_key`), followed by recursive `${VAR}` expansion.
//! - [`TwinbirdConfig::from_env`]: the environment-only setup (`.env` file,
//!   `USE_RAPID_API`, `TWITTER_BEARER_TOKEN`, `RAPID_API_KEY`).
//!
//! Secrets that are empty or still contain an unexpanded `${...}` placeholder
//! are treated as missing.
use config::{Config, ConfigError, Environment, File};
use serde::Deserialize;
use serde_json::Value;
use std::env;
use std::path::{Path, PathBuf};
use twinbird_common::observability::{LogConfig, LogFormat};
use twinbird_common::{ProviderKind, TwinbirdError};

const MAXIMUM_ENV_EXPANSION_DEPTH: usize = 8;
const DOTENV_SEARCH_PARENTS: usize = 3;

pub const DEFAULT_OFFICIAL_BASE_URL: &str = "https://api.twitter.com";
pub const DEFAULT_PROXY_HOST: &str = "twitter154.p.rapidapi.com";

#[derive(Debug, Clone, Deserialize, Default)]
pub struct TwinbirdConfig {
    #[serde(default)]
    pub provider: ProviderKind,
    #[serde(default)]
    pub official: OfficialConfig,
    #[serde(default)]
    pub proxy: ProxyConfig,
    #[serde(default)]
    pub http: HttpConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct OfficialConfig {
    #[serde(default)]
    pub bearer_token: Option<String>,
    #[serde(default = "default_official_base_url")]
    pub base_url: String,
}

impl Default for OfficialConfig {
    fn default() -> Self {
        Self {
            bearer_token: None,
            base_url: default_official_base_url(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct ProxyConfig {
    #[serde(default)]
    pub api_key: Option<String>,
    #[serde(default = "default_proxy_host")]
    pub host: String,
    /// Overrides `https://{host}`; mostly useful for tests and gateways.
    #[serde(default)]
    pub base_url: Option<String>,
}

impl Default for ProxyConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            host: default_proxy_host(),
            base_url: None,
        }
    }
}

impl ProxyConfig {
    pub fn resolved_base_url(&self) -> String {
        self.base_url
            .clone()
            .unwrap_or_else(|| format!("https://{}", self.host))
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct HttpConfig {
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            timeout_secs: default_timeout_secs(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "default_log_filter")]
    pub filter: String,
    #[serde(default)]
    pub format: LogFormat,
    #[serde(default)]
    pub stderr: bool,
    #[serde(default)]
    pub dir: Option<PathBuf>,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            filter: default_log_filter(),
            format: LogFormat::default(),
            stderr: false,
            dir: None,
        }
    }
}

fn default_official_base_url() -> String {
    DEFAULT_OFFICIAL_BASE_URL.into()
}
fn default_proxy_host() -> String {
    DEFAULT_PROXY_HOST.into()
}
fn default_timeout_secs() -> u64 {
    15
}
fn default_log_filter() -> String {
    "info".into()
}

impl TwinbirdConfig {
    /// Environment-only configuration.
    ///
    /// Loads the nearest `.env` (working directory and up to three parents)
    /// without overriding variables that are already set, then reads:
    /// `USE_RAPID_API` (proxy unless the value is not `true`, default `true`),
    /// `TWITTER_BEARER_TOKEN`, `RAPID_API_KEY`, `RAPIDAPI_HOST`.
    pub fn from_env() -> Self {
        if let Ok(cwd) = env::current_dir() {
            load_dotenv(&cwd);
        }

        let use_rapid = env::var("USE_RAPID_API")
            .map(|v| v.to_lowercase() == "true")
            .unwrap_or(true);

        let mut cfg = Self {
            provider: if use_rapid {
                ProviderKind::Proxy
            } else {
                ProviderKind::Official
            },
            ..Self::default()
        };
        cfg.official.bearer_token = env::var("TWITTER_BEARER_TOKEN").ok();
        cfg.proxy.api_key = env::var("RAPID_API_KEY").ok();
        if let Ok(host) = env::var("RAPIDAPI_HOST") {
            cfg.proxy.host = host;
        }
        cfg.scrub_secrets();
        cfg
    }

    /// Credential check for the selected provider.
    ///
    /// The proxy cannot work without its API key; the official API without a
    /// bearer token is allowed but almost certainly answers 401, so we warn.
    pub fn validate(&self) -> Result<(), TwinbirdError> {
        match self.provider {
            ProviderKind::Proxy if self.proxy.api_key.is_none() => Err(TwinbirdError::Config(
                "proxy provider selected but no API key is configured (set RAPID_API_KEY or proxy.api_key)"
                    .into(),
            )),
            ProviderKind::Official if self.official.bearer_token.is_none() => {
                tracing::warn!(
                    "no bearer token configured for the official provider; set TWITTER_BEARER_TOKEN or switch to the proxy"
                );
                Ok(())
            }
            _ => Ok(()),
        }
    }

    /// Logging settings translated for [`twinbird_common::observability::init_logging`].
    pub fn log_config(&self) -> LogConfig {
        LogConfig {
            log_dir: self.logging.dir.clone(),
            emit_stderr: self.logging.stderr,
            format: self.logging.format,
            default_filter: self.logging.filter.clone(),
            ..LogConfig::default()
        }
    }

    fn scrub_secrets(&mut self) {
        self.official.bearer_token = usable_secret(self.official.bearer_token.take());
        self.proxy.api_key = usable_secret(self.proxy.api_key.take());
    }
}

fn usable_secret(raw: Option<String>) -> Option<String> {
    raw.map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty() && !s.contains("${"))
}

/// Find `.env` in `start` or up to three parent directories.
pub fn find_dotenv_file(start: &Path) -> Option<PathBuf> {
    start
        .ancestors()
        .take(DOTENV_SEARCH_PARENTS + 1)
        .map(|dir| dir.join(".env"))
        .find(|candidate| candidate.is_file())
}

/// Load the nearest `.env` into the process environment. Returns its path.
pub fn load_dotenv(start: &Path) -> Option<PathBuf> {
    match find_dotenv_file(start) {
        Some(path) => match dotenvy::from_path(&path) {
            Ok(()) => {
                tracing::info!(path = %path.display(), "loaded environment from .env");
                Some(path)
            }
            Err(e) => {
                tracing::warn!(path = %path.display(), error = %e, "failed to parse .env");
                None
            }
        },
        None => {
            tracing::debug!(start = %start.display(), ".env not found");
            None
        }
    }
}

fn expand_env_in_value(v: &mut Value) {
    match v {
        Value::String(s) => {
            if s.contains('$') {
                let mut cur = std::mem::take(s);
                for _ in 0..MAXIMUM_ENV_EXPANSION_DEPTH {
                    let expanded = match shellexpand::env(&cur) {
                        Ok(cow) => cow.into_owned(),
                        Err(_) => cur.clone(),
                    };
                    if expanded == cur {
                        break;
                    }
                    cur = expanded;
                }
                *s = cur;
            }
        }
        Value::Array(arr) => arr.iter_mut().for_each(expand_env_in_value),
        Value::Object(obj) => obj.values_mut().for_each(expand_env_in_value),
        _ => {}
    }
}

/// Builder hides the `config` crate wiring (YAML + env overrides).
pub struct TwinbirdConfigLoader {
    builder: config::ConfigBuilder<config::builder::DefaultState>,
}

impl Default for TwinbirdConfigLoader {
    fn default() -> Self {
        Self::new()
    }
}

impl TwinbirdConfigLoader {
    /// Start with no sources; every section has defaults.
    ///
    /// ```
    /// use twinbird_config::TwinbirdConfigLoader;
    /// use twinbird_common::ProviderKind;
    ///
    /// let config = TwinbirdConfigLoader::new()
    ///     .with_yaml_str("provider: official\nhttp:\n  timeout_secs: 3")
    ///     .load()
    ///     .expect("valid config");
    ///
    /// assert_eq!(config.provider, ProviderKind::Official);
    /// assert_eq!(config.http.timeout_secs, 3);
    /// assert_eq!(config.proxy.host, "twitter154.p.rapidapi.com");
    /// ```
    pub fn new() -> Self {
        Self {
            builder: Config::builder(),
        }
    }

    /// Attach a required YAML/TOML/JSON file; the `config` crate infers format by suffix.
    pub fn with_file<P: AsRef<Path>>(mut self, path: P) -> Self {
        self.builder = self
            .builder
            .add_source(File::from(path.as_ref()).required(true));
        self
    }

    /// Attach a file that may be absent, so headless deployments can rely on
    /// environment variables alone.
    pub fn with_optional_file<P: AsRef<Path>>(mut self, path: P) -> Self {
        self.builder = self
            .builder
            .add_source(File::from(path.as_ref()).required(false));
        self
    }

    /// Allow tests/CLI to merge inline YAML snippets.
    ///
    /// ```
    /// use twinbird_config::TwinbirdConfigLoader;
    ///
    /// let cfg = TwinbirdConfigLoader::new()
    ///     .with_yaml_str(
    ///         r#"
    /// provider: proxy
    /// proxy:
    ///   api_key: "example"
    ///   base_url: "http://127.0.0.1:8080"
    /// "#,
    ///     )
    ///     .load()
    ///     .unwrap();
    ///
    /// assert_eq!(cfg.proxy.api_key.as_deref(), Some("example"));
    /// assert_eq!(cfg.proxy.resolved_base_url(), "http://127.0.0.1:8080");
    /// ```
    pub fn with_yaml_str(mut self, yaml: &str) -> Self {
        self.builder = self
            .builder
            .add_source(File::from_str(yaml, config::FileFormat::Yaml));
        self
    }

    /// Consume the builder and deserialize the merged sources into strongly typed config.
    /// `TWINBIRD__` variables are layered last, over every file and snippet.
    ///
    /// ```
    /// use twinbird_config::TwinbirdConfigLoader;
    ///
    /// unsafe { std::env::set_var("TB_DOC_TOKEN", "injected-from-env"); }
    ///
    /// let config = TwinbirdConfigLoader::new()
    ///     .with_yaml_str(r#"
    /// provider: official
    /// official:
    ///   bearer_token: "${TB_DOC_TOKEN}"
    /// "#)
    ///     .load()
    ///     .expect("valid configuration");
    ///
    /// assert_eq!(config.official.bearer_token.as_deref(), Some("injected-from-env"));
    /// assert_eq!(config.official.base_url, "https://api.twitter.com");
    ///
    /// unsafe { std::env::remove_var("TB_DOC_TOKEN"); }
    /// ```
    pub fn load(self) -> Result<TwinbirdConfig, ConfigError> {
        let cfg = self
            .builder
            .add_source(
                Environment::with_prefix("TWINBIRD")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        let mut v: Value = cfg.try_deserialize()?;
        expand_env_in_value(&mut v);

        let mut typed: TwinbirdConfig =
            serde_json::from_value(v).map_err(|e| ConfigError::Message(e.to_string()))?;
        typed.scrub_secrets();

        Ok(typed)
    }
}
