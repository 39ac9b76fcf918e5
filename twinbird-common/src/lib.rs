//! Common types and utilities shared across twinbird crates.
//!
//! This crate defines the provider selector, observability helpers, and the
//! shared error type used throughout the workspace. It stays dependency-light
//! so every crate can pull it in.
//!
//! # Overview
//!
//! - [`ProviderKind`]: which upstream data source serves requests
//! - [`observability`]: centralised tracing/logging initialisation
//! - [`TwinbirdError`] and [`Result`]: shared error handling
//!
//! # Examples
//!
//! ```rust
//! use twinbird_common::ProviderKind;
//!
//! let kind: ProviderKind = "proxy".parse().unwrap();
//! assert_eq!(kind, ProviderKind::Proxy);
//! assert_eq!(kind.to_string(), "proxy");
//! ```
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

pub mod observability;

/// Upstream data source selected at configuration time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum ProviderKind {
    /// The platform's own v2 REST API (bearer token).
    Official,
    /// The RapidAPI-hosted proxy API (API key headers).
    #[default]
    Proxy,
}

impl ProviderKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ProviderKind::Official => "official",
            ProviderKind::Proxy => "proxy",
        }
    }
}

impl fmt::Display for ProviderKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ProviderKind {
    type Err = TwinbirdError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "official" | "twitter" => Ok(ProviderKind::Official),
            "proxy" | "rapid" | "rapidapi" => Ok(ProviderKind::Proxy),
            other => Err(TwinbirdError::Config(format!("unknown provider: {other}"))),
        }
    }
}

/// Error types used across the twinbird system.
#[derive(thiserror::Error, Debug)]
pub enum TwinbirdError {
    /// Configuration was incomplete or invalid.
    #[error("Configuration error: {0}")]
    Config(String),

    /// A provider could not be constructed or is unusable.
    #[error("Provider error: {0}")]
    Provider(String),

    /// The HTTP layer failed before a response was obtained.
    #[error("HTTP error: {0}")]
    Http(String),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

/// Convenient alias for results that use [`TwinbirdError`].
pub type Result<T> = std::result::Result<T, TwinbirdError>;
