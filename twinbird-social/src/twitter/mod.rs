//! Tweet, user and search data from the official v2 API or the RapidAPI proxy,
//! normalized into one canonical schema.
//!
//! Leaf modules are pure (`types`, `query`, `normalize`, `official`,
//! `assemble`, `fields`); `provider`, `client`, `proxy` and `dispatch` do I/O.
pub mod assemble;
pub mod client;
pub mod dispatch;
pub mod fields;
pub mod normalize;
pub mod official;
pub mod provider;
pub mod proxy;
pub mod query;
pub mod types;

pub use client::OfficialProvider;
pub use dispatch::{Dispatcher, Operation, Payload};
pub use provider::{Dispatched, TwitterProvider};
pub use proxy::ProxyProvider;
