//! Core engine for the clusterhc health-check tool.
//!
//! This crate holds the execution substrate every check is built on:
//! - [`ApiFetcher`]: a cached, lazily-resolving client over the cluster's
//!   topic-addressed REST control-plane API.
//! - [`RemoteExecutor`]: a concurrent multi-node command dispatcher with
//!   fail-soft per-target result handles.
//! - [`stats`]: the min/avg/max/population-stddev summary used by the
//!   usage and throughput checks.
//! - [`models`]: typed views over the control-plane topics.
//!
//! Checks themselves live in the CLI crate; nothing here knows about
//! check registries or output formats.

pub mod api;
pub mod error;
pub mod format;
pub mod models;
pub mod ping;
pub mod remote;
pub mod stats;

pub use api::ApiFetcher;
pub use error::{ClientError, Result};
pub use remote::{CommandHandle, RemoteExecutor, Target, Transport, resolve_all};
pub use stats::Summary;
