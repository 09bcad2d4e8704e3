//! Configuration management for clusterhc.
//!
//! This crate provides types and a layered loader for the two connection
//! surfaces the health-check engine needs: the cluster's REST control-plane
//! API and the per-node remote command channel.

pub mod constants;
mod loader;
pub mod types;

pub use loader::{ConfigError, ConfigLoader, parse_hosts_list};
pub use types::{ApiConfig, Config, HostSpec, RemoteConfig};
