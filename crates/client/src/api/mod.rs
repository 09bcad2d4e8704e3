//! Cached client for the cluster's topic-addressed REST control-plane API.
//!
//! Every read goes through one primitive, [`ApiFetcher::get`], which is
//! cache-first: a topic is fetched over the network at most once per
//! fetcher lifetime. There is no TTL and no invalidation — a health-check
//! run wants every check to see the same snapshot, and staleness within a
//! single pass is an accepted trade-off. Construct a new fetcher to get a
//! fresh snapshot.
//!
//! # Invariants
//! - The topic cache only ever grows; successful responses are stored
//!   unconditionally, errors are never cached.
//! - The UID index is built at most once, from the `nodes` topic, on the
//!   first [`ApiFetcher::resolve_uid`] call.

mod builder;

pub use builder::ApiFetcherBuilder;

use std::collections::HashMap;
use std::sync::Arc;

use moka::future::Cache;
use secrecy::{ExposeSecret, SecretString};
use serde::de::DeserializeOwned;
use serde_json::Value;
use tokio::sync::OnceCell;
use tracing::{debug, warn};

use crate::error::{ClientError, Result};

/// Cached, lazily-resolving control-plane API client.
#[derive(Debug)]
pub struct ApiFetcher {
    http: reqwest::Client,
    base_url: String,
    username: String,
    password: SecretString,
    cache: Cache<String, Arc<Value>>,
    uids: OnceCell<HashMap<String, u64>>,
    connected: OnceCell<bool>,
}

impl ApiFetcher {
    /// Create a new fetcher builder.
    pub fn builder() -> ApiFetcherBuilder {
        ApiFetcherBuilder::new()
    }

    /// Construct a fetcher straight from loaded configuration.
    pub fn from_config(config: &clusterhc_config::ApiConfig) -> Result<Self> {
        Self::builder()
            .host(config.host.clone())
            .username(config.username.clone())
            .password(config.password.clone())
            .timeout(config.timeout)
            .skip_verify(config.skip_verify)
            .build()
    }

    pub(crate) fn new(
        http: reqwest::Client,
        base_url: String,
        username: String,
        password: SecretString,
    ) -> Self {
        Self {
            http,
            base_url,
            username,
            password,
            cache: Cache::builder().build(),
            uids: OnceCell::new(),
            connected: OnceCell::new(),
        }
    }

    /// The normalized base URL requests are issued against.
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Get a topic, e.g. `nodes` or `shards/stats/5`.
    pub async fn get(&self, topic: &str) -> Result<Arc<Value>> {
        if let Some(hit) = self.cache.get(topic).await {
            return Ok(hit);
        }

        let url = format!("{}/v1/{}", self.base_url, topic);
        debug!(%url, "fetching topic");
        let response = self
            .http
            .get(&url)
            .basic_auth(&self.username, Some(self.password.expose_secret()))
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            return Err(ClientError::Api {
                status: status.as_u16(),
                url,
                message,
            });
        }

        let body: Value = response.json().await?;
        let body = Arc::new(body);
        self.cache
            .insert(topic.to_string(), Arc::clone(&body))
            .await;
        Ok(body)
    }

    /// Get a topic decoded into a typed model.
    pub async fn get_as<T: DeserializeOwned>(&self, topic: &str) -> Result<T> {
        let value = self.get(topic).await?;
        serde_json::from_value((*value).clone()).map_err(|e| {
            ClientError::InvalidResponse(format!("topic '{topic}' did not decode: {e}"))
        })
    }

    /// Get a single value from an object topic, e.g. `cluster` / `name`.
    pub async fn get_value(&self, topic: &str, key: &str) -> Result<Value> {
        let value = self.get(topic).await?;
        value
            .get(key)
            .cloned()
            .ok_or_else(|| ClientError::NotFound(format!("{topic}.{key}")))
    }

    /// Get one key out of every entry of an array topic.
    pub async fn get_values(&self, topic: &str, key: &str) -> Result<Vec<Value>> {
        let value = self.get(topic).await?;
        entries_of(topic, &value)?
            .iter()
            .map(|entry| {
                entry
                    .get(key)
                    .cloned()
                    .ok_or_else(|| ClientError::NotFound(format!("{topic}[].{key}")))
            })
            .collect()
    }

    /// Get the entries of an array topic whose `key` equals `value`.
    pub async fn get_with_value(
        &self,
        topic: &str,
        key: &str,
        value: impl Into<Value>,
    ) -> Result<Vec<Value>> {
        let wanted = value.into();
        let value = self.get(topic).await?;
        Ok(entries_of(topic, &value)?
            .iter()
            .filter(|entry| entry.get(key) == Some(&wanted))
            .cloned()
            .collect())
    }

    /// Number of entries in a topic (array length, or key count for
    /// object-of-objects topics such as `bdbs/alerts`).
    pub async fn count_of(&self, topic: &str) -> Result<usize> {
        let value = self.get(topic).await?;
        match &*value {
            Value::Array(entries) => Ok(entries.len()),
            Value::Object(map) => Ok(map.len()),
            _ => Err(ClientError::InvalidResponse(format!(
                "topic '{topic}' is not a collection"
            ))),
        }
    }

    /// Sum one numeric key over every entry of an array topic.
    pub async fn sum_of(&self, topic: &str, key: &str) -> Result<f64> {
        let value = self.get(topic).await?;
        let mut sum = 0.0;
        for entry in entries_of(topic, &value)? {
            let sample = entry.get(key).and_then(Value::as_f64).ok_or_else(|| {
                ClientError::NotFound(format!("{topic}[].{key} is not a number"))
            })?;
            sum += sample;
        }
        Ok(sum)
    }

    /// Resolve a node's internal address to its cluster-assigned UID.
    ///
    /// The address→UID index is built from the `nodes` topic on first use
    /// and reused for the fetcher's lifetime.
    pub async fn resolve_uid(&self, internal_addr: &str) -> Result<u64> {
        let index = self
            .uids
            .get_or_try_init(|| async {
                let value = self.get("nodes").await?;
                let mut index = HashMap::new();
                for node in entries_of("nodes", &value)? {
                    let Some(addr) = node.get("addr").and_then(Value::as_str) else {
                        continue;
                    };
                    let Some(uid) = node.get("uid").and_then(Value::as_u64) else {
                        continue;
                    };
                    index.insert(addr.to_string(), uid);
                }
                Ok::<_, ClientError>(index)
            })
            .await?;

        index
            .get(internal_addr)
            .copied()
            .ok_or_else(|| ClientError::UnknownNodeAddress(internal_addr.to_string()))
    }

    /// Probe the API with one low-cost read.
    ///
    /// The result is memoized; failures become `false` plus a diagnostic
    /// instead of propagating, so callers can keep going and let the
    /// affected checks report themselves.
    pub async fn check_connection(&self) -> bool {
        *self
            .connected
            .get_or_init(|| async {
                match self.get_value("cluster", "name").await {
                    Ok(name) => {
                        debug!(cluster = %name, "connected to control-plane API");
                        true
                    }
                    Err(err) => {
                        warn!(error = %err, "could not connect to control-plane API");
                        false
                    }
                }
            })
            .await
    }
}

fn entries_of<'v>(topic: &str, value: &'v Value) -> Result<&'v Vec<Value>> {
    value
        .as_array()
        .ok_or_else(|| ClientError::InvalidResponse(format!("topic '{topic}' is not an array")))
}
