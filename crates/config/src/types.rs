//! Configuration types for clusterhc.

use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use secrecy::SecretString;
use serde::{Deserialize, Serialize};

use crate::constants::{
    DEFAULT_COMMAND_TIMEOUT_SECS, DEFAULT_CONNECT_TIMEOUT_SECS, DEFAULT_SSH_USER,
    DEFAULT_TIMEOUT_SECS,
};

/// Module for serializing SecretString as plain strings.
mod secret_string {
    use secrecy::{ExposeSecret, SecretString};
    use serde::{Deserialize as DeserializeTrait, Serialize as SerializeTrait};
    use serde::{Deserializer, Serializer};

    pub fn serialize<S>(secret: &SecretString, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        secret.expose_secret().serialize(serializer)
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<SecretString, D::Error>
    where
        D: Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        Ok(SecretString::new(s.into()))
    }
}

/// Module for serializing Duration as whole seconds.
mod duration_seconds {
    use serde::{Deserialize, Deserializer, Serialize, Serializer};
    use std::time::Duration;

    pub fn serialize<S>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        duration.as_secs().serialize(serializer)
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
    where
        D: Deserializer<'de>,
    {
        let secs = u64::deserialize(deserializer)?;
        Ok(Duration::from_secs(secs))
    }
}

/// Connection settings for the control-plane REST API.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiConfig {
    /// API host. A bare hostname gets the default API port appended; an
    /// explicit `host:port` or full URL is used verbatim.
    pub host: String,
    /// Basic-auth username.
    pub username: String,
    /// Basic-auth password.
    #[serde(with = "secret_string")]
    pub password: SecretString,
    /// HTTP request timeout (serialized as seconds).
    #[serde(with = "duration_seconds")]
    pub timeout: Duration,
    /// Skip TLS certificate verification (self-signed control planes).
    pub skip_verify: bool,
}

/// One addressable cluster node for remote command execution.
///
/// `addr` is the address the command channel connects to; `internal_addr`
/// is the address the control plane knows the node by. They differ when
/// nodes are reached through NAT or a jump network.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HostSpec {
    pub addr: String,
    #[serde(default)]
    pub internal_addr: Option<String>,
    /// Per-host login user, overriding the remote-level default.
    #[serde(default)]
    pub user: Option<String>,
}

impl HostSpec {
    /// The cluster-internal address, falling back to `addr` when the two
    /// are the same.
    pub fn internal(&self) -> &str {
        self.internal_addr.as_deref().unwrap_or(&self.addr)
    }
}

/// Parses the compact `[user@]addr[=internal]` form used by the CLI and
/// environment variables.
impl FromStr for HostSpec {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        if s.is_empty() {
            return Err("empty host spec".to_string());
        }
        let (user, rest) = match s.split_once('@') {
            Some((user, rest)) if !user.is_empty() => (Some(user.to_string()), rest),
            Some(_) => return Err(format!("host spec '{s}' has an empty user")),
            None => (None, s),
        };
        let (addr, internal) = match rest.split_once('=') {
            Some((addr, internal)) if !addr.is_empty() && !internal.is_empty() => {
                (addr.to_string(), Some(internal.to_string()))
            }
            Some(_) => return Err(format!("host spec '{s}' has an empty address")),
            None => (rest.to_string(), None),
        };
        Ok(HostSpec {
            addr,
            internal_addr: internal,
            user,
        })
    }
}

/// Settings for the per-node remote command channel.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RemoteConfig {
    /// Default login user; individual hosts may override it.
    pub user: String,
    /// Identity file handed to ssh, if any.
    #[serde(default)]
    pub key_path: Option<PathBuf>,
    /// The fixed set of nodes, in configuration order.
    pub hosts: Vec<HostSpec>,
    /// Upper bound on a single command (serialized as seconds).
    #[serde(with = "duration_seconds")]
    pub command_timeout: Duration,
    /// TCP connection timeout for the ssh transport (serialized as seconds).
    #[serde(with = "duration_seconds")]
    pub connect_timeout: Duration,
    /// Run commands on the local host instead of over ssh. Useful when
    /// the tool runs on a cluster node directly.
    #[serde(default)]
    pub local: bool,
}

impl Default for RemoteConfig {
    fn default() -> Self {
        Self {
            user: DEFAULT_SSH_USER.to_string(),
            key_path: None,
            hosts: Vec::new(),
            command_timeout: Duration::from_secs(DEFAULT_COMMAND_TIMEOUT_SECS),
            connect_timeout: Duration::from_secs(DEFAULT_CONNECT_TIMEOUT_SECS),
            local: false,
        }
    }
}

/// Main configuration structure.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub api: ApiConfig,
    pub remote: RemoteConfig,
}

impl ApiConfig {
    /// Default request timeout used when neither file nor environment set one.
    pub fn default_timeout() -> Duration {
        Duration::from_secs(DEFAULT_TIMEOUT_SECS)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn host_spec_plain_addr() {
        let spec: HostSpec = "10.0.0.1".parse().unwrap();
        assert_eq!(spec.addr, "10.0.0.1");
        assert_eq!(spec.internal(), "10.0.0.1");
        assert!(spec.user.is_none());
    }

    #[test]
    fn host_spec_with_user_and_internal() {
        let spec: HostSpec = "redis@node1.example.com=192.168.1.10".parse().unwrap();
        assert_eq!(spec.user.as_deref(), Some("redis"));
        assert_eq!(spec.addr, "node1.example.com");
        assert_eq!(spec.internal(), "192.168.1.10");
    }

    #[test]
    fn host_spec_rejects_empty_parts() {
        assert!("".parse::<HostSpec>().is_err());
        assert!("@host".parse::<HostSpec>().is_err());
        assert!("user@=internal".parse::<HostSpec>().is_err());
        assert!("host=".parse::<HostSpec>().is_err());
    }

    #[test]
    fn remote_config_roundtrips_durations_as_seconds() {
        let remote = RemoteConfig::default();
        let json = serde_json::to_value(&remote).unwrap();
        assert_eq!(json["command_timeout"], 60);
        assert_eq!(json["connect_timeout"], 10);

        let back: RemoteConfig = serde_json::from_value(json).unwrap();
        assert_eq!(back.command_timeout, Duration::from_secs(60));
    }

    #[test]
    fn password_not_exposed_in_debug() {
        let api = ApiConfig {
            host: "cluster.local".to_string(),
            username: "admin".to_string(),
            password: SecretString::new("hunter2".to_string().into()),
            timeout: ApiConfig::default_timeout(),
            skip_verify: false,
        };
        let debug_output = format!("{api:?}");
        assert!(!debug_output.contains("hunter2"));
    }
}
