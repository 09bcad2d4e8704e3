//! Configuration loader for files, environment variables and explicit
//! overrides.
//!
//! Precedence is explicit overrides (CLI flags) over environment variables
//! over the config file: callers apply `with_*` setters first, then
//! `from_env()`, then `from_file()` — each later stage only fills fields
//! that are still unset.

use std::path::{Path, PathBuf};
use std::time::Duration;

use secrecy::SecretString;
use serde::Deserialize;
use thiserror::Error;

use crate::constants::{
    DEFAULT_COMMAND_TIMEOUT_SECS, DEFAULT_CONFIG_FILE, DEFAULT_CONNECT_TIMEOUT_SECS,
    DEFAULT_SSH_USER, DEFAULT_TIMEOUT_SECS,
};
use crate::types::{ApiConfig, Config, HostSpec, RemoteConfig};

/// Errors that can occur during configuration loading.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("API host is required (set api.host, CLUSTERHC_API_HOST or --api-host)")]
    MissingApiHost,

    #[error("API credentials are required (username and password)")]
    MissingCredentials,

    #[error("at least one remote host is required (set remote.hosts, CLUSTERHC_SSH_HOSTS or --ssh-hosts)")]
    NoHosts,

    #[error("invalid value for {var}: {message}")]
    InvalidValue { var: String, message: String },

    #[error("failed to read config file at {path}")]
    ConfigFileRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse config file at {path}")]
    ConfigFileParse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

/// Partial, all-optional mirror of [`Config`] for the JSON config file.
#[derive(Debug, Default, Deserialize)]
struct FileConfig {
    #[serde(default)]
    api: FileApiConfig,
    #[serde(default)]
    remote: FileRemoteConfig,
}

#[derive(Debug, Default, Deserialize)]
struct FileApiConfig {
    host: Option<String>,
    username: Option<String>,
    password: Option<String>,
    timeout_seconds: Option<u64>,
    skip_verify: Option<bool>,
}

#[derive(Debug, Default, Deserialize)]
struct FileRemoteConfig {
    user: Option<String>,
    key_path: Option<PathBuf>,
    hosts: Option<Vec<HostSpec>>,
    command_timeout_seconds: Option<u64>,
    connect_timeout_seconds: Option<u64>,
    local: Option<bool>,
}

/// Builder-style configuration loader.
#[derive(Debug, Default)]
pub struct ConfigLoader {
    config_path: Option<PathBuf>,
    api_host: Option<String>,
    username: Option<String>,
    password: Option<SecretString>,
    timeout: Option<Duration>,
    skip_verify: Option<bool>,
    ssh_user: Option<String>,
    ssh_key: Option<PathBuf>,
    hosts: Option<Vec<HostSpec>>,
    command_timeout: Option<Duration>,
    connect_timeout: Option<Duration>,
    local: Option<bool>,
}

impl ConfigLoader {
    pub fn new() -> Self {
        Self::default()
    }

    /// Load environment variables from a `.env` file if present.
    ///
    /// Setting `DOTENV_DISABLED=1` (or `true`) skips the file, which keeps
    /// test runs hermetic.
    pub fn load_dotenv(self) -> Self {
        let disabled = matches!(
            std::env::var("DOTENV_DISABLED").ok().as_deref(),
            Some("1") | Some("true")
        );
        if !disabled {
            dotenvy::dotenv().ok();
        }
        self
    }

    pub fn with_config_path(mut self, path: PathBuf) -> Self {
        self.config_path = Some(path);
        self
    }

    pub fn with_api_host(mut self, host: String) -> Self {
        self.api_host = Some(host);
        self
    }

    pub fn with_username(mut self, username: String) -> Self {
        self.username = Some(username);
        self
    }

    pub fn with_password(mut self, password: String) -> Self {
        self.password = Some(SecretString::new(password.into()));
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    pub fn with_skip_verify(mut self, skip: bool) -> Self {
        self.skip_verify = Some(skip);
        self
    }

    pub fn with_ssh_user(mut self, user: String) -> Self {
        self.ssh_user = Some(user);
        self
    }

    pub fn with_ssh_key(mut self, key: PathBuf) -> Self {
        self.ssh_key = Some(key);
        self
    }

    pub fn with_hosts(mut self, hosts: Vec<HostSpec>) -> Self {
        self.hosts = Some(hosts);
        self
    }

    pub fn with_command_timeout(mut self, timeout: Duration) -> Self {
        self.command_timeout = Some(timeout);
        self
    }

    pub fn with_local(mut self, local: bool) -> Self {
        self.local = Some(local);
        self
    }

    /// Fill unset fields from `CLUSTERHC_*` environment variables.
    pub fn from_env(mut self) -> Result<Self, ConfigError> {
        fn var(name: &str) -> Option<String> {
            std::env::var(name).ok().filter(|v| !v.trim().is_empty())
        }

        self.api_host = self.api_host.or_else(|| var("CLUSTERHC_API_HOST"));
        self.username = self.username.or_else(|| var("CLUSTERHC_API_USER"));
        if self.password.is_none() {
            self.password = var("CLUSTERHC_API_PASSWORD").map(|p| SecretString::new(p.into()));
        }
        self.ssh_user = self.ssh_user.or_else(|| var("CLUSTERHC_SSH_USER"));
        if self.ssh_key.is_none() {
            self.ssh_key = var("CLUSTERHC_SSH_KEY").map(PathBuf::from);
        }
        if self.hosts.is_none()
            && let Some(raw) = var("CLUSTERHC_SSH_HOSTS")
        {
            self.hosts = Some(parse_hosts_list(&raw).map_err(|message| {
                ConfigError::InvalidValue {
                    var: "CLUSTERHC_SSH_HOSTS".to_string(),
                    message,
                }
            })?);
        }
        if self.timeout.is_none()
            && let Some(raw) = var("CLUSTERHC_TIMEOUT")
        {
            let secs = raw.parse::<u64>().map_err(|e| ConfigError::InvalidValue {
                var: "CLUSTERHC_TIMEOUT".to_string(),
                message: e.to_string(),
            })?;
            self.timeout = Some(Duration::from_secs(secs));
        }
        if self.command_timeout.is_none()
            && let Some(raw) = var("CLUSTERHC_COMMAND_TIMEOUT")
        {
            let secs = raw.parse::<u64>().map_err(|e| ConfigError::InvalidValue {
                var: "CLUSTERHC_COMMAND_TIMEOUT".to_string(),
                message: e.to_string(),
            })?;
            self.command_timeout = Some(Duration::from_secs(secs));
        }
        if self.skip_verify.is_none() {
            self.skip_verify =
                var("CLUSTERHC_SKIP_VERIFY").map(|v| matches!(v.as_str(), "1" | "true"));
        }
        if self.local.is_none() {
            self.local = var("CLUSTERHC_LOCAL").map(|v| matches!(v.as_str(), "1" | "true"));
        }
        Ok(self)
    }

    /// Fill unset fields from the JSON config file.
    ///
    /// Uses the explicit path when one was set; otherwise looks for
    /// `clusterhc.json` in the working directory and silently skips the
    /// stage when it does not exist.
    pub fn from_file(mut self) -> Result<Self, ConfigError> {
        let path = match &self.config_path {
            Some(path) => path.clone(),
            None => {
                let default = Path::new(DEFAULT_CONFIG_FILE);
                if !default.exists() {
                    return Ok(self);
                }
                default.to_path_buf()
            }
        };

        let raw = std::fs::read_to_string(&path).map_err(|source| ConfigError::ConfigFileRead {
            path: path.clone(),
            source,
        })?;
        let file: FileConfig =
            serde_json::from_str(&raw).map_err(|source| ConfigError::ConfigFileParse {
                path: path.clone(),
                source,
            })?;
        tracing::debug!(path = %path.display(), "loaded config file");

        self.api_host = self.api_host.or(file.api.host);
        self.username = self.username.or(file.api.username);
        if self.password.is_none() {
            self.password = file.api.password.map(|p| SecretString::new(p.into()));
        }
        if self.timeout.is_none() {
            self.timeout = file.api.timeout_seconds.map(Duration::from_secs);
        }
        self.skip_verify = self.skip_verify.or(file.api.skip_verify);

        self.ssh_user = self.ssh_user.or(file.remote.user);
        self.ssh_key = self.ssh_key.or(file.remote.key_path);
        self.hosts = self.hosts.or(file.remote.hosts);
        if self.command_timeout.is_none() {
            self.command_timeout = file.remote.command_timeout_seconds.map(Duration::from_secs);
        }
        if self.connect_timeout.is_none() {
            self.connect_timeout = file.remote.connect_timeout_seconds.map(Duration::from_secs);
        }
        self.local = self.local.or(file.remote.local);
        Ok(self)
    }

    /// Validate and assemble the final [`Config`].
    pub fn build(self) -> Result<Config, ConfigError> {
        let host = self.api_host.ok_or(ConfigError::MissingApiHost)?;
        let (username, password) = match (self.username, self.password) {
            (Some(u), Some(p)) => (u, p),
            _ => return Err(ConfigError::MissingCredentials),
        };
        let hosts = self.hosts.unwrap_or_default();
        if hosts.is_empty() {
            return Err(ConfigError::NoHosts);
        }

        Ok(Config {
            api: ApiConfig {
                host,
                username,
                password,
                timeout: self
                    .timeout
                    .unwrap_or(Duration::from_secs(DEFAULT_TIMEOUT_SECS)),
                skip_verify: self.skip_verify.unwrap_or(false),
            },
            remote: RemoteConfig {
                user: self.ssh_user.unwrap_or_else(|| DEFAULT_SSH_USER.to_string()),
                key_path: self.ssh_key,
                hosts,
                command_timeout: self
                    .command_timeout
                    .unwrap_or(Duration::from_secs(DEFAULT_COMMAND_TIMEOUT_SECS)),
                connect_timeout: self
                    .connect_timeout
                    .unwrap_or(Duration::from_secs(DEFAULT_CONNECT_TIMEOUT_SECS)),
                local: self.local.unwrap_or(false),
            },
        })
    }
}

/// Parse a comma-separated list of `[user@]addr[=internal]` host specs.
pub fn parse_hosts_list(raw: &str) -> Result<Vec<HostSpec>, String> {
    let hosts = raw
        .split(',')
        .map(str::trim)
        .filter(|part| !part.is_empty())
        .map(str::parse)
        .collect::<Result<Vec<HostSpec>, _>>()?;
    if hosts.is_empty() {
        return Err("no host specs given".to_string());
    }
    Ok(hosts)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn loader_with_minimum() -> ConfigLoader {
        ConfigLoader::new()
            .with_api_host("cluster.local".to_string())
            .with_username("admin".to_string())
            .with_password("secret".to_string())
            .with_hosts(vec!["10.0.0.1".parse().unwrap()])
    }

    #[test]
    fn build_requires_api_host() {
        let err = ConfigLoader::new()
            .with_username("admin".to_string())
            .with_password("secret".to_string())
            .build()
            .unwrap_err();
        assert!(matches!(err, ConfigError::MissingApiHost));
    }

    #[test]
    fn build_requires_credentials() {
        let err = ConfigLoader::new()
            .with_api_host("cluster.local".to_string())
            .with_hosts(vec!["10.0.0.1".parse().unwrap()])
            .build()
            .unwrap_err();
        assert!(matches!(err, ConfigError::MissingCredentials));
    }

    #[test]
    fn build_requires_hosts() {
        let err = ConfigLoader::new()
            .with_api_host("cluster.local".to_string())
            .with_username("admin".to_string())
            .with_password("secret".to_string())
            .build()
            .unwrap_err();
        assert!(matches!(err, ConfigError::NoHosts));
    }

    #[test]
    fn build_applies_defaults() {
        let config = loader_with_minimum().build().unwrap();
        assert_eq!(config.api.timeout, Duration::from_secs(30));
        assert!(!config.api.skip_verify);
        assert_eq!(config.remote.user, "root");
        assert_eq!(config.remote.command_timeout, Duration::from_secs(60));
        assert!(!config.remote.local);
    }

    #[test]
    fn file_fills_only_unset_fields() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(
            file,
            r#"{{
                "api": {{
                    "host": "from-file.local",
                    "username": "file-user",
                    "password": "file-pass",
                    "timeout_seconds": 5
                }},
                "remote": {{
                    "user": "file-ssh",
                    "hosts": [{{"addr": "10.0.0.9"}}]
                }}
            }}"#
        )
        .unwrap();

        // The explicit host wins; everything else comes from the file.
        let config = ConfigLoader::new()
            .with_api_host("explicit.local".to_string())
            .with_config_path(file.path().to_path_buf())
            .from_file()
            .unwrap()
            .build()
            .unwrap();

        assert_eq!(config.api.host, "explicit.local");
        assert_eq!(config.api.username, "file-user");
        assert_eq!(config.api.timeout, Duration::from_secs(5));
        assert_eq!(config.remote.user, "file-ssh");
        assert_eq!(config.remote.hosts.len(), 1);
    }

    #[test]
    fn missing_explicit_file_is_an_error() {
        let err = ConfigLoader::new()
            .with_config_path(PathBuf::from("/nonexistent/clusterhc.json"))
            .from_file()
            .unwrap_err();
        assert!(matches!(err, ConfigError::ConfigFileRead { .. }));
    }

    #[test]
    fn parse_hosts_list_accepts_mixed_specs() {
        let hosts = parse_hosts_list("10.0.0.1, redis@10.0.0.2=192.168.0.2").unwrap();
        assert_eq!(hosts.len(), 2);
        assert_eq!(hosts[1].user.as_deref(), Some("redis"));
        assert_eq!(hosts[1].internal(), "192.168.0.2");
    }

    #[test]
    fn parse_hosts_list_rejects_garbage() {
        assert!(parse_hosts_list("").is_err());
        assert!(parse_hosts_list("@bad").is_err());
    }
}
