//! Concurrent multi-node command dispatcher.
//!
//! The executor owns a fixed set of [`Target`]s, built once at startup
//! from configuration, and fans shell commands out to one, all, or an
//! arbitrary subset of them. Concurrency lives entirely inside a single
//! `exec_broadcast`/`exec_batch` call: each command is dispatched onto a
//! task gated by a bounded semaphore, and the caller resolves the
//! returned handles before moving on. No long-lived background work ever
//! escapes a call.
//!
//! # Invariants
//! - One handle per target (broadcast) or per pair (batch), tagged with
//!   its origin target; completion order is unspecified.
//! - A single target's failure (non-zero exit, connection drop, timeout)
//!   resolves that handle to an error and never aborts its siblings.

mod handle;
mod transport;

pub use handle::{CommandHandle, resolve_all};
pub use transport::Transport;

use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{OnceCell, Semaphore};
use tracing::{debug, warn};

use crate::error::{ClientError, Result};
use clusterhc_config::{HostSpec, RemoteConfig};

/// An addressable cluster node usable for remote command execution.
///
/// `addr` is what the command channel connects to; `internal_addr` is the
/// address the control plane knows the node by.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Target {
    pub user: String,
    pub addr: String,
    pub internal_addr: String,
}

impl Target {
    pub fn from_spec(spec: &HostSpec, default_user: &str) -> Self {
        Self {
            user: spec
                .user
                .clone()
                .unwrap_or_else(|| default_user.to_string()),
            addr: spec.addr.clone(),
            internal_addr: spec.internal().to_string(),
        }
    }
}

impl fmt::Display for Target {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.addr)
    }
}

/// Multi-node command dispatcher over a fixed target set.
#[derive(Debug)]
pub struct RemoteExecutor {
    targets: Vec<Target>,
    transport: Transport,
    command_timeout: Duration,
    pool: Arc<Semaphore>,
    connected: OnceCell<bool>,
}

impl RemoteExecutor {
    /// Build an executor over an explicit target set.
    pub fn new(targets: Vec<Target>, transport: Transport, command_timeout: Duration) -> Result<Self> {
        if targets.is_empty() {
            return Err(ClientError::InvalidConfig(
                "remote executor needs at least one target".to_string(),
            ));
        }
        // One worker per target bounds a broadcast to one in-flight
        // command per node; larger batches queue on the semaphore.
        let pool = Arc::new(Semaphore::new(targets.len()));
        Ok(Self {
            targets,
            transport,
            command_timeout,
            pool,
            connected: OnceCell::new(),
        })
    }

    /// Construct an executor straight from loaded configuration.
    pub fn from_config(config: &RemoteConfig) -> Result<Self> {
        let targets = config
            .hosts
            .iter()
            .map(|spec| Target::from_spec(spec, &config.user))
            .collect();
        let transport = if config.local {
            Transport::Local
        } else {
            Transport::Ssh {
                key_path: config.key_path.clone(),
                connect_timeout: config.connect_timeout,
            }
        };
        Self::new(targets, transport, config.command_timeout)
    }

    /// The configured targets, in configuration order.
    pub fn targets(&self) -> &[Target] {
        &self.targets
    }

    /// The internal cluster address of a target.
    pub fn address_of<'t>(&self, target: &'t Target) -> &'t str {
        &target.internal_addr
    }

    /// Mapping from externally-reachable address to internal address.
    pub fn address_map(&self) -> BTreeMap<&str, &str> {
        self.targets
            .iter()
            .map(|t| (t.addr.as_str(), t.internal_addr.as_str()))
            .collect()
    }

    /// Run one command on one target, waiting for it to finish.
    pub async fn exec_one(&self, command: &str, target: &Target) -> Result<String> {
        transport::run_command(&self.transport, target, command, self.command_timeout).await
    }

    /// Run the same command concurrently on every target.
    ///
    /// Returns exactly one handle per target, each tagged with its origin
    /// target, regardless of completion order.
    pub fn exec_broadcast(&self, command: &str) -> Vec<CommandHandle> {
        self.targets
            .iter()
            .map(|target| self.dispatch(command.to_string(), target.clone()))
            .collect()
    }

    /// Run an arbitrary set of (command, target) pairs concurrently.
    ///
    /// Returns one handle per pair, with the same cardinality as the
    /// input; completion order is unspecified.
    pub fn exec_batch(&self, jobs: Vec<(String, Target)>) -> Vec<CommandHandle> {
        jobs.into_iter()
            .map(|(command, target)| self.dispatch(command, target))
            .collect()
    }

    /// Probe reachability of the target set.
    ///
    /// Memoized; reachability means at least one target answered. Failed
    /// probes become diagnostics instead of errors so the run can proceed
    /// and let the affected checks report themselves.
    pub async fn check_connection(&self) -> bool {
        *self
            .connected
            .get_or_init(|| async {
                let handles = self.exec_broadcast("true");
                let mut reachable = false;
                for (target, outcome) in resolve_all(handles).await {
                    match outcome {
                        Ok(_) => {
                            debug!(target = %target, "node reachable");
                            reachable = true;
                        }
                        Err(err) => {
                            warn!(target = %target, error = %err, "node unreachable");
                        }
                    }
                }
                reachable
            })
            .await
    }

    fn dispatch(&self, command: String, target: Target) -> CommandHandle {
        let transport = self.transport.clone();
        let timeout = self.command_timeout;
        let pool = Arc::clone(&self.pool);
        let task_target = target.clone();
        let task = tokio::spawn(async move {
            let _permit = pool
                .acquire_owned()
                .await
                .map_err(|e| ClientError::RemoteDispatch(e.to_string()))?;
            transport::run_command(&transport, &task_target, &command, timeout).await
        });
        CommandHandle::new(target, task)
    }
}
