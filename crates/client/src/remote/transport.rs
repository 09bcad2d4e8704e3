//! Command transports: ssh subprocess or local shell.

use std::path::PathBuf;
use std::process::Stdio;
use std::time::Duration;

use tokio::process::Command;

use crate::error::{ClientError, Result};
use crate::remote::Target;

/// How commands reach a target.
#[derive(Debug, Clone)]
pub enum Transport {
    /// Dispatch through the system `ssh` client. BatchMode keeps the run
    /// non-interactive; an unreachable node fails fast via ConnectTimeout.
    Ssh {
        key_path: Option<PathBuf>,
        connect_timeout: Duration,
    },
    /// Run commands on the local host. Used when the tool runs on a
    /// cluster node directly, and by the test suite.
    Local,
}

impl Transport {
    fn command(&self, target: &Target, command: &str) -> Command {
        match self {
            Transport::Ssh {
                key_path,
                connect_timeout,
            } => {
                let mut cmd = Command::new("ssh");
                cmd.arg("-o")
                    .arg("BatchMode=yes")
                    .arg("-o")
                    .arg("StrictHostKeyChecking=accept-new")
                    .arg("-o")
                    .arg(format!("ConnectTimeout={}", connect_timeout.as_secs()));
                if let Some(key) = key_path {
                    cmd.arg("-i").arg(key);
                }
                cmd.arg(format!("{}@{}", target.user, target.addr))
                    .arg("--")
                    .arg(command);
                cmd
            }
            Transport::Local => {
                let mut cmd = Command::new("sh");
                cmd.arg("-c").arg(command);
                cmd
            }
        }
    }
}

/// Run one command against one target, bounded by `limit`.
///
/// Returns raw standard output, trailing newline included — callers that
/// compare exact strings trim for themselves. A timeout kills the child
/// (`kill_on_drop`) and fails only this command.
pub(super) async fn run_command(
    transport: &Transport,
    target: &Target,
    command: &str,
    limit: Duration,
) -> Result<String> {
    let mut cmd = transport.command(target, command);
    cmd.stdin(Stdio::null()).kill_on_drop(true);

    let output = match tokio::time::timeout(limit, cmd.output()).await {
        Ok(spawned) => spawned?,
        Err(_) => {
            return Err(ClientError::RemoteTimeout {
                target: target.addr.clone(),
                timeout: limit,
            });
        }
    };

    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        let detail = match stderr.trim() {
            "" => output.status.to_string(),
            message => message.to_string(),
        };
        return Err(ClientError::RemoteCommandFailed {
            target: target.addr.clone(),
            detail,
        });
    }

    Ok(String::from_utf8_lossy(&output.stdout).into_owned())
}
