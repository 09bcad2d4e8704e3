//! Result handles for dispatched commands.

use tokio::task::JoinHandle;

use crate::error::{ClientError, Result};
use crate::remote::Target;

/// One in-flight or completed command execution, bound to exactly one
/// target. Resolve it to get the command's output; dropping it detaches
/// the underlying task.
#[derive(Debug)]
pub struct CommandHandle {
    pub(super) target: Target,
    pub(super) task: JoinHandle<Result<String>>,
}

impl CommandHandle {
    pub(super) fn new(target: Target, task: JoinHandle<Result<String>>) -> Self {
        Self { target, task }
    }

    /// The target this command was dispatched to.
    pub fn target(&self) -> &Target {
        &self.target
    }

    /// Wait for the command and return its raw output.
    pub async fn resolve(self) -> Result<String> {
        match self.task.await {
            Ok(outcome) => outcome,
            Err(err) => Err(ClientError::RemoteDispatch(err.to_string())),
        }
    }
}

/// Resolve a whole batch, keeping each result tagged with its target.
///
/// The handles are awaited in order, but the underlying commands have
/// been running concurrently since dispatch; callers must not read any
/// meaning into completion order beyond target identity.
pub async fn resolve_all(handles: Vec<CommandHandle>) -> Vec<(Target, Result<String>)> {
    let mut results = Vec::with_capacity(handles.len());
    for CommandHandle { target, task } in handles {
        let outcome = match task.await {
            Ok(outcome) => outcome,
            Err(err) => Err(ClientError::RemoteDispatch(err.to_string())),
        };
        results.push((target, outcome));
    }
    results
}
