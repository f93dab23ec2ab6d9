//! Subprocess-based command executor
//!
//! Runs runtime commands as child processes with captured output.
//! Children are spawned with `kill_on_drop`, so a command abandoned on
//! timeout is killed rather than left running.

use async_trait::async_trait;
use std::process::Stdio;
use std::time::Duration;
use tokio::process::Command;
use tracing::{debug, warn};

use crate::traits::{CommandExecutor, CommandLine, ExecError};

/// Executor that spawns real OS processes
#[derive(Debug, Clone, Default)]
pub struct ProcessExecutor;

impl ProcessExecutor {
    /// Create a new process executor
    pub fn new() -> Self {
        Self
    }

    /// Build the command for an invocation
    fn build_command(&self, command: &CommandLine) -> Command {
        let mut cmd = Command::new(&command.program);
        cmd.args(&command.args);

        // Configure process I/O
        cmd.stdin(Stdio::null());
        cmd.stdout(Stdio::piped());
        cmd.stderr(Stdio::piped());
        cmd.kill_on_drop(true);

        cmd
    }
}

#[async_trait]
impl CommandExecutor for ProcessExecutor {
    async fn invoke(&self, command: &CommandLine, timeout: Duration) -> Result<String, ExecError> {
        let child = self.build_command(command).spawn().map_err(|e| {
            warn!(command = %command, error = %e, "Failed to spawn runtime process");
            ExecError::Spawn(e.to_string())
        })?;

        debug!(command = %command, pid = child.id().unwrap_or(0), "Runtime process spawned");

        // Dropping the wait future on timeout drops the child, which kills it.
        let output = match tokio::time::timeout(timeout, child.wait_with_output()).await {
            Ok(Ok(output)) => output,
            Ok(Err(e)) => return Err(ExecError::Spawn(e.to_string())),
            Err(_) => return Err(ExecError::Timeout(timeout)),
        };

        if output.status.success() {
            Ok(String::from_utf8_lossy(&output.stdout).into_owned())
        } else {
            Err(ExecError::Failed {
                exit_code: output.status.code(),
                stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            })
        }
    }

    fn name(&self) -> &'static str {
        "process"
    }
}
