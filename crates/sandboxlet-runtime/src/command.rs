//! Command execution wrapper
//!
//! Every runtime invocation goes through [`CommandRunner::execute`], which
//! applies the timeout, traces the outcome and counts timeouts per command.

use sandboxlet_core::{RuntimeCommand, RuntimeError, RuntimeResult};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, warn};

use crate::metrics::MetricsSink;
use crate::traits::{CommandExecutor, CommandLine, ExecError};

/// Runs commands against a resolved runtime binary
#[derive(Clone)]
pub struct CommandRunner {
    binary: PathBuf,
    executor: Arc<dyn CommandExecutor>,
    metrics: Arc<dyn MetricsSink>,
}

impl CommandRunner {
    pub fn new(
        binary: PathBuf,
        executor: Arc<dyn CommandExecutor>,
        metrics: Arc<dyn MetricsSink>,
    ) -> Self {
        Self {
            binary,
            executor,
            metrics,
        }
    }

    /// Path of the runtime binary
    pub fn binary(&self) -> &Path {
        &self.binary
    }

    /// Run `args` against the runtime binary, bounded by `timeout`
    pub async fn execute(
        &self,
        command: RuntimeCommand,
        args: Vec<String>,
        timeout: Duration,
    ) -> RuntimeResult<String> {
        let line = CommandLine::new(self.binary.clone(), args);
        let started = Instant::now();
        let result = self.executor.invoke(&line, timeout).await;
        let elapsed_ms = started.elapsed().as_millis() as u64;

        match result {
            Ok(stdout) => {
                debug!(
                    command = %command,
                    cmdline = %line,
                    elapsed_ms = elapsed_ms,
                    "Runtime command succeeded"
                );
                Ok(stdout)
            }
            Err(ExecError::Timeout(timeout)) => {
                warn!(
                    command = %command,
                    cmdline = %line,
                    timeout_ms = timeout.as_millis() as u64,
                    "Runtime command timed out"
                );
                self.metrics.record_timeout(command);
                Err(RuntimeError::Timeout { command, timeout })
            }
            Err(ExecError::Failed { exit_code, stderr }) => {
                warn!(
                    command = %command,
                    cmdline = %line,
                    exit_code = ?exit_code,
                    stderr = %stderr,
                    elapsed_ms = elapsed_ms,
                    "Runtime command failed"
                );
                Err(RuntimeError::CommandFailed {
                    command,
                    exit_code,
                    stderr,
                })
            }
            Err(ExecError::Spawn(message)) => {
                warn!(
                    command = %command,
                    cmdline = %line,
                    error = %message,
                    "Runtime command could not be run"
                );
                Err(RuntimeError::Spawn { command, message })
            }
        }
    }
}
