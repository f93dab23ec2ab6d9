//! Command execution trait definitions

use async_trait::async_trait;
use std::fmt;
use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

/// A fully built invocation of the runtime binary
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandLine {
    pub program: PathBuf,
    pub args: Vec<String>,
}

impl CommandLine {
    pub fn new(program: impl Into<PathBuf>, args: Vec<String>) -> Self {
        Self {
            program: program.into(),
            args,
        }
    }

    /// First argument, i.e. the runtime subcommand or flag
    pub fn subcommand(&self) -> Option<&str> {
        self.args.first().map(String::as_str)
    }
}

impl fmt::Display for CommandLine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.program.display())?;
        for arg in &self.args {
            write!(f, " {}", arg)?;
        }
        Ok(())
    }
}

/// Outcome of a failed invocation, independent of which command it was
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ExecError {
    /// The process did not finish within its bound and was killed
    #[error("timed out after {}ms", .0.as_millis())]
    Timeout(Duration),

    /// The process exited unsuccessfully
    #[error("exit code {exit_code:?}: {stderr}")]
    Failed {
        exit_code: Option<i32>,
        stderr: String,
    },

    /// The process could not be started or its output not collected
    #[error("spawn failed: {0}")]
    Spawn(String),
}

/// Capability to run an external command with a timeout and captured output
#[async_trait]
pub trait CommandExecutor: Send + Sync {
    /// Run the command, returning its standard output on success
    async fn invoke(&self, command: &CommandLine, timeout: Duration) -> Result<String, ExecError>;

    /// Get the executor name
    fn name(&self) -> &'static str;
}
