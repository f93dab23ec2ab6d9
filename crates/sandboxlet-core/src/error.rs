//! Error types for sandboxlet

use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

use crate::container::{ContainerId, RuntimeCommand};

/// Main error type for sandboxlet
///
/// Errors are `Clone` so that every caller attached to a shared pull
/// observes the same outcome.
#[derive(Error, Debug, Clone)]
pub enum RuntimeError {
    /// No candidate path held an executable runtime binary
    #[error("Runtime binary not found; tried: {}", display_paths(.candidates))]
    BinaryNotFound { candidates: Vec<PathBuf> },

    /// The startup version probe failed or timed out
    #[error("Runtime version probe failed: {source}")]
    VersionProbe {
        #[source]
        source: Box<RuntimeError>,
    },

    /// An invocation exceeded its configured bound
    #[error("Command '{command}' timed out after {}ms", .timeout.as_millis())]
    Timeout {
        command: RuntimeCommand,
        timeout: Duration,
    },

    /// The runtime exited with a failure status
    #[error("Command '{command}' failed (exit code {}): {stderr}", display_code(.exit_code))]
    CommandFailed {
        command: RuntimeCommand,
        exit_code: Option<i32>,
        stderr: String,
    },

    /// The runtime process could not be started
    #[error("Failed to spawn command '{command}': {message}")]
    Spawn {
        command: RuntimeCommand,
        message: String,
    },

    /// The runtime succeeded but printed something we cannot interpret
    #[error("Unexpected output from '{command}': {output:?}")]
    UnexpectedOutput {
        command: RuntimeCommand,
        output: String,
    },

    /// The container has no network address yet
    #[error("Address not yet available for container {0}")]
    AddressNotAvailable(ContainerId),

    /// Malformed container identifier
    #[error("Invalid container id: {0:?}")]
    InvalidContainerId(String),

    /// Malformed image reference
    #[error("Invalid image reference: {0:?}")]
    InvalidImage(String),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Internal error
    #[error("Internal error: {0}")]
    Internal(String),
}

/// Result type for sandboxlet operations
pub type RuntimeResult<T> = Result<T, RuntimeError>;

impl RuntimeError {
    /// Whether this error is a per-invocation timeout
    pub fn is_timeout(&self) -> bool {
        matches!(self, RuntimeError::Timeout { .. })
    }

    /// Whether a caller may reasonably retry the same operation later
    pub fn is_retriable(&self) -> bool {
        matches!(
            self,
            RuntimeError::Timeout { .. } | RuntimeError::AddressNotAvailable(_)
        )
    }

    /// The runtime command this error originated from, if any
    pub fn command(&self) -> Option<RuntimeCommand> {
        match self {
            RuntimeError::Timeout { command, .. }
            | RuntimeError::CommandFailed { command, .. }
            | RuntimeError::Spawn { command, .. }
            | RuntimeError::UnexpectedOutput { command, .. } => Some(*command),
            RuntimeError::AddressNotAvailable(_) => Some(RuntimeCommand::Inspect),
            RuntimeError::VersionProbe { source } => source.command(),
            _ => None,
        }
    }
}

fn display_paths(paths: &[PathBuf]) -> String {
    if paths.is_empty() {
        return "<none>".to_string();
    }
    paths
        .iter()
        .map(|p| p.display().to_string())
        .collect::<Vec<_>>()
        .join(", ")
}

fn display_code(code: &Option<i32>) -> String {
    match code {
        Some(code) => code.to_string(),
        None => "none".to_string(),
    }
}
