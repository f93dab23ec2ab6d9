//! Container identifier, address and command type definitions

use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

use crate::error::{RuntimeError, RuntimeResult};

/// Prefix of identifiers minted locally by `run`
pub const SESSION_PREFIX: &str = "sandboxlet-";

/// Length of a runtime-assigned container identifier
const RUNTIME_ID_LEN: usize = 64;

/// Length of the hex part of a session identifier (a simple-format UUID)
const SESSION_HEX_LEN: usize = 32;

fn is_lower_hex(s: &str) -> bool {
    s.bytes().all(|b| b.is_ascii_digit() || (b'a'..=b'f').contains(&b))
}

/// Identifier of a running container instance
///
/// Either a 64 character lowercase hex string assigned by the runtime, or a
/// session token minted by this client when it starts an instance itself.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct ContainerId(String);

impl ContainerId {
    /// Parse and validate an identifier
    pub fn parse(raw: &str) -> RuntimeResult<Self> {
        if Self::is_runtime_assigned_str(raw) || Self::is_session_str(raw) {
            Ok(Self(raw.to_string()))
        } else {
            Err(RuntimeError::InvalidContainerId(raw.to_string()))
        }
    }

    /// Mint a new locally unique session identifier
    pub fn session() -> Self {
        Self(format!("{}{}", SESSION_PREFIX, Uuid::new_v4().simple()))
    }

    /// Whether this identifier came from the runtime's own id scheme
    pub fn is_runtime_assigned(&self) -> bool {
        Self::is_runtime_assigned_str(&self.0)
    }

    /// Whether this identifier was minted by `ContainerId::session`
    pub fn is_session(&self) -> bool {
        Self::is_session_str(&self.0)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    fn is_runtime_assigned_str(s: &str) -> bool {
        s.len() == RUNTIME_ID_LEN && is_lower_hex(s)
    }

    fn is_session_str(s: &str) -> bool {
        s.strip_prefix(SESSION_PREFIX)
            .is_some_and(|hex| hex.len() == SESSION_HEX_LEN && is_lower_hex(hex))
    }
}

impl fmt::Display for ContainerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl TryFrom<String> for ContainerId {
    type Error = RuntimeError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<ContainerId> for String {
    fn from(id: ContainerId) -> Self {
        id.0
    }
}

/// Network address reported for a container
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct ContainerAddress(String);

impl ContainerAddress {
    /// Build an address from raw probe output, stripping whitespace
    ///
    /// Returns `None` when nothing is left after trimming.
    pub fn from_output(raw: &str) -> Option<Self> {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            None
        } else {
            Some(Self(trimmed.to_string()))
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ContainerAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Commands issued against the runtime binary
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RuntimeCommand {
    Run,
    Remove,
    Pull,
    List,
    Pause,
    Unpause,
    Version,
    Inspect,
}

impl RuntimeCommand {
    /// All commands, in a stable order
    pub const ALL: [RuntimeCommand; 8] = [
        RuntimeCommand::Run,
        RuntimeCommand::Remove,
        RuntimeCommand::Pull,
        RuntimeCommand::List,
        RuntimeCommand::Pause,
        RuntimeCommand::Unpause,
        RuntimeCommand::Version,
        RuntimeCommand::Inspect,
    ];

    /// Name used to tag traces and metrics
    pub fn name(self) -> &'static str {
        match self {
            RuntimeCommand::Run => "run",
            RuntimeCommand::Remove => "rm",
            RuntimeCommand::Pull => "pull",
            RuntimeCommand::List => "ps",
            RuntimeCommand::Pause => "pause",
            RuntimeCommand::Unpause => "unpause",
            RuntimeCommand::Version => "version",
            RuntimeCommand::Inspect => "inspect",
        }
    }

    /// Position of this command in `ALL`
    pub fn index(self) -> usize {
        self as usize
    }
}

impl fmt::Display for RuntimeCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}
