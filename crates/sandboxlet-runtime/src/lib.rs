//! sandboxlet-runtime: Container runtime client
//!
//! This crate drives an external container runtime CLI as subprocesses:
//! - Binary resolution and the startup version probe
//! - A single command wrapper with per-command timeouts and timeout metrics
//! - A fair admission gate bounding concurrent starts
//! - Deduplication of concurrent image pulls

pub mod binary;
pub mod client;
pub mod command;
pub mod gate;
pub mod metrics;
pub mod process;
pub mod pull;
pub mod traits;

#[cfg(test)]
mod fake;

pub use client::ContainerRuntimeClient;
pub use command::CommandRunner;
pub use gate::AdmissionGate;
pub use metrics::{MetricsSink, TimeoutCounters};
pub use process::ProcessExecutor;
pub use pull::PullDeduplicator;
pub use traits::{CommandExecutor, CommandLine, ExecError};
