//! Timeout metrics for runtime commands

use sandboxlet_core::RuntimeCommand;
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicU64, Ordering};
use tracing::warn;

/// Name under which timeout counts are reported
pub const TIMEOUT_METRIC: &str = "runtime_command_timeouts";

/// Sink for operational metrics emitted by the command wrapper
pub trait MetricsSink: Send + Sync {
    /// Record one timed-out invocation of `command`
    fn record_timeout(&self, command: RuntimeCommand);
}

/// In-process timeout counters, one per command
#[derive(Debug, Default)]
pub struct TimeoutCounters {
    counts: [AtomicU64; RuntimeCommand::ALL.len()],
}

impl TimeoutCounters {
    pub fn new() -> Self {
        Self::default()
    }

    /// Current count for one command
    pub fn get(&self, command: RuntimeCommand) -> u64 {
        self.counts[command.index()].load(Ordering::Relaxed)
    }

    /// Sum over all commands
    pub fn total(&self) -> u64 {
        RuntimeCommand::ALL.iter().map(|c| self.get(*c)).sum()
    }

    /// Counts keyed by command name
    pub fn snapshot(&self) -> BTreeMap<&'static str, u64> {
        RuntimeCommand::ALL
            .iter()
            .map(|c| (c.name(), self.get(*c)))
            .collect()
    }
}

impl MetricsSink for TimeoutCounters {
    fn record_timeout(&self, command: RuntimeCommand) {
        let count = self.counts[command.index()].fetch_add(1, Ordering::Relaxed) + 1;
        warn!(
            metric = TIMEOUT_METRIC,
            command = %command,
            count = count,
            "Runtime command timeout counted"
        );
    }
}
