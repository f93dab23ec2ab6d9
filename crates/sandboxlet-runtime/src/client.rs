//! Container runtime client
//!
//! Drives the runtime CLI to start, inspect, list, pull and stop sandboxed
//! containers. Build one client at startup with [`ContainerRuntimeClient::connect`]
//! and share it; it holds no per-container state.

use sandboxlet_core::{
    ContainerAddress, ContainerId, RuntimeCommand, RuntimeConfig, RuntimeError, RuntimeResult,
};
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tokio::sync::Notify;
use tracing::{debug, error, info};

use crate::binary::resolve_binary;
use crate::command::CommandRunner;
use crate::gate::AdmissionGate;
use crate::metrics::{MetricsSink, TimeoutCounters};
use crate::process::ProcessExecutor;
use crate::pull::PullDeduplicator;
use crate::traits::CommandExecutor;

/// Output the address probe prints when no address has been assigned
pub const NO_VALUE_SENTINEL: &str = "<no value>";

/// Command run inside a container to print its address
const ADDRESS_PROBE: [&str; 2] = ["hostname", "-i"];

/// Count of detached starts that have not settled yet
#[derive(Default)]
struct PendingStarts {
    count: AtomicUsize,
    settled: Notify,
}

/// Decrements the pending count when the start task ends, even on panic
struct PendingStartGuard(Arc<PendingStarts>);

impl PendingStartGuard {
    fn new(pending: Arc<PendingStarts>) -> Self {
        pending.count.fetch_add(1, Ordering::SeqCst);
        Self(pending)
    }
}

impl Drop for PendingStartGuard {
    fn drop(&mut self) {
        if self.0.count.fetch_sub(1, Ordering::SeqCst) == 1 {
            self.0.settled.notify_waiters();
        }
    }
}

/// Client for the external container runtime
pub struct ContainerRuntimeClient {
    config: RuntimeConfig,
    runner: CommandRunner,
    gate: AdmissionGate,
    pulls: PullDeduplicator,
    pending_starts: Arc<PendingStarts>,
    version: String,
}

impl ContainerRuntimeClient {
    /// Resolve the runtime binary and probe it, using real processes
    pub async fn connect(config: RuntimeConfig) -> RuntimeResult<Self> {
        Self::connect_with(
            config,
            Arc::new(ProcessExecutor::new()),
            Arc::new(TimeoutCounters::new()),
        )
        .await
    }

    /// Resolve the runtime binary and probe it with the given executor
    ///
    /// Fails if no candidate binary is executable or the version probe does
    /// not succeed within twice the configured version timeout.
    pub async fn connect_with(
        config: RuntimeConfig,
        executor: Arc<dyn CommandExecutor>,
        metrics: Arc<dyn MetricsSink>,
    ) -> RuntimeResult<Self> {
        config.validate()?;
        let binary = resolve_binary(&config.binary_candidates)?;
        let runner = CommandRunner::new(binary, executor, metrics);

        let probe_timeout = config
            .timeout_for(RuntimeCommand::Version)
            .saturating_mul(2);
        let version = runner
            .execute(
                RuntimeCommand::Version,
                vec!["--version".to_string()],
                probe_timeout,
            )
            .await
            .map_err(|e| RuntimeError::VersionProbe {
                source: Box::new(e),
            })?
            .trim()
            .to_string();

        info!(
            binary = %runner.binary().display(),
            version = %version,
            max_parallel_runs = config.max_parallel_runs,
            "Container runtime client ready"
        );

        Ok(Self {
            gate: AdmissionGate::new(config.run_parallelism()),
            pulls: PullDeduplicator::new(),
            pending_starts: Arc::new(PendingStarts::default()),
            config,
            runner,
            version,
        })
    }

    /// Version string reported by the runtime at startup
    pub fn version(&self) -> &str {
        &self.version
    }

    /// Path of the resolved runtime binary
    pub fn binary(&self) -> &Path {
        self.runner.binary()
    }

    /// Start permits not currently held
    pub fn available_run_permits(&self) -> usize {
        self.gate.available()
    }

    /// Upper bound on starts in flight at once
    pub fn run_capacity(&self) -> usize {
        self.gate.capacity()
    }

    /// Images with a pull currently in flight
    pub async fn in_flight_pulls(&self) -> usize {
        self.pulls.in_flight().await
    }

    /// Starts issued by `run` that have not settled yet
    pub fn pending_runs(&self) -> usize {
        self.pending_starts.count.load(Ordering::SeqCst)
    }

    /// Wait until every start issued by `run` so far has settled
    ///
    /// Does not report whether those starts succeeded.
    pub async fn wait_for_pending_runs(&self) {
        loop {
            let settled = self.pending_starts.settled.notified();
            if self.pending_runs() == 0 {
                return;
            }
            settled.await;
        }
    }

    /// Start a detached container from `image`, passing `args` to its process
    ///
    /// Waits for an admission permit, then returns the new session id
    /// without waiting for the start command to finish. The start keeps
    /// the permit until it settles; its outcome is only logged, so callers
    /// learn whether the container came up through `ps` or
    /// `inspect_ip_address`.
    pub async fn run(&self, image: &str, args: &[String]) -> RuntimeResult<ContainerId> {
        validate_image(image)?;
        let permit = self.gate.acquire().await?;

        let id = ContainerId::session();
        let mut cmd_args = vec![
            "run".to_string(),
            "--detach".to_string(),
            format!("--network={}", self.config.network),
            "--overlay".to_string(),
            "--name".to_string(),
            id.to_string(),
            image.to_string(),
        ];
        cmd_args.extend(args.iter().cloned());

        info!(container_id = %id, image = image, "Starting container");

        let runner = self.runner.clone();
        let timeout = self.config.timeout_for(RuntimeCommand::Run);
        let started = id.clone();
        let pending = PendingStartGuard::new(self.pending_starts.clone());
        tokio::spawn(async move {
            let _pending = pending;
            let _permit = permit;
            match runner.execute(RuntimeCommand::Run, cmd_args, timeout).await {
                Ok(_) => info!(container_id = %started, "Container started"),
                Err(e) => error!(container_id = %started, error = %e, "Container start failed"),
            }
        });

        Ok(id)
    }

    /// Network address assigned to a container
    ///
    /// Returns [`RuntimeError::AddressNotAvailable`] while the runtime has
    /// not assigned one yet; callers should retry later.
    pub async fn inspect_ip_address(&self, id: &ContainerId) -> RuntimeResult<ContainerAddress> {
        let mut args = vec!["exec".to_string(), id.to_string(), "--".to_string()];
        args.extend(ADDRESS_PROBE.iter().map(|s| s.to_string()));

        let output = self.execute(RuntimeCommand::Inspect, args).await?;
        if output.trim() == NO_VALUE_SENTINEL {
            return Err(RuntimeError::AddressNotAvailable(id.clone()));
        }

        ContainerAddress::from_output(&output).ok_or(RuntimeError::UnexpectedOutput {
            command: RuntimeCommand::Inspect,
            output,
        })
    }

    /// Suspend a container
    ///
    /// Runtimes without pause support (`supports_pause = false`) treat this
    /// as a successful no-op.
    pub async fn pause(&self, id: &ContainerId) -> RuntimeResult<()> {
        if !self.config.supports_pause {
            debug!(container_id = %id, "Runtime has no pause support; skipping pause");
            return Ok(());
        }
        self.execute(RuntimeCommand::Pause, vec!["pause".to_string(), id.to_string()])
            .await
            .map(|_| ())
    }

    /// Resume a paused container
    ///
    /// A successful no-op when the runtime has no pause support.
    pub async fn unpause(&self, id: &ContainerId) -> RuntimeResult<()> {
        if !self.config.supports_pause {
            debug!(container_id = %id, "Runtime has no pause support; skipping unpause");
            return Ok(());
        }
        self.execute(RuntimeCommand::Unpause, vec!["resume".to_string(), id.to_string()])
            .await
            .map(|_| ())
    }

    /// Stop and tear down a container
    pub async fn rm(&self, id: &ContainerId) -> RuntimeResult<()> {
        self.execute(RuntimeCommand::Remove, vec!["stop".to_string(), id.to_string()])
            .await?;
        info!(container_id = %id, "Container removed");
        Ok(())
    }

    /// List running containers
    ///
    /// The runtime's list command has no filtering, so `filters` and `all`
    /// are accepted for interface compatibility but do not change the result.
    pub async fn ps(
        &self,
        filters: &[(String, String)],
        all: bool,
    ) -> RuntimeResult<Vec<ContainerId>> {
        if !filters.is_empty() || all {
            debug!(
                filters = filters.len(),
                all = all,
                "Runtime list has no filter support; returning all running containers"
            );
        }

        let output = self
            .execute(
                RuntimeCommand::List,
                vec!["list".to_string(), "--quiet".to_string()],
            )
            .await?;
        parse_container_ids(&output)
    }

    /// Pull an image, sharing the operation with concurrent pulls of the same image
    pub async fn pull(&self, image: &str) -> RuntimeResult<()> {
        validate_image(image)?;

        let runner = self.runner.clone();
        let timeout = self.config.timeout_for(RuntimeCommand::Pull);
        let args = vec!["pull".to_string(), image.to_string()];
        self.pulls
            .pull(image, move || async move {
                runner
                    .execute(RuntimeCommand::Pull, args, timeout)
                    .await
                    .map(|_| ())
            })
            .await
    }

    /// Whether the container was killed for exceeding its memory limit
    ///
    /// The runtime exposes no OOM status, so this always reports `false`.
    /// A `false` here does not rule out an OOM kill.
    pub async fn is_oom_killed(&self, id: &ContainerId) -> RuntimeResult<bool> {
        debug!(container_id = %id, "Runtime has no OOM introspection; reporting false");
        Ok(false)
    }

    async fn execute(&self, command: RuntimeCommand, args: Vec<String>) -> RuntimeResult<String> {
        self.runner
            .execute(command, args, self.config.timeout_for(command))
            .await
    }
}

fn validate_image(image: &str) -> RuntimeResult<()> {
    if image.trim().is_empty() || image.chars().any(char::is_whitespace) {
        return Err(RuntimeError::InvalidImage(image.to_string()));
    }
    Ok(())
}

/// Parse one container id per line, skipping blank lines
fn parse_container_ids(output: &str) -> RuntimeResult<Vec<ContainerId>> {
    output
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .map(|line| {
            ContainerId::parse(line).map_err(|_| RuntimeError::UnexpectedOutput {
                command: RuntimeCommand::List,
                output: line.to_string(),
            })
        })
        .collect()
}
