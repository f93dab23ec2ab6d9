//! Scripted command executor for tests

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;

use crate::traits::{CommandExecutor, CommandLine, ExecError};

/// Scripted result for a subcommand
#[derive(Debug, Clone)]
pub(crate) enum FakeResponse {
    Output(String),
    Fail(i32, String),
    Timeout,
}

/// Executor that answers by subcommand and records what it was asked to run
#[derive(Default)]
pub(crate) struct FakeExecutor {
    responses: Mutex<HashMap<String, FakeResponse>>,
    delays: Mutex<HashMap<String, Duration>>,
    calls: Mutex<Vec<CommandLine>>,
    in_flight: AtomicUsize,
    max_in_flight: AtomicUsize,
    completed: AtomicUsize,
}

impl FakeExecutor {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    /// Executor that already answers the startup version probe
    pub(crate) fn with_version() -> Self {
        let fake = Self::new();
        fake.respond("--version", FakeResponse::Output("runsc version 1.0\n".to_string()));
        fake
    }

    pub(crate) fn respond(&self, subcommand: &str, response: FakeResponse) {
        self.responses
            .lock()
            .unwrap()
            .insert(subcommand.to_string(), response);
    }

    pub(crate) fn delay(&self, subcommand: &str, delay: Duration) {
        self.delays
            .lock()
            .unwrap()
            .insert(subcommand.to_string(), delay);
    }

    pub(crate) fn calls(&self) -> Vec<CommandLine> {
        self.calls.lock().unwrap().clone()
    }

    /// Number of invocations of one subcommand
    pub(crate) fn count(&self, subcommand: &str) -> usize {
        self.calls
            .lock()
            .unwrap()
            .iter()
            .filter(|c| c.subcommand() == Some(subcommand))
            .count()
    }

    /// Highest number of invocations that were running at the same time
    pub(crate) fn max_in_flight(&self) -> usize {
        self.max_in_flight.load(Ordering::SeqCst)
    }

    /// Number of invocations that have settled
    pub(crate) fn completed(&self) -> usize {
        self.completed.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl CommandExecutor for FakeExecutor {
    async fn invoke(&self, command: &CommandLine, timeout: Duration) -> Result<String, ExecError> {
        let key = command.subcommand().unwrap_or_default().to_string();
        self.calls.lock().unwrap().push(command.clone());

        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(now, Ordering::SeqCst);

        let delay = self.delays.lock().unwrap().get(&key).copied();
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }

        let response = self
            .responses
            .lock()
            .unwrap()
            .get(&key)
            .cloned()
            .unwrap_or(FakeResponse::Output(String::new()));

        self.in_flight.fetch_sub(1, Ordering::SeqCst);
        self.completed.fetch_add(1, Ordering::SeqCst);

        match response {
            FakeResponse::Output(out) => Ok(out),
            FakeResponse::Fail(code, stderr) => Err(ExecError::Failed {
                exit_code: Some(code),
                stderr,
            }),
            FakeResponse::Timeout => Err(ExecError::Timeout(timeout)),
        }
    }

    fn name(&self) -> &'static str {
        "fake"
    }
}
