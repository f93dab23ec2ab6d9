//! Admission gate bounding concurrent start invocations

use sandboxlet_core::{RuntimeError, RuntimeResult};
use std::sync::Arc;
use tokio::sync::{OwnedSemaphorePermit, Semaphore};
use tracing::debug;

/// Fair counting gate
///
/// Waiters are served in arrival order. A permit is returned to the gate
/// when the [`OwnedSemaphorePermit`] is dropped.
#[derive(Debug, Clone)]
pub struct AdmissionGate {
    semaphore: Arc<Semaphore>,
    capacity: usize,
}

impl AdmissionGate {
    /// Create a gate; `None` means effectively unbounded
    pub fn new(capacity: Option<usize>) -> Self {
        let capacity = capacity
            .unwrap_or(Semaphore::MAX_PERMITS)
            .min(Semaphore::MAX_PERMITS);
        Self {
            semaphore: Arc::new(Semaphore::new(capacity)),
            capacity,
        }
    }

    /// Wait for a permit
    pub async fn acquire(&self) -> RuntimeResult<OwnedSemaphorePermit> {
        let permit = self
            .semaphore
            .clone()
            .acquire_owned()
            .await
            .map_err(|e| RuntimeError::Internal(format!("admission gate closed: {}", e)))?;
        debug!(available = self.available(), "Admission permit acquired");
        Ok(permit)
    }

    /// Permits not currently held
    pub fn available(&self) -> usize {
        self.semaphore.available_permits()
    }

    /// Permits the gate was created with
    pub(crate) fn capacity(&self) -> usize {
        self.capacity
    }
}
