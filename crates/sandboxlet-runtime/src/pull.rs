//! Deduplication of concurrent image pulls
//!
//! At most one pull per image is in flight. Callers asking for an image
//! that is already being pulled attach to the running operation and get
//! its result. The entry is dropped as soon as the pull settles, so the
//! next request for the same tag starts a fresh pull.

use futures::future::{BoxFuture, FutureExt, Shared};
use sandboxlet_core::{RuntimeError, RuntimeResult};
use std::collections::HashMap;
use std::future::Future;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{debug, info};

type SharedPull = Shared<BoxFuture<'static, RuntimeResult<()>>>;

struct InFlightPull {
    /// Distinguishes this entry from later pulls of the same image
    generation: u64,
    pull: SharedPull,
}

/// Registry of in-flight pulls keyed by image reference
#[derive(Clone, Default)]
pub struct PullDeduplicator {
    inflight: Arc<Mutex<HashMap<String, InFlightPull>>>,
    next_generation: Arc<AtomicU64>,
}

impl PullDeduplicator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Pull `image`, starting `start()` only if no pull for it is running
    ///
    /// The started operation runs on its own task, so it settles and leaves
    /// the registry even if every caller stops waiting.
    pub async fn pull<F, Fut>(&self, image: &str, start: F) -> RuntimeResult<()>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = RuntimeResult<()>> + Send + 'static,
    {
        let shared = {
            let mut inflight = self.inflight.lock().await;
            match inflight.get(image) {
                Some(entry) => {
                    debug!(image = image, "Attaching to in-flight pull");
                    entry.pull.clone()
                }
                None => {
                    let generation = self.next_generation.fetch_add(1, Ordering::Relaxed);
                    let shared = self.spawn_pull(image.to_string(), generation, start());
                    inflight.insert(
                        image.to_string(),
                        InFlightPull {
                            generation,
                            pull: shared.clone(),
                        },
                    );
                    info!(image = image, "Started image pull");
                    shared
                }
            }
        };

        shared.await
    }

    /// Number of images currently being pulled
    pub(crate) async fn in_flight(&self) -> usize {
        self.inflight.lock().await.len()
    }

    /// Whether a pull for `image` is currently registered
    #[cfg(test)]
    async fn is_pulling(&self, image: &str) -> bool {
        self.inflight.lock().await.contains_key(image)
    }

    fn spawn_pull<Fut>(&self, image: String, generation: u64, operation: Fut) -> SharedPull
    where
        Fut: Future<Output = RuntimeResult<()>> + Send + 'static,
    {
        let registry = self.inflight.clone();
        let handle = tokio::spawn(async move {
            let result = operation.await;

            // The registry lock is held by the inserting caller until the
            // entry exists, so this never runs ahead of the insert.
            let mut inflight = registry.lock().await;
            if inflight
                .get(&image)
                .is_some_and(|entry| entry.generation == generation)
            {
                inflight.remove(&image);
            }
            debug!(image = %image, ok = result.is_ok(), "Image pull settled");
            result
        });

        handle
            .map(|joined| {
                joined.unwrap_or_else(|e| {
                    Err(RuntimeError::Internal(format!("pull task failed: {}", e)))
                })
            })
            .boxed()
            .shared()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sandboxlet_core::RuntimeCommand;
    use std::sync::atomic::AtomicUsize;
    use std::time::Duration;

    fn counting_pull(
        counter: &Arc<AtomicUsize>,
        result: RuntimeResult<()>,
    ) -> impl FnOnce() -> BoxFuture<'static, RuntimeResult<()>> {
        let counter = counter.clone();
        move || {
            async move {
                counter.fetch_add(1, Ordering::SeqCst);
                tokio::time::sleep(Duration::from_millis(50)).await;
                result
            }
            .boxed()
        }
    }

    #[tokio::test]
    async fn test_concurrent_pulls_share_one_operation() {
        let dedup = PullDeduplicator::new();
        let started = Arc::new(AtomicUsize::new(0));

        let results = futures::future::join_all(
            (0..10).map(|_| dedup.pull("alpine:3", counting_pull(&started, Ok(())))),
        )
        .await;

        assert_eq!(started.load(Ordering::SeqCst), 1);
        assert!(results.iter().all(Result::is_ok));
        assert_eq!(dedup.in_flight().await, 0);
    }

    #[tokio::test]
    async fn test_failure_is_shared_and_entry_removed() {
        let dedup = PullDeduplicator::new();
        let started = Arc::new(AtomicUsize::new(0));
        let failure = RuntimeError::CommandFailed {
            command: RuntimeCommand::Pull,
            exit_code: Some(1),
            stderr: "manifest unknown".to_string(),
        };

        let results = futures::future::join_all(
            (0..4).map(|_| dedup.pull("missing:1", counting_pull(&started, Err(failure.clone())))),
        )
        .await;

        assert_eq!(started.load(Ordering::SeqCst), 1);
        for result in results {
            assert!(matches!(
                result,
                Err(RuntimeError::CommandFailed { ref stderr, .. }) if stderr == "manifest unknown"
            ));
        }
        assert!(!dedup.is_pulling("missing:1").await);

        dedup
            .pull("missing:1", counting_pull(&started, Ok(())))
            .await
            .unwrap();
        assert_eq!(started.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_pull_settles_when_callers_give_up() {
        let dedup = PullDeduplicator::new();
        let started = Arc::new(AtomicUsize::new(0));

        let gave_up = tokio::time::timeout(
            Duration::from_millis(5),
            dedup.pull("busybox", counting_pull(&started, Ok(()))),
        )
        .await;
        assert!(gave_up.is_err());
        assert!(dedup.is_pulling("busybox").await);

        tokio::time::timeout(Duration::from_secs(5), async {
            while dedup.is_pulling("busybox").await {
                tokio::time::sleep(Duration::from_millis(5)).await;
            }
        })
        .await
        .unwrap();
        assert_eq!(started.load(Ordering::SeqCst), 1);
    }
}
