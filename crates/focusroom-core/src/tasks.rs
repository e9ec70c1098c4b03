//! Registry for fire-and-forget tasks.
//!
//! Background sync calls and notifications are spawned here so teardown
//! (and tests) can wait for whatever is still in flight.

// Only push/retain/take happen under the lock; flush awaits outside it.
use std::sync::{Arc, Mutex, PoisonError};

use tokio::task::JoinHandle;
use tracing::{debug, warn};

#[derive(Clone, Default)]
pub struct BackgroundTasks {
    handles: Arc<Mutex<Vec<JoinHandle<()>>>>,
}

impl BackgroundTasks {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Spawn `future` on the current runtime and track its handle.
    ///
    /// Outside a tokio runtime the future is dropped with a debug log;
    /// background work is best-effort by contract.
    pub fn spawn<F>(&self, future: F)
    where
        F: std::future::Future<Output = ()> + Send + 'static,
    {
        let Ok(runtime) = tokio::runtime::Handle::try_current() else {
            debug!("no tokio runtime, dropping background task");
            return;
        };
        let handle = runtime.spawn(future);

        let mut guard = self.handles.lock().unwrap_or_else(PoisonError::into_inner);
        guard.retain(|h| !h.is_finished());
        guard.push(handle);
    }

    /// Number of tasks that have not finished yet.
    pub fn pending(&self) -> usize {
        let mut guard = self.handles.lock().unwrap_or_else(PoisonError::into_inner);
        guard.retain(|h| !h.is_finished());
        guard.len()
    }

    /// Wait until every task spawned so far has completed, including tasks
    /// spawned by those tasks.
    pub async fn flush(&self) {
        loop {
            let handles: Vec<_> = std::mem::take(
                &mut *self.handles.lock().unwrap_or_else(PoisonError::into_inner),
            );
            if handles.is_empty() {
                return;
            }
            for (i, handle) in handles.into_iter().enumerate() {
                if let Err(e) = handle.await {
                    warn!(task = i, error = %e, "background task panicked");
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[tokio::test]
    async fn flush_waits_for_spawned_tasks() {
        let tasks = BackgroundTasks::new();
        let counter = Arc::new(AtomicUsize::new(0));
        for _ in 0..3 {
            let counter = counter.clone();
            tasks.spawn(async move {
                tokio::task::yield_now().await;
                counter.fetch_add(1, Ordering::SeqCst);
            });
        }
        tasks.flush().await;
        assert_eq!(counter.load(Ordering::SeqCst), 3);
        assert_eq!(tasks.pending(), 0);
    }

    #[test]
    fn spawn_without_runtime_is_a_no_op() {
        let tasks = BackgroundTasks::new();
        tasks.spawn(async {});
        assert_eq!(tasks.pending(), 0);
    }
}
