//! Background store writes that never delay the response.

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use tokio::sync::Notify;

use stowaway_core::{KeyValueStore, RequestKey, ResponseSnapshot};

/// Spawns store writes onto the runtime and tracks how many are pending.
#[derive(Debug, Default)]
pub struct WriteTracker {
    inner: Arc<Inner>,
}

#[derive(Debug, Default)]
struct Inner {
    pending: AtomicUsize,
    idle: Notify,
}

/// Decrements the pending count when the write task ends, even on panic.
struct PendingGuard(Arc<Inner>);

impl Drop for PendingGuard {
    fn drop(&mut self) {
        if self.0.pending.fetch_sub(1, Ordering::AcqRel) == 1 {
            self.0.idle.notify_waiters();
        }
    }
}

impl WriteTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Write `response` under `key` in the background. Failures are logged.
    pub fn spawn_put(&self, store: Arc<dyn KeyValueStore>, key: RequestKey, response: ResponseSnapshot) {
        self.inner.pending.fetch_add(1, Ordering::AcqRel);
        let guard = PendingGuard(self.inner.clone());

        tokio::spawn(async move {
            let _guard = guard;
            match store.put(&key, &response).await {
                Ok(()) => tracing::debug!(store = store.name(), %key, "stored"),
                Err(e) => tracing::warn!(store = store.name(), %key, error = %e, "background store write failed"),
            }
        });
    }

    pub fn pending(&self) -> usize {
        self.inner.pending.load(Ordering::Acquire)
    }

    /// Wait until every write spawned so far has finished.
    pub async fn flush(&self) {
        loop {
            let notified = self.inner.idle.notified();
            if self.pending() == 0 {
                return;
            }
            notified.await;
        }
    }
}
