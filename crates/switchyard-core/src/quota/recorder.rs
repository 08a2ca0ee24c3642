//! Asynchronous usage recording
//!
//! Recording is fire-and-forget: the request path pushes records into a
//! bounded queue and moves on. A background worker drains the queue into the
//! store. When the queue is full the record is dropped and counted; a slow
//! ledger must never exert backpressure on dispatch.

use super::usage::{QuotaUsageRecord, UsageStore};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

/// Default queue capacity
pub const DEFAULT_QUEUE_CAPACITY: usize = 1024;

/// Handle to the background usage recorder
pub struct UsageRecorder {
    tx: mpsc::Sender<QuotaUsageRecord>,
    dropped: Arc<AtomicU64>,
    cancel: CancellationToken,
    worker: parking_lot::Mutex<Option<JoinHandle<()>>>,
}

impl UsageRecorder {
    /// Spawn a recorder draining into the given store
    pub fn spawn(store: Arc<dyn UsageStore>, capacity: usize) -> Self {
        let (tx, mut rx) = mpsc::channel::<QuotaUsageRecord>(capacity.max(1));
        let cancel = CancellationToken::new();
        let worker_cancel = cancel.clone();

        let worker = tokio::spawn(async move {
            loop {
                tokio::select! {
                    _ = worker_cancel.cancelled() => {
                        // Drain what is already queued, then stop.
                        while let Ok(record) = rx.try_recv() {
                            persist(store.as_ref(), record).await;
                        }
                        break;
                    }
                    maybe_record = rx.recv() => match maybe_record {
                        Some(record) => persist(store.as_ref(), record).await,
                        None => break,
                    },
                }
            }
        });

        Self {
            tx,
            dropped: Arc::new(AtomicU64::new(0)),
            cancel,
            worker: parking_lot::Mutex::new(Some(worker)),
        }
    }

    /// Queue a record for persistence
    ///
    /// Never blocks and never fails the caller: on overload the record is
    /// dropped, logged, and counted.
    pub fn enqueue(&self, record: QuotaUsageRecord) {
        if self.cancel.is_cancelled() {
            self.dropped.fetch_add(1, Ordering::Relaxed);
            tracing::warn!(
                user_id = %record.user_id,
                "usage record dropped; recorder is shut down"
            );
            return;
        }
        match self.tx.try_send(record) {
            Ok(()) => {}
            Err(mpsc::error::TrySendError::Full(record)) => {
                self.dropped.fetch_add(1, Ordering::Relaxed);
                tracing::warn!(
                    user_id = %record.user_id,
                    "usage record dropped; recorder queue is full"
                );
            }
            Err(mpsc::error::TrySendError::Closed(record)) => {
                self.dropped.fetch_add(1, Ordering::Relaxed);
                tracing::warn!(
                    user_id = %record.user_id,
                    "usage record dropped; recorder worker is gone"
                );
            }
        }
    }

    /// Number of records dropped because of overload or shutdown
    pub fn dropped_count(&self) -> u64 {
        self.dropped.load(Ordering::Relaxed)
    }

    /// Stop the worker after draining whatever is already queued
    pub async fn shutdown(&self) {
        self.cancel.cancel();
        let handle = self.worker.lock().take();
        if let Some(handle) = handle {
            if let Err(error) = handle.await {
                tracing::error!(error = %error, "usage recorder worker panicked");
            }
        }
    }
}

async fn persist(store: &dyn UsageStore, record: QuotaUsageRecord) {
    let user_id = record.user_id.clone();
    if let Err(error) = store.append(record).await {
        // Recording failures are logged, never propagated to request callers.
        tracing::error!(
            user_id = %user_id,
            error = %error,
            "failed to persist usage record"
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dispatch::{ProviderId, TokenUsage};
    use crate::error::{SwitchyardError, SwitchyardResult};
    use crate::pricing::Cost;
    use crate::quota::usage::{MemoryUsageStore, UsageTotals};
    use async_trait::async_trait;
    use chrono::{DateTime, Utc};
    use tokio::sync::Notify;

    fn record(user: &str) -> QuotaUsageRecord {
        QuotaUsageRecord::new(
            user,
            ProviderId::OpenAI,
            "gpt-4o-mini",
            TokenUsage::new(10, 10),
            Cost::zero(),
        )
    }

    #[tokio::test]
    async fn records_reach_the_store() {
        let store = Arc::new(MemoryUsageStore::new());
        let recorder = UsageRecorder::spawn(store.clone(), 16);

        recorder.enqueue(record("user-1"));
        recorder.enqueue(record("user-1"));
        recorder.shutdown().await;

        assert_eq!(store.len().await, 2);
        assert_eq!(recorder.dropped_count(), 0);
    }

    #[tokio::test]
    async fn shutdown_drains_queued_records() {
        let store = Arc::new(MemoryUsageStore::new());
        let recorder = UsageRecorder::spawn(store.clone(), 16);

        for _ in 0..8 {
            recorder.enqueue(record("user-2"));
        }
        recorder.shutdown().await;

        assert_eq!(store.len().await, 8);
    }

    #[tokio::test]
    async fn enqueue_after_shutdown_drops_and_counts() {
        let store = Arc::new(MemoryUsageStore::new());
        let recorder = UsageRecorder::spawn(store.clone(), 16);
        recorder.shutdown().await;

        recorder.enqueue(record("user-3"));
        assert_eq!(recorder.dropped_count(), 1);
        assert_eq!(store.len().await, 0);
    }

    /// Store whose `append` blocks until released, to hold the worker busy.
    struct GatedStore {
        entered: Notify,
        release: Notify,
        inner: MemoryUsageStore,
    }

    #[async_trait]
    impl UsageStore for GatedStore {
        async fn append(&self, record: QuotaUsageRecord) -> SwitchyardResult<()> {
            self.entered.notify_one();
            self.release.notified().await;
            self.inner.append(record).await
        }

        async fn sum_usage(
            &self,
            user_id: &str,
            start: DateTime<Utc>,
            end: DateTime<Utc>,
        ) -> SwitchyardResult<UsageTotals> {
            self.inner.sum_usage(user_id, start, end).await
        }
    }

    #[tokio::test]
    async fn overload_drops_records_without_blocking() {
        let store = Arc::new(GatedStore {
            entered: Notify::new(),
            release: Notify::new(),
            inner: MemoryUsageStore::new(),
        });
        let recorder = UsageRecorder::spawn(store.clone(), 1);

        // First record occupies the worker inside append.
        recorder.enqueue(record("user-4"));
        store.entered.notified().await;

        // Second record fills the queue, third has nowhere to go.
        recorder.enqueue(record("user-4"));
        recorder.enqueue(record("user-4"));
        assert_eq!(recorder.dropped_count(), 1);

        // Let the worker finish both held records.
        store.release.notify_one();
        store.release.notify_one();
        recorder.shutdown().await;

        assert_eq!(store.inner.len().await, 2);
        assert_eq!(recorder.dropped_count(), 1);
    }

    /// Store that always fails, to show recording errors stay internal.
    struct FailingStore;

    #[async_trait]
    impl UsageStore for FailingStore {
        async fn append(&self, _record: QuotaUsageRecord) -> SwitchyardResult<()> {
            Err(SwitchyardError::recording("ledger unavailable"))
        }

        async fn sum_usage(
            &self,
            _user_id: &str,
            _start: DateTime<Utc>,
            _end: DateTime<Utc>,
        ) -> SwitchyardResult<UsageTotals> {
            Ok(UsageTotals::default())
        }
    }

    #[tokio::test]
    async fn store_failures_never_reach_the_caller() {
        let recorder = UsageRecorder::spawn(Arc::new(FailingStore), 4);
        recorder.enqueue(record("user-5"));
        recorder.shutdown().await;
        // Nothing to assert beyond not panicking; the failure is logged.
        assert_eq!(recorder.dropped_count(), 0);
    }
}
