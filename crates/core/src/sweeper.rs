//! Background eviction of expired entries.
//!
//! A [`Sweeper`] runs one pass at start and then one per interval. Passes
//! never overlap: the loop awaits each `delete_expired` before waiting for the
//! next tick. Failed passes are logged and the loop carries on.
//!
//! Stopping is cooperative. [`SweeperHandle::stop`] signals the loop and waits
//! for it to exit; an in-flight pass is allowed to finish first.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;

use crate::store::EntryStore;

/// Lifecycle of a sweeper.
///
/// `Idle` belongs to an unstarted [`Sweeper`]; once started, the live state
/// is read from [`SweeperHandle::state`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SweeperState {
    Idle,
    Running,
    Stopped,
}

/// Periodic eviction task, not yet started.
pub struct Sweeper {
    store: Arc<dyn EntryStore>,
    interval: Duration,
}

impl std::fmt::Debug for Sweeper {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Sweeper").field("interval", &self.interval).finish_non_exhaustive()
    }
}

impl Sweeper {
    /// A zero interval is raised to one second.
    pub fn new(store: Arc<dyn EntryStore>, interval: Duration) -> Self {
        Self { store, interval: interval.max(Duration::from_secs(1)) }
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    /// Always `Idle`: starting consumes the sweeper.
    pub fn state(&self) -> SweeperState {
        SweeperState::Idle
    }

    /// Spawn the sweep loop on the current tokio runtime.
    pub fn start(self) -> SweeperHandle {
        let (stop_tx, stop_rx) = watch::channel(false);
        let (state_tx, state_rx) = watch::channel(SweeperState::Running);
        let (passes_tx, passes_rx) = watch::channel(0u64);

        tracing::info!(interval_secs = self.interval.as_secs(), "sweeper started");
        let task = tokio::spawn(run(self.store, self.interval, stop_rx, state_tx, passes_tx));

        SweeperHandle { stop_tx, task, state: state_rx, passes: passes_rx }
    }
}

async fn run(
    store: Arc<dyn EntryStore>, interval: Duration, mut stop_rx: watch::Receiver<bool>,
    state_tx: watch::Sender<SweeperState>, passes_tx: watch::Sender<u64>,
) {
    let mut ticker = tokio::time::interval(interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        tokio::select! {
            biased;
            changed = stop_rx.changed() => {
                if changed.is_err() || *stop_rx.borrow() {
                    break;
                }
            }
            _ = ticker.tick() => {
                sweep_once(store.as_ref()).await;
                passes_tx.send_modify(|n| *n += 1);
            }
        }
    }

    state_tx.send_replace(SweeperState::Stopped);
    tracing::info!("sweeper stopped");
}

/// Run a single eviction pass, logging the outcome.
pub async fn sweep_once(store: &dyn EntryStore) -> Option<u64> {
    match store.delete_expired().await {
        Ok(0) => {
            tracing::debug!("sweep found nothing to evict");
            Some(0)
        }
        Ok(removed) => {
            tracing::info!(removed, "evicted expired entries");
            Some(removed)
        }
        Err(e) => {
            tracing::error!(error = %e, "sweep failed");
            None
        }
    }
}

/// Handle to a running sweeper.
#[derive(Debug)]
pub struct SweeperHandle {
    stop_tx: watch::Sender<bool>,
    task: JoinHandle<()>,
    state: watch::Receiver<SweeperState>,
    passes: watch::Receiver<u64>,
}

impl SweeperHandle {
    pub fn state(&self) -> SweeperState {
        *self.state.borrow()
    }

    /// Passes attempted so far, failed ones included.
    pub fn passes(&self) -> u64 {
        *self.passes.borrow()
    }

    /// Wait until at least `n` passes have been attempted.
    pub async fn wait_for_passes(&mut self, n: u64) {
        // An Err means the loop exited; nothing more will arrive.
        let _ = self.passes.wait_for(|done| *done >= n).await;
    }

    /// Signal the loop and wait for it to exit. Calling on an already
    /// finished loop returns immediately.
    pub async fn stop(self) {
        let _ = self.stop_tx.send(true);
        if let Err(e) = self.task.await {
            tracing::error!(error = %e, "sweeper task ended abnormally");
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicU64, Ordering};

    use async_trait::async_trait;
    use chrono::Utc;
    use tokio::sync::Notify;

    use super::*;
    use crate::clock::ManualClock;
    use crate::store::{Entry, MemoryStore, StoreError};

    #[derive(Debug, Default)]
    struct FailingStore {
        calls: AtomicU64,
    }

    #[async_trait]
    impl EntryStore for FailingStore {
        async fn create(&self, id: &str, _: &[u8], _: Duration) -> Result<Entry, StoreError> {
            Err(StoreError::Io(format!("create {id}: disk full")))
        }

        async fn get(&self, _: &str) -> Result<Option<Entry>, StoreError> {
            Ok(None)
        }

        async fn delete_expired(&self) -> Result<u64, StoreError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Err(StoreError::Io("database is locked".into()))
        }

        async fn delete(&self, _: &str) -> Result<(), StoreError> {
            Ok(())
        }

        async fn ping(&self) -> Result<(), StoreError> {
            Err(StoreError::Io("database is locked".into()))
        }
    }

    /// Holds each `delete_expired` call open until released.
    #[derive(Debug, Default)]
    struct GatedStore {
        entered: Notify,
        release: Notify,
        finished: AtomicU64,
    }

    #[async_trait]
    impl EntryStore for GatedStore {
        async fn create(&self, id: &str, _: &[u8], _: Duration) -> Result<Entry, StoreError> {
            Err(StoreError::Io(format!("create {id}: read-only")))
        }

        async fn get(&self, _: &str) -> Result<Option<Entry>, StoreError> {
            Ok(None)
        }

        async fn delete_expired(&self) -> Result<u64, StoreError> {
            self.entered.notify_one();
            self.release.notified().await;
            self.finished.fetch_add(1, Ordering::SeqCst);
            Ok(7)
        }

        async fn delete(&self, _: &str) -> Result<(), StoreError> {
            Ok(())
        }

        async fn ping(&self) -> Result<(), StoreError> {
            Ok(())
        }
    }

    #[tokio::test]
    async fn test_initial_pass_runs_at_start() {
        let clock = Arc::new(ManualClock::new(Utc::now()));
        let store = Arc::new(MemoryStore::with_clock(clock.clone()));
        store
            .create("sweepme00001", b"x", Duration::from_secs(600))
            .await
            .unwrap();
        clock.advance(Duration::from_secs(601));

        let sweeper = Sweeper::new(store.clone(), Duration::from_secs(3600));
        assert_eq!(sweeper.state(), SweeperState::Idle);

        let mut handle = sweeper.start();
        assert_eq!(handle.state(), SweeperState::Running);

        handle.wait_for_passes(1).await;
        assert!(store.is_empty());

        handle.stop().await;
    }

    #[tokio::test(start_paused = true)]
    async fn test_runs_on_interval() {
        let store = Arc::new(MemoryStore::new());
        let mut handle = Sweeper::new(store, Duration::from_secs(60)).start();

        handle.wait_for_passes(1).await;
        tokio::time::advance(Duration::from_secs(60)).await;
        handle.wait_for_passes(2).await;
        tokio::time::advance(Duration::from_secs(60)).await;
        handle.wait_for_passes(3).await;

        assert_eq!(handle.passes(), 3);
        handle.stop().await;
    }

    #[tokio::test(start_paused = true)]
    async fn test_failed_pass_does_not_stop_loop() {
        let store = Arc::new(FailingStore::default());
        let mut handle = Sweeper::new(store.clone(), Duration::from_secs(10)).start();

        handle.wait_for_passes(1).await;
        tokio::time::advance(Duration::from_secs(10)).await;
        handle.wait_for_passes(2).await;

        assert_eq!(handle.state(), SweeperState::Running);
        assert_eq!(store.calls.load(Ordering::SeqCst), 2);
        handle.stop().await;
    }

    #[tokio::test]
    async fn test_stop_waits_for_exit() {
        let store = Arc::new(MemoryStore::new());
        let mut handle = Sweeper::new(store, Duration::from_secs(3600)).start();
        handle.wait_for_passes(1).await;

        let state = handle.state.clone();
        handle.stop().await;
        assert_eq!(*state.borrow(), SweeperState::Stopped);
    }

    #[tokio::test]
    async fn test_stop_lets_in_flight_pass_finish() {
        let store = Arc::new(GatedStore::default());
        let handle = Sweeper::new(store.clone(), Duration::from_secs(3600)).start();
        store.entered.notified().await;

        let passes = handle.passes.clone();
        let state = handle.state.clone();
        let stopping = tokio::spawn(handle.stop());

        tokio::time::sleep(Duration::from_millis(50)).await;
        assert!(!stopping.is_finished());
        assert_eq!(store.finished.load(Ordering::SeqCst), 0);
        assert_eq!(*state.borrow(), SweeperState::Running);

        store.release.notify_one();
        stopping.await.unwrap();

        assert_eq!(store.finished.load(Ordering::SeqCst), 1);
        assert_eq!(*passes.borrow(), 1);
        assert_eq!(*state.borrow(), SweeperState::Stopped);
    }

    #[tokio::test]
    async fn test_sweep_once_reports_failure() {
        let store = FailingStore::default();
        assert_eq!(sweep_once(&store).await, None);

        let store = MemoryStore::new();
        assert_eq!(sweep_once(&store).await, Some(0));
    }

    #[test]
    fn test_zero_interval_is_clamped() {
        let sweeper = Sweeper::new(Arc::new(MemoryStore::new()), Duration::ZERO);
        assert_eq!(sweeper.interval(), Duration::from_secs(1));
    }
}
