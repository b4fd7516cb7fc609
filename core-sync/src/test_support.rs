//! In-memory store and polling helpers for coordinator tests.

use crate::coordinator::{SessionPhase, SyncCoordinator};
use async_trait::async_trait;
use bridge_traits::error::{BridgeError, Result};
use bridge_traits::metadata::{
    MetadataStore, MetadataStoreFactory, ProgressStream, RecordPage, SyncState,
};
use core_runtime::state::{CoreState, StateStore};
use futures::channel::mpsc::{self, UnboundedSender};
use futures::StreamExt;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

const WAIT_LIMIT: Duration = Duration::from_secs(2);

/// Store whose progress stream is fed by the test.
pub(crate) struct FakeStore {
    initial: std::result::Result<SyncState, String>,
    progress: Mutex<Vec<UnboundedSender<Result<SyncState>>>>,
    opens: AtomicUsize,
    state_reads: AtomicUsize,
}

impl FakeStore {
    pub(crate) fn new(initial: SyncState) -> Self {
        Self::with_initial(Ok(initial))
    }

    /// `get_sync_state` always fails with `message`.
    pub(crate) fn failing_state(message: &str) -> Self {
        Self::with_initial(Err(message.to_string()))
    }

    fn with_initial(initial: std::result::Result<SyncState, String>) -> Self {
        Self {
            initial,
            progress: Mutex::new(Vec::new()),
            opens: AtomicUsize::new(0),
            state_reads: AtomicUsize::new(0),
        }
    }

    pub(crate) fn factory(self: &Arc<Self>) -> Arc<dyn MetadataStoreFactory> {
        Arc::new(FakeFactory(Arc::clone(self)))
    }

    pub(crate) fn opens(&self) -> usize {
        self.opens.load(Ordering::SeqCst)
    }

    pub(crate) fn state_reads(&self) -> usize {
        self.state_reads.load(Ordering::SeqCst)
    }

    pub(crate) fn subscriptions(&self) -> usize {
        self.progress.lock().unwrap().len()
    }

    /// Send an update on the most recent subscription.
    pub(crate) fn push(&self, update: SyncState) {
        self.send(Ok(update));
    }

    pub(crate) fn push_error(&self, message: &str) {
        self.send(Err(BridgeError::Subscription(message.to_string())));
    }

    pub(crate) fn close_stream(&self) {
        if let Some(sender) = self.progress.lock().unwrap().last() {
            sender.close_channel();
        }
    }

    fn send(&self, item: Result<SyncState>) {
        let progress = self.progress.lock().unwrap();
        let sender = progress.last().expect("no progress subscription");
        // The receiver is gone once its session was cancelled
        let _ = sender.unbounded_send(item);
    }
}

#[async_trait]
impl MetadataStore for FakeStore {
    async fn get_sync_state(&self) -> Result<SyncState> {
        self.state_reads.fetch_add(1, Ordering::SeqCst);
        self.initial
            .clone()
            .map_err(BridgeError::OperationFailed)
    }

    async fn start_sync(&self) -> Result<ProgressStream> {
        let (sender, receiver) = mpsc::unbounded();
        self.progress.lock().unwrap().push(sender);
        Ok(receiver.boxed())
    }

    async fn search(&self, _query: &str, _limit: u32, _offset: u64) -> Result<RecordPage> {
        Ok(RecordPage::default())
    }

    async fn latest(&self, _limit: u32, _offset: u64) -> Result<RecordPage> {
        Ok(RecordPage::default())
    }

    async fn clear_data(&self) -> Result<()> {
        Ok(())
    }
}

struct FakeFactory(Arc<FakeStore>);

#[async_trait]
impl MetadataStoreFactory for FakeFactory {
    async fn open(&self) -> Result<Arc<dyn MetadataStore>> {
        self.0.opens.fetch_add(1, Ordering::SeqCst);
        Ok(Arc::clone(&self.0) as Arc<dyn MetadataStore>)
    }
}

/// Wait until `predicate` holds for the published state.
pub(crate) async fn wait_for_state(state: &StateStore, predicate: impl Fn(&CoreState) -> bool) {
    let mut observer = state.subscribe();
    let reached = core_async::time::timeout(WAIT_LIMIT, async {
        loop {
            let done = predicate(&observer.borrow_and_update());
            if done {
                return;
            }
            if observer.changed().await.is_err() {
                return;
            }
        }
    })
    .await;
    assert!(reached.is_ok(), "state condition not reached in time");
}

/// Poll the coordinator until its session reaches `phase`.
pub(crate) async fn wait_for_phase(coordinator: &SyncCoordinator, phase: SessionPhase) {
    let reached = core_async::time::timeout(WAIT_LIMIT, async {
        while coordinator.phase().await != phase {
            core_async::sleep(Duration::from_millis(5)).await;
        }
    })
    .await;
    assert!(reached.is_ok(), "session did not reach {:?} in time", phase);
}
