//! Paginated queries over the local metadata view.
//!
//! [`QueryService`] runs `search` and `latest` against the shared store and
//! publishes each outcome to the state surface in one update:
//!
//! - dispatch sets `loading_search_results`
//! - success replaces `search_results` and `total` and clears `loading_search_results`
//! - failure publishes an empty result set, `total = 0`, a `query_error`, and
//!   clears `loading_search_results`
//!
//! Every dispatch takes a new request id. A completion whose id is no longer
//! the latest (a newer query was dispatched, or the results were cleared) is
//! returned to its caller but not published.

use crate::error::{LibraryError, Result};
use crate::handle::StoreHandle;
use crate::pagination::{Page, PageRequest};
use bridge_traits::error::BridgeError;
use bridge_traits::metadata::{InodeRecord, RecordPage};
use core_runtime::diagnostics::{targets, DiagnosticReporter};
use core_runtime::events::{CoreEvent, EventBus, QueryEvent};
use core_runtime::state::{CoreState, QueryFailure, QueryKind, StateStore};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tracing::{debug, instrument};

/// One page of query results.
pub type QueryResultSet = Page<InodeRecord>;

#[derive(Debug, Clone, Copy)]
enum QueryTarget<'a> {
    Search(&'a str),
    Latest,
}

impl QueryTarget<'_> {
    fn kind(&self) -> QueryKind {
        match self {
            QueryTarget::Search(_) => QueryKind::Search,
            QueryTarget::Latest => QueryKind::Latest,
        }
    }
}

#[derive(Debug)]
pub struct QueryService {
    handle: Arc<StoreHandle>,
    state: Arc<StateStore>,
    events: EventBus,
    diagnostics: DiagnosticReporter,
    results_per_page: u32,
    latest_request: AtomicU64,
}

impl QueryService {
    pub fn new(
        handle: Arc<StoreHandle>,
        state: Arc<StateStore>,
        events: EventBus,
        diagnostics: DiagnosticReporter,
        results_per_page: u32,
    ) -> Self {
        Self {
            handle,
            state,
            events,
            diagnostics,
            results_per_page,
            latest_request: AtomicU64::new(0),
        }
    }

    pub fn results_per_page(&self) -> u32 {
        self.results_per_page
    }

    /// Full-text search, 1-based `page`.
    ///
    /// # Errors
    ///
    /// - [`LibraryError::InvalidPage`] for `page == 0`; the store is not called
    ///   and no state changes
    /// - [`LibraryError::Query`] when the store could not be opened or the
    ///   search failed
    #[instrument(skip(self), fields(results_per_page = self.results_per_page))]
    pub async fn search(&self, query: &str, page: u32) -> Result<QueryResultSet> {
        self.execute(QueryTarget::Search(query), page).await
    }

    /// Most recently indexed records, 1-based `page`.
    ///
    /// # Errors
    ///
    /// Same as [`QueryService::search`].
    #[instrument(skip(self), fields(results_per_page = self.results_per_page))]
    pub async fn latest(&self, page: u32) -> Result<QueryResultSet> {
        self.execute(QueryTarget::Latest, page).await
    }

    /// Empty the published results and drop any in-flight completion.
    pub fn clear(&self) {
        self.state.update(|state| self.clear_results(state));
    }

    /// The reset behind [`clear`](Self::clear), for callers that fold it into
    /// a larger update of their own. Must run inside a `StateStore::update`.
    pub fn clear_results(&self, state: &mut CoreState) {
        self.latest_request.fetch_add(1, Ordering::SeqCst);
        state.search_results.clear();
        state.total = 0;
        state.loading_search_results = false;
        state.query_error = None;
        debug!("Query results cleared");
    }

    async fn execute(&self, target: QueryTarget<'_>, page: u32) -> Result<QueryResultSet> {
        let kind = target.kind();
        let request = PageRequest::new(page, self.results_per_page)?;

        // Taken under the state lock so dispatch order and loading agree
        let mut request_id = 0;
        self.state.update(|state| {
            request_id = self.latest_request.fetch_add(1, Ordering::SeqCst) + 1;
            state.loading_search_results = true;
            state.query_error = None;
        });
        self.events
            .emit(CoreEvent::Query(QueryEvent::Dispatched {
                request_id,
                kind,
                page,
            }))
            .ok();
        debug!(
            request_id,
            limit = request.limit(),
            offset = request.offset(),
            "Dispatching {} query",
            kind
        );

        match self.fetch(target, request).await {
            Ok(records) => {
                let results = Page::new(records.data, records.total, request);
                self.publish_success(request_id, kind, &results);
                Ok(results)
            }
            Err(source) => {
                self.publish_failure(request_id, kind, page, &source);
                Err(LibraryError::Query { kind, source })
            }
        }
    }

    async fn fetch(
        &self,
        target: QueryTarget<'_>,
        request: PageRequest,
    ) -> std::result::Result<RecordPage, BridgeError> {
        let store = self.handle.get().await?;
        match target {
            QueryTarget::Search(query) => {
                store
                    .search(query, request.limit(), request.offset())
                    .await
            }
            QueryTarget::Latest => store.latest(request.limit(), request.offset()).await,
        }
    }

    fn is_latest(&self, request_id: u64) -> bool {
        self.latest_request.load(Ordering::SeqCst) == request_id
    }

    fn publish_success(&self, request_id: u64, kind: QueryKind, results: &QueryResultSet) {
        // The id check runs under the state lock so a concurrent clear or
        // dispatch either lands before this write or sees it.
        let mut published = false;
        self.state.update(|state| {
            if !self.is_latest(request_id) {
                return;
            }
            state.search_results = results.items.clone();
            state.total = results.total;
            state.loading_search_results = false;
            state.query_error = None;
            published = true;
        });

        let event = if published {
            debug!(
                request_id,
                items = results.items.len(),
                total = results.total,
                "Query completed"
            );
            QueryEvent::Completed {
                request_id,
                kind,
                page: results.page,
                items: results.items.len(),
                total: results.total,
            }
        } else {
            self.discarded(request_id, kind)
        };
        self.events.emit(CoreEvent::Query(event)).ok();
    }

    fn publish_failure(&self, request_id: u64, kind: QueryKind, page: u32, source: &BridgeError) {
        self.diagnostics
            .error(targets::QUERY, format!("{} query failed", kind))
            .field("request_id", request_id)
            .field("page", page)
            .cause(source)
            .emit();

        let mut published = false;
        self.state.update(|state| {
            if !self.is_latest(request_id) {
                return;
            }
            state.search_results.clear();
            state.total = 0;
            state.loading_search_results = false;
            state.query_error = Some(QueryFailure::new(kind));
            published = true;
        });

        let event = if published {
            QueryEvent::Failed {
                request_id,
                kind,
                page,
            }
        } else {
            self.discarded(request_id, kind)
        };
        self.events.emit(CoreEvent::Query(event)).ok();
    }

    fn discarded(&self, request_id: u64, kind: QueryKind) -> QueryEvent {
        debug!(request_id, "Discarding stale {} result", kind);
        QueryEvent::Discarded { request_id, kind }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bridge_traits::metadata::{
        MetadataStore, MetadataStoreFactory, ProgressStream, SyncState,
    };
    use core_runtime::events::Receiver;
    use mockall::mock;
    use std::time::Duration;

    mock! {
        pub Store {}

        #[async_trait::async_trait]
        impl MetadataStore for Store {
            async fn get_sync_state(&self) -> bridge_traits::error::Result<SyncState>;
            async fn start_sync(&self) -> bridge_traits::error::Result<ProgressStream>;
            async fn search(&self, query: &str, limit: u32, offset: u64) -> bridge_traits::error::Result<RecordPage>;
            async fn latest(&self, limit: u32, offset: u64) -> bridge_traits::error::Result<RecordPage>;
            async fn clear_data(&self) -> bridge_traits::error::Result<()>;
        }
    }

    struct FixedFactory(Arc<dyn MetadataStore>);

    #[async_trait::async_trait]
    impl MetadataStoreFactory for FixedFactory {
        async fn open(&self) -> bridge_traits::error::Result<Arc<dyn MetadataStore>> {
            Ok(Arc::clone(&self.0))
        }
    }

    struct Harness {
        service: Arc<QueryService>,
        state: Arc<StateStore>,
        events: Receiver<CoreEvent>,
    }

    fn harness(store: impl MetadataStore + 'static, results_per_page: u32) -> Harness {
        let handle = Arc::new(StoreHandle::new(Arc::new(FixedFactory(Arc::new(store)))));
        let state = Arc::new(StateStore::new());
        let bus = EventBus::new(32);
        let events = bus.subscribe();
        let service = Arc::new(QueryService::new(
            handle,
            Arc::clone(&state),
            bus,
            DiagnosticReporter::disabled(),
            results_per_page,
        ));
        Harness {
            service,
            state,
            events,
        }
    }

    fn records(count: usize) -> Vec<InodeRecord> {
        (1..=count)
            .map(|n| InodeRecord::new(format!("bafy{}", n), format!("r{}.txt", n)))
            .collect()
    }

    #[tokio::test]
    async fn test_search_uses_page_offset_and_publishes_results() {
        let mut store = MockStore::new();
        store
            .expect_search()
            .withf(|query, limit, offset| query == "report" && *limit == 20 && *offset == 40)
            .times(1)
            .returning(|_, _, _| Ok(RecordPage::new(records(20), 57)));

        let h = harness(store, 20);
        let results = h.service.search("report", 3).await.unwrap();

        assert_eq!(results.items.len(), 20);
        assert_eq!(results.total, 57);
        assert_eq!(results.page, 3);
        assert!(!results.has_next());

        let state = h.state.snapshot();
        assert_eq!(state.search_results, records(20));
        assert_eq!(state.total, 57);
        assert!(!state.loading_search_results);
        assert!(state.query_error.is_none());
    }

    #[tokio::test]
    async fn test_latest_first_page_has_zero_offset() {
        let mut store = MockStore::new();
        store
            .expect_latest()
            .withf(|limit, offset| *limit == 10 && *offset == 0)
            .times(1)
            .returning(|_, _| Ok(RecordPage::new(records(3), 3)));

        let h = harness(store, 10);
        let results = h.service.latest(1).await.unwrap();

        assert_eq!(results.items.len(), 3);
        assert_eq!(h.state.snapshot().total, 3);
    }

    #[tokio::test]
    async fn test_page_zero_rejected_without_store_call() {
        let mut store = MockStore::new();
        store.expect_search().never();
        store.expect_latest().never();

        let mut h = harness(store, 20);
        let before = h.state.snapshot();

        let err = h.service.search("x", 0).await.unwrap_err();
        assert!(matches!(err, LibraryError::InvalidPage { page: 0 }));
        assert!(matches!(
            h.service.latest(0).await,
            Err(LibraryError::InvalidPage { .. })
        ));

        assert_eq!(h.state.snapshot(), before);
        assert!(h.events.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_query_failure_clears_loading_and_publishes_error() {
        let mut store = MockStore::new();
        store
            .expect_latest()
            .returning(|_, _| Ok(RecordPage::new(records(5), 5)));
        store
            .expect_search()
            .returning(|_, _, _| Err(BridgeError::Store("index corrupted".to_string())));

        let h = harness(store, 20);
        h.service.latest(1).await.unwrap();

        let err = h.service.search("report", 1).await.unwrap_err();
        assert!(matches!(
            err,
            LibraryError::Query {
                kind: QueryKind::Search,
                ..
            }
        ));

        let state = h.state.snapshot();
        assert!(state.search_results.is_empty());
        assert_eq!(state.total, 0);
        assert!(!state.loading_search_results);
        assert_eq!(state.query_error, Some(QueryFailure::new(QueryKind::Search)));
    }

    #[tokio::test]
    async fn test_next_query_clears_previous_error() {
        let mut store = MockStore::new();
        let mut calls = 0;
        store.expect_latest().returning(move |_, _| {
            calls += 1;
            if calls == 1 {
                Err(BridgeError::OperationFailed("timeout".to_string()))
            } else {
                Ok(RecordPage::new(records(2), 2))
            }
        });

        let h = harness(store, 20);
        assert!(h.service.latest(1).await.is_err());
        assert!(h.state.snapshot().query_error.is_some());

        h.service.latest(1).await.unwrap();
        let state = h.state.snapshot();
        assert!(state.query_error.is_none());
        assert_eq!(state.search_results.len(), 2);
    }

    /// Search store whose "slow" query finishes after a later "fast" one.
    struct RacingStore;

    #[async_trait::async_trait]
    impl MetadataStore for RacingStore {
        async fn get_sync_state(&self) -> bridge_traits::error::Result<SyncState> {
            Ok(SyncState::new(0, 0))
        }

        async fn start_sync(&self) -> bridge_traits::error::Result<ProgressStream> {
            Err(BridgeError::NotAvailable("not syncing".to_string()))
        }

        async fn search(
            &self,
            query: &str,
            _limit: u32,
            _offset: u64,
        ) -> bridge_traits::error::Result<RecordPage> {
            if query == "slow" {
                core_async::sleep(Duration::from_millis(100)).await;
                Ok(RecordPage::new(records(1), 1))
            } else {
                Ok(RecordPage::new(records(4), 4))
            }
        }

        async fn latest(&self, _limit: u32, _offset: u64) -> bridge_traits::error::Result<RecordPage> {
            Ok(RecordPage::default())
        }

        async fn clear_data(&self) -> bridge_traits::error::Result<()> {
            Ok(())
        }
    }

    #[tokio::test]
    async fn test_stale_completion_is_discarded() {
        let h = harness(RacingStore, 20);

        let slow_service = Arc::clone(&h.service);
        let slow = tokio::spawn(async move { slow_service.search("slow", 1).await });
        core_async::sleep(Duration::from_millis(20)).await;

        let fast = h.service.search("fast", 1).await.unwrap();
        assert_eq!(fast.total, 4);

        // The caller still gets its own results
        let slow = slow.await.unwrap().unwrap();
        assert_eq!(slow.total, 1);

        let state = h.state.snapshot();
        assert_eq!(state.total, 4);
        assert_eq!(state.search_results.len(), 4);
        assert!(!state.loading_search_results);
    }

    #[tokio::test]
    async fn test_clear_discards_in_flight_completion() {
        let h = harness(RacingStore, 20);

        let service = Arc::clone(&h.service);
        let in_flight = tokio::spawn(async move { service.search("slow", 1).await });
        core_async::sleep(Duration::from_millis(20)).await;
        assert!(h.state.snapshot().loading_search_results);

        h.service.clear();
        in_flight.await.unwrap().unwrap();

        let state = h.state.snapshot();
        assert!(state.search_results.is_empty());
        assert_eq!(state.total, 0);
        assert!(!state.loading_search_results);
    }

    #[tokio::test]
    async fn test_clear_results_in_outer_update_discards_in_flight() {
        let h = harness(RacingStore, 20);

        let service = Arc::clone(&h.service);
        let in_flight = tokio::spawn(async move { service.search("slow", 1).await });
        core_async::sleep(Duration::from_millis(20)).await;

        h.state.update(|state| {
            h.service.clear_results(state);
            state.inodes_synced = 3;
        });
        in_flight.await.unwrap().unwrap();

        let state = h.state.snapshot();
        assert!(state.search_results.is_empty());
        assert!(!state.loading_search_results);
        assert_eq!(state.inodes_synced, 3);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_dispatches_never_leave_loading_set() {
        let h = harness(RacingStore, 20);

        for _ in 0..50 {
            let mut tasks = Vec::new();
            for _ in 0..16 {
                let service = Arc::clone(&h.service);
                tasks.push(tokio::spawn(async move { service.search("fast", 1).await }));
            }
            for task in tasks {
                task.await.unwrap().unwrap();
            }

            let state = h.state.snapshot();
            assert!(!state.loading_search_results);
            assert_eq!(state.total, 4);
        }
    }

    #[tokio::test]
    async fn test_events_follow_query_lifecycle() {
        let mut store = MockStore::new();
        store
            .expect_latest()
            .returning(|_, _| Ok(RecordPage::new(records(2), 2)));

        let mut h = harness(store, 20);
        h.service.latest(1).await.unwrap();

        assert_eq!(
            h.events.recv().await.unwrap(),
            CoreEvent::Query(QueryEvent::Dispatched {
                request_id: 1,
                kind: QueryKind::Latest,
                page: 1,
            })
        );
        assert_eq!(
            h.events.recv().await.unwrap(),
            CoreEvent::Query(QueryEvent::Completed {
                request_id: 1,
                kind: QueryKind::Latest,
                page: 1,
                items: 2,
                total: 2,
            })
        );
    }
}
