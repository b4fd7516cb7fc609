//! Core service façade.
//!
//! [`MetadataIndex`] wires a host-provided [`MetadataStoreFactory`] into the
//! sync coordinator and the query service, which share one lazily opened
//! store and one observable [`CoreState`].
//!
//! ```ignore
//! use core_service::{CoreConfig, MetadataIndex};
//! use std::sync::Arc;
//!
//! let config = CoreConfig::builder()
//!     .store_factory(Arc::new(MyStoreFactory))
//!     .results_per_page(20)
//!     .auto_sync(true)
//!     .build()?;
//!
//! let index = MetadataIndex::new(config)?;
//! let mut state = index.subscribe();
//! let page = index.search("holiday", 1).await?;
//! ```

pub mod error;

pub use error::{CoreError, Result};

pub use bridge_traits::{
    Diagnostic, DiagnosticLevel, DiagnosticSink, InodeRecord, MetadataStore,
    MetadataStoreFactory, SyncState,
};
pub use core_library::{Page, QueryResultSet};
pub use core_runtime::{
    CoreConfig, CoreConfigBuilder, CoreEvent, CoreState, EventStream, QueryEvent, QueryFailure,
    QueryKind, SyncEvent, SyncFailure, SyncFailureKind,
};
pub use core_sync::{SessionPhase, SyncProgress};

use core_async::sync::watch;
use core_library::{QueryService, StoreHandle};
use core_runtime::diagnostics::targets;
use core_runtime::{DiagnosticReporter, EventBus, StateStore};
use core_sync::SyncCoordinator;
use std::fmt;
use std::sync::Arc;
use tracing::{info, instrument};

/// Primary façade exposed to host applications.
///
/// Dropping the index shuts down the auto-sync watcher and any running sync
/// session.
pub struct MetadataIndex {
    handle: Arc<StoreHandle>,
    state: Arc<StateStore>,
    events: EventBus,
    diagnostics: DiagnosticReporter,
    query: QueryService,
    sync: SyncCoordinator,
}

impl MetadataIndex {
    /// Build the index and, with `auto_sync` set, install the sync watcher.
    ///
    /// Nothing is opened here; the store is opened by the first operation
    /// that needs it. With `auto_sync` this must run inside the async
    /// runtime, since the watcher starts syncing right away.
    ///
    /// # Errors
    ///
    /// [`CoreError::Runtime`] when `config` fails validation.
    pub fn new(config: CoreConfig) -> Result<Self> {
        config.validate()?;

        let diagnostics = DiagnosticReporter::new(config.diagnostic_sink.clone());
        let handle = Arc::new(StoreHandle::new(Arc::clone(&config.store_factory)));
        let state = Arc::new(StateStore::new());
        let events = EventBus::new(config.event_buffer_size);

        let query = QueryService::new(
            Arc::clone(&handle),
            Arc::clone(&state),
            events.clone(),
            diagnostics.clone(),
            config.results_per_page,
        );
        let sync = SyncCoordinator::new(
            Arc::clone(&handle),
            Arc::clone(&state),
            events.clone(),
            diagnostics.clone(),
        );
        sync.start(config.auto_sync);

        info!(
            results_per_page = config.results_per_page,
            auto_sync = config.auto_sync,
            "Metadata index created"
        );

        Ok(Self {
            handle,
            state,
            events,
            diagnostics,
            query,
            sync,
        })
    }

    /// Start syncing unless a session is already running.
    ///
    /// # Errors
    ///
    /// [`CoreError::Sync`] carrying the failure that was also published as
    /// `sync_error`.
    pub async fn init(&self) -> Result<()> {
        self.sync.initialize().await?;
        Ok(())
    }

    /// Full-text search, 1-based `page`.
    ///
    /// # Errors
    ///
    /// [`CoreError::Library`] for `page == 0` (nothing is published) or when
    /// the store query fails (the failure is published as `query_error`).
    pub async fn search(&self, query: &str, page: u32) -> Result<QueryResultSet> {
        Ok(self.query.search(query, page).await?)
    }

    /// Most recently indexed records, 1-based `page`.
    ///
    /// # Errors
    ///
    /// Same as [`MetadataIndex::search`].
    pub async fn get_latest(&self, page: u32) -> Result<QueryResultSet> {
        Ok(self.query.latest(page).await?)
    }

    /// Reset query results and sync progress in one state update.
    ///
    /// A running sync session and any in-flight query are dropped. With
    /// auto-sync the watcher starts a fresh session.
    pub async fn clear(&self) {
        self.sync
            .clear_with(|state| self.query.clear_results(state))
            .await;
    }

    /// Delete the locally replicated data, then [`clear`](Self::clear).
    ///
    /// # Errors
    ///
    /// [`CoreError::Store`] when the store cannot be opened or refuses to
    /// clear; published state is left untouched in that case.
    #[instrument(skip(self))]
    pub async fn clear_data(&self) -> Result<()> {
        let store = self.handle.get().await?;
        store.clear_data().await?;
        self.diagnostics
            .info(targets::STORE, "Local metadata removed")
            .emit();
        self.clear().await;
        Ok(())
    }

    /// Current snapshot of the observable state.
    pub fn state(&self) -> CoreState {
        self.state.snapshot()
    }

    /// Observe state changes. Each update is seen whole.
    pub fn subscribe(&self) -> watch::Receiver<CoreState> {
        self.state.subscribe()
    }

    /// Discrete sync and query notifications from now on.
    pub fn events(&self) -> EventStream {
        EventStream::new(self.events.subscribe())
    }

    pub fn is_synchronized(&self) -> bool {
        self.sync.is_synchronized()
    }

    pub fn progress(&self) -> SyncProgress {
        self.sync.progress()
    }

    /// Lifecycle of the current sync session.
    pub async fn sync_phase(&self) -> SessionPhase {
        self.sync.phase().await
    }

    pub fn results_per_page(&self) -> u32 {
        self.query.results_per_page()
    }

    /// Stop the watcher and any running sync session. Queries keep working.
    pub fn shutdown(&self) {
        self.sync.shutdown();
    }
}

impl Drop for MetadataIndex {
    fn drop(&mut self) {
        self.sync.shutdown();
    }
}

impl fmt::Debug for MetadataIndex {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MetadataIndex")
            .field("handle", &self.handle)
            .field("results_per_page", &self.query.results_per_page())
            .field("is_watching", &self.sync.is_watching())
            .finish()
    }
}
