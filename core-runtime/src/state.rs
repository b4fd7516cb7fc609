//! # Observable State Surface
//!
//! The fields a UI binds to while the index syncs in the background:
//!
//! | Field | Written by |
//! |-------|------------|
//! | `search_results`, `loading_search_results`, `total`, `query_error` | query service |
//! | `inodes_synced`, `total_inodes_to_sync`, `sync_error` | sync coordinator |
//!
//! plus the computed [`CoreState::is_synchronized`].
//!
//! [`StateStore`] keeps the current [`CoreState`] in a `watch` channel.
//! Every [`StateStore::update`] runs its closure under the channel's write
//! lock and notifies observers once afterwards, so an observer never sees an
//! update half-applied (new results with `loading` still set, say).
//!
//! ```
//! use core_runtime::state::StateStore;
//!
//! let store = StateStore::new();
//! let mut observer = store.subscribe();
//!
//! store.update(|state| {
//!     state.inodes_synced = 5;
//!     state.total_inodes_to_sync = Some(100);
//! });
//!
//! assert!(observer.has_changed().unwrap());
//! assert!(!observer.borrow_and_update().is_synchronized());
//! ```

use bridge_traits::metadata::InodeRecord;
use core_async::sync::watch;
use serde::Serialize;
use std::fmt;

/// Which listing a query ran against.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum QueryKind {
    Search,
    Latest,
}

impl fmt::Display for QueryKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            QueryKind::Search => write!(f, "search"),
            QueryKind::Latest => write!(f, "latest"),
        }
    }
}

/// Category of a captured sync failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum SyncFailureKind {
    /// The store could not be opened, or reading the sync state or opening
    /// the progress subscription failed.
    Initialization,
    /// The progress subscription reported an error.
    Subscription,
    /// The store reported more inodes synced than exist.
    ProtocolViolation,
}

impl SyncFailureKind {
    /// Fixed, user-presentable message for this kind.
    pub fn user_message(&self) -> &'static str {
        match self {
            SyncFailureKind::Initialization => "Unable to start metadata synchronization",
            SyncFailureKind::Subscription => "Metadata synchronization was interrupted",
            SyncFailureKind::ProtocolViolation => "Metadata synchronization reported invalid progress",
        }
    }
}

/// A sync failure as shown to users.
///
/// Carries only a stable message; the underlying cause goes to logs and the
/// diagnostic sink.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SyncFailure {
    pub kind: SyncFailureKind,
    pub message: String,
}

impl SyncFailure {
    pub fn new(kind: SyncFailureKind) -> Self {
        Self {
            kind,
            message: kind.user_message().to_string(),
        }
    }
}

impl fmt::Display for SyncFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.message)
    }
}

/// A failed query as shown to users.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct QueryFailure {
    pub kind: QueryKind,
    pub message: String,
}

impl QueryFailure {
    pub fn new(kind: QueryKind) -> Self {
        let message = match kind {
            QueryKind::Search => "Search is unavailable right now",
            QueryKind::Latest => "Latest files are unavailable right now",
        };
        Self {
            kind,
            message: message.to_string(),
        }
    }
}

impl fmt::Display for QueryFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.message)
    }
}

/// Snapshot of every observable field.
#[derive(Debug, Clone, PartialEq, Default, Serialize)]
pub struct CoreState {
    /// Records of the most recent completed query
    pub search_results: Vec<InodeRecord>,
    /// True from query dispatch until its result (or failure) is published
    pub loading_search_results: bool,
    /// Total matches for the most recent query, for pagination
    pub total: u64,
    /// Set when the most recent query failed
    pub query_error: Option<QueryFailure>,
    /// Inodes replicated so far
    pub inodes_synced: u64,
    /// Inodes to replicate; `None` until the first sync state is read
    pub total_inodes_to_sync: Option<u64>,
    /// Set when synchronization failed
    pub sync_error: Option<SyncFailure>,
}

impl CoreState {
    /// True once every known inode is synced.
    ///
    /// Always false while the total is unknown.
    pub fn is_synchronized(&self) -> bool {
        self.total_inodes_to_sync == Some(self.inodes_synced)
    }
}

/// Shared owner of the observable state.
#[derive(Debug)]
pub struct StateStore {
    sender: watch::Sender<CoreState>,
}

impl StateStore {
    pub fn new() -> Self {
        let (sender, _) = watch::channel(CoreState::default());
        Self { sender }
    }

    /// Clone of the current state.
    pub fn snapshot(&self) -> CoreState {
        self.sender.borrow().clone()
    }

    /// Read the current state without cloning it.
    ///
    /// The closure runs under the channel's read lock, so keep it short.
    pub fn read<R>(&self, f: impl FnOnce(&CoreState) -> R) -> R {
        f(&self.sender.borrow())
    }

    /// Apply `f` as one atomic update and notify observers.
    ///
    /// Anything the caller needs out of the update is written into its own
    /// locals from inside `f`.
    pub fn update(&self, f: impl FnOnce(&mut CoreState)) {
        self.sender.send_modify(f);
    }

    /// New observer; it starts with the current state marked as seen.
    pub fn subscribe(&self) -> watch::Receiver<CoreState> {
        self.sender.subscribe()
    }

    pub fn is_synchronized(&self) -> bool {
        self.read(CoreState::is_synchronized)
    }
}

impl Default for StateStore {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_initial_state() {
        let state = CoreState::default();
        assert!(state.search_results.is_empty());
        assert!(!state.loading_search_results);
        assert_eq!(state.inodes_synced, 0);
        assert_eq!(state.total_inodes_to_sync, None);
        assert!(state.sync_error.is_none());
        assert!(!state.is_synchronized());
    }

    #[test]
    fn test_is_synchronized_requires_known_total() {
        let mut state = CoreState::default();
        assert!(!state.is_synchronized());

        state.total_inodes_to_sync = Some(0);
        assert!(state.is_synchronized());

        state.total_inodes_to_sync = Some(100);
        state.inodes_synced = 5;
        assert!(!state.is_synchronized());

        state.inodes_synced = 100;
        assert!(state.is_synchronized());
    }

    #[test]
    fn test_failure_messages_are_stable() {
        let failure = SyncFailure::new(SyncFailureKind::Initialization);
        assert_eq!(failure.to_string(), "Unable to start metadata synchronization");
        assert_eq!(failure, SyncFailure::new(SyncFailureKind::Initialization));

        let query = QueryFailure::new(QueryKind::Latest);
        assert_eq!(query.kind, QueryKind::Latest);
        assert!(!query.message.is_empty());
    }

    #[test]
    fn test_update_hands_out_previous_value() {
        let store = StateStore::new();
        let mut previous = None;
        store.update(|state| {
            previous = Some(state.inodes_synced);
            state.inodes_synced = 42;
        });

        assert_eq!(previous, Some(0));
        assert_eq!(store.snapshot().inodes_synced, 42);
    }

    #[tokio::test]
    async fn test_observer_sees_batched_update() {
        let store = StateStore::new();
        let mut observer = store.subscribe();

        store.update(|state| {
            state.loading_search_results = true;
        });
        store.update(|state| {
            state.search_results = vec![InodeRecord::new("bafy1", "a.txt")];
            state.total = 1;
            state.loading_search_results = false;
        });

        observer.changed().await.unwrap();
        let seen = observer.borrow_and_update().clone();
        assert_eq!(seen.search_results.len(), 1);
        assert_eq!(seen.total, 1);
        assert!(!seen.loading_search_results);
    }

    #[test]
    fn test_update_without_observers() {
        let store = StateStore::new();
        store.update(|state| state.total = 3);
        assert_eq!(store.read(|state| state.total), 3);
    }
}
