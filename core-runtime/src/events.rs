//! # Event Bus System
//!
//! Discrete notifications about sync and query activity, published on a
//! `broadcast` channel alongside the continuous [`StateStore`](crate::state::StateStore).
//!
//! The state surface answers "what is true now"; the event bus answers "what
//! just happened" (a session started, a stale query result was dropped) for
//! hosts that want to log, animate or count transitions.
//!
//! ## Usage
//!
//! ```rust
//! use core_runtime::events::{CoreEvent, EventBus, SyncEvent};
//!
//! # #[tokio::main]
//! # async fn main() {
//! let bus = EventBus::new(100);
//! let mut subscriber = bus.subscribe();
//!
//! bus.emit(CoreEvent::Sync(SyncEvent::Progress { synced: 5, total: 100 })).ok();
//!
//! let event = subscriber.recv().await.unwrap();
//! assert!(matches!(event, CoreEvent::Sync(SyncEvent::Progress { .. })));
//! # }
//! ```
//!
//! ## Error Handling
//!
//! - **`RecvError::Lagged(n)`**: the subscriber missed `n` events; it can keep
//!   receiving newer ones.
//! - **`RecvError::Closed`**: every sender was dropped; treat as shutdown.
//!
//! Emitting with no subscribers returns an error that publishers ignore with
//! `.ok()`.

use crate::state::{QueryKind, SyncFailureKind};
use core_async::sync::broadcast;
use serde::Serialize;
use std::fmt;

pub use core_async::sync::broadcast::error::{RecvError, SendError};
pub use core_async::sync::broadcast::Receiver;

/// Default buffer size for the event bus channel.
pub const DEFAULT_EVENT_BUFFER_SIZE: usize = 100;

// ============================================================================
// Core Event Types
// ============================================================================

/// Top-level event published on the bus.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
#[serde(tag = "type", content = "payload")]
pub enum CoreEvent {
    Sync(SyncEvent),
    Query(QueryEvent),
}

impl CoreEvent {
    /// Returns a human-readable description of the event.
    pub fn description(&self) -> &str {
        match self {
            CoreEvent::Sync(e) => e.description(),
            CoreEvent::Query(e) => e.description(),
        }
    }

    /// Returns the severity level of the event.
    pub fn severity(&self) -> EventSeverity {
        match self {
            CoreEvent::Sync(SyncEvent::Failed { .. }) => EventSeverity::Error,
            CoreEvent::Query(QueryEvent::Failed { .. }) => EventSeverity::Warning,
            CoreEvent::Sync(SyncEvent::Synchronized { .. }) => EventSeverity::Info,
            _ => EventSeverity::Debug,
        }
    }
}

/// Event severity levels for filtering and logging.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
pub enum EventSeverity {
    Debug,
    Info,
    Warning,
    Error,
}

/// Sync session lifecycle.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
#[serde(tag = "event")]
pub enum SyncEvent {
    /// A new session started initializing.
    Started {
        /// Monotonic session number; bumps on every start and on clear.
        session: u64,
    },
    /// Progress was published.
    Progress { synced: u64, total: u64 },
    /// Every known inode is synced.
    Synchronized { total: u64 },
    /// The session failed and stopped.
    Failed { kind: SyncFailureKind },
    /// Progress was reset.
    Cleared,
}

impl SyncEvent {
    fn description(&self) -> &str {
        match self {
            SyncEvent::Started { .. } => "Sync session started",
            SyncEvent::Progress { .. } => "Sync progress updated",
            SyncEvent::Synchronized { .. } => "Metadata fully synchronized",
            SyncEvent::Failed { .. } => "Sync failed",
            SyncEvent::Cleared => "Sync progress cleared",
        }
    }
}

/// Query lifecycle.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
#[serde(tag = "event")]
pub enum QueryEvent {
    Dispatched {
        request_id: u64,
        kind: QueryKind,
        page: u32,
    },
    Completed {
        request_id: u64,
        kind: QueryKind,
        page: u32,
        items: usize,
        total: u64,
    },
    Failed {
        request_id: u64,
        kind: QueryKind,
        page: u32,
    },
    /// A result arrived after a newer query was dispatched and was dropped.
    Discarded { request_id: u64, kind: QueryKind },
}

impl QueryEvent {
    fn description(&self) -> &str {
        match self {
            QueryEvent::Dispatched { .. } => "Query dispatched",
            QueryEvent::Completed { .. } => "Query completed",
            QueryEvent::Failed { .. } => "Query failed",
            QueryEvent::Discarded { .. } => "Stale query result discarded",
        }
    }
}

// ============================================================================
// Event Bus
// ============================================================================

/// Broadcast channel for [`CoreEvent`]s.
///
/// Cloning is cheap; all clones publish to the same subscribers.
#[derive(Clone)]
pub struct EventBus {
    sender: broadcast::Sender<CoreEvent>,
}

impl EventBus {
    /// Creates a new event bus buffering up to `capacity` events per subscriber.
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self { sender }
    }

    /// Publishes an event, returning how many subscribers received it.
    pub fn emit(&self, event: CoreEvent) -> Result<usize, SendError<CoreEvent>> {
        self.sender.send(event)
    }

    /// Creates a new subscriber. Past events are not replayed.
    pub fn subscribe(&self) -> Receiver<CoreEvent> {
        self.sender.subscribe()
    }

    pub fn subscriber_count(&self) -> usize {
        self.sender.receiver_count()
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new(DEFAULT_EVENT_BUFFER_SIZE)
    }
}

impl fmt::Debug for EventBus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EventBus")
            .field("subscriber_count", &self.subscriber_count())
            .finish()
    }
}

// ============================================================================
// Event Stream Wrapper
// ============================================================================

type EventFilter = Box<dyn Fn(&CoreEvent) -> bool + Send + Sync>;

/// A `broadcast::Receiver` with an optional filter.
///
/// ```rust
/// use core_runtime::events::{CoreEvent, EventBus, EventStream};
///
/// let bus = EventBus::default();
/// let sync_only = EventStream::new(bus.subscribe())
///     .filter(|event| matches!(event, CoreEvent::Sync(_)));
/// ```
pub struct EventStream {
    receiver: Receiver<CoreEvent>,
    filter: Option<EventFilter>,
}

impl EventStream {
    pub fn new(receiver: Receiver<CoreEvent>) -> Self {
        Self {
            receiver,
            filter: None,
        }
    }

    /// Only events matching `predicate` are returned by `recv()`.
    pub fn filter<F>(mut self, predicate: F) -> Self
    where
        F: Fn(&CoreEvent) -> bool + Send + Sync + 'static,
    {
        self.filter = Some(Box::new(predicate));
        self
    }

    /// Receives the next event that passes the filter.
    ///
    /// # Errors
    ///
    /// Returns `RecvError::Lagged(n)` if the subscriber fell behind by `n` events.
    /// Returns `RecvError::Closed` if all senders have been dropped.
    pub async fn recv(&mut self) -> Result<CoreEvent, RecvError> {
        loop {
            let event = self.receiver.recv().await?;

            let Some(filter) = &self.filter else {
                return Ok(event);
            };

            if filter(&event) {
                return Ok(event);
            }
        }
    }
}

impl fmt::Debug for EventStream {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EventStream")
            .field("has_filter", &self.filter.is_some())
            .finish()
    }
}
