//! # Sync Coordinator
//!
//! Drives replication of the metadata store and publishes its progress.
//!
//! ## Overview
//!
//! A sync *session* is one call to [`SyncCoordinator::initialize`] and the
//! progress subscription it opens:
//!
//! 1. Open the store through the shared [`StoreHandle`]
//! 2. Read the current sync state and publish it
//! 3. Subscribe to the progress stream and publish each update from a
//!    background task
//!
//! At most one session runs at a time. `initialize()` while a session is
//! starting or streaming returns immediately.
//!
//! ## Failures
//!
//! A failure in steps 1-3, or an error item on the progress stream, ends the
//! session and sets `sync_error` to a fixed [`SyncFailure`]. The underlying
//! error goes to the log and the diagnostic sink only. A stream update that
//! reports more inodes synced than exist sets a `ProtocolViolation` failure
//! but the session keeps streaming; an update behind the published count is
//! dropped with a warning.
//!
//! ## Clearing
//!
//! [`SyncCoordinator::clear`] cancels the running session, resets progress
//! and `sync_error`, and bumps the session generation. Anything a superseded
//! session tries to publish afterwards is ignored.
//!
//! ## Usage
//!
//! ```rust,ignore
//! use core_sync::SyncCoordinator;
//!
//! let coordinator = SyncCoordinator::new(handle, state, events, diagnostics);
//! coordinator.start(true); // re-initialize whenever the index falls out of sync
//! coordinator.initialize().await?;
//! ```

use crate::error::{Result, SyncError};
use crate::progress::{Advance, SyncProgress};
use crate::watcher;
use bridge_traits::error::BridgeError;
use bridge_traits::metadata::{ProgressStream, SyncState};
use core_async::sync::{CancellationToken, Mutex, Notify};
use core_library::StoreHandle;
use core_runtime::diagnostics::{targets, DiagnosticReporter};
use core_runtime::events::{CoreEvent, EventBus, SyncEvent};
use core_runtime::state::{CoreState, StateStore, SyncFailure, SyncFailureKind};
use futures::StreamExt;
use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tracing::{debug, info, instrument};

/// Where the current session is.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SessionPhase {
    /// No session; `initialize()` starts one.
    #[default]
    Idle,
    /// Opening the store or reading the initial sync state.
    Starting,
    /// Reading the progress stream.
    Streaming,
}

#[derive(Debug, Default)]
struct Session {
    phase: SessionPhase,
    generation: u64,
    cancel: Option<CancellationToken>,
}

/// A failure while opening a session.
struct StartFailure {
    kind: SyncFailureKind,
    cause: SyncError,
}

impl StartFailure {
    fn initialization(cause: BridgeError) -> Self {
        Self {
            kind: SyncFailureKind::Initialization,
            cause: SyncError::Store(cause),
        }
    }
}

/// Sync coordinator. Cloning is cheap; clones share sessions and state.
#[derive(Clone)]
pub struct SyncCoordinator {
    handle: Arc<StoreHandle>,
    state: Arc<StateStore>,
    events: EventBus,
    diagnostics: DiagnosticReporter,
    session: Arc<Mutex<Session>>,
    watching: Arc<AtomicBool>,
    rearm: Arc<Notify>,
    shutdown: CancellationToken,
}

impl SyncCoordinator {
    pub fn new(
        handle: Arc<StoreHandle>,
        state: Arc<StateStore>,
        events: EventBus,
        diagnostics: DiagnosticReporter,
    ) -> Self {
        Self {
            handle,
            state,
            events,
            diagnostics,
            session: Arc::new(Mutex::new(Session::default())),
            watching: Arc::new(AtomicBool::new(false)),
            rearm: Arc::new(Notify::new()),
            shutdown: CancellationToken::new(),
        }
    }

    /// Install the auto-sync watcher when `auto_sync` is set.
    ///
    /// The watcher calls [`initialize`](Self::initialize) once now and again
    /// whenever published progress changes while the index is not
    /// synchronized. Only one watcher is ever installed per coordinator.
    /// Must be called from within the async runtime.
    pub fn start(&self, auto_sync: bool) {
        if !auto_sync {
            debug!("Auto-sync disabled");
            return;
        }

        if self.watching.swap(true, Ordering::SeqCst) {
            debug!("Auto-sync watcher already installed");
            return;
        }

        watcher::spawn(self.clone(), self.shutdown.clone());
        info!("Auto-sync watcher installed");
    }

    pub fn is_watching(&self) -> bool {
        self.watching.load(Ordering::SeqCst)
    }

    /// Start a sync session unless one is already running.
    ///
    /// Returns once the initial sync state is published and the progress
    /// subscription is open; progress is then published in the background.
    ///
    /// # Errors
    ///
    /// [`SyncError::Failed`] with the same failure that was published as
    /// `sync_error`.
    #[instrument(skip(self))]
    pub async fn initialize(&self) -> Result<()> {
        let (generation, token) = {
            let mut session = self.session.lock().await;
            if self.shutdown.is_cancelled() {
                debug!("Coordinator shut down, not starting a session");
                return Ok(());
            }
            if session.phase != SessionPhase::Idle {
                debug!(phase = ?session.phase, "Sync session already active");
                return Ok(());
            }
            session.generation += 1;
            session.phase = SessionPhase::Starting;
            let token = self.shutdown.child_token();
            session.cancel = Some(token.clone());
            (session.generation, token)
        };

        info!(session = generation, "Starting sync session");
        self.events
            .emit(CoreEvent::Sync(SyncEvent::Started {
                session: generation,
            }))
            .ok();

        match self.open_session(generation).await {
            Ok(Some(stream)) => {
                let coordinator = self.clone();
                core_async::task::spawn(async move {
                    coordinator.run_session(generation, stream, token).await;
                });
                Ok(())
            }
            Ok(None) => Ok(()),
            Err(failure) => {
                if self.fail(generation, failure.kind, &failure.cause).await {
                    Err(SyncError::Failed(SyncFailure::new(failure.kind)))
                } else {
                    Ok(())
                }
            }
        }
    }

    /// Cancel the running session and reset progress and `sync_error`.
    pub async fn clear(&self) {
        self.clear_with(|_| {}).await;
    }

    /// [`clear`](Self::clear), also applying `reset` in the same state update.
    ///
    /// Observers see the sync reset and `reset` land together.
    #[instrument(skip_all)]
    pub async fn clear_with<F>(&self, reset: F)
    where
        F: FnOnce(&mut CoreState) + Send,
    {
        let mut session = self.session.lock().await;
        session.generation += 1;
        session.phase = SessionPhase::Idle;
        if let Some(token) = session.cancel.take() {
            token.cancel();
        }
        self.state.update(|state| {
            reset(state);
            SyncProgress::default().apply_to(state);
            state.sync_error = None;
        });
        drop(session);

        self.events.emit(CoreEvent::Sync(SyncEvent::Cleared)).ok();
        if self.is_watching() {
            self.rearm.notify_one();
        }
        info!("Sync progress cleared");
    }

    /// Stop the watcher and the running session for good.
    pub fn shutdown(&self) {
        if !self.shutdown.is_cancelled() {
            self.shutdown.cancel();
            info!("Sync coordinator shut down");
        }
    }

    pub fn is_synchronized(&self) -> bool {
        self.state.is_synchronized()
    }

    /// Currently published progress.
    pub fn progress(&self) -> SyncProgress {
        self.state.read(SyncProgress::of)
    }

    pub async fn phase(&self) -> SessionPhase {
        self.session.lock().await.phase
    }

    pub(crate) fn state(&self) -> &StateStore {
        &self.state
    }

    pub(crate) fn rearm_signal(&self) -> Arc<Notify> {
        Arc::clone(&self.rearm)
    }

    async fn open_session(
        &self,
        generation: u64,
    ) -> std::result::Result<Option<ProgressStream>, StartFailure> {
        let store = self
            .handle
            .get()
            .await
            .map_err(StartFailure::initialization)?;

        let initial = store
            .get_sync_state()
            .await
            .map_err(StartFailure::initialization)?;
        let progress = SyncProgress::from_sync_state(initial).map_err(|cause| StartFailure {
            kind: SyncFailureKind::ProtocolViolation,
            cause,
        })?;

        if !self.publish_initial(generation, progress).await {
            return Ok(None);
        }

        let stream = store
            .start_sync()
            .await
            .map_err(StartFailure::initialization)?;

        let mut session = self.session.lock().await;
        if session.generation != generation {
            debug!(session = generation, "Session superseded before streaming");
            return Ok(None);
        }
        session.phase = SessionPhase::Streaming;
        Ok(Some(stream))
    }

    async fn publish_initial(&self, generation: u64, progress: SyncProgress) -> bool {
        let session = self.session.lock().await;
        if session.generation != generation {
            debug!(session = generation, "Session superseded before initial state");
            return false;
        }
        // Progress is only written under the session lock
        let was_synchronized = self.state.is_synchronized();
        self.state.update(|state| {
            progress.apply_to(state);
            state.sync_error = None;
        });
        drop(session);

        debug!(
            synced = progress.inodes_synced,
            total = ?progress.total_inodes_to_sync,
            "Initial sync state published"
        );
        self.announce(progress, was_synchronized);
        true
    }

    #[instrument(skip(self, stream, token))]
    async fn run_session(
        self,
        generation: u64,
        mut stream: ProgressStream,
        token: CancellationToken,
    ) {
        loop {
            let next = core_async::select! {
                _ = token.cancelled() => {
                    debug!("Sync session cancelled");
                    self.finish_session(generation, "cancelled").await;
                    return;
                }
                next = stream.next() => next,
            };

            match next {
                Some(Ok(update)) => self.apply_progress(generation, update).await,
                Some(Err(e)) => {
                    self.fail(generation, SyncFailureKind::Subscription, &SyncError::Store(e))
                        .await;
                    return;
                }
                None => {
                    self.finish_session(generation, "progress stream ended").await;
                    return;
                }
            }
        }
    }

    async fn apply_progress(&self, generation: u64, update: SyncState) {
        let session = self.session.lock().await;
        if session.generation != generation {
            return;
        }
        // Progress is only written under the session lock
        let previous = self.progress();
        let outcome = previous.advance(update);
        match &outcome {
            Ok(Advance::Applied(next)) => self.state.update(|state| next.apply_to(state)),
            Ok(Advance::Regressed) => {}
            Err(_) => self.state.update(|state| {
                state.sync_error = Some(SyncFailure::new(SyncFailureKind::ProtocolViolation))
            }),
        }
        drop(session);

        match outcome {
            Ok(Advance::Applied(next)) => self.announce(next, previous.is_synchronized()),
            Ok(Advance::Regressed) => self
                .diagnostics
                .warn(targets::SYNC, "Dropped progress update behind published count")
                .field("session", generation)
                .field("published", previous.inodes_synced)
                .field("received", update.num_synced)
                .emit(),
            Err(violation) => {
                self.diagnostics
                    .error(targets::SYNC, "Store reported invalid sync progress")
                    .field("session", generation)
                    .cause(&violation)
                    .emit();
                self.events
                    .emit(CoreEvent::Sync(SyncEvent::Failed {
                        kind: SyncFailureKind::ProtocolViolation,
                    }))
                    .ok();
            }
        }
    }

    fn announce(&self, progress: SyncProgress, was_synchronized: bool) {
        let Some(total) = progress.total_inodes_to_sync else {
            return;
        };
        self.events
            .emit(CoreEvent::Sync(SyncEvent::Progress {
                synced: progress.inodes_synced,
                total,
            }))
            .ok();

        if progress.is_synchronized() && !was_synchronized {
            info!(total, "Metadata index synchronized");
            self.events
                .emit(CoreEvent::Sync(SyncEvent::Synchronized { total }))
                .ok();
        }
    }

    /// End the session with `kind`. Returns false if the session was superseded.
    async fn fail(&self, generation: u64, kind: SyncFailureKind, cause: &SyncError) -> bool {
        let mut session = self.session.lock().await;
        if session.generation != generation {
            debug!(session = generation, error = %cause, "Ignoring failure of superseded session");
            return false;
        }
        session.phase = SessionPhase::Idle;
        session.cancel = None;
        self.state
            .update(|state| state.sync_error = Some(SyncFailure::new(kind)));
        drop(session);

        self.diagnostics
            .error(targets::SYNC, "Sync session failed")
            .field("session", generation)
            .field("kind", format!("{:?}", kind))
            .cause(cause)
            .emit();
        self.events
            .emit(CoreEvent::Sync(SyncEvent::Failed { kind }))
            .ok();
        true
    }

    /// Return to `Idle` unless a newer session or a clear took over.
    async fn finish_session(&self, generation: u64, reason: &str) {
        let mut session = self.session.lock().await;
        if session.generation != generation {
            return;
        }
        session.phase = SessionPhase::Idle;
        session.cancel = None;
        info!(session = generation, reason, "Sync session ended");
    }
}

impl fmt::Debug for SyncCoordinator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SyncCoordinator")
            .field("handle", &self.handle)
            .field("watching", &self.is_watching())
            .field("shut_down", &self.shutdown.is_cancelled())
            .finish()
    }
}
