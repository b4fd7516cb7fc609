//! Auto-sync watcher.
//!
//! Re-runs `initialize()` whenever the published `(inodes_synced,
//! total_inodes_to_sync)` pair changes while the index is not synchronized,
//! plus once at install and once after every clear. Changes to other fields
//! (a new `sync_error`, query results) do not count, so a store that keeps
//! failing is retried on the next progress change rather than in a loop.

use crate::coordinator::SyncCoordinator;
use crate::progress::SyncProgress;
use core_async::sync::CancellationToken;
use core_async::task::JoinHandle;
use tracing::{debug, instrument};

pub(crate) fn spawn(coordinator: SyncCoordinator, token: CancellationToken) -> JoinHandle<()> {
    core_async::task::spawn(watch(coordinator, token))
}

#[instrument(skip_all)]
async fn watch(coordinator: SyncCoordinator, token: CancellationToken) {
    let mut observer = coordinator.state().subscribe();
    let rearm = coordinator.rearm_signal();
    let mut last_seen: Option<SyncProgress> = None;

    loop {
        let progress = SyncProgress::of(&observer.borrow_and_update());

        if last_seen != Some(progress) {
            last_seen = Some(progress);
            if !progress.is_synchronized() {
                debug!(
                    synced = progress.inodes_synced,
                    total = ?progress.total_inodes_to_sync,
                    "Index not synchronized, initializing"
                );
                // Failures are already published as sync_error
                if let Err(e) = coordinator.initialize().await {
                    debug!(error = %e, "Auto-sync initialization failed");
                }
                continue;
            }
        }

        core_async::select! {
            _ = token.cancelled() => {
                debug!("Auto-sync watcher stopped");
                return;
            }
            changed = observer.changed() => {
                if changed.is_err() {
                    return;
                }
            }
            _ = rearm.notified() => {
                last_seen = None;
            }
        }
    }
}
