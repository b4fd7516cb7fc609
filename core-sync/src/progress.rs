//! Sync progress values.
//!
//! `total_inodes_to_sync` is `None` until the first sync state is read and
//! after a clear. A progress with an unknown total is never synchronized.

use crate::error::{Result, SyncError};
use bridge_traits::metadata::SyncState;
use core_runtime::state::CoreState;
use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct SyncProgress {
    pub inodes_synced: u64,
    pub total_inodes_to_sync: Option<u64>,
}

/// Outcome of offering a store update to the current progress.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Advance {
    /// The update is valid and not behind the current count.
    Applied(SyncProgress),
    /// The update reports fewer inodes than already published.
    Regressed,
}

impl SyncProgress {
    pub fn new(inodes_synced: u64, total_inodes_to_sync: u64) -> Self {
        Self {
            inodes_synced,
            total_inodes_to_sync: Some(total_inodes_to_sync),
        }
    }

    /// Progress published in `state`.
    pub fn of(state: &CoreState) -> Self {
        Self {
            inodes_synced: state.inodes_synced,
            total_inodes_to_sync: state.total_inodes_to_sync,
        }
    }

    /// Validate a store-reported state.
    ///
    /// # Errors
    ///
    /// [`SyncError::ProtocolViolation`] when more inodes are synced than exist.
    pub fn from_sync_state(update: SyncState) -> Result<Self> {
        if update.num_synced > update.total {
            return Err(SyncError::ProtocolViolation {
                synced: update.num_synced,
                total: update.total,
            });
        }
        Ok(Self::new(update.num_synced, update.total))
    }

    /// Check `update` against this progress.
    ///
    /// Invalid updates are errors; valid updates behind the current count are
    /// [`Advance::Regressed`] and must not be published.
    pub fn advance(&self, update: SyncState) -> Result<Advance> {
        let next = Self::from_sync_state(update)?;
        if next.inodes_synced < self.inodes_synced {
            return Ok(Advance::Regressed);
        }
        Ok(Advance::Applied(next))
    }

    pub fn apply_to(&self, state: &mut CoreState) {
        state.inodes_synced = self.inodes_synced;
        state.total_inodes_to_sync = self.total_inodes_to_sync;
    }

    pub fn is_synchronized(&self) -> bool {
        self.total_inodes_to_sync == Some(self.inodes_synced)
    }

    /// Completion percentage, 0 while the total is unknown.
    pub fn percent(&self) -> u8 {
        match self.total_inodes_to_sync {
            None => 0,
            Some(0) => 100,
            Some(total) => {
                let percent = self.inodes_synced.saturating_mul(100) / total;
                percent.min(100) as u8
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_is_unbounded() {
        let progress = SyncProgress::default();
        assert_eq!(progress.inodes_synced, 0);
        assert_eq!(progress.total_inodes_to_sync, None);
        assert!(!progress.is_synchronized());
        assert_eq!(progress.percent(), 0);
    }

    #[test]
    fn test_synchronized_only_with_known_total() {
        assert!(!SyncProgress::new(5, 100).is_synchronized());
        assert!(SyncProgress::new(100, 100).is_synchronized());
        assert!(SyncProgress::new(0, 0).is_synchronized());
    }

    #[test]
    fn test_from_sync_state_rejects_overshoot() {
        let err = SyncProgress::from_sync_state(SyncState::new(101, 100)).unwrap_err();
        assert!(matches!(
            err,
            SyncError::ProtocolViolation {
                synced: 101,
                total: 100
            }
        ));
    }

    #[test]
    fn test_advance() {
        let current = SyncProgress::new(10, 100);

        assert_eq!(
            current.advance(SyncState::new(20, 100)).unwrap(),
            Advance::Applied(SyncProgress::new(20, 100))
        );
        assert_eq!(
            current.advance(SyncState::new(10, 100)).unwrap(),
            Advance::Applied(current)
        );
        assert_eq!(
            current.advance(SyncState::new(4, 100)).unwrap(),
            Advance::Regressed
        );
        assert!(current.advance(SyncState::new(200, 100)).is_err());
    }

    #[test]
    fn test_total_may_grow_while_syncing() {
        let current = SyncProgress::new(50, 100);
        assert_eq!(
            current.advance(SyncState::new(60, 250)).unwrap(),
            Advance::Applied(SyncProgress::new(60, 250))
        );
    }

    #[test]
    fn test_percent() {
        assert_eq!(SyncProgress::new(5, 100).percent(), 5);
        assert_eq!(SyncProgress::new(1, 3).percent(), 33);
        assert_eq!(SyncProgress::new(100, 100).percent(), 100);
        assert_eq!(SyncProgress::new(0, 0).percent(), 100);
    }

    #[test]
    fn test_round_trip_through_state() {
        let mut state = CoreState::default();
        SyncProgress::new(5, 100).apply_to(&mut state);

        assert_eq!(state.inodes_synced, 5);
        assert_eq!(state.total_inodes_to_sync, Some(100));
        assert_eq!(SyncProgress::of(&state), SyncProgress::new(5, 100));
    }
}
