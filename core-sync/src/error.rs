use bridge_traits::error::BridgeError;
use core_runtime::state::SyncFailure;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum SyncError {
    #[error("Store error: {0}")]
    Store(#[from] BridgeError),

    #[error("Store reported {synced} inodes synced out of {total}")]
    ProtocolViolation { synced: u64, total: u64 },

    /// Carries only the user-facing failure; the cause was logged.
    #[error("{0}")]
    Failed(SyncFailure),
}

pub type Result<T> = std::result::Result<T, SyncError>;
