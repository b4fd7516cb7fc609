//! # Sync Module
//!
//! Keeps the published sync progress in step with the metadata store.
//!
//! ## Overview
//!
//! This module manages:
//! - Sync sessions: initial sync-state read plus a progress subscription
//! - Validation of store-reported progress
//! - The optional auto-sync watcher that restarts sessions while the index is
//!   not synchronized
//!
//! ## Components
//!
//! - **Sync Coordinator** (`coordinator`): Session lifecycle, `initialize`, `clear`
//! - **Progress** (`progress`): Progress values, validation and percentages
//! - **Watcher** (`watcher`): Auto-sync re-initialization

pub mod coordinator;
pub mod error;
pub mod progress;
mod watcher;

#[cfg(test)]
mod test_support;

pub use coordinator::{SessionPhase, SyncCoordinator};
pub use error::{Result, SyncError};
pub use progress::{Advance, SyncProgress};
