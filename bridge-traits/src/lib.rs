//! # Host Bridge Traits
//!
//! The contract between the index core and the components the host owns.
//!
//! ## Overview
//!
//! The core coordinates synchronization and queries but does not own the
//! metadata database itself: record persistence, indexing, sync-state
//! computation and the content-addressed fetch pipeline all live behind the
//! traits in this crate.
//!
//! ## Traits
//!
//! - [`MetadataStore`](metadata::MetadataStore) - Sync state, progress stream, search and listing
//! - [`MetadataStoreFactory`](metadata::MetadataStoreFactory) - Opens the store on first use
//! - [`DiagnosticSink`](diagnostics::DiagnosticSink) - Receives structured diagnostics from the core
//!
//! ## Error Handling
//!
//! All bridge traits use [`BridgeError`](error::BridgeError). Implementations
//! should convert storage-specific failures into it and keep messages
//! actionable; the core logs them but never shows them to end users.
//!
//! ## Thread Safety
//!
//! All bridge traits require `Send + Sync` so a single store can be shared
//! between the sync coordinator and the query service.

pub mod diagnostics;
pub mod error;
pub mod metadata;

pub use error::BridgeError;

pub use diagnostics::{Diagnostic, DiagnosticLevel, DiagnosticSink};
pub use metadata::{
    InodeRecord, MetadataStore, MetadataStoreFactory, ProgressStream, RecordPage, SyncState,
};
