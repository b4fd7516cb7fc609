//! Metadata Store Abstraction
//!
//! The host-side metadata database that replicates file metadata from the
//! content network. The core only talks to it through [`MetadataStore`]:
//!
//! - read the current sync state
//! - open a progress subscription while replication runs
//! - run paginated searches and "latest" listings over the local view
//! - wipe the local data
//!
//! ## Usage
//!
//! ```ignore
//! use bridge_traits::metadata::{MetadataStore, MetadataStoreFactory};
//! use futures::StreamExt;
//!
//! let store = factory.open().await?;
//! let state = store.get_sync_state().await?;
//! println!("{} of {} synced", state.num_synced, state.total);
//!
//! let mut progress = store.start_sync().await?;
//! while let Some(update) = progress.next().await {
//!     let update = update?;
//!     println!("{} of {}", update.num_synced, update.total);
//! }
//! ```

use std::sync::Arc;

use chrono::{DateTime, Utc};
use futures::stream::BoxStream;
use serde::{Deserialize, Serialize};

use crate::error::Result;

/// Progress of local replication as reported by the store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SyncState {
    /// Number of inodes replicated so far
    pub num_synced: u64,
    /// Number of inodes to replicate in total
    pub total: u64,
}

impl SyncState {
    pub fn new(num_synced: u64, total: u64) -> Self {
        Self { num_synced, total }
    }
}

/// A file-metadata record as stored by the host database.
///
/// The core passes these through to observers unchanged; only the store
/// decides what goes into them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InodeRecord {
    /// Content identifier of the file
    pub cid: String,
    /// File name
    pub name: String,
    /// Path of the file inside its root directory, if known
    #[serde(default)]
    pub path: Option<String>,
    /// Size in bytes
    #[serde(default)]
    pub size: Option<u64>,
    /// Detected MIME type
    #[serde(default)]
    pub mime_type: Option<String>,
    /// When the record was indexed locally
    #[serde(default)]
    pub indexed_at: Option<DateTime<Utc>>,
    /// Store-specific extra fields
    #[serde(default)]
    pub attributes: serde_json::Map<String, serde_json::Value>,
}

impl InodeRecord {
    pub fn new(cid: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            cid: cid.into(),
            name: name.into(),
            path: None,
            size: None,
            mime_type: None,
            indexed_at: None,
            attributes: serde_json::Map::new(),
        }
    }

    pub fn with_size(mut self, size: u64) -> Self {
        self.size = Some(size);
        self
    }

    pub fn with_mime_type(mut self, mime_type: impl Into<String>) -> Self {
        self.mime_type = Some(mime_type.into());
        self
    }
}

/// One page of records plus the total number of matches.
///
/// `total` counts every match available to the query, not just `data`.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct RecordPage {
    pub data: Vec<InodeRecord>,
    pub total: u64,
}

impl RecordPage {
    pub fn new(data: Vec<InodeRecord>, total: u64) -> Self {
        Self { data, total }
    }
}

/// Incremental sync progress.
///
/// Yields a new [`SyncState`] each time replication advances. An `Err` item
/// reports a failed session; the stream ends when the store stops syncing.
/// Dropping the stream unsubscribes.
pub type ProgressStream = BoxStream<'static, Result<SyncState>>;

/// Metadata database capability.
///
/// Implementations must be safe to call concurrently: the core may run a
/// query while a progress subscription is open.
#[async_trait::async_trait]
pub trait MetadataStore: Send + Sync {
    /// Current replication progress.
    async fn get_sync_state(&self) -> Result<SyncState>;

    /// Start (or join) replication and subscribe to its progress.
    async fn start_sync(&self) -> Result<ProgressStream>;

    /// Full-text search over the local records.
    async fn search(&self, query: &str, limit: u32, offset: u64) -> Result<RecordPage>;

    /// Most recently indexed records.
    async fn latest(&self, limit: u32, offset: u64) -> Result<RecordPage>;

    /// Remove all locally replicated data.
    async fn clear_data(&self) -> Result<()>;
}

/// Opens the metadata database.
///
/// Opening is expensive (it may connect to the content network), so the core
/// calls this at most once per successful open.
#[async_trait::async_trait]
pub trait MetadataStoreFactory: Send + Sync {
    async fn open(&self) -> Result<Arc<dyn MetadataStore>>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_record_builder() {
        let record = InodeRecord::new("bafy123", "report.pdf")
            .with_size(2048)
            .with_mime_type("application/pdf");

        assert_eq!(record.cid, "bafy123");
        assert_eq!(record.name, "report.pdf");
        assert_eq!(record.size, Some(2048));
        assert_eq!(record.mime_type.as_deref(), Some("application/pdf"));
        assert!(record.attributes.is_empty());
    }

    #[test]
    fn test_record_deserializes_with_missing_optionals() {
        let record: InodeRecord =
            serde_json::from_str(r#"{"cid":"bafy1","name":"a.txt"}"#).unwrap();

        assert_eq!(record, InodeRecord::new("bafy1", "a.txt"));
    }

    #[test]
    fn test_record_page_total_independent_of_items() {
        let page = RecordPage::new(vec![InodeRecord::new("bafy1", "a.txt")], 57);
        assert_eq!(page.data.len(), 1);
        assert_eq!(page.total, 57);
    }
}
