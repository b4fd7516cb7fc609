//! Shared access to the metadata store.
//!
//! The store is opened on first use and then reused by every caller. Callers
//! that arrive while the first open is still running wait for it instead of
//! opening their own; if that open fails, nothing is cached and the next
//! caller tries again.

use bridge_traits::error::{BridgeError, Result};
use bridge_traits::metadata::{MetadataStore, MetadataStoreFactory};
use core_async::sync::OnceCell;
use std::fmt;
use std::sync::Arc;
use tracing::{debug, info};

pub struct StoreHandle {
    factory: Arc<dyn MetadataStoreFactory>,
    store: OnceCell<Arc<dyn MetadataStore>>,
}

impl StoreHandle {
    pub fn new(factory: Arc<dyn MetadataStoreFactory>) -> Self {
        Self {
            factory,
            store: OnceCell::new(),
        }
    }

    /// The shared store, opening it if this is the first call.
    pub async fn get(&self) -> Result<Arc<dyn MetadataStore>> {
        let store = self
            .store
            .get_or_try_init(|| async {
                debug!("Opening metadata store");
                let store = self.factory.open().await?;
                info!("Metadata store opened");
                Ok::<_, BridgeError>(store)
            })
            .await?;

        Ok(Arc::clone(store))
    }

    /// True once a store has been opened successfully.
    pub fn is_open(&self) -> bool {
        self.store.initialized()
    }
}

impl fmt::Debug for StoreHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StoreHandle")
            .field("is_open", &self.is_open())
            .finish()
    }
}
