//! # Core Configuration Module
//!
//! Builder-based configuration for the index core.
//!
//! ## Required
//!
//! - `MetadataStoreFactory` - opens the external metadata database on first use
//! - `results_per_page` - page size for `search` and `latest`
//!
//! ## Optional
//!
//! - `auto_sync` - start sync automatically while the index is not synchronized
//! - `event_buffer_size` - per-subscriber event bus capacity
//! - `DiagnosticSink` - receives structured diagnostics
//!
//! ## Usage
//!
//! ```ignore
//! use core_runtime::config::CoreConfig;
//! use std::sync::Arc;
//!
//! let config = CoreConfig::builder()
//!     .store_factory(Arc::new(MyStoreFactory))
//!     .results_per_page(20)
//!     .auto_sync(true)
//!     .build()?;
//! ```
//!
//! ## Error Handling
//!
//! ```should_panic
//! use core_runtime::config::CoreConfig;
//!
//! // Missing the store factory
//! let config = CoreConfig::builder()
//!     .results_per_page(20)
//!     .build()
//!     .expect("Should fail - missing store factory");
//! ```

use crate::error::{Error, Result};
use crate::events::DEFAULT_EVENT_BUFFER_SIZE;
use bridge_traits::{DiagnosticSink, MetadataStoreFactory};
use std::sync::Arc;

/// Core configuration.
///
/// Use [`CoreConfigBuilder`] to construct instances.
#[derive(Clone)]
pub struct CoreConfig {
    /// Records per page for `search` and `latest`
    pub results_per_page: u32,

    /// Start syncing automatically whenever the index is not synchronized
    pub auto_sync: bool,

    /// Event bus capacity per subscriber
    pub event_buffer_size: usize,

    /// Receives structured diagnostics (optional)
    pub diagnostic_sink: Option<Arc<dyn DiagnosticSink>>,

    /// Opens the metadata store (required)
    pub store_factory: Arc<dyn MetadataStoreFactory>,
}

impl std::fmt::Debug for CoreConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CoreConfig")
            .field("results_per_page", &self.results_per_page)
            .field("auto_sync", &self.auto_sync)
            .field("event_buffer_size", &self.event_buffer_size)
            .field(
                "diagnostic_sink",
                &self
                    .diagnostic_sink
                    .as_ref()
                    .map(|_| "DiagnosticSink { ... }"),
            )
            .field("store_factory", &"MetadataStoreFactory { ... }")
            .finish()
    }
}

impl CoreConfig {
    pub fn builder() -> CoreConfigBuilder {
        CoreConfigBuilder::default()
    }

    /// Validates the configuration and returns an error if invalid.
    pub fn validate(&self) -> Result<()> {
        if self.results_per_page == 0 {
            return Err(Error::Config(
                "Results per page must be greater than 0".to_string(),
            ));
        }

        if self.event_buffer_size == 0 {
            return Err(Error::Config(
                "Event buffer size must be greater than 0".to_string(),
            ));
        }

        Ok(())
    }
}

fn store_factory_missing_error() -> Error {
    Error::CapabilityMissing {
        capability: "MetadataStoreFactory".to_string(),
        message: "A MetadataStoreFactory is required to open the metadata database. \
                 Inject the host's store implementation with .store_factory()."
            .to_string(),
    }
}

/// Builder for [`CoreConfig`].
#[derive(Default)]
pub struct CoreConfigBuilder {
    results_per_page: Option<u32>,
    auto_sync: bool,
    event_buffer_size: Option<usize>,
    diagnostic_sink: Option<Arc<dyn DiagnosticSink>>,
    store_factory: Option<Arc<dyn MetadataStoreFactory>>,
}

impl CoreConfigBuilder {
    /// Sets the page size used by `search` and `latest` (required).
    pub fn results_per_page(mut self, results_per_page: u32) -> Self {
        self.results_per_page = Some(results_per_page);
        self
    }

    /// Enables the auto-sync watcher.
    ///
    /// Default: false
    pub fn auto_sync(mut self, enabled: bool) -> Self {
        self.auto_sync = enabled;
        self
    }

    /// Default: 100
    pub fn event_buffer_size(mut self, size: usize) -> Self {
        self.event_buffer_size = Some(size);
        self
    }

    pub fn diagnostic_sink(mut self, sink: Arc<dyn DiagnosticSink>) -> Self {
        self.diagnostic_sink = Some(sink);
        self
    }

    /// Sets the factory that opens the metadata store (required).
    ///
    /// The factory is not called here; the store is opened on first use.
    pub fn store_factory(mut self, factory: Arc<dyn MetadataStoreFactory>) -> Self {
        self.store_factory = Some(factory);
        self
    }

    /// Builds the final `CoreConfig`.
    ///
    /// # Errors
    ///
    /// - [`Error::CapabilityMissing`] when no store factory was set
    /// - [`Error::Config`] when a value is missing or out of range
    pub fn build(self) -> Result<CoreConfig> {
        let store_factory = self.store_factory.ok_or_else(store_factory_missing_error)?;

        let results_per_page = self.results_per_page.ok_or_else(|| {
            Error::Config(
                "Results per page is required. Use .results_per_page() to set it.".to_string(),
            )
        })?;

        let config = CoreConfig {
            results_per_page,
            auto_sync: self.auto_sync,
            event_buffer_size: self.event_buffer_size.unwrap_or(DEFAULT_EVENT_BUFFER_SIZE),
            diagnostic_sink: self.diagnostic_sink,
            store_factory,
        };

        config.validate()?;

        Ok(config)
    }
}
