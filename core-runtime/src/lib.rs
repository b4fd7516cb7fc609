//! # Core Runtime Module
//!
//! Foundational infrastructure shared by the sync coordinator, the query
//! service and the service façade:
//! - Observable state surface (`state`)
//! - Event bus (`events`)
//! - Configuration (`config`)
//! - Diagnostics and logging (`diagnostics`, `logging`)
//!
//! ## Overview
//!
//! Every observable field the UI binds to lives in one
//! [`StateStore`](state::StateStore). The domain crates write into it in
//! atomic batches and never hold state of their own that observers need.

pub mod config;
pub mod diagnostics;
pub mod error;
pub mod events;
pub mod logging;
pub mod state;

pub use config::{CoreConfig, CoreConfigBuilder};
pub use diagnostics::DiagnosticReporter;
pub use error::{Error, Result};
pub use events::{CoreEvent, EventBus, EventStream, QueryEvent, SyncEvent};
pub use state::{
    CoreState, QueryFailure, QueryKind, StateStore, SyncFailure, SyncFailureKind,
};
