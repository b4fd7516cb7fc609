//! Workspace entry crate.
//!
//! Host applications can depend on `ipfs-index-workspace` and reach the
//! service façade without wiring each workspace crate individually.

pub use core_service::*;
