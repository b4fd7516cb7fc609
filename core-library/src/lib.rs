//! # Library Access Module
//!
//! Read side of the metadata index.
//!
//! ## Overview
//!
//! This module manages:
//! - The lazily opened, shared metadata store handle
//! - 1-based pagination over store listings
//! - Paginated search and "latest" queries published to the state surface

pub mod error;
pub mod handle;
pub mod pagination;
pub mod query;

pub use error::{LibraryError, Result};
pub use handle::StoreHandle;
pub use pagination::{Page, PageRequest};
pub use query::{QueryResultSet, QueryService};
