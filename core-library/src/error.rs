use bridge_traits::error::BridgeError;
use core_runtime::state::QueryKind;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum LibraryError {
    #[error("Bridge error: {0}")]
    Bridge(#[from] BridgeError),

    #[error("Invalid page {page}: pages are numbered from 1")]
    InvalidPage { page: u32 },

    #[error("Invalid input: {field} - {message}")]
    InvalidInput { field: String, message: String },

    #[error("{kind} query failed: {source}")]
    Query {
        kind: QueryKind,
        #[source]
        source: BridgeError,
    },
}

pub type Result<T> = std::result::Result<T, LibraryError>;
