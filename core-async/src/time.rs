//! Time-related operations backed by `tokio::time`.

pub use tokio::time::{sleep, timeout, Sleep, Timeout};

pub use std::time::{Duration, Instant};
