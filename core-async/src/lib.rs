//! Async runtime shim for the IPFS index core.
//!
//! Every `core-*` crate goes through this crate for tasks, timers and
//! synchronization primitives instead of depending on Tokio directly, so the
//! runtime surface the core relies on is spelled out in one place.
//!
//! # Modules
//!
//! - `task`: Task spawning and join handles
//! - `time`: Sleep, timeouts, durations
//! - `sync`: Locks, channels, one-time cells and cancellation
//!
//! # Examples
//!
//! ```rust
//! use core_async::task;
//! use core_async::time::{sleep, Duration};
//!
//! async fn example() {
//!     let handle = task::spawn(async {
//!         sleep(Duration::from_millis(10)).await;
//!         42
//!     });
//!     assert_eq!(handle.await.unwrap(), 42);
//! }
//! ```

pub mod sync;
pub mod task;
pub mod time;

pub use task::spawn;
pub use time::{sleep, Duration, Instant};

/// Waits on multiple concurrent branches, returning when the first completes.
pub use tokio::select;
