//! Synchronization primitives.
//!
//! The core runs on Tokio, so these are the async-aware `tokio::sync` types
//! plus `CancellationToken` from `tokio-util`:
//!
//! - `watch` backs observable state (latest value, change notification)
//! - `broadcast` backs the event bus
//! - `OnceCell` backs memoized single-flight initialization
//! - `CancellationToken` stops long-lived background loops
//!
//! # Examples
//!
//! ```rust
//! use core_async::sync::{Mutex, OnceCell};
//!
//! async fn example() {
//!     let mutex = Mutex::new(42);
//!     *mutex.lock().await += 1;
//!
//!     let cell: OnceCell<u32> = OnceCell::new();
//!     let value = cell.get_or_init(|| async { 7 }).await;
//!     assert_eq!(*value, 7);
//! }
//! ```

pub use tokio::sync::{
    broadcast, mpsc, oneshot, watch, Mutex, MutexGuard, Notify, OnceCell, RwLock,
    RwLockReadGuard, RwLockWriteGuard,
};

pub use tokio_util::sync::CancellationToken;
