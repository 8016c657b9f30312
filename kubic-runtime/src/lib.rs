//! Runtime layer of the kubic Kubernetes client: the watch engine.
//!
//! [`watcher::watch`] turns the single-attempt watch stream from
//! `kubic-client` into a long-lived, cancellable task that resumes from the
//! last observed resource version and backs off between reconnects per a
//! configurable [`retry::RetryStrategy`].
#![deny(missing_docs)]
#![forbid(unsafe_code)]

pub mod retry;
pub mod watcher;

pub use retry::{BackoffSchedule, RetryPolicy, RetryStrategy};
pub use watcher::{watch, WatchDelegate, WatchHandle, WatchState};
