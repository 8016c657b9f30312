//! A long-lived, cancellable watch task with resumption and backoff.
//!
//! [`watch`] spawns a task that holds a streaming connection open, delivers
//! each decoded event to the caller's sink in arrival order, and reconnects
//! on interruptions, resuming from the last observed resource version.
//! Duplicates after a reconnect are possible and callers must tolerate them;
//! that is inherent to resuming on an opaque cursor.
use std::{
    fmt::Debug,
    sync::{
        atomic::{AtomicU32, Ordering},
        Arc,
    },
    time::Duration,
};

use futures::StreamExt;
use serde::de::DeserializeOwned;
use tokio::{sync::watch as state_channel, task::JoinHandle, time};
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use kubic_client::{
    api::ResourceClient,
    error::{classify, ApiError, ErrorKind},
    Error as ClientError,
};
use kubic_core::{
    params::WatchParams, paths, resource::ResourceObject, watch::WatchEvent, ErrorResponse,
};

use crate::retry::RetryStrategy;

/// Where a watch task is in its lifecycle.
///
/// Cancellation moves to `Terminated` from any state; `Reconnecting` is
/// entered on any other interruption while attempts remain.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum WatchState {
    /// Spawned, nothing attempted yet
    Idle,
    /// A connection attempt is in flight
    Connecting,
    /// Events are flowing
    Streaming,
    /// Sleeping out the backoff before the next attempt
    Reconnecting,
    /// Finished; no further events will be delivered
    Terminated,
}

/// Receives events and errors from one watch task.
///
/// Calls arrive from a single task, one at a time, so implementations need
/// no internal synchronization unless they share state elsewhere.
pub trait WatchDelegate<K>: Send + 'static {
    /// Called with every forwarded event, in arrival order
    fn on_event(&mut self, event: WatchEvent<K>);

    /// Called with recoverable errors before a reconnect attempt
    ///
    /// The default logs and suppresses, which is what event-only callers
    /// want.
    fn on_error(&mut self, error: &ClientError) {
        warn!("watch error: {error}");
    }

    /// Called once when the task stops retrying
    ///
    /// Carries the terminal error when the task died of one; `None` after a
    /// retry budget exhausted by clean disconnects.
    fn on_terminated(&mut self, error: Option<ClientError>) {
        if let Some(err) = error {
            warn!("watch terminated: {err}");
        }
    }
}

/// Event-only sinks: errors are logged and suppressed.
impl<K, F> WatchDelegate<K> for F
where
    F: FnMut(WatchEvent<K>) + Send + 'static,
{
    fn on_event(&mut self, event: WatchEvent<K>) {
        (self)(event)
    }
}

/// The cancellable handle to a running watch task.
///
/// Dropping the handle does not stop the task; call [`WatchHandle::cancel`].
pub struct WatchHandle {
    cancel: CancellationToken,
    state: state_channel::Receiver<WatchState>,
    attempts: Arc<AtomicU32>,
    task: JoinHandle<()>,
}

impl WatchHandle {
    /// Stop the task: the active stream is aborted and no reconnect happens.
    ///
    /// Idempotent; cancelling a terminated task does nothing.
    pub fn cancel(&self) {
        self.cancel.cancel();
    }

    /// The task's current lifecycle state
    pub fn state(&self) -> WatchState {
        *self.state.borrow()
    }

    /// Number of consecutive failed attempts so far
    ///
    /// Resets to zero whenever an event is delivered.
    pub fn attempts(&self) -> u32 {
        self.attempts.load(Ordering::Relaxed)
    }

    /// Wait until the task reaches [`WatchState::Terminated`].
    ///
    /// Returns the final state and attempt count, since `self` is consumed
    /// by the wait and its accessor methods are no longer reachable after.
    pub async fn join(self) -> (WatchState, u32) {
        // the task never panics, but a cancelled runtime aborts it
        let _ = self.task.await;
        (*self.state.borrow(), self.attempts.load(Ordering::Relaxed))
    }
}

/// Start watching a resource, delivering events to `delegate`.
///
/// Returns immediately; delivery happens on the spawned task. The sink can
/// be a `FnMut(WatchEvent<K>)` closure (errors logged and suppressed) or a
/// full [`WatchDelegate`].
pub fn watch<K, D>(
    api: ResourceClient<K>,
    wp: WatchParams,
    strategy: RetryStrategy,
    delegate: D,
) -> WatchHandle
where
    K: Clone + DeserializeOwned + ResourceObject + Debug + Send + 'static,
    D: WatchDelegate<K>,
{
    let cancel = CancellationToken::new();
    let (state_tx, state_rx) = state_channel::channel(WatchState::Idle);
    let attempts = Arc::new(AtomicU32::new(0));
    let task = tokio::spawn(run(
        api,
        wp,
        strategy,
        delegate,
        cancel.clone(),
        state_tx,
        attempts.clone(),
    ));
    WatchHandle {
        cancel,
        state: state_rx,
        attempts,
        task,
    }
}

// What ended one stream segment.
enum Interruption {
    Cancelled,
    Reconnect {
        error: Option<ClientError>,
        retry_after: Option<Duration>,
    },
    Fatal(ClientError),
}

async fn run<K, D>(
    api: ResourceClient<K>,
    wp: WatchParams,
    strategy: RetryStrategy,
    mut delegate: D,
    cancel: CancellationToken,
    state: state_channel::Sender<WatchState>,
    attempts: Arc<AtomicU32>,
) where
    K: Clone + DeserializeOwned + ResourceObject + Debug + Send + 'static,
    D: WatchDelegate<K>,
{
    let mut resume: Option<String> = None;
    let mut last_error: Option<ClientError> = None;

    loop {
        state.send_replace(WatchState::Connecting);
        let connected = tokio::select! {
            _ = cancel.cancelled() => {
                state.send_replace(WatchState::Terminated);
                return;
            }
            res = api.watch(&wp, resume.as_deref()) => res,
        };

        let interruption = match connected {
            Ok(stream) => {
                state.send_replace(WatchState::Streaming);
                stream_events(
                    stream,
                    &api,
                    &wp,
                    &mut delegate,
                    &cancel,
                    &attempts,
                    &mut resume,
                )
                .await
            }
            Err(err) => classify_interruption::<K, D>(err, &mut resume, &mut delegate),
        };

        let (error, retry_after) = match interruption {
            Interruption::Cancelled => {
                state.send_replace(WatchState::Terminated);
                return;
            }
            Interruption::Fatal(err) => {
                state.send_replace(WatchState::Terminated);
                delegate.on_terminated(Some(err));
                return;
            }
            Interruption::Reconnect { error, retry_after } => (error, retry_after),
        };
        if let Some(err) = error {
            last_error = Some(err);
        }

        let attempt = attempts.fetch_add(1, Ordering::Relaxed) + 1;
        if !strategy.allows(attempt) {
            debug!("watch retry budget exhausted after {} attempts", attempt - 1);
            state.send_replace(WatchState::Terminated);
            delegate.on_terminated(last_error.take());
            return;
        }

        let mut delay = strategy.jittered_delay(attempt);
        if let Some(ra) = retry_after {
            delay = delay.max(ra);
        }
        debug!(?delay, attempt, "watch backing off before reconnect");
        state.send_replace(WatchState::Reconnecting);
        tokio::select! {
            _ = cancel.cancelled() => {
                state.send_replace(WatchState::Terminated);
                return;
            }
            _ = time::sleep(delay) => {}
        }
    }
}

// Drives one stream segment until it ends, forwarding events and tracking
// the resume cursor.
async fn stream_events<K, D, S>(
    stream: S,
    api: &ResourceClient<K>,
    wp: &WatchParams,
    delegate: &mut D,
    cancel: &CancellationToken,
    attempts: &AtomicU32,
    resume: &mut Option<String>,
) -> Interruption
where
    K: Clone + DeserializeOwned + ResourceObject + Debug + Send + 'static,
    D: WatchDelegate<K>,
    S: futures::Stream<Item = Result<WatchEvent<K>, ClientError>>,
{
    futures::pin_mut!(stream);
    loop {
        let item = tokio::select! {
            _ = cancel.cancelled() => return Interruption::Cancelled,
            item = stream.next() => item,
        };
        match item {
            // clean server close; resume from the cursor
            None => {
                debug!("watch stream closed by server");
                return Interruption::Reconnect {
                    error: None,
                    retry_after: None,
                };
            }
            Some(Ok(WatchEvent::Error(err))) => {
                return classify_interruption::<K, D>(error_event(api, err), resume, delegate);
            }
            Some(Ok(event)) => {
                if let Some(rv) = event.resource_version().filter(|rv| !rv.is_empty()) {
                    *resume = Some(rv);
                }
                let forward = match &event {
                    WatchEvent::Bookmark(_) => wp.bookmarks,
                    _ => true,
                };
                if forward {
                    delegate.on_event(event);
                }
                // any successfully observed event resets the failure budget
                attempts.store(0, Ordering::Relaxed);
            }
            Some(Err(err)) => return classify_interruption::<K, D>(err, resume, delegate),
        }
    }
}

// Decide what an error means for the session: drop the cursor and retry on
// gone cursors, retry on transient failures, terminate otherwise.
fn classify_interruption<K, D>(
    err: ClientError,
    resume: &mut Option<String>,
    delegate: &mut D,
) -> Interruption
where
    D: WatchDelegate<K>,
{
    if let ClientError::Api(ApiError {
        kind: ErrorKind::Gone,
        ..
    }) = &err
    {
        debug!("watch resume cursor expired, restarting from the beginning");
        *resume = None;
        return Interruption::Reconnect {
            error: Some(err),
            retry_after: None,
        };
    }
    if err.is_retryable() {
        delegate.on_error(&err);
        let retry_after = match &err {
            ClientError::Api(ApiError {
                kind: ErrorKind::Throttled { retry_after },
                ..
            }) => *retry_after,
            _ => None,
        };
        Interruption::Reconnect {
            error: Some(err),
            retry_after,
        }
    } else {
        // non-retryable failures terminate the task with that error
        Interruption::Fatal(err)
    }
}

// An in-band ERROR event carries a bare status body; fold it into the same
// error type the transport produces so one classification path handles both.
fn error_event<K>(api: &ResourceClient<K>, err: ErrorResponse) -> ClientError {
    let descriptor = api.resource_descriptor();
    let path = paths::collection_path(descriptor, api.namespace_selector()).unwrap_or_default();
    ClientError::Api(ApiError {
        kind: classify(err.code, Some(&err), None),
        code: err.code,
        status: Some(err),
        verb: "watch",
        path,
    })
}
