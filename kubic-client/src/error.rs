//! Error taxonomy and response classification.
//!
//! Non-2xx responses are folded into one [`ApiError`] carrying the typed
//! [`ErrorKind`], the raw status code, the decoded error body when one was
//! present, and the verb + path that produced it. Retry decisions (watch
//! reconnects in particular) key off [`Error::is_retryable`].
use std::time::Duration;

use thiserror::Error;

pub use kubic_core::ErrorResponse;
use kubic_core::Capability;

/// Possible errors from client calls.
#[derive(Error, Debug)]
pub enum Error {
    /// The apiserver answered with a non-2xx status
    #[error("api error: {0}")]
    Api(#[source] ApiError),

    /// The verb is not in the resource's capability set
    ///
    /// Raised at dispatch time; no request is sent.
    #[error("unsupported operation: {0}")]
    UnsupportedOperation(#[source] UnsupportedOperation),

    /// The request could not be built
    #[error("failed to build request: {0}")]
    BuildRequest(#[source] kubic_core::request::Error),

    /// The connection or transfer failed
    #[error("transport error: {0}")]
    Transport(#[source] hyper::Error),

    /// A middleware layer failed
    #[error("service error: {0}")]
    Service(#[source] tower::BoxError),

    /// A 2xx response body did not decode to the verb's expected shape
    #[error("malformed response: {0}")]
    MalformedResponse(#[source] MalformedResponse),

    /// The response text was not utf-8
    #[error("utf-8 error: {0}")]
    FromUtf8(#[source] std::string::FromUtf8Error),

    /// Reading the event stream failed
    #[error("error reading events stream: {0}")]
    ReadEvents(#[source] std::io::Error),

    /// Failed to construct an http request
    #[error("http error: {0}")]
    HttpError(#[source] http::Error),

    /// Failed to assemble the tls stack
    #[error("tls error: {0}")]
    Tls(#[source] crate::client::tls::Error),

    /// The operation was cancelled before it completed
    #[error("operation cancelled")]
    Cancelled,
}

impl Error {
    /// Whether retrying the same call can reasonably succeed.
    ///
    /// Transport failures and retryable api errors qualify; malformed
    /// responses, invalid requests and authorization problems do not.
    pub fn is_retryable(&self) -> bool {
        match self {
            Error::Api(e) => e.kind.is_retryable(),
            Error::Transport(_) | Error::Service(_) | Error::ReadEvents(_) => true,
            _ => false,
        }
    }
}

/// Convenient alias for `Result<T, Error>`.
pub type Result<T, E = Error> = std::result::Result<T, E>;

/// A classified non-2xx response.
#[derive(Error, Debug)]
#[error("{verb} {path} returned {code}: {kind:?}")]
pub struct ApiError {
    /// The typed classification of the failure
    pub kind: ErrorKind,
    /// The raw http status code
    pub code: u16,
    /// The decoded error body, when the server sent one
    pub status: Option<ErrorResponse>,
    /// The verb that produced the failure
    pub verb: &'static str,
    /// The request path that produced the failure
    pub path: String,
}

/// Typed classification of api failures.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ErrorKind {
    /// 400: the request was malformed
    BadRequest,
    /// 401: no or invalid credentials
    Unauthenticated,
    /// 403: the credentials do not permit the operation
    Forbidden,
    /// 404: no such object
    NotFound,
    /// 409: the change conflicts with current state
    Conflict,
    /// 409 with `reason=AlreadyExists`: create of an existing object
    AlreadyExists,
    /// 410: the requested history is gone; watch resume cursors land here
    Gone,
    /// 422: the object failed server-side validation
    Invalid,
    /// 429: the client is being rate limited
    Throttled {
        /// Server-suggested wait before retrying
        retry_after: Option<Duration>,
    },
    /// 5xx: the server failed; retryable
    ServerError,
    /// Any other non-2xx status
    Other,
}

impl ErrorKind {
    /// Whether a retry of the same call can reasonably succeed
    pub fn is_retryable(&self) -> bool {
        matches!(self, ErrorKind::Throttled { .. } | ErrorKind::ServerError)
    }
}

/// Classify a non-2xx response into an [`ErrorKind`].
///
/// The decoded body refines the classification where status codes are
/// ambiguous; `retry_after` is the parsed `Retry-After` header, if any.
pub fn classify(code: u16, body: Option<&ErrorResponse>, retry_after: Option<Duration>) -> ErrorKind {
    match code {
        400 => ErrorKind::BadRequest,
        401 => ErrorKind::Unauthenticated,
        403 => ErrorKind::Forbidden,
        404 => ErrorKind::NotFound,
        409 => match body {
            Some(b) if b.reason == "AlreadyExists" => ErrorKind::AlreadyExists,
            _ => ErrorKind::Conflict,
        },
        410 => ErrorKind::Gone,
        422 => ErrorKind::Invalid,
        429 => ErrorKind::Throttled { retry_after },
        500..=599 => ErrorKind::ServerError,
        _ => ErrorKind::Other,
    }
}

/// A 2xx response whose body did not decode.
///
/// Carries a bounded payload snippet for diagnostics; headers and
/// credentials are never included.
#[derive(Error, Debug)]
#[error("{source} (body starts with {snippet:?})")]
pub struct MalformedResponse {
    /// The decode failure
    #[source]
    pub source: serde_json::Error,
    /// At most the first 256 bytes of the offending payload
    pub snippet: String,
}

impl MalformedResponse {
    pub(crate) fn new(source: serde_json::Error, payload: &str) -> Self {
        let end = payload
            .char_indices()
            .map(|(i, c)| i + c.len_utf8())
            .take_while(|i| *i <= 256)
            .last()
            .unwrap_or(0);
        MalformedResponse {
            source,
            snippet: payload[..end].to_string(),
        }
    }
}

/// A verb refused at dispatch time.
#[derive(Error, Debug)]
#[error("{kind} does not support {verb}")]
pub struct UnsupportedOperation {
    /// The kind whose descriptor lacks the verb
    pub kind: String,
    /// The refused verb
    pub verb: Capability,
}
