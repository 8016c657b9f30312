use serde::{Deserialize, Serialize};
use thiserror::Error;

/// An error body returned from the apiserver.
///
/// This is the wire shape of a failed call and of `ERROR` watch events; the
/// classifier in the client layer turns it into a typed error kind.
#[derive(Error, Deserialize, Serialize, Debug, Clone, Eq, PartialEq)]
#[error("{message}: {reason}")]
pub struct ErrorResponse {
    /// Status of the operation, normally `Failure`
    pub status: String,
    /// A human readable description of the error
    #[serde(default)]
    pub message: String,
    /// A machine readable reason, e.g. `NotFound` or `AlreadyExists`
    #[serde(default)]
    pub reason: String,
    /// The suggested http status code
    pub code: u16,
}
