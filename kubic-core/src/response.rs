//! Generic api response types.
use serde::{Deserialize, Serialize};

/// A status object, returned by the apiserver for acknowledged operations.
///
/// Delete calls in particular may return either the deleted object or one of
/// these; the decoder distinguishes the two on the `kind` field.
#[derive(Serialize, Deserialize, Debug, Default, Clone, PartialEq, Eq)]
pub struct Status {
    /// `Success` or `Failure`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<StatusSummary>,

    /// Suggested http return code, zero when unset
    #[serde(default, skip_serializing_if = "is_u16_zero")]
    pub code: u16,

    /// A human readable description of the status
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub message: String,

    /// A machine readable reason for a `Failure` status
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub reason: String,

    /// Extended data associated with the reason
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub details: Option<StatusDetails>,
}

impl Status {
    /// A successful `Status`
    pub fn success() -> Self {
        Status {
            status: Some(StatusSummary::Success),
            ..Status::default()
        }
    }

    /// An unsuccessful `Status`
    pub fn failure(message: &str, reason: &str) -> Self {
        Status {
            status: Some(StatusSummary::Failure),
            message: message.to_string(),
            reason: reason.to_string(),
            ..Status::default()
        }
    }

    /// Set an explicit http status code
    #[must_use]
    pub fn with_code(mut self, code: u16) -> Self {
        self.code = code;
        self
    }

    /// Whether this status reports success
    pub fn is_success(&self) -> bool {
        self.status == Some(StatusSummary::Success)
    }

    /// Whether this status reports failure
    pub fn is_failure(&self) -> bool {
        self.status == Some(StatusSummary::Failure)
    }
}

/// Overall result of the operation.
#[derive(Serialize, Deserialize, Debug, PartialEq, Eq, Clone, Copy)]
pub enum StatusSummary {
    /// Operation succeeded
    Success,
    /// Operation failed
    Failure,
}

/// Extended data on a [`Status`].
#[derive(Serialize, Deserialize, Debug, Default, PartialEq, Eq, Clone)]
#[serde(rename_all = "camelCase")]
pub struct StatusDetails {
    /// Name of the resource the status describes, when singular
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub name: String,

    /// Group of the resource the status describes
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub group: String,

    /// Kind of the resource the status describes
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub kind: String,

    /// UID of the resource, when singular
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub uid: String,

    /// Individual causes contributing to a failure
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub causes: Vec<StatusCause>,

    /// Seconds the client should wait before retrying, when applicable
    #[serde(default, skip_serializing_if = "is_u32_zero")]
    pub retry_after_seconds: u32,
}

/// One cause on a [`StatusDetails`].
#[derive(Serialize, Deserialize, Debug, PartialEq, Eq, Clone)]
pub struct StatusCause {
    /// A machine readable description of the cause
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub reason: String,

    /// A human readable description of the cause
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub message: String,

    /// The offending field, in JSON path notation
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub field: String,
}

fn is_u16_zero(&v: &u16) -> bool {
    v == 0
}

fn is_u32_zero(&v: &u32) -> bool {
    v == 0
}

#[cfg(test)]
mod test {
    use super::Status;

    #[test]
    fn status_deserializes_from_delete_response() {
        let body = r#"{"kind":"Status","apiVersion":"v1","metadata":{},"status":"Success","details":{"name":"blog","kind":"pods","uid":"1234-some-uid"}}"#;
        let s: Status = serde_json::from_str(body).unwrap();
        assert!(s.is_success());
        assert_eq!(s.details.unwrap().name, "blog");

        let body = r#"{"kind":"Status","status":"Failure","message":"pods \"x\" not found","reason":"NotFound","code":404}"#;
        let s: Status = serde_json::from_str(body).unwrap();
        assert!(s.is_failure());
        assert_eq!(s.code, 404);
    }
}
