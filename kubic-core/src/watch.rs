//! Event types for the watch api.
//!
//! A watch response body is a newline-delimited sequence of these events,
//! each a `{type, object}` pair.
use std::fmt::Debug;

use serde::{Deserialize, Serialize};

use crate::{error::ErrorResponse, object::TypeMeta};

/// A raw event from a watch stream.
#[derive(Deserialize, Serialize, Clone)]
#[serde(tag = "type", content = "object", rename_all = "UPPERCASE")]
pub enum WatchEvent<K> {
    /// An object was added
    Added(K),
    /// An object was modified
    Modified(K),
    /// An object was deleted
    Deleted(K),
    /// A resume point with no object change
    ///
    /// Bookmarks advance the client's resource version without carrying a
    /// real object; only `metadata.resourceVersion` can be relied upon.
    Bookmark(Bookmark),
    /// The server reported a problem with the stream
    Error(ErrorResponse),
}

impl<K> WatchEvent<K> {
    /// The resource version to resume from after this event, if any.
    pub fn resource_version(&self) -> Option<String>
    where
        K: crate::resource::ResourceObject,
    {
        match self {
            WatchEvent::Added(obj) | WatchEvent::Modified(obj) | WatchEvent::Deleted(obj) => {
                obj.meta().resource_version.clone()
            }
            WatchEvent::Bookmark(bm) => Some(bm.metadata.resource_version.clone()),
            WatchEvent::Error(_) => None,
        }
    }
}

impl<K> Debug for WatchEvent<K> {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        match self {
            WatchEvent::Added(_) => write!(f, "Added event"),
            WatchEvent::Modified(_) => write!(f, "Modified event"),
            WatchEvent::Deleted(_) => write!(f, "Deleted event"),
            WatchEvent::Bookmark(_) => write!(f, "Bookmark event"),
            WatchEvent::Error(e) => write!(f, "Error event: {e:?}"),
        }
    }
}

/// The payload of a [`WatchEvent::Bookmark`].
#[derive(Serialize, Deserialize, Clone, Debug)]
pub struct Bookmark {
    /// apiVersion + kind of the watched resource
    #[serde(flatten)]
    pub types: TypeMeta,
    /// Metadata holding only the resume point
    pub metadata: BookmarkMeta,
}

/// Slimmed down metadata for bookmarks.
#[derive(Serialize, Deserialize, Clone, Debug)]
#[serde(rename_all = "camelCase")]
pub struct BookmarkMeta {
    /// The resource version to resume from
    pub resource_version: String,
}

#[cfg(test)]
mod test {
    use super::WatchEvent;
    use k8s_openapi::api::core::v1::Pod;

    #[test]
    fn events_deserialize_from_tagged_lines() {
        let line = r#"{"type":"ADDED","object":{"apiVersion":"v1","kind":"Pod","metadata":{"name":"a","resourceVersion":"101"}}}"#;
        let ev: WatchEvent<Pod> = serde_json::from_str(line).unwrap();
        assert_eq!(ev.resource_version().unwrap(), "101");
        assert!(matches!(ev, WatchEvent::Added(_)));

        let line = r#"{"type":"BOOKMARK","object":{"apiVersion":"v1","kind":"Pod","metadata":{"resourceVersion":"105"}}}"#;
        let ev: WatchEvent<Pod> = serde_json::from_str(line).unwrap();
        assert_eq!(ev.resource_version().unwrap(), "105");

        let line = r#"{"type":"ERROR","object":{"kind":"Status","status":"Failure","message":"too old","reason":"Expired","code":410}}"#;
        let ev: WatchEvent<Pod> = serde_json::from_str(line).unwrap();
        match ev {
            WatchEvent::Error(e) => assert_eq!(e.code, 410),
            other => panic!("unexpected event {other:?}"),
        }
    }
}
