//! Generic object and object list wrappers.
use k8s_openapi::apimachinery::pkg::apis::meta::v1::ListMeta;
use serde::{Deserialize, Serialize};

/// Type information flattened into every object.
#[derive(Deserialize, Serialize, Clone, Default, Debug, Eq, PartialEq, Hash)]
#[serde(rename_all = "camelCase")]
pub struct TypeMeta {
    /// The version of the API
    pub api_version: String,
    /// The kind of the object
    pub kind: String,
}

/// A generic object list, used in place of per-kind `List` structs.
///
/// Produced by list and delete-collection calls; its `metadata` carries the
/// collection resource version and the continue token for paging.
#[derive(Serialize, Deserialize, Debug)]
pub struct ObjectList<T>
where
    T: Clone,
{
    /// List metadata; mostly interesting for `resourceVersion` and `continue`
    pub metadata: ListMeta,

    /// The objects in this page of the collection
    #[serde(bound(deserialize = "Vec<T>: Deserialize<'de>"))]
    pub items: Vec<T>,
}

impl<T: Clone> ObjectList<T> {
    /// Iterate over the objects
    pub fn iter(&self) -> impl Iterator<Item = &T> {
        self.items.iter()
    }

    /// Iterate mutably over the objects
    pub fn iter_mut(&mut self) -> impl Iterator<Item = &mut T> {
        self.items.iter_mut()
    }
}

impl<T: Clone> IntoIterator for ObjectList<T> {
    type IntoIter = std::vec::IntoIter<Self::Item>;
    type Item = T;

    fn into_iter(self) -> Self::IntoIter {
        self.items.into_iter()
    }
}

impl<'a, T: Clone> IntoIterator for &'a ObjectList<T> {
    type IntoIter = std::slice::Iter<'a, T>;
    type Item = &'a T;

    fn into_iter(self) -> Self::IntoIter {
        self.items.iter()
    }
}
