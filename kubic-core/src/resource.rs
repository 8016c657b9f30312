//! Metadata access for anything shaped like an api object.
use std::collections::BTreeMap;

use k8s_openapi::apimachinery::pkg::apis::meta::v1::ObjectMeta;
use once_cell::sync::Lazy;

/// Accessor trait for objects carrying standard `metadata`.
///
/// Catalog types get this through their `k8s_openapi::Metadata` impl;
/// [`DynamicObject`](crate::dynamic::DynamicObject) implements it directly.
pub trait ResourceObject {
    /// Metadata every persisted object carries
    fn meta(&self) -> &ObjectMeta;
    /// Mutable access to the metadata
    fn meta_mut(&mut self) -> &mut ObjectMeta;
}

impl<K> ResourceObject for K
where
    K: k8s_openapi::Metadata<Ty = ObjectMeta>,
{
    fn meta(&self) -> &ObjectMeta {
        self.metadata()
    }

    fn meta_mut(&mut self) -> &mut ObjectMeta {
        self.metadata_mut()
    }
}

static EMPTY_MAP: Lazy<BTreeMap<String, String>> = Lazy::new(BTreeMap::new);

/// Convenience helpers on top of [`ResourceObject`].
pub trait ResourceObjectExt: ResourceObject {
    /// The object name, or an empty string when generateName has not been
    /// resolved yet
    fn name_any(&self) -> String {
        self.meta().name.clone().unwrap_or_default()
    }

    /// The namespace the object lives in, if any
    fn namespace(&self) -> Option<String> {
        self.meta().namespace.clone()
    }

    /// The server-assigned resource version
    fn resource_version(&self) -> Option<String> {
        self.meta().resource_version.clone()
    }

    /// The server-assigned unique id
    fn uid(&self) -> Option<String> {
        self.meta().uid.clone()
    }

    /// The object labels
    fn labels(&self) -> &BTreeMap<String, String> {
        self.meta().labels.as_ref().unwrap_or(&EMPTY_MAP)
    }

    /// Mutable access to the labels
    fn labels_mut(&mut self) -> &mut BTreeMap<String, String> {
        self.meta_mut().labels.get_or_insert_with(BTreeMap::new)
    }

    /// The object annotations
    fn annotations(&self) -> &BTreeMap<String, String> {
        self.meta().annotations.as_ref().unwrap_or(&EMPTY_MAP)
    }

    /// Mutable access to the annotations
    fn annotations_mut(&mut self) -> &mut BTreeMap<String, String> {
        self.meta_mut().annotations.get_or_insert_with(BTreeMap::new)
    }
}

impl<K: ResourceObject> ResourceObjectExt for K {}
