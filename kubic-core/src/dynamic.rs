//! Objects for resource kinds not known at compile time.
use k8s_openapi::apimachinery::pkg::apis::meta::v1::ObjectMeta;
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use thiserror::Error;

use crate::{descriptor::ResourceDescriptor, object::TypeMeta, resource::ResourceObject};

/// Failed to convert a `DynamicObject` into a concrete type.
#[derive(Debug, Error)]
#[error("failed to parse DynamicObject: {source}")]
pub struct ParseDynamicObjectError {
    #[from]
    source: serde_json::Error,
}

/// An untyped representation of an api object.
///
/// Pairs with a runtime-registered [`ResourceDescriptor`] so kinds that only
/// become known through discovery can be served by the same typed handle.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct DynamicObject {
    /// The type fields, not always present
    #[serde(flatten, default)]
    pub types: Option<TypeMeta>,
    /// Standard object metadata
    #[serde(default)]
    pub metadata: ObjectMeta,
    /// All remaining fields of the object
    #[serde(flatten)]
    pub data: serde_json::Value,
}

impl DynamicObject {
    /// A named object of the descriptor's kind with no payload
    #[must_use]
    pub fn new(name: &str, descriptor: &ResourceDescriptor) -> Self {
        DynamicObject {
            types: Some(TypeMeta {
                api_version: descriptor.api_version(),
                kind: descriptor.kind.clone(),
            }),
            metadata: ObjectMeta {
                name: Some(name.to_string()),
                ..Default::default()
            },
            data: Default::default(),
        }
    }

    /// Attach a payload
    #[must_use]
    pub fn data(mut self, data: serde_json::Value) -> Self {
        self.data = data;
        self
    }

    /// Place the object in a namespace
    #[must_use]
    pub fn within(mut self, ns: &str) -> Self {
        self.metadata.namespace = Some(ns.into());
        self
    }

    /// Attempt to convert into a concrete type
    pub fn try_parse<K: DeserializeOwned>(self) -> Result<K, ParseDynamicObjectError> {
        Ok(serde_json::from_value(serde_json::to_value(self)?)?)
    }
}

impl ResourceObject for DynamicObject {
    fn meta(&self) -> &ObjectMeta {
        &self.metadata
    }

    fn meta_mut(&mut self) -> &mut ObjectMeta {
        &mut self.metadata
    }
}

#[cfg(test)]
mod test {
    use super::DynamicObject;
    use crate::descriptor::{ResourceDescriptor, Scope};
    use k8s_openapi::api::core::v1::Pod;

    #[test]
    fn dynamic_object_parses_into_pod() {
        let pod: Pod = serde_json::from_value(serde_json::json!({
            "apiVersion": "v1",
            "kind": "Pod",
            "metadata": { "name": "example" },
            "spec": {
                "containers": [{ "name": "example", "image": "alpine" }],
            }
        }))
        .unwrap();
        let dynamic: DynamicObject = serde_json::from_str(&serde_json::to_string(&pod).unwrap()).unwrap();
        let parsed: Pod = dynamic.try_parse().unwrap();
        assert_eq!(parsed, pod);
    }

    #[test]
    fn constructed_objects_carry_type_meta() {
        let desc = ResourceDescriptor::new("clux.dev", "v1", "Foo", "foos", Scope::NamespaceScoped);
        let obj = DynamicObject::new("baz", &desc).within("myns");
        let types = obj.types.unwrap();
        assert_eq!(types.api_version, "clux.dev/v1");
        assert_eq!(types.kind, "Foo");
        assert_eq!(obj.metadata.namespace.unwrap(), "myns");
    }
}
