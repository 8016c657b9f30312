//! Core types for the kubic Kubernetes client.
//!
//! This crate holds everything request shaped and nothing transport shaped:
//! resource descriptors with their capability sets, namespace and selector
//! types, per-call options, the url path resolver and the http request
//! builder, plus the response, watch event and dynamic object types shared
//! by the client layers above.
#![deny(missing_docs)]
#![forbid(unsafe_code)]

pub mod capability;
pub use capability::{Capability, CapabilitySet};

pub mod descriptor;
pub use descriptor::{DescriptorRegistry, ResourceDescriptor, Scope};

pub mod dynamic;
pub use dynamic::DynamicObject;

pub mod object;
pub use object::{ObjectList, TypeMeta};

pub mod params;

pub mod paths;
pub use paths::NamespaceSelector;

pub mod request;
pub use request::Request;

pub mod resource;
pub use resource::{ResourceObject, ResourceObjectExt};

pub mod response;
pub use response::Status;

pub mod selector;
pub use selector::{Expression, FieldExpression, FieldSelector, LabelSelector};

pub mod subresource;

pub mod util;
pub use util::Restart;

pub mod watch;
pub use watch::WatchEvent;

mod error;
pub use error::ErrorResponse;

pub use k8s_openapi::apimachinery::pkg::apis::meta::v1::{ListMeta, ObjectMeta};
