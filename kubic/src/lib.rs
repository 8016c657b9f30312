//! kubic: a typed, capability-guarded Kubernetes API client.
//!
//! This facade re-exports the three layers of the project:
//!
//! - [`core`]: resource descriptors, selectors, request building
//! - the client layer: [`Client`], [`ResourceClient`], error classification
//! - [`runtime`]: the resumable watch engine
//!
//! # Example
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use kubic::{api::ListParams, Client, ResourceClient, TransportConfig};
//! use kubic::core::{CapabilitySet, ResourceDescriptor, Scope};
//! use k8s_openapi::api::core::v1::Pod;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let client = Client::try_from(TransportConfig::new("https://10.0.0.1:6443".parse()?))?;
//!     let descriptor = Arc::new(
//!         ResourceDescriptor::new("", "v1", "Pod", "pods", Scope::NamespaceScoped)
//!             .capabilities(CapabilitySet::crud()),
//!     );
//!     let pods: ResourceClient<Pod> = ResourceClient::namespaced(client, descriptor, "apps")?;
//!     for p in pods.list(&ListParams::default()).await? {
//!         println!("found pod {:?}", p.metadata.name);
//!     }
//!     Ok(())
//! }
//! ```
#![deny(missing_docs)]
#![forbid(unsafe_code)]

pub use kubic_client::{api, client, config, error, Client, Error, ResourceClient, Result, TransportConfig};

/// Core request-shaping types, re-exported from `kubic-core`
pub use kubic_core as core;

/// The watch engine, re-exported from `kubic-runtime`
pub use kubic_runtime as runtime;

#[cfg(test)]
mod mock_tests;
