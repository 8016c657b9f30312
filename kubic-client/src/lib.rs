//! Client layer of the kubic Kubernetes client.
//!
//! This crate pairs a thin transport adapter ([`Client`]) with the typed,
//! capability-guarded dispatch handle ([`ResourceClient`]). Resource
//! descriptors registered at startup decide which verbs each handle serves;
//! everything else (selectors, options, request building) comes from
//! [`kubic_core`].
//!
//! # Example
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use kubic_client::{api::ListParams, Client, ResourceClient, TransportConfig};
//! use kubic_core::{CapabilitySet, ResourceDescriptor, Scope};
//! use k8s_openapi::api::core::v1::Pod;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = TransportConfig::new("https://10.0.0.1:6443".parse()?);
//!     let client = Client::try_from(config)?;
//!
//!     let pods = Arc::new(
//!         ResourceDescriptor::new("", "v1", "Pod", "pods", Scope::NamespaceScoped)
//!             .capabilities(CapabilitySet::crud()),
//!     );
//!     let pods: ResourceClient<Pod> = ResourceClient::namespaced(client, pods, "apps")?;
//!     for p in pods.list(&ListParams::default()).await? {
//!         println!("found pod {:?}", p.metadata.name);
//!     }
//!     Ok(())
//! }
//! ```
#![deny(missing_docs)]
#![forbid(unsafe_code)]

pub mod api;
pub mod client;
pub mod config;
pub mod error;

#[doc(inline)]
pub use api::ResourceClient;
#[doc(inline)]
pub use client::Client;
#[doc(inline)]
pub use config::TransportConfig;
pub use error::{Error, Result};
