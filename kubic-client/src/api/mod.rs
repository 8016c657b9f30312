//! The typed, capability-guarded resource handle.
use std::{fmt::Debug, sync::Arc};

use kubic_core::{
    descriptor::ResourceDescriptor,
    paths::NamespaceSelector,
    request::{Error as RequestError, Request},
    Capability,
};

use crate::{error::UnsupportedOperation, Client, Error, Result};

mod core_methods;
mod subresource;
mod util;

// Re-exports so callers rarely need kubic-core directly
pub use kubic_core::{
    params::{
        DeleteParams, GetParams, ListParams, Patch, PatchParams, PostParams, Preconditions,
        PropagationPolicy, WatchParams,
    },
    subresource::{EvictParams, ExecParams, LogParams, Scale, ScaleSpec, ScaleStatus},
    DynamicObject, Expression, FieldExpression, FieldSelector, LabelSelector, ObjectList,
    ResourceObject, ResourceObjectExt, Restart, Status, WatchEvent,
};

/// A typed handle to one resource, bound to a namespace selection.
///
/// The verbs offered at runtime are the intersection of what the caller
/// invokes and what the descriptor's capability set advertises; a verb
/// outside the set fails with
/// [`UnsupportedOperation`](crate::error::UnsupportedOperation) before any
/// request is sent.
///
/// The parameter `K` only pins the serde codec for bodies; all resource
/// identity comes from the registered descriptor.
#[derive(Clone)]
pub struct ResourceClient<K> {
    pub(crate) request: Request,
    pub(crate) client: Client,
    // iter::Empty over PhantomData: we never hold a K, and Empty<K> stays
    // Send even if K is not
    pub(crate) _phantom: std::iter::Empty<K>,
}

impl<K> ResourceClient<K> {
    /// A handle across all namespaces.
    ///
    /// For cluster-scoped descriptors this is the only sensible handle; for
    /// namespace-scoped ones it supports list and watch, while named verbs
    /// fail until a concrete namespace is selected.
    pub fn all(client: Client, descriptor: Arc<ResourceDescriptor>) -> Self {
        Self {
            request: Request::new(descriptor, NamespaceSelector::All),
            client,
            _phantom: std::iter::empty(),
        }
    }

    /// A handle to a cluster-scoped resource.
    ///
    /// Fails on descriptors that are namespace-scoped.
    pub fn cluster(client: Client, descriptor: Arc<ResourceDescriptor>) -> Result<Self> {
        if descriptor.scope.is_namespaced() {
            return Err(Error::BuildRequest(RequestError::InvalidRequest(format!(
                "{} is namespaced; use a namespaced handle",
                descriptor.plural
            ))));
        }
        Ok(Self::all(client, descriptor))
    }

    /// A handle bound to one namespace.
    ///
    /// Fails on descriptors that are cluster-scoped.
    pub fn namespaced(client: Client, descriptor: Arc<ResourceDescriptor>, ns: &str) -> Result<Self> {
        if !descriptor.scope.is_namespaced() {
            return Err(Error::BuildRequest(RequestError::InvalidRequest(format!(
                "{} is cluster-scoped and cannot be namespaced",
                descriptor.plural
            ))));
        }
        Ok(Self {
            request: Request::new(descriptor, NamespaceSelector::namespace(ns)),
            client,
            _phantom: std::iter::empty(),
        })
    }

    /// A handle bound to the client's default namespace.
    pub fn default_namespaced(client: Client, descriptor: Arc<ResourceDescriptor>) -> Result<Self> {
        let ns = client.default_namespace().to_string();
        Self::namespaced(client, descriptor, &ns)
    }

    /// The descriptor behind this handle
    pub fn resource_descriptor(&self) -> &Arc<ResourceDescriptor> {
        self.request.descriptor()
    }

    /// The namespace selection of this handle
    pub fn namespace_selector(&self) -> &NamespaceSelector {
        self.request.namespace()
    }

    /// Consume self and return the [`Client`]
    pub fn into_client(self) -> Client {
        self.client
    }

    // The dispatch-time capability check every verb goes through.
    pub(crate) fn guard(&self, verb: Capability) -> Result<()> {
        let descriptor = self.request.descriptor();
        if descriptor.has(verb) {
            Ok(())
        } else {
            Err(Error::UnsupportedOperation(UnsupportedOperation {
                kind: descriptor.kind.clone(),
                verb,
            }))
        }
    }
}

impl<K> Debug for ResourceClient<K> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ResourceClient")
            .field("request", &self.request)
            .field("client", &"...")
            .finish()
    }
}
