//! Immutable metadata describing one served kind/version.
use std::{
    collections::{BTreeMap, HashMap},
    sync::Arc,
};

use thiserror::Error;

use crate::capability::{Capability, CapabilitySet};

/// Whether a resource lives under a namespace or at cluster level.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Scope {
    /// The resource exists once per cluster (e.g. `Node`, `Namespace`)
    ClusterScoped,
    /// The resource exists per namespace (e.g. `Pod`, `Deployment`)
    NamespaceScoped,
}

impl Scope {
    /// Whether the scope is namespaced
    pub fn is_namespaced(&self) -> bool {
        matches!(self, Scope::NamespaceScoped)
    }
}

/// Immutable description of one kind/version served by the apiserver.
///
/// A descriptor carries everything request building needs: the path
/// coordinates (group, version, plural), the scope, the verbs the resource
/// supports, and the subresources it serves. Descriptors are registered once
/// at startup and shared behind [`Arc`]; handles reference them by identity.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ResourceDescriptor {
    /// API group, empty for the core group
    pub group: String,
    /// API version within the group
    pub version: String,
    /// Singular PascalCase kind name
    pub kind: String,
    /// Lowercase singular name
    pub singular: String,
    /// Plural name, used as the url path segment
    pub plural: String,
    /// Cluster or namespace scope
    pub scope: Scope,
    /// The verbs this resource supports
    pub capabilities: CapabilitySet,
    /// Subresource name to path suffix (e.g. `status` -> `status`)
    pub subresources: BTreeMap<String, String>,
}

impl ResourceDescriptor {
    /// Construct a descriptor with no capabilities.
    ///
    /// The singular name defaults to the lowercased kind; verbs and
    /// subresources are added with the builder methods.
    pub fn new(group: &str, version: &str, kind: &str, plural: &str, scope: Scope) -> Self {
        ResourceDescriptor {
            group: group.to_string(),
            version: version.to_string(),
            kind: kind.to_string(),
            singular: kind.to_ascii_lowercase(),
            plural: plural.to_string(),
            scope,
            capabilities: CapabilitySet::empty(),
            subresources: BTreeMap::new(),
        }
    }

    /// Override the singular name
    #[must_use]
    pub fn singular(mut self, singular: &str) -> Self {
        self.singular = singular.to_string();
        self
    }

    /// Set the supported verbs
    #[must_use]
    pub fn capabilities(mut self, capabilities: CapabilitySet) -> Self {
        self.capabilities = capabilities;
        self
    }

    /// Register a subresource under its path suffix
    #[must_use]
    pub fn subresource(mut self, name: &str, suffix: &str) -> Self {
        self.subresources.insert(name.to_string(), suffix.to_string());
        self
    }

    /// The `apiVersion` string for objects of this kind
    pub fn api_version(&self) -> String {
        if self.group.is_empty() {
            self.version.clone()
        } else {
            format!("{}/{}", self.group, self.version)
        }
    }

    /// Whether the resource supports the given verb
    pub fn has(&self, capability: Capability) -> bool {
        self.capabilities.contains(capability)
    }

    /// The registered path suffix for a subresource name
    pub fn subresource_suffix(&self, name: &str) -> Option<&str> {
        self.subresources.get(name).map(String::as_str)
    }

    /// Verify that advertised capabilities only imply registered subresources.
    pub fn validate(&self) -> Result<(), RegistryError> {
        const IMPLIED: [(Capability, &str); 4] = [
            (Capability::StatusHaving, "status"),
            (Capability::Scalable, "scale"),
            (Capability::Loggable, "log"),
            (Capability::Evictable, "eviction"),
        ];
        for (cap, sub) in IMPLIED {
            if self.capabilities.contains(cap) && !self.subresources.contains_key(sub) {
                return Err(RegistryError::MissingSubresource {
                    kind: self.kind.clone(),
                    capability: cap,
                    subresource: sub,
                });
            }
        }
        Ok(())
    }
}

/// Errors raised while assembling a [`DescriptorRegistry`].
#[derive(Debug, Error)]
pub enum RegistryError {
    /// A capability implies a subresource the descriptor does not carry.
    #[error("descriptor for {kind} advertises {capability} without a registered {subresource} subresource")]
    MissingSubresource {
        /// Kind of the offending descriptor
        kind: String,
        /// The capability that implies the subresource
        capability: Capability,
        /// The subresource name that was not registered
        subresource: &'static str,
    },
    /// The same (group, version, kind) was registered twice.
    #[error("descriptor for {group}/{version} {kind} registered twice")]
    Duplicate {
        /// API group of the duplicate
        group: String,
        /// API version of the duplicate
        version: String,
        /// Kind of the duplicate
        kind: String,
    },
}

/// The flat set of descriptors known to a process.
///
/// Built once at startup via [`DescriptorRegistry::builder`], validated on
/// the way in, and immutable afterwards.
#[derive(Default, Debug)]
pub struct DescriptorRegistry {
    entries: HashMap<(String, String, String), Arc<ResourceDescriptor>>,
}

impl DescriptorRegistry {
    /// Start assembling a registry
    pub fn builder() -> DescriptorRegistryBuilder {
        DescriptorRegistryBuilder::default()
    }

    /// Look up a descriptor by group, version and kind
    pub fn get(&self, group: &str, version: &str, kind: &str) -> Option<Arc<ResourceDescriptor>> {
        self.entries
            .get(&(group.to_string(), version.to_string(), kind.to_string()))
            .cloned()
    }

    /// Iterate over all registered descriptors
    pub fn iter(&self) -> impl Iterator<Item = &Arc<ResourceDescriptor>> {
        self.entries.values()
    }

    /// Number of registered descriptors
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the registry is empty
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Builder for [`DescriptorRegistry`].
#[derive(Debug, Default)]
pub struct DescriptorRegistryBuilder {
    entries: HashMap<(String, String, String), Arc<ResourceDescriptor>>,
}

impl DescriptorRegistryBuilder {
    /// Validate and add a descriptor
    pub fn register(mut self, descriptor: ResourceDescriptor) -> Result<Self, RegistryError> {
        descriptor.validate()?;
        let key = (
            descriptor.group.clone(),
            descriptor.version.clone(),
            descriptor.kind.clone(),
        );
        if self.entries.contains_key(&key) {
            return Err(RegistryError::Duplicate {
                group: key.0,
                version: key.1,
                kind: key.2,
            });
        }
        self.entries.insert(key, Arc::new(descriptor));
        Ok(self)
    }

    /// Freeze the registry
    pub fn build(self) -> DescriptorRegistry {
        DescriptorRegistry {
            entries: self.entries,
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::capability::{Capability, CapabilitySet};

    fn pods() -> ResourceDescriptor {
        ResourceDescriptor::new("", "v1", "Pod", "pods", Scope::NamespaceScoped)
            .capabilities(
                CapabilitySet::crud()
                    .with(Capability::StatusHaving)
                    .with(Capability::Loggable)
                    .with(Capability::Evictable),
            )
            .subresource("status", "status")
            .subresource("log", "log")
            .subresource("eviction", "eviction")
    }

    #[test]
    fn api_version_for_core_and_named_groups() {
        assert_eq!(pods().api_version(), "v1");
        let deploys =
            ResourceDescriptor::new("apps", "v1", "Deployment", "deployments", Scope::NamespaceScoped);
        assert_eq!(deploys.api_version(), "apps/v1");
    }

    #[test]
    fn capability_implies_registered_subresource() {
        let bad = ResourceDescriptor::new("", "v1", "Pod", "pods", Scope::NamespaceScoped)
            .capabilities(CapabilitySet::empty().with(Capability::StatusHaving));
        let err = DescriptorRegistry::builder().register(bad).unwrap_err();
        assert!(matches!(err, RegistryError::MissingSubresource {
            capability: Capability::StatusHaving,
            subresource: "status",
            ..
        }));
    }

    #[test]
    fn registry_lookup_by_identity() {
        let reg = DescriptorRegistry::builder()
            .register(pods())
            .unwrap()
            .build();
        let a = reg.get("", "v1", "Pod").unwrap();
        let b = reg.get("", "v1", "Pod").unwrap();
        assert!(Arc::ptr_eq(&a, &b));
        assert!(reg.get("apps", "v1", "Pod").is_none());
    }

    #[test]
    fn duplicate_registration_rejected() {
        let err = DescriptorRegistry::builder()
            .register(pods())
            .unwrap()
            .register(pods())
            .unwrap_err();
        assert!(matches!(err, RegistryError::Duplicate { .. }));
    }
}
