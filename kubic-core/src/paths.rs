//! Resolution of versioned apiserver url paths.
//!
//! Paths follow the standard layout: `/api/{version}` for the core group,
//! `/apis/{group}/{version}` for named groups, with `namespaces/{ns}`
//! interposed for namespace-scoped resources addressed in one namespace.
use crate::{
    descriptor::ResourceDescriptor,
    request::{Error, Result},
};

/// Which namespaces a request addresses.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum NamespaceSelector {
    /// Address the resource across every namespace (list/watch only)
    All,
    /// Address the resource in one named namespace
    Namespace(String),
    /// Address the resource in the client's configured default namespace
    ///
    /// Resolved into a concrete [`NamespaceSelector::Namespace`] when a
    /// handle is constructed; it never reaches path resolution.
    Default,
}

impl NamespaceSelector {
    /// Shorthand for selecting one namespace
    pub fn namespace(ns: &str) -> Self {
        NamespaceSelector::Namespace(ns.to_string())
    }

    fn segment(&self) -> Result<String> {
        match self {
            NamespaceSelector::All => Ok(String::new()),
            NamespaceSelector::Namespace(ns) => Ok(format!("namespaces/{ns}/")),
            NamespaceSelector::Default => Err(Error::InvalidRequest(
                "default namespace must be resolved before building a request".into(),
            )),
        }
    }
}

/// The collection path for a descriptor under a namespace selection.
///
/// Cluster-scoped resources never gain a `namespaces/` segment; the
/// namespace selector is ignored for them.
pub fn collection_path(descriptor: &ResourceDescriptor, namespace: &NamespaceSelector) -> Result<String> {
    let root = if descriptor.group.is_empty() { "api" } else { "apis" };
    let ns = if descriptor.scope.is_namespaced() {
        namespace.segment()?
    } else {
        String::new()
    };
    Ok(format!(
        "/{root}/{api_version}/{ns}{plural}",
        api_version = descriptor.api_version(),
        plural = descriptor.plural,
    ))
}

/// The path of a single named object.
///
/// Namespace-scoped resources must be addressed in one concrete namespace;
/// a name is always required.
pub fn named_path(
    descriptor: &ResourceDescriptor,
    namespace: &NamespaceSelector,
    name: &str,
) -> Result<String> {
    if name.is_empty() {
        return Err(Error::InvalidRequest(format!(
            "a name is required to address a single {}",
            descriptor.singular
        )));
    }
    if descriptor.scope.is_namespaced() && *namespace == NamespaceSelector::All {
        return Err(Error::InvalidRequest(format!(
            "{} is namespaced; addressing {name} requires a specific namespace",
            descriptor.plural
        )));
    }
    Ok(format!("{}/{name}", collection_path(descriptor, namespace)?))
}

/// The path of a subresource under a named object.
///
/// The subresource must be registered on the descriptor.
pub fn subresource_path(
    descriptor: &ResourceDescriptor,
    namespace: &NamespaceSelector,
    name: &str,
    subresource: &str,
) -> Result<String> {
    let suffix = descriptor.subresource_suffix(subresource).ok_or_else(|| {
        Error::InvalidRequest(format!(
            "{} does not register a {subresource} subresource",
            descriptor.plural
        ))
    })?;
    Ok(format!("{}/{suffix}", named_path(descriptor, namespace, name)?))
}
