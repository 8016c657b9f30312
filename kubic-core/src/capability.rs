//! Verb capabilities advertised by a [`ResourceDescriptor`](crate::descriptor::ResourceDescriptor).
use std::fmt;

/// A single verb a resource can support.
///
/// The dispatch layer refuses to issue a request for a verb whose capability
/// is absent from the descriptor, so an unsupported call fails before any
/// network traffic happens.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[repr(u16)]
pub enum Capability {
    /// Single objects can be fetched by name
    Readable,
    /// Collections can be listed
    Listable,
    /// New objects can be posted
    Creatable,
    /// Existing objects can be replaced wholesale
    Replaceable,
    /// Objects can be patched
    Patchable,
    /// Single objects can be deleted by name
    Deletable,
    /// Whole collections can be deleted in one call
    CollectionDeletable,
    /// The resource carries a `status` subresource
    StatusHaving,
    /// The resource carries a `scale` subresource
    Scalable,
    /// Collections can be watched for changes
    Watchable,
    /// The resource serves a `log` subresource
    Loggable,
    /// The resource accepts `eviction` posts
    Evictable,
}

impl Capability {
    pub(crate) const ALL: [Capability; 12] = [
        Capability::Readable,
        Capability::Listable,
        Capability::Creatable,
        Capability::Replaceable,
        Capability::Patchable,
        Capability::Deletable,
        Capability::CollectionDeletable,
        Capability::StatusHaving,
        Capability::Scalable,
        Capability::Watchable,
        Capability::Loggable,
        Capability::Evictable,
    ];

    const fn bit(self) -> u16 {
        1 << (self as u16)
    }

    /// The verb name used in diagnostics
    pub fn as_str(&self) -> &'static str {
        match self {
            Capability::Readable => "get",
            Capability::Listable => "list",
            Capability::Creatable => "create",
            Capability::Replaceable => "replace",
            Capability::Patchable => "patch",
            Capability::Deletable => "delete",
            Capability::CollectionDeletable => "deletecollection",
            Capability::StatusHaving => "status",
            Capability::Scalable => "scale",
            Capability::Watchable => "watch",
            Capability::Loggable => "log",
            Capability::Evictable => "evict",
        }
    }
}

impl fmt::Display for Capability {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The set of verbs a resource supports.
///
/// Stored as a bit-set so descriptors stay `Copy`-cheap to interrogate.
#[derive(Clone, Copy, Default, PartialEq, Eq)]
pub struct CapabilitySet(u16);

impl CapabilitySet {
    /// A set with no verbs
    pub const fn empty() -> Self {
        CapabilitySet(0)
    }

    /// A set with every verb, subresources included
    pub fn all() -> Self {
        Capability::ALL.iter().copied().collect()
    }

    /// The standard verb set for a CRUD resource
    ///
    /// Get, list, watch, create, replace, patch, delete and delete-collection.
    /// Subresource verbs are opted into separately.
    pub fn crud() -> Self {
        [
            Capability::Readable,
            Capability::Listable,
            Capability::Watchable,
            Capability::Creatable,
            Capability::Replaceable,
            Capability::Patchable,
            Capability::Deletable,
            Capability::CollectionDeletable,
        ]
        .into_iter()
        .collect()
    }

    /// Whether the given verb is in the set
    pub fn contains(&self, capability: Capability) -> bool {
        self.0 & capability.bit() != 0
    }

    /// Add a verb to the set
    pub fn insert(&mut self, capability: Capability) {
        self.0 |= capability.bit();
    }

    /// Return the set with an additional verb
    #[must_use]
    pub fn with(mut self, capability: Capability) -> Self {
        self.insert(capability);
        self
    }

    /// Whether the set contains no verbs
    pub fn is_empty(&self) -> bool {
        self.0 == 0
    }

    /// Iterate over the verbs in the set
    pub fn iter(&self) -> impl Iterator<Item = Capability> + '_ {
        Capability::ALL.iter().copied().filter(|c| self.contains(*c))
    }
}

impl FromIterator<Capability> for CapabilitySet {
    fn from_iter<T: IntoIterator<Item = Capability>>(iter: T) -> Self {
        let mut set = CapabilitySet::empty();
        for cap in iter {
            set.insert(cap);
        }
        set
    }
}

impl fmt::Debug for CapabilitySet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_set().entries(self.iter()).finish()
    }
}
