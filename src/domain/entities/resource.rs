//! Resource descriptors and lookup results

use std::collections::BTreeMap;

use serde::Serialize;

use crate::domain::value_objects::ResourceKind;

/// A resource that exists on the backend.
///
/// `id` and `attributes` belong to the adapter that produced the
/// descriptor; the reconciliation core passes them through untouched.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ResourceDescriptor {
    pub kind: ResourceKind,
    /// Logical name (from `ResourceNames`)
    pub name: String,
    /// Backend identifier (ARN, resource id, URL)
    pub id: String,
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub attributes: BTreeMap<String, String>,
}

impl ResourceDescriptor {
    pub fn new(kind: ResourceKind, name: impl Into<String>, id: impl Into<String>) -> Self {
        Self {
            kind,
            name: name.into(),
            id: id.into(),
            attributes: BTreeMap::new(),
        }
    }

    pub fn with_attribute(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.attributes.insert(key.into(), value.into());
        self
    }

    pub fn attribute(&self, key: &str) -> Option<&str> {
        self.attributes.get(key).map(String::as_str)
    }
}

/// Result of an existence check
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Lookup {
    Found(ResourceDescriptor),
    NotFound,
}

impl Lookup {
    pub fn is_found(&self) -> bool {
        matches!(self, Lookup::Found(_))
    }

    pub fn found(self) -> Option<ResourceDescriptor> {
        match self {
            Lookup::Found(descriptor) => Some(descriptor),
            Lookup::NotFound => None,
        }
    }
}

/// Result of an `ensure`: whether the resource had to be created
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Ensured {
    Created(ResourceDescriptor),
    Existing(ResourceDescriptor),
}

impl Ensured {
    pub fn descriptor(&self) -> &ResourceDescriptor {
        match self {
            Ensured::Created(d) | Ensured::Existing(d) => d,
        }
    }

    pub fn into_descriptor(self) -> ResourceDescriptor {
        match self {
            Ensured::Created(d) | Ensured::Existing(d) => d,
        }
    }

    pub fn was_created(&self) -> bool {
        matches!(self, Ensured::Created(_))
    }
}

/// Descriptors keyed by kind, threaded between provisioning steps
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ResourceSet {
    entries: BTreeMap<ResourceKind, ResourceDescriptor>,
}

impl ResourceSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, descriptor: ResourceDescriptor) {
        self.entries.insert(descriptor.kind, descriptor);
    }

    pub fn get(&self, kind: ResourceKind) -> Option<&ResourceDescriptor> {
        self.entries.get(&kind)
    }

    pub fn contains(&self, kind: ResourceKind) -> bool {
        self.entries.contains_key(&kind)
    }

    /// The subset holding only `kinds`
    pub fn subset(&self, kinds: &[ResourceKind]) -> ResourceSet {
        let entries = kinds
            .iter()
            .filter_map(|kind| self.entries.get(kind).map(|d| (*kind, d.clone())))
            .collect();
        ResourceSet { entries }
    }

    /// Attribute `key` of the descriptor for `kind`, if both exist
    pub fn attribute(&self, kind: ResourceKind, key: &str) -> Option<&str> {
        self.get(kind).and_then(|d| d.attribute(key))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &ResourceDescriptor> {
        self.entries.values()
    }
}
