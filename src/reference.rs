//! Constraint vertices and edges
//!
//! Vertices select documents (by container and an optional literal pattern),
//! partitions (by container and partition key paths), or the synthetic target of a
//! compound constraint. Every vertex has a [`VertexKey`] derived from the canonical
//! JSON form of its selector, so structurally equal selectors collapse into one
//! vertex.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::checksum::to_canonical_string;

/// Suffix distinguishing a compound target from the document it is derived from
pub const COMPOUND_SUFFIX: &str = "compound";

/// Deep-partial literal pattern selecting a subset of a container's variants
pub type RefDocType = Map<String, Value>;

/// Deterministic identity of a constraint vertex
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct VertexKey(String);

impl VertexKey {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for VertexKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for VertexKey {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl From<String> for VertexKey {
    fn from(s: String) -> Self {
        Self(s)
    }
}

/// Reference to the documents of a container, optionally narrowed by a pattern
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DocumentReference {
    pub container_id: String,
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        deserialize_with = "deserialize_ref_doc_type"
    )]
    pub ref_doc_type: Option<RefDocType>,
}

impl DocumentReference {
    /// Every document of the container
    pub fn new(container_id: impl Into<String>) -> Self {
        Self {
            container_id: container_id.into(),
            ref_doc_type: None,
        }
    }

    /// Narrow the reference to variants matching `pattern`.
    ///
    /// Non-object and empty patterns select every variant.
    pub fn with_doc_type(mut self, pattern: Value) -> Self {
        self.ref_doc_type = normalize_pattern(pattern);
        self
    }

    /// Canonical rendering of the selector, `{}` when unqualified
    pub fn selector(&self) -> String {
        match &self.ref_doc_type {
            Some(pattern) => to_canonical_string(&Value::Object(pattern.clone())),
            None => "{}".to_string(),
        }
    }

    pub fn key(&self) -> VertexKey {
        VertexKey(format!("{}/{}", self.container_id, self.selector()))
    }
}

fn normalize_pattern(pattern: Value) -> Option<RefDocType> {
    match pattern {
        Value::Object(map) if !map.is_empty() => Some(map),
        _ => None,
    }
}

fn deserialize_ref_doc_type<'de, D>(deserializer: D) -> Result<Option<RefDocType>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let pattern = Option::<RefDocType>::deserialize(deserializer)?;
    Ok(pattern.filter(|p| !p.is_empty()))
}

/// Reference to every document sharing the listed partition key properties
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PartitionReference {
    pub container_id: String,
    pub partition_key_properties: Vec<String>,
}

impl PartitionReference {
    pub fn new<I, S>(container_id: impl Into<String>, partition_key_properties: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            container_id: container_id.into(),
            partition_key_properties: partition_key_properties.into_iter().map(Into::into).collect(),
        }
    }

    pub fn selector(&self) -> String {
        let keys = self
            .partition_key_properties
            .iter()
            .cloned()
            .map(Value::String)
            .collect();
        to_canonical_string(&Value::Array(keys))
    }

    pub fn key(&self) -> VertexKey {
        VertexKey(format!("{}/{}", self.container_id, self.selector()))
    }
}

/// The referencing side of a reference constraint
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Reference {
    Document(DocumentReference),
    Partition(PartitionReference),
}

impl Reference {
    pub fn container_id(&self) -> &str {
        match self {
            Reference::Document(doc) => &doc.container_id,
            Reference::Partition(partition) => &partition.container_id,
        }
    }

    pub fn selector(&self) -> String {
        match self {
            Reference::Document(doc) => doc.selector(),
            Reference::Partition(partition) => partition.selector(),
        }
    }
}

impl From<DocumentReference> for Reference {
    fn from(doc: DocumentReference) -> Self {
        Reference::Document(doc)
    }
}

impl From<PartitionReference> for Reference {
    fn from(partition: PartitionReference) -> Self {
        Reference::Partition(partition)
    }
}

/// A vertex of the constraint graph
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ConstraintVertex {
    Document(DocumentReference),
    Partition(PartitionReference),
    /// Synthetic target of a compound constraint on the wrapped document
    Compound(DocumentReference),
}

impl ConstraintVertex {
    pub fn key(&self) -> VertexKey {
        match self {
            ConstraintVertex::Document(doc) => doc.key(),
            ConstraintVertex::Partition(partition) => partition.key(),
            ConstraintVertex::Compound(doc) => {
                VertexKey(format!("{}/{}", doc.key(), COMPOUND_SUFFIX))
            }
        }
    }

    pub fn container_id(&self) -> &str {
        match self {
            ConstraintVertex::Document(doc) | ConstraintVertex::Compound(doc) => &doc.container_id,
            ConstraintVertex::Partition(partition) => &partition.container_id,
        }
    }

    /// The document selector, for document vertices only
    pub fn as_document(&self) -> Option<&DocumentReference> {
        match self {
            ConstraintVertex::Document(doc) => Some(doc),
            _ => None,
        }
    }
}

impl From<Reference> for ConstraintVertex {
    fn from(reference: Reference) -> Self {
        match reference {
            Reference::Document(doc) => ConstraintVertex::Document(doc),
            Reference::Partition(partition) => ConstraintVertex::Partition(partition),
        }
    }
}

impl From<DocumentReference> for ConstraintVertex {
    fn from(doc: DocumentReference) -> Self {
        ConstraintVertex::Document(doc)
    }
}

/// Property mapping between a referencing and a referenced document
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RefConstraint {
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub cascade_delete: bool,
    /// Referencing property path -> referenced property path
    pub ref_properties: BTreeMap<String, String>,
}

impl RefConstraint {
    pub fn new<I, K, V>(ref_properties: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        Self {
            cascade_delete: false,
            ref_properties: ref_properties
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        }
    }

    pub fn cascading(mut self) -> Self {
        self.cascade_delete = true;
        self
    }
}

/// Uniqueness of a compound key within the selected documents
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompoundConstraint {
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub cascade_delete: bool,
    pub compound_properties: Vec<String>,
}

impl CompoundConstraint {
    pub fn new<I, S>(compound_properties: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            cascade_delete: false,
            compound_properties: compound_properties.into_iter().map(Into::into).collect(),
        }
    }

    pub fn cascading(mut self) -> Self {
        self.cascade_delete = true;
        self
    }
}

/// Payload of a constraint graph edge
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ConstraintEdge {
    DocToDoc(RefConstraint),
    PartitionToDoc(RefConstraint),
    DocToCompound(CompoundConstraint),
}

impl ConstraintEdge {
    pub fn cascade_delete(&self) -> bool {
        match self {
            ConstraintEdge::DocToDoc(c) | ConstraintEdge::PartitionToDoc(c) => c.cascade_delete,
            ConstraintEdge::DocToCompound(c) => c.cascade_delete,
        }
    }

    /// Short label used in graph exports
    pub fn label(&self) -> String {
        match self {
            ConstraintEdge::DocToDoc(c) | ConstraintEdge::PartitionToDoc(c) => c
                .ref_properties
                .iter()
                .map(|(referencing, referenced)| format!("{} -> {}", referencing, referenced))
                .collect::<Vec<_>>()
                .join(", "),
            ConstraintEdge::DocToCompound(c) => format!("unique({})", c.compound_properties.join(", ")),
        }
    }
}
