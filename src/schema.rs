//! Schema chunk model
//!
//! A [`DocumentSchemaChunk`] describes one alternative shape found at a path of a
//! document. Unions are represented as lists of alternative chunks, never as a
//! dedicated chunk kind: a container registers one top-level chunk per document
//! variant, and every object property maps to the list of shapes it may take.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::Result;

/// Marker appended to a property name to address the elements of an array
pub const ARRAY_MARKER: &str = "[]";

/// Separator between property names in a property path
pub const PATH_SEPARATOR: char = '.';

/// Kind of a schema chunk
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChunkKind {
    Object,
    Array,
    String,
    Number,
    Boolean,
    Date,
    Any,
    Literal,
    Enum,
}

impl ChunkKind {
    /// Name of the kind as it appears in serialized chunks
    pub fn as_str(&self) -> &'static str {
        match self {
            ChunkKind::Object => "object",
            ChunkKind::Array => "array",
            ChunkKind::String => "string",
            ChunkKind::Number => "number",
            ChunkKind::Boolean => "boolean",
            ChunkKind::Date => "date",
            ChunkKind::Any => "any",
            ChunkKind::Literal => "literal",
            ChunkKind::Enum => "enum",
        }
    }
}

impl fmt::Display for ChunkKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Alternatives for each property of an object chunk
pub type PropertyMap = BTreeMap<String, Vec<DocumentSchemaChunk>>;

/// Kind-specific payload of a chunk
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ChunkShape {
    Object { properties: PropertyMap },
    /// Array without element information. Arrays with known elements are
    /// described through a `name[]` property on the parent object instead.
    Array,
    String,
    Number,
    Boolean,
    Date,
    Any,
    Literal { value: Value },
    Enum { values: Vec<Value> },
}

impl ChunkShape {
    pub fn kind(&self) -> ChunkKind {
        match self {
            ChunkShape::Object { .. } => ChunkKind::Object,
            ChunkShape::Array => ChunkKind::Array,
            ChunkShape::String => ChunkKind::String,
            ChunkShape::Number => ChunkKind::Number,
            ChunkShape::Boolean => ChunkKind::Boolean,
            ChunkShape::Date => ChunkKind::Date,
            ChunkShape::Any => ChunkKind::Any,
            ChunkShape::Literal { .. } => ChunkKind::Literal,
            ChunkShape::Enum { .. } => ChunkKind::Enum,
        }
    }
}

/// One schema alternative at a path
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DocumentSchemaChunk {
    /// Dotted location of the chunk, `None` at the document root
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub path: Option<String>,
    #[serde(flatten)]
    pub shape: ChunkShape,
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub optional: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default_value: Option<Value>,
}

impl DocumentSchemaChunk {
    pub fn new(path: Option<String>, shape: ChunkShape) -> Self {
        Self {
            path,
            shape,
            optional: false,
            default_value: None,
        }
    }

    /// Root object chunk built from `(property, alternatives)` pairs
    pub fn object<I, K>(properties: I) -> Self
    where
        I: IntoIterator<Item = (K, Vec<DocumentSchemaChunk>)>,
        K: Into<String>,
    {
        Self::new(
            None,
            ChunkShape::Object {
                properties: properties.into_iter().map(|(k, v)| (k.into(), v)).collect(),
            },
        )
    }

    /// Scalar chunk of the given shape at `path`
    pub fn scalar(path: impl Into<String>, shape: ChunkShape) -> Self {
        Self::new(Some(path.into()), shape)
    }

    /// Literal chunk at `path`
    pub fn literal(path: impl Into<String>, value: impl Into<Value>) -> Self {
        Self::new(Some(path.into()), ChunkShape::Literal { value: value.into() })
    }

    pub fn with_optional(mut self, optional: bool) -> Self {
        self.optional = optional;
        self
    }

    pub fn with_default(mut self, default_value: Value) -> Self {
        self.default_value = Some(default_value);
        self
    }

    pub fn kind(&self) -> ChunkKind {
        self.shape.kind()
    }

    /// Property alternatives, present only on object chunks
    pub fn properties(&self) -> Option<&PropertyMap> {
        match &self.shape {
            ChunkShape::Object { properties } => Some(properties),
            _ => None,
        }
    }

    /// Alternatives registered for a single property name
    pub fn property(&self, name: &str) -> Option<&[DocumentSchemaChunk]> {
        self.properties()
            .and_then(|props| props.get(name))
            .map(Vec::as_slice)
    }

    pub fn literal_value(&self) -> Option<&Value> {
        match &self.shape {
            ChunkShape::Literal { value } => Some(value),
            _ => None,
        }
    }

    pub fn enum_values(&self) -> Option<&[Value]> {
        match &self.shape {
            ChunkShape::Enum { values } => Some(values),
            _ => None,
        }
    }
}

/// Name of the synthetic property holding the elements of array property `name`
pub fn array_property(name: &str) -> String {
    format!("{}{}", name, ARRAY_MARKER)
}

/// Joins a parent path and a property name into a dotted path
pub fn join_path(parent: Option<&str>, name: &str) -> String {
    match parent {
        Some(parent) if !parent.is_empty() => format!("{}{}{}", parent, PATH_SEPARATOR, name),
        _ => name.to_string(),
    }
}

/// Anything that can describe a document schema as a list of chunks.
///
/// Each returned chunk is one top-level variant of the document (a discriminated
/// union contributes one chunk per branch).
pub trait SchemaAdapter {
    fn extract_chunks(&self) -> Result<Vec<DocumentSchemaChunk>>;
}

impl SchemaAdapter for [DocumentSchemaChunk] {
    fn extract_chunks(&self) -> Result<Vec<DocumentSchemaChunk>> {
        Ok(self.to_vec())
    }
}

impl SchemaAdapter for Vec<DocumentSchemaChunk> {
    fn extract_chunks(&self) -> Result<Vec<DocumentSchemaChunk>> {
        Ok(self.clone())
    }
}

impl SchemaAdapter for DocumentSchemaChunk {
    fn extract_chunks(&self) -> Result<Vec<DocumentSchemaChunk>> {
        Ok(vec![self.clone()])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_properties_only_on_objects() {
        let chunk = DocumentSchemaChunk::object([(
            "id",
            vec![DocumentSchemaChunk::scalar("id", ChunkShape::String)],
        )]);
        assert_eq!(chunk.kind(), ChunkKind::Object);
        assert!(chunk.property("id").is_some());
        assert!(chunk.property("missing").is_none());

        let leaf = &chunk.property("id").unwrap()[0];
        assert!(leaf.properties().is_none());
        assert_eq!(leaf.path.as_deref(), Some("id"));
    }

    #[test]
    fn test_serialized_chunk_is_kind_tagged() {
        let chunk = DocumentSchemaChunk::object([(
            "type",
            vec![DocumentSchemaChunk::literal("type", "A")],
        )]);
        let value = serde_json::to_value(&chunk).unwrap();
        assert_eq!(
            value,
            json!({
                "kind": "object",
                "properties": {
                    "type": [{ "path": "type", "kind": "literal", "value": "A" }]
                }
            })
        );

        let parsed: DocumentSchemaChunk = serde_json::from_value(value).unwrap();
        assert_eq!(parsed, chunk);
    }

    #[test]
    fn test_path_helpers() {
        assert_eq!(array_property("parents"), "parents[]");
        assert_eq!(join_path(None, "id"), "id");
        assert_eq!(join_path(Some("parents[]"), "parentId"), "parents[].parentId");
    }
}
