//! JSON Schema adapter
//!
//! Lowers a JSON Schema document into schema chunks. Unions (`oneOf`, `anyOf`,
//! `type` arrays) become lists of alternatives, `allOf` members are merged into a
//! single object, and array elements are described under a `name[]` property of
//! the enclosing object.
//!
//! Only local references (`#/$defs/..`, `#/definitions/..`) are followed.
//! Recursive references cannot be lowered to a finite chunk tree and are rejected.

use std::collections::HashSet;

use serde_json::{Map, Value};

use crate::error::{ConstraintError, Result};
use crate::schema::{array_property, join_path, ChunkShape, DocumentSchemaChunk, PropertyMap, SchemaAdapter};

/// [`SchemaAdapter`] over a JSON Schema document
#[derive(Debug, Clone)]
pub struct JsonSchemaAdapter {
    schema: Value,
}

impl JsonSchemaAdapter {
    pub fn new(schema: Value) -> Self {
        Self { schema }
    }

    /// Parse a JSON Schema document from text
    pub fn from_json_str(json: &str) -> Result<Self> {
        Ok(Self::new(serde_json::from_str(json)?))
    }

    pub fn schema(&self) -> &Value {
        &self.schema
    }
}

impl SchemaAdapter for JsonSchemaAdapter {
    fn extract_chunks(&self) -> Result<Vec<DocumentSchemaChunk>> {
        Lowering::new(&self.schema).alternatives(&self.schema, None)
    }
}

/// Lowering state: the document root and the references being expanded
struct Lowering<'a> {
    root: &'a Value,
    expanding: Vec<String>,
}

impl<'a> Lowering<'a> {
    fn new(root: &'a Value) -> Self {
        Self {
            root,
            expanding: Vec::new(),
        }
    }

    /// Every alternative `schema` admits at `path`
    fn alternatives(&mut self, schema: &'a Value, path: Option<&str>) -> Result<Vec<DocumentSchemaChunk>> {
        let object = match schema {
            Value::Bool(true) => return Ok(vec![chunk(path, ChunkShape::Any)]),
            Value::Object(object) => object,
            _ => {
                return Err(ConstraintError::unsupported(
                    path,
                    "schema must be an object or `true`",
                ))
            }
        };

        let mut chunks = if let Some(target) = object.get("$ref").and_then(Value::as_str) {
            let resolved = self.enter_ref(target, path)?;
            let chunks = self.alternatives(resolved, path);
            self.expanding.pop();
            chunks?
        } else if let Some(branches) = union_branches(object) {
            let mut chunks = Vec::new();
            for branch in branches {
                chunks.extend(self.alternatives(branch, path)?);
            }
            chunks
        } else if let Some(parts) = object.get("allOf").and_then(Value::as_array) {
            vec![self.merge_all_of(object, parts, path)?]
        } else if let Some(value) = object.get("const") {
            vec![chunk(path, ChunkShape::Literal { value: value.clone() })]
        } else if let Some(values) = object.get("enum").and_then(Value::as_array) {
            vec![chunk(path, ChunkShape::Enum { values: values.clone() })]
        } else {
            self.typed(object, path)?
        };

        if let Some(default) = object.get("default") {
            chunks = chunks
                .into_iter()
                .map(|chunk| chunk.with_default(default.clone()))
                .collect();
        }
        Ok(chunks)
    }

    fn typed(&mut self, object: &'a Map<String, Value>, path: Option<&str>) -> Result<Vec<DocumentSchemaChunk>> {
        let types: Vec<&str> = match object.get("type") {
            Some(Value::String(json_type)) => vec![json_type.as_str()],
            Some(Value::Array(json_types)) => json_types
                .iter()
                .map(|t| {
                    t.as_str()
                        .ok_or_else(|| ConstraintError::unsupported(path, "`type` entries must be strings"))
                })
                .collect::<Result<_>>()?,
            Some(_) => {
                return Err(ConstraintError::unsupported(
                    path,
                    "`type` must be a string or an array of strings",
                ))
            }
            None if object.contains_key("properties") => vec!["object"],
            None if object.contains_key("items") || object.contains_key("prefixItems") => vec!["array"],
            None => return Ok(vec![chunk(path, ChunkShape::Any)]),
        };

        types
            .into_iter()
            .map(|json_type| self.typed_chunk(object, json_type, path))
            .collect()
    }

    fn typed_chunk(
        &mut self,
        object: &'a Map<String, Value>,
        json_type: &str,
        path: Option<&str>,
    ) -> Result<DocumentSchemaChunk> {
        let shape = match json_type {
            "string" => match object.get("format").and_then(Value::as_str) {
                Some("date") | Some("date-time") => ChunkShape::Date,
                _ => ChunkShape::String,
            },
            "integer" | "number" => ChunkShape::Number,
            "boolean" => ChunkShape::Boolean,
            "null" => ChunkShape::Literal { value: Value::Null },
            "array" => ChunkShape::Array,
            "object" => ChunkShape::Object {
                properties: self.properties(object, path)?,
            },
            other => {
                return Err(ConstraintError::unsupported(
                    path,
                    format!("unknown type `{}`", other),
                ))
            }
        };
        Ok(chunk(path, shape))
    }

    /// Lower the `properties` of an object schema, plus `name[]` element entries
    fn properties(&mut self, object: &'a Map<String, Value>, path: Option<&str>) -> Result<PropertyMap> {
        let mut properties = PropertyMap::new();
        let Some(declared) = object.get("properties") else {
            return Ok(properties);
        };
        let declared = declared
            .as_object()
            .ok_or_else(|| ConstraintError::unsupported(path, "`properties` must be an object"))?;

        let required: HashSet<&str> = object
            .get("required")
            .and_then(Value::as_array)
            .map(|names| names.iter().filter_map(Value::as_str).collect())
            .unwrap_or_default();

        for (name, schema) in declared {
            let property_path = join_path(path, name);
            let optional = !required.contains(name.as_str());
            let alternatives = self
                .alternatives(schema, Some(&property_path))?
                .into_iter()
                .map(|alt| alt.with_optional(optional))
                .collect();
            properties.insert(name.clone(), alternatives);

            let element = array_property(name);
            let items = self.array_items(schema, &join_path(path, &element))?;
            if !items.is_empty() {
                properties.insert(element, items);
            }
        }
        Ok(properties)
    }

    /// Element alternatives of an array schema; empty when there are none
    fn array_items(&mut self, schema: &'a Value, path: &str) -> Result<Vec<DocumentSchemaChunk>> {
        let Value::Object(object) = schema else {
            return Ok(Vec::new());
        };

        if let Some(target) = object.get("$ref").and_then(Value::as_str) {
            let resolved = self.enter_ref(target, Some(path))?;
            let items = self.array_items(resolved, path);
            self.expanding.pop();
            return items;
        }

        let members = union_branches(object).or_else(|| object.get("allOf").and_then(Value::as_array));
        if let Some(members) = members {
            let mut items = Vec::new();
            for member in members {
                items.extend(self.array_items(member, path)?);
            }
            return Ok(items);
        }

        match object.get("prefixItems").or_else(|| object.get("items")) {
            Some(Value::Array(positions)) => {
                let mut items = Vec::new();
                for position in positions {
                    items.extend(self.alternatives(position, Some(path))?);
                }
                Ok(items)
            }
            Some(items) => self.alternatives(items, Some(path)),
            None => Ok(Vec::new()),
        }
    }

    /// Merge the object members of an `allOf`, with any sibling `properties`
    fn merge_all_of(
        &mut self,
        object: &'a Map<String, Value>,
        parts: &'a [Value],
        path: Option<&str>,
    ) -> Result<DocumentSchemaChunk> {
        let mut merged = self.properties(object, path)?;

        for part in parts {
            let alternatives = self.alternatives(part, path)?;
            if alternatives.len() > 1 {
                return Err(ConstraintError::unsupported(path, "`allOf` members cannot be unions"));
            }
            for alternative in alternatives {
                match alternative.shape {
                    ChunkShape::Object { properties } => {
                        for (name, chunks) in properties {
                            let entry = merged.entry(name).or_default();
                            for chunk in chunks {
                                if !entry.contains(&chunk) {
                                    entry.push(chunk);
                                }
                            }
                        }
                    }
                    ChunkShape::Any => {}
                    other => {
                        return Err(ConstraintError::unsupported(
                            path,
                            format!("`allOf` member of kind {} cannot be merged into an object", other.kind()),
                        ))
                    }
                }
            }
        }

        Ok(chunk(path, ChunkShape::Object { properties: merged }))
    }

    /// Resolve a local reference and mark it as being expanded
    fn enter_ref(&mut self, target: &str, path: Option<&str>) -> Result<&'a Value> {
        if self.expanding.iter().any(|r| r == target) {
            return Err(ConstraintError::unsupported(
                path,
                format!("recursive reference {}", target),
            ));
        }
        let pointer = target.strip_prefix('#').ok_or_else(|| {
            ConstraintError::unsupported(path, format!("only local references are supported, got {}", target))
        })?;
        let resolved = self.root.pointer(pointer).ok_or_else(|| {
            ConstraintError::unsupported(path, format!("unresolved reference {}", target))
        })?;
        self.expanding.push(target.to_string());
        Ok(resolved)
    }
}

fn union_branches(object: &Map<String, Value>) -> Option<&Vec<Value>> {
    object
        .get("oneOf")
        .or_else(|| object.get("anyOf"))
        .and_then(Value::as_array)
}

fn chunk(path: Option<&str>, shape: ChunkShape) -> DocumentSchemaChunk {
    DocumentSchemaChunk::new(path.map(String::from), shape)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::ChunkKind;
    use serde_json::json;

    fn lower(schema: Value) -> Vec<DocumentSchemaChunk> {
        JsonSchemaAdapter::new(schema).extract_chunks().unwrap()
    }

    fn kinds(chunks: &[DocumentSchemaChunk]) -> Vec<ChunkKind> {
        chunks.iter().map(DocumentSchemaChunk::kind).collect()
    }

    #[test]
    fn test_object_with_required_and_optional() {
        let chunks = lower(json!({
            "type": "object",
            "properties": {
                "id": { "type": "string" },
                "count": { "type": "integer" },
                "createdAt": { "type": "string", "format": "date-time" }
            },
            "required": ["id"]
        }));

        assert_eq!(chunks.len(), 1);
        let root = &chunks[0];
        assert_eq!(root.path, None);
        let id = &root.property("id").unwrap()[0];
        assert_eq!(id.kind(), ChunkKind::String);
        assert!(!id.optional);
        let count = &root.property("count").unwrap()[0];
        assert_eq!(count.kind(), ChunkKind::Number);
        assert!(count.optional);
        assert_eq!(root.property("createdAt").unwrap()[0].kind(), ChunkKind::Date);
    }

    #[test]
    fn test_nested_object_paths() {
        let chunks = lower(json!({
            "type": "object",
            "properties": {
                "owner": {
                    "type": "object",
                    "properties": { "id": { "type": "string" } }
                }
            }
        }));
        let owner = &chunks[0].property("owner").unwrap()[0];
        let id = &owner.property("id").unwrap()[0];
        assert_eq!(id.path.as_deref(), Some("owner.id"));
    }

    #[test]
    fn test_one_of_yields_one_variant_per_branch() {
        let chunks = lower(json!({
            "oneOf": [
                { "type": "object", "properties": { "type": { "const": "A" }, "name": { "type": "string" } } },
                { "type": "object", "properties": { "type": { "const": "B" } } }
            ]
        }));
        assert_eq!(chunks.len(), 2);
        assert_eq!(chunks[0].property("type").unwrap()[0].literal_value(), Some(&json!("A")));
        assert!(chunks[1].property("name").is_none());
    }

    #[test]
    fn test_type_arrays_and_nullable() {
        let chunks = lower(json!({
            "type": "object",
            "properties": { "deletedAt": { "type": ["string", "null"], "format": "date" } }
        }));
        let alternatives = chunks[0].property("deletedAt").unwrap();
        assert_eq!(kinds(alternatives), vec![ChunkKind::Date, ChunkKind::Literal]);
        assert_eq!(alternatives[1].literal_value(), Some(&Value::Null));
    }

    #[test]
    fn test_array_elements_under_marker_property() {
        let chunks = lower(json!({
            "type": "object",
            "properties": {
                "parents": {
                    "type": "array",
                    "items": {
                        "type": "object",
                        "properties": { "parentId": { "type": "string" } },
                        "required": ["parentId"]
                    }
                },
                "pair": { "type": "array", "items": [{ "type": "string" }, { "type": "number" }] }
            }
        }));
        let root = &chunks[0];
        assert_eq!(root.property("parents").unwrap()[0].kind(), ChunkKind::Array);

        let element = &root.property("parents[]").unwrap()[0];
        assert_eq!(element.path.as_deref(), Some("parents[]"));
        let parent_id = &element.property("parentId").unwrap()[0];
        assert_eq!(parent_id.path.as_deref(), Some("parents[].parentId"));

        assert_eq!(
            kinds(root.property("pair[]").unwrap()),
            vec![ChunkKind::String, ChunkKind::Number]
        );
    }

    #[test]
    fn test_enum_and_default() {
        let chunks = lower(json!({
            "type": "object",
            "properties": {
                "status": { "enum": ["open", "closed"], "default": "open" }
            }
        }));
        let status = &chunks[0].property("status").unwrap()[0];
        assert_eq!(status.enum_values(), Some(&[json!("open"), json!("closed")][..]));
        assert_eq!(status.default_value, Some(json!("open")));
    }

    #[test]
    fn test_untyped_schemas_are_any() {
        let chunks = lower(json!({
            "type": "object",
            "properties": { "payload": {}, "extra": true }
        }));
        assert_eq!(chunks[0].property("payload").unwrap()[0].kind(), ChunkKind::Any);
        assert_eq!(chunks[0].property("extra").unwrap()[0].kind(), ChunkKind::Any);
    }

    #[test]
    fn test_local_refs_and_all_of() {
        let chunks = lower(json!({
            "$defs": {
                "Base": { "type": "object", "properties": { "id": { "type": "string" } } },
                "Tenant": { "type": "object", "properties": { "tenantId": { "type": "string" } } }
            },
            "allOf": [{ "$ref": "#/$defs/Base" }, { "$ref": "#/$defs/Tenant" }],
            "properties": { "owner": { "$ref": "#/$defs/Base" } }
        }));
        assert_eq!(chunks.len(), 1);
        let root = &chunks[0];
        assert!(root.property("id").is_some());
        assert!(root.property("tenantId").is_some());
        let owner_id = &root.property("owner").unwrap()[0].property("id").unwrap()[0];
        assert_eq!(owner_id.path.as_deref(), Some("owner.id"));
    }

    #[test]
    fn test_unsupported_schemas() {
        let recursive = JsonSchemaAdapter::new(json!({
            "$defs": {
                "Node": { "type": "object", "properties": { "next": { "$ref": "#/$defs/Node" } } }
            },
            "$ref": "#/$defs/Node"
        }));
        let err = recursive.extract_chunks().unwrap_err();
        assert!(matches!(err, ConstraintError::UnsupportedSchema { ref path, .. } if path == "next"));

        let unknown = JsonSchemaAdapter::new(json!({ "type": "object", "properties": { "x": { "type": "decimal" } } }));
        assert_eq!(
            unknown.extract_chunks().unwrap_err().to_string(),
            "Unsupported schema at x: unknown type `decimal`"
        );

        let remote = JsonSchemaAdapter::new(json!({ "$ref": "other.json#/Foo" }));
        assert!(matches!(remote.extract_chunks(), Err(ConstraintError::UnsupportedSchema { .. })));
    }
}
