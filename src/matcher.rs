//! Property path matching
//!
//! Paths are dotted property names (`parents[].parentId`); array elements are
//! addressed through the `[]` marker that adapters put on the property name. A
//! path lookup walks a frontier of alternative chunks: at each segment the
//! alternatives of that property, across the whole frontier, become the next
//! frontier. A lookup is satisfied as soon as any alternative carries the path.

use serde_json::{Map, Value};

use crate::reference::{DocumentReference, PartitionReference};
use crate::schema::{ChunkKind, DocumentSchemaChunk, PATH_SEPARATOR};
use crate::store::SchemaChunkStore;

/// Resolve `path` through `chunks`, returning every chunk found at its end.
///
/// An empty result means the path does not exist in any alternative.
pub fn resolve<'a, I>(chunks: I, path: &str) -> Vec<&'a DocumentSchemaChunk>
where
    I: IntoIterator<Item = &'a DocumentSchemaChunk>,
{
    let mut frontier: Vec<&'a DocumentSchemaChunk> = chunks.into_iter().collect();
    for segment in path.split(PATH_SEPARATOR) {
        frontier = frontier
            .iter()
            .copied()
            .filter_map(|chunk: &'a DocumentSchemaChunk| chunk.property(segment))
            .flatten()
            .collect();
        if frontier.is_empty() {
            break;
        }
    }
    frontier
}

/// The chunks among `chunks` in which `path` resolves
pub fn chunks_with_property<'a>(
    chunks: &[&'a DocumentSchemaChunk],
    path: &str,
) -> Vec<&'a DocumentSchemaChunk> {
    chunks
        .iter()
        .copied()
        .filter(|chunk| !resolve([*chunk], path).is_empty())
        .collect()
}

/// Variants of the referenced container selected by the reference's pattern
pub fn find_document_schema_chunks<'a>(
    store: &'a SchemaChunkStore,
    doc_ref: &DocumentReference,
) -> Vec<&'a DocumentSchemaChunk> {
    let chunks = store.chunks(&doc_ref.container_id);
    match &doc_ref.ref_doc_type {
        Some(pattern) if !pattern.is_empty() => match_pattern(chunks.iter(), pattern),
        _ => chunks.iter().collect(),
    }
}

/// Variants of the container carrying every partition key property
pub fn find_partition_schema_chunks<'a>(
    store: &'a SchemaChunkStore,
    partition_ref: &PartitionReference,
) -> Vec<&'a DocumentSchemaChunk> {
    let mut chunks: Vec<&DocumentSchemaChunk> = store.chunks(&partition_ref.container_id).iter().collect();
    for property in &partition_ref.partition_key_properties {
        chunks = chunks_with_property(&chunks, property);
        if chunks.is_empty() {
            break;
        }
    }
    chunks
}

fn match_pattern<'a, I>(chunks: I, pattern: &Map<String, Value>) -> Vec<&'a DocumentSchemaChunk>
where
    I: IntoIterator<Item = &'a DocumentSchemaChunk>,
{
    chunks
        .into_iter()
        .filter(|chunk| {
            pattern
                .iter()
                .all(|(property, expected)| property_matches(chunk, property, expected))
        })
        .collect()
}

fn property_matches(chunk: &DocumentSchemaChunk, property: &str, expected: &Value) -> bool {
    let Some(alternatives) = chunk.property(property) else {
        return false;
    };
    match expected {
        Value::Object(nested) => !match_pattern(alternatives, nested).is_empty(),
        _ => alternatives.iter().any(|alt| scalar_matches(alt, expected)),
    }
}

fn scalar_matches(chunk: &DocumentSchemaChunk, expected: &Value) -> bool {
    if let Some(value) = chunk.literal_value() {
        return value == expected;
    }
    if let Some(values) = chunk.enum_values() {
        return values.contains(expected);
    }
    runtime_kind(expected) == Some(chunk.kind())
}

/// Primitive chunk kind of a JSON scalar, if it has one
fn runtime_kind(value: &Value) -> Option<ChunkKind> {
    match value {
        Value::String(_) => Some(ChunkKind::String),
        Value::Number(_) => Some(ChunkKind::Number),
        Value::Bool(_) => Some(ChunkKind::Boolean),
        _ => None,
    }
}

/// Recursive subset match: every key of `pattern` exists in `candidate` with an
/// equal (scalars, arrays) or recursively matching (objects) value.
pub fn is_partial_match(candidate: &Map<String, Value>, pattern: &Map<String, Value>) -> bool {
    pattern.iter().all(|(key, expected)| match (candidate.get(key), expected) {
        (Some(Value::Object(actual)), Value::Object(expected)) => is_partial_match(actual, expected),
        (Some(actual), expected) => actual == expected,
        (None, _) => false,
    })
}
