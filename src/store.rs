//! Per-container schema chunk store
//!
//! Append-only: every registration adds variants to the container's list, in
//! order. Nothing is validated here.

use std::collections::HashMap;

use crate::schema::DocumentSchemaChunk;

/// Registered schema variants, per container
#[derive(Debug, Clone, Default)]
pub struct SchemaChunkStore {
    chunks: HashMap<String, Vec<DocumentSchemaChunk>>,
    /// Container ids in first-registration order
    order: Vec<String>,
}

impl SchemaChunkStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append variants to a container's list
    pub fn add_document_schema(
        &mut self,
        container_id: impl Into<String>,
        chunks: impl IntoIterator<Item = DocumentSchemaChunk>,
    ) {
        let container_id = container_id.into();
        if !self.chunks.contains_key(&container_id) {
            self.order.push(container_id.clone());
        }
        self.chunks.entry(container_id).or_default().extend(chunks);
    }

    /// Every variant registered for a container, in registration order
    pub fn chunks(&self, container_id: &str) -> &[DocumentSchemaChunk] {
        self.chunks
            .get(container_id)
            .map(Vec::as_slice)
            .unwrap_or_default()
    }

    pub fn contains(&self, container_id: &str) -> bool {
        !self.chunks(container_id).is_empty()
    }

    pub fn container_ids(&self) -> impl Iterator<Item = &str> {
        self.order.iter().map(String::as_str)
    }

    /// Number of variants across every container
    pub fn variant_count(&self) -> usize {
        self.chunks.values().map(Vec::len).sum()
    }
}
