//! Reference validation against the registered schema chunks
//!
//! Every check here is a pure read of the [`SchemaChunkStore`]; the builder runs
//! them all before it touches the constraint graph.

use std::collections::BTreeMap;

use crate::error::{ConstraintError, ReferenceSide, Result};
use crate::matcher::{
    chunks_with_property, find_document_schema_chunks, find_partition_schema_chunks, resolve,
};
use crate::reference::{DocumentReference, PartitionReference, Reference};
use crate::schema::DocumentSchemaChunk;
use crate::store::SchemaChunkStore;

/// Validates references and property paths against a chunk store
#[derive(Debug, Clone, Copy)]
pub struct ReferenceValidator<'a> {
    store: &'a SchemaChunkStore,
}

impl<'a> ReferenceValidator<'a> {
    pub fn new(store: &'a SchemaChunkStore) -> Self {
        Self { store }
    }

    /// The variants selected by `doc_ref`; fails when there are none
    pub fn validate_document_reference(
        &self,
        doc_ref: &DocumentReference,
    ) -> Result<Vec<&'a DocumentSchemaChunk>> {
        let chunks = find_document_schema_chunks(self.store, doc_ref);
        if chunks.is_empty() {
            return Err(ConstraintError::MissingSchema {
                container_id: doc_ref.container_id.clone(),
                selector: doc_ref.selector(),
            });
        }
        Ok(chunks)
    }

    /// The variants carrying the partition key; every variant of the container must
    pub fn validate_partition_reference(
        &self,
        partition_ref: &PartitionReference,
    ) -> Result<Vec<&'a DocumentSchemaChunk>> {
        let chunks = find_partition_schema_chunks(self.store, partition_ref);
        if chunks.is_empty() {
            return Err(ConstraintError::MissingSchema {
                container_id: partition_ref.container_id.clone(),
                selector: partition_ref.selector(),
            });
        }
        if chunks.len() != self.store.chunks(&partition_ref.container_id).len() {
            return Err(ConstraintError::InvalidPartitionReference {
                container_id: partition_ref.container_id.clone(),
                properties: partition_ref.selector(),
            });
        }
        Ok(chunks)
    }

    /// Validates either side of a reference constraint, returning its variants
    pub fn validate_reference(&self, reference: &Reference) -> Result<Vec<&'a DocumentSchemaChunk>> {
        match reference {
            Reference::Document(doc_ref) => self.validate_document_reference(doc_ref),
            Reference::Partition(partition_ref) => self.validate_partition_reference(partition_ref),
        }
    }

    /// Every partition key property must be mapped by the constraint
    pub fn validate_partition_keys_referenced(
        &self,
        partition_ref: &PartitionReference,
        ref_properties: &BTreeMap<String, String>,
    ) -> Result<()> {
        let all_referenced = partition_ref
            .partition_key_properties
            .iter()
            .all(|key| ref_properties.contains_key(key));
        if !all_referenced {
            return Err(ConstraintError::PartitionKeyNotReferenced {
                container_id: partition_ref.container_id.clone(),
                properties: partition_ref.selector(),
            });
        }
        Ok(())
    }

    /// Each mapped path must resolve in at least one variant of its side
    pub fn validate_constraint_properties(
        &self,
        referencing: &Reference,
        referencing_chunks: &[&DocumentSchemaChunk],
        referenced: &DocumentReference,
        referenced_chunks: &[&DocumentSchemaChunk],
        ref_properties: &BTreeMap<String, String>,
    ) -> Result<()> {
        for (referencing_path, referenced_path) in ref_properties {
            if chunks_with_property(referencing_chunks, referencing_path).is_empty() {
                return Err(ConstraintError::PropertyNotFound {
                    side: ReferenceSide::Referencing,
                    container_id: referencing.container_id().to_string(),
                    selector: referencing.selector(),
                    path: referencing_path.clone(),
                });
            }
            if chunks_with_property(referenced_chunks, referenced_path).is_empty() {
                return Err(ConstraintError::PropertyNotFound {
                    side: ReferenceSide::Referenced,
                    container_id: referenced.container_id.clone(),
                    selector: referenced.selector(),
                    path: referenced_path.clone(),
                });
            }
        }
        Ok(())
    }

    /// Each compound path must resolve in every selected variant
    pub fn validate_compound_properties(
        &self,
        doc_ref: &DocumentReference,
        chunks: &[&DocumentSchemaChunk],
        compound_properties: &[String],
    ) -> Result<()> {
        let all_present = chunks.iter().all(|chunk| {
            compound_properties
                .iter()
                .all(|path| !resolve([*chunk], path).is_empty())
        });
        if !all_present {
            return Err(ConstraintError::CompoundProperty {
                container_id: doc_ref.container_id.clone(),
                selector: doc_ref.selector(),
                properties: compound_properties.to_vec(),
            });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::reference::RefConstraint;
    use crate::schema::ChunkShape;
    use serde_json::json;

    fn variant(tag: &str, extra: &str) -> DocumentSchemaChunk {
        DocumentSchemaChunk::object([
            ("id", vec![DocumentSchemaChunk::scalar("id", ChunkShape::String)]),
            ("type", vec![DocumentSchemaChunk::literal("type", tag)]),
            (extra, vec![DocumentSchemaChunk::scalar(extra, ChunkShape::String)]),
        ])
    }

    fn store() -> SchemaChunkStore {
        let mut store = SchemaChunkStore::new();
        store.add_document_schema("c1", vec![variant("A", "name"), variant("B", "email")]);
        store.add_document_schema("c2", vec![variant("X", "buddyId")]);
        store
    }

    #[test]
    fn test_missing_schema_for_unknown_container_and_selector() {
        let store = store();
        let validator = ReferenceValidator::new(&store);

        let err = validator
            .validate_document_reference(&DocumentReference::new("nope"))
            .unwrap_err();
        assert!(matches!(err, ConstraintError::MissingSchema { ref container_id, .. } if container_id == "nope"));

        let err = validator
            .validate_document_reference(&DocumentReference::new("c1").with_doc_type(json!({ "type": "Z" })))
            .unwrap_err();
        assert_eq!(
            err.to_string(),
            r#"Missing schema for container c1 and selector {"type":"Z"}"#
        );
    }

    #[test]
    fn test_property_not_found_names_side() {
        let store = store();
        let validator = ReferenceValidator::new(&store);
        let referencing: Reference = DocumentReference::new("c2").with_doc_type(json!({ "type": "X" })).into();
        let referenced = DocumentReference::new("c1").with_doc_type(json!({ "type": "A" }));
        let referencing_chunks = validator.validate_reference(&referencing).unwrap();
        let referenced_chunks = validator.validate_document_reference(&referenced).unwrap();

        let check = |constraint: RefConstraint| {
            validator.validate_constraint_properties(
                &referencing,
                &referencing_chunks,
                &referenced,
                &referenced_chunks,
                &constraint.ref_properties,
            )
        };

        assert!(check(RefConstraint::new([("buddyId", "id")])).is_ok());

        let err = check(RefConstraint::new([("buddyIdx", "id")])).unwrap_err();
        assert_eq!(
            err.to_string(),
            r#"Failed to validate referencing constraint c2/{"type":"X"}/buddyIdx: property not found"#
        );

        let err = check(RefConstraint::new([("buddyId", "email")])).unwrap_err();
        match err {
            ConstraintError::PropertyNotFound { side, container_id, path, .. } => {
                assert_eq!(side, ReferenceSide::Referenced);
                assert_eq!(container_id, "c1");
                assert_eq!(path, "email");
            }
            other => panic!("Expected PropertyNotFound, got {:?}", other),
        }
    }

    #[test]
    fn test_partition_key_must_be_in_every_variant() {
        let store = store();
        let validator = ReferenceValidator::new(&store);

        assert_eq!(
            validator
                .validate_partition_reference(&PartitionReference::new("c1", ["id"]))
                .unwrap()
                .len(),
            2
        );

        let err = validator
            .validate_partition_reference(&PartitionReference::new("c1", ["email"]))
            .unwrap_err();
        assert!(matches!(err, ConstraintError::InvalidPartitionReference { .. }));

        let err = validator
            .validate_partition_reference(&PartitionReference::new("c1", ["missing"]))
            .unwrap_err();
        assert!(matches!(err, ConstraintError::MissingSchema { .. }));
    }

    #[test]
    fn test_partition_keys_must_be_mapped() {
        let store = store();
        let validator = ReferenceValidator::new(&store);
        let partition = PartitionReference::new("c1", ["id"]);

        assert!(validator
            .validate_partition_keys_referenced(&partition, &RefConstraint::new([("id", "id")]).ref_properties)
            .is_ok());
        let err = validator
            .validate_partition_keys_referenced(&partition, &RefConstraint::new([("type", "id")]).ref_properties)
            .unwrap_err();
        assert!(matches!(err, ConstraintError::PartitionKeyNotReferenced { .. }));
    }

    #[test]
    fn test_compound_properties_required_in_every_variant() {
        let store = store();
        let validator = ReferenceValidator::new(&store);
        let doc = DocumentReference::new("c1");
        let chunks = validator.validate_document_reference(&doc).unwrap();

        assert!(validator
            .validate_compound_properties(&doc, &chunks, &["id".to_string(), "type".to_string()])
            .is_ok());

        let err = validator
            .validate_compound_properties(&doc, &chunks, &["id".to_string(), "name".to_string()])
            .unwrap_err();
        assert_eq!(
            err.to_string(),
            "Failed to validate compound constraint c1/{}/id,name: compound properties must be present in each of the referenced document schema chunks"
        );
    }
}
