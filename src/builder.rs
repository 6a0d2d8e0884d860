//! Constraint declaration
//!
//! [`ConstraintsBuilder`] owns the schema store and the constraint graph. Each add
//! operation validates everything it needs first and only then mutates, so a
//! rejected declaration leaves the builder exactly as it was.

use tracing::debug;

use crate::error::{ConstraintError, Result};
use crate::graph::{validate_graph, ConstraintGraph};
use crate::index::ConstraintIndex;
use crate::reference::{
    CompoundConstraint, ConstraintEdge, ConstraintVertex, DocumentReference, RefConstraint,
    Reference,
};
use crate::schema::SchemaAdapter;
use crate::store::SchemaChunkStore;
use crate::validator::ReferenceValidator;

#[derive(Debug, Clone, Default)]
pub struct ConstraintsBuilder {
    store: SchemaChunkStore,
    graph: ConstraintGraph,
}

impl ConstraintsBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register the variants produced by `adapter` for a container
    pub fn add_document_schema<A>(&mut self, container_id: &str, adapter: &A) -> Result<()>
    where
        A: SchemaAdapter + ?Sized,
    {
        let chunks = adapter.extract_chunks()?;
        debug!(container = container_id, variants = chunks.len(), "Registering document schema");
        self.store.add_document_schema(container_id, chunks);
        Ok(())
    }

    /// Declare that documents selected by `referencing` point at `referenced`.
    ///
    /// The edge runs from the referenced vertex to the referencing one.
    pub fn add_constraint(
        &mut self,
        referencing: impl Into<Reference>,
        constraint: RefConstraint,
        referenced: DocumentReference,
    ) -> Result<()> {
        let referencing = referencing.into();
        let validator = ReferenceValidator::new(&self.store);

        let referencing_chunks = validator.validate_reference(&referencing)?;
        let referenced_chunks = validator.validate_document_reference(&referenced)?;
        if let Reference::Partition(partition) = &referencing {
            validator.validate_partition_keys_referenced(partition, &constraint.ref_properties)?;
        }
        validator.validate_constraint_properties(
            &referencing,
            &referencing_chunks,
            &referenced,
            &referenced_chunks,
            &constraint.ref_properties,
        )?;

        let from = referenced.key();
        let to_vertex = ConstraintVertex::from(referencing);
        let to = to_vertex.key();
        if from == to {
            return Err(ConstraintError::DuplicateVertex { key: from.to_string() });
        }
        if self.graph.has_edge(&from, &to) {
            return Err(ConstraintError::DuplicateEdge {
                from: from.to_string(),
                to: to.to_string(),
            });
        }

        let edge = match &to_vertex {
            ConstraintVertex::Partition(_) => ConstraintEdge::PartitionToDoc(constraint),
            _ => ConstraintEdge::DocToDoc(constraint),
        };
        self.graph
            .add_vertices([ConstraintVertex::Document(referenced), to_vertex])?;
        self.graph.add_edge(&from, &to, edge)
    }

    /// Declare a compound uniqueness constraint on the selected documents
    pub fn add_compound_constraint(
        &mut self,
        doc_ref: DocumentReference,
        constraint: CompoundConstraint,
    ) -> Result<()> {
        let validator = ReferenceValidator::new(&self.store);
        let chunks = validator.validate_document_reference(&doc_ref)?;
        validator.validate_compound_properties(&doc_ref, &chunks, &constraint.compound_properties)?;

        let document = ConstraintVertex::Document(doc_ref.clone());
        let compound = ConstraintVertex::Compound(doc_ref);
        let (from, to) = (document.key(), compound.key());
        if self.graph.has_edge(&from, &to) {
            return Err(ConstraintError::DuplicateEdge {
                from: from.to_string(),
                to: to.to_string(),
            });
        }

        self.graph.add_vertices([document, compound])?;
        self.graph
            .add_edge(&from, &to, ConstraintEdge::DocToCompound(constraint))
    }

    /// Check the graph for cycles and cascade consistency
    pub fn validate(&self) -> Result<()> {
        validate_graph(&self.graph)
    }

    /// Validate and snapshot the current graph
    pub fn build(&self) -> Result<ConstraintIndex> {
        ConstraintIndex::build(&self.graph)
    }

    pub fn graph(&self) -> &ConstraintGraph {
        &self.graph
    }

    pub fn store(&self) -> &SchemaChunkStore {
        &self.store
    }
}
