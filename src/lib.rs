//! Referential Constraints
//!
//! Declares and validates referential-integrity constraints between documents of a
//! container-partitioned document store, and answers "what depends on this
//! document" queries for delete executors.
//!
//! ## Features
//!
//! - **Schema Chunks**: document schemas lowered to per-variant chunk trees
//! - **Reference Validation**: constraint properties checked against every variant
//! - **Constraint Graph**: acyclic, with cascade-delete consistency enforced
//! - **Constraint Index**: immutable snapshot of every downstream path
//! - **Loading**: JSON Schema directories and TOML declaration files
//!
//! ## Architecture
//!
//! ```text
//! JSON Schema ──adapter──▶ SchemaChunkStore ──validator──┐
//!                                                         ▼
//! declarations ──▶ ConstraintsBuilder ──▶ ConstraintGraph ──validate──▶ ConstraintIndex
//! ```
//!
//! ## Example
//!
//! ```
//! use referential_constraints::{
//!     ChunkShape, ConstraintsBuilder, DocumentReference, DocumentSchemaChunk, RefConstraint,
//! };
//!
//! let string = |path: &str| vec![DocumentSchemaChunk::scalar(path, ChunkShape::String)];
//! let mut builder = ConstraintsBuilder::new();
//! builder.add_document_schema("users", &DocumentSchemaChunk::object([("id", string("id"))]))?;
//! builder.add_document_schema("posts", &DocumentSchemaChunk::object([("authorId", string("authorId"))]))?;
//!
//! builder.add_constraint(
//!     DocumentReference::new("posts"),
//!     RefConstraint::new([("authorId", "id")]).cascading(),
//!     DocumentReference::new("users"),
//! )?;
//!
//! let index = builder.build()?;
//! let direct = index.get_direct_cascade_delete_constraints("users", None);
//! assert_eq!(direct[0].to_key.as_str(), "posts/{}");
//! # Ok::<(), referential_constraints::ConstraintError>(())
//! ```

pub mod adapter;
pub mod builder;
pub mod checksum;
pub mod config;
pub mod declarations;
pub mod error;
pub mod graph;
pub mod index;
pub mod loader;
pub mod matcher;
pub mod reference;
pub mod schema;
pub mod store;
pub mod validator;

pub use adapter::JsonSchemaAdapter;
pub use builder::ConstraintsBuilder;
pub use checksum::{to_canonical_string, Checksum};
pub use config::{CheckConfig, OutputFormat};
pub use declarations::{ConstraintDeclaration, ConstraintDeclarations};
pub use error::{ConstraintError, ReferenceSide, Result};
pub use graph::ConstraintGraph;
pub use index::{ConstraintIndex, ConstraintPathElement};
pub use loader::{load_from_directory, LoadConfig, LoadReport};
pub use matcher::is_partial_match;
pub use reference::{
    CompoundConstraint, ConstraintEdge, ConstraintVertex, DocumentReference, PartitionReference,
    RefConstraint, RefDocType, Reference, VertexKey,
};
pub use schema::{ChunkKind, ChunkShape, DocumentSchemaChunk, SchemaAdapter};
pub use store::SchemaChunkStore;
pub use validator::ReferenceValidator;
