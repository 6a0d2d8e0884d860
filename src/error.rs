//! Error types for constraint declaration, validation and loading

use std::fmt;
use std::path::PathBuf;

use thiserror::Error;

/// Result type for constraint operations
pub type Result<T> = std::result::Result<T, ConstraintError>;

/// Which side of a reference constraint a property path belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ReferenceSide {
    /// The document (or partition) holding the reference
    Referencing,
    /// The document being pointed at
    Referenced,
}

impl fmt::Display for ReferenceSide {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ReferenceSide::Referencing => write!(f, "referencing"),
            ReferenceSide::Referenced => write!(f, "referenced"),
        }
    }
}

/// Constraint errors
#[derive(Error, Debug)]
pub enum ConstraintError {
    #[error("Missing schema for container {container_id} and selector {selector}")]
    MissingSchema {
        container_id: String,
        selector: String,
    },

    #[error("Failed to validate {side} constraint {container_id}/{selector}/{path}: property not found")]
    PropertyNotFound {
        side: ReferenceSide,
        container_id: String,
        selector: String,
        path: String,
    },

    #[error(
        "Failed to validate compound constraint {container_id}/{selector}/{}: compound properties must be present in each of the referenced document schema chunks",
        .properties.join(",")
    )]
    CompoundProperty {
        container_id: String,
        selector: String,
        properties: Vec<String>,
    },

    #[error(
        "Partition key properties {properties} do not match schema for container {container_id}: all documents must contain the provided partition key properties"
    )]
    InvalidPartitionReference {
        container_id: String,
        properties: String,
    },

    #[error(
        "Failed to validate referencing constraint {container_id}/{properties}: all of the partition keys must be present in the keys of the constraint ref_properties"
    )]
    PartitionKeyNotReferenced {
        container_id: String,
        properties: String,
    },

    #[error("Duplicate vertex {key}: a constraint cannot reference the same selector on both sides")]
    DuplicateVertex { key: String },

    #[error("Duplicate edge: a constraint from {from} to {to} already exists")]
    DuplicateEdge { from: String, to: String },

    #[error("Unknown vertex: {key}")]
    UnknownVertex { key: String },

    #[error("Validation failed: cycles detected in the constraints graph, only acyclic constraint graphs are supported")]
    CycleDetected,

    #[error(
        "Validation failed: cascade delete is not set for all edges in the path(s): {}. All edges downstream of a cascading constraint must cascade.",
        .paths.join(", ")
    )]
    CascadeDeleteInconsistency { paths: Vec<String> },

    #[error("Unsupported schema at {path}: {reason}")]
    UnsupportedSchema { path: String, reason: String },

    #[error("Failed to load schema file {}: {source}", .path.display())]
    SchemaFile {
        path: PathBuf,
        #[source]
        source: Box<ConstraintError>,
    },

    #[error("Invalid declaration: {0}")]
    InvalidDeclaration(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("TOML error: {0}")]
    Toml(#[from] toml::de::Error),
}

impl ConstraintError {
    pub(crate) fn unsupported(path: Option<&str>, reason: impl Into<String>) -> Self {
        ConstraintError::UnsupportedSchema {
            path: path.unwrap_or("<root>").to_string(),
            reason: reason.into(),
        }
    }
}
