//! Constraint declaration files
//!
//! A TOML file of `[[constraint]]` tables, each tagged by `kind`:
//!
//! ```toml
//! [[constraint]]
//! kind = "reference"
//! cascade_delete = true
//! referencing = { type = "document", container_id = "posts", ref_doc_type = { type = "post" } }
//! referenced = { container_id = "users" }
//! ref_properties = { authorId = "id" }
//!
//! [[constraint]]
//! kind = "compound"
//! document = { container_id = "users" }
//! compound_properties = ["tenantId", "email"]
//! ```

use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::builder::ConstraintsBuilder;
use crate::error::{ConstraintError, Result};
use crate::reference::{CompoundConstraint, DocumentReference, RefConstraint, Reference};

/// One declared constraint
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ConstraintDeclaration {
    Reference {
        referencing: Reference,
        referenced: DocumentReference,
        ref_properties: BTreeMap<String, String>,
        #[serde(default)]
        cascade_delete: bool,
    },
    Compound {
        document: DocumentReference,
        compound_properties: Vec<String>,
        #[serde(default)]
        cascade_delete: bool,
    },
}

impl ConstraintDeclaration {
    /// Add this constraint to `builder`
    pub fn apply(&self, builder: &mut ConstraintsBuilder) -> Result<()> {
        match self {
            ConstraintDeclaration::Reference {
                referencing,
                referenced,
                ref_properties,
                cascade_delete,
            } => {
                if ref_properties.is_empty() {
                    return Err(ConstraintError::InvalidDeclaration(format!(
                        "reference constraint from {}/{} maps no properties",
                        referencing.container_id(),
                        referencing.selector()
                    )));
                }
                let constraint = RefConstraint {
                    cascade_delete: *cascade_delete,
                    ref_properties: ref_properties.clone(),
                };
                builder.add_constraint(referencing.clone(), constraint, referenced.clone())
            }
            ConstraintDeclaration::Compound {
                document,
                compound_properties,
                cascade_delete,
            } => {
                if compound_properties.is_empty() {
                    return Err(ConstraintError::InvalidDeclaration(format!(
                        "compound constraint on {}/{} lists no properties",
                        document.container_id,
                        document.selector()
                    )));
                }
                let constraint = CompoundConstraint {
                    cascade_delete: *cascade_delete,
                    compound_properties: compound_properties.clone(),
                };
                builder.add_compound_constraint(document.clone(), constraint)
            }
        }
    }
}

/// Contents of a declaration file
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ConstraintDeclarations {
    #[serde(default, rename = "constraint")]
    pub constraints: Vec<ConstraintDeclaration>,
}

impl ConstraintDeclarations {
    pub fn from_toml_str(content: &str) -> Result<Self> {
        Ok(toml::from_str(content)?)
    }

    pub fn from_path(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)?;
        Self::from_toml_str(&content)
    }

    /// Add every declaration in file order, stopping at the first failure
    pub fn apply(&self, builder: &mut ConstraintsBuilder) -> Result<()> {
        for (position, declaration) in self.constraints.iter().enumerate() {
            debug!(position, "Applying constraint declaration");
            declaration.apply(builder)?;
        }
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.constraints.len()
    }

    pub fn is_empty(&self) -> bool {
        self.constraints.is_empty()
    }
}
