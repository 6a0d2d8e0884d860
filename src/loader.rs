//! Schema Loading
//!
//! Registers JSON Schema files from a directory tree laid out as
//! `<dir>/<container_id>/**/*.json`. Every file is one document schema of the
//! container named by its first path component. Files are visited in file-name
//! order and the bundle hash covers their contents in that order.

use std::fs;
use std::path::{Path, PathBuf};

use sha2::{Digest, Sha256};
use tracing::{debug, info};
use walkdir::WalkDir;

use crate::adapter::JsonSchemaAdapter;
use crate::builder::ConstraintsBuilder;
use crate::error::{ConstraintError, Result};
use crate::schema::{DocumentSchemaChunk, SchemaAdapter};

/// Configuration for schema loading
#[derive(Debug, Clone)]
pub struct LoadConfig {
    /// Skip files whose path relative to the schema directory starts with one of these
    pub skip_prefixes: Vec<String>,
}

impl Default for LoadConfig {
    fn default() -> Self {
        Self {
            skip_prefixes: vec![
                ".git/".to_string(),
                "target/".to_string(),
                "node_modules/".to_string(),
            ],
        }
    }
}

/// What a directory load registered
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LoadReport {
    /// Loaded files, relative to the schema directory, in load order
    pub files: Vec<PathBuf>,
    /// Containers in first-seen order
    pub containers: Vec<String>,
    /// SHA-256 over the file contents, in load order
    pub bundle_hash: String,
}

/// Load every container schema under `schema_dir` into `builder`.
///
/// Nothing is registered unless every file parses and lowers.
pub fn load_from_directory(
    builder: &mut ConstraintsBuilder,
    schema_dir: &Path,
    config: &LoadConfig,
) -> Result<LoadReport> {
    let mut hasher = Sha256::new();
    let mut report = LoadReport::default();
    let mut pending: Vec<(String, Vec<DocumentSchemaChunk>)> = Vec::new();

    for entry in WalkDir::new(schema_dir).min_depth(2).sort_by_file_name() {
        let entry = entry.map_err(std::io::Error::from)?;
        let path = entry.path();
        if !entry.file_type().is_file() || path.extension().map_or(true, |ext| ext != "json") {
            continue;
        }

        let Ok(relative_path) = path.strip_prefix(schema_dir) else {
            continue;
        };
        let relative_str = relative_path.to_string_lossy().replace('\\', "/");
        if config.skip_prefixes.iter().any(|p| relative_str.starts_with(p.as_str())) {
            debug!(file = %relative_str, "Skipping schema file");
            continue;
        }
        let Some(container_id) = relative_path
            .components()
            .next()
            .and_then(|c| c.as_os_str().to_str())
            .map(String::from)
        else {
            continue;
        };

        let content = fs::read_to_string(path)?;
        hasher.update(content.as_bytes());

        let chunks = JsonSchemaAdapter::from_json_str(&content)
            .and_then(|adapter| adapter.extract_chunks())
            .map_err(|source| ConstraintError::SchemaFile {
                path: relative_path.to_path_buf(),
                source: Box::new(source),
            })?;
        debug!(file = %relative_str, container = %container_id, variants = chunks.len(), "Lowered schema file");

        if !report.containers.contains(&container_id) {
            report.containers.push(container_id.clone());
        }
        report.files.push(relative_path.to_path_buf());
        pending.push((container_id, chunks));
    }

    for (container_id, chunks) in pending {
        builder.add_document_schema(&container_id, &chunks)?;
    }

    report.bundle_hash = format!("{:x}", hasher.finalize());
    info!(
        files = report.files.len(),
        containers = report.containers.len(),
        bundle_hash = %report.bundle_hash,
        "Loaded schemas"
    );
    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn write(dir: &Path, relative: &str, content: &str) {
        let path = dir.join(relative);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, content).unwrap();
    }

    fn object_schema(tag: &str) -> String {
        format!(
            r#"{{"type":"object","properties":{{"id":{{"type":"string"}},"type":{{"const":"{}"}}}},"required":["id","type"]}}"#,
            tag
        )
    }

    #[test]
    fn test_registers_one_container_per_directory() {
        let dir = TempDir::new().unwrap();
        write(dir.path(), "users/b.json", &object_schema("member"));
        write(dir.path(), "users/a.json", &object_schema("admin"));
        write(dir.path(), "posts/post.json", &object_schema("post"));
        write(dir.path(), "README.json", "{}");
        write(dir.path(), "users/notes.txt", "not a schema");

        let mut builder = ConstraintsBuilder::new();
        let report = load_from_directory(&mut builder, dir.path(), &LoadConfig::default()).unwrap();

        assert_eq!(report.containers, vec!["posts", "users"]);
        assert_eq!(
            report.files,
            vec![
                PathBuf::from("posts/post.json"),
                PathBuf::from("users/a.json"),
                PathBuf::from("users/b.json")
            ]
        );
        let users = builder.store().chunks("users");
        assert_eq!(users.len(), 2);
        assert_eq!(
            users[0].property("type").unwrap()[0].literal_value(),
            Some(&serde_json::json!("admin"))
        );
    }

    #[test]
    fn test_bundle_hash_is_stable() {
        let load = || {
            let dir = TempDir::new().unwrap();
            write(dir.path(), "c1/a.json", &object_schema("A"));
            write(dir.path(), "c2/x.json", &object_schema("X"));
            load_from_directory(&mut ConstraintsBuilder::new(), dir.path(), &LoadConfig::default())
                .unwrap()
                .bundle_hash
        };
        let first = load();
        assert_eq!(first, load());
        assert_eq!(first.len(), 64);
    }

    #[test]
    fn test_skip_prefixes() {
        let dir = TempDir::new().unwrap();
        write(dir.path(), "c1/a.json", &object_schema("A"));
        write(dir.path(), "drafts/x.json", &object_schema("X"));

        let config = LoadConfig {
            skip_prefixes: vec!["drafts/".to_string()],
        };
        let mut builder = ConstraintsBuilder::new();
        let report = load_from_directory(&mut builder, dir.path(), &config).unwrap();
        assert_eq!(report.containers, vec!["c1"]);
        assert!(!builder.store().contains("drafts"));
    }

    #[test]
    fn test_failing_file_registers_nothing() {
        let dir = TempDir::new().unwrap();
        write(dir.path(), "c1/a.json", &object_schema("A"));
        write(dir.path(), "c1/b.json", r#"{"type":"object","properties":{"x":{"type":"decimal"}}}"#);

        let mut builder = ConstraintsBuilder::new();
        let err = load_from_directory(&mut builder, dir.path(), &LoadConfig::default()).unwrap_err();
        assert!(err.to_string().starts_with("Failed to load schema file c1"));
        assert!(matches!(
            err,
            ConstraintError::SchemaFile { ref source, .. } if matches!(**source, ConstraintError::UnsupportedSchema { .. })
        ));
        assert_eq!(builder.store().variant_count(), 0);
    }
}
