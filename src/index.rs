//! Constraint Index
//!
//! Immutable snapshot built from a validated [`ConstraintGraph`]. For every vertex
//! the index stores each simple downstream path, expanded into path elements, so
//! that a delete executor can walk everything a document's removal touches
//! without going back to the graph.

use std::collections::{HashMap, HashSet};

use serde::Serialize;
use serde_json::{json, Value};
use tracing::{debug, info};

use crate::checksum::Checksum;
use crate::error::Result;
use crate::graph::algo::simple_path_slots;
use crate::graph::{validate_graph, ConstraintGraph};
use crate::matcher::is_partial_match;
use crate::reference::{ConstraintEdge, ConstraintVertex, RefDocType, VertexKey};

/// One hop of a stored path: the edge between two vertices
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ConstraintPathElement {
    pub from_key: VertexKey,
    pub from: ConstraintVertex,
    pub to_key: VertexKey,
    pub to: ConstraintVertex,
    pub constraint: ConstraintEdge,
}

/// Read-only constraint lookups
#[derive(Debug, Clone)]
pub struct ConstraintIndex {
    graph: ConstraintGraph,
    paths: HashMap<VertexKey, Vec<Vec<ConstraintPathElement>>>,
}

impl ConstraintIndex {
    /// Validate `graph` and snapshot every downstream path
    pub fn build(graph: &ConstraintGraph) -> Result<Self> {
        validate_graph(graph)?;

        let graph = graph.clone();
        let mut paths = HashMap::with_capacity(graph.vertex_count());
        for start in 0..graph.vertex_count() {
            let expanded: Vec<Vec<ConstraintPathElement>> = simple_path_slots(&graph, start)
                .iter()
                .map(|path| expand_path(&graph, path))
                .collect();
            debug!(vertex = %graph.key_at(start), paths = expanded.len(), "Indexed constraint paths");
            paths.insert(graph.key_at(start).clone(), expanded);
        }

        let index = Self { graph, paths };
        info!(
            vertices = index.graph.vertex_count(),
            edges = index.graph.edge_count(),
            paths = index.path_count(),
            "Built constraint index"
        );
        Ok(index)
    }

    /// Direct constraints of the document vertices selected by `ref_doc_type`.
    ///
    /// Without a pattern only the unqualified vertex of the container is
    /// considered. With one, every qualified vertex whose own pattern is a partial
    /// match of the query is. Results are deduplicated by endpoint pair and
    /// optionally filtered on the edge's cascade flag.
    pub fn get_direct_constraints(
        &self,
        container_id: &str,
        ref_doc_type: Option<&RefDocType>,
        cascade_delete: Option<bool>,
    ) -> Vec<&ConstraintPathElement> {
        let query = ref_doc_type.filter(|pattern| !pattern.is_empty());
        let mut seen: HashSet<(&VertexKey, &VertexKey)> = HashSet::new();
        let mut constraints = Vec::new();

        for (key, vertex) in self.graph.vertices() {
            let Some(doc) = vertex.as_document() else {
                continue;
            };
            if doc.container_id != container_id {
                continue;
            }
            let selected = match (query, &doc.ref_doc_type) {
                (None, None) => true,
                (Some(query), Some(pattern)) => is_partial_match(query, pattern),
                _ => false,
            };
            if !selected {
                continue;
            }

            for path in self.paths_from(key) {
                let Some(first) = path.first() else {
                    continue;
                };
                if cascade_delete.is_some_and(|cascade| first.constraint.cascade_delete() != cascade) {
                    continue;
                }
                if seen.insert((&first.from_key, &first.to_key)) {
                    constraints.push(first);
                }
            }
        }
        constraints
    }

    pub fn get_direct_cascade_delete_constraints(
        &self,
        container_id: &str,
        ref_doc_type: Option<&RefDocType>,
    ) -> Vec<&ConstraintPathElement> {
        self.get_direct_constraints(container_id, ref_doc_type, Some(true))
    }

    pub fn get_direct_no_cascade_delete_constraints(
        &self,
        container_id: &str,
        ref_doc_type: Option<&RefDocType>,
    ) -> Vec<&ConstraintPathElement> {
        self.get_direct_constraints(container_id, ref_doc_type, Some(false))
    }

    /// Every stored downstream path of a vertex
    pub fn paths_from(&self, key: &VertexKey) -> &[Vec<ConstraintPathElement>] {
        self.paths.get(key).map(Vec::as_slice).unwrap_or_default()
    }

    pub fn vertex_keys(&self) -> impl Iterator<Item = &VertexKey> {
        self.graph.vertex_keys()
    }

    pub fn vertex_count(&self) -> usize {
        self.graph.vertex_count()
    }

    pub fn edge_count(&self) -> usize {
        self.graph.edge_count()
    }

    pub fn path_count(&self) -> usize {
        self.paths.values().map(Vec::len).sum()
    }

    pub fn graph(&self) -> &ConstraintGraph {
        &self.graph
    }

    pub fn to_dot(&self) -> String {
        self.graph.to_dot()
    }

    /// Stable digest of the indexed vertices and edges
    pub fn fingerprint(&self) -> Result<Checksum> {
        let mut vertices = self
            .graph
            .vertices()
            .map(|(key, vertex)| -> Result<(String, Value)> {
                Ok((key.to_string(), serde_json::to_value(vertex)?))
            })
            .collect::<Result<Vec<_>>>()?;
        vertices.sort_by(|a, b| a.0.cmp(&b.0));

        let mut edges = self
            .graph
            .edges()
            .map(|(from, to, edge)| -> Result<(String, String, Value)> {
                Ok((from.to_string(), to.to_string(), serde_json::to_value(edge)?))
            })
            .collect::<Result<Vec<_>>>()?;
        edges.sort_by(|a, b| (&a.0, &a.1).cmp(&(&b.0, &b.1)));

        let document = json!({
            "vertices": vertices
                .into_iter()
                .map(|(key, vertex)| json!({ "key": key, "vertex": vertex }))
                .collect::<Vec<_>>(),
            "edges": edges
                .into_iter()
                .map(|(from, to, edge)| json!({ "from": from, "to": to, "edge": edge }))
                .collect::<Vec<_>>(),
        });
        Ok(Checksum::from_json(&document))
    }
}

fn expand_path(graph: &ConstraintGraph, path: &[usize]) -> Vec<ConstraintPathElement> {
    path.windows(2)
        .filter_map(|pair| {
            let constraint = graph.edge_between(pair[0], pair[1])?.clone();
            Some(ConstraintPathElement {
                from_key: graph.key_at(pair[0]).clone(),
                from: graph.vertex_at(pair[0]).clone(),
                to_key: graph.key_at(pair[1]).clone(),
                to: graph.vertex_at(pair[1]).clone(),
                constraint,
            })
        })
        .collect()
}
