//! Constraint Graph
//!
//! Owned, arena-backed directed graph of constraint vertices. Vertices live in a
//! `Vec` and are looked up through a key index; edges are keyed by the ordered pair
//! of their endpoints. An edge runs from the referenced vertex to the referencing
//! one, so walking downstream from a document visits everything that depends on it.
//!
//! Vertex, adjacency and edge iteration all follow insertion order, which keeps
//! path enumeration and exports deterministic.

pub mod algo;
pub mod analysis;

pub use algo::{all_simple_paths, has_cycle};
pub use analysis::{cascade_violations, validate_graph};

use std::collections::{HashMap, HashSet};

use tracing::debug;

use crate::error::{ConstraintError, Result};
use crate::reference::{ConstraintEdge, ConstraintVertex, VertexKey};

/// The constraint graph
#[derive(Debug, Clone, Default)]
pub struct ConstraintGraph {
    /// Vertex arena, in insertion order
    vertices: Vec<(VertexKey, ConstraintVertex)>,

    /// Index: key -> arena slot
    indices: HashMap<VertexKey, usize>,

    /// Outgoing neighbours per arena slot, in edge insertion order
    adjacency: Vec<Vec<usize>>,

    /// Edge payloads keyed by (from, to) slots
    edges: HashMap<(usize, usize), ConstraintEdge>,

    /// Edge keys in insertion order
    edge_order: Vec<(usize, usize)>,
}

impl ConstraintGraph {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert vertices, skipping keys already present.
    ///
    /// The batch is checked before anything is inserted: two entries of the same
    /// call sharing a key fail with [`ConstraintError::DuplicateVertex`].
    pub fn add_vertices<I>(&mut self, vertices: I) -> Result<()>
    where
        I: IntoIterator<Item = ConstraintVertex>,
    {
        let batch: Vec<(VertexKey, ConstraintVertex)> = vertices
            .into_iter()
            .map(|vertex| (vertex.key(), vertex))
            .collect();

        let mut seen = HashSet::new();
        for (key, _) in &batch {
            if !seen.insert(key) {
                return Err(ConstraintError::DuplicateVertex {
                    key: key.to_string(),
                });
            }
        }

        for (key, vertex) in batch {
            if self.indices.contains_key(&key) {
                continue;
            }
            debug!(vertex = %key, "Adding constraint vertex");
            self.indices.insert(key.clone(), self.vertices.len());
            self.vertices.push((key, vertex));
            self.adjacency.push(Vec::new());
        }
        Ok(())
    }

    /// Insert an edge between two existing vertices
    pub fn add_edge(&mut self, from: &VertexKey, to: &VertexKey, edge: ConstraintEdge) -> Result<()> {
        let from_idx = self.require_index(from)?;
        let to_idx = self.require_index(to)?;
        if self.edges.contains_key(&(from_idx, to_idx)) {
            return Err(ConstraintError::DuplicateEdge {
                from: from.to_string(),
                to: to.to_string(),
            });
        }

        debug!(from = %from, to = %to, cascade_delete = edge.cascade_delete(), "Adding constraint edge");
        self.edges.insert((from_idx, to_idx), edge);
        self.edge_order.push((from_idx, to_idx));
        self.adjacency[from_idx].push(to_idx);
        Ok(())
    }

    pub fn has_vertex(&self, key: &VertexKey) -> bool {
        self.indices.contains_key(key)
    }

    pub fn get_vertex(&self, key: &VertexKey) -> Option<&ConstraintVertex> {
        self.indices.get(key).map(|&idx| &self.vertices[idx].1)
    }

    pub fn get_edge(&self, from: &VertexKey, to: &VertexKey) -> Option<&ConstraintEdge> {
        let from_idx = *self.indices.get(from)?;
        let to_idx = *self.indices.get(to)?;
        self.edges.get(&(from_idx, to_idx))
    }

    pub fn has_edge(&self, from: &VertexKey, to: &VertexKey) -> bool {
        self.get_edge(from, to).is_some()
    }

    pub fn vertex_keys(&self) -> impl Iterator<Item = &VertexKey> {
        self.vertices.iter().map(|(key, _)| key)
    }

    pub fn vertices(&self) -> impl Iterator<Item = (&VertexKey, &ConstraintVertex)> {
        self.vertices.iter().map(|(key, vertex)| (key, vertex))
    }

    pub fn edge_keys(&self) -> impl Iterator<Item = (&VertexKey, &VertexKey)> {
        self.edge_order
            .iter()
            .map(|&(from, to)| (&self.vertices[from].0, &self.vertices[to].0))
    }

    /// Every edge with its endpoints, in insertion order
    pub fn edges(&self) -> impl Iterator<Item = (&VertexKey, &VertexKey, &ConstraintEdge)> {
        self.edge_order.iter().filter_map(|slots| {
            let edge = self.edges.get(slots)?;
            Some((&self.vertices[slots.0].0, &self.vertices[slots.1].0, edge))
        })
    }

    pub fn vertex_count(&self) -> usize {
        self.vertices.len()
    }

    pub fn edge_count(&self) -> usize {
        self.edge_order.len()
    }

    // ========== Slot access for the graph algorithms ==========

    pub(crate) fn index_of(&self, key: &VertexKey) -> Option<usize> {
        self.indices.get(key).copied()
    }

    pub(crate) fn key_at(&self, idx: usize) -> &VertexKey {
        &self.vertices[idx].0
    }

    pub(crate) fn vertex_at(&self, idx: usize) -> &ConstraintVertex {
        &self.vertices[idx].1
    }

    pub(crate) fn successors(&self, idx: usize) -> &[usize] {
        &self.adjacency[idx]
    }

    pub(crate) fn edge_between(&self, from: usize, to: usize) -> Option<&ConstraintEdge> {
        self.edges.get(&(from, to))
    }

    pub(crate) fn edge_slots(&self) -> &[(usize, usize)] {
        &self.edge_order
    }

    fn require_index(&self, key: &VertexKey) -> Result<usize> {
        self.index_of(key).ok_or_else(|| ConstraintError::UnknownVertex {
            key: key.to_string(),
        })
    }

    /// Render the graph in GraphViz DOT format.
    ///
    /// Vertices are coloured by kind; cascading edges are drawn solid and red,
    /// the others dashed. Edge labels carry the property mapping.
    pub fn to_dot(&self) -> String {
        let mut output = String::new();

        output.push_str("digraph ConstraintGraph {\n");
        output.push_str("  rankdir=LR;\n");
        output.push_str("  bgcolor=\"#1e1e1e\";\n");
        output.push_str("  node [shape=box, style=\"filled,rounded\", fontname=\"Helvetica\", fontsize=10, fontcolor=\"white\", color=\"#404040\"];\n");
        output.push_str("  edge [fontname=\"Helvetica\", fontsize=8, fontcolor=\"#808080\"];\n");
        output.push('\n');

        for (key, vertex) in &self.vertices {
            let color = match vertex {
                ConstraintVertex::Document(_) => "#00BCD4",
                ConstraintVertex::Partition(_) => "#FF9800",
                ConstraintVertex::Compound(_) => "#9C27B0",
            };
            output.push_str(&format!(
                "  \"{}\" [label=\"{}\", fillcolor=\"{}\"];\n",
                escape_dot(key.as_str()),
                escape_dot(key.as_str()),
                color
            ));
        }

        output.push('\n');

        for (from, to, edge) in self.edges() {
            let style = if edge.cascade_delete() {
                "color=\"#F44336\""
            } else {
                "color=\"#9E9E9E\", style=dashed"
            };
            output.push_str(&format!(
                "  \"{}\" -> \"{}\" [label=\"{}\", {}];\n",
                escape_dot(from.as_str()),
                escape_dot(to.as_str()),
                escape_dot(&edge.label()),
                style
            ));
        }

        output.push_str("}\n");
        output
    }
}

fn escape_dot(s: &str) -> String {
    s.replace('\\', "\\\\").replace('"', "\\\"")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::reference::{CompoundConstraint, DocumentReference, PartitionReference, RefConstraint};
    use serde_json::json;

    fn doc(container: &str) -> ConstraintVertex {
        DocumentReference::new(container).into()
    }

    fn ref_edge(cascade: bool) -> ConstraintEdge {
        let constraint = RefConstraint::new([("refId", "id")]);
        ConstraintEdge::DocToDoc(if cascade { constraint.cascading() } else { constraint })
    }

    #[test]
    fn test_add_vertices_is_idempotent_per_key() {
        let mut graph = ConstraintGraph::new();
        graph.add_vertices([doc("a"), doc("b")]).unwrap();
        graph.add_vertices([doc("b"), doc("c")]).unwrap();

        assert_eq!(graph.vertex_count(), 3);
        let keys: Vec<_> = graph.vertex_keys().map(VertexKey::as_str).collect();
        assert_eq!(keys, vec!["a/{}", "b/{}", "c/{}"]);
    }

    #[test]
    fn test_same_key_twice_in_one_call_is_rejected() {
        let mut graph = ConstraintGraph::new();
        let a = DocumentReference::new("a").with_doc_type(json!({ "type": "A" }));
        let err = graph
            .add_vertices([a.clone().into(), ConstraintVertex::Document(a)])
            .unwrap_err();
        assert!(matches!(err, ConstraintError::DuplicateVertex { ref key } if key == r#"a/{"type":"A"}"#));
        assert_eq!(graph.vertex_count(), 0);
    }

    #[test]
    fn test_edges_are_unique_per_pair() {
        let mut graph = ConstraintGraph::new();
        graph.add_vertices([doc("a"), doc("b")]).unwrap();
        let (a, b) = (VertexKey::from("a/{}"), VertexKey::from("b/{}"));

        graph.add_edge(&a, &b, ref_edge(true)).unwrap();
        let err = graph.add_edge(&a, &b, ref_edge(false)).unwrap_err();
        assert!(matches!(err, ConstraintError::DuplicateEdge { .. }));

        // the reverse pair is a different edge
        graph.add_edge(&b, &a, ref_edge(false)).unwrap();
        assert_eq!(graph.edge_count(), 2);
        assert!(graph.get_edge(&a, &b).unwrap().cascade_delete());
        assert!(!graph.get_edge(&b, &a).unwrap().cascade_delete());
    }

    #[test]
    fn test_edge_to_unknown_vertex() {
        let mut graph = ConstraintGraph::new();
        graph.add_vertices([doc("a")]).unwrap();
        let err = graph
            .add_edge(&VertexKey::from("a/{}"), &VertexKey::from("missing/{}"), ref_edge(true))
            .unwrap_err();
        assert_eq!(err.to_string(), "Unknown vertex: missing/{}");
        assert_eq!(graph.edge_count(), 0);
    }

    #[test]
    fn test_to_dot_styles_edges_by_cascade() {
        let mut graph = ConstraintGraph::new();
        let c2 = DocumentReference::new("c2");
        let partition = PartitionReference::new("c3", ["tenant.id"]);
        graph
            .add_vertices([doc("c1"), c2.clone().into(), ConstraintVertex::Partition(partition), ConstraintVertex::Compound(c2)])
            .unwrap();

        let c1 = VertexKey::from("c1/{}");
        let c2 = VertexKey::from("c2/{}");
        graph.add_edge(&c1, &c2, ref_edge(true)).unwrap();
        graph
            .add_edge(&c1, &VertexKey::from(r#"c3/["tenant.id"]"#), ConstraintEdge::PartitionToDoc(RefConstraint::new([("tenant.id", "id")])))
            .unwrap();
        graph
            .add_edge(&c2, &VertexKey::from("c2/{}/compound"), ConstraintEdge::DocToCompound(CompoundConstraint::new(["code"])))
            .unwrap();

        let dot = graph.to_dot();
        assert!(dot.starts_with("digraph ConstraintGraph {"));
        assert!(dot.contains(r##""c1/{}" -> "c2/{}" [label="refId -> id", color="#F44336"];"##));
        assert!(dot.contains(r##""c3/[\"tenant.id\"]" [label="c3/[\"tenant.id\"]", fillcolor="#FF9800"];"##));
        assert!(dot.contains(r##"[label="unique(code)", color="#9E9E9E", style=dashed];"##));
    }
}
