//! Constraint Graph Analysis
//!
//! Structural validation run before an index is built: the graph must be acyclic,
//! and everything downstream of a cascading edge must cascade as well.

use std::collections::HashMap;

use tracing::warn;

use super::algo::{has_cycle, simple_path_slots};
use super::ConstraintGraph;
use crate::error::{ConstraintError, Result};

/// Validate the graph, cycles first
pub fn validate_graph(graph: &ConstraintGraph) -> Result<()> {
    if has_cycle(graph) {
        warn!(
            vertices = graph.vertex_count(),
            edges = graph.edge_count(),
            "Constraint graph rejected: cycle detected"
        );
        return Err(ConstraintError::CycleDetected);
    }

    let paths = cascade_violations(graph);
    if !paths.is_empty() {
        warn!(violations = paths.len(), "Constraint graph rejected: inconsistent cascade delete");
        return Err(ConstraintError::CascadeDeleteInconsistency { paths });
    }
    Ok(())
}

/// Rendered paths leading from a cascading edge to a non-cascading one.
///
/// A path qualifies when its first edge cascades, its last edge does not, and
/// every edge in between cascades. Each offending edge is reported once, through
/// the shortest such path; reports are ordered by first discovery.
pub fn cascade_violations(graph: &ConstraintGraph) -> Vec<String> {
    // offending edge -> shortest path ending in it
    let mut shortest: HashMap<(usize, usize), Vec<usize>> = HashMap::new();
    let mut order: Vec<(usize, usize)> = Vec::new();

    for &(from, to) in graph.edge_slots() {
        if !cascade_at(graph, (from, to)) {
            continue;
        }

        for downstream in simple_path_slots(graph, to) {
            if downstream.contains(&from) {
                continue;
            }
            let mut path = Vec::with_capacity(downstream.len() + 1);
            path.push(from);
            path.extend(downstream);

            let end = path.len() - 1;
            let offending = (path[end - 1], path[end]);
            if cascade_at(graph, offending) {
                continue;
            }
            if !path[..end].windows(2).all(|w| cascade_at(graph, (w[0], w[1]))) {
                continue;
            }

            match shortest.get(&offending) {
                Some(existing) if existing.len() <= path.len() => {}
                Some(_) => {
                    shortest.insert(offending, path);
                }
                None => {
                    order.push(offending);
                    shortest.insert(offending, path);
                }
            }
        }
    }

    order
        .iter()
        .filter_map(|offending| shortest.get(offending))
        .map(|path| render_path(graph, path))
        .collect()
}

fn cascade_at(graph: &ConstraintGraph, (from, to): (usize, usize)) -> bool {
    graph
        .edge_between(from, to)
        .map_or(false, |edge| edge.cascade_delete())
}

/// `a: delete=true -> b: delete=false -> c`
fn render_path(graph: &ConstraintGraph, path: &[usize]) -> String {
    let mut rendered = String::new();
    for pair in path.windows(2) {
        rendered.push_str(&format!(
            "{}: delete={} -> ",
            graph.key_at(pair[0]),
            cascade_at(graph, (pair[0], pair[1]))
        ));
    }
    if let Some(&last) = path.last() {
        rendered.push_str(graph.key_at(last).as_str());
    }
    rendered
}
