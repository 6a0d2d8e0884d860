//! Graph algorithms over [`ConstraintGraph`]
//!
//! Both traversals keep an explicit stack instead of recursing, so long reference
//! chains cannot exhaust the call stack.

use super::ConstraintGraph;
use crate::reference::VertexKey;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Mark {
    Unvisited,
    OnStack,
    Done,
}

/// True if any directed cycle exists, self-loops included
pub fn has_cycle(graph: &ConstraintGraph) -> bool {
    let count = graph.vertex_count();
    let mut marks = vec![Mark::Unvisited; count];

    for root in 0..count {
        if marks[root] != Mark::Unvisited {
            continue;
        }
        // (vertex, next successor position)
        let mut stack = vec![(root, 0usize)];
        marks[root] = Mark::OnStack;

        while let Some(&(vertex, cursor)) = stack.last() {
            let successors = graph.successors(vertex);
            if cursor == successors.len() {
                marks[vertex] = Mark::Done;
                stack.pop();
                continue;
            }
            if let Some(top) = stack.last_mut() {
                top.1 += 1;
            }
            let next = successors[cursor];
            match marks[next] {
                Mark::OnStack => return true,
                Mark::Unvisited => {
                    marks[next] = Mark::OnStack;
                    stack.push((next, 0));
                }
                Mark::Done => {}
            }
        }
    }
    false
}

/// Every simple path of length >= 1 starting at `start`, as vertex slots.
///
/// Paths come out in depth-first pre-order following edge insertion order: a path
/// is emitted before any of its extensions.
pub(crate) fn simple_path_slots(graph: &ConstraintGraph, start: usize) -> Vec<Vec<usize>> {
    let mut paths = Vec::new();
    let mut on_path = vec![false; graph.vertex_count()];
    let mut path = vec![start];
    let mut cursors = vec![0usize];
    on_path[start] = true;

    while let Some(&cursor) = cursors.last() {
        let depth = cursors.len() - 1;
        let successors = graph.successors(path[depth]);
        if cursor == successors.len() {
            cursors.pop();
            if let Some(vertex) = path.pop() {
                on_path[vertex] = false;
            }
            continue;
        }
        cursors[depth] += 1;

        let next = successors[cursor];
        if on_path[next] {
            continue;
        }
        on_path[next] = true;
        path.push(next);
        paths.push(path.clone());
        cursors.push(0);
    }
    paths
}

/// Every simple path starting at `start`, as vertex keys. Unknown keys have none.
pub fn all_simple_paths<'a>(graph: &'a ConstraintGraph, start: &VertexKey) -> Vec<Vec<&'a VertexKey>> {
    let Some(start) = graph.index_of(start) else {
        return Vec::new();
    };
    simple_path_slots(graph, start)
        .into_iter()
        .map(|path| path.into_iter().map(|slot| graph.key_at(slot)).collect())
        .collect()
}
