//! AST flattening and EOG border detection

use crate::collections::IdentitySet;
use crate::graph::{AstTree, EvaluationOrder, NodeId};
use fnv::FnvHashSet;

/// Flattens the AST below `root` into a list, `root` first.
///
/// Nodes come out in depth-first pre-order. A node that was already placed
/// is neither repeated nor descended into again, which makes degenerate
/// back-references harmless.
pub fn flatten_ast<G: AstTree + ?Sized>(graph: &G, root: NodeId) -> Vec<NodeId> {
    flatten_ast_until(graph, root, |_| false)
}

/// Like [`flatten_ast`], but a node for which `stop_at` returns true is
/// left out together with its subtree.
pub fn flatten_ast_until<G, F>(graph: &G, root: NodeId, mut stop_at: F) -> Vec<NodeId>
where
    G: AstTree + ?Sized,
    F: FnMut(NodeId) -> bool,
{
    let mut placed = IdentitySet::new();
    let mut stack = vec![root];

    while let Some(node) = stack.pop() {
        if stop_at(node) || !placed.add(node) {
            continue;
        }
        stack.extend(graph.ast_children(node).iter().rev().copied());
    }

    placed.to_sorted_list()
}

/// Entry and exit nodes of the control flow inside a subtree
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Border {
    pub entries: Vec<NodeId>,
    pub exits: Vec<NodeId>,
}

/// Finds where control flow enters and leaves the AST subtree at `root`.
///
/// Only nodes that take part in the EOG are considered. An entry has a
/// predecessor outside the subtree, or no predecessor at all. An exit has
/// a successor outside the subtree. Both lists keep flattening order.
pub fn eog_path_edges<G>(graph: &G, root: NodeId) -> Border
where
    G: AstTree + EvaluationOrder + ?Sized,
{
    let eog_nodes: Vec<NodeId> = flatten_ast(graph, root)
        .into_iter()
        .filter(|&node| graph.has_eog(node))
        .collect();
    let inside: FnvHashSet<NodeId> = eog_nodes.iter().copied().collect();

    let entries = eog_nodes
        .iter()
        .copied()
        .filter(|&node| {
            let prev = graph.prev_eog(node);
            prev.is_empty() || prev.iter().any(|p| !inside.contains(p))
        })
        .collect();
    let exits = eog_nodes
        .iter()
        .copied()
        .filter(|&node| graph.next_eog(node).iter().any(|n| !inside.contains(n)))
        .collect();

    Border { entries, exits }
}
