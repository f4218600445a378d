//! Iterative depth-first graph walker

use crate::collections::IdentitySet;
use crate::graph::{AstTree, EvaluationOrder, NodeId, NodeLookup};
use fnv::FnvHashMap;
use tracing::error;

/// Walking strategies: which neighbours of a node are visited next
pub mod strategy {
    use super::*;

    /// AST children in order
    pub fn ast_forward<G: AstTree + ?Sized>(graph: &G, node: NodeId) -> Vec<NodeId> {
        graph.ast_children(node).to_vec()
    }

    /// EOG successors
    pub fn eog_forward<G: EvaluationOrder + ?Sized>(graph: &G, node: NodeId) -> Vec<NodeId> {
        graph.next_eog(node).to_vec()
    }

    /// EOG predecessors
    pub fn eog_backward<G: EvaluationOrder + ?Sized>(graph: &G, node: NodeId) -> Vec<NodeId> {
        graph.prev_eog(node).to_vec()
    }
}

/// Handle passed to visit callbacks
pub struct Visit<'v, G: ?Sized> {
    graph: &'v G,
    replacements: &'v mut FnvHashMap<NodeId, NodeId>,
}

impl<G: ?Sized> Visit<'_, G> {
    /// The graph being walked
    pub fn graph(&self) -> &G {
        self.graph
    }

    /// See [`IterativeGraphWalker::register_replacement`]
    pub fn register_replacement(&mut self, from: NodeId, to: NodeId) {
        self.replacements.insert(from, to);
    }
}

/// Depth-first walker with an explicit stack.
///
/// Every registered callback is called exactly once per node, on its first
/// visit, with the node and the node it was reached from. Neighbours come
/// from the strategy (AST children by default) and are pushed in reverse so
/// that they are visited in strategy order.
pub struct IterativeGraphWalker<'w, G: ?Sized> {
    graph: &'w G,
    strategy: Box<dyn Fn(&G, NodeId) -> Vec<NodeId> + 'w>,
    #[allow(clippy::type_complexity)]
    callbacks: Vec<Box<dyn FnMut(&mut Visit<'_, G>, NodeId, Option<NodeId>) + 'w>>,
    replacements: FnvHashMap<NodeId, NodeId>,
}

impl<'w, G: AstTree + NodeLookup + ?Sized> IterativeGraphWalker<'w, G> {
    /// A walker that descends into AST children
    pub fn new(graph: &'w G) -> Self {
        Self {
            graph,
            strategy: Box::new(|graph: &G, node: NodeId| strategy::ast_forward(graph, node)),
            callbacks: Vec::new(),
            replacements: FnvHashMap::default(),
        }
    }
}

impl<'w, G: NodeLookup + ?Sized> IterativeGraphWalker<'w, G> {
    /// A walker that follows `strategy` instead of AST children
    pub fn with_strategy(graph: &'w G, strategy: impl Fn(&G, NodeId) -> Vec<NodeId> + 'w) -> Self {
        Self {
            graph,
            strategy: Box::new(strategy),
            callbacks: Vec::new(),
            replacements: FnvHashMap::default(),
        }
    }

    /// Adds a callback run for every visited node
    pub fn register_on_node_visit(
        &mut self,
        callback: impl FnMut(&mut Visit<'_, G>, NodeId, Option<NodeId>) + 'w,
    ) {
        self.callbacks.push(Box::new(callback));
    }

    /// When the walker next processes `from`, it continues with the
    /// neighbours of `to` instead. Used by passes that rewrite the node
    /// currently being visited.
    pub fn register_replacement(&mut self, from: NodeId, to: NodeId) {
        self.replacements.insert(from, to);
    }

    /// Walks everything reachable from `root`
    pub fn iterate(&mut self, root: NodeId) {
        self.iterate_all(&[root]);
    }

    /// Walks from every entry in turn. The seen-set is shared, so a node
    /// reachable from several entries is visited only once.
    pub fn iterate_all(&mut self, entries: &[NodeId]) {
        let graph = self.graph;
        let mut seen = IdentitySet::new();
        let mut todo: Vec<(NodeId, Option<NodeId>)> = Vec::new();

        for &entry in entries {
            if !seen.add(entry) {
                continue;
            }
            todo.push((entry, None));

            while let Some((mut current, parent)) = todo.pop() {
                let mut visit = Visit {
                    graph,
                    replacements: &mut self.replacements,
                };
                for callback in &mut self.callbacks {
                    callback(&mut visit, current, parent);
                }

                if let Some(replacement) = self.replacements.remove(&current) {
                    current = replacement;
                }

                let mut unseen = Vec::new();
                for next in (self.strategy)(graph, current) {
                    if graph.node(next).is_none() {
                        error!(from = %current, node = %next, "skipping edge to unknown node");
                        continue;
                    }
                    if seen.add(next) {
                        unseen.push(next);
                    }
                }
                todo.extend(unseen.into_iter().rev().map(|next| (next, Some(current))));
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::{Graph, NodeKind};
    use std::cell::RefCell;

    fn tree() -> (Graph, [NodeId; 5]) {
        let mut graph = Graph::new();
        let root = graph.add_node(NodeKind::Block, "root");
        let a = graph.add_node(NodeKind::Block, "a");
        let a1 = graph.add_node(NodeKind::Reference, "a1");
        let b = graph.add_node(NodeKind::Block, "b");
        let b1 = graph.add_node(NodeKind::Reference, "b1");
        graph.add_ast_child(root, a).unwrap();
        graph.add_ast_child(a, a1).unwrap();
        graph.add_ast_child(root, b).unwrap();
        graph.add_ast_child(b, b1).unwrap();
        (graph, [root, a, a1, b, b1])
    }

    #[test]
    fn test_visits_each_node_once_with_parent() {
        let (mut graph, [root, a, a1, b, b1]) = tree();
        graph.add_ast_reference(b1, root).unwrap();

        let visits = RefCell::new(Vec::new());
        let mut walker = IterativeGraphWalker::new(&graph);
        walker.register_on_node_visit(|_, node, parent| visits.borrow_mut().push((node, parent)));
        walker.iterate(root);
        drop(walker);

        assert_eq!(
            visits.into_inner(),
            vec![
                (root, None),
                (a, Some(root)),
                (a1, Some(a)),
                (b, Some(root)),
                (b1, Some(b)),
            ]
        );
    }

    #[test]
    fn test_replacement_redirects_descent() {
        let (mut graph, [root, a, _, b, b1]) = tree();
        let substitute = graph.add_node(NodeKind::Block, "substitute");
        let extra = graph.add_node(NodeKind::Reference, "extra");
        graph.add_ast_child(substitute, extra).unwrap();

        let visited = RefCell::new(Vec::new());
        let mut walker = IterativeGraphWalker::new(&graph);
        walker.register_on_node_visit(|visit, node, _| {
            visited.borrow_mut().push(node);
            if node == a {
                visit.register_replacement(a, substitute);
            }
        });
        walker.iterate(root);
        drop(walker);

        assert_eq!(visited.into_inner(), vec![root, a, extra, b, b1]);
    }

    #[test]
    fn test_iterate_all_shares_seen_set() {
        let mut graph = Graph::new();
        let e1 = graph.add_node(NodeKind::Other, "e1");
        let e2 = graph.add_node(NodeKind::Other, "e2");
        let shared = graph.add_node(NodeKind::Other, "shared");
        graph.add_eog_edge(e1, shared).unwrap();
        graph.add_eog_edge(e2, shared).unwrap();

        let count = RefCell::new(0);
        let mut walker = IterativeGraphWalker::with_strategy(&graph, |g: &Graph, n| {
            strategy::eog_forward(g, n)
        });
        walker.register_on_node_visit(|_, _, _| *count.borrow_mut() += 1);
        walker.iterate_all(&[e1, e2, e1]);
        drop(walker);

        assert_eq!(count.into_inner(), 3);
    }

    #[test]
    fn test_eog_backward_on_cycle() {
        let mut graph = Graph::new();
        let a = graph.add_node(NodeKind::Other, "a");
        let b = graph.add_node(NodeKind::Other, "b");
        let c = graph.add_node(NodeKind::Other, "c");
        graph.connect_eog(&[a, b, c, a]).unwrap();

        let visited = RefCell::new(Vec::new());
        let mut walker = IterativeGraphWalker::with_strategy(&graph, |g: &Graph, n| {
            strategy::eog_backward(g, n)
        });
        walker.register_on_node_visit(|_, node, _| visited.borrow_mut().push(node));
        walker.iterate(c);
        drop(walker);

        assert_eq!(visited.into_inner(), vec![c, b, a]);
    }
}
