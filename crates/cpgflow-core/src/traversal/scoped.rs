//! Walker that keeps a scope manager in sync with the visited node

use super::walker::{strategy, IterativeGraphWalker};
use crate::graph::{AstTree, NodeId, NodeLookup, ScopeId};

/// Tracks the current lexical scope for symbol lookups
pub trait ScopeManager {
    fn current_scope(&self) -> Option<ScopeId>;

    fn jump_to(&mut self, scope: Option<ScopeId>);
}

/// Wraps [`IterativeGraphWalker`] and, before each handler call, moves the
/// scope manager into the scope of the visited node if it is elsewhere.
///
/// Handlers receive the scope manager, the visited node and the node it was
/// reached from. What "reached from" means depends on the strategy: the AST
/// parent when walking the AST, the previous EOG node when walking the EOG.
pub struct ScopedWalker<'w, G: ?Sized, S> {
    graph: &'w G,
    scope_manager: &'w mut S,
    strategy: Box<dyn Fn(&G, NodeId) -> Vec<NodeId> + 'w>,
    handlers: Vec<Box<dyn FnMut(&S, NodeId, Option<NodeId>) + 'w>>,
}

impl<'w, G, S> ScopedWalker<'w, G, S>
where
    G: AstTree + NodeLookup + ?Sized,
    S: ScopeManager,
{
    /// Walks the AST
    pub fn new(graph: &'w G, scope_manager: &'w mut S) -> Self {
        Self::with_strategy(graph, scope_manager, |graph: &G, node: NodeId| {
            strategy::ast_forward(graph, node)
        })
    }
}

impl<'w, G, S> ScopedWalker<'w, G, S>
where
    G: NodeLookup + ?Sized,
    S: ScopeManager,
{
    /// A scoped walker that follows `strategy`
    pub fn with_strategy(
        graph: &'w G,
        scope_manager: &'w mut S,
        strategy: impl Fn(&G, NodeId) -> Vec<NodeId> + 'w,
    ) -> Self {
        Self {
            graph,
            scope_manager,
            strategy: Box::new(strategy),
            handlers: Vec::new(),
        }
    }

    /// Adds a handler called with the scope manager, the node and its parent
    pub fn register_handler(&mut self, handler: impl FnMut(&S, NodeId, Option<NodeId>) + 'w) {
        self.handlers.push(Box::new(handler));
    }

    /// Drops every registered handler
    pub fn clear_handlers(&mut self) {
        self.handlers.clear();
    }

    /// Walks everything reachable from `root`, keeping scopes in sync
    pub fn iterate(&mut self, root: NodeId) {
        self.iterate_all(&[root]);
    }

    /// Walks from several entries with a shared seen-set
    pub fn iterate_all(&mut self, entries: &[NodeId]) {
        let graph = self.graph;
        let strategy = &self.strategy;
        let scope_manager = &mut *self.scope_manager;
        let handlers = &mut self.handlers;

        let mut walker =
            IterativeGraphWalker::with_strategy(graph, |g: &G, node: NodeId| strategy(g, node));
        walker.register_on_node_visit(move |_, node, previous| {
            let scope = graph.node(node).and_then(|n| n.scope);
            if scope_manager.current_scope() != scope {
                scope_manager.jump_to(scope);
            }
            for handler in handlers.iter_mut() {
                handler(&*scope_manager, node, previous);
            }
        });
        walker.iterate_all(entries);
    }
}
