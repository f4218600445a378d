//! Reaching assignments
//!
//! For every EOG node, which assignments to each variable may still be in
//! effect there. An assignment kills the earlier definitions of its target
//! along the same path, joins merge the sets of both paths.

use cpgflow_core::dataflow::{EogWorklist, FixpointResult, PowersetLattice, State};
use cpgflow_core::graph::{AstTree, EvaluationOrder, NodeId, NodeKind, NodeLookup};
use tracing::trace;

/// Variable name to the assignments that may reach a program point
pub type ReachingState = State<String, PowersetLattice<NodeId>>;

/// Name of the variable `node` writes to, if any.
///
/// Assignments write to their left-hand reference, declarations to the
/// declared name, `++` and `--` to their operand.
pub fn assigned_variable<G>(graph: &G, node: NodeId) -> Option<&str>
where
    G: AstTree + NodeLookup + ?Sized,
{
    let n = graph.node(node)?;
    match &n.kind {
        NodeKind::VariableDeclaration => Some(n.name.as_str()),
        NodeKind::Assignment { .. } => match graph.ast_children(node).first() {
            Some(&lhs) => reference_name(graph, lhs),
            None => Some(n.name.as_str()),
        },
        NodeKind::UnaryOperator { operator } if operator == "++" || operator == "--" => graph
            .ast_children(node)
            .first()
            .and_then(|&operand| reference_name(graph, operand)),
        _ => None,
    }
}

fn reference_name<G: NodeLookup + ?Sized>(graph: &G, node: NodeId) -> Option<&str> {
    graph
        .node(node)
        .filter(|n| matches!(n.kind, NodeKind::Reference))
        .map(|n| n.name.as_str())
}

/// Transfer function: a write replaces the definitions of its variable
pub fn transfer<G>(graph: &G, node: NodeId, mut state: ReachingState) -> ReachingState
where
    G: AstTree + NodeLookup + ?Sized,
{
    if let Some(variable) = assigned_variable(graph, node) {
        trace!(%node, variable, "definition");
        state.insert(variable.to_string(), PowersetLattice::singleton(node));
    }
    state
}

/// Computes the reaching assignments of everything reachable from `start`.
///
/// `None` if the engine gave up because of its timeout.
pub fn reaching_assignments<G>(
    engine: &mut EogWorklist<'_, G>,
    graph: &G,
    start: NodeId,
) -> Option<FixpointResult<NodeId, String, PowersetLattice<NodeId>>>
where
    G: AstTree + NodeLookup + EvaluationOrder + ?Sized,
{
    engine.iterate_from_node(start, ReachingState::new(), |node, state, _| {
        transfer(graph, node, state)
    })
}
