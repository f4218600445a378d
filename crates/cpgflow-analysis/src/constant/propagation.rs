//! Intraprocedural constant propagation
//!
//! Tracks one [`FlatLattice`] value per variable. Declarations and
//! assignments are folded with the [`ValueEvaluator`] against the values
//! known on the current path; anything that cannot be folded is `Top`.

use super::evaluator::{binary, compound_operator, unary, Evaluated, ValueEvaluator};
use crate::reaching::assigned_variable;
use cpgflow_core::dataflow::{EogWorklist, FixpointResult, FlatLattice, State};
use cpgflow_core::graph::{AstTree, EvaluationOrder, NodeId, NodeKind, NodeLookup, Value};
use tracing::trace;

/// Known constant per variable name
pub type ConstantState = State<String, FlatLattice<Value>>;

/// Constant value of `variable` in `state`, if it has exactly one
pub fn constant_of(state: &ConstantState, variable: &str) -> Option<Value> {
    state
        .get(&variable.to_string())
        .and_then(FlatLattice::value)
        .cloned()
}

/// Transfer function of constant propagation
pub fn transfer<G>(graph: &G, node: NodeId, mut state: ConstantState) -> ConstantState
where
    G: AstTree + NodeLookup + ?Sized,
{
    let Some(variable) = assigned_variable(graph, node) else {
        return state;
    };
    let variable = variable.to_string();
    let value = {
        let bindings = |name: &str| constant_of(&state, name);
        let mut evaluator = ValueEvaluator::new(graph);
        written_value(graph, &mut evaluator, node, &bindings, &variable)
    };
    trace!(%node, %variable, ?value, "constant");
    let element = match value {
        Some(value) => FlatLattice::Value(value),
        None => FlatLattice::Top,
    };
    state.insert(variable, element);
    state
}

/// Value that `node` writes to `variable`
fn written_value<G>(
    graph: &G,
    evaluator: &mut ValueEvaluator<'_, G>,
    node: NodeId,
    bindings: &dyn Fn(&str) -> Option<Value>,
    variable: &str,
) -> Option<Value>
where
    G: AstTree + NodeLookup + ?Sized,
{
    let kind = &graph.node(node)?.kind;
    match kind {
        NodeKind::VariableDeclaration => evaluator.evaluate_with(node, &bindings).into_value(),
        NodeKind::Assignment { operator } => {
            let rhs = *graph.ast_children(node).get(1)?;
            let rhs = evaluator.evaluate_with(rhs, &bindings).into_value()?;
            match compound_operator(operator) {
                None => Some(rhs),
                Some(base) => binary(base, &bindings(variable)?, &rhs),
            }
        }
        NodeKind::UnaryOperator { operator } => unary(operator, &bindings(variable)?),
        _ => match evaluator.evaluate_with(node, &bindings) {
            Evaluated::Value(value) => Some(value),
            Evaluated::Unknown(_) => None,
        },
    }
}

/// Runs constant propagation from `start`
pub fn propagate_constants<G>(
    engine: &mut EogWorklist<'_, G>,
    graph: &G,
    start: NodeId,
) -> Option<FixpointResult<NodeId, String, FlatLattice<Value>>>
where
    G: AstTree + NodeLookup + EvaluationOrder + ?Sized,
{
    engine.iterate_from_node(start, ConstantState::new(), |node, state, _| {
        transfer(graph, node, state)
    })
}
