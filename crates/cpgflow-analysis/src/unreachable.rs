//! Unreachable evaluation order
//!
//! Finds EOG edges that can never be taken because a branch condition
//! always evaluates to the same boolean. Work is keyed by edge so that the
//! two outgoing edges of a branch carry separate states.

use crate::constant::evaluator::{Evaluated, ValueEvaluator};
use cpgflow_core::dataflow::{EogWorklist, LatticeElement, Order, State};
use cpgflow_core::graph::{AstTree, EogEdge, EvaluationOrder, NodeId, NodeLookup, Value};
use indexmap::IndexSet;
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Two-point lattice, `Unreachable` below `Reachable`
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
pub enum Reachability {
    #[default]
    Unreachable,
    Reachable,
}

impl LatticeElement for Reachability {
    fn lub(&self, other: &Self) -> Self {
        (*self).max(*other)
    }

    fn compare(&self, other: &Self) -> Order {
        match self.cmp(other) {
            std::cmp::Ordering::Greater => Order::Greater,
            std::cmp::Ordering::Equal => Order::Equal,
            std::cmp::Ordering::Less => Order::Lesser,
        }
    }
}

/// Reachability per EOG edge
pub type ReachabilityState = State<EogEdge, Reachability>;

/// Edges and nodes that no execution can reach
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UnreachableCode {
    pub edges: Vec<EogEdge>,
    /// Nodes whose every incoming edge is unreachable
    pub nodes: Vec<NodeId>,
}

impl UnreachableCode {
    pub fn is_empty(&self) -> bool {
        self.edges.is_empty()
    }

    /// Whether `edge` can never be taken
    pub fn contains_edge(&self, edge: &EogEdge) -> bool {
        self.edges.contains(edge)
    }

    /// Whether `node` can never execute
    pub fn contains_node(&self, node: NodeId) -> bool {
        self.nodes.contains(&node)
    }
}

/// Constant truth value of the condition of a branching node
pub fn branch_condition<G>(graph: &G, branch: NodeId) -> Option<bool>
where
    G: AstTree + NodeLookup + ?Sized,
{
    let node = graph.node(branch)?;
    if !node.kind.is_branching() {
        return None;
    }
    let condition = *graph.ast_children(branch).first()?;
    match ValueEvaluator::new(graph).evaluate(condition) {
        Evaluated::Value(Value::Bool(value)) => Some(value),
        _ => None,
    }
}

fn reachability_of_node<G>(
    graph: &G,
    node: NodeId,
    entry: NodeId,
    state: &ReachabilityState,
) -> Reachability
where
    G: EvaluationOrder + ?Sized,
{
    if node == entry {
        return Reachability::Reachable;
    }
    graph
        .prev_eog(node)
        .iter()
        .filter_map(|&previous| state.get(&EogEdge::new(previous, node)))
        .fold(Reachability::Unreachable, |acc, r| acc.lub(r))
}

/// Transfer function for `edge`. The edge is as reachable as its start
/// node, unless the start node is a branch whose condition rules it out.
pub fn transfer<G>(
    graph: &G,
    entry: NodeId,
    edge: EogEdge,
    mut state: ReachabilityState,
) -> ReachabilityState
where
    G: AstTree + NodeLookup + EvaluationOrder + ?Sized,
{
    let mut reachability = reachability_of_node(graph, edge.start, entry, &state);
    let label = graph.branch(edge);
    if let (Some(condition), Some(taken)) = (branch_condition(graph, edge.start), label) {
        if condition != taken {
            reachability = Reachability::Unreachable;
        }
    }
    state.push(edge, reachability);
    state
}

/// Determines the unreachable part of the EOG below `entry`.
///
/// `None` if the engine gave up because of its timeout.
pub fn unreachable_code<G>(
    engine: &mut EogWorklist<'_, G>,
    graph: &G,
    entry: NodeId,
) -> Option<UnreachableCode>
where
    G: AstTree + NodeLookup + EvaluationOrder + ?Sized,
{
    let start_edges = graph.eog_edges_from(entry);
    let result = engine.iterate_from_edges(
        &start_edges,
        ReachabilityState::new(),
        |edge, state, _| transfer(graph, entry, edge, state),
    )?;
    let mop = result.mop();

    let edges: Vec<EogEdge> = mop
        .iter()
        .filter(|(_, reachability)| **reachability == Reachability::Unreachable)
        .map(|(edge, _)| *edge)
        .collect();
    let targets: IndexSet<NodeId> = edges.iter().map(|edge| edge.end).collect();
    let nodes = targets
        .into_iter()
        .filter(|&node| {
            graph.prev_eog(node).iter().all(|&previous| {
                mop.get(&EogEdge::new(previous, node))
                    .map_or(true, |r| *r == Reachability::Unreachable)
            })
        })
        .collect();

    debug!(%entry, edges = edges.len(), "unreachable EOG computed");
    Some(UnreachableCode { edges, nodes })
}
