//! Call-graph based ordering of procedures for interprocedural analyses
//!
//! Callees are placed before their callers where the call graph allows it.
//! Cycles are broken heuristically, so the order is a best effort and not a
//! minimum feedback arc set.

use crate::graph::{AstTree, NodeId, NodeKind, NodeLookup};
use crate::traversal::flatten_ast_until;
use indexmap::{IndexMap, IndexSet};
use tracing::debug;

type CalleeMap = IndexMap<NodeId, IndexSet<NodeId>>;

/// Orders `starters` so that callees come before callers.
///
/// 1. Functions whose (remaining) callees are all placed are appended,
///    sorted by name, until none are left.
/// 2. The remaining functions all sit on or above a cycle. Their
///    dependencies are closed transitively, without self-dependencies.
/// 3. The functions with the fewest remaining dependencies are appended
///    (ties by name) until every function is placed.
/// 4. Starters that are not functions come last, in input order.
pub fn order_by_dependencies<G>(graph: &G, starters: &[NodeId]) -> Vec<NodeId>
where
    G: AstTree + NodeLookup + ?Sized,
{
    let functions: IndexSet<NodeId> = starters
        .iter()
        .copied()
        .filter(|&id| graph.node(id).is_some_and(|n| n.kind.is_function()))
        .collect();

    let mut callees: CalleeMap = functions
        .iter()
        .map(|&function| (function, callees_of(graph, function, &functions)))
        .collect();
    let mut callers = transpose(&callees);
    let mut ordered = Vec::with_capacity(starters.len());

    loop {
        let mut ready: Vec<NodeId> = callees
            .iter()
            .filter(|(_, deps)| deps.is_empty())
            .map(|(&function, _)| function)
            .collect();
        if ready.is_empty() {
            break;
        }
        sort_by_name(graph, &mut ready);
        for function in &ready {
            strip(&mut callees, &callers, *function);
        }
        ordered.extend(ready);
    }

    if !callees.is_empty() {
        debug!(remaining = callees.len(), "breaking call cycles");
        close_transitively(&mut callees);
        callers = transpose(&callees);
    }

    while let Some(fewest) = callees.values().map(IndexSet::len).min() {
        let mut picked: Vec<NodeId> = callees
            .iter()
            .filter(|(_, deps)| deps.len() == fewest)
            .map(|(&function, _)| function)
            .collect();
        sort_by_name(graph, &mut picked);
        for function in &picked {
            strip(&mut callees, &callers, *function);
        }
        ordered.extend(picked);
    }

    let mut placed: IndexSet<NodeId> = ordered.iter().copied().collect();
    for &starter in starters {
        if !functions.contains(&starter) && placed.insert(starter) {
            ordered.push(starter);
        }
    }

    ordered
}

/// Functions among `candidates` that calls inside `function` may invoke.
/// Nested functions are not part of the body.
fn callees_of<G>(graph: &G, function: NodeId, candidates: &IndexSet<NodeId>) -> IndexSet<NodeId>
where
    G: AstTree + NodeLookup + ?Sized,
{
    let body = flatten_ast_until(graph, function, |node| {
        node != function && graph.node(node).is_some_and(|n| n.kind.is_function())
    });

    body.into_iter()
        .filter_map(|id| graph.node(id))
        .filter(|node| matches!(node.kind, NodeKind::Call))
        .flat_map(|call| call.invokes().iter().copied())
        .filter(|target| candidates.contains(target))
        .collect()
}

fn transpose(callees: &CalleeMap) -> CalleeMap {
    let mut callers: CalleeMap = IndexMap::new();
    for (&caller, deps) in callees {
        for &callee in deps {
            callers.entry(callee).or_default().insert(caller);
        }
    }
    callers
}

/// Removes `function` from the map and from the dependencies of its callers
fn strip(callees: &mut CalleeMap, callers: &CalleeMap, function: NodeId) {
    callees.shift_remove(&function);
    if let Some(dependents) = callers.get(&function) {
        for dependent in dependents {
            if let Some(deps) = callees.get_mut(dependent) {
                deps.shift_remove(&function);
            }
        }
    }
}

fn close_transitively(callees: &mut CalleeMap) {
    loop {
        let mut changed = false;
        for index in 0..callees.len() {
            let Some((_, deps)) = callees.get_index(index) else {
                continue;
            };
            let mut extended = deps.clone();
            for dep in deps {
                if let Some(transitive) = callees.get(dep) {
                    extended.extend(transitive.iter().copied());
                }
            }
            if extended.len() != deps.len() {
                changed = true;
                if let Some((_, deps)) = callees.get_index_mut(index) {
                    *deps = extended;
                }
            }
        }
        if !changed {
            break;
        }
    }

    for (function, deps) in callees.iter_mut() {
        deps.shift_remove(function);
    }
}

fn sort_by_name<G: NodeLookup + ?Sized>(graph: &G, functions: &mut [NodeId]) {
    let name = |id: &NodeId| graph.node(*id).map_or("", |n| n.name.as_str());
    functions.sort_by(|a, b| name(a).cmp(name(b)).then(a.cmp(b)));
}
