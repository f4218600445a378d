//! Worklist-based fixpoint iteration along the evaluation order graph

use super::lattice::LatticeElement;
use super::state::State;
use super::worklist::{self, Worklist};
use crate::collections::Identifiable;
use crate::config::FlowConfig;
use crate::graph::{EogEdge, EvaluationOrder, NodeId};
use crate::metrics::{IterationStats, Measurements};
use indexmap::IndexMap;
use std::fmt;
use std::hash::Hash;
use std::time::Duration;
use tracing::{debug, trace, warn};

#[cfg(not(feature = "wasm"))]
use std::time::Instant;
#[cfg(feature = "wasm")]
use web_time::Instant;

/// Result of a converged fixpoint computation
#[derive(Debug)]
pub struct FixpointResult<K: Hash + Eq, N: Hash + Eq, V> {
    /// Best known state per work key
    pub global_state: IndexMap<K, State<N, V>>,
    /// Iterations and wall time of the run
    pub stats: IterationStats,
}

impl<K, N, V> FixpointResult<K, N, V>
where
    K: Hash + Eq,
    N: Hash + Eq + Clone,
    V: LatticeElement,
{
    /// Meet over paths: the join of every global state
    pub fn mop(&self) -> State<N, V> {
        worklist::mop(&self.global_state)
    }

    /// Global state stored for `key`, `None` if the key was never reached
    pub fn state_at(&self, key: &K) -> Option<&State<N, V>> {
        self.global_state.get(key)
    }

    /// Number of worklist entries processed
    pub fn iterations(&self) -> usize {
        self.stats.iterations
    }
}

/// Fixpoint engine over the EOG of a graph.
///
/// The engine seeds a worklist with a start node (or start edges) and an
/// initial state, then repeatedly pops an entry, applies the caller's
/// transformation and joins the result into the global state of that
/// entry. Successors are queued whenever that join changed something.
///
/// The transformation receives the worklist itself and may push extra
/// entries; they are processed by the same loop.
pub struct EogWorklist<'a, G: ?Sized> {
    graph: &'a G,
    timeout: Option<Duration>,
    filter: Option<Box<dyn Fn(NodeId) -> bool + 'a>>,
    measurements: Option<&'a mut Measurements>,
    label: String,
}

impl<'a, G: EvaluationOrder + ?Sized> EogWorklist<'a, G> {
    /// An engine without timeout, filter or measurements
    pub fn new(graph: &'a G) -> Self {
        Self {
            graph,
            timeout: None,
            filter: None,
            measurements: None,
            label: String::from("eog"),
        }
    }

    /// Applies the timeout of `config`
    pub fn from_config(graph: &'a G, config: &FlowConfig) -> Self {
        let engine = Self::new(graph);
        match config.timeout() {
            Some(timeout) => engine.with_timeout(timeout),
            None => engine,
        }
    }

    /// Aborts the computation once `timeout` has elapsed. The check runs
    /// between iterations, so a single slow transformation is not
    /// interrupted.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Only successors for which `filter` returns true are queued
    pub fn with_filter(mut self, filter: impl Fn(NodeId) -> bool + 'a) -> Self {
        self.filter = Some(Box::new(filter));
        self
    }

    /// Records every run, converged or aborted, into `measurements`
    pub fn with_measurements(mut self, measurements: &'a mut Measurements) -> Self {
        self.measurements = Some(measurements);
        self
    }

    /// Name under which runs are recorded and logged
    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = label.into();
        self
    }

    fn accepts(&self, node: NodeId) -> bool {
        self.filter.as_ref().map_or(true, |filter| filter(node))
    }

    /// Node `n` is inside a basic block if it has exactly one successor and
    /// exactly one predecessor, which itself has exactly one successor.
    fn node_inside_basic_block(&self, node: NodeId) -> bool {
        self.graph.next_eog(node).len() == 1
            && match self.graph.prev_eog(node) {
                [previous] => self.graph.next_eog(*previous).len() == 1,
                _ => false,
            }
    }

    fn edge_inside_basic_block(&self, edge: &EogEdge) -> bool {
        self.graph.next_eog(edge.end).len() == 1
            && self.graph.next_eog(edge.start).len() == 1
            && self.graph.prev_eog(edge.end).len() == 1
    }

    /// Iterates the EOG starting at `start`, with work keyed by node.
    ///
    /// Returns `None` if the timeout elapsed before the worklist emptied.
    pub fn iterate_from_node<N, V, F>(
        &mut self,
        start: NodeId,
        start_state: State<N, V>,
        transformation: F,
    ) -> Option<FixpointResult<NodeId, N, V>>
    where
        N: Hash + Eq + Clone,
        V: LatticeElement,
        F: FnMut(NodeId, State<N, V>, &mut Worklist<NodeId, N, V>) -> State<N, V>,
    {
        let (result, stats) = self.run(
            vec![(start, start_state)],
            transformation,
            |node| {
                self.graph
                    .next_eog(*node)
                    .iter()
                    .copied()
                    .filter(|&next| self.accepts(next))
                    .collect()
            },
            |node| self.node_inside_basic_block(*node),
        );
        self.record(stats, result.is_some());
        result
    }

    /// Iterates the EOG starting at `start_edges`, with work keyed by edge.
    /// Each start edge is seeded with its own copy of `start_state`.
    pub fn iterate_from_edges<N, V, F>(
        &mut self,
        start_edges: &[EogEdge],
        start_state: State<N, V>,
        transformation: F,
    ) -> Option<FixpointResult<EogEdge, N, V>>
    where
        N: Hash + Eq + Clone,
        V: LatticeElement,
        F: FnMut(EogEdge, State<N, V>, &mut Worklist<EogEdge, N, V>) -> State<N, V>,
    {
        let seeds = start_edges
            .iter()
            .map(|edge| (*edge, start_state.duplicate()))
            .collect();
        let (result, stats) = self.run(
            seeds,
            transformation,
            |edge| {
                self.graph
                    .next_eog(edge.end)
                    .iter()
                    .copied()
                    .filter(|&next| self.accepts(next))
                    .map(|next| EogEdge::new(edge.end, next))
                    .collect()
            },
            |edge| self.edge_inside_basic_block(edge),
        );
        self.record(stats, result.is_some());
        result
    }

    fn run<K, N, V, F, S, B>(
        &self,
        seeds: Vec<(K, State<N, V>)>,
        mut transformation: F,
        successors: S,
        inside_basic_block: B,
    ) -> (Option<FixpointResult<K, N, V>>, IterationStats)
    where
        K: Identifiable + Hash + Eq + Clone + fmt::Display,
        N: Hash + Eq + Clone,
        V: LatticeElement,
        F: FnMut(K, State<N, V>, &mut Worklist<K, N, V>) -> State<N, V>,
        S: Fn(&K) -> Vec<K>,
        B: Fn(&K) -> bool,
    {
        let started = Instant::now();
        let deadline = self.timeout.and_then(|timeout| started.checked_add(timeout));
        let mut stats = IterationStats::default();
        let mut worklist = Worklist::new();
        for (key, state) in seeds {
            worklist.push(key, state);
        }
        debug!(label = %self.label, seeds = worklist.len(), "starting EOG iteration");

        loop {
            if deadline.is_some_and(|deadline| Instant::now() >= deadline) {
                stats.pushes = worklist.pushes();
                stats.elapsed = started.elapsed();
                warn!(
                    label = %self.label,
                    iterations = stats.iterations,
                    "EOG iteration timed out, discarding partial state"
                );
                return (None, stats);
            }
            let Some((key, state)) = worklist.pop() else {
                break;
            };
            stats.iterations += 1;
            trace!(key = %key, "processing");

            // Straight-line code hands the state along; everywhere else
            // the transformation works on its own copy.
            let effective = if inside_basic_block(&key) {
                state
            } else {
                stats.duplications += 1;
                state.duplicate()
            };
            let new_state = transformation(key.clone(), effective, &mut worklist);

            if worklist.update(key.clone(), &new_state) {
                let mut next = successors(&key);
                // The last successor takes ownership, the others get copies.
                if let Some(last) = next.pop() {
                    for succ in next {
                        stats.duplications += 1;
                        worklist.push(succ, new_state.duplicate());
                    }
                    worklist.push(last, new_state);
                }
            }
        }

        stats.pushes = worklist.pushes();
        stats.elapsed = started.elapsed();
        debug!(
            label = %self.label,
            iterations = stats.iterations,
            keys = worklist.global_state().len(),
            "EOG iteration converged"
        );
        let result = FixpointResult {
            global_state: worklist.into_global_state(),
            stats,
        };
        (Some(result), stats)
    }

    fn record(&mut self, stats: IterationStats, converged: bool) {
        if let Some(measurements) = self.measurements.as_deref_mut() {
            measurements.record(self.label.clone(), stats, converged);
        }
    }
}

/// Runs [`EogWorklist::iterate_from_node`] and returns the meet over paths
pub fn iterate_eog<G, N, V, F>(
    graph: &G,
    start: NodeId,
    start_state: State<N, V>,
    timeout: Option<Duration>,
    transformation: F,
) -> Option<State<N, V>>
where
    G: EvaluationOrder + ?Sized,
    N: Hash + Eq + Clone,
    V: LatticeElement,
    F: FnMut(NodeId, State<N, V>, &mut Worklist<NodeId, N, V>) -> State<N, V>,
{
    let mut engine = EogWorklist::new(graph);
    if let Some(timeout) = timeout {
        engine = engine.with_timeout(timeout);
    }
    engine
        .iterate_from_node(start, start_state, transformation)
        .map(|result| result.mop())
}

/// Runs [`EogWorklist::iterate_from_edges`] and returns the meet over paths
pub fn iterate_eog_edges<G, N, V, F>(
    graph: &G,
    start_edges: &[EogEdge],
    start_state: State<N, V>,
    timeout: Option<Duration>,
    transformation: F,
) -> Option<State<N, V>>
where
    G: EvaluationOrder + ?Sized,
    N: Hash + Eq + Clone,
    V: LatticeElement,
    F: FnMut(EogEdge, State<N, V>, &mut Worklist<EogEdge, N, V>) -> State<N, V>,
{
    let mut engine = EogWorklist::new(graph);
    if let Some(timeout) = timeout {
        engine = engine.with_timeout(timeout);
    }
    engine
        .iterate_from_edges(start_edges, start_state, transformation)
        .map(|result| result.mop())
}
