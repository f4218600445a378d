//! Running a per-function analysis over a whole graph
//!
//! The driver orders the functions callees first (unless disabled in the
//! [`FlowConfig`]), configures one engine per function and collects the
//! results. Functions whose analysis timed out are reported separately.

use crate::constant::propagation::{propagate_constants, ConstantState};
use crate::error::AnalysisError;
use crate::reaching::{reaching_assignments, ReachingState};
use crate::unreachable::{unreachable_code, UnreachableCode};
use anyhow::{Context, Result};
use cpgflow_core::dataflow::{EogWorklist, FixpointResult, LatticeElement, State};
use cpgflow_core::graph::{EvaluationOrder, Graph, NodeId, NodeLookup};
use cpgflow_core::ordering::order_by_dependencies;
use cpgflow_core::{FlowConfig, Measurements};
use indexmap::IndexMap;
use std::hash::Hash;
use tracing::{info, warn};

/// An analysis that runs once per function
pub trait FunctionAnalysis {
    type Output;

    /// Short name used in logs and measurement labels
    fn name(&self) -> &str;

    /// Analyzes `function` with the prepared `engine`. `None` means the
    /// engine timed out.
    fn analyze(
        &mut self,
        engine: EogWorklist<'_, Graph>,
        graph: &Graph,
        function: NodeId,
    ) -> Option<Self::Output>;
}

/// Results of one analysis over many functions
#[derive(Debug)]
pub struct AnalysisReport<T> {
    pub analysis: String,
    /// Per function, in the order they were analyzed
    pub results: IndexMap<NodeId, T>,
    pub timed_out: Vec<NodeId>,
}

impl<T> AnalysisReport<T> {
    /// Result for `function`, `None` if it timed out or was not analysed
    pub fn get(&self, function: NodeId) -> Option<&T> {
        self.results.get(&function)
    }

    /// Fails on the first function that did not converge in time
    pub fn ensure_complete(&self) -> std::result::Result<(), AnalysisError> {
        match self.timed_out.first() {
            Some(&function) => Err(AnalysisError::TimedOut {
                analysis: self.analysis.clone(),
                function,
            }),
            None => Ok(()),
        }
    }
}

/// Drives [`FunctionAnalysis`] implementations over a graph
#[derive(Debug, Default)]
pub struct AnalysisDriver {
    config: FlowConfig,
    measurements: Measurements,
}

impl AnalysisDriver {
    /// A driver whose engines follow `config`
    pub fn new(config: FlowConfig) -> Self {
        Self {
            config,
            measurements: Measurements::new(),
        }
    }

    /// The configuration in use
    pub fn config(&self) -> &FlowConfig {
        &self.config
    }

    /// Measurements of every engine run so far, if recording is enabled
    pub fn measurements(&self) -> &Measurements {
        &self.measurements
    }

    /// Runs `analysis` on every function of `graph`
    pub fn run_all<A: FunctionAnalysis>(
        &mut self,
        graph: &Graph,
        analysis: &mut A,
    ) -> Result<AnalysisReport<A::Output>> {
        let functions: Vec<NodeId> = graph.functions().collect();
        self.run(graph, analysis, &functions)
    }

    /// Runs `analysis` on `functions`
    pub fn run<A: FunctionAnalysis>(
        &mut self,
        graph: &Graph,
        analysis: &mut A,
        functions: &[NodeId],
    ) -> Result<AnalysisReport<A::Output>> {
        for &function in functions {
            let is_function = graph.node(function).is_some_and(|n| n.kind.is_function());
            if !is_function {
                return Err(AnalysisError::NotAFunction(function))
                    .with_context(|| format!("cannot run {}", analysis.name()));
            }
        }

        let ordered = if self.config.order_dependencies {
            order_by_dependencies(graph, functions)
        } else {
            functions.to_vec()
        };

        let mut report = AnalysisReport {
            analysis: analysis.name().to_string(),
            results: IndexMap::with_capacity(ordered.len()),
            timed_out: Vec::new(),
        };
        for function in ordered {
            let label = format!("{}:{}", analysis.name(), graph.name(function));
            let mut engine = EogWorklist::from_config(graph, &self.config).with_label(label);
            if self.config.record_measurements {
                engine = engine.with_measurements(&mut self.measurements);
            }
            match analysis.analyze(engine, graph, function) {
                Some(output) => {
                    report.results.insert(function, output);
                }
                None => {
                    warn!(analysis = analysis.name(), %function, "analysis timed out");
                    report.timed_out.push(function);
                }
            }
        }

        info!(
            analysis = %report.analysis,
            analyzed = report.results.len(),
            timed_out = report.timed_out.len(),
            "analysis finished"
        );
        Ok(report)
    }
}

/// Join of the states at the nodes where the function's EOG ends. A
/// function that never ends (for example `while (true)` without a break)
/// yields an empty state.
pub fn state_at_exits<N, V>(graph: &Graph, result: &FixpointResult<NodeId, N, V>) -> State<N, V>
where
    N: Hash + Eq + Clone,
    V: LatticeElement,
{
    let mut joined = State::new();
    for (node, state) in &result.global_state {
        if graph.next_eog(*node).is_empty() {
            joined.lub(state);
        }
    }
    joined
}

/// Reaching assignments at the end of each function
#[derive(Debug, Default)]
pub struct ReachingAssignments;

impl FunctionAnalysis for ReachingAssignments {
    type Output = ReachingState;

    fn name(&self) -> &str {
        "reaching"
    }

    fn analyze(
        &mut self,
        mut engine: EogWorklist<'_, Graph>,
        graph: &Graph,
        function: NodeId,
    ) -> Option<ReachingState> {
        reaching_assignments(&mut engine, graph, function)
            .map(|result| state_at_exits(graph, &result))
    }
}

/// Constants at the end of each function, `Top` where paths disagree
#[derive(Debug, Default)]
pub struct ConstantPropagation;

impl FunctionAnalysis for ConstantPropagation {
    type Output = ConstantState;

    fn name(&self) -> &str {
        "constants"
    }

    fn analyze(
        &mut self,
        mut engine: EogWorklist<'_, Graph>,
        graph: &Graph,
        function: NodeId,
    ) -> Option<ConstantState> {
        propagate_constants(&mut engine, graph, function)
            .map(|result| state_at_exits(graph, &result))
    }
}

/// Unreachable edges and nodes of each function
#[derive(Debug, Default)]
pub struct UnreachableEog;

impl FunctionAnalysis for UnreachableEog {
    type Output = UnreachableCode;

    fn name(&self) -> &str {
        "unreachable"
    }

    fn analyze(
        &mut self,
        mut engine: EogWorklist<'_, Graph>,
        graph: &Graph,
        function: NodeId,
    ) -> Option<UnreachableCode> {
        unreachable_code(&mut engine, graph, function)
    }
}
