//! Evaluation of expressions to the set of values they may take
//!
//! Where [`super::ValueEvaluator`] needs one value per variable, the
//! [`MultiValueEvaluator`] accepts a set of candidates per variable and
//! applies operators to every combination of operand values. The result is
//! `None` as soon as one combination cannot be computed.

use super::evaluator::{binary, compound_operator, unary};
use cpgflow_core::dataflow::{PowersetLattice, State};
use cpgflow_core::graph::{AstTree, NodeId, NodeKind, NodeLookup, Value};
use tracing::{debug, warn};

/// Expressions nested deeper than this are not evaluated
pub const MAX_DEPTH: usize = 20;

/// Largest number of operand combinations one operator may expand to
pub const MAX_COMBINATIONS: usize = 256;

/// The values an expression may evaluate to
pub type ValueSet = PowersetLattice<Value>;

/// Resolves variable names to the values they may hold
pub trait MultiBindings {
    fn lookup_all(&self, name: &str) -> Option<ValueSet>;
}

impl MultiBindings for State<String, ValueSet> {
    fn lookup_all(&self, name: &str) -> Option<ValueSet> {
        self.get(&name.to_string())
            .filter(|values| !values.is_empty())
            .cloned()
    }
}

impl<F: Fn(&str) -> Option<ValueSet>> MultiBindings for F {
    fn lookup_all(&self, name: &str) -> Option<ValueSet> {
        self(name)
    }
}

/// Folds literals and operators over sets of possible values
pub struct MultiValueEvaluator<'a, G: ?Sized> {
    graph: &'a G,
    path: Vec<NodeId>,
}

impl<'a, G: AstTree + NodeLookup + ?Sized> MultiValueEvaluator<'a, G> {
    /// An evaluator with an empty path
    pub fn new(graph: &'a G) -> Self {
        Self {
            graph,
            path: Vec::new(),
        }
    }

    /// Nodes visited by the last evaluation
    pub fn path(&self) -> &[NodeId] {
        &self.path
    }

    /// Possible values of `node`, resolving references through `bindings`.
    /// Starts a fresh evaluation path.
    pub fn evaluate_with(&mut self, node: NodeId, bindings: &dyn MultiBindings) -> Option<ValueSet> {
        self.path.clear();
        self.evaluate_internal(node, bindings, 0)
    }

    /// Possible values of `node` when no variable is known
    pub fn evaluate(&mut self, node: NodeId) -> Option<ValueSet> {
        let unbound = |_: &str| -> Option<ValueSet> { None };
        self.evaluate_with(node, &unbound)
    }

    fn operand(&self, node: NodeId, index: usize) -> Option<NodeId> {
        self.graph.ast_children(node).get(index).copied()
    }

    fn evaluate_internal(
        &mut self,
        id: NodeId,
        bindings: &dyn MultiBindings,
        depth: usize,
    ) -> Option<ValueSet> {
        let graph = self.graph;
        let node = graph.node(id)?;
        self.path.push(id);
        if depth > MAX_DEPTH {
            warn!(node = %id, "expression nested too deeply, giving up");
            return None;
        }

        match &node.kind {
            NodeKind::Literal(value) => Some(ValueSet::singleton(value.clone())),
            NodeKind::VariableDeclaration => {
                let initializer = self.operand(id, 0)?;
                self.evaluate_internal(initializer, bindings, depth + 1)
            }
            NodeKind::Reference => bindings.lookup_all(&node.name),
            NodeKind::UnaryOperator { operator } => {
                let input = self.operand(id, 0)?;
                let values = self.evaluate_internal(input, bindings, depth + 1)?;
                values.iter().map(|value| unary(operator, value)).collect()
            }
            NodeKind::BinaryOperator { operator } => {
                let (lhs, rhs) = (self.operand(id, 0)?, self.operand(id, 1)?);
                let lhs = self.evaluate_internal(lhs, bindings, depth + 1)?;
                let rhs = self.evaluate_internal(rhs, bindings, depth + 1)?;
                combine(id, operator, &lhs, &rhs)
            }
            NodeKind::Assignment { operator } => {
                let rhs = self.operand(id, 1)?;
                let rhs = self.evaluate_internal(rhs, bindings, depth + 1)?;
                match compound_operator(operator) {
                    None => Some(rhs),
                    Some(base) => {
                        let lhs = self.operand(id, 0)?;
                        let lhs = self.evaluate_internal(lhs, bindings, depth + 1)?;
                        combine(id, base, &lhs, &rhs)
                    }
                }
            }
            _ => None,
        }
    }
}

/// Applies `operator` to every pair of `lhs` and `rhs` values
fn combine(node: NodeId, operator: &str, lhs: &ValueSet, rhs: &ValueSet) -> Option<ValueSet> {
    if lhs.len().saturating_mul(rhs.len()) > MAX_COMBINATIONS {
        debug!(%node, %operator, lhs = lhs.len(), rhs = rhs.len(), "too many combinations");
        return None;
    }
    lhs.iter()
        .flat_map(|a| rhs.iter().map(move |b| (a, b)))
        .map(|(a, b)| binary(operator, a, b))
        .collect()
}
