//! Evaluation of expression subtrees to constant values

use cpgflow_core::graph::{AstTree, Node, NodeId, NodeKind, NodeLookup, Value};
use std::fmt;
use tracing::{debug, warn};

/// Expressions nested deeper than this are not evaluated
pub const MAX_DEPTH: usize = 256;

/// Outcome of evaluating an expression
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Evaluated {
    Value(Value),
    /// Could not be evaluated; carries a description of the culprit
    Unknown(String),
}

impl Evaluated {
    /// The computed value, if evaluation succeeded
    pub fn value(&self) -> Option<&Value> {
        match self {
            Evaluated::Value(v) => Some(v),
            Evaluated::Unknown(_) => None,
        }
    }

    /// Consumes the result, keeping the value
    pub fn into_value(self) -> Option<Value> {
        match self {
            Evaluated::Value(v) => Some(v),
            Evaluated::Unknown(_) => None,
        }
    }
}

impl fmt::Display for Evaluated {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Evaluated::Value(v) => write!(f, "{v}"),
            Evaluated::Unknown(what) => write!(f, "{{{what}}}"),
        }
    }
}

/// Resolves variable names to their current value
pub trait Bindings {
    fn lookup(&self, name: &str) -> Option<Value>;
}

/// No variable has a known value
pub struct NoBindings;

impl Bindings for NoBindings {
    fn lookup(&self, _name: &str) -> Option<Value> {
        None
    }
}

impl<F: Fn(&str) -> Option<Value>> Bindings for F {
    fn lookup(&self, name: &str) -> Option<Value> {
        self(name)
    }
}

/// Folds literals, unary and binary operators into a [`Value`].
///
/// Whatever the evaluator cannot handle is passed to the `cannot_evaluate`
/// hook; by default it yields [`Evaluated::Unknown`] with the node name.
/// Every node touched is appended to [`ValueEvaluator::path`].
pub struct ValueEvaluator<'a, G: ?Sized> {
    graph: &'a G,
    cannot_evaluate: Box<dyn Fn(&Node) -> Evaluated + 'a>,
    path: Vec<NodeId>,
}

impl<'a, G: AstTree + NodeLookup + ?Sized> ValueEvaluator<'a, G> {
    /// An evaluator without variable bindings
    pub fn new(graph: &'a G) -> Self {
        Self {
            graph,
            cannot_evaluate: Box::new(|node: &Node| Evaluated::Unknown(node.name.clone())),
            path: Vec::new(),
        }
    }

    /// Replaces the fallback used for nodes the evaluator does not understand
    pub fn with_cannot_evaluate(mut self, hook: impl Fn(&Node) -> Evaluated + 'a) -> Self {
        self.cannot_evaluate = Box::new(hook);
        self
    }

    /// Nodes visited by the evaluations so far
    pub fn path(&self) -> &[NodeId] {
        &self.path
    }

    /// Forgets the nodes visited by earlier evaluations
    pub fn clear_path(&mut self) {
        self.path.clear();
    }

    /// Evaluates `node` without knowledge of any variable
    pub fn evaluate(&mut self, node: NodeId) -> Evaluated {
        self.evaluate_with(node, &NoBindings)
    }

    /// Evaluates `node`, resolving references through `bindings`
    pub fn evaluate_with(&mut self, node: NodeId, bindings: &dyn Bindings) -> Evaluated {
        self.evaluate_internal(node, bindings, 0)
    }

    fn cannot(&self, node: &Node) -> Evaluated {
        (self.cannot_evaluate)(node)
    }

    fn operand(&self, node: NodeId, index: usize) -> Option<NodeId> {
        self.graph.ast_children(node).get(index).copied()
    }

    fn evaluate_internal(&mut self, id: NodeId, bindings: &dyn Bindings, depth: usize) -> Evaluated {
        let graph = self.graph;
        let Some(node) = graph.node(id) else {
            return Evaluated::Unknown(id.to_string());
        };
        self.path.push(id);
        if depth > MAX_DEPTH {
            warn!(node = %id, "expression nested too deeply, giving up");
            return self.cannot(node);
        }

        match &node.kind {
            NodeKind::Literal(value) => Evaluated::Value(value.clone()),
            NodeKind::VariableDeclaration => match self.operand(id, 0) {
                Some(initializer) => self.evaluate_internal(initializer, bindings, depth + 1),
                None => self.cannot(node),
            },
            NodeKind::Reference => match bindings.lookup(&node.name) {
                Some(value) => Evaluated::Value(value),
                None => self.cannot(node),
            },
            NodeKind::UnaryOperator { operator } => {
                let Some(input) = self.operand(id, 0) else {
                    return self.cannot(node);
                };
                match self.evaluate_internal(input, bindings, depth + 1) {
                    Evaluated::Value(value) => match unary(operator, &value) {
                        Some(result) => Evaluated::Value(result),
                        None => self.cannot(node),
                    },
                    unknown => unknown,
                }
            }
            NodeKind::BinaryOperator { operator } => {
                let (Some(lhs), Some(rhs)) = (self.operand(id, 0), self.operand(id, 1)) else {
                    return self.cannot(node);
                };
                let lhs = self.evaluate_internal(lhs, bindings, depth + 1);
                let rhs = self.evaluate_internal(rhs, bindings, depth + 1);
                match (lhs, rhs) {
                    (Evaluated::Value(lhs), Evaluated::Value(rhs)) => {
                        match binary(operator, &lhs, &rhs) {
                            Some(result) => Evaluated::Value(result),
                            None => {
                                debug!(node = %id, %operator, %lhs, %rhs, "cannot fold operator");
                                self.cannot(node)
                            }
                        }
                    }
                    (Evaluated::Unknown(what), _) | (_, Evaluated::Unknown(what)) => {
                        Evaluated::Unknown(what)
                    }
                }
            }
            _ => self.cannot(node),
        }
    }
}

/// Applies a unary operator. `None` if it is not defined for `value`.
pub fn unary(operator: &str, value: &Value) -> Option<Value> {
    match (operator, value) {
        ("-", Value::Int(i)) => i.checked_neg().map(Value::Int),
        ("+", Value::Int(i)) => Some(Value::Int(*i)),
        ("++", Value::Int(i)) => i.checked_add(1).map(Value::Int),
        ("--", Value::Int(i)) => i.checked_sub(1).map(Value::Int),
        ("!", Value::Bool(b)) => Some(Value::Bool(!b)),
        // dereference and address-of are transparent
        ("*" | "&", v) => Some(v.clone()),
        _ => None,
    }
}

/// Applies a binary operator. `None` if it is not defined for the operands
/// or the result overflows.
pub fn binary(operator: &str, lhs: &Value, rhs: &Value) -> Option<Value> {
    use Value::{Bool, Int, Str};

    match (operator, lhs, rhs) {
        ("+", Str(a), Str(b)) => Some(Str(format!("{a}{b}"))),
        ("+", Str(a), Int(b)) => Some(Str(format!("{a}{b}"))),
        ("+", Str(a), Bool(b)) => Some(Str(format!("{a}{b}"))),
        ("+", Int(a), Int(b)) => a.checked_add(*b).map(Int),
        ("-", Int(a), Int(b)) => a.checked_sub(*b).map(Int),
        ("*", Int(a), Int(b)) => a.checked_mul(*b).map(Int),
        ("/", Int(a), Int(b)) => a.checked_div(*b).map(Int),
        ("%", Int(a), Int(b)) => a.checked_rem(*b).map(Int),
        (">", Int(a), Int(b)) => Some(Bool(a > b)),
        (">=", Int(a), Int(b)) => Some(Bool(a >= b)),
        ("<", Int(a), Int(b)) => Some(Bool(a < b)),
        ("<=", Int(a), Int(b)) => Some(Bool(a <= b)),
        ("==", a, b) => Some(Bool(a == b)),
        ("!=", a, b) => Some(Bool(a != b)),
        ("&&", Bool(a), Bool(b)) => Some(Bool(*a && *b)),
        ("||", Bool(a), Bool(b)) => Some(Bool(*a || *b)),
        _ => None,
    }
}

/// The binary operator behind a compound assignment operator such as `+=`
pub fn compound_operator(assignment: &str) -> Option<&str> {
    match assignment {
        "=" => None,
        op => op.strip_suffix('=').filter(|base| !base.is_empty()),
    }
}
