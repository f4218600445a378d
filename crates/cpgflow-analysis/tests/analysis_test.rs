//! End-to-end tests of the analyses on small hand-built programs
//!
//! Test Strategy:
//! - Reaching assignments across an if/else with compound assignment
//! - Constant propagation merging to Top at a join
//! - Dead branches behind constant conditions, including loops

use cpgflow_analysis::prelude::*;
use cpgflow_core::prelude::*;
use tracing_subscriber::EnvFilter;

fn init_logging() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

/// Builds nodes the way a frontend would: children first in evaluation
/// order, then the parent.
struct Builder {
    graph: Graph,
}

impl Builder {
    fn new() -> Self {
        Self {
            graph: Graph::new(),
        }
    }

    fn int(&mut self, value: i64) -> NodeId {
        self.graph
            .add_node(NodeKind::Literal(Value::Int(value)), value.to_string())
    }

    fn boolean(&mut self, value: bool) -> NodeId {
        self.graph
            .add_node(NodeKind::Literal(Value::Bool(value)), value.to_string())
    }

    fn reference(&mut self, name: &str) -> NodeId {
        self.graph.add_node(NodeKind::Reference, name)
    }

    fn with_children(&mut self, kind: NodeKind, name: &str, children: &[NodeId]) -> NodeId {
        let node = self.graph.add_node(kind, name);
        for &child in children {
            self.graph.add_ast_child(node, child).unwrap();
        }
        node
    }

    /// `name = value` evaluated as `[lhs, rhs, assignment]`
    fn assign(&mut self, name: &str, operator: &str, value: NodeId) -> [NodeId; 3] {
        let lhs = self.reference(name);
        let assignment = self.with_children(
            NodeKind::Assignment {
                operator: operator.into(),
            },
            operator,
            &[lhs, value],
        );
        [lhs, value, assignment]
    }

    fn chain(&mut self, chain: &[NodeId]) {
        self.graph.connect_eog(chain).unwrap();
    }
}

/// ```text
/// f() {
///   a = 5;
///   if (cond) { a -= 1; } else { a = 2; }
///   call(a);
/// }
/// ```
struct Diamond {
    graph: Graph,
    function: NodeId,
    declaration: NodeId,
    then_assignment: NodeId,
    else_assignment: NodeId,
    call: NodeId,
}

fn diamond(condition: Option<bool>) -> Diamond {
    let mut b = Builder::new();
    let function = b.graph.add_node(NodeKind::Function, "f");
    let five = b.int(5);
    let declaration = b.with_children(NodeKind::VariableDeclaration, "a", &[five]);
    let cond = match condition {
        Some(value) => b.boolean(value),
        None => b.reference("cond"),
    };
    let branch = b.with_children(NodeKind::If, "if", &[cond]);

    let one = b.int(1);
    let [then_lhs, _, then_assignment] = b.assign("a", "-=", one);
    let two = b.int(2);
    let [else_lhs, _, else_assignment] = b.assign("a", "=", two);

    let argument = b.reference("a");
    let call = b.with_children(NodeKind::Call, "call", &[argument]);

    b.chain(&[function, five, declaration, cond, branch]);
    b.graph.add_branch_edge(branch, then_lhs, true).unwrap();
    b.graph.add_branch_edge(branch, else_lhs, false).unwrap();
    b.chain(&[then_lhs, one, then_assignment, argument]);
    b.chain(&[else_lhs, two, else_assignment, argument]);
    b.chain(&[argument, call]);

    Diamond {
        graph: b.graph,
        function,
        declaration,
        then_assignment,
        else_assignment,
        call,
    }
}

#[test]
fn test_both_branch_assignments_reach_the_call() {
    init_logging();
    let program = diamond(None);

    let result = reaching_assignments(
        &mut EogWorklist::new(&program.graph),
        &program.graph,
        program.function,
    )
    .unwrap();

    let at_call = result
        .state_at(&program.call)
        .unwrap()
        .get(&"a".to_string())
        .unwrap();
    assert_eq!(at_call.len(), 2);
    assert!(at_call.contains(&program.then_assignment));
    assert!(at_call.contains(&program.else_assignment));
    assert!(!at_call.contains(&program.declaration));
}

#[test]
fn test_constants_disagree_after_the_branch() {
    let program = diamond(None);

    let result = propagate_constants(
        &mut EogWorklist::new(&program.graph),
        &program.graph,
        program.function,
    )
    .unwrap();

    let after_then = result.state_at(&program.then_assignment).unwrap();
    let after_else = result.state_at(&program.else_assignment).unwrap();
    assert_eq!(constant_of(after_then, "a"), Some(Value::Int(4)));
    assert_eq!(constant_of(after_else, "a"), Some(Value::Int(2)));

    let at_call = result.state_at(&program.call).unwrap();
    assert_eq!(at_call.get(&"a".to_string()), Some(&FlatLattice::Top));
}

#[test]
fn test_constant_condition_kills_else_branch() {
    init_logging();
    let program = diamond(Some(true));
    let else_lhs = program.graph.ast_children(program.else_assignment)[0];

    let mut driver = AnalysisDriver::new(FlowConfig::default());
    let report = driver.run_all(&program.graph, &mut UnreachableEog).unwrap();
    let dead = report.get(program.function).unwrap();

    assert!(dead.contains_node(else_lhs));
    assert!(dead.contains_node(program.else_assignment));
    assert!(!dead.contains_node(program.then_assignment));
    assert!(!dead.contains_node(program.call));

    let edges: Vec<String> = dead.edges.iter().map(ToString::to_string).collect();
    insta::assert_snapshot!(edges.join(", "), @"#4 -> #9, #9 -> #8, #8 -> #10, #10 -> #11");
}

#[test]
fn test_while_true_never_exits() {
    init_logging();
    // f() { while (true) { x = 1; } done(); }
    let mut b = Builder::new();
    let function = b.graph.add_node(NodeKind::Function, "f");
    let condition = b.boolean(true);
    let head = b.with_children(NodeKind::While, "while", &[condition]);
    let one = b.int(1);
    let [lhs, _, assignment] = b.assign("x", "=", one);
    let done = b.graph.add_node(NodeKind::Call, "done");

    b.chain(&[function, condition, head]);
    b.graph.add_branch_edge(head, lhs, true).unwrap();
    b.graph.add_branch_edge(head, done, false).unwrap();
    b.chain(&[lhs, one, assignment, condition]);

    let dead = unreachable_code(&mut EogWorklist::new(&b.graph), &b.graph, function).unwrap();

    assert_eq!(dead.edges, vec![EogEdge::new(head, done)]);
    assert_eq!(dead.nodes, vec![done]);
}

#[test]
fn test_evaluator_folds_declaration_initializer() {
    let mut b = Builder::new();
    let text = b
        .graph
        .add_node(NodeKind::Literal(Value::Str("n=".into())), "\"n=\"");
    let six = b.int(6);
    let seven = b.int(7);
    let product = b.with_children(
        NodeKind::BinaryOperator {
            operator: "*".into(),
        },
        "*",
        &[six, seven],
    );
    let concat = b.with_children(
        NodeKind::BinaryOperator {
            operator: "+".into(),
        },
        "+",
        &[text, product],
    );
    let declaration = b.with_children(NodeKind::VariableDeclaration, "label", &[concat]);

    let mut evaluator = ValueEvaluator::new(&b.graph);
    assert_eq!(
        evaluator.evaluate(declaration),
        Evaluated::Value(Value::Str("n=42".into()))
    );
}
