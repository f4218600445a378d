//! Integration tests for the traversal substrate
//!
//! Test Strategy:
//! - Border detection on a block nested in an if/else
//! - Flattening with degenerate AST back-references
//! - Walkers over cyclic EOGs

use cpgflow_core::prelude::*;
use std::cell::RefCell;

struct IfElse {
    graph: Graph,
    condition: NodeId,
    then_block: NodeId,
    statements: [NodeId; 3],
    join: NodeId,
}

/// `if (c) { s1; s2; s3 } else { e } join`
fn if_else() -> IfElse {
    let mut graph = Graph::new();
    let function = graph.add_node(NodeKind::Function, "f");
    let branch = graph.add_node(NodeKind::If, "if");
    let condition = graph.add_node(NodeKind::Reference, "c");
    let then_block = graph.add_node(NodeKind::Block, "then");
    let s1 = graph.add_node(NodeKind::Call, "s1");
    let s2 = graph.add_node(NodeKind::Call, "s2");
    let s3 = graph.add_node(NodeKind::Call, "s3");
    let else_block = graph.add_node(NodeKind::Block, "else");
    let e = graph.add_node(NodeKind::Call, "e");
    let join = graph.add_node(NodeKind::Return, "join");

    graph.add_ast_child(function, branch).unwrap();
    graph.add_ast_child(branch, condition).unwrap();
    graph.add_ast_child(branch, then_block).unwrap();
    graph.add_ast_child(branch, else_block).unwrap();
    for statement in [s1, s2, s3] {
        graph.add_ast_child(then_block, statement).unwrap();
    }
    graph.add_ast_child(else_block, e).unwrap();
    graph.add_ast_child(function, join).unwrap();

    graph.connect_eog(&[function, condition, branch]).unwrap();
    graph.add_branch_edge(branch, s1, true).unwrap();
    graph.add_branch_edge(branch, e, false).unwrap();
    graph.connect_eog(&[s1, s2, s3, join]).unwrap();
    graph.connect_eog(&[e, join]).unwrap();

    IfElse {
        graph,
        condition,
        then_block,
        statements: [s1, s2, s3],
        join,
    }
}

#[test]
fn test_border_of_nested_block() {
    let fixture = if_else();
    let [s1, _, s3] = fixture.statements;

    let border = eog_path_edges(&fixture.graph, fixture.then_block);

    assert_eq!(border.entries, vec![s1]);
    assert_eq!(border.exits, vec![s3]);
}

#[test]
fn test_border_of_whole_branch() {
    let fixture = if_else();
    let branch = fixture.graph.ast_parent(fixture.condition).unwrap();

    let border = eog_path_edges(&fixture.graph, branch);

    assert_eq!(border.entries, vec![fixture.condition]);
    assert_eq!(border.exits.len(), 2);
    assert!(border
        .exits
        .iter()
        .all(|&exit| fixture.graph.next_eog(exit) == [fixture.join]));
}

#[test]
fn test_flatten_with_back_edge_visits_each_node_once() {
    let mut fixture = if_else();
    let [_, _, s3] = fixture.statements;
    let function = fixture.graph.functions().next().unwrap();
    fixture.graph.add_ast_reference(s3, function).unwrap();

    let flat = flatten_ast(&fixture.graph, function);

    assert_eq!(flat.len(), fixture.graph.len());
    let unique: IdentitySet<NodeId> = flat.iter().copied().collect();
    assert_eq!(unique.len(), flat.len());
    assert_eq!(flat[0], function);
}

#[test]
fn test_eog_walk_visits_both_branches_once() {
    let fixture = if_else();
    let function = fixture.graph.functions().next().unwrap();

    let visited = RefCell::new(Vec::new());
    let mut walker = IterativeGraphWalker::with_strategy(&fixture.graph, |g: &Graph, n| {
        g.next_eog(n).to_vec()
    });
    walker.register_on_node_visit(|_, node, _| visited.borrow_mut().push(node));
    walker.iterate(function);
    drop(walker);

    let visited = visited.into_inner();
    let eog_nodes = fixture
        .graph
        .nodes()
        .filter(|n| n.has_eog())
        .count();
    assert_eq!(visited.len(), eog_nodes);
    assert_eq!(visited.iter().filter(|&&n| n == fixture.join).count(), 1);
}
