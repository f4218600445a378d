//! Integration tests for the EOG worklist engine

use cpgflow_core::prelude::*;
use std::time::Duration;

type Reaching = State<String, PowersetLattice<NodeId>>;

/// Kills and regenerates the definition of the node's name for every
/// `Assignment`, passes everything else through.
fn reaching(graph: &Graph, node: NodeId, mut state: Reaching) -> Reaching {
    if let Some(n) = graph.node(node) {
        if matches!(n.kind, NodeKind::Assignment { .. }) {
            state.insert(n.name.clone(), PowersetLattice::singleton(node));
        }
    }
    state
}

fn assignment(graph: &mut Graph, variable: &str) -> NodeId {
    graph.add_node(
        NodeKind::Assignment {
            operator: "=".into(),
        },
        variable,
    )
}

#[test]
fn test_loop_merges_definitions_at_head() {
    // x = 0; while (c) { x = 1 } use
    let mut graph = Graph::new();
    let init = assignment(&mut graph, "x");
    let head = graph.add_node(NodeKind::While, "while");
    let body = assignment(&mut graph, "x");
    let exit = graph.add_node(NodeKind::Reference, "x");
    graph.connect_eog(&[init, head]).unwrap();
    graph.add_branch_edge(head, body, true).unwrap();
    graph.add_branch_edge(head, exit, false).unwrap();
    graph.connect_eog(&[body, head]).unwrap();

    let result = EogWorklist::new(&graph)
        .iterate_from_node(init, Reaching::new(), |node, state, _| {
            reaching(&graph, node, state)
        })
        .unwrap();

    let at_exit = result.state_at(&exit).unwrap().get(&"x".to_string()).unwrap();
    assert!(at_exit.contains(&init));
    assert!(at_exit.contains(&body));
    assert_eq!(at_exit.len(), 2);
}

#[test]
fn test_edge_overload_keeps_branch_states_apart() {
    let mut graph = Graph::new();
    let branch = graph.add_node(NodeKind::If, "if");
    let left = assignment(&mut graph, "y");
    let right = assignment(&mut graph, "y");
    let join = graph.add_node(NodeKind::Reference, "y");
    graph.add_branch_edge(branch, left, true).unwrap();
    graph.add_branch_edge(branch, right, false).unwrap();
    graph.connect_eog(&[left, join]).unwrap();
    graph.connect_eog(&[right, join]).unwrap();

    let result = EogWorklist::new(&graph)
        .iterate_from_edges(&graph.eog_edges_from(branch), Reaching::new(), |edge, state, _| {
            reaching(&graph, edge.end, state)
        })
        .unwrap();

    let key = "y".to_string();
    let via_left = result.state_at(&EogEdge::new(left, join)).unwrap();
    let via_right = result.state_at(&EogEdge::new(right, join)).unwrap();
    assert_eq!(via_left.get(&key), Some(&PowersetLattice::singleton(left)));
    assert_eq!(via_right.get(&key), Some(&PowersetLattice::singleton(right)));
    assert_eq!(result.mop().get(&key).map(|s| s.len()), Some(2));
}

#[test]
fn test_config_timeout_applies() {
    let mut graph = Graph::new();
    let a = assignment(&mut graph, "z");
    let b = graph.add_node(NodeKind::Reference, "z");
    graph.connect_eog(&[a, b]).unwrap();

    let config = FlowConfig::from_json_str(r#"{"timeout_ms": 0}"#).unwrap();
    let mut measurements = Measurements::new();
    let aborted = EogWorklist::from_config(&graph, &config)
        .with_label("reaching")
        .with_measurements(&mut measurements)
        .iterate_from_node(a, Reaching::new(), |node, state, _| reaching(&graph, node, state));
    assert!(aborted.is_none());
    assert_eq!(measurements.records()[0].label, "reaching");
    assert!(!measurements.records()[0].converged);

    let generous = EogWorklist::new(&graph)
        .with_timeout(Duration::from_secs(60))
        .iterate_from_node(a, Reaching::new(), |node, state, _| reaching(&graph, node, state));
    assert!(generous.is_some());
}

#[test]
fn test_flat_lattice_goes_to_top_on_conflict() {
    let mut graph = Graph::new();
    let branch = graph.add_node(NodeKind::If, "if");
    let one = graph.add_node(NodeKind::Literal(Value::Int(1)), "v");
    let two = graph.add_node(NodeKind::Literal(Value::Int(2)), "v");
    let join = graph.add_node(NodeKind::Reference, "v");
    graph.add_eog_edge(branch, one).unwrap();
    graph.add_eog_edge(branch, two).unwrap();
    graph.connect_eog(&[one, join]).unwrap();
    graph.connect_eog(&[two, join]).unwrap();

    let mop = iterate_eog(
        &graph,
        branch,
        State::<&str, FlatLattice<Value>>::new(),
        None,
        |node, mut state, _| {
            if let Some(value) = graph.node(node).and_then(|n| n.literal()) {
                state.insert("v", FlatLattice::Value(value.clone()));
            }
            state
        },
    )
    .unwrap();

    assert_eq!(mop.get(&"v"), Some(&FlatLattice::Top));
}
