//! Arena-backed code property graph
//!
//! Nodes live in a single `Vec` and are addressed by [`NodeId`]. Edges are
//! stored as id lists on both endpoints, so predecessor and successor
//! queries are slice lookups. Building the AST and EOG edges is the job of
//! upstream passes; the graph only offers the primitives to record them.

mod node;

pub use node::{Location, Node, NodeId, NodeKind, ScopeId, Value};

use crate::error::{CpgFlowError, Result};
use fnv::FnvHashMap;
use serde::{Deserialize, Serialize};
use std::fmt;
use tracing::error;

/// A directed edge of the evaluation order graph
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct EogEdge {
    pub start: NodeId,
    pub end: NodeId,
}

impl EogEdge {
    /// The edge `start -> end`
    pub fn new(start: NodeId, end: NodeId) -> Self {
        Self { start, end }
    }
}

impl fmt::Display for EogEdge {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} -> {}", self.start, self.end)
    }
}

/// Resolves node ids to nodes
pub trait NodeLookup {
    fn node(&self, id: NodeId) -> Option<&Node>;
}

/// Structural (AST) containment
pub trait AstTree {
    fn ast_children(&self, id: NodeId) -> &[NodeId];

    fn ast_parent(&self, id: NodeId) -> Option<NodeId>;
}

/// Control flow in evaluation order
pub trait EvaluationOrder {
    fn next_eog(&self, id: NodeId) -> &[NodeId];

    fn prev_eog(&self, id: NodeId) -> &[NodeId];

    fn has_eog(&self, id: NodeId) -> bool {
        !self.next_eog(id).is_empty() || !self.prev_eog(id).is_empty()
    }

    /// Outgoing edges of `id` in successor order
    fn eog_edges_from(&self, id: NodeId) -> Vec<EogEdge> {
        self.next_eog(id).iter().map(|&end| EogEdge::new(id, end)).collect()
    }

    /// The branch label of an EOG edge, if it is conditional
    fn branch(&self, _edge: EogEdge) -> Option<bool> {
        None
    }
}

/// The code property graph
#[derive(Debug, Default, Clone)]
pub struct Graph {
    nodes: Vec<Node>,
    branches: FnvHashMap<EogEdge, bool>,
}

impl Graph {
    /// An empty graph
    pub fn new() -> Self {
        Self::default()
    }

    /// An empty graph with room for `capacity` nodes
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            nodes: Vec::with_capacity(capacity),
            branches: FnvHashMap::default(),
        }
    }

    /// Number of nodes
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Adds a node and returns its id.
    ///
    /// # Panics
    ///
    /// If the graph already holds `u32::MAX + 1` nodes. Use
    /// [`Graph::try_add_node`] to handle that case.
    pub fn add_node(&mut self, kind: NodeKind, name: impl Into<String>) -> NodeId {
        match self.try_add_node(kind, name) {
            Ok(id) => id,
            Err(err) => panic!("{err}"),
        }
    }

    /// Adds a node, failing with [`CpgFlowError::TooManyNodes`] once the
    /// 32-bit id space is used up
    pub fn try_add_node(&mut self, kind: NodeKind, name: impl Into<String>) -> Result<NodeId> {
        let id = next_id(self.nodes.len())?;
        self.nodes.push(Node::new(id, kind, name));
        Ok(id)
    }

    /// Mutable access to a node, `None` for unknown ids
    pub fn node_mut(&mut self, id: NodeId) -> Option<&mut Node> {
        self.nodes.get_mut(id.index())
    }

    /// All nodes in id order
    pub fn nodes(&self) -> impl Iterator<Item = &Node> {
        self.nodes.iter()
    }

    /// All function nodes in insertion order
    pub fn functions(&self) -> impl Iterator<Item = NodeId> + '_ {
        self.nodes.iter().filter(|n| n.kind.is_function()).map(|n| n.id)
    }

    /// Name of a node, empty for unknown ids
    pub fn name(&self, id: NodeId) -> &str {
        self.node(id).map_or("", |n| n.name.as_str())
    }

    fn require(&self, id: NodeId) -> Result<()> {
        if id.index() < self.nodes.len() {
            Ok(())
        } else {
            Err(CpgFlowError::UnknownNode(id))
        }
    }

    fn get_mut(&mut self, id: NodeId) -> Result<&mut Node> {
        self.nodes.get_mut(id.index()).ok_or(CpgFlowError::UnknownNode(id))
    }

    /// Attaches the source text of a node
    pub fn set_code(&mut self, id: NodeId, code: impl Into<String>) -> Result<()> {
        self.get_mut(id)?.code = Some(code.into());
        Ok(())
    }

    /// Attaches the source location of a node
    pub fn set_location(&mut self, id: NodeId, location: Location) -> Result<()> {
        self.get_mut(id)?.location = Some(location);
        Ok(())
    }

    /// Records the scope a node is declared in
    pub fn set_scope(&mut self, id: NodeId, scope: ScopeId) -> Result<()> {
        self.get_mut(id)?.scope = Some(scope);
        Ok(())
    }

    /// Appends `child` to the AST children of `parent`. Adding the same
    /// child twice keeps a single entry.
    pub fn add_ast_child(&mut self, parent: NodeId, child: NodeId) -> Result<()> {
        self.require(parent)?;
        let node = self.get_mut(child)?;
        match node.ast_parent {
            Some(existing) if existing != parent => {
                return Err(CpgFlowError::AlreadyParented {
                    child,
                    parent: existing,
                })
            }
            _ => node.ast_parent = Some(parent),
        }
        let children = &mut self.get_mut(parent)?.ast_children;
        if !children.contains(&child) {
            children.push(child);
        }
        Ok(())
    }

    /// Appends `child` to the AST children of `parent` without touching the
    /// parent pointer of `child`. This is how degenerate back-references
    /// (e.g. a child that refers to one of its ancestors) enter the graph.
    pub fn add_ast_reference(&mut self, parent: NodeId, child: NodeId) -> Result<()> {
        self.require(child)?;
        self.get_mut(parent)?.ast_children.push(child);
        Ok(())
    }

    /// Adds an EOG edge; duplicates are ignored
    pub fn add_eog_edge(&mut self, from: NodeId, to: NodeId) -> Result<()> {
        self.require(from)?;
        self.require(to)?;
        let source = &mut self.nodes[from.index()];
        if !source.next_eog.contains(&to) {
            source.next_eog.push(to);
        }
        let target = &mut self.nodes[to.index()];
        if !target.prev_eog.contains(&from) {
            target.prev_eog.push(from);
        }
        Ok(())
    }

    /// Adds an EOG edge that is only taken when the branch condition of
    /// `from` evaluates to `branch`
    pub fn add_branch_edge(&mut self, from: NodeId, to: NodeId, branch: bool) -> Result<()> {
        self.add_eog_edge(from, to)?;
        self.branches.insert(EogEdge::new(from, to), branch);
        Ok(())
    }

    /// Connects consecutive nodes of `chain` with EOG edges
    pub fn connect_eog(&mut self, chain: &[NodeId]) -> Result<()> {
        for pair in chain.windows(2) {
            self.add_eog_edge(pair[0], pair[1])?;
        }
        Ok(())
    }

    /// Removes an EOG edge. Returns whether it existed.
    pub fn remove_eog_edge(&mut self, from: NodeId, to: NodeId) -> bool {
        let mut removed = false;
        if let Some(source) = self.nodes.get_mut(from.index()) {
            let before = source.next_eog.len();
            source.next_eog.retain(|n| *n != to);
            removed = before != source.next_eog.len();
        }
        if let Some(target) = self.nodes.get_mut(to.index()) {
            target.prev_eog.retain(|n| *n != from);
        }
        self.branches.remove(&EogEdge::new(from, to));
        removed
    }

    /// Records that `call` may invoke `function`
    pub fn add_invokes(&mut self, call: NodeId, function: NodeId) -> Result<()> {
        self.require(function)?;
        let node = self.get_mut(call)?;
        if !node.invokes.contains(&function) {
            node.invokes.push(function);
        }
        Ok(())
    }

    /// Number of EOG edges in the whole graph
    pub fn eog_edge_count(&self) -> usize {
        self.nodes.iter().map(|n| n.next_eog.len()).sum()
    }
}

/// Id of the node stored at index `len`
fn next_id(len: usize) -> Result<NodeId> {
    u32::try_from(len)
        .map(NodeId)
        .map_err(|_| CpgFlowError::TooManyNodes(len))
}

impl NodeLookup for Graph {
    fn node(&self, id: NodeId) -> Option<&Node> {
        self.nodes.get(id.index())
    }
}

impl AstTree for Graph {
    fn ast_children(&self, id: NodeId) -> &[NodeId] {
        match self.nodes.get(id.index()) {
            Some(node) => &node.ast_children,
            None => {
                error!(node = %id, "cannot retrieve AST children of unknown node");
                &[]
            }
        }
    }

    fn ast_parent(&self, id: NodeId) -> Option<NodeId> {
        self.nodes.get(id.index()).and_then(|n| n.ast_parent)
    }
}

impl EvaluationOrder for Graph {
    fn next_eog(&self, id: NodeId) -> &[NodeId] {
        match self.nodes.get(id.index()) {
            Some(node) => &node.next_eog,
            None => {
                error!(node = %id, "cannot retrieve EOG successors of unknown node");
                &[]
            }
        }
    }

    fn prev_eog(&self, id: NodeId) -> &[NodeId] {
        match self.nodes.get(id.index()) {
            Some(node) => &node.prev_eog,
            None => {
                error!(node = %id, "cannot retrieve EOG predecessors of unknown node");
                &[]
            }
        }
    }

    fn branch(&self, edge: EogEdge) -> Option<bool> {
        self.branches.get(&edge).copied()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_add_eog_edge_is_idempotent() {
        let mut graph = Graph::new();
        let a = graph.add_node(NodeKind::Reference, "a");
        let b = graph.add_node(NodeKind::Reference, "b");

        graph.add_eog_edge(a, b).unwrap();
        graph.add_eog_edge(a, b).unwrap();

        assert_eq!(graph.next_eog(a), &[b]);
        assert_eq!(graph.prev_eog(b), &[a]);
        assert_eq!(graph.eog_edge_count(), 1);
    }

    #[test]
    fn test_unknown_node_is_rejected() {
        let mut graph = Graph::new();
        let a = graph.add_node(NodeKind::Reference, "a");

        let err = graph.add_eog_edge(a, NodeId(42)).unwrap_err();
        assert!(matches!(err, CpgFlowError::UnknownNode(NodeId(42))));
        assert!(graph.next_eog(NodeId(42)).is_empty());
    }

    #[test]
    fn test_ast_child_cannot_have_two_parents() {
        let mut graph = Graph::new();
        let p1 = graph.add_node(NodeKind::Block, "p1");
        let p2 = graph.add_node(NodeKind::Block, "p2");
        let c = graph.add_node(NodeKind::Reference, "c");

        graph.add_ast_child(p1, c).unwrap();
        let err = graph.add_ast_child(p2, c).unwrap_err();

        assert!(matches!(err, CpgFlowError::AlreadyParented { .. }));
        assert_eq!(graph.ast_parent(c), Some(p1));
    }

    #[test]
    fn test_add_ast_child_twice_keeps_one_entry() {
        let mut graph = Graph::new();
        let parent = graph.add_node(NodeKind::Block, "block");
        let child = graph.add_node(NodeKind::Reference, "c");

        graph.add_ast_child(parent, child).unwrap();
        graph.add_ast_child(parent, child).unwrap();

        assert_eq!(graph.ast_children(parent), &[child]);
        assert_eq!(graph.ast_parent(child), Some(parent));
    }

    #[test]
    fn test_try_add_node_assigns_sequential_ids() {
        let mut graph = Graph::new();
        let a = graph.try_add_node(NodeKind::Reference, "a").unwrap();
        let b = graph.try_add_node(NodeKind::Reference, "b").unwrap();

        assert_eq!((a, b), (NodeId(0), NodeId(1)));
        assert_eq!(graph.name(b), "b");
    }

    #[test]
    fn test_node_ids_are_limited_to_32_bits() {
        assert_eq!(next_id(7).unwrap(), NodeId(7));
        assert_eq!(next_id(u32::MAX as usize).unwrap(), NodeId(u32::MAX));
    }

    #[cfg(target_pointer_width = "64")]
    #[test]
    fn test_node_id_overflow_is_an_error() {
        let len = u32::MAX as usize + 1;
        let err = next_id(len).unwrap_err();
        assert!(matches!(err, CpgFlowError::TooManyNodes(n) if n == len));
    }

    #[test]
    fn test_branch_edges_and_removal() {
        let mut graph = Graph::new();
        let cond = graph.add_node(NodeKind::If, "if");
        let then = graph.add_node(NodeKind::Block, "then");
        let other = graph.add_node(NodeKind::Block, "else");

        graph.add_branch_edge(cond, then, true).unwrap();
        graph.add_branch_edge(cond, other, false).unwrap();

        assert_eq!(graph.branch(EogEdge::new(cond, then)), Some(true));
        assert_eq!(graph.branch(EogEdge::new(cond, other)), Some(false));

        assert!(graph.remove_eog_edge(cond, then));
        assert!(!graph.remove_eog_edge(cond, then));
        assert_eq!(graph.next_eog(cond), &[other]);
        assert!(graph.prev_eog(then).is_empty());
        assert_eq!(graph.branch(EogEdge::new(cond, then)), None);
    }
}
