//! Nodes of the code property graph

use serde::{Deserialize, Serialize};
use smallvec::SmallVec;
use std::fmt;

/// Stable identifier of a node inside a [`super::Graph`] arena
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct NodeId(pub u32);

impl NodeId {
    /// Position of the node in the arena
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Identifier of a lexical scope. Scopes themselves are owned by whoever
/// resolves symbols; the graph only records which scope a node lives in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ScopeId(pub u32);

/// Source location of a node
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Location {
    pub file: String,
    pub line: u32,
    pub column: u32,
}

impl fmt::Display for Location {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}:{}", self.file, self.line, self.column)
    }
}

/// A constant value carried by a literal node
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Value {
    Int(i64),
    Bool(bool),
    Str(String),
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Int(i) => write!(f, "{i}"),
            Value::Bool(b) => write!(f, "{b}"),
            Value::Str(s) => write!(f, "{s:?}"),
        }
    }
}

/// What a node represents. The engine never looks at this; analyses and
/// node filters do.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum NodeKind {
    TranslationUnit,
    Function,
    Block,
    /// Declaration of a variable. Its first AST child, if any, is the initializer.
    VariableDeclaration,
    /// `lhs op rhs`, AST children are `[lhs, rhs]`. The operator is `=` for a
    /// plain assignment and `+=`, `-=`, ... for compound ones.
    Assignment { operator: String },
    Reference,
    Literal(Value),
    /// AST children are `[lhs, rhs]`
    BinaryOperator { operator: String },
    /// AST child is the operand
    UnaryOperator { operator: String },
    /// AST children are the arguments; see [`Node::invokes`] for the targets
    Call,
    /// AST children are `[condition, then, else?]`
    If,
    /// AST children are `[condition, body]`
    While,
    Return,
    Other,
}

impl NodeKind {
    /// Whether the node is a function declaration
    pub fn is_function(&self) -> bool {
        matches!(self, NodeKind::Function)
    }

    /// Nodes at which the EOG splits on a condition
    pub fn is_branching(&self) -> bool {
        matches!(self, NodeKind::If | NodeKind::While)
    }
}

/// A single entry of the graph arena
#[derive(Debug, Clone)]
pub struct Node {
    pub id: NodeId,
    pub kind: NodeKind,
    pub name: String,
    pub code: Option<String>,
    pub location: Option<Location>,
    pub scope: Option<ScopeId>,
    pub(crate) ast_parent: Option<NodeId>,
    pub(crate) ast_children: SmallVec<[NodeId; 4]>,
    pub(crate) next_eog: SmallVec<[NodeId; 2]>,
    pub(crate) prev_eog: SmallVec<[NodeId; 2]>,
    pub(crate) invokes: SmallVec<[NodeId; 1]>,
}

impl Node {
    pub(crate) fn new(id: NodeId, kind: NodeKind, name: impl Into<String>) -> Self {
        Self {
            id,
            kind,
            name: name.into(),
            code: None,
            location: None,
            scope: None,
            ast_parent: None,
            ast_children: SmallVec::new(),
            next_eog: SmallVec::new(),
            prev_eog: SmallVec::new(),
            invokes: SmallVec::new(),
        }
    }

    pub fn ast_parent(&self) -> Option<NodeId> {
        self.ast_parent
    }

    pub fn ast_children(&self) -> &[NodeId] {
        &self.ast_children
    }

    pub fn next_eog(&self) -> &[NodeId] {
        &self.next_eog
    }

    pub fn prev_eog(&self) -> &[NodeId] {
        &self.prev_eog
    }

    /// Functions a call node may invoke
    pub fn invokes(&self) -> &[NodeId] {
        &self.invokes
    }

    /// Whether the node takes part in the evaluation order at all
    pub fn has_eog(&self) -> bool {
        !self.next_eog.is_empty() || !self.prev_eog.is_empty()
    }

    /// The literal value, if this is a literal node
    pub fn literal(&self) -> Option<&Value> {
        match &self.kind {
            NodeKind::Literal(value) => Some(value),
            _ => None,
        }
    }

    /// The operator of assignments, binary and unary operators
    pub fn operator(&self) -> Option<&str> {
        match &self.kind {
            NodeKind::Assignment { operator }
            | NodeKind::BinaryOperator { operator }
            | NodeKind::UnaryOperator { operator } => Some(operator),
            _ => None,
        }
    }
}

impl fmt::Display for Node {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.code {
            Some(code) => write!(f, "{} `{}`", self.id, code),
            None => write!(f, "{} {}", self.id, self.name),
        }
    }
}
