//! Graph traversal substrate
//!
//! - [`flatten_ast`] / [`eog_path_edges`]: AST flattening and EOG borders
//! - [`IterativeGraphWalker`]: explicit-stack DFS with replacement support
//! - [`ScopedWalker`]: the same walk with a scope manager kept in sync

mod flatten;
mod scoped;
mod walker;

pub use flatten::{eog_path_edges, flatten_ast, flatten_ast_until, Border};
pub use scoped::{ScopeManager, ScopedWalker};
pub use walker::{strategy, IterativeGraphWalker, Visit};
