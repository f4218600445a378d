//! # cpgflow-core
//!
//! Fixpoint dataflow engine over the evaluation order graph (EOG) of a code
//! property graph, together with the substrate it runs on.
//!
//! ## Modules
//!
//! - **[`graph`]** - Node arena with AST and EOG edges
//! - **[`collections`]** - Identity-keyed sets
//! - **[`traversal`]** - AST flattening, EOG borders, iterative walkers
//! - **[`dataflow`]** - Lattices, states, the worklist engine
//! - **[`ordering`]** - Callee-first ordering of procedures
//!
//! ## Quick Start
//!
//! ```rust
//! use cpgflow_core::prelude::*;
//!
//! let mut graph = Graph::new();
//! let a = graph.add_node(NodeKind::Reference, "a");
//! let b = graph.add_node(NodeKind::Reference, "b");
//! graph.connect_eog(&[a, b]).unwrap();
//!
//! let reached = iterate_eog(
//!     &graph,
//!     a,
//!     State::<&str, PowersetLattice>::new(),
//!     None,
//!     |node, mut state, _| {
//!         state.push("reached", PowersetLattice::singleton(node));
//!         state
//!     },
//! )
//! .unwrap();
//! assert_eq!(reached.get(&"reached").map(|s| s.len()), Some(2));
//! ```

pub mod collections;
pub mod config;
pub mod dataflow;
pub mod error;
pub mod graph;
pub mod metrics;
pub mod ordering;
pub mod traversal;

pub use config::FlowConfig;
pub use error::{CpgFlowError, Result};
pub use metrics::{IterationStats, Measurements};

/// Prelude for convenient imports
pub mod prelude {
    pub use crate::collections::{ConcurrentIdentitySet, Identifiable, IdentitySet};
    pub use crate::config::FlowConfig;
    pub use crate::dataflow::{
        iterate_eog, iterate_eog_edges, EogWorklist, FixpointResult, FlatLattice, LatticeElement,
        Order, PowersetLattice, State, Worklist,
    };
    pub use crate::error::{CpgFlowError, Result};
    pub use crate::graph::{
        AstTree, EogEdge, EvaluationOrder, Graph, Location, Node, NodeId, NodeKind, NodeLookup,
        ScopeId, Value,
    };
    pub use crate::metrics::{IterationStats, Measurements};
    pub use crate::ordering::order_by_dependencies;
    pub use crate::traversal::{
        eog_path_edges, flatten_ast, flatten_ast_until, Border, IterativeGraphWalker,
        ScopeManager, ScopedWalker,
    };
}
