//! # cpgflow-analysis
//!
//! Dataflow analyses built on the EOG fixpoint engine of `cpgflow-core`.
//!
//! ## Modules
//!
//! - **[`reaching`]** - Reaching assignments per variable
//! - **[`constant`]** - Single and multi-value expression evaluation, constant propagation
//! - **[`unreachable`]** - EOG edges ruled out by constant conditions
//! - **[`driver`]** - Running an analysis over every function, callees first
//!
//! ## Quick Start
//!
//! ```rust
//! use cpgflow_analysis::prelude::*;
//! use cpgflow_core::prelude::*;
//!
//! let mut graph = Graph::new();
//! let main = graph.add_node(NodeKind::Function, "main");
//! let declaration = graph.add_node(NodeKind::VariableDeclaration, "x");
//! graph.connect_eog(&[main, declaration]).unwrap();
//!
//! let mut driver = AnalysisDriver::new(FlowConfig::default());
//! let report = driver.run_all(&graph, &mut ReachingAssignments).unwrap();
//! let reaching = report.get(main).unwrap();
//! assert!(reaching.get(&"x".to_string()).unwrap().contains(&declaration));
//! ```

pub mod constant;
pub mod driver;
pub mod error;
pub mod reaching;
pub mod unreachable;

/// Prelude for convenient imports
pub mod prelude {
    pub use crate::constant::{
        constant_of, propagate_constants, Bindings, ConstantState, Evaluated, MultiBindings,
        MultiValueEvaluator, NoBindings, ValueEvaluator, ValueSet,
    };
    pub use crate::driver::{
        state_at_exits, AnalysisDriver, AnalysisReport, ConstantPropagation, FunctionAnalysis,
        ReachingAssignments, UnreachableEog,
    };
    pub use crate::error::AnalysisError;
    pub use crate::reaching::{assigned_variable, reaching_assignments, ReachingState};
    pub use crate::unreachable::{
        branch_condition, unreachable_code, Reachability, UnreachableCode,
    };
}

pub use driver::{AnalysisDriver, AnalysisReport, FunctionAnalysis};
pub use error::AnalysisError;
