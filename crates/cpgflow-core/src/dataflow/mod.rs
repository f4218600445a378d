//! Dataflow analysis framework
//!
//! Lattice elements, per-key states and the worklist fixpoint engine that
//! propagates them along the evaluation order graph.

pub mod lattice;
pub mod solver;
pub mod state;
pub mod worklist;

pub use lattice::{FlatLattice, LatticeElement, Order, PowersetLattice};
pub use solver::{iterate_eog, iterate_eog_edges, EogWorklist, FixpointResult};
pub use state::State;
pub use worklist::Worklist;
