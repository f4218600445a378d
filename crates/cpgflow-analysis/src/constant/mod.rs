//! Constant evaluation and propagation

pub mod evaluator;
pub mod multi;
pub mod propagation;

pub use evaluator::{Bindings, Evaluated, NoBindings, ValueEvaluator};
pub use multi::{MultiBindings, MultiValueEvaluator, ValueSet};
pub use propagation::{constant_of, propagate_constants, ConstantState};
