//! Error types for cpgflow-analysis

use cpgflow_core::graph::NodeId;
use thiserror::Error;

/// Errors raised by the analysis drivers
#[derive(Debug, Error)]
pub enum AnalysisError {
    #[error("{0} is not a function node")]
    NotAFunction(NodeId),

    #[error("analysis `{analysis}` timed out in function {function}")]
    TimedOut { analysis: String, function: NodeId },
}
