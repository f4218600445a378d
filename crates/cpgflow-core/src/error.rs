//! Error types for cpgflow-core

use crate::graph::NodeId;
use std::path::PathBuf;
use thiserror::Error;

/// Errors raised by graph mutation and configuration handling.
///
/// Traversal and fixpoint iteration never fail: structural anomalies are
/// logged and skipped, and a timeout is reported as an absent result.
#[derive(Debug, Error)]
pub enum CpgFlowError {
    #[error("unknown node {0}")]
    UnknownNode(NodeId),

    #[error("graph is full: node ids are 32 bits, {0} nodes exist")]
    TooManyNodes(usize),

    #[error("node {child} already has AST parent {parent}")]
    AlreadyParented { child: NodeId, parent: NodeId },

    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("failed to read configuration from {path}")]
    ConfigIo {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse configuration")]
    ConfigParse(#[from] serde_json::Error),
}

/// Result alias used throughout cpgflow-core
pub type Result<T> = std::result::Result<T, CpgFlowError>;
