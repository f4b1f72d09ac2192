use thiserror::Error;

use crate::host::NodeId;

/// Unified result type for the reconciler crate.
pub type Result<T> = std::result::Result<T, ReconcileError>;

/// Result type returned by [`HostTree`](crate::host::HostTree) operations.
pub type HostResult<T> = std::result::Result<T, HostError>;

/// Failures raised by a host tree adapter. These are never recovered locally.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum HostError {
    #[error("node {0} does not exist in the host tree")]
    UnknownNode(NodeId),
    #[error("node {0} is not an element")]
    NotAnElement(NodeId),
    #[error("node {0} is not a text node")]
    NotText(NodeId),
    #[error("node {child} is not a child of {parent}")]
    NotAChild { parent: NodeId, child: NodeId },
    #[error("inserting {child} under {parent} would create a cycle")]
    HierarchyCycle { parent: NodeId, child: NodeId },
    #[error("host tree capacity of {limit} nodes exhausted")]
    CapacityExhausted { limit: usize },
}

/// Errors surfaced by a reconciliation pass.
#[derive(Debug, Error)]
pub enum ReconcileError {
    #[error("host adapter failure: {0}")]
    Host(#[from] HostError),
    #[error(transparent)]
    Io(#[from] std::io::Error),
}
