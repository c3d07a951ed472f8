//! Kernel error types

use thiserror::Error;

/// Errors reported by host-side collaborators
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum KernelError {
    /// Host refused to create an execution context
    #[error("Failed to spawn host thread: {0}")]
    SpawnFailed(String),

    /// Host refused to start an execution context
    #[error("Failed to start host thread: {0}")]
    StartFailed(String),

    /// Host scheduler rejected a priority value
    #[error("Couldn't set host priority to {priority}: {reason}")]
    PriorityRejected { priority: i8, reason: String },

    /// Host does not implement the requested operation
    #[error("Unsupported host operation: {0}")]
    Unsupported(String),
}
