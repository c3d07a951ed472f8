//! Scheduling errors

use kernel_api::KernelError;
use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum SchedulingError {
    #[error("Priority {priority} is outside the guest range 0..=63")]
    InvalidPriority { priority: u8 },

    /// `exit_override` without a matching `enter_override`
    #[error("Affinity override scope exited more often than entered")]
    OverrideUnderflow,

    #[error("Host error: {0}")]
    Host(#[from] KernelError),
}
