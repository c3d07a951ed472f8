//! Kernel errors

use core_types::{ProcessId, ThreadId};
use kernel_api::{KernelError, ReservationError};
use process_capabilities::CapabilityError;
use program_metadata::FormatError;
use thiserror::Error;
use thread_scheduling::SchedulingError;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum HleError {
    #[error("Program descriptor: {0}")]
    Format(#[from] FormatError),

    #[error("Capabilities: {0}")]
    Capability(#[from] CapabilityError),

    #[error("Scheduling: {0}")]
    Scheduling(#[from] SchedulingError),

    #[error("Host: {0}")]
    Host(#[from] KernelError),

    #[error("Memory reservation: {0}")]
    Reservation(#[from] ReservationError),

    #[error("Main thread core {core} does not exist")]
    InvalidMainThreadCore { core: u8 },

    #[error("Core {core} is not permitted for {process}")]
    CoreNotPermitted { process: ProcessId, core: u8 },

    #[error("Priority {priority} is not permitted for {process}")]
    PriorityNotPermitted { process: ProcessId, priority: u8 },

    #[error("{0} not found")]
    ProcessNotFound(ProcessId),

    #[error("{0} not found")]
    ThreadNotFound(ThreadId),
}
