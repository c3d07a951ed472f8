//! Host-side collaborators: execution contexts and address spaces.

use crate::KernelError;
use core_types::{CoreId, ThreadId};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use thiserror::Error;

/// Parameters for creating the host context behind a guest thread
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct HostThreadParams {
    /// Guest address execution starts at
    pub entry_point: u64,
    /// Value handed to the guest entry point
    pub entry_arg: u64,
    /// Size of the guest stack in bytes
    pub stack_size: u32,
    /// Core the thread is placed on initially
    pub core: CoreId,
}

/// Host execution context running one guest thread
///
/// Implementations are shared between the guest thread object and whoever
/// supervises it, so every method takes `&self`.
pub trait HostThread: Send + Sync {
    /// Begins executing guest code
    fn start(&self) -> Result<(), KernelError>;

    /// Applies an already rescaled host priority
    fn set_priority(&self, host_priority: i8) -> Result<(), KernelError>;

    /// Requests termination; must not block on the thread acknowledging it
    fn terminate(&self);

    /// Scheduler hook invoked when the guest thread's current core changes
    fn migrate(&self, _core: CoreId) {}
}

/// Factory for host execution contexts
pub trait HostExecution {
    fn spawn(
        &self,
        thread_id: ThreadId,
        params: &HostThreadParams,
    ) -> Result<Arc<dyn HostThread>, KernelError>;
}

/// A guest physical range declared by a process descriptor
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct MemoryRegion {
    pub address: u64,
    pub size: u64,
}

impl MemoryRegion {
    pub fn new(address: u64, size: u64) -> Self {
        Self { address, size }
    }

    /// Last byte covered by the region, `None` for empty or wrapping regions
    pub fn last_address(&self) -> Option<u64> {
        self.size
            .checked_sub(1)
            .and_then(|s| self.address.checked_add(s))
    }

    pub fn overlaps(&self, other: &MemoryRegion) -> bool {
        match (self.last_address(), other.last_address()) {
            (Some(a_end), Some(b_end)) => self.address <= b_end && other.address <= a_end,
            _ => false,
        }
    }
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ReservationError {
    /// The address space cannot map declared ranges yet
    #[error("Memory reservations are not supported by this address space")]
    Unsupported,

    /// Region collides with an existing reservation
    #[error("Region 0x{address:X}+0x{size:X} overlaps an existing reservation")]
    Overlap { address: u64, size: u64 },
}

/// Process address space as seen by capability application
pub trait AddressSpace {
    fn reserve(&mut self, region: MemoryRegion) -> Result<(), ReservationError>;

    /// Gives back a region an earlier `reserve` accepted
    fn release(&mut self, region: MemoryRegion);
}

/// Address space that answers every reservation with
/// [`ReservationError::Unsupported`]
#[derive(Debug, Default, Clone, Copy)]
pub struct UnsupportedAddressSpace;

impl AddressSpace for UnsupportedAddressSpace {
    fn reserve(&mut self, _region: MemoryRegion) -> Result<(), ReservationError> {
        Err(ReservationError::Unsupported)
    }

    fn release(&mut self, _region: MemoryRegion) {}
}
