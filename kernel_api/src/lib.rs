//! # Kernel API
//!
//! This crate defines the seams between the HLE kernel and everything it
//! does not implement itself.
//!
//! ## Philosophy
//!
//! The HLE kernel decides **what** a guest is allowed to do; the host decides
//! **how** it happens:
//! - Bytes come from a [`Backing`] (a file, a slice, a container entry)
//! - Guest threads run on a [`HostThread`] created by a [`HostExecution`]
//! - Memory declarations are handed to an [`AddressSpace`]
//!
//! ## Non-Goals
//!
//! This is NOT:
//! - A CPU emulator (no instruction execution happens behind these traits)
//! - A syscall dispatcher (guest-visible results are only described, via [`ResultCode`])

pub mod backing;
pub mod error;
pub mod host;
pub mod result;
pub mod testing;

pub use backing::{Backing, BackingError, FileBacking};
pub use error::KernelError;
pub use host::{
    AddressSpace, HostExecution, HostThread, HostThreadParams, MemoryRegion, ReservationError,
    UnsupportedAddressSpace,
};
pub use result::ResultCode;
