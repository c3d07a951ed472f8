//! Capability decoding errors
//!
//! Every variant carries the index of the word that was rejected.

use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum CapabilityError {
    /// Memory mapping word without a second word to pair with
    #[error("Capability {index}: memory mapping has no size word")]
    InvalidCombination { index: usize },

    /// Second half of a memory mapping is malformed
    #[error("Capability {index}: invalid memory mapping size word 0x{word:08X}")]
    InvalidComboPair { index: usize, word: u32 },

    #[error("Capability {index}: invalid capability word 0x{word:08X}")]
    InvalidCapability { index: usize, word: u32 },

    #[error("Capability {index}: category 0x{category:X} declared more than once")]
    DuplicateCategory { index: usize, category: u32 },

    #[error("Capability {index}: syscall slot {slot} declared more than once")]
    DuplicateSyscallSlot { index: usize, slot: u32 },

    #[error("Capability {index}: range 0x{address:X}+0x{size:X} leaves the 36-bit address space")]
    InvalidAddressRange { index: usize, address: u64, size: u64 },

    #[error("Capability {index}: syscall id 0x{id:X} exceeds 0x7F")]
    SyscallIdOutOfRange { index: usize, id: u32 },

    #[error("Capability {index}: invalid core/thread range 0x{word:08X}")]
    InvalidCoreThreadRange { index: usize, word: u32 },

    #[error("Capability {index}: invalid application type 0x{word:08X}")]
    InvalidApplicationType { index: usize, word: u32 },

    #[error("Capability {index}: invalid kernel version 0x{word:08X}")]
    InvalidKernelVersion { index: usize, word: u32 },

    #[error("Capability {index}: invalid handle table size 0x{word:08X}")]
    InvalidHandleTableSize { index: usize, word: u32 },

    #[error("Capability {index}: invalid debugging flags 0x{word:08X}")]
    InvalidDebugFlags { index: usize, word: u32 },

    #[error("Capability {index}: unknown category tag 0x{tag:X}")]
    UnknownCategory { index: usize, tag: u32 },
}

impl CapabilityError {
    /// Position of the rejected word in the capability list
    pub fn index(&self) -> usize {
        match self {
            CapabilityError::InvalidCombination { index }
            | CapabilityError::InvalidComboPair { index, .. }
            | CapabilityError::InvalidCapability { index, .. }
            | CapabilityError::DuplicateCategory { index, .. }
            | CapabilityError::DuplicateSyscallSlot { index, .. }
            | CapabilityError::InvalidAddressRange { index, .. }
            | CapabilityError::SyscallIdOutOfRange { index, .. }
            | CapabilityError::InvalidCoreThreadRange { index, .. }
            | CapabilityError::InvalidApplicationType { index, .. }
            | CapabilityError::InvalidKernelVersion { index, .. }
            | CapabilityError::InvalidHandleTableSize { index, .. }
            | CapabilityError::InvalidDebugFlags { index, .. }
            | CapabilityError::UnknownCategory { index, .. } => *index,
        }
    }
}
