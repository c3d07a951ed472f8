//! Capability word classification.

use serde::{Deserialize, Serialize};

/// Categories that may appear at most once per capability list.
///
/// Core/thread range, application type, kernel version, handle table size
/// and debugging flags.
pub const SINGLE_INSTANCE_CATEGORIES: u32 = 0x1_E008;

/// One 32-bit entry of a capability list
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CapabilityWord(pub u32);

/// What a capability word declares, selected by its tag
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CapabilityKind {
    /// All 32 bits set; stops decoding
    EndOfList,
    /// Lowest bit clear; never valid
    Invalid,
    CoreThreadRange,
    SyscallMask,
    /// First or second half of a two-word address/size pair
    MemoryMap,
    IoMemoryMap,
    InterruptPair,
    ApplicationType,
    KernelVersion,
    HandleTableSize,
    DebugFlags,
    Unknown(u32),
}

impl CapabilityWord {
    pub fn raw(&self) -> u32 {
        self.0
    }

    /// Isolates the lowest clear bit of the word.
    ///
    /// A word of all ones has no clear bit and yields zero.
    pub fn tag(&self) -> u32 {
        self.0.wrapping_add(1) & !self.0
    }

    /// Bit used to track which categories a list has already declared
    pub fn category_bit(&self) -> u32 {
        let tag = self.tag();
        if tag == 0 {
            return 0;
        }
        1 << (31 - tag.wrapping_add(1).leading_zeros())
    }

    pub fn kind(&self) -> CapabilityKind {
        match self.tag() {
            0 => CapabilityKind::EndOfList,
            0x1 => CapabilityKind::Invalid,
            0x8 => CapabilityKind::CoreThreadRange,
            0x10 => CapabilityKind::SyscallMask,
            0x40 => CapabilityKind::MemoryMap,
            0x80 => CapabilityKind::IoMemoryMap,
            0x800 => CapabilityKind::InterruptPair,
            0x2000 => CapabilityKind::ApplicationType,
            0x4000 => CapabilityKind::KernelVersion,
            0x8000 => CapabilityKind::HandleTableSize,
            0x1_0000 => CapabilityKind::DebugFlags,
            other => CapabilityKind::Unknown(other),
        }
    }
}
