//! The decoded, immutable capability set of a guest process.

use serde::{Deserialize, Serialize};

/// Highest syscall id a capability list can permit
pub const MAX_SYSCALL_ID: u32 = 0x7F;

/// Highest interrupt id a capability list can permit
pub const MAX_INTERRUPT_ID: u32 = 0x3FF;

bitflags::bitflags! {
    /// Debugging privileges of a process.
    ///
    /// Decoding reads these from bits 19 and 20 of the capability word, which
    /// the same word must leave clear, so a decoded set never carries any.
    /// Whether the descriptor format actually places them at bits 17..=18 is
    /// still open.
    #[derive(Default, Serialize, Deserialize)]
    pub struct DebugFlags: u32 {
        /// A debugger may attach to the process
        const ALLOW_DEBUG = 1 << 0;
        /// The process starts suspended for a debugger
        const FORCE_DEBUG = 1 << 1;
    }
}

/// One permission bit per syscall id 0..=127
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SyscallMask(u128);

impl SyscallMask {
    pub fn is_set(&self, id: u32) -> bool {
        id <= MAX_SYSCALL_ID && (self.0 >> id) & 1 == 1
    }

    pub(crate) fn set(&mut self, id: u32) {
        debug_assert!(id <= MAX_SYSCALL_ID);
        self.0 |= 1u128 << id;
    }

    pub fn ids(&self) -> impl Iterator<Item = u32> + '_ {
        (0..=MAX_SYSCALL_ID).filter(move |id| self.is_set(*id))
    }

    pub fn is_empty(&self) -> bool {
        self.0 == 0
    }
}

/// One validity bit per interrupt id 0..=1023
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct InterruptMask([u64; 16]);

impl InterruptMask {
    pub fn is_set(&self, id: u32) -> bool {
        id <= MAX_INTERRUPT_ID && (self.0[(id / 64) as usize] >> (id % 64)) & 1 == 1
    }

    pub(crate) fn set(&mut self, id: u32) {
        debug_assert!(id <= MAX_INTERRUPT_ID);
        self.0[(id / 64) as usize] |= 1u64 << (id % 64);
    }

    pub fn ids(&self) -> impl Iterator<Item = u32> + '_ {
        (0..=MAX_INTERRUPT_ID).filter(move |id| self.is_set(*id))
    }

    pub fn is_empty(&self) -> bool {
        self.0.iter().all(|w| *w == 0)
    }
}

/// Address/size pair declared by a two-word memory capability
///
/// Validated to lie inside the 36-bit guest physical address space. Mapping
/// it is the address-space manager's job.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct MemoryMapping {
    pub address: u64,
    pub size: u64,
}

/// Single I/O page declared by an I/O memory capability
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct IoMapping {
    pub address: u64,
}

/// Privileges of a guest process
///
/// Built once by [`crate::decode`] and read-only afterwards; share it behind
/// an `Arc` for concurrent permission checks.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProcessCapabilitySet {
    pub(crate) syscalls: SyscallMask,
    pub(crate) interrupts: InterruptMask,
    pub(crate) core_mask: u64,
    pub(crate) thread_priority_mask: u64,
    pub(crate) debug_flags: DebugFlags,
    pub(crate) handle_table_size: u32,
    pub(crate) kernel_version: u32,
    pub(crate) application_type: u32,
    pub(crate) memory_mappings: Vec<MemoryMapping>,
    pub(crate) io_mappings: Vec<IoMapping>,
}

impl ProcessCapabilitySet {
    pub fn syscalls(&self) -> &SyscallMask {
        &self.syscalls
    }

    pub fn is_syscall_permitted(&self, id: u32) -> bool {
        self.syscalls.is_set(id)
    }

    pub fn permitted_syscalls(&self) -> impl Iterator<Item = u32> + '_ {
        self.syscalls.ids()
    }

    pub fn interrupts(&self) -> &InterruptMask {
        &self.interrupts
    }

    pub fn is_interrupt_permitted(&self, id: u32) -> bool {
        self.interrupts.is_set(id)
    }

    /// Bit per core the process may run threads on
    pub fn core_mask(&self) -> u64 {
        self.core_mask
    }

    pub fn is_core_permitted(&self, core: u8) -> bool {
        core < 64 && (self.core_mask >> core) & 1 == 1
    }

    /// Bit per guest priority the process may give its threads
    pub fn thread_priority_mask(&self) -> u64 {
        self.thread_priority_mask
    }

    pub fn is_priority_permitted(&self, priority: u8) -> bool {
        priority < 64 && (self.thread_priority_mask >> priority) & 1 == 1
    }

    pub fn debug_flags(&self) -> DebugFlags {
        self.debug_flags
    }

    pub fn handle_table_size(&self) -> u32 {
        self.handle_table_size
    }

    /// Raw minimum kernel version word, zero when undeclared
    pub fn kernel_version(&self) -> u32 {
        self.kernel_version
    }

    pub fn application_type(&self) -> u32 {
        self.application_type
    }

    pub fn memory_mappings(&self) -> &[MemoryMapping] {
        &self.memory_mappings
    }

    pub fn io_mappings(&self) -> &[IoMapping] {
        &self.io_mappings
    }
}
