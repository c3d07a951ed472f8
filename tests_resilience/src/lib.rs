//! Resilience Test Utilities
//!
//! This crate provides shared utilities for the cross-crate integration tests.
//!
//! ## Test Philosophy
//!
//! - **Untrusted input**: Descriptor bytes come from guest binaries; any
//!   corruption must end in an error, never a panic or half-built process
//! - **End to end**: Tests go through [`HleKernel`] with recording host
//!   collaborators rather than calling decoders directly
//! - **Concurrency**: Guest threads are shared; their attribute invariants must
//!   hold under concurrent updates

use core_types::ProcessId;
use kernel_api::testing::{RecordingAddressSpace, RecordingExecution};
use kernel_api::Backing;
use sim_kernel::{HleError, HleKernel, KernelConfig, ThreadEntry};

/// Default guest entry point used by the helpers
pub const TEST_ENTRY_POINT: u64 = 0x0800_0000;

/// Kernel plus recording host side
pub struct TestSystem {
    pub kernel: HleKernel,
    pub execution: RecordingExecution,
    pub address_space: RecordingAddressSpace,
}

impl TestSystem {
    /// Creates a process from descriptor bytes
    pub fn boot(&mut self, descriptor: &dyn Backing) -> Result<ProcessId, HleError> {
        self.kernel.create_process(
            Some(descriptor),
            ThreadEntry::new(TEST_ENTRY_POINT),
            &self.execution,
            &mut self.address_space,
        )
    }

    /// Creates a homebrew process
    pub fn boot_homebrew(&mut self) -> Result<ProcessId, HleError> {
        self.kernel.create_process(
            None,
            ThreadEntry::new(TEST_ENTRY_POINT),
            &self.execution,
            &mut self.address_space,
        )
    }
}

/// Bootstrap helper for tests
///
/// Creates a kernel with default configuration and empty recorders.
pub fn test_bootstrap() -> TestSystem {
    test_bootstrap_with(KernelConfig::default())
}

pub fn test_bootstrap_with(config: KernelConfig) -> TestSystem {
    TestSystem {
        kernel: HleKernel::new(config),
        execution: RecordingExecution::new(),
        address_space: RecordingAddressSpace::new(),
    }
}

/// Encoders for kernel capability words
pub mod words {
    pub const END_OF_LIST: u32 = 0xFFFF_FFFF;

    pub fn core_thread(low_core: u32, high_core: u32, low_priority: u32, high_priority: u32) -> u32 {
        (high_core << 24) | (low_core << 16) | (low_priority << 10) | (high_priority << 4) | 0x7
    }

    pub fn syscalls(slot: u32, mask: u32) -> u32 {
        (slot << 29) | ((mask & 0xFF_FFFF) << 5) | 0xF
    }

    pub fn memory_map(address: u64, size: u64) -> [u32; 2] {
        [((address >> 5) as u32) | 0x3F, ((size >> 5) as u32) | 0x3F]
    }

    pub fn io_page(address: u64) -> u32 {
        ((address >> 4) as u32) | 0x7F
    }

    pub fn interrupts(first: u32, second: u32) -> u32 {
        (second << 22) | (first << 12) | 0x7FF
    }

    pub fn application_type(kind: u32) -> u32 {
        (kind << 14) | 0x1FFF
    }

    pub fn kernel_version(major: u32, minor: u32) -> u32 {
        (major << 19) | (minor << 15) | 0x3FFF
    }

    pub fn handle_table_size(size: u32) -> u32 {
        (size << 16) | 0x7FFF
    }
}
