//! Guest process records.

use core_types::{ProcessId, ThreadId, TitleId};
use kernel_api::MemoryRegion;
use process_capabilities::ProcessCapabilitySet;
use program_metadata::ProgramMetadata;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Size of the page an I/O capability grants
pub const IO_PAGE_SIZE: u64 = 0x1000;

/// Process lifecycle
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ProcessStatus {
    /// Capabilities applied and main thread created, nothing running yet
    Created,
    /// The main thread has been started
    Started,
}

/// A guest process as the kernel tracks it
#[derive(Debug, Clone)]
pub struct GuestProcess {
    pub id: ProcessId,
    pub title_id: TitleId,
    pub name: String,
    pub metadata: ProgramMetadata,
    pub capabilities: Arc<ProcessCapabilitySet>,
    pub status: ProcessStatus,
    pub main_thread: ThreadId,
    /// All threads, main thread first
    pub threads: Vec<ThreadId>,
    /// Declared ranges the address space could not map yet
    pub pending_mappings: Vec<MemoryRegion>,
}

impl GuestProcess {
    pub fn is_main_thread(&self, thread_id: ThreadId) -> bool {
        self.main_thread == thread_id
    }
}

/// Every region a capability set asks to have mapped, in declaration order
pub fn declared_regions(capabilities: &ProcessCapabilitySet) -> Vec<MemoryRegion> {
    capabilities
        .memory_mappings()
        .iter()
        .map(|m| MemoryRegion::new(m.address, m.size))
        .chain(
            capabilities
                .io_mappings()
                .iter()
                .map(|io| MemoryRegion::new(io.address, IO_PAGE_SIZE)),
        )
        .collect()
}
