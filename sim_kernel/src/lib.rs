//! # Simulated Kernel
//!
//! The HLE kernel facade: turns a program descriptor into a guest process
//! with a decoded capability set and a main thread ready to start.
//!
//! ## Philosophy
//!
//! - **Validate, then commit**: Descriptor parsing and capability decoding
//!   both finish before the kernel touches the host or its own tables. A
//!   malformed descriptor leaves no trace.
//! - **Host is injected**: Threads come from a [`HostExecution`], memory from an
//!   [`AddressSpace`]. Tests plug in the recorders from
//!   [`kernel_api::testing`].
//! - **Nothing is silently dropped**: Declared ranges the address space cannot
//!   map yet stay on the process as `pending_mappings`.
//!
//! ## Process creation
//!
//! ```text
//! backing ─▶ program_metadata::load ─▶ process_capabilities::decode
//!                                            │
//!                      AddressSpace::reserve ◀┘
//!                                            │
//!                 HostExecution::spawn ─▶ GuestThread (main)
//! ```

pub mod config;
pub mod error;
pub mod process;

pub use config::KernelConfig;
pub use error::HleError;
pub use process::{GuestProcess, ProcessStatus};

use core_types::{CoreId, ProcessId, ThreadId};
use kernel_api::{
    AddressSpace, Backing, HostExecution, HostThreadParams, MemoryRegion, ReservationError,
};
use process_capabilities::ProcessCapabilitySet;
use program_metadata::ProgramMetadata;
use std::collections::HashMap;
use std::sync::Arc;
use thread_scheduling::{GuestThread, ThreadParams};

/// Where a new guest thread begins executing
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ThreadEntry {
    pub entry_point: u64,
    pub entry_arg: u64,
}

impl ThreadEntry {
    pub fn new(entry_point: u64) -> Self {
        Self {
            entry_point,
            entry_arg: 0,
        }
    }
}

#[derive(Debug)]
struct ThreadInfo {
    process: ProcessId,
    thread: Arc<GuestThread>,
}

/// HLE kernel state
///
/// Owns the process and thread tables; everything host-side is borrowed per
/// call.
#[derive(Debug, Default)]
pub struct HleKernel {
    config: KernelConfig,
    processes: HashMap<ProcessId, GuestProcess>,
    threads: HashMap<ThreadId, ThreadInfo>,
}

impl HleKernel {
    pub fn new(config: KernelConfig) -> Self {
        Self {
            config,
            processes: HashMap::new(),
            threads: HashMap::new(),
        }
    }

    pub fn config(&self) -> &KernelConfig {
        &self.config
    }

    /// Creates a process from its program descriptor.
    ///
    /// Without a descriptor the process gets homebrew defaults and an empty
    /// capability set.
    pub fn create_process(
        &mut self,
        descriptor: Option<&dyn Backing>,
        entry: ThreadEntry,
        execution: &dyn HostExecution,
        address_space: &mut dyn AddressSpace,
    ) -> Result<ProcessId, HleError> {
        let metadata = match descriptor {
            Some(backing) => program_metadata::load_with(backing, &self.config.load_options())?,
            None => ProgramMetadata::homebrew(),
        };
        let capabilities = Arc::new(process_capabilities::decode(&metadata.capabilities)?);
        let core = CoreId::new(metadata.main_thread_core).ok_or(HleError::InvalidMainThreadCore {
            core: metadata.main_thread_core,
        })?;
        let params = ThreadParams {
            priority: metadata.main_thread_priority,
            core,
        };
        params.validate()?;

        let (reserved, pending_mappings) = reserve_declared(&capabilities, address_space)?;

        let id = ProcessId::new();
        let main_thread = match self.spawn_thread(
            id,
            entry,
            params,
            metadata.main_thread_stack_size,
            execution,
        ) {
            Ok(thread_id) => thread_id,
            Err(err) => {
                release_all(&reserved, address_space);
                return Err(err);
            }
        };

        log::debug!(
            "{} created: title={} name='{}' main={} caps={} pending={}",
            id,
            metadata.title_id,
            metadata.name,
            main_thread,
            metadata.capabilities.len(),
            pending_mappings.len()
        );

        self.processes.insert(
            id,
            GuestProcess {
                id,
                title_id: metadata.title_id,
                name: metadata.name.clone(),
                metadata,
                capabilities,
                status: ProcessStatus::Created,
                main_thread,
                threads: vec![main_thread],
                pending_mappings,
            },
        );
        Ok(id)
    }

    /// Creates an additional thread in an existing process.
    ///
    /// The priority and core must be allowed by the process's capabilities.
    pub fn create_thread(
        &mut self,
        process_id: ProcessId,
        entry: ThreadEntry,
        params: ThreadParams,
        stack_size: u32,
        execution: &dyn HostExecution,
    ) -> Result<ThreadId, HleError> {
        let process = self
            .processes
            .get(&process_id)
            .ok_or(HleError::ProcessNotFound(process_id))?;
        if !process.capabilities.is_priority_permitted(params.priority) {
            return Err(HleError::PriorityNotPermitted {
                process: process_id,
                priority: params.priority,
            });
        }
        if !process.capabilities.is_core_permitted(params.core.index()) {
            return Err(HleError::CoreNotPermitted {
                process: process_id,
                core: params.core.index(),
            });
        }

        let thread_id = self.spawn_thread(process_id, entry, params, stack_size, execution)?;
        if let Some(process) = self.processes.get_mut(&process_id) {
            process.threads.push(thread_id);
        }
        Ok(thread_id)
    }

    /// Starts a thread; starting the main thread marks its process started
    pub fn start_thread(&mut self, thread_id: ThreadId) -> Result<(), HleError> {
        let info = self
            .threads
            .get(&thread_id)
            .ok_or(HleError::ThreadNotFound(thread_id))?;
        info.thread.start()?;

        if let Some(process) = self.processes.get_mut(&info.process) {
            if process.is_main_thread(thread_id) {
                process.status = ProcessStatus::Started;
            }
        }
        Ok(())
    }

    /// Kills every thread of a process and forgets it
    pub fn terminate_process(&mut self, process_id: ProcessId) -> Result<(), HleError> {
        let process = self
            .processes
            .remove(&process_id)
            .ok_or(HleError::ProcessNotFound(process_id))?;
        for thread_id in &process.threads {
            if let Some(info) = self.threads.remove(thread_id) {
                info.thread.kill();
            }
        }
        log::debug!("{} terminated", process_id);
        Ok(())
    }

    pub fn process(&self, process_id: ProcessId) -> Option<&GuestProcess> {
        self.processes.get(&process_id)
    }

    pub fn capabilities(&self, process_id: ProcessId) -> Option<Arc<ProcessCapabilitySet>> {
        self.processes
            .get(&process_id)
            .map(|p| Arc::clone(&p.capabilities))
    }

    pub fn thread(&self, thread_id: ThreadId) -> Option<Arc<GuestThread>> {
        self.threads
            .get(&thread_id)
            .map(|info| Arc::clone(&info.thread))
    }

    pub fn process_count(&self) -> usize {
        self.processes.len()
    }

    pub fn thread_count(&self) -> usize {
        self.threads.len()
    }

    fn spawn_thread(
        &mut self,
        process: ProcessId,
        entry: ThreadEntry,
        params: ThreadParams,
        stack_size: u32,
        execution: &dyn HostExecution,
    ) -> Result<ThreadId, HleError> {
        let thread_id = ThreadId::new();
        let host = execution.spawn(
            thread_id,
            &HostThreadParams {
                entry_point: entry.entry_point,
                entry_arg: entry.entry_arg,
                stack_size,
                core: params.core,
            },
        )?;
        let thread = GuestThread::new(thread_id, host, self.config.host_priority, params)?;
        self.threads.insert(
            thread_id,
            ThreadInfo {
                process,
                thread: Arc::new(thread),
            },
        );
        Ok(thread_id)
    }
}

/// Hands every declared region to the address space.
///
/// Returns the regions it took and the ones it cannot map yet. If any region
/// fails, the ones already taken are released before the error is returned.
fn reserve_declared(
    capabilities: &ProcessCapabilitySet,
    address_space: &mut dyn AddressSpace,
) -> Result<(Vec<MemoryRegion>, Vec<MemoryRegion>), ReservationError> {
    let mut reserved = Vec::new();
    let mut pending = Vec::new();
    for region in process::declared_regions(capabilities) {
        match address_space.reserve(region) {
            Ok(()) => reserved.push(region),
            Err(ReservationError::Unsupported) => {
                log::warn!(
                    "region 0x{:X}+0x{:X} not mapped: address space has no reservation support",
                    region.address,
                    region.size
                );
                pending.push(region);
            }
            Err(err) => {
                release_all(&reserved, address_space);
                return Err(err);
            }
        }
    }
    Ok((reserved, pending))
}

fn release_all(regions: &[MemoryRegion], address_space: &mut dyn AddressSpace) {
    for region in regions.iter().rev() {
        address_space.release(*region);
    }
}
