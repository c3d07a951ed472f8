//! In-process collaborators for tests and tools
//!
//! These record every call instead of touching real host threads or memory,
//! so tests can assert on exactly what the kernel asked the host to do.

use crate::{
    AddressSpace, HostExecution, HostThread, HostThreadParams, KernelError, MemoryRegion,
    ReservationError,
};
use core_types::{CoreId, ThreadId};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};

/// A call made against a [`RecordingHostThread`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HostEvent {
    Started,
    PriorityChanged(i8),
    Terminated,
    Migrated(CoreId),
}

/// Host thread that records calls
#[derive(Debug, Default)]
pub struct RecordingHostThread {
    events: Mutex<Vec<HostEvent>>,
    reject_priorities: bool,
}

impl RecordingHostThread {
    pub fn new() -> Self {
        Self::default()
    }

    /// Host thread whose scheduler refuses every priority change
    pub fn rejecting_priorities() -> Self {
        Self {
            events: Mutex::new(Vec::new()),
            reject_priorities: true,
        }
    }

    pub fn events(&self) -> Vec<HostEvent> {
        self.events.lock().map(|e| e.clone()).unwrap_or_default()
    }

    fn record(&self, event: HostEvent) {
        if let Ok(mut events) = self.events.lock() {
            events.push(event);
        }
    }
}

impl HostThread for RecordingHostThread {
    fn start(&self) -> Result<(), KernelError> {
        self.record(HostEvent::Started);
        Ok(())
    }

    fn set_priority(&self, host_priority: i8) -> Result<(), KernelError> {
        if self.reject_priorities {
            return Err(KernelError::PriorityRejected {
                priority: host_priority,
                reason: "rejected by test host".to_string(),
            });
        }
        self.record(HostEvent::PriorityChanged(host_priority));
        Ok(())
    }

    fn terminate(&self) {
        self.record(HostEvent::Terminated);
    }

    fn migrate(&self, core: CoreId) {
        self.record(HostEvent::Migrated(core));
    }
}

/// Execution factory handing out [`RecordingHostThread`]s
#[derive(Debug, Default)]
pub struct RecordingExecution {
    spawned: Mutex<HashMap<ThreadId, (HostThreadParams, Arc<RecordingHostThread>)>>,
    reject_priorities: bool,
}

impl RecordingExecution {
    pub fn new() -> Self {
        Self::default()
    }

    /// Execution whose threads all refuse priority changes
    pub fn rejecting_priorities() -> Self {
        Self {
            spawned: Mutex::new(HashMap::new()),
            reject_priorities: true,
        }
    }

    pub fn thread(&self, thread_id: ThreadId) -> Option<Arc<RecordingHostThread>> {
        self.spawned
            .lock()
            .ok()
            .and_then(|s| s.get(&thread_id).map(|(_, t)| Arc::clone(t)))
    }

    pub fn params(&self, thread_id: ThreadId) -> Option<HostThreadParams> {
        self.spawned
            .lock()
            .ok()
            .and_then(|s| s.get(&thread_id).map(|(p, _)| *p))
    }

    pub fn spawned_ids(&self) -> Vec<ThreadId> {
        self.spawned
            .lock()
            .map(|s| s.keys().copied().collect())
            .unwrap_or_default()
    }

    pub fn spawn_count(&self) -> usize {
        self.spawned.lock().map(|s| s.len()).unwrap_or(0)
    }
}

impl HostExecution for RecordingExecution {
    fn spawn(
        &self,
        thread_id: ThreadId,
        params: &HostThreadParams,
    ) -> Result<Arc<dyn HostThread>, KernelError> {
        let thread = Arc::new(if self.reject_priorities {
            RecordingHostThread::rejecting_priorities()
        } else {
            RecordingHostThread::new()
        });
        let mut spawned = self
            .spawned
            .lock()
            .map_err(|_| KernelError::SpawnFailed("execution lock poisoned".to_string()))?;
        spawned.insert(thread_id, (*params, Arc::clone(&thread)));
        Ok(thread)
    }
}

/// Address space that accepts non-overlapping reservations and keeps them
#[derive(Debug, Default)]
pub struct RecordingAddressSpace {
    reserved: Vec<MemoryRegion>,
}

impl RecordingAddressSpace {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn reserved(&self) -> &[MemoryRegion] {
        &self.reserved
    }
}

impl AddressSpace for RecordingAddressSpace {
    fn reserve(&mut self, region: MemoryRegion) -> Result<(), ReservationError> {
        if self.reserved.iter().any(|r| r.overlaps(&region)) {
            return Err(ReservationError::Overlap {
                address: region.address,
                size: region.size,
            });
        }
        self.reserved.push(region);
        Ok(())
    }

    fn release(&mut self, region: MemoryRegion) {
        if let Some(pos) = self.reserved.iter().position(|r| *r == region) {
            self.reserved.remove(pos);
        }
    }
}
