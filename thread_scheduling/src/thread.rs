//! Guest threads and their lifecycle.
//!
//! A [`GuestThread`] pairs the scheduling attributes of one guest thread with
//! the host context executing it. Every attribute lives behind one lock, and
//! host calls that must stay ordered with the attributes are made while
//! holding it.

use crate::affinity::{AffinityMask, AffinityOutcome, CoreRequest, PreferredCore, SchedulingState};
use crate::{PriorityRange, SchedulingError};
use core_types::{CoreId, ThreadId};
use kernel_api::{HostThread, ResultCode};
use serde::{Deserialize, Serialize};
use std::sync::{Arc, Condvar, Mutex, MutexGuard, PoisonError, TryLockError};

/// Lifecycle of a guest thread; only ever moves forward
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ThreadStatus {
    Created,
    Running,
    Dead,
}

/// Initial scheduling attributes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ThreadParams {
    /// Guest priority, 0 (highest) to 63 (lowest)
    pub priority: u8,
    pub core: CoreId,
}

impl ThreadParams {
    /// Checks the priority is on the guest scale
    pub fn validate(&self) -> Result<(), SchedulingError> {
        guest_priority(self.priority).map(|_| ())
    }
}

/// Point-in-time copy of a thread's attributes
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ThreadSnapshot {
    pub id: ThreadId,
    pub status: ThreadStatus,
    pub priority: u8,
    pub current_core: CoreId,
    pub preferred_core: PreferredCore,
    pub affinity_mask: AffinityMask,
    pub override_depth: u32,
}

#[derive(Debug)]
struct ThreadAttributes {
    status: ThreadStatus,
    scheduling: SchedulingState,
}

/// An emulated guest thread
pub struct GuestThread {
    id: ThreadId,
    host: Arc<dyn HostThread>,
    host_range: PriorityRange,
    attributes: Mutex<ThreadAttributes>,
    exited: Condvar,
}

impl std::fmt::Debug for GuestThread {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GuestThread")
            .field("id", &self.id)
            .field("host_range", &self.host_range)
            .field("attributes", &AttributesDebug(&self.attributes))
            .finish()
    }
}

/// Formats the attributes without blocking on a held lock
struct AttributesDebug<'a>(&'a Mutex<ThreadAttributes>);

impl std::fmt::Debug for AttributesDebug<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self.0.try_lock() {
            Ok(attributes) => std::fmt::Debug::fmt(&*attributes, f),
            Err(TryLockError::Poisoned(poisoned)) => {
                std::fmt::Debug::fmt(&*poisoned.into_inner(), f)
            }
            Err(TryLockError::WouldBlock) => f.write_str("<locked>"),
        }
    }
}

impl GuestThread {
    /// Creates a thread in [`ThreadStatus::Created`] and applies its initial
    /// priority to the host context.
    ///
    /// On failure the host context is asked to terminate.
    pub fn new(
        id: ThreadId,
        host: Arc<dyn HostThread>,
        host_range: PriorityRange,
        params: ThreadParams,
    ) -> Result<Self, SchedulingError> {
        let host_priority = match to_host_priority(&host_range, params.priority) {
            Ok(priority) => priority,
            Err(err) => {
                host.terminate();
                return Err(err);
            }
        };
        if let Err(err) = host.set_priority(host_priority) {
            log::debug!("{} host rejected priority {}: {}", id, host_priority, err);
            host.terminate();
            return Err(err.into());
        }

        log::trace!(
            "{} created: priority={} (host {}) core={}",
            id,
            params.priority,
            host_priority,
            params.core
        );

        Ok(Self {
            id,
            host,
            host_range,
            attributes: Mutex::new(ThreadAttributes {
                status: ThreadStatus::Created,
                scheduling: SchedulingState::new(params.priority, params.core),
            }),
            exited: Condvar::new(),
        })
    }

    pub fn id(&self) -> ThreadId {
        self.id
    }

    pub fn status(&self) -> ThreadStatus {
        self.lock().status
    }

    pub fn priority(&self) -> u8 {
        self.lock().scheduling.priority()
    }

    /// Starts host execution. Only a `Created` thread starts; for any other
    /// status this does nothing.
    pub fn start(&self) -> Result<(), SchedulingError> {
        let mut attributes = self.lock();
        if attributes.status != ThreadStatus::Created {
            return Ok(());
        }
        self.host.start()?;
        attributes.status = ThreadStatus::Running;
        log::debug!("{} running on {}", self.id, attributes.scheduling.current_core());
        Ok(())
    }

    /// Marks the thread dead, wakes waiters and asks the host to terminate.
    ///
    /// Idempotent. Does not wait for the host to stop.
    pub fn kill(&self) {
        {
            let mut attributes = self.lock();
            if attributes.status == ThreadStatus::Dead {
                return;
            }
            attributes.status = ThreadStatus::Dead;
        }
        self.exited.notify_all();
        self.host.terminate();
        log::debug!("{} killed", self.id);
    }

    /// Blocks until the thread is dead
    pub fn wait_until_dead(&self) {
        let mut attributes = self.lock();
        while attributes.status != ThreadStatus::Dead {
            attributes = self
                .exited
                .wait(attributes)
                .unwrap_or_else(PoisonError::into_inner);
        }
    }

    /// Sets the guest priority and applies its host equivalent
    pub fn update_priority(&self, priority: u8) -> Result<(), SchedulingError> {
        let host_priority = to_host_priority(&self.host_range, priority)?;
        let mut attributes = self.lock();
        self.host.set_priority(host_priority)?;
        attributes.scheduling.set_priority(priority);
        Ok(())
    }

    /// Changes preferred core and affinity, migrating the thread if its
    /// current core is no longer allowed.
    pub fn update_preferred_core_and_affinity(
        &self,
        request: CoreRequest,
        mask: AffinityMask,
    ) -> ResultCode {
        let mut attributes = self.lock();
        match attributes
            .scheduling
            .update_preferred_core_and_affinity(request, mask)
        {
            Ok(AffinityOutcome::Unchanged) => ResultCode::Success,
            Ok(AffinityOutcome::Migrated { from, to }) => {
                log::trace!("{} migrated {} -> {}", self.id, from, to);
                self.host.migrate(to);
                ResultCode::Success
            }
            Err(code) => {
                log::debug!(
                    "{} rejected affinity update {:?}/0x{:X}: {}",
                    self.id,
                    request,
                    mask.bits(),
                    code
                );
                code
            }
        }
    }

    /// Same as [`Self::update_preferred_core_and_affinity`] with the guest's
    /// raw arguments
    pub fn update_preferred_core_and_affinity_raw(&self, core: i32, mask: u64) -> ResultCode {
        match CoreRequest::from_raw(core) {
            Some(request) => self.update_preferred_core_and_affinity(request, AffinityMask::new(mask)),
            None => ResultCode::InvalidCoreId,
        }
    }

    pub fn enter_override(&self) {
        self.lock().scheduling.enter_override();
    }

    pub fn exit_override(&self) -> Result<(), SchedulingError> {
        self.lock().scheduling.exit_override()
    }

    pub fn snapshot(&self) -> ThreadSnapshot {
        let attributes = self.lock();
        let scheduling = &attributes.scheduling;
        ThreadSnapshot {
            id: self.id,
            status: attributes.status,
            priority: scheduling.priority(),
            current_core: scheduling.current_core(),
            preferred_core: scheduling.preferred_core(),
            affinity_mask: scheduling.affinity_mask(),
            override_depth: scheduling.override_depth(),
        }
    }

    fn lock(&self) -> MutexGuard<'_, ThreadAttributes> {
        self.attributes
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }
}

fn guest_priority(priority: u8) -> Result<i8, SchedulingError> {
    i8::try_from(priority)
        .ok()
        .filter(|p| PriorityRange::GUEST.contains(*p))
        .ok_or(SchedulingError::InvalidPriority { priority })
}

fn to_host_priority(host_range: &PriorityRange, priority: u8) -> Result<i8, SchedulingError> {
    Ok(host_range.rescale(&PriorityRange::GUEST, guest_priority(priority)?))
}

#[cfg(test)]
mod tests {
    use super::*;
    use kernel_api::testing::{HostEvent, RecordingHostThread};
    use std::thread;
    use std::time::Duration;

    fn core(index: u8) -> CoreId {
        CoreId::new(index).unwrap()
    }

    fn spawn_thread(priority: u8, core_index: u8) -> (Arc<RecordingHostThread>, GuestThread) {
        let host = Arc::new(RecordingHostThread::new());
        let thread = GuestThread::new(
            ThreadId::new(),
            host.clone(),
            PriorityRange::HOST,
            ThreadParams {
                priority,
                core: core(core_index),
            },
        )
        .unwrap();
        (host, thread)
    }

    #[test]
    fn test_new_applies_host_priority() {
        let (host, thread) = spawn_thread(0, 0);
        assert_eq!(host.events(), vec![HostEvent::PriorityChanged(19)]);
        assert_eq!(thread.status(), ThreadStatus::Created);
        assert_eq!(thread.priority(), 0);
    }

    #[test]
    fn test_new_rejects_invalid_priority() {
        let host = Arc::new(RecordingHostThread::new());
        let result = GuestThread::new(
            ThreadId::new(),
            host.clone(),
            PriorityRange::HOST,
            ThreadParams {
                priority: 64,
                core: core(0),
            },
        );
        assert_eq!(
            result.unwrap_err(),
            SchedulingError::InvalidPriority { priority: 64 }
        );
        assert_eq!(host.events(), vec![HostEvent::Terminated]);
    }

    #[test]
    fn test_new_terminates_host_on_rejected_priority() {
        let host = Arc::new(RecordingHostThread::rejecting_priorities());
        let result = GuestThread::new(
            ThreadId::new(),
            host.clone(),
            PriorityRange::HOST,
            ThreadParams {
                priority: 0x2C,
                core: core(0),
            },
        );
        assert!(matches!(result, Err(SchedulingError::Host(_))));
        assert_eq!(host.events(), vec![HostEvent::Terminated]);
    }

    #[test]
    fn test_debug_does_not_block_on_held_lock() {
        let (_host, thread) = spawn_thread(10, 1);
        assert!(format!("{:?}", thread).contains("priority: 10"));

        let _held = thread.lock();
        let text = format!("{:?}", thread);
        assert!(text.contains("<locked>"));
    }

    #[test]
    fn test_params_validate() {
        let mut params = ThreadParams {
            priority: 63,
            core: core(3),
        };
        assert_eq!(params.validate(), Ok(()));
        params.priority = 64;
        assert_eq!(
            params.validate(),
            Err(SchedulingError::InvalidPriority { priority: 64 })
        );
    }

    #[test]
    fn test_start_once() {
        let (host, thread) = spawn_thread(44, 0);
        thread.start().unwrap();
        thread.start().unwrap();
        assert_eq!(thread.status(), ThreadStatus::Running);
        let starts = host
            .events()
            .into_iter()
            .filter(|e| *e == HostEvent::Started)
            .count();
        assert_eq!(starts, 1);
    }

    #[test]
    fn test_kill_idempotent_and_final() {
        let (host, thread) = spawn_thread(44, 0);
        thread.start().unwrap();
        thread.kill();
        thread.kill();
        assert_eq!(thread.status(), ThreadStatus::Dead);

        // A dead thread never comes back
        thread.start().unwrap();
        assert_eq!(thread.status(), ThreadStatus::Dead);

        let terminations = host
            .events()
            .into_iter()
            .filter(|e| *e == HostEvent::Terminated)
            .count();
        assert_eq!(terminations, 1);
    }

    #[test]
    fn test_update_priority() {
        let (host, thread) = spawn_thread(44, 0);
        thread.update_priority(63).unwrap();
        assert_eq!(thread.priority(), 63);
        assert_eq!(host.events().last(), Some(&HostEvent::PriorityChanged(-8)));

        assert_eq!(
            thread.update_priority(200),
            Err(SchedulingError::InvalidPriority { priority: 200 })
        );
        assert_eq!(thread.priority(), 63);
    }

    #[test]
    fn test_new_fails_when_host_rejects_priority() {
        let rejecting = Arc::new(RecordingHostThread::rejecting_priorities());
        let result = GuestThread::new(
            ThreadId::new(),
            rejecting,
            PriorityRange::HOST,
            ThreadParams {
                priority: 10,
                core: core(0),
            },
        );
        assert!(matches!(result, Err(SchedulingError::Host(_))));
    }

    #[test]
    fn test_affinity_update_notifies_migration() {
        let (host, thread) = spawn_thread(44, 0);
        assert_eq!(
            thread.update_preferred_core_and_affinity(CoreRequest::NoPreference, AffinityMask::new(0b1100)),
            ResultCode::Success
        );
        assert_eq!(host.events().last(), Some(&HostEvent::Migrated(core(3))));
        assert_eq!(thread.snapshot().current_core, core(3));
    }

    #[test]
    fn test_affinity_update_raw_arguments() {
        let (host, thread) = spawn_thread(44, 1);
        assert_eq!(
            thread.update_preferred_core_and_affinity_raw(-3, 0b0100),
            ResultCode::InvalidCombination
        );
        assert_eq!(
            thread.update_preferred_core_and_affinity_raw(7, 0b0100),
            ResultCode::InvalidCoreId
        );
        assert_eq!(
            thread.update_preferred_core_and_affinity_raw(-3, 0b0011),
            ResultCode::Success
        );
        assert!(!host
            .events()
            .iter()
            .any(|e| matches!(e, HostEvent::Migrated(_))));
        let snapshot = thread.snapshot();
        assert_eq!(snapshot.current_core, core(1));
        assert_eq!(snapshot.affinity_mask.bits(), 0b0011);
    }

    #[test]
    fn test_override_scope() {
        let (host, thread) = spawn_thread(44, 0);
        assert_eq!(thread.exit_override(), Err(SchedulingError::OverrideUnderflow));

        thread.enter_override();
        assert_eq!(
            thread.update_preferred_core_and_affinity(CoreRequest::Core(core(2)), AffinityMask::new(0b0100)),
            ResultCode::Success
        );
        let snapshot = thread.snapshot();
        assert_eq!(snapshot.override_depth, 1);
        assert_eq!(snapshot.affinity_mask.bits(), 0b0001);
        assert_eq!(snapshot.current_core, core(0));
        assert!(!host
            .events()
            .iter()
            .any(|e| matches!(e, HostEvent::Migrated(_))));

        assert_eq!(thread.exit_override(), Ok(()));
        assert_eq!(thread.snapshot().override_depth, 0);
    }

    #[test]
    fn test_wait_until_dead_wakes_on_kill() {
        let (_, thread) = spawn_thread(44, 0);
        let thread = Arc::new(thread);
        thread.start().unwrap();

        let waiter = {
            let thread = Arc::clone(&thread);
            thread::spawn(move || {
                thread.wait_until_dead();
                thread.status()
            })
        };

        thread::sleep(Duration::from_millis(10));
        thread.kill();
        assert_eq!(waiter.join().unwrap(), ThreadStatus::Dead);
    }

    #[test]
    fn test_concurrent_updates_keep_core_in_mask() {
        let (_, thread) = spawn_thread(44, 0);
        let thread = Arc::new(thread);

        let workers: Vec<_> = (0..4u8)
            .map(|i| {
                let thread = Arc::clone(&thread);
                thread::spawn(move || {
                    for round in 0..200u32 {
                        let mask = AffinityMask::new(1 << ((i as u32 + round) % 4));
                        thread.update_preferred_core_and_affinity(CoreRequest::NoPreference, mask);
                        thread.update_priority((round % 64) as u8).unwrap();
                        let snapshot = thread.snapshot();
                        assert!(snapshot.affinity_mask.contains(snapshot.current_core));
                    }
                })
            })
            .collect();

        for worker in workers {
            worker.join().unwrap();
        }
        let snapshot = thread.snapshot();
        assert!(snapshot.affinity_mask.contains(snapshot.current_core));
    }

    #[test]
    fn test_snapshot_serializes() {
        let (_, thread) = spawn_thread(12, 2);
        let json = serde_json::to_string(&thread.snapshot()).unwrap();
        let back: ThreadSnapshot = serde_json::from_str(&json).unwrap();
        assert_eq!(back, thread.snapshot());
    }
}
