//! Unique identifiers for emulated kernel objects

use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// Unique identifier for a guest process
///
/// Every program descriptor loaded by the HLE kernel becomes exactly one
/// process; the id is host-side bookkeeping and never visible to the guest.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ProcessId(Uuid);

impl ProcessId {
    /// Creates a new random process ID
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Creates a process ID from a UUID
    pub fn from_uuid(uuid: Uuid) -> Self {
        Self(uuid)
    }

    /// Returns the inner UUID
    pub fn as_uuid(&self) -> Uuid {
        self.0
    }
}

impl Default for ProcessId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for ProcessId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Process({})", self.0)
    }
}

/// Unique identifier for a guest thread
///
/// Threads are the unit the scheduler places onto host execution contexts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ThreadId(Uuid);

impl ThreadId {
    /// Creates a new random thread ID
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Creates a thread ID from a UUID
    pub fn from_uuid(uuid: Uuid) -> Self {
        Self(uuid)
    }

    /// Returns the inner UUID
    pub fn as_uuid(&self) -> Uuid {
        self.0
    }
}

impl Default for ThreadId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for ThreadId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Thread({})", self.0)
    }
}

/// Program id declared by a guest executable
///
/// Unlike the other ids this one comes from the guest binary itself.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize)]
pub struct TitleId(pub u64);

impl TitleId {
    pub fn new(raw: u64) -> Self {
        Self(raw)
    }

    pub fn as_u64(&self) -> u64 {
        self.0
    }
}

impl fmt::Display for TitleId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:016X}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_process_id_creation() {
        let id1 = ProcessId::new();
        let id2 = ProcessId::new();
        assert_ne!(id1, id2);
    }

    #[test]
    fn test_process_id_from_uuid() {
        let uuid = Uuid::new_v4();
        let id = ProcessId::from_uuid(uuid);
        assert_eq!(id.as_uuid(), uuid);
    }

    #[test]
    fn test_thread_id_creation() {
        let id1 = ThreadId::new();
        let id2 = ThreadId::new();
        assert_ne!(id1, id2);
    }

    #[test]
    fn test_thread_id_display() {
        let id = ThreadId::new();
        let display = format!("{}", id);
        assert!(display.starts_with("Thread("));
    }

    #[test]
    fn test_title_id_display_is_zero_padded_hex() {
        let id = TitleId::new(0x0100_0000_0000_1000);
        assert_eq!(format!("{}", id), "0100000000001000");
        assert_eq!(format!("{}", TitleId::default()), "0000000000000000");
    }

    #[test]
    fn test_title_id_serde() {
        let id = TitleId::new(0x0100_ABCD_0000_0000);
        let json = serde_json::to_string(&id).unwrap();
        let back: TitleId = serde_json::from_str(&json).unwrap();
        assert_eq!(back, id);
    }
}
