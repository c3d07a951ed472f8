//! Structured program metadata

use core_types::TitleId;
use serde::{Deserialize, Serialize};

/// Main thread stack size used for homebrew (1 MiB)
pub const HOMEBREW_STACK_SIZE: u32 = 0x0010_0000;

/// System resource budget used for homebrew
pub const HOMEBREW_SYSTEM_RESOURCE_SIZE: u32 = 0xF800_0000;

/// Main thread priority used for homebrew
pub const HOMEBREW_PRIORITY: u8 = 0x2C;

/// What the signed `ACID` header allows
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccessControlSummary {
    pub flags: u32,
    pub title_id_min: TitleId,
    pub title_id_max: TitleId,
}

/// Everything the HLE kernel needs from a program descriptor
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProgramMetadata {
    pub name: String,
    /// Guest priority (0 highest, 63 lowest) of the main thread
    pub main_thread_priority: u8,
    /// Core the main thread starts on
    pub main_thread_core: u8,
    pub main_thread_stack_size: u32,
    pub system_resource_size: u32,
    pub title_id: TitleId,
    /// `None` when the program shipped no descriptor
    pub access_control: Option<AccessControlSummary>,
    /// Raw kernel capability words in file order
    pub capabilities: Vec<u32>,
}

impl ProgramMetadata {
    /// Metadata for executables that ship no descriptor
    pub fn homebrew() -> Self {
        Self {
            name: String::new(),
            main_thread_priority: HOMEBREW_PRIORITY,
            main_thread_core: 0,
            main_thread_stack_size: HOMEBREW_STACK_SIZE,
            system_resource_size: HOMEBREW_SYSTEM_RESOURCE_SIZE,
            title_id: TitleId::default(),
            access_control: None,
            capabilities: Vec::new(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_homebrew_defaults() {
        let meta = ProgramMetadata::homebrew();
        assert_eq!(meta.main_thread_priority, 44);
        assert_eq!(meta.main_thread_core, 0);
        assert_eq!(meta.main_thread_stack_size, 0x0010_0000);
        assert_eq!(meta.system_resource_size, 0xF800_0000);
        assert!(meta.capabilities.is_empty());
        assert!(meta.access_control.is_none());
    }

    #[test]
    fn test_metadata_serde_roundtrip() {
        let mut meta = ProgramMetadata::homebrew();
        meta.capabilities = vec![0x7, 0xFFFF_FFFF];
        let json = serde_json::to_string(&meta).unwrap();
        let back: ProgramMetadata = serde_json::from_str(&json).unwrap();
        assert_eq!(back, meta);
    }
}
