//! NPDM image construction for tests and tools.
//!
//! Produces the smallest well-formed layout: `META`, then `ACID`, then
//! `ACI0` immediately followed by its capability list.

use crate::layout::{
    aci0, acid, meta, ACI0_HEADER_SIZE, ACI0_MAGIC, ACID_HEADER_SIZE, ACID_MAGIC,
    META_HEADER_SIZE, META_MAGIC,
};
use crate::metadata::{HOMEBREW_PRIORITY, HOMEBREW_STACK_SIZE};

/// Builder for NPDM images
#[derive(Debug, Clone)]
pub struct NpdmBuilder {
    name: String,
    priority: u8,
    core: u8,
    stack_size: u32,
    system_resource_size: u32,
    title_id: u64,
    acid_flags: u32,
    capabilities: Vec<u32>,
}

impl Default for NpdmBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl NpdmBuilder {
    pub const ACID_OFFSET: u32 = META_HEADER_SIZE as u32;
    pub const ACI_OFFSET: u32 = Self::ACID_OFFSET + ACID_HEADER_SIZE as u32;

    pub fn new() -> Self {
        Self {
            name: String::new(),
            priority: HOMEBREW_PRIORITY,
            core: 0,
            stack_size: HOMEBREW_STACK_SIZE,
            system_resource_size: 0,
            title_id: 0,
            acid_flags: 0,
            capabilities: Vec::new(),
        }
    }

    /// Program name; truncated to the 16 bytes the header holds
    pub fn name(mut self, name: &str) -> Self {
        self.name = name.to_string();
        self
    }

    pub fn main_thread(mut self, priority: u8, core: u8, stack_size: u32) -> Self {
        self.priority = priority;
        self.core = core;
        self.stack_size = stack_size;
        self
    }

    pub fn system_resource_size(mut self, size: u32) -> Self {
        self.system_resource_size = size;
        self
    }

    /// Sets the `ACI0` title id and makes it the whole `ACID` range
    pub fn title_id(mut self, title_id: u64) -> Self {
        self.title_id = title_id;
        self
    }

    pub fn acid_flags(mut self, flags: u32) -> Self {
        self.acid_flags = flags;
        self
    }

    pub fn capabilities(mut self, words: Vec<u32>) -> Self {
        self.capabilities = words;
        self
    }

    pub fn build(&self) -> Vec<u8> {
        let kc_size = (self.capabilities.len() * 4) as u32;
        let aci_size = ACI0_HEADER_SIZE as u32 + kc_size;
        let total = Self::ACI_OFFSET as usize + aci_size as usize;
        let mut buf = vec![0u8; total];

        let put32 = |buf: &mut [u8], at: usize, value: u32| {
            buf[at..at + 4].copy_from_slice(&value.to_le_bytes());
        };
        let put64 = |buf: &mut [u8], at: usize, value: u64| {
            buf[at..at + 8].copy_from_slice(&value.to_le_bytes());
        };

        buf[meta::MAGIC..meta::MAGIC + 4].copy_from_slice(&META_MAGIC);
        buf[meta::MAIN_THREAD_PRIORITY] = self.priority;
        buf[meta::MAIN_THREAD_CORE] = self.core;
        put32(&mut buf, meta::SYSTEM_RESOURCE_SIZE, self.system_resource_size);
        put32(&mut buf, meta::MAIN_THREAD_STACK_SIZE, self.stack_size);
        let name = self.name.as_bytes();
        let name_len = name.len().min(meta::NAME_LEN);
        buf[meta::NAME..meta::NAME + name_len].copy_from_slice(&name[..name_len]);
        put32(&mut buf, meta::ACI_OFFSET, Self::ACI_OFFSET);
        put32(&mut buf, meta::ACI_SIZE, aci_size);
        put32(&mut buf, meta::ACID_OFFSET, Self::ACID_OFFSET);
        put32(&mut buf, meta::ACID_SIZE, ACID_HEADER_SIZE as u32);

        let base = Self::ACID_OFFSET as usize;
        buf[base + acid::MAGIC..base + acid::MAGIC + 4].copy_from_slice(&ACID_MAGIC);
        put32(&mut buf, base + acid::SIZE, ACID_HEADER_SIZE as u32);
        put32(&mut buf, base + acid::FLAGS, self.acid_flags);
        put64(&mut buf, base + acid::TITLE_ID_MIN, self.title_id);
        put64(&mut buf, base + acid::TITLE_ID_MAX, self.title_id);

        let base = Self::ACI_OFFSET as usize;
        buf[base + aci0::MAGIC..base + aci0::MAGIC + 4].copy_from_slice(&ACI0_MAGIC);
        put64(&mut buf, base + aci0::TITLE_ID, self.title_id);
        put32(&mut buf, base + aci0::KC_OFFSET, ACI0_HEADER_SIZE as u32);
        put32(&mut buf, base + aci0::KC_SIZE, kc_size);

        let caps = base + ACI0_HEADER_SIZE;
        for (i, word) in self.capabilities.iter().enumerate() {
            put32(&mut buf, caps + i * 4, *word);
        }

        buf
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_build_layout() {
        let bytes = NpdmBuilder::new().capabilities(vec![1, 2, 3]).build();
        assert_eq!(bytes.len(), 0x80 + 0x240 + 0x40 + 12);
        assert_eq!(&bytes[0..4], b"META");
        assert_eq!(&bytes[0x80 + 0x200..0x80 + 0x204], b"ACID");
        assert_eq!(&bytes[0x2C0..0x2C4], b"ACI0");
        assert_eq!(&bytes[0x300..0x304], &1u32.to_le_bytes());
    }

    #[test]
    fn test_long_name_truncated() {
        let bytes = NpdmBuilder::new()
            .name("a-very-long-program-name")
            .build();
        assert_eq!(&bytes[0x20..0x30], b"a-very-long-prog");
    }
}
