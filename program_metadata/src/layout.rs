//! Fixed NPDM header layouts.
//!
//! Each header is read into a byte array of its exact size and decoded
//! field by field; offsets are relative to the header start.

use serde::{Deserialize, Serialize};

pub const META_MAGIC: [u8; 4] = *b"META";
pub const ACID_MAGIC: [u8; 4] = *b"ACID";
pub const ACI0_MAGIC: [u8; 4] = *b"ACI0";

pub const META_HEADER_SIZE: usize = 0x80;
pub const ACID_HEADER_SIZE: usize = 0x240;
pub const ACI0_HEADER_SIZE: usize = 0x40;

/// `META` field offsets
pub mod meta {
    pub const MAGIC: usize = 0x00;
    pub const MAIN_THREAD_PRIORITY: usize = 0x0C;
    pub const MAIN_THREAD_CORE: usize = 0x0D;
    pub const SYSTEM_RESOURCE_SIZE: usize = 0x14;
    pub const MAIN_THREAD_STACK_SIZE: usize = 0x1C;
    pub const NAME: usize = 0x20;
    pub const NAME_LEN: usize = 0x10;
    pub const ACI_OFFSET: usize = 0x70;
    pub const ACI_SIZE: usize = 0x74;
    pub const ACID_OFFSET: usize = 0x78;
    pub const ACID_SIZE: usize = 0x7C;
}

/// `ACID` field offsets
pub mod acid {
    pub const SIGNATURE: usize = 0x000;
    pub const MODULUS: usize = 0x100;
    pub const MAGIC: usize = 0x200;
    pub const SIZE: usize = 0x204;
    pub const FLAGS: usize = 0x20C;
    pub const TITLE_ID_MIN: usize = 0x210;
    pub const TITLE_ID_MAX: usize = 0x218;
}

/// `ACI0` field offsets
pub mod aci0 {
    pub const MAGIC: usize = 0x00;
    pub const TITLE_ID: usize = 0x10;
    pub const KC_OFFSET: usize = 0x30;
    pub const KC_SIZE: usize = 0x34;
}

fn u32_at(bytes: &[u8], offset: usize) -> u32 {
    let mut raw = [0u8; 4];
    raw.copy_from_slice(&bytes[offset..offset + 4]);
    u32::from_le_bytes(raw)
}

fn u64_at(bytes: &[u8], offset: usize) -> u64 {
    let mut raw = [0u8; 8];
    raw.copy_from_slice(&bytes[offset..offset + 8]);
    u64::from_le_bytes(raw)
}

fn magic_at(bytes: &[u8], offset: usize) -> [u8; 4] {
    let mut raw = [0u8; 4];
    raw.copy_from_slice(&bytes[offset..offset + 4]);
    raw
}

/// Decoded `META` header
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MetaHeader {
    pub magic: [u8; 4],
    pub main_thread_priority: u8,
    pub main_thread_core: u8,
    pub system_resource_size: u32,
    pub main_thread_stack_size: u32,
    pub name: String,
    pub aci_offset: u32,
    pub aci_size: u32,
    pub acid_offset: u32,
    pub acid_size: u32,
}

impl MetaHeader {
    pub fn parse(bytes: &[u8; META_HEADER_SIZE]) -> Self {
        let name_bytes = &bytes[meta::NAME..meta::NAME + meta::NAME_LEN];
        let name_len = name_bytes
            .iter()
            .position(|b| *b == 0)
            .unwrap_or(meta::NAME_LEN);
        Self {
            magic: magic_at(bytes, meta::MAGIC),
            main_thread_priority: bytes[meta::MAIN_THREAD_PRIORITY],
            main_thread_core: bytes[meta::MAIN_THREAD_CORE],
            system_resource_size: u32_at(bytes, meta::SYSTEM_RESOURCE_SIZE),
            main_thread_stack_size: u32_at(bytes, meta::MAIN_THREAD_STACK_SIZE),
            name: String::from_utf8_lossy(&name_bytes[..name_len]).into_owned(),
            aci_offset: u32_at(bytes, meta::ACI_OFFSET),
            aci_size: u32_at(bytes, meta::ACI_SIZE),
            acid_offset: u32_at(bytes, meta::ACID_OFFSET),
            acid_size: u32_at(bytes, meta::ACID_SIZE),
        }
    }
}

/// Decoded `ACID` header; signature and modulus are not kept
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AcidHeader {
    pub magic: [u8; 4],
    pub size: u32,
    pub flags: u32,
    pub title_id_min: u64,
    pub title_id_max: u64,
}

impl AcidHeader {
    pub fn parse(bytes: &[u8; ACID_HEADER_SIZE]) -> Self {
        Self {
            magic: magic_at(bytes, acid::MAGIC),
            size: u32_at(bytes, acid::SIZE),
            flags: u32_at(bytes, acid::FLAGS),
            title_id_min: u64_at(bytes, acid::TITLE_ID_MIN),
            title_id_max: u64_at(bytes, acid::TITLE_ID_MAX),
        }
    }
}

/// Decoded `ACI0` header
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AciHeader {
    pub magic: [u8; 4],
    pub title_id: u64,
    pub kc_offset: u32,
    pub kc_size: u32,
}

impl AciHeader {
    pub fn parse(bytes: &[u8; ACI0_HEADER_SIZE]) -> Self {
        Self {
            magic: magic_at(bytes, aci0::MAGIC),
            title_id: u64_at(bytes, aci0::TITLE_ID),
            kc_offset: u32_at(bytes, aci0::KC_OFFSET),
            kc_size: u32_at(bytes, aci0::KC_SIZE),
        }
    }
}
