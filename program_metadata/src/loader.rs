//! NPDM loading from a [`Backing`].

use crate::layout::{
    AciHeader, AcidHeader, MetaHeader, ACI0_HEADER_SIZE, ACI0_MAGIC, ACID_HEADER_SIZE, ACID_MAGIC,
    META_HEADER_SIZE, META_MAGIC,
};
use crate::{AccessControlSummary, FormatError, ProgramMetadata};
use core_types::TitleId;
use kernel_api::{Backing, BackingError};
use serde::{Deserialize, Serialize};

const WORD_SIZE: u32 = 4;

/// How header magic strings are treated
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum MagicPolicy {
    /// Magic strings are read but never compared
    #[default]
    Permissive,
    /// A header whose magic does not match is a format error
    Strict,
}

/// Loader options
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoadOptions {
    pub magic_policy: MagicPolicy,
}

/// Loads program metadata with default options
pub fn load<B: Backing + ?Sized>(backing: &B) -> Result<ProgramMetadata, FormatError> {
    load_with(backing, &LoadOptions::default())
}

/// Loads program metadata
///
/// Fails before reading anything if the backing cannot hold a `META` header.
pub fn load_with<B: Backing + ?Sized>(
    backing: &B,
    options: &LoadOptions,
) -> Result<ProgramMetadata, FormatError> {
    if backing.len() < META_HEADER_SIZE as u64 {
        return Err(FormatError::TooSmall {
            size: backing.len(),
        });
    }

    let mut meta_bytes = [0u8; META_HEADER_SIZE];
    backing.read_at(0, &mut meta_bytes)?;
    let meta = MetaHeader::parse(&meta_bytes);
    check_magic(options, "META", meta.magic, META_MAGIC)?;

    let mut acid_bytes = [0u8; ACID_HEADER_SIZE];
    backing.read_at(meta.acid_offset as u64, &mut acid_bytes)?;
    let acid = AcidHeader::parse(&acid_bytes);
    check_magic(options, "ACID", acid.magic, ACID_MAGIC)?;

    let mut aci_bytes = [0u8; ACI0_HEADER_SIZE];
    backing.read_at(meta.aci_offset as u64, &mut aci_bytes)?;
    let aci = AciHeader::parse(&aci_bytes);
    check_magic(options, "ACI0", aci.magic, ACI0_MAGIC)?;

    let capabilities = read_capabilities(backing, &meta, &aci)?;

    log::debug!(
        "loaded NPDM '{}': title={} priority={} core={} stack=0x{:X} caps={}",
        meta.name,
        TitleId::new(aci.title_id),
        meta.main_thread_priority,
        meta.main_thread_core,
        meta.main_thread_stack_size,
        capabilities.len()
    );

    Ok(ProgramMetadata {
        name: meta.name,
        main_thread_priority: meta.main_thread_priority,
        main_thread_core: meta.main_thread_core,
        main_thread_stack_size: meta.main_thread_stack_size,
        system_resource_size: meta.system_resource_size,
        title_id: TitleId::new(aci.title_id),
        access_control: Some(AccessControlSummary {
            flags: acid.flags,
            title_id_min: TitleId::new(acid.title_id_min),
            title_id_max: TitleId::new(acid.title_id_max),
        }),
        capabilities,
    })
}

fn check_magic(
    options: &LoadOptions,
    header: &'static str,
    found: [u8; 4],
    expected: [u8; 4],
) -> Result<(), FormatError> {
    if found == expected {
        return Ok(());
    }
    match options.magic_policy {
        MagicPolicy::Strict => Err(FormatError::BadMagic { header, found }),
        MagicPolicy::Permissive => {
            log::trace!("ignoring {} magic {:?}", header, found);
            Ok(())
        }
    }
}

fn read_capabilities<B: Backing + ?Sized>(
    backing: &B,
    meta: &MetaHeader,
    aci: &AciHeader,
) -> Result<Vec<u32>, FormatError> {
    if aci.kc_size % WORD_SIZE != 0 {
        return Err(FormatError::MisalignedCapabilityList { size: aci.kc_size });
    }

    // Checked against the backing before allocating
    let offset = meta.aci_offset as u64 + aci.kc_offset as u64;
    let len = aci.kc_size as usize;
    match offset.checked_add(aci.kc_size as u64) {
        Some(end) if end <= backing.len() => {}
        _ => {
            return Err(FormatError::Backing(BackingError::OutOfBounds {
                offset,
                len,
                size: backing.len(),
            }))
        }
    }
    let mut raw = vec![0u8; len];
    backing.read_at(offset, &mut raw)?;

    Ok(raw
        .chunks_exact(WORD_SIZE as usize)
        .map(|chunk| u32::from_le_bytes([chunk[0], chunk[1], chunk[2], chunk[3]]))
        .collect())
}
