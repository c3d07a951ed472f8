//! Capability list decoding.
//!
//! ## Rules
//!
//! - Words are consumed in list order.
//! - A memory mapping consumes its own word and the following one.
//! - The all-ones word ends the list; whatever follows is never looked at.
//! - A category from [`SINGLE_INSTANCE_CATEGORIES`] may appear once.
//! - The first rejected word aborts decoding; no partial set escapes.

use crate::set::{DebugFlags, IoMapping, MemoryMapping, ProcessCapabilitySet, MAX_SYSCALL_ID};
use crate::word::{CapabilityKind, CapabilityWord, SINGLE_INSTANCE_CATEGORIES};
use crate::CapabilityError;

/// Lowest kernel version word a process may declare
pub const MIN_KERNEL_VERSION: u32 = 0x8_0000;

/// Guest physical addresses are 36 bits wide
const ADDRESS_SPACE_BITS: u32 = 36;

const MAP_ADDRESS_MASK: u64 = 0xF_FFFF_F000;
const MAP_SIZE_MASK: u64 = 0xFFFF_F000;
const MAP_SIZE_RESERVED: u32 = 0x7800_0000;
const MAP_SIZE_PAGES: u32 = 0x07FF_FF80;

const SYSCALLS_PER_SLOT: u32 = 24;
const UNUSED_INTERRUPT: u32 = 0x3FF;
const MAX_CORE_COUNT: u32 = 4;

/// Decodes a capability list into a [`ProcessCapabilitySet`]
pub fn decode(words: &[u32]) -> Result<ProcessCapabilitySet, CapabilityError> {
    let set = CapabilityDecoder::default().run(words)?;
    log::debug!(
        "decoded {} capability words: cores=0x{:X} priorities=0x{:X} handles={} kernel=0x{:X}",
        words.len(),
        set.core_mask,
        set.thread_priority_mask,
        set.handle_table_size,
        set.kernel_version
    );
    Ok(set)
}

#[derive(Default)]
struct CapabilityDecoder {
    set: ProcessCapabilitySet,
    /// Category bits seen so far in this list
    categories: u32,
    /// Syscall slots seen so far in this list
    syscall_slots: u8,
}

impl CapabilityDecoder {
    fn run(mut self, words: &[u32]) -> Result<ProcessCapabilitySet, CapabilityError> {
        let mut index = 0;
        while index < words.len() {
            let word = CapabilityWord(words[index]);
            match word.kind() {
                CapabilityKind::MemoryMap => {
                    let Some(&size_word) = words.get(index + 1) else {
                        log::debug!("memory mapping at {} has no size word", index);
                        return Err(CapabilityError::InvalidCombination { index });
                    };
                    self.memory_map(index, word, CapabilityWord(size_word))?;
                    index += 2;
                    continue;
                }
                CapabilityKind::Invalid => {
                    log::debug!("rejecting capability {}: 0x{:08X}", index, word.raw());
                    return Err(CapabilityError::InvalidCapability {
                        index,
                        word: word.raw(),
                    });
                }
                CapabilityKind::EndOfList => {
                    log::trace!("end of capability list at {}", index);
                    return Ok(self.set);
                }
                kind => {
                    self.claim_category(index, word)?;
                    self.apply(index, kind, word)?;
                }
            }
            index += 1;
        }
        Ok(self.set)
    }

    fn claim_category(&mut self, index: usize, word: CapabilityWord) -> Result<(), CapabilityError> {
        let category = word.category_bit();
        if self.categories & category & SINGLE_INSTANCE_CATEGORIES != 0 {
            log::debug!("capability {} repeats category 0x{:X}", index, category);
            return Err(CapabilityError::DuplicateCategory { index, category });
        }
        self.categories |= category;
        Ok(())
    }

    fn apply(
        &mut self,
        index: usize,
        kind: CapabilityKind,
        word: CapabilityWord,
    ) -> Result<(), CapabilityError> {
        let raw = word.raw();
        match kind {
            CapabilityKind::CoreThreadRange => self.core_thread_range(index, raw),
            CapabilityKind::SyscallMask => self.syscall_mask(index, raw),
            CapabilityKind::IoMemoryMap => {
                let address = ((raw as u64) << 4) & MAP_ADDRESS_MASK;
                log::trace!("capability {}: io page 0x{:X}", index, address);
                self.set.io_mappings.push(IoMapping { address });
                Ok(())
            }
            CapabilityKind::InterruptPair => {
                for id in [(raw >> 12) & 0x3FF, (raw >> 22) & 0x3FF] {
                    if id != UNUSED_INTERRUPT {
                        log::trace!("capability {}: interrupt {}", index, id);
                        self.set.interrupts.set(id);
                    }
                }
                Ok(())
            }
            CapabilityKind::ApplicationType => {
                if raw >> 17 != 0 {
                    return Err(CapabilityError::InvalidApplicationType { index, word: raw });
                }
                self.set.application_type = (raw >> 14) & 0b111;
                Ok(())
            }
            CapabilityKind::KernelVersion => {
                if !kernel_version_acceptable(self.set.kernel_version, raw) {
                    return Err(CapabilityError::InvalidKernelVersion { index, word: raw });
                }
                self.set.kernel_version = raw;
                Ok(())
            }
            CapabilityKind::HandleTableSize => {
                if raw >> 26 != 0 {
                    return Err(CapabilityError::InvalidHandleTableSize { index, word: raw });
                }
                self.set.handle_table_size = (raw >> 16) & 0x3FF;
                Ok(())
            }
            CapabilityKind::DebugFlags => {
                if raw >> 19 != 0 {
                    return Err(CapabilityError::InvalidDebugFlags { index, word: raw });
                }
                self.set.debug_flags.remove(DebugFlags::all());
                self.set
                    .debug_flags
                    .insert(DebugFlags::from_bits_truncate(raw >> 19));
                Ok(())
            }
            CapabilityKind::Unknown(tag) => {
                log::debug!("capability {} has unknown tag 0x{:X}", index, tag);
                Err(CapabilityError::UnknownCategory { index, tag })
            }
            CapabilityKind::EndOfList | CapabilityKind::Invalid | CapabilityKind::MemoryMap => {
                Err(CapabilityError::InvalidCapability { index, word: raw })
            }
        }
    }

    fn core_thread_range(&mut self, index: usize, raw: u32) -> Result<(), CapabilityError> {
        if self.set.core_mask != 0 || self.set.thread_priority_mask != 0 {
            return Err(CapabilityError::DuplicateCategory {
                index,
                category: CapabilityWord(raw).category_bit(),
            });
        }

        let low_core = (raw >> 16) & 0xFF;
        let high_core = (raw >> 24) & 0xFF;
        let low_thread = (raw >> 10) & 0x3F;
        let high_thread = (raw >> 4) & 0x3F;
        if low_core > high_core || low_thread > high_thread || high_core >= MAX_CORE_COUNT {
            return Err(CapabilityError::InvalidCoreThreadRange { index, word: raw });
        }

        self.set.core_mask = bit_range(low_core, high_core);
        self.set.thread_priority_mask = bit_range(low_thread, high_thread);
        log::trace!(
            "capability {}: cores {}..={} priorities {}..={}",
            index,
            low_core,
            high_core,
            low_thread,
            high_thread
        );
        Ok(())
    }

    fn syscall_mask(&mut self, index: usize, raw: u32) -> Result<(), CapabilityError> {
        let slot = (raw >> 29) & 0b111;
        let slot_bit = 1u8 << slot;
        if self.syscall_slots & slot_bit != 0 {
            return Err(CapabilityError::DuplicateSyscallSlot { index, slot });
        }
        self.syscall_slots |= slot_bit;

        let mask = (raw >> 5) & 0xFF_FFFF;
        let base = slot * SYSCALLS_PER_SLOT;
        for bit in (0..SYSCALLS_PER_SLOT).filter(|bit| (mask >> bit) & 1 == 1) {
            let id = base + bit;
            if id > MAX_SYSCALL_ID {
                return Err(CapabilityError::SyscallIdOutOfRange { index, id });
            }
            self.set.syscalls.set(id);
        }
        log::trace!("capability {}: syscall slot {} mask 0x{:06X}", index, slot, mask);
        Ok(())
    }

    fn memory_map(
        &mut self,
        index: usize,
        address_word: CapabilityWord,
        size_word: CapabilityWord,
    ) -> Result<(), CapabilityError> {
        let raw_size = size_word.raw();
        if size_word.kind() != CapabilityKind::MemoryMap
            || raw_size & MAP_SIZE_RESERVED != 0
            || raw_size & MAP_SIZE_PAGES == 0
        {
            return Err(CapabilityError::InvalidComboPair {
                index: index + 1,
                word: raw_size,
            });
        }

        let address = ((address_word.raw() as u64) << 5) & MAP_ADDRESS_MASK;
        let size = ((raw_size as u64) << 5) & MAP_SIZE_MASK;
        if (address + size - 1) >> ADDRESS_SPACE_BITS != 0 {
            return Err(CapabilityError::InvalidAddressRange {
                index,
                address,
                size,
            });
        }

        log::trace!("capability {}: memory 0x{:X}+0x{:X}", index, address, size);
        self.set.memory_mappings.push(MemoryMapping { address, size });
        Ok(())
    }
}

/// Whether `requested` may replace the `current` kernel version word
fn kernel_version_acceptable(current: u32, requested: u32) -> bool {
    current >> 19 == 0 && requested >= MIN_KERNEL_VERSION
}

/// Contiguous mask with bits `low..=high` set
fn bit_range(low: u32, high: u32) -> u64 {
    let width = high - low + 1;
    let bits = if width >= u64::BITS {
        u64::MAX
    } else {
        (1u64 << width) - 1
    };
    bits << low
}

#[cfg(test)]
mod tests {
    use super::*;

    const END: u32 = 0xFFFF_FFFF;

    fn core_thread(low_core: u32, high_core: u32, low_thread: u32, high_thread: u32) -> u32 {
        (high_core << 24) | (low_core << 16) | (low_thread << 10) | (high_thread << 4) | 0x7
    }

    fn syscalls(slot: u32, mask: u32) -> u32 {
        (slot << 29) | (mask << 5) | 0xF
    }

    fn interrupts(first: u32, second: u32) -> u32 {
        (second << 22) | (first << 12) | 0x7FF
    }

    fn map_address(address: u64) -> u32 {
        ((address >> 5) as u32) | 0x3F
    }

    fn map_size(size: u64) -> u32 {
        ((size >> 5) as u32) | 0x3F
    }

    #[test]
    fn test_empty_list() {
        let set = decode(&[]).unwrap();
        assert_eq!(set, ProcessCapabilitySet::default());
    }

    #[test]
    fn test_end_of_list_stops_decoding() {
        let set = decode(&[syscalls(0, 0b1), END, 0x0, 0x2, 0x1F]).unwrap();
        assert!(set.is_syscall_permitted(0));
        assert_eq!(set.permitted_syscalls().count(), 1);
    }

    #[test]
    fn test_end_of_list_first() {
        let set = decode(&[END, syscalls(7, 0xFF_FFFF)]).unwrap();
        assert!(set.syscalls().is_empty());
    }

    #[test]
    fn test_invalid_tag_one() {
        let err = decode(&[syscalls(0, 1), 0x0000_0002]).unwrap_err();
        assert_eq!(err, CapabilityError::InvalidCapability { index: 1, word: 2 });
    }

    #[test]
    fn test_unknown_category() {
        let err = decode(&[0x1F]).unwrap_err();
        assert_eq!(err, CapabilityError::UnknownCategory { index: 0, tag: 0x20 });
    }

    #[test]
    fn test_core_thread_range() {
        let set = decode(&[core_thread(0, 3, 24, 59)]).unwrap();
        assert_eq!(set.core_mask(), 0b1111);
        assert_eq!(set.thread_priority_mask(), bit_range(24, 59));
        assert!(set.is_priority_permitted(44));
        assert!(!set.is_priority_permitted(23));
        assert!(set.is_core_permitted(3));
    }

    #[test]
    fn test_core_thread_full_priority_range() {
        let set = decode(&[core_thread(1, 1, 0, 63)]).unwrap();
        assert_eq!(set.core_mask(), 0b0010);
        assert_eq!(set.thread_priority_mask(), u64::MAX);
    }

    #[test]
    fn test_core_thread_rejects_inverted_ranges() {
        assert!(matches!(
            decode(&[core_thread(2, 1, 0, 63)]),
            Err(CapabilityError::InvalidCoreThreadRange { index: 0, .. })
        ));
        assert!(matches!(
            decode(&[core_thread(0, 3, 40, 30)]),
            Err(CapabilityError::InvalidCoreThreadRange { index: 0, .. })
        ));
    }

    #[test]
    fn test_core_thread_rejects_fifth_core() {
        assert!(matches!(
            decode(&[core_thread(0, 4, 0, 63)]),
            Err(CapabilityError::InvalidCoreThreadRange { .. })
        ));
    }

    #[test]
    fn test_core_thread_duplicate_rejected() {
        let err = decode(&[core_thread(0, 3, 0, 63), core_thread(0, 0, 10, 20)]).unwrap_err();
        assert_eq!(
            err,
            CapabilityError::DuplicateCategory {
                index: 1,
                category: 0x8
            }
        );
    }

    #[test]
    fn test_syscall_slots() {
        let set = decode(&[syscalls(0, 0b101), syscalls(1, 0b1)]).unwrap();
        let ids: Vec<u32> = set.permitted_syscalls().collect();
        assert_eq!(ids, vec![0, 2, 24]);
    }

    #[test]
    fn test_syscall_last_slot_limit() {
        // Slot 5 covers 120..=143; only 120..=127 are valid.
        let set = decode(&[syscalls(5, 0xFF)]).unwrap();
        assert_eq!(set.permitted_syscalls().collect::<Vec<_>>(), (120..=127).collect::<Vec<_>>());

        let err = decode(&[syscalls(5, 0x1FF)]).unwrap_err();
        assert_eq!(err, CapabilityError::SyscallIdOutOfRange { index: 0, id: 128 });

        assert!(matches!(
            decode(&[syscalls(7, 0x1)]),
            Err(CapabilityError::SyscallIdOutOfRange { id: 168, .. })
        ));
    }

    #[test]
    fn test_syscall_duplicate_slot() {
        let err = decode(&[syscalls(2, 0x1), syscalls(2, 0x2)]).unwrap_err();
        assert_eq!(err, CapabilityError::DuplicateSyscallSlot { index: 1, slot: 2 });
    }

    #[test]
    fn test_interrupt_pair_skips_unused() {
        let set = decode(&[interrupts(0x3FF, 5)]).unwrap();
        assert_eq!(set.interrupts().ids().collect::<Vec<_>>(), vec![5]);
    }

    #[test]
    fn test_interrupt_pairs_repeat() {
        let set = decode(&[interrupts(1, 1022), interrupts(0x3FF, 0x3FF), interrupts(64, 2)])
            .unwrap();
        assert_eq!(
            set.interrupts().ids().collect::<Vec<_>>(),
            vec![1, 2, 64, 1022]
        );
    }

    #[test]
    fn test_memory_map_boundary() {
        let address = 0xF_FFFF_F000;
        let set = decode(&[map_address(address), map_size(0x1000)]).unwrap();
        assert_eq!(
            set.memory_mappings(),
            &[MemoryMapping {
                address,
                size: 0x1000
            }]
        );

        let err = decode(&[map_address(address), map_size(0x2000)]).unwrap_err();
        assert_eq!(
            err,
            CapabilityError::InvalidAddressRange {
                index: 0,
                address,
                size: 0x2000
            }
        );
    }

    #[test]
    fn test_memory_map_consumes_two_words() {
        let set = decode(&[
            map_address(0x7000_0000),
            map_size(0x4000),
            syscalls(0, 0b1),
        ])
        .unwrap();
        assert_eq!(set.memory_mappings().len(), 1);
        assert!(set.is_syscall_permitted(0));
    }

    #[test]
    fn test_memory_map_may_repeat() {
        let set = decode(&[
            map_address(0x1000),
            map_size(0x1000),
            map_address(0x8000),
            map_size(0x2000),
        ])
        .unwrap();
        assert_eq!(set.memory_mappings().len(), 2);
    }

    #[test]
    fn test_memory_map_missing_pair() {
        let err = decode(&[syscalls(0, 1), map_address(0x1000)]).unwrap_err();
        assert_eq!(err, CapabilityError::InvalidCombination { index: 1 });
    }

    #[test]
    fn test_memory_map_bad_size_word() {
        // Second word of another category
        assert_eq!(
            decode(&[map_address(0x1000), syscalls(0, 1)]).unwrap_err(),
            CapabilityError::InvalidComboPair {
                index: 1,
                word: syscalls(0, 1)
            }
        );
        // Reserved bits set
        let reserved = map_size(0x1000) | 0x0800_0000;
        assert!(matches!(
            decode(&[map_address(0x1000), reserved]),
            Err(CapabilityError::InvalidComboPair { .. })
        ));
        // No pages
        assert!(matches!(
            decode(&[map_address(0x1000), 0x3F]),
            Err(CapabilityError::InvalidComboPair { .. })
        ));
    }

    #[test]
    fn test_io_mapping_recorded() {
        let word = ((0x1234_5000u64 >> 4) as u32) | 0x7F;
        let set = decode(&[word, word]).unwrap();
        assert_eq!(
            set.io_mappings(),
            &[
                IoMapping {
                    address: 0x1234_5000
                };
                2
            ]
        );
    }

    #[test]
    fn test_application_type() {
        let set = decode(&[(0b101 << 14) | 0x1FFF]).unwrap();
        assert_eq!(set.application_type(), 0b101);

        assert!(matches!(
            decode(&[(1 << 17) | 0x1FFF]),
            Err(CapabilityError::InvalidApplicationType { .. })
        ));
    }

    #[test]
    fn test_kernel_version_floor() {
        assert!(kernel_version_acceptable(0, 0x8_0000));
        assert!(!kernel_version_acceptable(0, 0x7_FFFF));
        assert!(!kernel_version_acceptable(0x8_0000, 0x9_0000));
    }

    #[test]
    fn test_kernel_version_words() {
        let set = decode(&[0x0008_3FFF]).unwrap();
        assert_eq!(set.kernel_version(), 0x0008_3FFF);

        assert_eq!(
            decode(&[0x0007_BFFF]).unwrap_err(),
            CapabilityError::InvalidKernelVersion {
                index: 0,
                word: 0x0007_BFFF
            }
        );
    }

    #[test]
    fn test_handle_table_size() {
        let set = decode(&[(0x200 << 16) | 0x7FFF]).unwrap();
        assert_eq!(set.handle_table_size(), 0x200);

        assert!(matches!(
            decode(&[(1 << 26) | 0x7FFF]),
            Err(CapabilityError::InvalidHandleTableSize { .. })
        ));
    }

    #[test]
    fn test_debug_flags_never_stored() {
        let set = decode(&[(0b11 << 17) | 0xFFFF]).unwrap();
        assert!(set.debug_flags().is_empty());

        assert!(matches!(
            decode(&[(1 << 19) | 0xFFFF]),
            Err(CapabilityError::InvalidDebugFlags { .. })
        ));
    }

    #[test]
    fn test_single_instance_categories() {
        for word in [0x0008_3FFF, (0x10 << 16) | 0x7FFF, 0x1FFF, 0xFFFF] {
            let err = decode(&[word, word]).unwrap_err();
            assert!(
                matches!(err, CapabilityError::DuplicateCategory { index: 1, .. }),
                "word 0x{:X}: {:?}",
                word,
                err
            );
        }
    }

    #[test]
    fn test_error_reports_index() {
        let err = decode(&[syscalls(0, 1), interrupts(3, 4), 0x1F]).unwrap_err();
        assert_eq!(err.index(), 2);
    }

    #[test]
    fn test_realistic_application_list() {
        let words = [
            core_thread(0, 2, 24, 59),
            syscalls(0, 0xFF_FFFE),
            syscalls(1, 0xFF_FFFF),
            syscalls(2, 0xFF_FFFF),
            syscalls(3, 0xFF_FFFF),
            syscalls(4, 0xFF_FFFF),
            syscalls(5, 0xFF),
            0x0008_3FFF,
            (0x200 << 16) | 0x7FFF,
            0xFFFF,
        ];
        let set = decode(&words).unwrap();
        assert_eq!(set.core_mask(), 0b0111);
        assert_eq!(set.permitted_syscalls().count(), 127);
        assert!(!set.is_syscall_permitted(0));
        assert!(set.is_syscall_permitted(127));
        assert_eq!(set.handle_table_size(), 0x200);
    }
}
