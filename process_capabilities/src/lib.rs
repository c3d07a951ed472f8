//! # Process Capabilities
//!
//! Decodes the kernel capability words a guest program descriptor declares
//! into an immutable [`ProcessCapabilitySet`].
//!
//! ## Philosophy
//!
//! - **Untrusted input**: The words come straight out of a guest binary. Any
//!   malformed or contradictory word rejects the whole list.
//! - **All or nothing**: Decoding never yields a partial set.
//! - **Pure**: [`decode`] touches no emulator state; the category accumulator
//!   lives and dies inside one call.
//!
//! ## Word Format
//!
//! The position of the lowest clear bit of a word selects its category
//! (see [`CapabilityWord::tag`]); the bits above it carry the payload.
//! Memory mappings take two consecutive words, everything else one.
//!
//! ## Example
//!
//! ```
//! use process_capabilities::decode;
//!
//! // Syscall slot 0 permitting ids 1 and 2, then the end-of-list marker.
//! let words = [(0b110 << 5) | 0xF, 0xFFFF_FFFF];
//! let caps = decode(&words).unwrap();
//! assert!(caps.is_syscall_permitted(1));
//! assert!(caps.is_syscall_permitted(2));
//! assert!(!caps.is_syscall_permitted(0));
//! ```

pub mod decoder;
pub mod error;
pub mod set;
pub mod word;

pub use decoder::decode;
pub use error::CapabilityError;
pub use set::{
    DebugFlags, InterruptMask, IoMapping, MemoryMapping, ProcessCapabilitySet, SyscallMask,
    MAX_INTERRUPT_ID, MAX_SYSCALL_ID,
};
pub use word::{CapabilityKind, CapabilityWord};
