//! # Program Metadata
//!
//! Parses the program descriptor (NPDM) a guest executable ships with.
//!
//! ## Format
//!
//! An NPDM file nests three fixed-layout headers:
//! - `META` at offset 0: main thread parameters and the locations of the others
//! - `ACID`: the signed access-control descriptor (title id bounds, flags)
//! - `ACI0`: the process's own access-control info, including the kernel
//!   capability list handed to `process_capabilities`
//!
//! All fields are little endian. See [`layout`] for offsets.
//!
//! ## Homebrew
//!
//! Executables without a descriptor run with [`ProgramMetadata::homebrew`].

pub mod builder;
pub mod error;
pub mod layout;
pub mod loader;
pub mod metadata;

pub use builder::NpdmBuilder;
pub use error::FormatError;
pub use loader::{load, load_with, LoadOptions, MagicPolicy};
pub use metadata::{AccessControlSummary, ProgramMetadata};
