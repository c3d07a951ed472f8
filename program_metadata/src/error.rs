//! Program descriptor format errors

use kernel_api::BackingError;
use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum FormatError {
    /// Backing cannot even hold the META header
    #[error("Bad NPDM file: {size} bytes is smaller than the META header")]
    TooSmall { size: u64 },

    /// A header or the capability list lies outside the backing
    #[error("Bad NPDM file: {0}")]
    Backing(#[from] BackingError),

    #[error("Bad NPDM file: capability list size {size} is not a multiple of 4")]
    MisalignedCapabilityList { size: u32 },

    #[error("Bad NPDM file: {header} magic is {found:?}")]
    BadMagic { header: &'static str, found: [u8; 4] },
}
