//! Guest-visible result codes.
//!
//! Scheduling calls do not fail the way loading does: they answer with a
//! status the guest receives in its return register. The raw value packs the
//! kernel module number (1) in the low 9 bits and the description above it.

use serde::{Deserialize, Serialize};
use std::fmt;

const KERNEL_MODULE: u32 = 1;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ResultCode {
    Success,
    /// Priority outside the guest's 0..=63 scale
    InvalidPriority,
    /// Core index or affinity bit beyond the guest's cores
    InvalidCoreId,
    /// Preferred core and affinity mask contradict each other
    InvalidCombination,
}

impl ResultCode {
    fn description(&self) -> u32 {
        match self {
            ResultCode::Success => 0,
            ResultCode::InvalidPriority => 112,
            ResultCode::InvalidCoreId => 113,
            ResultCode::InvalidCombination => 116,
        }
    }

    /// Encoded value as the guest sees it.
    pub fn as_raw(&self) -> u32 {
        match self {
            ResultCode::Success => 0,
            other => KERNEL_MODULE | (other.description() << 9),
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, ResultCode::Success)
    }
}

impl fmt::Display for ResultCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}(0x{:X})", self, self.as_raw())
    }
}
