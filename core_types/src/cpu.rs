//! Guest CPU core identifiers.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Number of CPU cores the guest hardware exposes.
pub const CORE_COUNT: u8 = 4;

/// Identifier for a guest CPU core.
///
/// Always below [`CORE_COUNT`]; construct through [`CoreId::new`] when the
/// value comes from guest input.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct CoreId(u8);

impl CoreId {
    pub fn new(index: u8) -> Option<Self> {
        (index < CORE_COUNT).then_some(Self(index))
    }

    pub fn index(&self) -> u8 {
        self.0
    }

    /// Single-bit affinity mask selecting only this core.
    pub fn mask(&self) -> u64 {
        1 << self.0
    }

    /// All cores from the highest index down to zero.
    pub fn all_descending() -> impl Iterator<Item = CoreId> {
        (0..CORE_COUNT).rev().map(CoreId)
    }
}

impl fmt::Display for CoreId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Core({})", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_core_id_bounds() {
        assert!(CoreId::new(0).is_some());
        assert!(CoreId::new(3).is_some());
        assert!(CoreId::new(4).is_none());
        assert!(CoreId::new(u8::MAX).is_none());
    }

    #[test]
    fn test_core_id_mask() {
        assert_eq!(CoreId::new(0).unwrap().mask(), 0b0001);
        assert_eq!(CoreId::new(3).unwrap().mask(), 0b1000);
    }

    #[test]
    fn test_all_descending_order() {
        let order: Vec<u8> = CoreId::all_descending().map(|c| c.index()).collect();
        assert_eq!(order, vec![3, 2, 1, 0]);
    }
}
