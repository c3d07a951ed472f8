//! Priority scales and conversion between them.

use serde::{Deserialize, Serialize};

/// A priority scale, described by its most and least urgent values
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PriorityRange {
    /// Most urgent value
    pub high: i8,
    /// Least urgent value
    pub low: i8,
}

impl PriorityRange {
    /// The guest's scale
    pub const GUEST: PriorityRange = PriorityRange { high: 0, low: 63 };

    /// Default host scale
    pub const HOST: PriorityRange = PriorityRange { high: 19, low: -8 };

    pub fn contains(&self, value: i8) -> bool {
        let (min, max) = if self.high <= self.low {
            (self.high, self.low)
        } else {
            (self.low, self.high)
        };
        (min..=max).contains(&value)
    }

    /// Maps `value` from the `from` scale onto this one.
    ///
    /// Linear between the endpoints, which map exactly onto each other.
    pub fn rescale(&self, from: &PriorityRange, value: i8) -> i8 {
        let from_span = from.low as i32 - from.high as i32;
        if from_span == 0 {
            return self.high;
        }
        let to_span = self.low as i32 - self.high as i32;
        let offset = value as i32 - from.high as i32;
        let scaled = self.high as i32 + offset * to_span / from_span;
        scaled.clamp(i8::MIN as i32, i8::MAX as i32) as i8
    }
}

impl Default for PriorityRange {
    fn default() -> Self {
        Self::HOST
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rescale_endpoints() {
        let host = PriorityRange::HOST;
        assert_eq!(host.rescale(&PriorityRange::GUEST, 0), 19);
        assert_eq!(host.rescale(&PriorityRange::GUEST, 63), -8);
    }

    #[test]
    fn test_rescale_monotonic() {
        let host = PriorityRange::HOST;
        let mut previous = host.rescale(&PriorityRange::GUEST, 0);
        for guest in 1..=63 {
            let value = host.rescale(&PriorityRange::GUEST, guest);
            assert!(value <= previous, "guest {} -> {}", guest, value);
            assert!(host.contains(value));
            previous = value;
        }
    }

    #[test]
    fn test_rescale_midpoint() {
        let host = PriorityRange::HOST;
        // 19 + 44 * -27 / 63 = 19 - 18
        assert_eq!(host.rescale(&PriorityRange::GUEST, 44), 1);
    }

    #[test]
    fn test_rescale_roundtrip_endpoints() {
        let guest = PriorityRange::GUEST;
        assert_eq!(guest.rescale(&PriorityRange::HOST, 19), 0);
        assert_eq!(guest.rescale(&PriorityRange::HOST, -8), 63);
    }

    #[test]
    fn test_contains_either_direction() {
        assert!(PriorityRange::GUEST.contains(0));
        assert!(PriorityRange::GUEST.contains(63));
        assert!(!PriorityRange::GUEST.contains(64));
        assert!(PriorityRange::HOST.contains(-8));
        assert!(PriorityRange::HOST.contains(19));
        assert!(!PriorityRange::HOST.contains(20));
    }

    #[test]
    fn test_degenerate_source_range() {
        let flat = PriorityRange { high: 5, low: 5 };
        assert_eq!(PriorityRange::HOST.rescale(&flat, 5), 19);
    }
}
