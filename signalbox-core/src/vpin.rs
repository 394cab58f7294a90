//! Virtual pin namespace
//!
//! Everything on the layout is addressed through a single flat 16-bit
//! pin space. A device claims a contiguous block of it at creation;
//! pins are never reallocated behind a caller's back.

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Virtual pin identifier
pub type Vpin = u16;

/// Largest assignable virtual pin
pub const VPIN_MAX: Vpin = 65534;

/// Sentinel meaning "no pin assigned"
pub const VPIN_NONE: Vpin = 65535;

/// Contiguous block of virtual pins claimed by one device
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct PinRange {
    /// First pin of the block
    pub first: Vpin,
    /// Number of pins in the block
    pub count: u16,
}

impl PinRange {
    /// Create a range covering `[first, first + count)`
    pub const fn new(first: Vpin, count: u16) -> Self {
        Self { first, count }
    }

    /// Ownership test: does this range contain `pin`?
    ///
    /// Unsigned arithmetic only; a pin below `first` wraps to a huge
    /// offset and fails the comparison. Ranges are small relative to
    /// the address space, so no overflow check is needed.
    pub fn contains(&self, pin: Vpin) -> bool {
        pin.wrapping_sub(self.first) < self.count
    }

    /// Offset of `pin` within the range, if owned
    pub fn offset(&self, pin: Vpin) -> Option<u16> {
        let offset = pin.wrapping_sub(self.first);
        (offset < self.count).then_some(offset)
    }

    /// Last pin of the block (for diagnostics)
    pub fn last(&self) -> Vpin {
        self.first + self.count.saturating_sub(1)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn contains_is_half_open() {
        let range = PinRange::new(100, 16);
        assert!(!range.contains(99));
        assert!(range.contains(100));
        assert!(range.contains(115));
        assert!(!range.contains(116));
    }

    #[test]
    fn empty_range_owns_nothing() {
        let range = PinRange::new(100, 0);
        assert!(!range.contains(100));
        assert_eq!(range.offset(100), None);
    }

    #[test]
    fn offset_is_range_relative() {
        let range = PinRange::new(300, 8);
        assert_eq!(range.offset(300), Some(0));
        assert_eq!(range.offset(307), Some(7));
        assert_eq!(range.offset(308), None);
        assert_eq!(range.offset(0), None);
    }

    proptest! {
        #[test]
        fn contains_matches_interval(first in 0u16..=1000, count in 0u16..=256, pin: u16) {
            let range = PinRange::new(first, count);
            let expected = pin >= first && u32::from(pin) < u32::from(first) + u32::from(count);
            prop_assert_eq!(range.contains(pin), expected);
        }

        #[test]
        fn offset_agrees_with_contains(first in 0u16..=1000, count in 0u16..=256, pin: u16) {
            let range = PinRange::new(first, count);
            prop_assert_eq!(range.offset(pin).is_some(), range.contains(pin));
        }
    }
}
