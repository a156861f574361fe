//! Image sizing and the geometry handed to littlefs.

use core::fmt;

use crate::constants::{BLOCK_SIZE, KIB, MAX_SIZE, MIN_SIZE, PAGE_SIZE};

/// Describes the emulated flash device.
///
/// The total size is always a multiple of the erase-block size and lies in
/// `[MIN_SIZE, MAX_SIZE]`.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct Geometry {
    size: usize,
}

/// A requested size was moved to one of the supported bounds.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum SizeAdjustment {
    Minimum,
    Maximum,
}

impl Default for Geometry {
    fn default() -> Self {
        Self {
            size: MAX_SIZE as usize,
        }
    }
}

impl Geometry {
    /// Derives the geometry from a size in kilobytes; `None` selects the
    /// maximum size.
    pub fn from_kib(kib: Option<u64>) -> (Self, Option<SizeAdjustment>) {
        match kib {
            Some(kib) => Self::from_bytes(kib.saturating_mul(KIB)),
            None => (Self::default(), None),
        }
    }

    /// Aligns `bytes` down to a block boundary, then clamps it.
    pub fn from_bytes(bytes: u64) -> (Self, Option<SizeAdjustment>) {
        let aligned = bytes - bytes % BLOCK_SIZE as u64;
        let (size, adjustment) = if aligned < MIN_SIZE {
            (MIN_SIZE, Some(SizeAdjustment::Minimum))
        } else if aligned > MAX_SIZE {
            (MAX_SIZE, Some(SizeAdjustment::Maximum))
        } else {
            (aligned, None)
        };
        let geometry = Self {
            size: size as usize,
        };
        (geometry, adjustment)
    }

    pub const fn size(&self) -> usize {
        self.size
    }

    pub const fn size_kib(&self) -> usize {
        self.size / KIB as usize
    }

    pub const fn block_size(&self) -> usize {
        BLOCK_SIZE
    }

    pub const fn block_count(&self) -> usize {
        self.size / BLOCK_SIZE
    }

    pub const fn page_size(&self) -> usize {
        PAGE_SIZE
    }
}

impl fmt::Display for SizeAdjustment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Minimum => f.write_str("minimum"),
            Self::Maximum => f.write_str("maximum"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_is_maximum() {
        let (geometry, adjustment) = Geometry::from_kib(None);
        assert_eq!(geometry.size(), MAX_SIZE as usize);
        assert_eq!(geometry.block_count(), 512);
        assert_eq!(adjustment, None);
    }

    #[test]
    fn clamps_to_bounds() {
        assert_eq!(
            Geometry::from_kib(Some(1)),
            (
                Geometry {
                    size: MIN_SIZE as usize
                },
                Some(SizeAdjustment::Minimum)
            )
        );
        assert_eq!(
            Geometry::from_kib(Some(0)).1,
            Some(SizeAdjustment::Minimum)
        );
        assert_eq!(
            Geometry::from_kib(Some(4096)),
            (
                Geometry {
                    size: MAX_SIZE as usize
                },
                Some(SizeAdjustment::Maximum)
            )
        );
        assert_eq!(
            Geometry::from_kib(Some(u64::MAX)).0.size(),
            MAX_SIZE as usize
        );
    }

    #[test]
    fn bounds_are_not_adjustments() {
        assert_eq!(Geometry::from_kib(Some(64)).1, None);
        assert_eq!(Geometry::from_kib(Some(2048)).1, None);
    }

    #[test]
    fn aligns_down_to_block() {
        let (geometry, adjustment) = Geometry::from_bytes(100 * 1024 + 1);
        assert_eq!(geometry.size(), 100 * 1024);
        assert_eq!(adjustment, None);

        let (geometry, _) = Geometry::from_kib(Some(101));
        assert_eq!(geometry.size(), 100 * 1024);
        assert_eq!(geometry.size_kib(), 100);
    }

    quickcheck::quickcheck! {
        fn size_is_aligned_and_bounded(kib: u64) -> bool {
            let (geometry, _) = Geometry::from_kib(Some(kib));
            let size = geometry.size() as u64;
            size % BLOCK_SIZE as u64 == 0
                && (MIN_SIZE..=MAX_SIZE).contains(&size)
                && geometry.block_size() % geometry.page_size() == 0
        }

        fn in_range_sizes_only_lose_the_remainder(bytes: u64) -> bool {
            let bytes = MIN_SIZE + bytes % (MAX_SIZE - MIN_SIZE);
            let (geometry, adjustment) = Geometry::from_bytes(bytes);
            adjustment.is_none() && bytes - geometry.size() as u64 < BLOCK_SIZE as u64
        }
    }
}
