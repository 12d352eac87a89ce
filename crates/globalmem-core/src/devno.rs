//! Device numbers

use std::fmt;

/// Bits reserved for the minor number
pub const MINORBITS: u32 = 20;

const MINORMASK: u32 = (1 << MINORBITS) - 1;

/// Largest major number that fits next to [`MINORBITS`]
pub const MAX_MAJOR: u32 = u32::MAX >> MINORBITS;

/// Packed `major:minor` device number
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct DevNumber(u32);

impl DevNumber {
    pub const fn new(major: u32, minor: u32) -> Self {
        debug_assert!(major <= MAX_MAJOR, "major number out of range");
        DevNumber((major << MINORBITS) | (minor & MINORMASK))
    }

    pub const fn major(self) -> u32 {
        self.0 >> MINORBITS
    }

    pub const fn minor(self) -> u32 {
        self.0 & MINORMASK
    }

    pub const fn as_raw(self) -> u32 {
        self.0
    }

    pub const fn from_raw(raw: u32) -> Self {
        DevNumber(raw)
    }
}

impl fmt::Display for DevNumber {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.major(), self.minor())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pack() {
        let dev = DevNumber::new(230, 0);
        assert_eq!(dev.as_raw(), 230 << 20);
        assert_eq!(dev.major(), 230);
        assert_eq!(dev.minor(), 0);
        assert_eq!(dev.to_string(), "230:0");
        assert_eq!(DevNumber::from_raw(dev.as_raw()), dev);
    }

    #[test]
    fn test_max_major() {
        assert_eq!(MAX_MAJOR, 4095);
        let dev = DevNumber::new(MAX_MAJOR, MINORMASK);
        assert_eq!(dev.major(), MAX_MAJOR);
        assert_eq!(dev.minor(), MINORMASK);
    }

    #[test]
    #[cfg(debug_assertions)]
    #[should_panic(expected = "major number out of range")]
    fn test_major_overflow_panics_in_debug() {
        let _ = DevNumber::new(MAX_MAJOR + 1, 0);
    }
}
