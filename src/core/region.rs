use crate::error::{AudioError, AudioResult};
use std::time::Duration;

/// A kept interval of a buffer, in sample indices `[start, end)`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Region {
    /// First sample index (inclusive)
    pub start: usize,
    /// One past the last sample index
    pub end: usize,
}

impl Region {
    /// Create a region, rejecting empty or inverted ranges
    pub fn new(start: usize, end: usize) -> AudioResult<Self> {
        if start >= end {
            return Err(AudioError::InvalidRegion {
                start,
                end,
                len: end,
            });
        }
        Ok(Region { start, end })
    }

    /// Number of samples covered
    pub fn len(&self) -> usize {
        self.end - self.start
    }

    /// Regions are never empty once constructed
    pub fn is_empty(&self) -> bool {
        self.start >= self.end
    }

    /// Duration of the region at the given sample rate
    pub fn duration(&self, sample_rate: u32) -> Duration {
        Duration::from_secs_f64(self.len() as f64 / sample_rate as f64)
    }

    /// Check the region lies inside a buffer of `len` samples
    pub fn check_bounds(&self, len: usize) -> AudioResult<()> {
        if self.start >= self.end || self.end > len {
            return Err(AudioError::InvalidRegion {
                start: self.start,
                end: self.end,
                len,
            });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_region_rejects_inverted() {
        assert!(Region::new(10, 10).is_err());
        assert!(Region::new(11, 10).is_err());
        assert_eq!(Region::new(0, 10).unwrap().len(), 10);
    }

    #[test]
    fn test_region_bounds() {
        let region = Region::new(100, 200).unwrap();
        assert!(region.check_bounds(200).is_ok());
        assert!(region.check_bounds(199).is_err());
        assert_eq!(region.duration(100), Duration::from_secs(1));
    }
}
