use std::fmt;

/// A closed range of 1-indexed reference positions, [start,end]
///
/// All read, junction and partition coordinates in this crate use this convention. Conversion from
/// the zero-indexed half-open convention of BAM and BED inputs happens at the input boundary.
///
#[derive(Clone, Copy, Default, Eq, Hash, PartialEq, Ord, PartialOrd)]
pub struct BaseRange {
    pub start: i64,
    pub end: i64,
}

impl BaseRange {
    pub fn new(start: i64, end: i64) -> Self {
        assert!(start <= end, "Invalid base range [{start},{end}]");
        Self { start, end }
    }

    /// Convert from the bed-style zero-indexed half-open range convention
    pub fn from_zero_based(start: i64, end: i64) -> Self {
        Self::new(start + 1, end)
    }

    pub fn size(&self) -> i64 {
        self.end - self.start + 1
    }

    pub fn contains(&self, pos: i64) -> bool {
        pos >= self.start && pos <= self.end
    }

    pub fn contains_range(&self, other: &BaseRange) -> bool {
        other.start >= self.start && other.end <= self.end
    }

    pub fn overlaps(&self, other: &BaseRange) -> bool {
        other.start <= self.end && other.end >= self.start
    }
}

impl fmt::Debug for BaseRange {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "[{}-{}]", self.start, self.end)
    }
}

/// Get the distance from `pos` to the range
///
/// The distance is 0 if the position is inside the range
///
pub fn get_pos_range_distance(range: &BaseRange, pos: i64) -> i64 {
    std::cmp::max(std::cmp::max(range.start - pos, pos - range.end), 0)
}
