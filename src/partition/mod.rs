mod partition_slicer;
mod read_rate_tracker;
mod spanning_reconciler;

pub use partition_slicer::*;
pub use read_rate_tracker::*;
pub use spanning_reconciler::*;

use crate::base_range::BaseRange;
use crate::region_utils::ChromRegion;

/// One unit of concurrent work
///
/// Junctions are only created inside the core range. Reads are scanned from the larger fetch
/// window so that junctions near the core boundary collect the same support they would get in
/// any other partitioning.
///
/// Reads are fetched by start position, but support for a positive junction is measured from the
/// read end, so the left flank also covers one maximum read length.
///
#[derive(Clone, Debug)]
pub struct Partition {
    pub task_id: usize,
    pub chrom_index: usize,
    pub core: BaseRange,
    pub window: BaseRange,

    /// Unclipped flank sizes added to the core to form the window
    left_flank: i64,
    right_flank: i64,
}

impl Partition {
    pub fn new(
        task_id: usize,
        chrom_index: usize,
        core: BaseRange,
        max_support_distance: i64,
        max_read_length: i64,
        chrom_length: i64,
    ) -> Self {
        let left_flank = max_support_distance + max_read_length;
        let right_flank = max_support_distance;
        Self {
            task_id,
            chrom_index,
            core,
            window: BaseRange::new(
                std::cmp::max(core.start - left_flank, 1),
                std::cmp::min(core.end + right_flank, chrom_length),
            ),
            left_flank,
            right_flank,
        }
    }

    pub fn window_region(&self) -> ChromRegion {
        ChromRegion {
            chrom_index: self.chrom_index,
            range: self.window,
        }
    }

    /// True if reads starting in this range can't be scanned by any other partition
    ///
    /// The window of the preceding partition reaches `right_flank` bases into this core, and the
    /// window of the following partition reaches `left_flank` bases into it.
    ///
    pub fn is_private_range(&self, start_range: &BaseRange) -> bool {
        start_range.start >= self.core.start + self.right_flank
            && start_range.end <= self.core.end - self.left_flank
    }
}
