/// Downsamples reads in high-depth segments of a partition
///
/// Reads are counted in fixed-size segments of the chromosome. Once the count in a segment
/// exceeds the threshold, only every Nth read is kept for the rest of the segment, where N
/// reflects how far the read rate exceeds the threshold. A segment directly following a
/// throttled segment starts throttled at the rate observed in its predecessor.
///
pub struct ReadRateTracker {
    segment_size: i64,
    threshold: usize,

    segment_start: Option<i64>,
    segment_count: usize,
    prior_segment_count: usize,

    /// Keep one in every `sample_interval` reads, or keep everything when this is 1
    sample_interval: usize,
    accept_index: usize,

    downsampled_count: usize,
}

impl ReadRateTracker {
    pub fn new(segment_size: i64, threshold: usize) -> Self {
        assert!(segment_size > 0);
        assert!(threshold > 0);
        Self {
            segment_size,
            threshold,
            segment_start: None,
            segment_count: 0,
            prior_segment_count: 0,
            sample_interval: 1,
            accept_index: 0,
            downsampled_count: 0,
        }
    }

    fn get_sample_interval(&self, rate: usize) -> usize {
        rate.div_ceil(self.threshold)
    }

    fn start_segment(&mut self, segment_start: i64) {
        let is_adjacent = self
            .segment_start
            .is_some_and(|x| x + self.segment_size == segment_start);
        self.prior_segment_count = if is_adjacent { self.segment_count } else { 0 };
        self.segment_start = Some(segment_start);
        self.segment_count = 0;
        self.accept_index = 0;
        self.sample_interval = if self.prior_segment_count > self.threshold {
            self.get_sample_interval(self.prior_segment_count)
        } else {
            1
        };
    }

    /// Returns true if the read starting at `position` should be kept
    ///
    /// Positions must be submitted in ascending order.
    ///
    pub fn accept(&mut self, position: i64) -> bool {
        let segment_start = position - position.rem_euclid(self.segment_size);
        if self.segment_start != Some(segment_start) {
            self.start_segment(segment_start);
        }

        self.segment_count += 1;
        if self.sample_interval == 1 && self.segment_count > self.threshold {
            let rate = std::cmp::max(self.prior_segment_count, self.threshold);
            self.sample_interval = std::cmp::max(2, self.get_sample_interval(rate));
            self.accept_index = 0;
        }

        if self.sample_interval == 1 {
            return true;
        }

        self.accept_index += 1;
        let is_accepted = (self.accept_index - 1) % self.sample_interval == 0;
        if !is_accepted {
            self.downsampled_count += 1;
        }
        is_accepted
    }

    pub fn is_throttled(&self) -> bool {
        self.sample_interval > 1
    }

    pub fn downsampled_count(&self) -> usize {
        self.downsampled_count
    }
}
