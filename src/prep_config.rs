//! Junction search parameters
//!

/// Thresholds used to compute the filter status of each read
#[derive(Clone, Debug)]
pub struct ReadFilterConfig {
    pub min_alignment_bases: usize,
    pub min_map_quality: u8,

    /// Minimum difference between the insert size and aligned base count for proper pairs
    pub min_insert_alignment_overlap: i64,

    pub min_soft_clip_length: usize,

    /// Base quality at or above which a soft-clipped base counts as high quality
    pub soft_clip_high_qual: u8,

    /// Minimum percentage of high-quality bases required in the dominant soft clip
    pub min_soft_clip_high_qual_perc: usize,

    /// Insert sizes above this value are treated as discordant
    pub max_fragment_length: i64,
}

impl Default for ReadFilterConfig {
    fn default() -> Self {
        Self {
            min_alignment_bases: 50,
            min_map_quality: 20,
            min_insert_alignment_overlap: 5,
            min_soft_clip_length: 30,
            soft_clip_high_qual: 30,
            min_soft_clip_high_qual_perc: 75,
            max_fragment_length: 1000,
        }
    }
}

/// Immutable parameter set shared by all partitions of one run
#[derive(Clone, Debug)]
pub struct PrepConfig {
    pub filters: ReadFilterConfig,

    /// Minimum deletion or insertion length required to create junctions from a read's cigar
    pub min_indel_length: u32,

    /// Maximum distance between a read's clip boundary and a junction for exact support testing
    pub exact_support_distance: i64,

    /// Maximum distance between a read and a junction for any type of support
    pub max_support_distance: i64,

    /// Upper bound on the reference span of one alignment, used to size partition windows
    pub max_read_length: i64,

    /// Mismatches are only counted in exact support testing if both bases are at
    /// least this quality
    pub low_base_qual_threshold: u8,

    pub max_exact_mismatches: usize,

    pub min_junction_support: usize,
    pub min_hotspot_support: usize,
    pub min_junction_mapq: u8,

    /// Support and exact support group lists stop growing at this size
    pub junction_fragment_cap: usize,

    pub max_partition_reads: usize,
    pub partition_size: u64,

    pub downsample_segment_size: i64,
    pub downsample_threshold: usize,

    /// Maximum records scanned when looking for each missing read of a spanning fragment
    pub max_recovery_scan_depth: usize,

    pub trim_read_id: bool,
    pub track_remotes: bool,
    pub capture_depth: bool,
}

impl PrepConfig {
    /// Set the maximum fragment length and the support distance derived from it
    pub fn set_max_fragment_length(&mut self, max_fragment_length: i64) {
        self.filters.max_fragment_length = max_fragment_length;
        self.max_support_distance = max_fragment_length;
    }
}

impl Default for PrepConfig {
    fn default() -> Self {
        let filters = ReadFilterConfig::default();
        let max_support_distance = filters.max_fragment_length;
        Self {
            filters,
            min_indel_length: 32,
            exact_support_distance: 10,
            max_support_distance,
            max_read_length: 500,
            low_base_qual_threshold: 26,
            max_exact_mismatches: 1,
            min_junction_support: 2,
            min_hotspot_support: 1,
            min_junction_mapq: 20,
            junction_fragment_cap: 10000,
            max_partition_reads: 5_000_000,
            partition_size: 1_000_000,
            downsample_segment_size: 1000,
            downsample_threshold: 15000,
            max_recovery_scan_depth: 5000,
            trim_read_id: false,
            track_remotes: true,
            capture_depth: false,
        }
    }
}
