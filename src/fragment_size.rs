//! Empirical fragment length estimation
//!

use log::{info, warn};
use rust_htslib::bam;

use crate::alignment_source::AlignmentSource;
use crate::bam_utils::filter_out_alignment_record;
use crate::chrom_list::ChromList;

/// Fewer sampled fragments than this leave the default maximum fragment length in place
const MIN_FRAGMENT_SAMPLE_COUNT: usize = 100;

/// Limit on records scanned per sampled fragment before giving up
const MAX_RECORDS_PER_SAMPLE: usize = 20;

#[derive(Default)]
pub struct FragmentSizeDistribution {
    lengths: Vec<i64>,
    is_sorted: bool,
}

impl FragmentSizeDistribution {
    pub fn add_length(&mut self, length: i64) {
        self.lengths.push(length);
        self.is_sorted = false;
    }

    pub fn sample_count(&self) -> usize {
        self.lengths.len()
    }

    /// Fragment length at the given quantile in [0,1]
    pub fn quantile(&mut self, quantile: f64) -> Option<i64> {
        assert!((0.0..=1.0).contains(&quantile));
        if self.lengths.is_empty() {
            return None;
        }
        if !self.is_sorted {
            self.lengths.sort_unstable();
            self.is_sorted = true;
        }
        let index = ((self.lengths.len() - 1) as f64 * quantile).round() as usize;
        Some(self.lengths[index])
    }
}

/// Test whether a record contributes one fragment length observation
///
/// Each proper pair is counted once, from the read with the positive insert size.
///
fn is_fragment_length_record(record: &bam::Record, min_mapq: u8) -> bool {
    !filter_out_alignment_record(record)
        && record.is_paired()
        && record.is_proper_pair()
        && !record.is_supplementary()
        && record.tid() == record.mtid()
        && record.insert_size() > 0
        && record.mapq() >= min_mapq
}

/// Sample fragment lengths from proper pairs, starting from the first chromosome
///
pub fn sample_fragment_lengths(
    source: &mut dyn AlignmentSource,
    chrom_list: &ChromList,
    sample_count: usize,
    min_mapq: u8,
) -> FragmentSizeDistribution {
    let mut distribution = FragmentSizeDistribution::default();
    let max_scan_count = sample_count * MAX_RECORDS_PER_SAMPLE;
    let mut scan_count = 0;
    for chrom_index in 0..chrom_list.data.len() {
        let chrom_length = chrom_list.length(chrom_index) as i64;
        if chrom_length == 0 {
            continue;
        }
        source.visit_region(chrom_index, 1, chrom_length, &mut |record| {
            scan_count += 1;
            if is_fragment_length_record(record, min_mapq) {
                distribution.add_length(record.insert_size());
            }
            distribution.sample_count() < sample_count && scan_count < max_scan_count
        });
        if distribution.sample_count() >= sample_count || scan_count >= max_scan_count {
            break;
        }
    }
    distribution
}

/// Estimate the maximum fragment length from the alignment source
///
/// Returns None if too few proper pairs were found to make an estimate.
///
pub fn estimate_max_fragment_length(
    source: &mut dyn AlignmentSource,
    chrom_list: &ChromList,
    sample_count: usize,
    quantile: f64,
    min_mapq: u8,
) -> Option<i64> {
    let mut distribution = sample_fragment_lengths(source, chrom_list, sample_count, min_mapq);
    if distribution.sample_count() < std::cmp::min(MIN_FRAGMENT_SAMPLE_COUNT, sample_count) {
        warn!(
            "Only {} proper pairs found for fragment length estimation, using default maximum fragment length",
            distribution.sample_count()
        );
        return None;
    }
    let max_fragment_length = distribution.quantile(quantile);
    if let Some(x) = max_fragment_length {
        info!(
            "Estimated maximum fragment length {x} from {} proper pairs",
            distribution.sample_count()
        );
    }
    max_fragment_length
}
