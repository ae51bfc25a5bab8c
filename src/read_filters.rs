//! Per-read filter evaluation and initial evidence classification
//!

use strum::{EnumCount, EnumIter, IntoEnumIterator, IntoStaticStr};

use crate::aligned_read::{AlignedRead, ClipSide, ReadType};
use crate::prep_config::{PrepConfig, ReadFilterConfig};

/// Number of bases checked on each side of a soft-clip boundary for a short repeat
pub const REPEAT_CHECK_WINDOW: usize = 6;

/// Largest repeat unit size checked at a soft-clip boundary
const MAX_REPEAT_UNIT: usize = 3;

#[derive(Clone, Copy, Debug, EnumCount, EnumIter, Eq, IntoStaticStr, PartialEq)]
pub enum ReadFilterType {
    MinAlignedBases,
    MinMapQual,
    InsertMapOverlap,
    SoftClipLength,
    SoftClipBaseQual,
    BreakInRepeat,
    PolyGClip,
}

impl ReadFilterType {
    fn mask(&self) -> u32 {
        1 << (*self as u32)
    }

    /// True for the filters which only describe the soft clip quality
    pub fn is_soft_clip_filter(&self) -> bool {
        use ReadFilterType::*;
        matches!(
            self,
            SoftClipLength | SoftClipBaseQual | BreakInRepeat | PolyGClip
        )
    }
}

/// Set of failed filters for one read
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub struct ReadFilters(u32);

impl ReadFilters {
    pub fn set(&mut self, filter: ReadFilterType) {
        self.0 |= filter.mask();
    }

    pub fn contains(&self, filter: ReadFilterType) -> bool {
        (self.0 & filter.mask()) != 0
    }

    pub fn is_empty(&self) -> bool {
        self.0 == 0
    }

    pub fn iter(&self) -> impl Iterator<Item = ReadFilterType> + '_ {
        ReadFilterType::iter().filter(|x| self.contains(*x))
    }

    /// True if any filters are set and all of them are soft-clip filters
    pub fn only_soft_clip_filters(&self) -> bool {
        !self.is_empty() && self.iter().all(|x| x.is_soft_clip_filter())
    }
}

/// Test whether the bases around a soft-clip boundary form a short tandem repeat
///
/// The window of `REPEAT_CHECK_WINDOW` bases on each side of the boundary is tested for
/// periodicity at each repeat unit size up to `MAX_REPEAT_UNIT`.
///
pub fn is_break_in_repeat(read: &AlignedRead, side: ClipSide) -> bool {
    let boundary = match side {
        ClipSide::Left => read.left_clip,
        ClipSide::Right => read.read_len() - read.right_clip,
    };
    if boundary < REPEAT_CHECK_WINDOW || boundary + REPEAT_CHECK_WINDOW > read.read_len() {
        return false;
    }
    let window = &read.seq[(boundary - REPEAT_CHECK_WINDOW)..(boundary + REPEAT_CHECK_WINDOW)];
    (1..=MAX_REPEAT_UNIT).any(|unit| (unit..window.len()).all(|i| window[i] == window[i - unit]))
}

pub fn check_filters(read: &AlignedRead, config: &ReadFilterConfig) -> ReadFilters {
    use ReadFilterType::*;

    let mut filters = ReadFilters::default();

    if read.aligned_base_count < config.min_alignment_bases {
        filters.set(MinAlignedBases);
    }

    if read.mapq < config.min_map_quality {
        filters.set(MinMapQual);
    }

    if read.is_proper_pair()
        && read.insert_size != 0
        && read.insert_size.abs() - (read.aligned_base_count as i64)
            < config.min_insert_alignment_overlap
    {
        filters.set(InsertMapOverlap);
    }

    match read.dominant_clip_side() {
        Some(side) => {
            let clip_len = read.clip_length(side);
            if clip_len < config.min_soft_clip_length {
                filters.set(SoftClipLength);
            } else if is_break_in_repeat(read, side) {
                filters.set(BreakInRepeat);
            }

            let high_qual_count = read.clip_high_qual_count(side, config.soft_clip_high_qual);
            if high_qual_count * 100 < clip_len * config.min_soft_clip_high_qual_perc {
                filters.set(SoftClipBaseQual);
            }
        }
        None => {
            filters.set(SoftClipLength);
            filters.set(SoftClipBaseQual);
        }
    }

    if read.has_poly_g_clip {
        filters.set(PolyGClip);
    }

    filters
}

/// Test whether the read could support a junction without matching it exactly
///
/// This is true for any chimeric read (supplementary alignment, long insert, mate unmapped or
/// on another chromosome, read and mate on the same strand) or any soft-clipped read.
///
pub fn is_candidate_supporting_read(read: &AlignedRead, config: &ReadFilterConfig) -> bool {
    if read.supplementary_data.is_some() {
        return true;
    }

    if read.is_paired() {
        match read.mate_chrom_index {
            None => return true,
            Some(mate_chrom_index) => {
                if mate_chrom_index != read.chrom_index
                    || read.insert_size.abs() > config.max_fragment_length
                    || read.is_reverse() == read.is_mate_reverse()
                {
                    return true;
                }
            }
        }
    }

    read.left_clip > 0 || read.right_clip > 0
}

/// Assign the initial evidence type of a read
///
/// `filters` must already be set on the read
///
pub fn classify_read(read: &AlignedRead, config: &PrepConfig, is_blacklisted: bool) -> ReadType {
    if is_blacklisted {
        return ReadType::Blacklisted;
    }

    if read.filters.is_empty()
        || (read.filters.only_soft_clip_filters()
            && read.has_qualifying_indel(config.min_indel_length))
    {
        return ReadType::Junction;
    }

    if !read.filters.contains(ReadFilterType::MinMapQual)
        && is_candidate_supporting_read(read, &config.filters)
    {
        ReadType::CandidateSupport
    } else {
        ReadType::NoSupport
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::*;

    #[test]
    fn test_read_filters_bitset() {
        let mut filters = ReadFilters::default();
        assert!(filters.is_empty());
        filters.set(ReadFilterType::SoftClipLength);
        filters.set(ReadFilterType::PolyGClip);
        assert!(filters.contains(ReadFilterType::PolyGClip));
        assert!(!filters.contains(ReadFilterType::MinMapQual));
        assert!(filters.only_soft_clip_filters());
        assert_eq!(filters.iter().count(), 2);

        filters.set(ReadFilterType::MinMapQual);
        assert!(!filters.only_soft_clip_filters());
    }

    #[test]
    fn test_check_filters_clipped_read() {
        let config = ReadFilterConfig::default();
        let read = get_test_read(&get_clipped_read_sam("frag1", 1431, "70M30S", 0));
        assert!(check_filters(&read, &config).is_empty());

        let read = get_test_read(&get_clipped_read_sam("frag1", 1431, "80M20S", 0));
        let filters = check_filters(&read, &config);
        assert!(filters.contains(ReadFilterType::SoftClipLength));
        assert!(filters.only_soft_clip_filters());

        let read = get_test_read(&get_clipped_read_sam("frag1", 1461, "40S60M", 0));
        assert!(check_filters(&read, &config).is_empty());

        let read = get_test_read(&get_clipped_read_sam("frag1", 1431, "40M60S", 0));
        let filters = check_filters(&read, &config);
        assert!(filters.contains(ReadFilterType::MinAlignedBases));
    }

    #[test]
    fn test_check_filters_low_quality_clip() {
        let config = ReadFilterConfig::default();
        let qual = format!("{}{}", "D".repeat(70), "#".repeat(30));
        let sam_line =
            format!("frag1\t0\tchr1\t1431\t10\t70M30S\t*\t0\t0\t{TEST_READ_SEQ}\t{qual}");
        let read = get_test_read(&sam_line);
        let filters = check_filters(&read, &config);
        assert!(filters.contains(ReadFilterType::SoftClipBaseQual));
        assert!(filters.contains(ReadFilterType::MinMapQual));
        assert!(!filters.contains(ReadFilterType::SoftClipLength));
    }

    #[test]
    fn test_break_in_repeat() {
        let config = ReadFilterConfig::default();
        let seq = format!(
            "{}{}{}",
            &TEST_READ_SEQ[..64],
            "ACACACACACAC",
            &TEST_READ_SEQ[76..]
        );
        let sam_line =
            format!("frag1\t0\tchr1\t1431\t60\t70M30S\t*\t0\t0\t{seq}\t{}", test_qual_str());
        let read = get_test_read(&sam_line);
        assert!(is_break_in_repeat(&read, ClipSide::Right));
        let filters = check_filters(&read, &config);
        assert!(filters.contains(ReadFilterType::BreakInRepeat));

        let read = get_test_read(&get_clipped_read_sam("frag1", 1431, "70M30S", 0));
        assert!(!is_break_in_repeat(&read, ClipSide::Right));
    }

    #[test]
    fn test_insert_map_overlap() {
        let config = ReadFilterConfig::default();
        let sam_line = format!(
            "frag1\t99\tchr1\t1001\t60\t100M\t=\t1001\t102\t{TEST_READ_SEQ}\t{}",
            test_qual_str()
        );
        let read = get_test_read(&sam_line);
        assert!(check_filters(&read, &config).contains(ReadFilterType::InsertMapOverlap));
        assert!(!is_candidate_supporting_read(&read, &config));
    }

    #[test]
    fn test_is_candidate_supporting_read() {
        let config = ReadFilterConfig::default();
        let qual = test_qual_str();

        // Mate on other chromosome:
        let sam_line =
            format!("frag1\t97\tchr1\t4901\t60\t100M\tchr2\t9000\t0\t{TEST_READ_SEQ}\t{qual}");
        assert!(is_candidate_supporting_read(&get_test_read(&sam_line), &config));

        // Long insert:
        let sam_line =
            format!("frag1\t97\tchr1\t4901\t60\t100M\t=\t9000\t4199\t{TEST_READ_SEQ}\t{qual}");
        assert!(is_candidate_supporting_read(&get_test_read(&sam_line), &config));

        // Same strand:
        let sam_line =
            format!("frag1\t65\tchr1\t4901\t60\t100M\t=\t5200\t399\t{TEST_READ_SEQ}\t{qual}");
        assert!(is_candidate_supporting_read(&get_test_read(&sam_line), &config));

        // Mate unmapped:
        let sam_line =
            format!("frag1\t73\tchr1\t4901\t60\t100M\t=\t4901\t0\t{TEST_READ_SEQ}\t{qual}");
        assert!(is_candidate_supporting_read(&get_test_read(&sam_line), &config));

        // Normal pair:
        let sam_line =
            format!("frag1\t99\tchr1\t4901\t60\t100M\t=\t5200\t399\t{TEST_READ_SEQ}\t{qual}");
        assert!(!is_candidate_supporting_read(&get_test_read(&sam_line), &config));
    }

    #[test]
    fn test_classify_read() {
        let config = PrepConfig::default();

        let mut read = get_test_read(&get_clipped_read_sam("frag1", 1431, "70M30S", 0));
        read.filters = check_filters(&read, &config.filters);
        assert_eq!(classify_read(&read, &config, false), ReadType::Junction);
        assert_eq!(classify_read(&read, &config, true), ReadType::Blacklisted);

        let mut read = get_test_read(&get_clipped_read_sam("frag1", 1001, "50M40D50M", 0));
        read.filters = check_filters(&read, &config.filters);
        assert_eq!(classify_read(&read, &config, false), ReadType::Junction);

        let mut read = get_test_read(&get_clipped_read_sam("frag1", 1431, "80M20S", 0));
        read.filters = check_filters(&read, &config.filters);
        assert_eq!(classify_read(&read, &config, false), ReadType::CandidateSupport);

        let mut read = get_test_read(&get_clipped_read_sam("frag1", 1431, "100M", 0));
        read.filters = check_filters(&read, &config.filters);
        assert_eq!(classify_read(&read, &config, false), ReadType::NoSupport);
    }
}
