//! Alignment record representation used throughout the junction search
//!

use rust_htslib::bam::record::Cigar;
use rust_htslib::{bam, htslib};
use strum::IntoStaticStr;

use crate::bam_utils::{SplitReadSegment, get_first_split_read_segment, get_mate_alignment_end};
use crate::chrom_list::ChromList;
use crate::cigar_utils::{
    get_cigar_aligned_base_count, get_soft_clip_lengths, update_ref_and_read_pos,
};
use crate::read_filters::ReadFilters;
use crate::read_id_trimmer::ReadIdTrimmer;

/// Minimum fraction of the sequencer 3' soft clip which must be G (or C on the reverse strand)
/// to flag a poly-G clip
const POLY_G_MIN_FRACTION: f64 = 0.9;

/// Side of a breakpoint faced by the aligned portion of a read
///
/// Positive orientation means the aligned portion ends at the breakpoint, negative means the
/// aligned portion starts at the breakpoint.
///
#[derive(Clone, Copy, Debug, Eq, Hash, Ord, PartialEq, PartialOrd)]
pub enum Orientation {
    Positive,
    Negative,
}

impl Orientation {
    pub fn from_strand(is_fwd_strand: bool) -> Self {
        if is_fwd_strand {
            Self::Positive
        } else {
            Self::Negative
        }
    }

    pub fn from_int(val: i64) -> Option<Self> {
        match val {
            1 => Some(Self::Positive),
            -1 => Some(Self::Negative),
            _ => None,
        }
    }

    pub fn as_int(&self) -> i8 {
        match self {
            Self::Positive => 1,
            Self::Negative => -1,
        }
    }
}

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum ClipSide {
    Left,
    Right,
}

impl ClipSide {
    /// Orientation of the junction implied by a soft clip on this side
    pub fn orientation(&self) -> Orientation {
        match self {
            Self::Left => Orientation::Negative,
            Self::Right => Orientation::Positive,
        }
    }

    pub fn from_orientation(orientation: Orientation) -> Self {
        match orientation {
            Orientation::Positive => Self::Right,
            Orientation::Negative => Self::Left,
        }
    }
}

/// Evidence classification of each read
///
#[derive(Clone, Copy, Debug, Eq, IntoStaticStr, PartialEq)]
pub enum ReadType {
    NoSupport,
    CandidateSupport,
    Support,
    ExactSupport,
    Junction,
    Recovered,
    Blacklisted,
    Unmatched,
}

impl ReadType {
    /// Order of evidence strength used when the same read is observed by more than one partition
    pub fn evidence_rank(&self) -> u8 {
        match self {
            Self::Junction => 4,
            Self::ExactSupport => 3,
            Self::Support => 2,
            Self::CandidateSupport => 1,
            _ => 0,
        }
    }
}

/// Supplementary alignment details taken from the first SA tag segment
pub type SupplementaryData = SplitReadSegment;

#[derive(Clone, Debug)]
pub struct AlignedRead {
    pub read_id: String,
    pub chrom_index: usize,

    /// 1-indexed position of the first aligned reference base
    pub start: i64,

    /// 1-indexed position of the last aligned reference base
    pub end: i64,

    pub cigar: Vec<Cigar>,
    pub flags: u16,
    pub mapq: u8,
    pub seq: Vec<u8>,
    pub qual: Vec<u8>,

    /// None when the mate is unmapped or on an unknown chromosome
    pub mate_chrom_index: Option<usize>,

    /// 1-indexed mate alignment start
    pub mate_start: i64,

    /// Mate alignment end, only known when the MC tag is present
    pub mate_end: Option<i64>,

    pub supplementary_data: Option<SupplementaryData>,
    pub insert_size: i64,
    pub left_clip: usize,
    pub right_clip: usize,
    pub aligned_base_count: usize,
    pub has_poly_g_clip: bool,
    pub filters: ReadFilters,
    pub read_type: ReadType,
}

fn is_flag_set(flags: u16, flag: u32) -> bool {
    (flags as u32 & flag) != 0
}

impl AlignedRead {
    pub fn from_bam_record(
        record: &bam::Record,
        chrom_list: &ChromList,
        read_id_trimmer: Option<&ReadIdTrimmer>,
    ) -> Self {
        let read_id = String::from_utf8_lossy(record.qname());
        let read_id = match read_id_trimmer {
            Some(x) => x.trim(&read_id).to_string(),
            None => read_id.to_string(),
        };
        let chrom_index = record.tid() as usize;
        let start = record.pos() + 1;
        let cigar_view = record.cigar();
        let end = cigar_view.end_pos();
        let cigar = cigar_view.take().0;

        let flags = record.flags();
        let mate_chrom_index = if is_flag_set(flags, htslib::BAM_FMUNMAP)
            || record.mtid() < 0
            || record.mtid() as usize >= chrom_list.data.len()
        {
            None
        } else {
            Some(record.mtid() as usize)
        };

        let (left_clip, right_clip) = get_soft_clip_lengths(&cigar);
        let aligned_base_count = get_cigar_aligned_base_count(&cigar);
        let seq = record.seq().as_bytes();

        let mut read = Self {
            read_id,
            chrom_index,
            start,
            end,
            cigar,
            flags,
            mapq: record.mapq(),
            seq,
            qual: record.qual().to_vec(),
            mate_chrom_index,
            mate_start: record.mpos() + 1,
            mate_end: get_mate_alignment_end(record),
            supplementary_data: get_first_split_read_segment(chrom_list, record),
            insert_size: record.insert_size(),
            left_clip,
            right_clip,
            aligned_base_count,
            has_poly_g_clip: false,
            filters: ReadFilters::default(),
            read_type: ReadType::NoSupport,
        };
        read.has_poly_g_clip = read.is_poly_g_clip();
        read
    }

    pub fn is_paired(&self) -> bool {
        is_flag_set(self.flags, htslib::BAM_FPAIRED)
    }

    pub fn is_proper_pair(&self) -> bool {
        is_flag_set(self.flags, htslib::BAM_FPROPER_PAIR)
    }

    pub fn is_reverse(&self) -> bool {
        is_flag_set(self.flags, htslib::BAM_FREVERSE)
    }

    pub fn is_mate_reverse(&self) -> bool {
        is_flag_set(self.flags, htslib::BAM_FMREVERSE)
    }

    pub fn is_first_in_pair(&self) -> bool {
        is_flag_set(self.flags, htslib::BAM_FREAD1)
    }

    pub fn is_supplementary(&self) -> bool {
        is_flag_set(self.flags, htslib::BAM_FSUPPLEMENTARY)
    }

    pub fn read_len(&self) -> usize {
        self.seq.len()
    }

    pub fn clip_length(&self, side: ClipSide) -> usize {
        match side {
            ClipSide::Left => self.left_clip,
            ClipSide::Right => self.right_clip,
        }
    }

    /// The longer soft clip side, right side preferred on ties, None if unclipped
    pub fn dominant_clip_side(&self) -> Option<ClipSide> {
        if self.left_clip == 0 && self.right_clip == 0 {
            None
        } else if self.left_clip > self.right_clip {
            Some(ClipSide::Left)
        } else {
            Some(ClipSide::Right)
        }
    }

    /// Reference position of the aligned base adjacent to the given soft clip side
    pub fn clip_boundary(&self, side: ClipSide) -> i64 {
        match side {
            ClipSide::Left => self.start,
            ClipSide::Right => self.end,
        }
    }

    /// Orientation used to match this read against junctions, taken from the dominant clip if
    /// any, otherwise from the strand
    pub fn orientation(&self) -> Orientation {
        match self.dominant_clip_side() {
            Some(side) => side.orientation(),
            None => Orientation::from_strand(!self.is_reverse()),
        }
    }

    /// Read index range of the soft clip on the given side
    pub fn clip_read_range(&self, side: ClipSide) -> std::ops::Range<usize> {
        match side {
            ClipSide::Left => 0..self.left_clip,
            ClipSide::Right => (self.read_len() - self.right_clip)..self.read_len(),
        }
    }

    /// Number of soft-clipped bases on the given side with quality at or above `min_qual`
    pub fn clip_high_qual_count(&self, side: ClipSide, min_qual: u8) -> usize {
        self.qual[self.clip_read_range(side)]
            .iter()
            .filter(|&&q| q >= min_qual)
            .count()
    }

    /// Find all deletions and insertions of at least `min_indel_length`
    ///
    /// Each indel is returned as the reference positions of the aligned bases immediately before
    /// and after the event
    ///
    pub fn get_indel_boundaries(&self, min_indel_length: u32) -> Vec<(i64, i64)> {
        let mut boundaries = Vec::new();
        let mut ref_pos = self.start;
        let mut read_pos = 0;
        for c in self.cigar.iter() {
            match c {
                Cigar::Del(len) if *len >= min_indel_length => {
                    boundaries.push((ref_pos - 1, ref_pos + *len as i64));
                }
                Cigar::Ins(len) if *len >= min_indel_length => {
                    boundaries.push((ref_pos - 1, ref_pos));
                }
                _ => {}
            }
            update_ref_and_read_pos(c, &mut ref_pos, &mut read_pos);
        }
        boundaries
    }

    pub fn has_qualifying_indel(&self, min_indel_length: u32) -> bool {
        self.cigar.iter().any(|c| match c {
            Cigar::Del(len) | Cigar::Ins(len) => *len >= min_indel_length,
            _ => false,
        })
    }

    /// Test whether the soft clip at the 3' end of the sequenced read is dominated by G
    ///
    fn is_poly_g_clip(&self) -> bool {
        let (side, base) = if self.is_reverse() {
            (ClipSide::Left, b'C')
        } else {
            (ClipSide::Right, b'G')
        };
        let clip_len = self.clip_length(side);
        if clip_len == 0 {
            return false;
        }
        let base_count = self.seq[self.clip_read_range(side)]
            .iter()
            .filter(|&&b| b == base)
            .count();
        (base_count as f64) >= (clip_len as f64) * POLY_G_MIN_FRACTION
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::*;

    #[test]
    fn test_from_bam_record() {
        let read = get_test_read(&get_clipped_read_sam("frag1", 1431, "70M30S", 0));
        assert_eq!(read.start, 1431);
        assert_eq!(read.end, 1500);
        assert_eq!((read.left_clip, read.right_clip), (0, 30));
        assert_eq!(read.aligned_base_count, 70);
        assert_eq!(read.dominant_clip_side(), Some(ClipSide::Right));
        assert_eq!(read.orientation(), Orientation::Positive);
        assert_eq!(read.clip_high_qual_count(ClipSide::Right, 30), 30);
        assert!(read.mate_chrom_index.is_none());
        assert!(!read.has_poly_g_clip);
    }

    #[test]
    fn test_mate_info() {
        let sam_line = format!(
            "frag1\t97\tchr1\t4901\t60\t100M\tchr2\t9000\t0\t{TEST_READ_SEQ}\t{}\tMC:Z:100M",
            test_qual_str()
        );
        let read = get_test_read(&sam_line);
        assert_eq!(read.mate_chrom_index, Some(1));
        assert_eq!(read.mate_start, 9000);
        assert_eq!(read.mate_end, Some(9099));
        assert!(read.is_first_in_pair());
        assert!(read.is_mate_reverse());
        assert_eq!(read.orientation(), Orientation::Positive);
    }

    #[test]
    fn test_get_indel_boundaries() {
        let read = get_test_read(&get_clipped_read_sam("frag1", 1001, "50M40D50M", 0));
        assert_eq!(read.get_indel_boundaries(32), vec![(1050, 1091)]);
        assert!(read.get_indel_boundaries(41).is_empty());

        let read = get_test_read(&get_clipped_read_sam("frag1", 1001, "30M35I35M", 0));
        assert_eq!(read.get_indel_boundaries(32), vec![(1030, 1031)]);
        assert!(read.has_qualifying_indel(32));
    }

    #[test]
    fn test_poly_g_clip() {
        let seq = format!("{}{}", &TEST_READ_SEQ[..80], "GGGGGGGGGGGGGGGGGGGG");
        let sam_line = format!("frag1\t0\tchr1\t1001\t60\t80M20S\t*\t0\t0\t{seq}\t{}", test_qual_str());
        let read = get_test_read(&sam_line);
        assert!(read.has_poly_g_clip);

        // The same clip on the 5' end of a reverse strand read is not a sequencer artifact:
        let sam_line = format!("frag1\t16\tchr1\t1001\t60\t80M20S\t*\t0\t0\t{seq}\t{}", test_qual_str());
        let read = get_test_read(&sam_line);
        assert!(!read.has_poly_g_clip);
    }

    #[test]
    fn test_read_id_trimming() {
        let trimmer = ReadIdTrimmer::from_first_read_id("A00624:8:HHKYHDSXX:2:1101:10004:10019");
        let sam_line = get_clipped_read_sam("A00624:8:HHKYHDSXX:2:1465:31159:5900", 1001, "100M", 0);
        let record = get_test_record(&sam_line);
        let read = AlignedRead::from_bam_record(&record, &get_test_chrom_list(), Some(&trimmer));
        assert_eq!(read.read_id, "1465:31159:5900");
    }
}
