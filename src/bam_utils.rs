//! Miscellaneous BAM record processing utilities
//!

use rust_htslib::bam::record::Cigar;
use rust_htslib::{bam, htslib};

use crate::chrom_list::ChromList;
use crate::cigar_utils::{get_cigar_from_string, get_cigar_ref_offset, has_aligned_segments};

/// Check if the alignment record should be filtered from consideration in any part of the
/// junction search
///
pub fn filter_out_alignment_record(record: &bam::Record) -> bool {
    static FLAG_FILTER: u32 =
        htslib::BAM_FUNMAP | htslib::BAM_FSECONDARY | htslib::BAM_FQCFAIL | htslib::BAM_FDUP;

    ((record.flags() as u32) & FLAG_FILTER) != 0
}

/// Retrieve a string aux tag from a bam record
///
/// Returns None if the tag is missing or is not a string
///
pub fn get_optional_string_aux_tag(record: &bam::Record, aux_tag: &[u8]) -> Option<String> {
    match record.aux(aux_tag) {
        Ok(bam::record::Aux::String(val)) => Some(val.to_string()),
        _ => None,
    }
}

/// One segment from a BAM split alignment SA tag
#[derive(Clone, Debug)]
pub struct SplitReadSegment {
    pub chrom_index: usize,

    /// 1-indexed alignment start position
    pub start: i64,

    pub cigar: Vec<Cigar>,

    pub is_fwd_strand: bool,

    pub mapq: u8,
}

impl SplitReadSegment {
    /// 1-indexed position of the last aligned reference base
    pub fn end(&self) -> i64 {
        self.start + get_cigar_ref_offset(&self.cigar) - 1
    }
}

/// Parse one segment from the bam SA aux tag string into a split alignment object
///
/// Returns None if the segment is malformed or refers to a contig missing from `chrom_list`
///
pub fn parse_sa_segment(chrom_list: &ChromList, seg: &str) -> Option<SplitReadSegment> {
    let sa_fields = seg.split_terminator(',').collect::<Vec<_>>();
    if sa_fields.len() != 6 {
        return None;
    }
    let chrom_index = *chrom_list.label_to_index.get(sa_fields[0])?;
    let start = sa_fields[1].parse::<i64>().ok()?;
    let is_fwd_strand = sa_fields[2] == "+";
    let cigar = get_cigar_from_string(sa_fields[3])?;
    if !has_aligned_segments(&cigar) {
        return None;
    }
    let mapq = sa_fields[4].parse::<u8>().ok()?;
    Some(SplitReadSegment {
        chrom_index,
        start,
        cigar,
        is_fwd_strand,
        mapq,
    })
}

/// Parse the first (most relevant) segment of the SA aux tag, if any
///
pub fn get_first_split_read_segment(
    chrom_list: &ChromList,
    record: &bam::Record,
) -> Option<SplitReadSegment> {
    const SA_AUX_TAG: &[u8] = b"SA";
    let sa_aux_val = get_optional_string_aux_tag(record, SA_AUX_TAG)?;
    let first_segment = sa_aux_val.split_terminator(';').next()?;
    parse_sa_segment(chrom_list, first_segment)
}

/// Get the 1-indexed mate alignment end from the MC aux tag, if present
///
pub fn get_mate_alignment_end(record: &bam::Record) -> Option<i64> {
    const MC_AUX_TAG: &[u8] = b"MC";
    let mate_cigar = get_cigar_from_string(&get_optional_string_aux_tag(record, MC_AUX_TAG)?)?;
    let ref_offset = get_cigar_ref_offset(&mate_cigar);
    if ref_offset == 0 {
        return None;
    }
    Some(record.mpos() + ref_offset)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::{get_test_chrom_list, get_test_header};

    #[test]
    fn test_filter_out_alignment_record() {
        let header = get_test_header();

        // Unmapped read:
        let sam_line =
            b"qname\t4\t*\t0\t255\t*\t*\t0\t0\tACGCCGTATCGTCTCGAGGA\tDDDDDEEEEEDDDDDEEEEE";
        let rec = bam::Record::from_sam(&header, sam_line).unwrap();
        assert!(filter_out_alignment_record(&rec));

        // Duplicate read:
        let sam_line =
            b"qname\t1024\tchr1\t10\t60\t20M\t*\t0\t0\tACGCCGTATCGTCTCGAGGA\tDDDDDEEEEEDDDDDEEEEE";
        let rec = bam::Record::from_sam(&header, sam_line).unwrap();
        assert!(filter_out_alignment_record(&rec));

        // Mapped read:
        let sam_line =
            b"qname\t0\tchr1\t10\t60\t20M\t*\t0\t0\tACGCCGTATCGTCTCGAGGA\tDDDDDEEEEEDDDDDEEEEE";
        let rec = bam::Record::from_sam(&header, sam_line).unwrap();
        assert!(!filter_out_alignment_record(&rec));
    }

    #[test]
    fn test_parse_sa_segment() {
        let chrom_list = get_test_chrom_list();

        let seg = parse_sa_segment(&chrom_list, "chr2,10001,-,30S70M,60,2").unwrap();
        assert_eq!(seg.chrom_index, 1);
        assert_eq!(seg.start, 10_001);
        assert_eq!(seg.end(), 10_070);
        assert!(!seg.is_fwd_strand);

        // Unknown contig and malformed segments are tolerated:
        assert!(parse_sa_segment(&chrom_list, "chrUn,10001,-,30S70M,60,2").is_none());
        assert!(parse_sa_segment(&chrom_list, "chr2,10001,-,30S70M").is_none());
    }

    #[test]
    fn test_get_first_split_read_segment() {
        let header = get_test_header();
        let chrom_list = get_test_chrom_list();

        let sam_line = b"qname\t0\tchr1\t10\t60\t10M10S\t*\t0\t0\tACGCCGTATCGTCTCGAGGA\tDDDDDEEEEEDDDDDEEEEE\tSA:Z:chr2,500,+,10S10M,50,0;chr1,900,+,10S10M,10,0;";
        let rec = bam::Record::from_sam(&header, sam_line).unwrap();
        let seg = get_first_split_read_segment(&chrom_list, &rec).unwrap();
        assert_eq!(seg.chrom_index, 1);
        assert_eq!(seg.start, 500);
        assert_eq!(seg.mapq, 50);
    }

    #[test]
    fn test_get_mate_alignment_end() {
        let header = get_test_header();
        let sam_line = b"qname\t97\tchr1\t10\t60\t20M\tchr1\t200\t0\tACGCCGTATCGTCTCGAGGA\tDDDDDEEEEEDDDDDEEEEE\tMC:Z:5S15M";
        let rec = bam::Record::from_sam(&header, sam_line).unwrap();
        assert_eq!(get_mate_alignment_end(&rec), Some(214));
    }
}
