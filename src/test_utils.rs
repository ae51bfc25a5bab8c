//! Shared fixtures for unit tests
//!

use rust_htslib::bam::{self, Header, HeaderView, header};

use crate::aligned_read::AlignedRead;
use crate::alignment_source::AlignmentSource;
use crate::chrom_list::ChromList;

/// Read sequence without short tandem repeats, used for all synthetic reads
pub const TEST_READ_SEQ: &str = "GCTAAAGACAATTACATAACATACACGTCAGCACGAAACTTGTTGGCCCAGTGTGAATCGCTTAAGGGTTAAGTAAGTGTGATGCATACGCCTTTACTTG";

pub const TEST_CHROM_LENGTH: i64 = 100_000;

pub fn test_qual_str() -> String {
    "D".repeat(TEST_READ_SEQ.len())
}

pub fn get_test_header() -> HeaderView {
    let mut header = Header::new();
    for chrom in ["chr1", "chr2"] {
        header.push_record(
            header::HeaderRecord::new(b"SQ")
                .push_tag(b"SN", chrom)
                .push_tag(b"LN", TEST_CHROM_LENGTH),
        );
    }
    HeaderView::from_header(&header)
}

pub fn get_test_chrom_list() -> ChromList {
    ChromList::from_bam_header(&get_test_header())
}

pub fn get_test_record(sam_line: &str) -> bam::Record {
    bam::Record::from_sam(&get_test_header(), sam_line.as_bytes()).unwrap()
}

pub fn get_test_read(sam_line: &str) -> AlignedRead {
    AlignedRead::from_bam_record(&get_test_record(sam_line), &get_test_chrom_list(), None)
}

/// SAM line for an unpaired chr1 read with the standard test sequence
pub fn get_clipped_read_sam(read_id: &str, pos: i64, cigar: &str, flags: u16) -> String {
    format!(
        "{read_id}\t{flags}\tchr1\t{pos}\t60\t{cigar}\t*\t0\t0\t{TEST_READ_SEQ}\t{}",
        test_qual_str()
    )
}

/// SAM line for one read of a chr1 pair, with a 100M mate at `mate_chrom:mate_pos`
pub fn get_paired_read_sam(
    read_id: &str,
    flags: u16,
    pos: i64,
    mate_chrom: &str,
    mate_pos: i64,
    insert_size: i64,
) -> String {
    format!(
        "{read_id}\t{flags}\tchr1\t{pos}\t60\t100M\t{mate_chrom}\t{mate_pos}\t{insert_size}\t{TEST_READ_SEQ}\t{}\tMC:Z:100M",
        test_qual_str()
    )
}

/// In-memory alignment source over position-sorted records
pub struct TestAlignmentSource {
    records: Vec<bam::Record>,
}

impl TestAlignmentSource {
    pub fn new(mut records: Vec<bam::Record>) -> Self {
        records.sort_by_key(|x| (x.tid(), x.pos()));
        Self { records }
    }

    pub fn from_sam_lines(sam_lines: &[String]) -> Self {
        Self::new(sam_lines.iter().map(|x| get_test_record(x)).collect())
    }
}

impl AlignmentSource for TestAlignmentSource {
    fn visit_region(
        &mut self,
        chrom_index: usize,
        start: i64,
        end: i64,
        visitor: &mut dyn FnMut(&bam::Record) -> bool,
    ) {
        for record in self.records.iter() {
            let pos = record.pos() + 1;
            if record.tid() as usize != chrom_index || pos < start {
                continue;
            }
            if pos > end || !visitor(record) {
                break;
            }
        }
    }
}
