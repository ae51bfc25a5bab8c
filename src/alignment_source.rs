//! Region-sliced access to alignment records
//!

use rust_htslib::bam::{self, Read};
use unwrap::unwrap;

pub trait AlignmentSource {
    /// Visit every record starting within the 1-indexed closed range `[start, end]` of the given
    /// chromosome, in position order
    ///
    /// Visiting stops early when `visitor` returns false.
    ///
    fn visit_region(
        &mut self,
        chrom_index: usize,
        start: i64,
        end: i64,
        visitor: &mut dyn FnMut(&bam::Record) -> bool,
    );

    /// Find the first record starting at `position` accepted by `matcher`
    ///
    /// At most `max_scan_depth` records are tested before giving up.
    ///
    fn find_record(
        &mut self,
        chrom_index: usize,
        position: i64,
        max_scan_depth: usize,
        matcher: &mut dyn FnMut(&bam::Record) -> bool,
    ) -> Option<bam::Record> {
        let mut found = None;
        let mut scan_count = 0;
        self.visit_region(chrom_index, position, position, &mut |record| {
            scan_count += 1;
            if matcher(record) {
                found = Some(record.clone());
                return false;
            }
            scan_count < max_scan_depth
        });
        found
    }
}

impl AlignmentSource for bam::IndexedReader {
    fn visit_region(
        &mut self,
        chrom_index: usize,
        start: i64,
        end: i64,
        visitor: &mut dyn FnMut(&bam::Record) -> bool,
    ) {
        unwrap!(
            self.fetch(bam::FetchDefinition::Region(chrom_index as i32, start - 1, end)),
            "Unable to fetch alignment file region: {chrom_index}:{start}-{end}"
        );

        let mut record = bam::Record::new();
        while let Some(r) = self.read(&mut record) {
            unwrap!(r, "Failed to parse alignment record");

            // Skip records overlapping the region from an earlier start position
            if record.pos() + 1 < start {
                continue;
            }
            if !visitor(&record) {
                break;
            }
        }
    }
}
