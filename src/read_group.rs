//! All reads of one sequenced fragment
//!

use std::collections::BTreeSet;

use crate::aligned_read::{AlignedRead, ReadType};
use crate::junctions::JunctionKey;
use crate::region_utils::ChromRegion;

/// Index of a read group in the partition's group arena
pub type GroupId = usize;

/// Identifies one alignment record in a fragment by its location and role
///
/// Mate and SA tag pointers are translated into this form to describe the records a
/// fragment is expected to contain.
///
#[derive(Clone, Copy, Debug, Eq, Hash, Ord, PartialEq, PartialOrd)]
pub struct ExpectedRead {
    pub chrom_index: usize,
    pub position: i64,
    pub first_in_pair: bool,
    pub supplementary: bool,
}

impl ExpectedRead {
    /// Key of the given read itself
    pub fn from_read(read: &AlignedRead) -> Self {
        Self {
            chrom_index: read.chrom_index,
            position: read.start,
            first_in_pair: read.is_first_in_pair(),
            supplementary: read.is_supplementary(),
        }
    }
}

/// Get all other records of the fragment pointed to by this read's mate and SA tag info
///
pub fn get_expected_reads(read: &AlignedRead) -> Vec<ExpectedRead> {
    let mut expected = Vec::new();
    if read.is_supplementary() {
        if let Some(sa) = &read.supplementary_data {
            expected.push(ExpectedRead {
                chrom_index: sa.chrom_index,
                position: sa.start,
                first_in_pair: read.is_first_in_pair(),
                supplementary: false,
            });
        }
        return expected;
    }

    if read.is_paired() {
        if let Some(mate_chrom_index) = read.mate_chrom_index {
            expected.push(ExpectedRead {
                chrom_index: mate_chrom_index,
                position: read.mate_start,
                first_in_pair: !read.is_first_in_pair(),
                supplementary: false,
            });
        }
    }
    if let Some(sa) = &read.supplementary_data {
        expected.push(ExpectedRead {
            chrom_index: sa.chrom_index,
            position: sa.start,
            first_in_pair: read.is_first_in_pair(),
            supplementary: true,
        });
    }
    expected
}

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum GroupStatus {
    /// A read expected inside the region has not been found yet
    Incomplete,

    /// All expected reads are present
    Complete,

    /// Both primary reads are present, a supplementary is expected outside the region
    PairedComplete,

    /// A primary read and its supplementary are present, the mate is expected outside the region
    SupplementaryComplete,

    /// Other reads are expected outside the region
    PartialSpanning,
}

#[derive(Clone, Debug)]
pub struct ReadGroup {
    pub id: String,
    pub reads: Vec<AlignedRead>,

    /// Junctions this fragment has been credited against
    pub junction_keys: BTreeSet<JunctionKey>,

    pub status: GroupStatus,
}

impl ReadGroup {
    pub fn new(read: AlignedRead) -> Self {
        Self {
            id: read.read_id.clone(),
            reads: vec![read],
            junction_keys: BTreeSet::new(),
            status: GroupStatus::Incomplete,
        }
    }

    pub fn contains_read(&self, key: &ExpectedRead) -> bool {
        self.reads.iter().any(|x| ExpectedRead::from_read(x) == *key)
    }

    /// Add a read to the fragment, duplicate records are ignored
    pub fn add_read(&mut self, read: AlignedRead) {
        assert_eq!(read.read_id, self.id);
        if !self.contains_read(&ExpectedRead::from_read(&read)) {
            self.reads.push(read);
        }
    }

    pub fn min_start(&self) -> i64 {
        self.reads.iter().map(|x| x.start).min().unwrap_or(0)
    }

    pub fn max_end(&self) -> i64 {
        self.reads.iter().map(|x| x.end).max().unwrap_or(0)
    }

    /// Expected fragment records not present in this group
    pub fn missing_reads(&self) -> Vec<ExpectedRead> {
        let present = self
            .reads
            .iter()
            .map(ExpectedRead::from_read)
            .collect::<BTreeSet<_>>();
        self.reads
            .iter()
            .flat_map(get_expected_reads)
            .filter(|x| !present.contains(x))
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect()
    }

    /// Update the group status relative to the region which has been scanned for its reads
    pub fn update_status(&mut self, region: &ChromRegion) -> GroupStatus {
        let missing = self.missing_reads();
        self.status = if missing.is_empty() {
            GroupStatus::Complete
        } else if missing
            .iter()
            .any(|x| x.chrom_index == region.chrom_index && region.range.contains(x.position))
        {
            GroupStatus::Incomplete
        } else {
            let has_primary = |first_in_pair| {
                self.reads
                    .iter()
                    .any(|x| !x.is_supplementary() && x.is_first_in_pair() == first_in_pair)
            };
            if has_primary(true) && has_primary(false) {
                GroupStatus::PairedComplete
            } else if self.reads.iter().any(|x| x.is_supplementary())
                && self.reads.iter().any(|x| !x.is_supplementary())
            {
                GroupStatus::SupplementaryComplete
            } else {
                GroupStatus::PartialSpanning
            }
        };
        self.status
    }

    /// The group can't gain any further reads from the scanned region
    pub fn is_simple_complete(&self) -> bool {
        self.status != GroupStatus::Incomplete
    }

    /// True if all expected reads are present
    pub fn is_complete(&self) -> bool {
        self.status == GroupStatus::Complete
    }

    pub fn has_evidence(&self) -> bool {
        self.reads
            .iter()
            .any(|x| matches!(x.read_type, ReadType::Junction | ReadType::CandidateSupport))
    }

    pub fn all_blacklisted(&self) -> bool {
        self.reads
            .iter()
            .all(|x| x.read_type == ReadType::Blacklisted)
    }

    pub fn has_supplementary_data(&self) -> bool {
        self.reads
            .iter()
            .any(|x| x.is_supplementary() || x.supplementary_data.is_some())
    }

    pub fn has_junction_read(&self) -> bool {
        self.reads
            .iter()
            .any(|x| x.read_type == ReadType::Junction)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::base_range::BaseRange;
    use crate::test_utils::*;

    fn get_region() -> ChromRegion {
        ChromRegion {
            chrom_index: 0,
            range: BaseRange::new(1000, 3000),
        }
    }

    #[test]
    fn test_paired_group_status() {
        let region = get_region();
        let read1 = get_test_read(&get_paired_read_sam("frag1", 97, 1500, "=", 2000, 600));
        let read2 = get_test_read(&get_paired_read_sam("frag1", 145, 2000, "=", 1500, -600));

        let mut group = ReadGroup::new(read1);
        assert_eq!(group.update_status(&region), GroupStatus::Incomplete);
        assert!(!group.is_simple_complete());

        group.add_read(read2.clone());
        assert_eq!(group.update_status(&region), GroupStatus::Complete);

        // Duplicate records are ignored:
        group.add_read(read2);
        assert_eq!(group.reads.len(), 2);
        assert_eq!((group.min_start(), group.max_end()), (1500, 2099));
    }

    #[test]
    fn test_spanning_group_status() {
        let region = get_region();
        let read1 = get_test_read(&get_paired_read_sam("frag1", 97, 1500, "chr2", 9000, 0));
        let mut group = ReadGroup::new(read1);
        assert_eq!(group.update_status(&region), GroupStatus::PartialSpanning);
        assert!(group.is_simple_complete());
        assert!(!group.is_complete());

        let missing = group.missing_reads();
        assert_eq!(missing.len(), 1);
        assert_eq!(missing[0].chrom_index, 1);
        assert_eq!(missing[0].position, 9000);
        assert!(!missing[0].first_in_pair);
    }

    #[test]
    fn test_supplementary_group_status() {
        let region = get_region();
        let qual = test_qual_str();
        let primary = format!(
            "frag1\t97\tchr1\t1431\t60\t70M30S\tchr2\t9000\t0\t{TEST_READ_SEQ}\t{qual}\tSA:Z:chr1,2501,+,70S30M,60,0;"
        );
        let supplementary = format!(
            "frag1\t2145\tchr1\t2501\t60\t70H30M\tchr2\t9000\t0\t{}\t{}\tSA:Z:chr1,1431,+,70M30S,60,0;",
            &TEST_READ_SEQ[70..],
            &qual[70..]
        );
        let mut group = ReadGroup::new(get_test_read(&primary));
        assert_eq!(group.update_status(&region), GroupStatus::Incomplete);
        group.add_read(get_test_read(&supplementary));
        assert_eq!(
            group.update_status(&region),
            GroupStatus::SupplementaryComplete
        );
        assert!(group.has_supplementary_data());
    }
}
