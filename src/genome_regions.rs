use bio::data_structures::interval_tree::IntervalTree;
use log::info;
use rust_htslib::bgzf;
use simple_error::{SimpleResult, bail};
use unwrap::unwrap;

use crate::base_range::BaseRange;
use crate::chrom_list::ChromList;
use crate::region_utils::parse_samtools_region_string;

/// A set of chromosome regions which can be efficiently queried
///
/// Regions are stored in zero-indexed half-open coordinates, and queried with the 1-indexed
/// closed coordinates used for reads and junctions.
///
#[derive(Clone)]
pub struct ChromRegions {
    regions: IntervalTree<i64, ()>,
    is_empty: bool,
}

impl Default for ChromRegions {
    fn default() -> Self {
        Self {
            regions: IntervalTree::new(),
            is_empty: true,
        }
    }
}

impl ChromRegions {
    pub fn is_empty(&self) -> bool {
        self.is_empty
    }

    /// Add a region in bed-style zero-indexed half-open coordinates
    pub fn add_region(&mut self, start: i64, end: i64) {
        self.regions.insert(start..end, ());
        self.is_empty = false;
    }

    /// Return true if the range intersects with any regions stored in this object
    pub fn intersect(&self, range: &BaseRange) -> bool {
        self.regions.find((range.start - 1)..range.end).next().is_some()
    }

    /// Return true if `pos` intersects with any regions stored in this object
    pub fn intersect_pos(&self, pos: i64) -> bool {
        self.intersect(&BaseRange::new(pos, pos))
    }

    /// Return true if the range is entirely inside a single region
    pub fn contains_range(&self, range: &BaseRange) -> bool {
        self.regions.find((range.start - 1)..range.end).any(|x| {
            let interval = x.interval();
            interval.start < range.start && interval.end >= range.end
        })
    }

    /// All regions overlapping `range`, merged and sorted
    pub fn get_overlapping_ranges(&self, range: &BaseRange) -> Vec<BaseRange> {
        let mut ranges = self
            .regions
            .find((range.start - 1)..range.end)
            .map(|x| {
                let interval = x.interval();
                BaseRange::from_zero_based(interval.start, interval.end)
            })
            .collect::<Vec<_>>();
        ranges.sort();

        let mut merged: Vec<BaseRange> = Vec::new();
        for r in ranges {
            match merged.last_mut() {
                Some(last) if r.start <= last.end + 1 => {
                    last.end = std::cmp::max(last.end, r.end);
                }
                _ => merged.push(r),
            }
        }
        merged
    }
}

/// Region lookup for every chromosome, indexed by chromosome index
#[derive(Clone, Default)]
pub struct GenomeRegions {
    pub chroms: Vec<ChromRegions>,
}

impl GenomeRegions {
    pub fn new(chrom_list: &ChromList) -> Self {
        Self {
            chroms: vec![ChromRegions::default(); chrom_list.data.len()],
        }
    }

    pub fn is_empty(&self) -> bool {
        self.chroms.iter().all(|x| x.is_empty())
    }

    /// Read regions from a bed file, which may be bgzip-compressed
    ///
    /// # Arguments
    ///
    /// * `label` - Used in messages to describe what type of regions file this is
    ///
    pub fn from_bed(filename: &str, label: &str, chrom_list: &ChromList) -> SimpleResult<Self> {
        use std::io::Read;

        info!("Reading {label} regions from file '{filename}'");

        let mut reader = unwrap!(
            bgzf::Reader::from_path(filename),
            "Unable to open {label} regions file: '{filename}'"
        );

        let mut content = String::new();
        unwrap!(
            reader.read_to_string(&mut content),
            "Can't parse text from {label} regions file: '{filename}'"
        );

        let mut regions = Self::new(chrom_list);
        for (line_index, line) in content.lines().enumerate() {
            if line.is_empty() || line.starts_with('#') || line.starts_with("track") {
                continue;
            }

            let words = line.split('\t').collect::<Vec<_>>();
            if words.len() < 3 {
                bail!(
                    "Expected at least 3 fields on line {} of {label} regions file '{filename}'",
                    line_index + 1
                );
            }
            let Some(&chrom_index) = chrom_list.label_to_index.get(words[0]) else {
                bail!(
                    "{label} regions file '{filename}' includes chromosome '{}' which is not in the alignment file header",
                    words[0]
                );
            };
            let (Ok(start), Ok(end)) = (words[1].parse::<i64>(), words[2].parse::<i64>()) else {
                bail!(
                    "Can't parse region coordinates on line {} of {label} regions file '{filename}'",
                    line_index + 1
                );
            };
            if start >= end {
                continue;
            }
            regions.chroms[chrom_index].add_region(start, end);
        }
        Ok(regions)
    }

    /// Create object from strings in 'samtools' region format (e.g. chr20:100-200)
    ///
    pub fn from_target_regions(
        chrom_list: &ChromList,
        target_regions: &[String],
    ) -> SimpleResult<Self> {
        let mut regions = Self::new(chrom_list);
        for target_region in target_regions {
            let region = parse_samtools_region_string(chrom_list, target_region)?;
            regions.chroms[region.chrom_index]
                .add_region(region.range.start - 1, region.range.end);
        }
        Ok(regions)
    }
}
