//! Junctions carried over from an earlier run
//!

use log::info;
use simple_error::{SimpleResult, bail};
use unwrap::unwrap;

use crate::aligned_read::Orientation;
use crate::base_range::BaseRange;
use crate::chrom_list::ChromList;
use crate::junctions::JunctionKey;

/// Sorted junction keys for each chromosome
#[derive(Default)]
pub struct ExistingJunctions {
    chroms: Vec<Vec<JunctionKey>>,
}

impl ExistingJunctions {
    pub fn new(chrom_list: &ChromList) -> Self {
        Self {
            chroms: vec![Vec::new(); chrom_list.data.len()],
        }
    }

    pub fn junction_count(&self) -> usize {
        self.chroms.iter().map(|x| x.len()).sum()
    }

    pub fn add_junction(&mut self, chrom_index: usize, key: JunctionKey) {
        self.chroms[chrom_index].push(key);
    }

    fn sort(&mut self) {
        for keys in self.chroms.iter_mut() {
            keys.sort();
            keys.dedup();
        }
    }

    /// Parse the chromosome, position and orientation columns of a junctions TSV file
    ///
    pub fn from_tsv(filename: &str, chrom_list: &ChromList) -> SimpleResult<Self> {
        info!("Reading existing junctions from file '{filename}'");

        let content = unwrap!(
            std::fs::read_to_string(filename),
            "Unable to read existing junctions file: '{filename}'"
        );

        let mut junctions = Self::new(chrom_list);
        for (line_index, line) in content.lines().enumerate() {
            if line.is_empty() || line.starts_with("Chromosome") {
                continue;
            }
            let words = line.split('\t').collect::<Vec<_>>();
            if words.len() < 3 {
                bail!(
                    "Expected at least 3 fields on line {} of existing junctions file '{filename}'",
                    line_index + 1
                );
            }
            let Some(&chrom_index) = chrom_list.label_to_index.get(words[0]) else {
                bail!(
                    "Existing junctions file '{filename}' includes unknown chromosome '{}'",
                    words[0]
                );
            };
            let position = words[1].parse::<i64>().ok();
            let orientation = words[2].parse::<i64>().ok().and_then(Orientation::from_int);
            let (Some(position), Some(orientation)) = (position, orientation) else {
                bail!(
                    "Can't parse junction on line {} of existing junctions file '{filename}'",
                    line_index + 1
                );
            };
            junctions.add_junction(chrom_index, JunctionKey::new(position, orientation));
        }
        junctions.sort();
        Ok(junctions)
    }

    /// Junctions inside the given 1-indexed closed range
    pub fn get_region_junctions(&self, chrom_index: usize, range: &BaseRange) -> &[JunctionKey] {
        let keys = &self.chroms[chrom_index];
        let first = keys.partition_point(|x| x.position < range.start);
        let last = keys.partition_point(|x| x.position <= range.end);
        &keys[first..last]
    }
}
