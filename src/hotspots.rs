//! Known recurrent breakpoint pairs
//!

use log::info;
use simple_error::{SimpleResult, bail};
use unwrap::unwrap;

use crate::aligned_read::Orientation;
use crate::base_range::BaseRange;
use crate::chrom_list::ChromList;

#[derive(Clone, Debug, Eq, PartialEq)]
pub struct HotspotSide {
    pub chrom_index: usize,
    pub range: BaseRange,
    pub orientation: Orientation,
}

impl HotspotSide {
    pub fn matches(&self, chrom_index: usize, pos: i64, orientation: Orientation) -> bool {
        self.chrom_index == chrom_index
            && self.orientation == orientation
            && self.range.contains(pos)
    }
}

/// A hotspot breakpoint pair, stored with the side on the indexed chromosome as `local`
#[derive(Clone, Debug)]
pub struct Hotspot {
    pub local: HotspotSide,
    pub remote: HotspotSide,
}

/// Hotspot pairs indexed by the chromosome of each side
///
#[derive(Default)]
pub struct HotspotCache {
    chroms: Vec<Vec<Hotspot>>,
}

fn parse_orientation(strand: &str) -> Option<Orientation> {
    match strand {
        "+" => Some(Orientation::Positive),
        "-" => Some(Orientation::Negative),
        _ => None,
    }
}

impl HotspotCache {
    pub fn new(chrom_list: &ChromList) -> Self {
        Self {
            chroms: vec![Vec::new(); chrom_list.data.len()],
        }
    }

    /// Add a hotspot pair, indexed under both sides
    pub fn add_hotspot(&mut self, side_a: HotspotSide, side_b: HotspotSide) {
        self.chroms[side_a.chrom_index].push(Hotspot {
            local: side_a.clone(),
            remote: side_b.clone(),
        });
        self.chroms[side_b.chrom_index].push(Hotspot {
            local: side_b,
            remote: side_a,
        });
    }

    fn sort(&mut self) {
        for chrom_hotspots in self.chroms.iter_mut() {
            chrom_hotspots.sort_by_key(|x| x.local.range.start);
        }
    }

    /// Read hotspots from a BEDPE file
    ///
    /// Each line has 10 fields: chromA startA endA chromB startB endB name score strandA strandB
    ///
    pub fn from_bedpe(filename: &str, chrom_list: &ChromList) -> SimpleResult<Self> {
        info!("Reading hotspot regions from file '{filename}'");

        let content = unwrap!(
            std::fs::read_to_string(filename),
            "Unable to read hotspot file: '{filename}'"
        );

        let mut hotspots = Self::new(chrom_list);
        for (line_index, line) in content.lines().enumerate() {
            if line.is_empty() || line.starts_with('#') {
                continue;
            }
            let words = line.split('\t').collect::<Vec<_>>();
            if words.len() < 10 {
                bail!(
                    "Expected 10 fields on line {} of hotspot file '{filename}'",
                    line_index + 1
                );
            }

            let get_side = |chrom_word: usize, strand_word: usize| -> SimpleResult<HotspotSide> {
                let label = words[chrom_word];
                let Some(&chrom_index) = chrom_list.label_to_index.get(label) else {
                    bail!("Hotspot file '{filename}' includes unknown chromosome '{label}'");
                };
                let (Ok(start), Ok(end)) = (
                    words[chrom_word + 1].parse::<i64>(),
                    words[chrom_word + 2].parse::<i64>(),
                ) else {
                    bail!(
                        "Can't parse coordinates on line {} of hotspot file '{filename}'",
                        line_index + 1
                    );
                };
                let Some(orientation) = parse_orientation(words[strand_word]) else {
                    bail!(
                        "Can't parse strand on line {} of hotspot file '{filename}'",
                        line_index + 1
                    );
                };
                if start >= end {
                    bail!(
                        "Empty region on line {} of hotspot file '{filename}'",
                        line_index + 1
                    );
                }
                Ok(HotspotSide {
                    chrom_index,
                    range: BaseRange::from_zero_based(start, end),
                    orientation,
                })
            };
            let side_a = get_side(0, 8)?;
            let side_b = get_side(3, 9)?;
            hotspots.add_hotspot(side_a, side_b);
        }
        hotspots.sort();
        Ok(hotspots)
    }

    /// Report whether the breakpoint pair matches any hotspot
    pub fn matches_pair(
        &self,
        chrom_a: usize,
        pos_a: i64,
        orientation_a: Orientation,
        chrom_b: usize,
        pos_b: i64,
        orientation_b: Orientation,
    ) -> bool {
        self.chroms[chrom_a].iter().any(|x| {
            x.local.matches(chrom_a, pos_a, orientation_a)
                && x.remote.matches(chrom_b, pos_b, orientation_b)
        })
    }

    /// All hotspots with a side overlapping the given 1-indexed closed chromosome range
    pub fn find_partition_regions(&self, chrom_index: usize, range: &BaseRange) -> Vec<Hotspot> {
        self.chroms[chrom_index]
            .iter()
            .take_while(|x| x.local.range.start <= range.end)
            .filter(|x| x.local.range.overlaps(range))
            .cloned()
            .collect()
    }
}
