//! Chromosome names and sizes in alignment file order
//!

use std::collections::HashMap;

use rust_htslib::bam::{self, Read};
use unwrap::unwrap;

#[derive(Clone, Debug)]
pub struct ChromInfo {
    pub label: String,
    pub length: u64,
}

/// Chromosome list defined by the alignment file header
///
/// The index of each chromosome matches the htslib `tid` used in the alignment records
///
#[derive(Clone, Debug, Default)]
pub struct ChromList {
    pub data: Vec<ChromInfo>,
    pub label_to_index: HashMap<String, usize>,
}

impl ChromList {
    pub fn add_chrom(&mut self, label: &str, length: u64) {
        let index = self.data.len();
        self.data.push(ChromInfo {
            label: label.to_string(),
            length,
        });
        self.label_to_index.insert(label.to_string(), index);
    }

    pub fn from_bam_header(header: &bam::HeaderView) -> Self {
        let mut chrom_list = Self::default();
        for tid in 0..header.target_count() {
            let label = std::str::from_utf8(header.tid2name(tid)).unwrap();
            let length = header.target_len(tid).unwrap_or(0);
            chrom_list.add_chrom(label, length);
        }
        chrom_list
    }

    pub fn from_bam_filename(bam_filename: &str) -> Self {
        let bam_reader = unwrap!(
            bam::Reader::from_path(bam_filename),
            "Unable to open alignment file: '{bam_filename}'"
        );
        Self::from_bam_header(bam_reader.header())
    }

    pub fn label(&self, chrom_index: usize) -> &str {
        self.data[chrom_index].label.as_str()
    }

    pub fn length(&self, chrom_index: usize) -> u64 {
        self.data[chrom_index].length
    }
}
