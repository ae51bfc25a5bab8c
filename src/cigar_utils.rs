//! BAM record cigar-processing utilities
//!

use rust_htslib::bam::record::{Cigar, CigarString};

/// Is the cigar element any of the alignment match types?
///
pub fn is_alignment_match(c: &Cigar) -> bool {
    matches!(c, Cigar::Match(_) | Cigar::Equal(_) | Cigar::Diff(_))
}

pub fn get_cigarseg_read_offset(c: &Cigar) -> usize {
    use Cigar::*;
    match c {
        Ins(len) | SoftClip(len) | Diff(len) | Equal(len) | Match(len) => *len as usize,
        _ => 0,
    }
}

pub fn get_cigarseg_ref_offset(c: &Cigar) -> i64 {
    use Cigar::*;
    match c {
        Del(len) | RefSkip(len) | Diff(len) | Equal(len) | Match(len) => *len as i64,
        _ => 0,
    }
}

/// A utility method to track ref and read positions while iterating through a cigar string
///
/// Hard-clipped segments do not advance the read position.
///
pub fn update_ref_and_read_pos(c: &Cigar, ref_pos: &mut i64, read_pos: &mut usize) {
    *read_pos += get_cigarseg_read_offset(c);
    *ref_pos += get_cigarseg_ref_offset(c);
}

/// Report the reference offset of the cigar alignment
///
pub fn get_cigar_ref_offset(cigar: &[Cigar]) -> i64 {
    cigar.iter().map(get_cigarseg_ref_offset).sum()
}

/// Number of read bases aligned to the reference (M/=/X)
///
pub fn get_cigar_aligned_base_count(cigar: &[Cigar]) -> usize {
    cigar
        .iter()
        .filter(|c| is_alignment_match(c))
        .map(|c| c.len() as usize)
        .sum()
}

/// Report the soft-clip lengths on the left and right side of the alignment
///
/// Any hard clipping outside of the soft clip is skipped over.
///
pub fn get_soft_clip_lengths(cigar: &[Cigar]) -> (usize, usize) {
    fn edge_soft_clip<'a>(iter: impl Iterator<Item = &'a Cigar>) -> usize {
        let mut sclip = 0;
        for c in iter {
            match c {
                Cigar::HardClip(_) => {}
                Cigar::SoftClip(len) => sclip += *len as usize,
                _ => break,
            }
        }
        sclip
    }
    (
        edge_soft_clip(cigar.iter()),
        edge_soft_clip(cigar.iter().rev()),
    )
}

/// Report the total clipping (soft and hard) on the left and right side of the alignment
///
pub fn get_total_clip_lengths(cigar: &[Cigar]) -> (usize, usize) {
    fn edge_clip<'a>(iter: impl Iterator<Item = &'a Cigar>) -> usize {
        iter.take_while(|c| matches!(c, Cigar::HardClip(_) | Cigar::SoftClip(_)))
            .map(|c| c.len() as usize)
            .sum()
    }
    (edge_clip(cigar.iter()), edge_clip(cigar.iter().rev()))
}

/// Return true if the CIGAR string contains any aligned (M/X/=) segments
///
pub fn has_aligned_segments(cigar: &[Cigar]) -> bool {
    cigar.iter().any(is_alignment_match)
}

/// Convert CIGAR in string format into the rust-htslib format
///
/// Returns None for malformed strings, including the '*' placeholder
///
pub fn get_cigar_from_string(cigar_str: &str) -> Option<Vec<Cigar>> {
    CigarString::try_from(cigar_str.as_bytes())
        .ok()
        .map(|x| x.0)
}

pub fn cigar_to_string(cigar: &[Cigar]) -> String {
    cigar.iter().map(|c| c.to_string()).collect()
}
