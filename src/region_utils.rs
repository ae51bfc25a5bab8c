//! Genome region helpers: samtools-style region strings and fixed-size region splitting
//!

use simple_error::{SimpleResult, bail};

use crate::base_range::BaseRange;
use crate::chrom_list::ChromList;

/// A region on one chromosome, in 1-indexed closed coordinates
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct ChromRegion {
    pub chrom_index: usize,
    pub range: BaseRange,
}

/// Find the chromosome index and optional position-range text of a samtools-style region string
///
/// Contig names containing colons (such as "HLA-DRB1*10:01:01") are resolved by first trying the
/// text before the last colon, then the full string.
///
fn split_region_chrom<'a>(
    chrom_list: &ChromList,
    region_str: &'a str,
) -> SimpleResult<(usize, Option<&'a str>)> {
    if let Some((chrom, pos_str)) = region_str.rsplit_once(':') {
        if let Some(&chrom_index) = chrom_list.label_to_index.get(chrom) {
            return Ok((chrom_index, Some(pos_str)));
        }
    }
    match chrom_list.label_to_index.get(region_str) {
        Some(&chrom_index) => Ok((chrom_index, None)),
        None => bail!(
            "Can't find chromosome for genome region string '{region_str}' in alignment file header"
        ),
    }
}

/// Parse a 1-indexed position with optional comma separators (same as tabix cmdline behavior)
fn parse_region_pos(region_str: &str, pos_str: &str) -> SimpleResult<i64> {
    let pos_str = pos_str.replace(',', "");
    match pos_str.parse::<i64>() {
        Ok(pos) if pos > 0 => Ok(pos),
        _ => bail!("Unexpected position '{pos_str}' in genome region string '{region_str}'"),
    }
}

/// Convert from a string in 'samtools' region format (e.g. chr20:100-200)
///
/// "chr20" covers the whole chromosome, "chr20:100" runs from position 100 to the chromosome end.
///
pub fn parse_samtools_region_string(
    chrom_list: &ChromList,
    region_str: &str,
) -> SimpleResult<ChromRegion> {
    let (chrom_index, pos_str) = split_region_chrom(chrom_list, region_str)?;
    let chrom_size = chrom_list.length(chrom_index) as i64;
    let (start, end) = match pos_str {
        None => (1, chrom_size),
        Some(pos_str) => match pos_str.split_once('-') {
            Some((start, end)) => (
                parse_region_pos(region_str, start)?,
                parse_region_pos(region_str, end)?,
            ),
            None => (parse_region_pos(region_str, pos_str)?, chrom_size),
        },
    };
    if start > end || end > chrom_size {
        bail!("Genome region string '{region_str}' does not describe a valid chromosome range");
    }
    Ok(ChromRegion {
        chrom_index,
        range: BaseRange::new(start, end),
    })
}

/// Split a region of length `size` into segments of at most `segment_size`
///
/// Segments are returned in zero-indexed half-open coordinates
///
pub fn get_region_segments(size: u64, segment_size: u64) -> Vec<(u64, u64)> {
    assert!(segment_size > 0);
    let mut segments = Vec::new();
    let mut start = 0;
    while start < size {
        let end = std::cmp::min(start + segment_size, size);
        segments.push((start, end));
        start = end;
    }
    segments
}

/// Extend get_region_segments for use with intervals that start at non-zero positions by shifting
/// the results according to the given offset value.
pub fn get_region_segments_with_offset(
    offset: u64,
    size: u64,
    segment_size: u64,
) -> Vec<(u64, u64)> {
    get_region_segments(size, segment_size)
        .into_iter()
        .map(|(s, e)| (s + offset, e + offset))
        .collect()
}
