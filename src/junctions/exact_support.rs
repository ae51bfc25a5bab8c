use super::junction_data::JunctionKey;
use crate::aligned_read::{AlignedRead, ClipSide, Orientation};
use crate::prep_config::PrepConfig;

/// Compare the bases of `read` against the representative read across the junction
///
/// Read indices of the two reads are aligned on the junction position, assuming each read's
/// aligned portion continues linearly into its soft clip. The comparison runs from the first
/// base where the two reads differ in alignment state out to the end of either read. Mismatches
/// are only counted when both base qualities are at least `low_base_qual_threshold`.
///
fn is_clip_sequence_match(
    read: &AlignedRead,
    key: &JunctionKey,
    representative: &AlignedRead,
    config: &PrepConfig,
) -> bool {
    let read_len = read.read_len() as i64;
    let rep_len = representative.read_len() as i64;

    let (read_index, rep_index, mut offset, step) = match key.orientation {
        Orientation::Positive => (
            (read_len - read.right_clip as i64 - 1) + (key.position - read.end),
            rep_len - representative.right_clip as i64 - 1,
            std::cmp::min(read.end, key.position) - key.position + 1,
            1,
        ),
        Orientation::Negative => (
            read.left_clip as i64 + (key.position - read.start),
            representative.left_clip as i64,
            std::cmp::max(read.start, key.position) - key.position - 1,
            -1,
        ),
    };

    let mut compared = 0;
    let mut mismatches = 0;
    loop {
        let ri = read_index + offset;
        let ti = rep_index + offset;
        if ri < 0 || ti < 0 || ri >= read_len || ti >= rep_len {
            break;
        }
        let (ri, ti) = (ri as usize, ti as usize);
        if read.seq[ri] != representative.seq[ti]
            && read.qual[ri] >= config.low_base_qual_threshold
            && representative.qual[ti] >= config.low_base_qual_threshold
        {
            mismatches += 1;
            if mismatches > config.max_exact_mismatches {
                return false;
            }
        }
        compared += 1;
        offset += step;
    }
    compared > 0
}

/// Test whether the read's soft clip matches the junction's representative read
///
/// The read must be clipped on the junction side with its clip boundary within
/// `exact_support_distance` of the junction.
///
pub fn is_exact_support(
    read: &AlignedRead,
    key: &JunctionKey,
    representative: &AlignedRead,
    config: &PrepConfig,
) -> bool {
    let side = ClipSide::from_orientation(key.orientation);
    if read.clip_length(side) == 0 {
        return false;
    }
    if (read.clip_boundary(side) - key.position).abs() > config.exact_support_distance {
        return false;
    }
    is_clip_sequence_match(read, key, representative, config)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::*;

    fn mutate_base(seq: &str, index: usize) -> String {
        let mut seq = seq.as_bytes().to_vec();
        seq[index] = if seq[index] == b'A' { b'C' } else { b'A' };
        String::from_utf8(seq).unwrap()
    }

    #[test]
    fn test_positive_exact_support() {
        let config = PrepConfig::default();
        let key = JunctionKey::new(1500, Orientation::Positive);
        let representative = get_test_read(&get_clipped_read_sam("rep", 1431, "70M30S", 0));

        // Clip boundary 3 bases before the junction:
        let read = get_test_read(&get_clipped_read_sam("frag1", 1431, "67M33S", 0));
        assert!(is_exact_support(&read, &key, &representative, &config));

        // Clip boundary 3 bases after the junction:
        let read = get_test_read(&get_clipped_read_sam("frag1", 1431, "73M27S", 0));
        assert!(is_exact_support(&read, &key, &representative, &config));

        // Clip boundary too far from the junction:
        let read = get_test_read(&get_clipped_read_sam("frag1", 1431, "55M45S", 0));
        assert!(!is_exact_support(&read, &key, &representative, &config));

        // Clipped on the wrong side:
        let read = get_test_read(&get_clipped_read_sam("frag1", 1464, "33S67M", 0));
        assert!(!is_exact_support(&read, &key, &representative, &config));
    }

    #[test]
    fn test_shifted_read_exact_support() {
        let config = PrepConfig::default();
        let key = JunctionKey::new(1500, Orientation::Positive);
        let representative = get_test_read(&get_clipped_read_sam("rep", 1431, "70M30S", 0));

        // Same template sequenced from a start 10 bases later:
        let seq = format!("{}{}", &TEST_READ_SEQ[10..], "A".repeat(10));
        let sam_line = format!(
            "frag1\t0\tchr1\t1441\t60\t62M38S\t*\t0\t0\t{seq}\t{}",
            test_qual_str()
        );
        let read = get_test_read(&sam_line);
        assert_eq!(read.end, 1502);
        assert!(is_exact_support(&read, &key, &representative, &config));
    }

    #[test]
    fn test_mismatch_tolerance() {
        let config = PrepConfig::default();
        let key = JunctionKey::new(1500, Orientation::Positive);
        let representative = get_test_read(&get_clipped_read_sam("rep", 1431, "70M30S", 0));
        let qual = test_qual_str();

        let seq = mutate_base(TEST_READ_SEQ, 80);
        let sam_line = format!("frag1\t0\tchr1\t1431\t60\t67M33S\t*\t0\t0\t{seq}\t{qual}");
        let read = get_test_read(&sam_line);
        assert!(is_exact_support(&read, &key, &representative, &config));

        let seq = mutate_base(&seq, 90);
        let sam_line = format!("frag1\t0\tchr1\t1431\t60\t67M33S\t*\t0\t0\t{seq}\t{qual}");
        let read = get_test_read(&sam_line);
        assert!(!is_exact_support(&read, &key, &representative, &config));

        // Low quality mismatches are ignored:
        let mut qual = qual.into_bytes();
        qual[90] = b'+';
        let qual = String::from_utf8(qual).unwrap();
        let sam_line = format!("frag1\t0\tchr1\t1431\t60\t67M33S\t*\t0\t0\t{seq}\t{qual}");
        let read = get_test_read(&sam_line);
        assert!(is_exact_support(&read, &key, &representative, &config));
    }

    #[test]
    fn test_negative_exact_support() {
        let config = PrepConfig::default();
        let key = JunctionKey::new(1501, Orientation::Negative);
        let representative = get_test_read(&get_clipped_read_sam("rep", 1501, "30S70M", 0));

        let read = get_test_read(&get_clipped_read_sam("frag1", 1503, "32S68M", 0));
        assert!(is_exact_support(&read, &key, &representative, &config));

        let seq = mutate_base(&mutate_base(TEST_READ_SEQ, 5), 10);
        let sam_line = format!(
            "frag1\t0\tchr1\t1503\t60\t32S68M\t*\t0\t0\t{seq}\t{}",
            test_qual_str()
        );
        let read = get_test_read(&sam_line);
        assert!(!is_exact_support(&read, &key, &representative, &config));
    }
}
