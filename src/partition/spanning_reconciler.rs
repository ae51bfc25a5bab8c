use std::collections::{BTreeSet, HashMap};
use std::sync::mpsc;
use std::thread;

use log::{debug, info};

use crate::aligned_read::{AlignedRead, ReadType};
use crate::alignment_source::AlignmentSource;
use crate::bam_utils::filter_out_alignment_record;
use crate::chrom_list::ChromList;
use crate::junctions::JunctionKey;
use crate::read_group::{ExpectedRead, ReadGroup};
use crate::read_id_trimmer::ReadIdTrimmer;

/// A junction identified by its chromosome together with its position and orientation
pub type JunctionLink = (usize, JunctionKey);

/// A linked read group which may have reads scanned by other partitions
pub struct SpanningGroup {
    pub chrom_index: usize,
    pub group: ReadGroup,
}

/// All reads of one fragment linked to at least one junction
#[derive(Clone, Debug)]
pub struct Fragment {
    pub id: String,
    pub reads: Vec<AlignedRead>,
    pub junction_links: BTreeSet<JunctionLink>,
    pub is_complete: bool,
}

impl Fragment {
    pub fn from_group(chrom_index: usize, group: ReadGroup) -> Self {
        let is_complete = group.is_complete();
        Self {
            id: group.id,
            reads: group.reads,
            junction_links: group
                .junction_keys
                .into_iter()
                .map(|x| (chrom_index, x))
                .collect(),
            is_complete,
        }
    }

    /// Leftmost read location, used to order fragment output
    pub fn sort_key(&self) -> (usize, i64) {
        self.reads
            .iter()
            .map(|x| (x.chrom_index, x.start))
            .min()
            .unwrap_or((0, 0))
    }
}

/// Sort fragments into output order
pub fn sort_fragments(fragments: &mut [Fragment]) {
    fragments.sort_by(|a, b| (a.sort_key(), &a.id).cmp(&(b.sort_key(), &b.id)));
}

#[derive(Clone, Debug, Default)]
pub struct ReconcilerStats {
    pub spanning_group_count: usize,
    pub merged_group_count: usize,
    pub recovered_read_count: usize,
    pub incomplete_fragment_count: usize,
}

struct PendingFragment {
    group: ReadGroup,
    junction_links: BTreeSet<JunctionLink>,
}

impl PendingFragment {
    /// Add reads from another partition's view of the same fragment
    ///
    /// A read seen more than once keeps its strongest evidence type.
    ///
    fn merge(&mut self, chrom_index: usize, group: ReadGroup) {
        self.junction_links
            .extend(group.junction_keys.iter().map(|&x| (chrom_index, x)));
        for read in group.reads {
            let key = ExpectedRead::from_read(&read);
            match self
                .group
                .reads
                .iter_mut()
                .find(|x| ExpectedRead::from_read(x) == key)
            {
                Some(existing) => {
                    if read.read_type.evidence_rank() > existing.read_type.evidence_rank() {
                        existing.read_type = read.read_type;
                    }
                }
                None => self.group.add_read(read),
            }
        }
    }

    fn is_complete(&self) -> bool {
        self.group.missing_reads().is_empty()
    }
}

/// Merges the views of fragments with reads scanned by more than one partition
///
/// Groups are held until all partitions have finished, after which reads still missing from
/// any fragment can be recovered from the alignment file.
///
#[derive(Default)]
pub struct SpanningReconciler {
    fragments: HashMap<String, PendingFragment>,
    stats: ReconcilerStats,
}

impl SpanningReconciler {
    pub fn add_spanning_group(&mut self, spanning_group: SpanningGroup) {
        let SpanningGroup { chrom_index, group } = spanning_group;
        self.stats.spanning_group_count += 1;
        match self.fragments.get_mut(&group.id) {
            Some(fragment) => {
                fragment.merge(chrom_index, group);
                self.stats.merged_group_count += 1;
            }
            None => {
                let junction_links = group
                    .junction_keys
                    .iter()
                    .map(|&x| (chrom_index, x))
                    .collect();
                self.fragments.insert(
                    group.id.clone(),
                    PendingFragment {
                        group,
                        junction_links,
                    },
                );
            }
        }
    }

    pub fn pending_count(&self) -> usize {
        self.fragments.len()
    }

    /// Query the alignment source for reads missing from incomplete fragments
    ///
    pub fn recover_missing_reads(
        &mut self,
        source: &mut dyn AlignmentSource,
        chrom_list: &ChromList,
        max_scan_depth: usize,
        read_id_trimmer: Option<&ReadIdTrimmer>,
    ) {
        let mut incomplete_ids = self
            .fragments
            .iter()
            .filter(|(_, x)| !x.is_complete())
            .map(|(id, _)| id.clone())
            .collect::<Vec<_>>();
        incomplete_ids.sort();

        info!(
            "Attempting read recovery for {} incomplete fragments",
            incomplete_ids.len()
        );

        for id in incomplete_ids {
            let Some(fragment) = self.fragments.get_mut(&id) else {
                continue;
            };
            for expected in fragment.group.missing_reads() {
                if expected.chrom_index >= chrom_list.data.len() {
                    continue;
                }
                let mut matcher = |record: &rust_htslib::bam::Record| {
                    let read_id = String::from_utf8_lossy(record.qname());
                    let read_id = match read_id_trimmer {
                        Some(x) => x.trim(&read_id).to_string(),
                        None => read_id.to_string(),
                    };
                    read_id == id
                        && record.is_first_in_template() == expected.first_in_pair
                        && record.is_supplementary() == expected.supplementary
                        && !filter_out_alignment_record(record)
                };
                if let Some(record) = source.find_record(
                    expected.chrom_index,
                    expected.position,
                    max_scan_depth,
                    &mut matcher,
                ) {
                    let mut read = AlignedRead::from_bam_record(&record, chrom_list, read_id_trimmer);
                    read.read_type = ReadType::Recovered;
                    fragment.group.add_read(read);
                    self.stats.recovered_read_count += 1;
                }
            }
        }
    }

    /// Convert all pending groups into fragments in output order
    ///
    /// Reads in fragments which remain incomplete are marked unmatched unless they were
    /// credited to a junction.
    ///
    pub fn finish(self) -> (Vec<Fragment>, ReconcilerStats) {
        let mut stats = self.stats;
        let mut fragments = self
            .fragments
            .into_values()
            .map(|mut pending| {
                let is_complete = pending.is_complete();
                if !is_complete {
                    stats.incomplete_fragment_count += 1;
                    for read in pending.group.reads.iter_mut() {
                        if matches!(
                            read.read_type,
                            ReadType::NoSupport | ReadType::CandidateSupport
                        ) {
                            read.read_type = ReadType::Unmatched;
                        }
                    }
                }
                Fragment {
                    id: pending.group.id,
                    reads: pending.group.reads,
                    junction_links: pending.junction_links,
                    is_complete,
                }
            })
            .collect::<Vec<_>>();
        sort_fragments(&mut fragments);

        debug!(
            "Reconciled {} spanning groups into {} fragments",
            stats.spanning_group_count,
            fragments.len()
        );
        (fragments, stats)
    }
}

/// Start a thread consuming spanning groups until every sender has been dropped
pub fn spawn_spanning_reconciler(
    rx: mpsc::Receiver<Vec<SpanningGroup>>,
) -> thread::JoinHandle<SpanningReconciler> {
    thread::spawn(move || {
        let mut reconciler = SpanningReconciler::default();
        for spanning_groups in rx {
            for spanning_group in spanning_groups {
                reconciler.add_spanning_group(spanning_group);
            }
        }
        reconciler
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::aligned_read::Orientation;
    use crate::test_utils::*;

    fn get_spanning_group(sam_line: &str, read_type: ReadType, key: Option<JunctionKey>) -> SpanningGroup {
        let mut read = get_test_read(sam_line);
        read.read_type = read_type;
        let mut group = ReadGroup::new(read);
        group.junction_keys.extend(key);
        SpanningGroup {
            chrom_index: 0,
            group,
        }
    }

    fn get_pair_lines() -> (String, String) {
        let qual = test_qual_str();
        (
            format!("frag1\t97\tchr1\t1001\t60\t70M30S\t=\t5001\t4100\t{TEST_READ_SEQ}\t{qual}\tMC:Z:100M"),
            format!("frag1\t145\tchr1\t5001\t60\t100M\t=\t1001\t-4100\t{TEST_READ_SEQ}\t{qual}\tMC:Z:70M30S"),
        )
    }

    #[test]
    fn test_merge_spanning_groups() {
        let (read1, read2) = get_pair_lines();
        let key1 = JunctionKey::new(1070, Orientation::Positive);
        let key2 = JunctionKey::new(5000, Orientation::Negative);

        let (tx, rx) = mpsc::channel();
        let handle = spawn_spanning_reconciler(rx);
        tx.send(vec![get_spanning_group(&read1, ReadType::Junction, Some(key1))])
            .unwrap();
        tx.send(vec![
            get_spanning_group(&read2, ReadType::Support, Some(key2)),
            get_spanning_group(&read1, ReadType::CandidateSupport, None),
        ])
        .unwrap();
        drop(tx);

        let reconciler = handle.join().unwrap();
        assert_eq!(reconciler.pending_count(), 1);
        let (fragments, stats) = reconciler.finish();
        assert_eq!(stats.merged_group_count, 2);
        assert_eq!(fragments.len(), 1);

        let fragment = &fragments[0];
        assert!(fragment.is_complete);
        assert_eq!(fragment.reads.len(), 2);
        assert_eq!(fragment.reads[0].read_type, ReadType::Junction);
        assert_eq!(fragment.reads[1].read_type, ReadType::Support);
        assert_eq!(
            fragment.junction_links,
            BTreeSet::from([(0, key1), (0, key2)])
        );
    }

    #[test]
    fn test_recover_missing_read() {
        let (read1, read2) = get_pair_lines();
        let key1 = JunctionKey::new(1070, Orientation::Positive);

        let mut reconciler = SpanningReconciler::default();
        reconciler.add_spanning_group(get_spanning_group(&read1, ReadType::Junction, Some(key1)));

        let decoy = read2.replace("frag1", "frag2");
        let mut source = TestAlignmentSource::from_sam_lines(&[decoy, read2]);
        reconciler.recover_missing_reads(&mut source, &get_test_chrom_list(), 10, None);

        let (fragments, stats) = reconciler.finish();
        assert_eq!(stats.recovered_read_count, 1);
        assert_eq!(stats.incomplete_fragment_count, 0);
        assert!(fragments[0].is_complete);
        assert_eq!(fragments[0].reads[1].read_type, ReadType::Recovered);
        assert_eq!(fragments[0].reads[1].start, 5001);
    }

    #[test]
    fn test_unrecovered_fragment() {
        let (read1, _) = get_pair_lines();
        let mut reconciler = SpanningReconciler::default();
        reconciler.add_spanning_group(get_spanning_group(
            &read1,
            ReadType::CandidateSupport,
            None,
        ));

        let mut source = TestAlignmentSource::from_sam_lines(&[]);
        reconciler.recover_missing_reads(&mut source, &get_test_chrom_list(), 10, None);

        let (fragments, stats) = reconciler.finish();
        assert_eq!(stats.incomplete_fragment_count, 1);
        assert!(!fragments[0].is_complete);
        assert_eq!(fragments[0].reads[0].read_type, ReadType::Unmatched);
    }

    #[test]
    fn test_fragment_order() {
        let qual = test_qual_str();
        let mut fragments = ["b", "a", "c"]
            .iter()
            .zip([2000, 2000, 1000])
            .map(|(id, pos)| {
                let sam_line = format!("{id}\t0\tchr1\t{pos}\t60\t100M\t*\t0\t0\t{TEST_READ_SEQ}\t{qual}");
                Fragment::from_group(0, ReadGroup::new(get_test_read(&sam_line)))
            })
            .collect::<Vec<_>>();
        sort_fragments(&mut fragments);
        let ids = fragments.iter().map(|x| x.id.as_str()).collect::<Vec<_>>();
        assert_eq!(ids, vec!["c", "a", "b"]);
    }
}
