use log::debug;

use super::read_rate_tracker::ReadRateTracker;
use super::spanning_reconciler::{Fragment, SpanningGroup};
use super::Partition;
use crate::aligned_read::AlignedRead;
use crate::alignment_source::AlignmentSource;
use crate::bam_utils::filter_out_alignment_record;
use crate::base_range::BaseRange;
use crate::chrom_list::ChromList;
use crate::existing_junctions::ExistingJunctions;
use crate::genome_regions::GenomeRegions;
use crate::hotspots::HotspotCache;
use crate::junctions::{JunctionData, JunctionTracker, TrackerStats};
use crate::prep_config::PrepConfig;
use crate::read_group::ReadGroup;
use crate::read_id_trimmer::ReadIdTrimmer;

/// Read-only data shared by all partitions of one run
#[derive(Clone, Copy)]
pub struct PartitionResources<'a> {
    pub chrom_list: &'a ChromList,
    pub config: &'a PrepConfig,
    pub blacklist: Option<&'a GenomeRegions>,
    pub hotspots: Option<&'a HotspotCache>,
    pub existing_junctions: Option<&'a ExistingJunctions>,
    pub read_id_trimmer: Option<&'a ReadIdTrimmer>,
}

#[derive(Clone, Debug, Default)]
pub struct PartitionStats {
    pub tracker: TrackerStats,
    pub downsampled_read_count: usize,
    pub fragment_count: usize,
    pub spanning_group_count: usize,
}

pub struct PartitionResults {
    pub partition: Partition,
    pub junctions: Vec<JunctionData>,

    /// Linked fragments with all reads scanned by this partition only
    pub fragments: Vec<Fragment>,

    /// Linked groups which need to be reconciled with the results of other partitions
    pub spanning_groups: Vec<SpanningGroup>,

    pub stats: PartitionStats,
}

fn get_read_start_range(group: &ReadGroup) -> BaseRange {
    let max_start = group.reads.iter().map(|x| x.start).max().unwrap_or(0);
    BaseRange::new(group.min_start(), max_start)
}

/// Run the junction search over one partition
///
/// All reads starting in the partition window are scanned from `source`. Junctions are reported
/// for the partition core only.
///
pub fn process_partition(
    source: &mut dyn AlignmentSource,
    partition: &Partition,
    resources: &PartitionResources,
) -> PartitionResults {
    let config = resources.config;
    let chrom_index = partition.chrom_index;
    let blacklist = resources
        .blacklist
        .map(|x| &x.chroms[chrom_index])
        .filter(|x| !x.is_empty());

    let mut tracker = JunctionTracker::new(partition, config, blacklist, resources.hotspots);
    if let Some(existing_junctions) = resources.existing_junctions {
        tracker
            .seed_initial_junctions(existing_junctions.get_region_junctions(chrom_index, &partition.core));
    }

    let mut rate_tracker =
        ReadRateTracker::new(config.downsample_segment_size, config.downsample_threshold);
    source.visit_region(
        chrom_index,
        partition.window.start,
        partition.window.end,
        &mut |record| {
            if filter_out_alignment_record(record) || !rate_tracker.accept(record.pos() + 1) {
                return true;
            }
            let read =
                AlignedRead::from_bam_record(record, resources.chrom_list, resources.read_id_trimmer);
            tracker.add_read(read)
        },
    );

    let tracker_results = tracker.process();

    let mut fragments = Vec::new();
    let mut spanning_groups = Vec::new();
    for group in tracker_results.groups {
        if group.junction_keys.is_empty() {
            continue;
        }
        let start_range = get_read_start_range(&group);
        if group.is_complete() && partition.is_private_range(&start_range) {
            fragments.push(Fragment::from_group(chrom_index, group));
        } else {
            spanning_groups.push(SpanningGroup { chrom_index, group });
        }
    }

    let stats = PartitionStats {
        tracker: tracker_results.stats,
        downsampled_read_count: rate_tracker.downsampled_count(),
        fragment_count: fragments.len(),
        spanning_group_count: spanning_groups.len(),
    };

    debug!(
        "Partition {} finished with {} junctions, {} fragments and {} spanning groups",
        partition.task_id,
        tracker_results.junctions.len(),
        stats.fragment_count,
        stats.spanning_group_count
    );

    PartitionResults {
        partition: partition.clone(),
        junctions: tracker_results.junctions,
        fragments,
        spanning_groups,
        stats,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::junctions::JunctionKey;
    use crate::test_utils::*;

    fn get_test_resources<'a>(
        chrom_list: &'a ChromList,
        config: &'a PrepConfig,
    ) -> PartitionResources<'a> {
        PartitionResources {
            chrom_list,
            config,
            blacklist: None,
            hotspots: None,
            existing_junctions: None,
            read_id_trimmer: None,
        }
    }

    fn get_boundary_reads() -> Vec<String> {
        let mut sam_lines = Vec::new();
        let mut add_reads = |prefix: &str, count: usize, pos: i64, cigar: &str| {
            for i in 0..count {
                sam_lines.push(get_clipped_read_sam(&format!("{prefix}{i}"), pos, cigar, 0));
            }
        };
        add_reads("left", 3, 1431, "70M30S");
        add_reads("support", 2, 1901, "90M10S");
        add_reads("boundary", 3, 1936, "70M30S");
        add_reads("near", 1, 1936, "67M33S");
        add_reads("neg", 2, 2100, "30S70M");
        sam_lines
    }

    fn summarize(junctions: &[JunctionData]) -> Vec<(JunctionKey, usize, usize, usize)> {
        junctions
            .iter()
            .map(|x| {
                (
                    x.key,
                    x.junction_count(),
                    x.support_count(),
                    x.exact_support_count(),
                )
            })
            .collect()
    }

    fn get_test_partition(task_id: usize, core: BaseRange, config: &PrepConfig) -> Partition {
        Partition::new(
            task_id,
            0,
            core,
            config.max_support_distance,
            config.max_read_length,
            TEST_CHROM_LENGTH,
        )
    }

    /// Process chr1:1-4000 as one partition, then as two partitions split at 2000
    fn run_split_partitions(
        source: &mut TestAlignmentSource,
        resources: &PartitionResources,
    ) -> (PartitionResults, Vec<JunctionData>) {
        let single = get_test_partition(0, BaseRange::new(1, 4000), resources.config);
        let single_results = process_partition(source, &single, resources);

        let mut split_junctions = Vec::new();
        for (task_id, core) in [BaseRange::new(1, 2000), BaseRange::new(2001, 4000)]
            .into_iter()
            .enumerate()
        {
            let partition = get_test_partition(task_id, core, resources.config);
            split_junctions.extend(process_partition(source, &partition, resources).junctions);
        }
        (single_results, split_junctions)
    }

    #[test]
    fn test_partition_invariance() {
        let chrom_list = get_test_chrom_list();
        let config = PrepConfig {
            min_junction_support: 2,
            ..Default::default()
        };
        let resources = get_test_resources(&chrom_list, &config);
        let mut source = TestAlignmentSource::from_sam_lines(&get_boundary_reads());

        let (single_results, split_junctions) = run_split_partitions(&mut source, &resources);

        let single_summary = summarize(&single_results.junctions);
        assert_eq!(single_summary.len(), 3);
        assert_eq!(single_summary, summarize(&split_junctions));

        let key = JunctionKey::new(2005, crate::aligned_read::Orientation::Positive);
        let junction = single_results.junctions.iter().find(|x| x.key == key).unwrap();
        assert_eq!(junction.junction_count(), 3);
        assert_eq!(junction.exact_support_count(), 1);
        assert_eq!(junction.support_count(), 5);
    }

    #[test]
    fn test_partition_invariance_upstream_support() {
        let chrom_list = get_test_chrom_list();
        let config = PrepConfig {
            min_junction_support: 2,
            ..Default::default()
        };
        let resources = get_test_resources(&chrom_list, &config);

        // The chimeric read starts more than the support distance before the second core, but
        // ends within the support distance of the junction at 2010
        let mut sam_lines = vec![get_paired_read_sam("chim", 97, 950, "chr2", 9000, 0)];
        sam_lines.extend(
            (0..3).map(|i| get_clipped_read_sam(&format!("boundary{i}"), 1941, "70M30S", 0)),
        );
        let mut source = TestAlignmentSource::from_sam_lines(&sam_lines);

        let (single_results, split_junctions) = run_split_partitions(&mut source, &resources);
        let expected = vec![(
            JunctionKey::new(2010, crate::aligned_read::Orientation::Positive),
            3,
            1,
            0,
        )];
        assert_eq!(summarize(&single_results.junctions), expected);
        assert_eq!(summarize(&split_junctions), expected);
    }

    #[test]
    fn test_fragment_routing() {
        let chrom_list = get_test_chrom_list();
        let config = PrepConfig {
            min_junction_support: 2,
            ..Default::default()
        };
        let resources = get_test_resources(&chrom_list, &config);
        let sam_lines = ["mid0", "mid1"]
            .iter()
            .map(|x| get_clipped_read_sam(x, 5001, "70M30S", 0))
            .chain(
                ["edge0", "edge1"]
                    .iter()
                    .map(|x| get_clipped_read_sam(x, 9501, "70M30S", 0)),
            )
            .collect::<Vec<_>>();
        let mut source = TestAlignmentSource::from_sam_lines(&sam_lines);

        let partition = get_test_partition(0, BaseRange::new(1, 10000), &config);
        let results = process_partition(&mut source, &partition, &resources);
        assert_eq!(results.junctions.len(), 2);

        let fragment_ids = results.fragments.iter().map(|x| x.id.as_str()).collect::<Vec<_>>();
        assert_eq!(fragment_ids, vec!["mid0", "mid1"]);
        let spanning_ids = results
            .spanning_groups
            .iter()
            .map(|x| x.group.id.as_str())
            .collect::<Vec<_>>();
        assert_eq!(spanning_ids, vec!["edge0", "edge1"]);
    }

    #[test]
    fn test_partition_downsampling() {
        let chrom_list = get_test_chrom_list();
        let config = PrepConfig {
            min_junction_support: 1,
            downsample_threshold: 4,
            ..Default::default()
        };
        let resources = get_test_resources(&chrom_list, &config);
        let sam_lines = (0..8)
            .map(|i| get_clipped_read_sam(&format!("frag{i}"), 1431, "70M30S", 0))
            .collect::<Vec<_>>();
        let mut source = TestAlignmentSource::from_sam_lines(&sam_lines);

        let partition = get_test_partition(0, BaseRange::new(1, 4000), &config);
        let results = process_partition(&mut source, &partition, &resources);
        assert_eq!(results.stats.downsampled_read_count, 2);
        assert_eq!(results.stats.tracker.read_count, 6);
        assert_eq!(results.junctions[0].junction_count(), 6);
    }
}
