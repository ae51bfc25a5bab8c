use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::mpsc::channel;

use log::info;
use thousands::Separable;
use unwrap::unwrap;

use crate::base_range::BaseRange;
use crate::chrom_list::ChromList;
use crate::genome_regions::GenomeRegions;
use crate::junctions::JunctionData;
use crate::partition::{
    Fragment, Partition, PartitionResources, process_partition, sort_fragments,
    spawn_spanning_reconciler,
};
use crate::region_utils::{get_region_segments, get_region_segments_with_offset};
use crate::run_stats::PrepRunStats;
use crate::worker_thread_data::BamReaderWorkerThreadDataSet;

/// Get the partition core ranges of one chromosome, in zero-indexed half-open coordinates
///
/// Partitions are found from the full chromosome, or only from target regions when these are
/// given (typically in a debugging context)
///
fn get_chrom_partition_segments(
    chrom_size: u64,
    chrom_target_regions: Option<&[BaseRange]>,
    partition_size: u64,
) -> Vec<(u64, u64)> {
    match chrom_target_regions {
        Some(regions) => {
            let mut all_region_segments = Vec::new();
            for region in regions {
                let start = (region.start - 1) as u64;
                let size = region.size() as u64;
                let region_segments = get_region_segments_with_offset(start, size, partition_size);
                all_region_segments.extend(region_segments);
            }
            all_region_segments
        }
        None => get_region_segments(chrom_size, partition_size),
    }
}

/// Generate all partitions of the genome with sequential task ids
///
pub fn get_partitions(
    chrom_list: &ChromList,
    target_regions: Option<&GenomeRegions>,
    partition_size: u64,
    max_support_distance: i64,
    max_read_length: i64,
) -> Vec<Partition> {
    let mut partitions = Vec::new();
    for (chrom_index, chrom_info) in chrom_list.data.iter().enumerate() {
        let chrom_size = chrom_info.length;
        if chrom_size == 0 {
            continue;
        }
        let chrom_target_regions = target_regions.map(|x| {
            x.chroms[chrom_index].get_overlapping_ranges(&BaseRange::new(1, chrom_size as i64))
        });
        if chrom_target_regions.as_ref().is_some_and(|x| x.is_empty()) {
            continue;
        }

        let segments =
            get_chrom_partition_segments(chrom_size, chrom_target_regions.as_deref(), partition_size);
        for (start, end) in segments {
            let end = std::cmp::min(end, chrom_size);
            if start >= end {
                continue;
            }
            partitions.push(Partition::new(
                partitions.len(),
                chrom_index,
                BaseRange::from_zero_based(start as i64, end as i64),
                max_support_distance,
                max_read_length,
                chrom_size as i64,
            ));
        }
    }
    partitions
}

pub struct ScanResults {
    /// Retained junctions for each chromosome, in position order
    pub genome_junctions: Vec<Vec<JunctionData>>,

    pub fragments: Vec<Fragment>,
}

/// Run the junction search over all partitions of the alignment file
///
/// Partitions are delegated out to worker threads which each use a persistent alignment file
/// reader. Fragments spanning partitions are reconciled on a separate thread, and any reads
/// still missing from these fragments are then recovered with the first worker's reader.
///
pub fn scan_partitions(
    thread_count: usize,
    worker_thread_dataset: &BamReaderWorkerThreadDataSet,
    partitions: Vec<Partition>,
    resources: &PartitionResources,
    run_stats: &mut PrepRunStats,
) -> ScanResults {
    assert!(thread_count > 0);

    let worker_pool = unwrap!(
        rayon::ThreadPoolBuilder::new()
            .num_threads(thread_count)
            .build(),
        "Unable to create worker thread pool"
    );

    let partition_count = partitions.len();
    info!(
        "Scanning alignments in {} partitions",
        partition_count.separate_with_commas()
    );

    let (tx, rx) = channel();
    let (spanning_tx, spanning_rx) = channel();
    let reconciler_handle = spawn_spanning_reconciler(spanning_rx);

    let completed_count = AtomicUsize::new(0);
    let report_interval = std::cmp::max(partition_count / 20, 1);
    let completed_count = &completed_count;
    worker_pool.scope(move |scope| {
        for partition in partitions {
            let worker_thread_dataset = worker_thread_dataset.clone();
            let tx = tx.clone();
            let spanning_tx = spanning_tx.clone();

            scope.spawn(move |_| {
                let worker_id = unwrap!(
                    rayon::current_thread_index(),
                    "Partition task is not running on the worker pool"
                );
                let mut worker_data = unwrap!(
                    worker_thread_dataset[worker_id].lock(),
                    "Worker thread data lock is poisoned"
                );

                let mut results =
                    process_partition(&mut worker_data.bam_reader, &partition, resources);
                drop(worker_data);

                let spanning_groups = std::mem::take(&mut results.spanning_groups);
                if !spanning_groups.is_empty() {
                    spanning_tx.send(spanning_groups).unwrap();
                }
                tx.send(results).unwrap();

                let completed = completed_count.fetch_add(1, Ordering::Relaxed) + 1;
                if completed % report_interval == 0 || completed == partition_count {
                    info!("Completed {completed} of {partition_count} partitions");
                }
            });
        }
    });

    let chrom_count = resources.chrom_list.data.len();
    let mut partition_results = rx.iter().collect::<Vec<_>>();
    partition_results.sort_by_key(|x| x.partition.task_id);

    let mut genome_junctions = vec![Vec::new(); chrom_count];
    let mut fragments = Vec::new();
    for results in partition_results {
        run_stats.merge_partition_stats(&results.stats);
        genome_junctions[results.partition.chrom_index].extend(results.junctions);
        fragments.extend(results.fragments);
    }

    let mut reconciler = unwrap!(reconciler_handle.join(), "Spanning fragment reconciler failed");
    info!(
        "Reconciling {} fragments spanning partitions",
        reconciler.pending_count().separate_with_commas()
    );
    {
        let mut worker_data = unwrap!(
            worker_thread_dataset[0].lock(),
            "Worker thread data lock is poisoned"
        );
        reconciler.recover_missing_reads(
            &mut worker_data.bam_reader,
            resources.chrom_list,
            resources.config.max_recovery_scan_depth,
            resources.read_id_trimmer,
        );
    }
    let (spanning_fragments, reconciler_stats) = reconciler.finish();
    run_stats.merge_reconciler_stats(&reconciler_stats);
    fragments.extend(spanning_fragments);
    sort_fragments(&mut fragments);

    info!("Finished processing all alignments");

    ScanResults {
        genome_junctions,
        fragments,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::get_test_chrom_list;

    #[test]
    fn test_get_partitions() {
        let chrom_list = get_test_chrom_list();
        let partitions = get_partitions(&chrom_list, None, 30_000, 1000, 500);
        assert_eq!(partitions.len(), 8);
        assert_eq!(partitions[0].core, BaseRange::new(1, 30_000));
        assert_eq!(partitions[0].window, BaseRange::new(1, 31_000));
        assert_eq!(partitions[1].window, BaseRange::new(28_501, 61_000));
        assert_eq!(partitions[3].core, BaseRange::new(90_001, 100_000));
        assert_eq!(partitions[4].chrom_index, 1);
        assert!(partitions.iter().enumerate().all(|(i, x)| x.task_id == i));
    }

    #[test]
    fn test_get_target_partitions() {
        let chrom_list = get_test_chrom_list();
        let target_regions = GenomeRegions::from_target_regions(
            &chrom_list,
            &["chr2:1001-2000".to_string(), "chr2:5001-5500".to_string()],
        )
        .unwrap();
        let partitions = get_partitions(&chrom_list, Some(&target_regions), 600, 100, 150);
        let cores = partitions.iter().map(|x| x.core).collect::<Vec<_>>();
        assert_eq!(
            cores,
            vec![
                BaseRange::new(1001, 1600),
                BaseRange::new(1601, 2000),
                BaseRange::new(5001, 5500)
            ]
        );
        assert!(partitions.iter().all(|x| x.chrom_index == 1));
    }
}
