//! Track stats for the whole svprep run
//!

use std::collections::BTreeMap;
use std::fs::File;

use camino::Utf8Path;
use log::info;
use serde::{Deserialize, Serialize};
use strum::IntoEnumIterator;
use unwrap::unwrap;

use crate::partition::{PartitionStats, ReconcilerStats};
use crate::read_filters::ReadFilterType;

pub const RUN_STATS_FILENAME: &str = "run.stats.json";

#[derive(Default, Deserialize, Serialize)]
pub struct ReadStats {
    pub total_read_count: usize,

    /// Count of reads failing each filter, a read may fail more than one
    pub filter_counts: BTreeMap<String, usize>,

    pub downsampled_read_count: usize,

    /// Partitions which stopped reading input after reaching the partition read limit
    pub halted_partition_count: usize,
}

#[derive(Default, Deserialize, Serialize)]
pub struct GroupStats {
    pub purged_group_count: usize,
    pub dropped_group_count: usize,
    pub direct_fragment_count: usize,
    pub spanning_group_count: usize,
    pub merged_spanning_group_count: usize,
    pub recovered_read_count: usize,
    pub incomplete_fragment_count: usize,
}

#[derive(Default, Deserialize, Serialize)]
pub struct JunctionStats {
    pub initial_junction_count: usize,
    pub candidate_junction_count: usize,
    pub discordant_junction_count: usize,
    pub retained_junction_count: usize,
}

#[derive(Default, Deserialize, Serialize)]
pub struct PrepRunStats {
    pub partition_count: usize,
    pub max_fragment_length: i64,
    pub is_fragment_length_estimated: bool,
    pub read_stats: ReadStats,
    pub group_stats: GroupStats,
    pub junction_stats: JunctionStats,
    pub total_runtime_secs: f64,
}

impl PrepRunStats {
    pub fn merge_partition_stats(&mut self, stats: &PartitionStats) {
        let tracker = &stats.tracker;
        self.partition_count += 1;

        let read_stats = &mut self.read_stats;
        read_stats.total_read_count += tracker.read_count;
        for filter in ReadFilterType::iter() {
            let label: &str = filter.into();
            *read_stats.filter_counts.entry(label.to_string()).or_default() +=
                tracker.filter_counts[filter as usize];
        }
        read_stats.downsampled_read_count += stats.downsampled_read_count;
        if tracker.is_halted {
            read_stats.halted_partition_count += 1;
        }

        let group_stats = &mut self.group_stats;
        group_stats.purged_group_count += tracker.purged_group_count;
        group_stats.dropped_group_count += tracker.dropped_group_count;
        group_stats.direct_fragment_count += stats.fragment_count;
        group_stats.spanning_group_count += stats.spanning_group_count;

        let junction_stats = &mut self.junction_stats;
        junction_stats.initial_junction_count += tracker.initial_junction_count;
        junction_stats.candidate_junction_count += tracker.candidate_junction_count;
        junction_stats.discordant_junction_count += tracker.discordant_junction_count;
        junction_stats.retained_junction_count += tracker.retained_junction_count;
    }

    pub fn merge_reconciler_stats(&mut self, stats: &ReconcilerStats) {
        self.group_stats.merged_spanning_group_count += stats.merged_group_count;
        self.group_stats.recovered_read_count += stats.recovered_read_count;
        self.group_stats.incomplete_fragment_count += stats.incomplete_fragment_count;
    }
}

/// Write run_stats structure out in json format
pub fn write_run_stats(output_dir: &Utf8Path, run_stats: &PrepRunStats) {
    let filename = output_dir.join(RUN_STATS_FILENAME);

    info!("Writing run statistics to file: '{filename}'");

    let f = unwrap!(
        File::create(&filename),
        "Unable to create run statistics json file: '{filename}'"
    );

    unwrap!(
        serde_json::to_writer_pretty(&f, &run_stats),
        "Unable to write run statistics json file: '{filename}'"
    );
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::junctions::TrackerStats;

    #[test]
    fn test_merge_partition_stats() {
        let mut tracker = TrackerStats {
            read_count: 10,
            is_halted: true,
            retained_junction_count: 2,
            ..Default::default()
        };
        tracker.filter_counts[ReadFilterType::MinMapQual as usize] = 3;
        let stats = PartitionStats {
            tracker,
            downsampled_read_count: 4,
            fragment_count: 1,
            spanning_group_count: 2,
        };

        let mut run_stats = PrepRunStats::default();
        run_stats.merge_partition_stats(&stats);
        run_stats.merge_partition_stats(&stats);
        assert_eq!(run_stats.partition_count, 2);
        assert_eq!(run_stats.read_stats.total_read_count, 20);
        assert_eq!(run_stats.read_stats.filter_counts["MinMapQual"], 6);
        assert_eq!(run_stats.read_stats.filter_counts["PolyGClip"], 0);
        assert_eq!(run_stats.read_stats.halted_partition_count, 2);
        assert_eq!(run_stats.group_stats.spanning_group_count, 4);
        assert_eq!(run_stats.junction_stats.retained_junction_count, 4);
    }
}
