use std::collections::HashMap;
use std::collections::hash_map::Entry;

use log::{debug, warn};
use strum::EnumCount;

use super::discordant_groups::{DiscordantSide, form_discordant_junctions, is_discordant_group};
use super::exact_support::is_exact_support;
use super::junction_data::{JunctionData, JunctionKey, ReadRef};
use super::junction_index::JunctionIndex;
use super::remote_junction::RemoteJunction;
use crate::aligned_read::{AlignedRead, ClipSide, Orientation, ReadType};
use crate::base_range::BaseRange;
use crate::cigar_utils::get_total_clip_lengths;
use crate::genome_regions::ChromRegions;
use crate::hotspots::HotspotCache;
use crate::partition::Partition;
use crate::prep_config::PrepConfig;
use crate::read_filters::{ReadFilterType, check_filters, classify_read, is_candidate_supporting_read};
use crate::read_group::{GroupId, ReadGroup};
use crate::region_utils::ChromRegion;

#[derive(Clone, Debug, Default)]
pub struct TrackerStats {
    pub read_count: usize,
    pub filter_counts: [usize; ReadFilterType::COUNT],
    pub purged_group_count: usize,
    pub dropped_group_count: usize,
    pub is_halted: bool,
    pub initial_junction_count: usize,
    pub candidate_junction_count: usize,
    pub discordant_junction_count: usize,
    pub retained_junction_count: usize,
}

pub struct TrackerResults {
    /// Retained junctions in ascending position order
    pub junctions: Vec<JunctionData>,

    /// Group arena referenced by the junction group ids
    pub groups: Vec<ReadGroup>,

    pub stats: TrackerStats,
}

#[derive(Clone, Copy, PartialEq)]
enum SupportType {
    Support,
    ExactSupport,
}

/// Junction search state for a single partition
///
/// Reads are added in position order with `add_read`, after which `process` runs the junction
/// creation, support, discordant clustering and filtering phases in sequence.
///
pub struct JunctionTracker<'a> {
    partition: &'a Partition,
    config: &'a PrepConfig,
    blacklist: Option<&'a ChromRegions>,
    hotspots: Option<&'a HotspotCache>,
    window_region: ChromRegion,

    ingest_groups: HashMap<String, ReadGroup>,
    groups: Vec<ReadGroup>,
    junctions: JunctionIndex,
    stats: TrackerStats,
}

/// Supporting reads must face the junction from the aligned side, within the max support distance
fn is_discordant_support(read: &AlignedRead, key: &JunctionKey, config: &PrepConfig) -> bool {
    if read.orientation() != key.orientation
        || !is_candidate_supporting_read(read, &config.filters)
    {
        return false;
    }
    let distance = match key.orientation {
        Orientation::Positive => key.position - read.end,
        Orientation::Negative => read.start - key.position,
    };
    distance >= 0 && distance <= config.max_support_distance
}

/// Partner junction implied by the supplementary alignment of a clipped read
fn get_supplementary_remote(read: &AlignedRead) -> Option<RemoteJunction> {
    let sa = read.supplementary_data.as_ref()?;
    let (left_clip, right_clip) = get_total_clip_lengths(&sa.cigar);
    if left_clip == 0 && right_clip == 0 {
        return None;
    }
    Some(if left_clip > right_clip {
        RemoteJunction::new(sa.chrom_index, sa.start, Orientation::Negative)
    } else {
        RemoteJunction::new(sa.chrom_index, sa.end(), Orientation::Positive)
    })
}

fn has_group_read_above_mapq(
    groups: &[ReadGroup],
    group_ids: &[GroupId],
    read_types: &[ReadType],
    min_mapq: u8,
) -> bool {
    group_ids.iter().any(|&x| {
        groups[x]
            .reads
            .iter()
            .any(|r| read_types.contains(&r.read_type) && r.mapq >= min_mapq)
    })
}

fn is_junction_retained(junction: &JunctionData, groups: &[ReadGroup], config: &PrepConfig) -> bool {
    if junction.discordant_group {
        return true;
    }

    if junction.initial && junction.total_support() > 0 {
        return true;
    }

    if junction.hotspot
        && junction.junction_count() + junction.exact_support_count() >= config.min_hotspot_support
    {
        return true;
    }

    let has_mapq_read = has_group_read_above_mapq(
        groups,
        &junction.junction_groups,
        &[ReadType::Junction],
        config.min_junction_mapq,
    ) || has_group_read_above_mapq(
        groups,
        &junction.exact_support_groups,
        // An exact support read keeps the junction type when it also created a junction
        &[ReadType::ExactSupport, ReadType::Junction],
        config.min_junction_mapq,
    );

    has_mapq_read && junction.junction_count() >= config.min_junction_support
}

impl<'a> JunctionTracker<'a> {
    pub fn new(
        partition: &'a Partition,
        config: &'a PrepConfig,
        blacklist: Option<&'a ChromRegions>,
        hotspots: Option<&'a HotspotCache>,
    ) -> Self {
        Self {
            partition,
            config,
            blacklist,
            hotspots,
            window_region: partition.window_region(),
            ingest_groups: HashMap::new(),
            groups: Vec::new(),
            junctions: JunctionIndex::default(),
            stats: TrackerStats::default(),
        }
    }

    /// Add junctions from a previous run, these are retained if they find any support
    pub fn seed_initial_junctions(&mut self, keys: &[JunctionKey]) {
        for key in keys {
            if !self.partition.core.contains(key.position) {
                continue;
            }
            let (index, _) = self.junctions.get_or_insert(*key);
            self.junctions.get_mut(index).initial = true;
            self.stats.initial_junction_count += 1;
        }
    }

    pub fn is_halted(&self) -> bool {
        self.stats.is_halted
    }

    /// Classify the read and add it to its fragment's group
    ///
    /// Returns false once the partition read limit has been reached, after which all further
    /// reads are ignored.
    ///
    pub fn add_read(&mut self, mut read: AlignedRead) -> bool {
        if self.stats.is_halted {
            return false;
        }
        if self.stats.read_count >= self.config.max_partition_reads {
            warn!(
                "Partition {} at chromosome index {} {:?} exceeded the maximum read count of {}, halting read input",
                self.partition.task_id,
                self.partition.chrom_index,
                self.partition.core,
                self.config.max_partition_reads
            );
            self.stats.is_halted = true;
            return false;
        }
        assert_eq!(
            read.chrom_index, self.partition.chrom_index,
            "Read '{}' is not on the partition chromosome",
            read.read_id
        );
        self.stats.read_count += 1;

        read.filters = check_filters(&read, &self.config.filters);
        for filter in read.filters.iter() {
            self.stats.filter_counts[filter as usize] += 1;
        }
        let is_blacklisted = self
            .blacklist
            .is_some_and(|x| x.contains_range(&BaseRange::new(read.start, read.end)));
        read.read_type = classify_read(&read, self.config, is_blacklisted);

        let group = match self.ingest_groups.entry(read.read_id.clone()) {
            Entry::Occupied(entry) => {
                let group = entry.into_mut();
                group.add_read(read);
                group
            }
            Entry::Vacant(entry) => entry.insert(ReadGroup::new(read)),
        };
        group.update_status(&self.window_region);

        if group.is_simple_complete() && (!group.has_evidence() || group.all_blacklisted()) {
            let group_id = group.id.clone();
            self.ingest_groups.remove(&group_id);
            self.stats.purged_group_count += 1;
        }
        true
    }

    /// Move all groups with evidence into the group arena in a deterministic order
    fn finish_ingest(&mut self) {
        let mut groups = Vec::new();
        for (_, group) in self.ingest_groups.drain() {
            if group.has_evidence() {
                groups.push(group);
            } else {
                self.stats.dropped_group_count += 1;
            }
        }
        groups.sort_by(|a, b| (a.min_start(), &a.id).cmp(&(b.min_start(), &b.id)));
        self.groups = groups;
    }

    /// Get all junctions implied by a junction read, with a flag indicating if the junction
    /// comes from an indel
    fn get_read_junctions(&self, read: &AlignedRead) -> Vec<(JunctionKey, bool)> {
        let indels = read.get_indel_boundaries(self.config.min_indel_length);
        if !indels.is_empty() {
            return indels
                .into_iter()
                .flat_map(|(before, after)| {
                    [
                        (JunctionKey::new(before, Orientation::Positive), true),
                        (JunctionKey::new(after, Orientation::Negative), true),
                    ]
                })
                .collect();
        }

        let Some(side) = read.dominant_clip_side() else {
            return Vec::new();
        };
        if read.clip_length(side) < self.config.filters.min_soft_clip_length {
            return Vec::new();
        }
        let position = read.clip_boundary(side);
        if self.blacklist.is_some_and(|x| x.intersect_pos(position)) {
            return Vec::new();
        }
        vec![(JunctionKey::new(position, side.orientation()), false)]
    }

    fn create_junctions(&mut self) {
        let chrom_index = self.partition.chrom_index;
        for group_id in 0..self.groups.len() {
            if !self.groups[group_id].has_junction_read() {
                continue;
            }

            let mut local_keys = Vec::new();
            let mut remotes = Vec::new();
            for read in self.groups[group_id].reads.iter() {
                if read.read_type != ReadType::Junction {
                    continue;
                }
                for (key, is_indel) in self.get_read_junctions(read) {
                    if self.partition.core.contains(key.position) {
                        local_keys.push((key, is_indel));
                    } else {
                        remotes.push(RemoteJunction::new(
                            chrom_index,
                            key.position,
                            key.orientation,
                        ));
                    }
                }
                if self.config.track_remotes {
                    remotes.extend(get_supplementary_remote(read));
                }
            }

            for &(key, is_indel) in local_keys.iter() {
                let (index, is_new) = self.junctions.get_or_insert(key);
                if is_new {
                    self.stats.candidate_junction_count += 1;
                }
                let junction = self.junctions.get_mut(index);
                junction.internal_indel |= is_indel;
                if self.groups[group_id].junction_keys.insert(key) {
                    junction.add_junction_group(group_id);
                }
            }

            for (key, _) in local_keys {
                if let Ok(index) = self.junctions.find(&key) {
                    let junction = self.junctions.get_mut(index);
                    for remote in remotes.iter() {
                        junction.add_remote_junction(remote.clone());
                    }
                }
            }
        }
    }

    /// Pick the clipped junction read with the most high-quality clipped bases for each junction
    fn assign_representatives(&mut self) {
        let min_qual = self.config.filters.soft_clip_high_qual;
        for junction in self.junctions.iter_mut() {
            let side = ClipSide::from_orientation(junction.orientation());
            for group_index in 0..junction.junction_groups.len() {
                let group_id = junction.junction_groups[group_index];
                for (read_index, read) in self.groups[group_id].reads.iter().enumerate() {
                    if read.read_type != ReadType::Junction
                        || read.clip_length(side) == 0
                        || read.clip_boundary(side) != junction.position()
                    {
                        continue;
                    }
                    junction.offer_representative(
                        ReadRef {
                            group_id,
                            read_index,
                        },
                        read.clip_high_qual_count(side, min_qual),
                    );
                }
            }
        }
    }

    /// Find the support of one group against nearby junctions without modifying any state
    fn get_group_support(&mut self, group_id: GroupId) -> Vec<(JunctionKey, SupportType, usize)> {
        let max_distance = self.config.max_support_distance;
        let group = &self.groups[group_id];
        let mut credits: Vec<(JunctionKey, SupportType, usize)> = Vec::new();
        for (read_index, read) in group.reads.iter().enumerate() {
            if !matches!(
                read.read_type,
                ReadType::CandidateSupport | ReadType::Junction
            ) {
                continue;
            }

            let indices = self
                .junctions
                .range_indices(read.start - max_distance, read.end + max_distance);
            for junction_index in indices {
                let junction = self.junctions.get(junction_index);
                let key = junction.key;
                if group.junction_keys.contains(&key) || credits.iter().any(|x| x.0 == key) {
                    continue;
                }

                let is_exact = junction.representative.is_some_and(|rep| {
                    rep.group_id != group_id
                        && is_exact_support(
                            read,
                            &key,
                            &self.groups[rep.group_id].reads[rep.read_index],
                            self.config,
                        )
                });
                if is_exact {
                    credits.push((key, SupportType::ExactSupport, read_index));
                } else if is_discordant_support(read, &key, self.config) {
                    credits.push((key, SupportType::Support, read_index));
                }
            }
        }
        credits
    }

    /// Credit groups with chimeric or clipped reads to nearby junctions
    fn assign_support(&mut self) {
        let cap = self.config.junction_fragment_cap;

        // The group arena is already in ascending order of leftmost read position
        for group_id in 0..self.groups.len() {
            for (key, support_type, read_index) in self.get_group_support(group_id) {
                let Ok(junction_index) = self.junctions.find(&key) else {
                    continue;
                };
                let junction = self.junctions.get_mut(junction_index);
                let is_added = match support_type {
                    SupportType::ExactSupport => junction.add_exact_support_group(group_id, cap),
                    SupportType::Support => junction.add_support_group(group_id, cap),
                };
                if !is_added {
                    continue;
                }

                let group = &mut self.groups[group_id];
                group.junction_keys.insert(key);
                let read = &mut group.reads[read_index];
                let support_read_type = match support_type {
                    SupportType::ExactSupport => ReadType::ExactSupport,
                    SupportType::Support => ReadType::Support,
                };
                if support_read_type.evidence_rank() > read.read_type.evidence_rank() {
                    read.read_type = support_read_type;
                }
            }
        }
    }

    fn add_discordant_side(
        &mut self,
        side: &DiscordantSide,
        other_side: &DiscordantSide,
        group_ids: &[GroupId],
    ) {
        let key = JunctionKey::new(side.position, side.orientation);
        let (index, is_new) = self.junctions.get_or_insert(key);
        if is_new {
            self.stats.discordant_junction_count += 1;
        }
        let junction = self.junctions.get_mut(index);
        junction.discordant_group = true;
        junction.add_remote_junction(RemoteJunction {
            chrom_index: other_side.chrom_index,
            position: other_side.position,
            orientation: other_side.orientation,
            fragment_count: group_ids.len() as u32,
        });

        for &group_id in group_ids {
            let group = &mut self.groups[group_id];
            if group.junction_keys.contains(&key)
                || !junction.add_support_group(group_id, self.config.junction_fragment_cap)
            {
                continue;
            }
            group.junction_keys.insert(key);
            for read in group.reads.iter_mut() {
                if read.read_type == ReadType::CandidateSupport {
                    read.read_type = ReadType::Support;
                }
            }
        }
    }

    /// Cluster uncredited discordant pairs into junctions
    fn form_discordant_junctions(&mut self) {
        let candidate_ids = (0..self.groups.len())
            .filter(|&x| {
                self.groups[x].junction_keys.is_empty()
                    && is_discordant_group(&self.groups[x], &self.config.filters)
            })
            .collect::<Vec<_>>();

        let pairs = form_discordant_junctions(&self.groups, &candidate_ids, &self.config.filters);
        for pair in pairs {
            for (side, other_side) in [(&pair.local, &pair.remote), (&pair.remote, &pair.local)] {
                if side.chrom_index == self.partition.chrom_index
                    && self.partition.core.contains(side.position)
                {
                    self.add_discordant_side(side, other_side, &pair.group_ids);
                }
            }
        }
    }

    /// Flag junctions matching a hotspot
    ///
    /// A junction with remote junctions must match both sides of a hotspot pair, otherwise a
    /// match to the local side is sufficient.
    ///
    fn mark_hotspots(&mut self) {
        let Some(hotspots) = self.hotspots else {
            return;
        };
        let chrom_index = self.partition.chrom_index;
        let partition_hotspots = hotspots.find_partition_regions(chrom_index, &self.partition.core);
        if partition_hotspots.is_empty() {
            return;
        }

        for junction in self.junctions.iter_mut() {
            let (pos, orientation) = (junction.position(), junction.orientation());
            if !partition_hotspots
                .iter()
                .any(|x| x.local.matches(chrom_index, pos, orientation))
            {
                continue;
            }
            junction.hotspot = junction.remote_junctions.is_empty()
                || junction.remote_junctions.iter().any(|r| {
                    hotspots.matches_pair(
                        chrom_index,
                        pos,
                        orientation,
                        r.chrom_index,
                        r.position,
                        r.orientation,
                    )
                });
        }
    }

    /// Remove junctions without sufficient support, then update group junction sets to match
    fn filter_junctions(&mut self) {
        let groups = &self.groups;
        let config = self.config;
        self.junctions
            .retain(|x| is_junction_retained(x, groups, config));
        self.stats.retained_junction_count = self.junctions.len();

        for group in self.groups.iter_mut() {
            group.junction_keys.clear();
        }
        for junction in self.junctions.junctions() {
            for &group_id in junction
                .junction_groups
                .iter()
                .chain(junction.support_groups.iter())
                .chain(junction.exact_support_groups.iter())
            {
                self.groups[group_id].junction_keys.insert(junction.key);
            }
        }
    }

    /// Annotate junctions with the count of fragments spanning their position
    fn capture_depth(&mut self) {
        let core = self.partition.core;
        let mut depth_change = vec![0i32; core.size() as usize + 1];
        for group in self.groups.iter() {
            let start = std::cmp::max(group.min_start(), core.start);
            let end = std::cmp::min(group.max_end(), core.end);
            if start > end {
                continue;
            }
            depth_change[(start - core.start) as usize] += 1;
            depth_change[(end - core.start + 1) as usize] -= 1;
        }

        let mut depth = Vec::with_capacity(depth_change.len());
        let mut current = 0;
        for change in depth_change {
            current += change;
            depth.push(current);
        }

        for junction in self.junctions.iter_mut() {
            junction.depth = depth[(junction.position() - core.start) as usize] as u32;
        }
    }

    /// Run all junction phases on the ingested reads
    pub fn process(mut self) -> TrackerResults {
        self.finish_ingest();
        self.create_junctions();
        self.assign_representatives();
        self.assign_support();
        self.form_discordant_junctions();
        self.mark_hotspots();
        self.filter_junctions();
        if self.config.capture_depth {
            self.capture_depth();
        }
        debug_assert!(self.junctions.is_sorted());

        debug!(
            "Partition {} processed {} reads into {} groups and {} junctions",
            self.partition.task_id,
            self.stats.read_count,
            self.groups.len(),
            self.junctions.len()
        );

        TrackerResults {
            junctions: self.junctions.into_junctions(),
            groups: self.groups,
            stats: self.stats,
        }
    }
}
