use itertools::Itertools;

use crate::aligned_read::{AlignedRead, Orientation};
use crate::prep_config::ReadFilterConfig;
use crate::read_group::{GroupId, ReadGroup};

/// Maximum distance between local anchors of fragments in one discordant cluster
pub const DISCORDANT_LOCAL_DISTANCE: i64 = 500;

/// Maximum distance between remote anchors of fragments in one discordant cluster
pub const DISCORDANT_REMOTE_DISTANCE: i64 = 1000;

pub const MIN_DISCORDANT_GROUP_SIZE: usize = 5;

/// One breakpoint side implied by a discordant pair
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct DiscordantSide {
    pub chrom_index: usize,
    pub position: i64,
    pub orientation: Orientation,
}

/// Breakpoint pair implied by a cluster of discordant fragments
#[derive(Clone, Debug)]
pub struct DiscordantJunctionPair {
    pub local: DiscordantSide,
    pub remote: DiscordantSide,
    pub group_ids: Vec<GroupId>,
}

fn is_discordant_read(read: &AlignedRead, config: &ReadFilterConfig) -> bool {
    if read.is_supplementary() || !read.is_paired() {
        return false;
    }
    match read.mate_chrom_index {
        Some(mate_chrom_index) => {
            mate_chrom_index != read.chrom_index
                || read.is_reverse() == read.is_mate_reverse()
                || read.insert_size.abs() > config.max_fragment_length
        }
        None => false,
    }
}

/// A fragment is a clustering candidate if it has a discordant primary read and no
/// supplementary alignments
pub fn is_discordant_group(group: &ReadGroup, config: &ReadFilterConfig) -> bool {
    !group.has_supplementary_data()
        && group.reads.iter().any(|x| is_discordant_read(x, config))
}

struct DiscordantAnchors {
    group_id: GroupId,
    local: DiscordantSide,
    remote: DiscordantSide,
}

/// Breakpoint side anchors are the read boundaries facing the breakpoint
fn get_anchors(
    group_id: GroupId,
    group: &ReadGroup,
    config: &ReadFilterConfig,
) -> Option<DiscordantAnchors> {
    let read = group.reads.iter().find(|x| is_discordant_read(x, config))?;
    let mate_chrom_index = read.mate_chrom_index?;

    let local_orientation = Orientation::from_strand(!read.is_reverse());
    let local_position = match local_orientation {
        Orientation::Positive => read.end,
        Orientation::Negative => read.start,
    };

    let remote_orientation = Orientation::from_strand(!read.is_mate_reverse());
    let remote_position = match remote_orientation {
        Orientation::Positive => read
            .mate_end
            .unwrap_or(read.mate_start + read.read_len() as i64 - 1),
        Orientation::Negative => read.mate_start,
    };

    Some(DiscordantAnchors {
        group_id,
        local: DiscordantSide {
            chrom_index: read.chrom_index,
            position: local_position,
            orientation: local_orientation,
        },
        remote: DiscordantSide {
            chrom_index: mate_chrom_index,
            position: remote_position,
            orientation: remote_orientation,
        },
    })
}

/// Position of a cluster's breakpoint side: the outermost anchor in the breakpoint direction
fn get_side_position(orientation: Orientation, min_pos: i64, max_pos: i64) -> i64 {
    match orientation {
        Orientation::Positive => max_pos,
        Orientation::Negative => min_pos,
    }
}

/// Cluster discordant fragments into breakpoint pairs
///
/// Candidate fragments are sorted by remote chromosome, orientations and local anchor. Each
/// unclustered fragment starts a new cluster which absorbs every later fragment whose local
/// anchor is within `DISCORDANT_LOCAL_DISTANCE` and remote anchor within
/// `DISCORDANT_REMOTE_DISTANCE` of the cluster bounds, widening the bounds as it grows.
///
pub fn form_discordant_junctions(
    groups: &[ReadGroup],
    candidate_ids: &[GroupId],
    config: &ReadFilterConfig,
) -> Vec<DiscordantJunctionPair> {
    let anchors = candidate_ids
        .iter()
        .filter_map(|&x| get_anchors(x, &groups[x], config))
        .sorted_by_key(|x| {
            (
                x.remote.chrom_index,
                x.local.orientation,
                x.remote.orientation,
                x.local.position,
                x.group_id,
            )
        })
        .collect::<Vec<_>>();

    let mut pairs = Vec::new();
    let mut is_clustered = vec![false; anchors.len()];
    for i in 0..anchors.len() {
        if is_clustered[i] {
            continue;
        }
        is_clustered[i] = true;

        let first = &anchors[i];
        let mut members = vec![first.group_id];
        let (mut local_min, mut local_max) = (first.local.position, first.local.position);
        let (mut remote_min, mut remote_max) = (first.remote.position, first.remote.position);

        for j in (i + 1)..anchors.len() {
            if is_clustered[j] {
                continue;
            }
            let next = &anchors[j];
            if next.remote.chrom_index != first.remote.chrom_index
                || next.local.orientation != first.local.orientation
                || next.remote.orientation != first.remote.orientation
                || next.local.position > local_max + DISCORDANT_LOCAL_DISTANCE
            {
                break;
            }
            if next.remote.position < remote_min - DISCORDANT_REMOTE_DISTANCE
                || next.remote.position > remote_max + DISCORDANT_REMOTE_DISTANCE
            {
                continue;
            }

            is_clustered[j] = true;
            members.push(next.group_id);
            local_max = std::cmp::max(local_max, next.local.position);
            remote_min = std::cmp::min(remote_min, next.remote.position);
            remote_max = std::cmp::max(remote_max, next.remote.position);
        }

        if members.len() < MIN_DISCORDANT_GROUP_SIZE {
            continue;
        }

        members.sort();
        pairs.push(DiscordantJunctionPair {
            local: DiscordantSide {
                chrom_index: first.local.chrom_index,
                position: get_side_position(first.local.orientation, local_min, local_max),
                orientation: first.local.orientation,
            },
            remote: DiscordantSide {
                chrom_index: first.remote.chrom_index,
                position: get_side_position(first.remote.orientation, remote_min, remote_max),
                orientation: first.remote.orientation,
            },
            group_ids: members,
        });
    }
    pairs
}
