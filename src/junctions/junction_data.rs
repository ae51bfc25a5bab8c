use log::warn;

use super::remote_junction::{RemoteJunction, merge_remote_junction};
use crate::aligned_read::Orientation;
use crate::read_group::GroupId;

/// Location of a junction within one chromosome
#[derive(Clone, Copy, Debug, Eq, Hash, Ord, PartialEq, PartialOrd)]
pub struct JunctionKey {
    pub position: i64,
    pub orientation: Orientation,
}

impl JunctionKey {
    pub fn new(position: i64, orientation: Orientation) -> Self {
        Self {
            position,
            orientation,
        }
    }
}

/// Reference to one read in the partition's group arena
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct ReadRef {
    pub group_id: GroupId,
    pub read_index: usize,
}

/// All evidence accumulated for one candidate breakpoint
#[derive(Clone, Debug)]
pub struct JunctionData {
    pub key: JunctionKey,

    /// Fragments with a read clip or indel boundary exactly at the junction
    pub junction_groups: Vec<GroupId>,

    /// Fragments with chimeric reads consistent with the junction
    pub support_groups: Vec<GroupId>,

    /// Fragments with clipped bases matching the representative read near the junction
    pub exact_support_groups: Vec<GroupId>,

    pub remote_junctions: Vec<RemoteJunction>,

    pub hotspot: bool,
    pub internal_indel: bool,
    pub discordant_group: bool,

    /// Junction carried over from a previous run
    pub initial: bool,

    /// Junction read with the most high-quality soft-clipped bases
    pub representative: Option<ReadRef>,
    representative_score: usize,

    pub depth: u32,
    pub support_cap_reached: bool,
}

impl JunctionData {
    pub fn new(key: JunctionKey) -> Self {
        Self {
            key,
            junction_groups: Vec::new(),
            support_groups: Vec::new(),
            exact_support_groups: Vec::new(),
            remote_junctions: Vec::new(),
            hotspot: false,
            internal_indel: false,
            discordant_group: false,
            initial: false,
            representative: None,
            representative_score: 0,
            depth: 0,
            support_cap_reached: false,
        }
    }

    pub fn position(&self) -> i64 {
        self.key.position
    }

    pub fn orientation(&self) -> Orientation {
        self.key.orientation
    }

    pub fn junction_count(&self) -> usize {
        self.junction_groups.len()
    }

    pub fn support_count(&self) -> usize {
        self.support_groups.len()
    }

    pub fn exact_support_count(&self) -> usize {
        self.exact_support_groups.len()
    }

    pub fn total_support(&self) -> usize {
        self.junction_count() + self.support_count() + self.exact_support_count()
    }

    pub fn add_junction_group(&mut self, group_id: GroupId) {
        self.junction_groups.push(group_id);
    }

    fn check_cap(&mut self, cap: usize) -> bool {
        if self.support_count() + self.exact_support_count() < cap {
            return true;
        }
        if !self.support_cap_reached {
            warn!(
                "Junction at position {} reached the supporting fragment limit ({cap})",
                self.key.position
            );
            self.support_cap_reached = true;
        }
        false
    }

    /// Add a supporting fragment, returning false if the support limit has been reached
    pub fn add_support_group(&mut self, group_id: GroupId, cap: usize) -> bool {
        if !self.check_cap(cap) {
            return false;
        }
        self.support_groups.push(group_id);
        true
    }

    /// Add an exact supporting fragment, returning false if the support limit has been reached
    pub fn add_exact_support_group(&mut self, group_id: GroupId, cap: usize) -> bool {
        if !self.check_cap(cap) {
            return false;
        }
        self.exact_support_groups.push(group_id);
        true
    }

    pub fn add_remote_junction(&mut self, remote: RemoteJunction) {
        merge_remote_junction(&mut self.remote_junctions, remote);
    }

    /// Offer a junction read as the representative, ties keep the incumbent
    pub fn offer_representative(&mut self, read_ref: ReadRef, high_qual_clip_count: usize) {
        if self.representative.is_none() || high_qual_clip_count > self.representative_score {
            self.representative = Some(read_ref);
            self.representative_score = high_qual_clip_count;
        }
    }
}
