use crate::aligned_read::Orientation;
use crate::chrom_list::ChromList;

/// Partner breakpoint implied by a supplementary alignment, a clip boundary outside the
/// partition, or a discordant pair cluster
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct RemoteJunction {
    pub chrom_index: usize,
    pub position: i64,
    pub orientation: Orientation,
    pub fragment_count: u32,
}

impl RemoteJunction {
    pub fn new(chrom_index: usize, position: i64, orientation: Orientation) -> Self {
        Self {
            chrom_index,
            position,
            orientation,
            fragment_count: 1,
        }
    }

    pub fn matches(&self, other: &Self) -> bool {
        self.chrom_index == other.chrom_index
            && self.position == other.position
            && self.orientation == other.orientation
    }

    pub fn to_output_string(&self, chrom_list: &ChromList) -> String {
        format!(
            "{}:{}:{}:{}",
            chrom_list.label(self.chrom_index),
            self.position,
            self.orientation.as_int(),
            self.fragment_count
        )
    }
}

/// Add the remote junction to the list, merging counts with any matching entry
pub fn merge_remote_junction(remote_junctions: &mut Vec<RemoteJunction>, remote: RemoteJunction) {
    match remote_junctions.iter_mut().find(|x| x.matches(&remote)) {
        Some(x) => x.fragment_count += remote.fragment_count,
        None => remote_junctions.push(remote),
    }
}
