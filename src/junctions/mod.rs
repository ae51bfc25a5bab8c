mod discordant_groups;
mod exact_support;
mod junction_data;
mod junction_index;
mod junction_tracker;
mod remote_junction;

pub use discordant_groups::*;
pub use exact_support::*;
pub use junction_data::*;
pub use junction_index::*;
pub use junction_tracker::*;
pub use remote_junction::*;
