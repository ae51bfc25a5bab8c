//! Optional removal of the shared Illumina read id prefix
//!

/// Minimum number of ':'-delimited fields for a read id to be treated as Illumina-formatted
const ILLUMINA_READ_ID_FIELD_COUNT: usize = 7;

/// Number of leading fields (instrument, run, flowcell, lane) shared by all reads of one lane
const TRIMMED_FIELD_COUNT: usize = 4;

/// Strips a read id prefix learned from the first record of the alignment file
///
/// Read ids which don't share the learned prefix are left unchanged.
///
#[derive(Clone, Debug, Default)]
pub struct ReadIdTrimmer {
    prefix: Option<String>,
}

impl ReadIdTrimmer {
    pub fn from_first_read_id(read_id: &str) -> Self {
        let field_count = read_id.split(':').count();
        if field_count < ILLUMINA_READ_ID_FIELD_COUNT {
            return Self::default();
        }
        let prefix_len = read_id
            .match_indices(':')
            .nth(TRIMMED_FIELD_COUNT - 1)
            .map(|(i, _)| i + 1);
        Self {
            prefix: prefix_len.map(|x| read_id[..x].to_string()),
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.prefix.is_some()
    }

    pub fn prefix(&self) -> Option<&str> {
        self.prefix.as_deref()
    }

    pub fn trim<'a>(&self, read_id: &'a str) -> &'a str {
        match &self.prefix {
            Some(prefix) => read_id.strip_prefix(prefix.as_str()).unwrap_or(read_id),
            None => read_id,
        }
    }
}
