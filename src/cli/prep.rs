use camino::{Utf8Path, Utf8PathBuf};
use clap::Args;
use const_format::concatcp;
use serde::{Deserialize, Serialize};
use simple_error::{SimpleResult, bail};
use unwrap::unwrap;

use super::utils::{check_optional_filename, check_required_filename};
use crate::chrom_list::ChromList;
use crate::prep::SETTINGS_FILENAME;
use crate::prep_config::{PrepConfig, ReadFilterConfig};

#[derive(Args, Default, Deserialize, Serialize)]
pub struct PrepSettings {
    /// Directory for all output (must not already exist)
    #[arg(long, value_name = "DIR", default_value = concatcp!(env!("CARGO_PKG_NAME"), "_output"))]
    pub output_dir: Utf8PathBuf,

    /// Indexed alignment file for the query sample in BAM or CRAM format
    #[arg(long = "bam", value_name = "FILE")]
    pub bam_filename: String,

    /// Genome reference in FASTA format, required for CRAM input
    #[arg(long = "ref", value_name = "FILE")]
    pub ref_filename: Option<String>,

    /// Regions excluded from junction creation, in BED format
    #[arg(long = "blacklist", value_name = "FILE")]
    pub blacklist_filename: Option<String>,

    /// Known recurrent breakpoint pairs, in BEDPE format
    ///
    /// Junctions matching a hotspot are retained with reduced support requirements.
    ///
    #[arg(long = "hotspots", value_name = "FILE")]
    pub hotspot_filename: Option<String>,

    /// Junctions file from a previous run
    ///
    /// These junctions are seeded into the junction search, and are retained if they find any
    /// supporting fragment.
    ///
    #[arg(long = "existing-junctions", value_name = "FILE")]
    pub existing_junctions_filename: Option<String>,

    /// Maximum fragment length for concordant read pairs
    ///
    /// By default this is estimated from a sample of proper pairs in the alignment file.
    ///
    #[arg(long)]
    pub max_fragment_length: Option<i64>,

    /// Number of proper pairs sampled to estimate the maximum fragment length
    #[arg(hide = true, long, default_value_t = 10000)]
    pub fragment_sample_count: usize,

    /// Quantile of the sampled fragment length distribution used as the maximum fragment length
    #[arg(hide = true, long, default_value_t = 0.995)]
    pub fragment_length_quantile: f64,

    #[arg(long, default_value_t = 2)]
    pub min_junction_support: usize,

    #[arg(long, default_value_t = 1)]
    pub min_hotspot_support: usize,

    /// Minimum MAPQ for at least one junction or exact support read of each junction
    #[arg(long, default_value_t = 20)]
    pub min_junction_mapq: u8,

    /// Reads below this MAPQ can't be used as candidate support
    #[arg(long, default_value_t = 20)]
    pub min_map_quality: u8,

    #[arg(long, default_value_t = 50)]
    pub min_alignment_bases: usize,

    #[arg(long, default_value_t = 30)]
    pub min_soft_clip_length: usize,

    /// Deletions and insertions of at least this size create junctions
    #[arg(long, default_value_t = 32)]
    pub min_indel_length: u32,

    /// Size of the genome segment processed by each worker thread task
    #[arg(hide = true, long, default_value_t = 1_000_000)]
    pub partition_size: u64,

    /// Read count in each 1kb segment above which reads are downsampled
    #[arg(long, default_value_t = 15000)]
    pub downsample_threshold: usize,

    /// Partitions stop reading input after this many reads
    #[arg(hide = true, long, default_value_t = 5_000_000)]
    pub max_partition_reads: usize,

    /// Support lists of each junction stop growing at this fragment count
    #[arg(hide = true, long, default_value_t = 10000)]
    pub junction_fragment_cap: usize,

    /// Maximum records scanned to recover each missing read of a spanning fragment
    #[arg(hide = true, long, default_value_t = 5000)]
    pub max_recovery_scan_depth: usize,

    /// Strip the Illumina instrument, run, flowcell and lane prefix from read ids
    #[arg(long)]
    pub trim_read_id: bool,

    /// Don't attach remote junctions from supplementary alignments
    #[arg(long)]
    pub disable_remote_tracking: bool,

    /// Annotate each junction with the count of fragments overlapping it
    #[arg(long)]
    pub capture_depth: bool,

    /// Write all reads of the fragments linked to retained junctions
    #[arg(long)]
    pub write_fragments: bool,

    /// Don't canonicalize input file paths
    #[arg(long)]
    pub disable_path_canonicalization: bool,
}

impl PrepSettings {
    /// Translate settings into the configuration used by the junction search
    ///
    /// The fragment length is set to its default value here, and may be updated from the
    /// alignment file later.
    ///
    pub fn get_prep_config(&self) -> PrepConfig {
        let mut config = PrepConfig {
            filters: ReadFilterConfig {
                min_alignment_bases: self.min_alignment_bases,
                min_map_quality: self.min_map_quality,
                min_soft_clip_length: self.min_soft_clip_length,
                ..Default::default()
            },
            min_indel_length: self.min_indel_length,
            min_junction_support: self.min_junction_support,
            min_hotspot_support: self.min_hotspot_support,
            min_junction_mapq: self.min_junction_mapq,
            junction_fragment_cap: self.junction_fragment_cap,
            max_partition_reads: self.max_partition_reads,
            partition_size: self.partition_size,
            downsample_threshold: self.downsample_threshold,
            max_recovery_scan_depth: self.max_recovery_scan_depth,
            trim_read_id: self.trim_read_id,
            track_remotes: !self.disable_remote_tracking,
            capture_depth: self.capture_depth,
            ..Default::default()
        };
        if let Some(x) = self.max_fragment_length {
            config.set_max_fragment_length(x);
        }
        config
    }
}

/// Validate settings and update to parameters that can't be processed automatically by clap.
///
/// Assumes that the logger is not setup
///
pub fn validate_and_fix_prep_settings(settings: PrepSettings) -> SimpleResult<PrepSettings> {
    check_required_filename(&settings.bam_filename, "alignment")?;
    check_optional_filename(settings.ref_filename.as_ref(), "reference")?;
    check_optional_filename(settings.blacklist_filename.as_ref(), "blacklist")?;
    check_optional_filename(settings.hotspot_filename.as_ref(), "hotspot")?;
    check_optional_filename(
        settings.existing_junctions_filename.as_ref(),
        "existing junctions",
    )?;

    if let Some(x) = settings.max_fragment_length {
        if x <= 0 {
            bail!("--max-fragment-length argument must be greater than 0");
        }
    }
    if settings.fragment_sample_count == 0 {
        bail!("--fragment-sample-count argument must be greater than 0");
    }
    if !(settings.fragment_length_quantile > 0.0 && settings.fragment_length_quantile <= 1.0) {
        bail!("--fragment-length-quantile argument must be in (0,1]");
    }
    if settings.min_junction_support == 0 {
        bail!("--min-junction-support argument must be greater than 0");
    }
    if settings.partition_size == 0 {
        bail!("--partition-size argument must be greater than 0");
    }
    if settings.downsample_threshold == 0 {
        bail!("--downsample-threshold argument must be greater than 0");
    }

    // Canonicalize file paths:
    fn canonicalize_string_path(s: &str) -> SimpleResult<String> {
        match Utf8PathBuf::from(s).canonicalize_utf8() {
            Ok(x) => Ok(x.to_string()),
            Err(e) => bail!("Can't canonicalize file path '{s}': {e}"),
        }
    }

    fn canonicalize_optional_path(s: Option<String>) -> SimpleResult<Option<String>> {
        s.map(|x| canonicalize_string_path(&x)).transpose()
    }

    let mut settings = settings;
    if !settings.disable_path_canonicalization {
        settings.bam_filename = canonicalize_string_path(&settings.bam_filename)?;
        settings.ref_filename = canonicalize_optional_path(settings.ref_filename)?;
        settings.blacklist_filename = canonicalize_optional_path(settings.blacklist_filename)?;
        settings.hotspot_filename = canonicalize_optional_path(settings.hotspot_filename)?;
        settings.existing_junctions_filename =
            canonicalize_optional_path(settings.existing_junctions_filename)?;
    }

    Ok(settings)
}

#[derive(Debug, PartialEq)]
enum SettingValidationError {
    NotFound,
    UnMapped,
}

fn validate_prep_settings_data_impl(settings: &PrepSettings) -> Result<(), SettingValidationError> {
    use log::error;
    use rust_htslib::bam::{self, Read};

    // Pull chromosome list from alignment file header, and also check that htslib recognizes the index
    let chrom_list = {
        let bam_reader = match bam::IndexedReader::from_path(&settings.bam_filename) {
            Ok(x) => x,
            Err(error) => {
                error!("Failed to open input alignment file: {}", error);
                return Err(SettingValidationError::NotFound);
            }
        };
        ChromList::from_bam_header(bam_reader.header())
    };

    if chrom_list.data.is_empty() {
        error!(
            "Input alignment file is not mapped: '{}'",
            &settings.bam_filename
        );
        return Err(SettingValidationError::UnMapped);
    }

    Ok(())
}

/// Extended input data/settings validation that's too complex/slow to put in the cmdline parser
///
/// Assumes that the logger is setup
///
pub fn validate_prep_settings_data(settings: &PrepSettings) {
    if let Err(err) = validate_prep_settings_data_impl(settings) {
        match err {
            SettingValidationError::NotFound => std::process::exit(exitcode::USAGE),
            SettingValidationError::UnMapped => std::process::exit(exitcode::DATAERR),
        }
    }
}

/// Write settings out in json format
pub fn write_prep_settings(output_dir: &Utf8Path, settings: &PrepSettings) {
    use log::info;

    let filename = output_dir.join(SETTINGS_FILENAME);

    info!("Writing settings to file: '{filename}'");

    let f = unwrap!(
        std::fs::File::create(&filename),
        "Unable to create settings json file: '{filename}'"
    );

    unwrap!(
        serde_json::to_writer_pretty(&f, &settings),
        "Unable to write settings json file: '{filename}'"
    );
}

#[cfg(test)]
mod tests {
    use super::*;

    fn get_default_settings() -> PrepSettings {
        PrepSettings {
            fragment_sample_count: 10000,
            fragment_length_quantile: 0.995,
            min_junction_support: 2,
            partition_size: 1_000_000,
            downsample_threshold: 15000,
            ..Default::default()
        }
    }

    #[test]
    fn test_not_there() {
        let mut test_settings = get_default_settings();
        test_settings.bam_filename = "./test_data/not_there.bam".to_string();
        let rc = validate_prep_settings_data_impl(&test_settings);
        assert_eq!(rc, Err(SettingValidationError::NotFound));
        assert!(validate_and_fix_prep_settings(test_settings).is_err());
    }

    #[test]
    fn test_get_prep_config() {
        let mut settings = get_default_settings();
        settings.min_junction_support = 3;
        settings.disable_remote_tracking = true;
        let config = settings.get_prep_config();
        assert_eq!(config.min_junction_support, 3);
        assert!(!config.track_remotes);
        assert_eq!(config.max_support_distance, 1000);

        settings.max_fragment_length = Some(600);
        let config = settings.get_prep_config();
        assert_eq!(config.filters.max_fragment_length, 600);
        assert_eq!(config.max_support_distance, 600);
    }
}
