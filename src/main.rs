mod aligned_read;
mod alignment_source;
mod bam_scanner;
mod bam_utils;
mod base_range;
mod chrom_list;
mod cigar_utils;
mod cli;
mod existing_junctions;
mod fragment_size;
mod genome_regions;
mod globals;
mod hotspots;
mod junction_output;
mod junctions;
mod logger;
mod os_utils;
mod partition;
mod prep;
mod prep_config;
mod read_filters;
mod read_group;
mod read_id_trimmer;
mod region_utils;
mod run_stats;
#[cfg(test)]
mod test_utils;
mod worker_thread_data;

use std::{error, process};

use hhmmss::Hhmmss;
use log::info;

use crate::globals::{PROGRAM_NAME, PROGRAM_VERSION};
use crate::logger::setup_output_dir_and_logger;
use crate::prep::run_prep;

/// Run system configuration steps prior to starting any other program logic
///
fn system_configuration_prelude() {
    os_utils::attempt_max_open_file_limit();
}

fn run(settings: &cli::Settings) -> Result<(), Box<dyn error::Error>> {
    info!("Starting {PROGRAM_NAME} {PROGRAM_VERSION}");
    info!(
        "cmdline: {}",
        std::env::args().collect::<Vec<_>>().join(" ")
    );
    info!("Running on {} threads", settings.shared.thread_count);

    let start = std::time::Instant::now();

    run_prep(&settings.shared, &settings.prep)?;

    info!(
        "{PROGRAM_NAME} completed. Total Runtime: {}",
        start.elapsed().hhmmssxxx()
    );
    Ok(())
}

fn main() {
    system_configuration_prelude();

    let settings = cli::validate_and_fix_settings(cli::parse_settings());

    // Setup logger, including creation of the output directory for the log file:
    setup_output_dir_and_logger(
        &settings.prep.output_dir,
        settings.shared.clobber,
        settings.shared.debug,
    );

    if let Err(err) = run(&settings) {
        log::error!("{err}");
        process::exit(exitcode::DATAERR);
    }
}
