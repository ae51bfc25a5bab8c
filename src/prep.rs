use std::time::Instant;

use log::info;
use rust_htslib::bam::{self, Read};
use simple_error::SimpleResult;
use thousands::Separable;
use unwrap::unwrap;

use crate::bam_scanner::{get_partitions, scan_partitions};
use crate::chrom_list::ChromList;
use crate::cli;
use crate::existing_junctions::ExistingJunctions;
use crate::fragment_size::estimate_max_fragment_length;
use crate::genome_regions::GenomeRegions;
use crate::hotspots::HotspotCache;
use crate::junction_output::{write_fragments_file, write_junctions_file};
use crate::partition::PartitionResources;
use crate::read_id_trimmer::ReadIdTrimmer;
use crate::run_stats::{PrepRunStats, write_run_stats};
use crate::worker_thread_data::get_bam_reader_worker_thread_data;

pub const SETTINGS_FILENAME: &str = "prep.settings.json";

/// Learn the read id prefix to trim from the first record of the alignment file
fn get_read_id_trimmer(bam_filename: &str) -> ReadIdTrimmer {
    let mut bam_reader = unwrap!(
        bam::Reader::from_path(bam_filename),
        "Unable to open alignment file: '{bam_filename}'"
    );
    let mut record = bam::Record::new();
    match bam_reader.read(&mut record) {
        Some(Ok(())) => {
            let trimmer =
                ReadIdTrimmer::from_first_read_id(&String::from_utf8_lossy(record.qname()));
            if let Some(prefix) = trimmer.prefix() {
                info!("Trimming read id prefix '{prefix}'");
            }
            trimmer
        }
        _ => ReadIdTrimmer::default(),
    }
}

pub fn run_prep(shared_settings: &cli::SharedSettings, settings: &cli::PrepSettings) -> SimpleResult<()> {
    let start = Instant::now();

    cli::validate_prep_settings_data(settings);
    cli::write_prep_settings(&settings.output_dir, settings);

    let chrom_list = ChromList::from_bam_filename(&settings.bam_filename);
    let mut config = settings.get_prep_config();
    let mut run_stats = PrepRunStats::default();

    let target_regions = if shared_settings.target_region_list.is_empty() {
        None
    } else {
        Some(GenomeRegions::from_target_regions(
            &chrom_list,
            &shared_settings.target_region_list,
        )?)
    };
    let blacklist = settings
        .blacklist_filename
        .as_ref()
        .map(|x| GenomeRegions::from_bed(x, "blacklist", &chrom_list))
        .transpose()?;
    let hotspots = settings
        .hotspot_filename
        .as_ref()
        .map(|x| HotspotCache::from_bedpe(x, &chrom_list))
        .transpose()?;
    let existing_junctions = settings
        .existing_junctions_filename
        .as_ref()
        .map(|x| ExistingJunctions::from_tsv(x, &chrom_list))
        .transpose()?;
    if let Some(x) = &existing_junctions {
        info!(
            "Loaded {} existing junctions",
            x.junction_count().separate_with_commas()
        );
    }

    // Setup shared worker thread data structures:
    let worker_thread_dataset = get_bam_reader_worker_thread_data(
        shared_settings.thread_count,
        &settings.bam_filename,
        settings.ref_filename.as_deref(),
    );

    if settings.max_fragment_length.is_none() {
        let mut worker_data = unwrap!(
            worker_thread_dataset[0].lock(),
            "Worker thread data lock is poisoned"
        );
        if let Some(x) = estimate_max_fragment_length(
            &mut worker_data.bam_reader,
            &chrom_list,
            settings.fragment_sample_count,
            settings.fragment_length_quantile,
            config.filters.min_map_quality,
        ) {
            config.set_max_fragment_length(x);
            run_stats.is_fragment_length_estimated = true;
        }
    }
    run_stats.max_fragment_length = config.filters.max_fragment_length;
    info!(
        "Using maximum fragment length {}",
        config.filters.max_fragment_length
    );

    let read_id_trimmer = if config.trim_read_id {
        Some(get_read_id_trimmer(&settings.bam_filename)).filter(|x| x.is_enabled())
    } else {
        None
    };

    let partitions = get_partitions(
        &chrom_list,
        target_regions.as_ref(),
        config.partition_size,
        config.max_support_distance,
        config.max_read_length,
    );

    let resources = PartitionResources {
        chrom_list: &chrom_list,
        config: &config,
        blacklist: blacklist.as_ref(),
        hotspots: hotspots.as_ref(),
        existing_junctions: existing_junctions.as_ref(),
        read_id_trimmer: read_id_trimmer.as_ref(),
    };

    let scan_results = scan_partitions(
        shared_settings.thread_count,
        &worker_thread_dataset,
        partitions,
        &resources,
        &mut run_stats,
    );

    info!(
        "Retained {} junctions with {} linked fragments",
        run_stats
            .junction_stats
            .retained_junction_count
            .separate_with_commas(),
        scan_results.fragments.len().separate_with_commas()
    );

    write_junctions_file(&settings.output_dir, &chrom_list, &scan_results.genome_junctions);
    if settings.write_fragments {
        write_fragments_file(&settings.output_dir, &chrom_list, &scan_results.fragments);
    }

    run_stats.total_runtime_secs = start.elapsed().as_secs_f64();
    write_run_stats(&settings.output_dir, &run_stats);

    Ok(())
}
