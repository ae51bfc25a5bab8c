//! Junction and fragment TSV writers
//!

use std::io::Write;

use camino::Utf8Path;
use itertools::Itertools;
use log::info;
use unwrap::unwrap;

use crate::chrom_list::ChromList;
use crate::cigar_utils::cigar_to_string;
use crate::junctions::JunctionData;
use crate::partition::Fragment;

pub const JUNCTIONS_FILENAME: &str = "junctions.tsv";
pub const FRAGMENTS_FILENAME: &str = "fragments.tsv";

const JUNCTION_HEADER: &[&str] = &[
    "Chromosome",
    "Position",
    "Orientation",
    "JunctionFrags",
    "SupportFrags",
    "ExactSupportFrags",
    "Hotspot",
    "Indel",
    "Discordant",
    "Initial",
    "Depth",
    "RemoteJunctions",
];

const FRAGMENT_HEADER: &[&str] = &[
    "ReadId",
    "Chromosome",
    "Start",
    "End",
    "Cigar",
    "Flags",
    "MapQual",
    "ReadType",
    "FragmentComplete",
    "Junctions",
];

fn bool_str(val: bool) -> &'static str {
    if val { "true" } else { "false" }
}

/// Write junctions for every chromosome in chromosome index order
///
/// `genome_junctions` is indexed on chromosome, with each chromosome's junctions in position
/// order.
///
pub fn write_junction_records(
    f: &mut impl Write,
    chrom_list: &ChromList,
    genome_junctions: &[Vec<JunctionData>],
) -> std::io::Result<()> {
    writeln!(f, "{}", JUNCTION_HEADER.join("\t"))?;
    for (chrom_index, junctions) in genome_junctions.iter().enumerate() {
        let chrom_label = chrom_list.label(chrom_index);
        for junction in junctions {
            let remotes = junction
                .remote_junctions
                .iter()
                .map(|x| x.to_output_string(chrom_list))
                .join(";");
            writeln!(
                f,
                "{}\t{}\t{}\t{}\t{}\t{}\t{}\t{}\t{}\t{}\t{}\t{}",
                chrom_label,
                junction.position(),
                junction.orientation().as_int(),
                junction.junction_count(),
                junction.support_count(),
                junction.exact_support_count(),
                bool_str(junction.hotspot),
                bool_str(junction.internal_indel),
                bool_str(junction.discordant_group),
                bool_str(junction.initial),
                junction.depth,
                remotes
            )?;
        }
    }
    Ok(())
}

/// Write one row for every read of each fragment
pub fn write_fragment_records(
    f: &mut impl Write,
    chrom_list: &ChromList,
    fragments: &[Fragment],
) -> std::io::Result<()> {
    writeln!(f, "{}", FRAGMENT_HEADER.join("\t"))?;
    for fragment in fragments {
        let links = fragment
            .junction_links
            .iter()
            .map(|(chrom_index, key)| {
                format!(
                    "{}:{}:{}",
                    chrom_list.label(*chrom_index),
                    key.position,
                    key.orientation.as_int()
                )
            })
            .join(";");
        for read in fragment.reads.iter() {
            let read_type: &str = read.read_type.into();
            writeln!(
                f,
                "{}\t{}\t{}\t{}\t{}\t{}\t{}\t{}\t{}\t{}",
                fragment.id,
                chrom_list.label(read.chrom_index),
                read.start,
                read.end,
                cigar_to_string(&read.cigar),
                read.flags,
                read.mapq,
                read_type,
                bool_str(fragment.is_complete),
                links
            )?;
        }
    }
    Ok(())
}

pub fn write_junctions_file(
    output_dir: &Utf8Path,
    chrom_list: &ChromList,
    genome_junctions: &[Vec<JunctionData>],
) {
    let filename = output_dir.join(JUNCTIONS_FILENAME);
    info!("Writing junctions to file: '{filename}'");

    let f = unwrap!(
        std::fs::File::create(&filename),
        "Unable to create junctions file: '{filename}'"
    );
    let mut f = std::io::BufWriter::new(f);
    unwrap!(
        write_junction_records(&mut f, chrom_list, genome_junctions),
        "Failed to write junctions file: '{filename}'"
    );
}

pub fn write_fragments_file(output_dir: &Utf8Path, chrom_list: &ChromList, fragments: &[Fragment]) {
    let filename = output_dir.join(FRAGMENTS_FILENAME);
    info!("Writing fragments to file: '{filename}'");

    let f = unwrap!(
        std::fs::File::create(&filename),
        "Unable to create fragments file: '{filename}'"
    );
    let mut f = std::io::BufWriter::new(f);
    unwrap!(
        write_fragment_records(&mut f, chrom_list, fragments),
        "Failed to write fragments file: '{filename}'"
    );
}
