//! Log dispatch to stderr and the run log file
//!

use camino::Utf8Path;
use simple_error::SimpleResult;

use crate::cli;
use crate::globals::PROGRAM_NAME;
use crate::junction_output::{FRAGMENTS_FILENAME, JUNCTIONS_FILENAME};
use crate::os_utils::{create_dir_all, remove_stale_files};
use crate::prep::SETTINGS_FILENAME;
use crate::run_stats::RUN_STATS_FILENAME;

fn get_log_filename() -> String {
    PROGRAM_NAME.to_string() + ".log"
}

/// Send log records at info level or above to stderr and `log_filename`
///
/// Debug records are included when `debug` is set. Debug output from htslib wrappers is never
/// forwarded.
///
fn setup_logger(log_filename: &Utf8Path, debug: bool) -> Result<(), fern::InitError> {
    let level = if debug {
        log::LevelFilter::Debug
    } else {
        log::LevelFilter::Info
    };
    fern::Dispatch::new()
        .format(|out, message, record| {
            out.finish(format_args!(
                "{}[{}][{}] {}",
                chrono::Local::now().format("[%Y-%m-%d][%H:%M:%S]"),
                PROGRAM_NAME,
                record.level(),
                message
            ))
        })
        .level(level)
        .level_for("rust_htslib", log::LevelFilter::Info)
        .chain(std::io::stderr())
        .chain(fern::log_file(log_filename)?)
        .apply()?;
    Ok(())
}

/// Prepare the output directory for a new run
///
/// An existing directory is only accepted with `clobber`, in which case all result files of an
/// earlier run are removed.
///
fn prepare_output_dir(output_dir: &Utf8Path, clobber: bool) -> SimpleResult<()> {
    if let Err(msg) = cli::check_novel_dirname(output_dir, "Output directory") {
        if !clobber {
            return Err(msg);
        }
        let log_filename = get_log_filename();
        remove_stale_files(
            output_dir,
            &[
                JUNCTIONS_FILENAME,
                FRAGMENTS_FILENAME,
                SETTINGS_FILENAME,
                RUN_STATS_FILENAME,
                log_filename.as_str(),
            ],
        )?;
    }
    create_dir_all(output_dir, "output")
}

/// Setup the output directory, then start the logger writing into it
///
/// No logger exists when this runs, so errors are reported on stderr in the same style as the
/// command-line validation errors.
///
pub fn setup_output_dir_and_logger(output_dir: &Utf8Path, clobber: bool, debug: bool) {
    if let Err(msg) = prepare_output_dir(output_dir, clobber) {
        eprintln!("Invalid command-line setting: {}", msg);
        std::process::exit(exitcode::USAGE);
    }
    let log_filename = output_dir.join(get_log_filename());
    if let Err(err) = setup_logger(&log_filename, debug) {
        eprintln!("Unable to setup logger at '{log_filename}': {err}");
        std::process::exit(exitcode::IOERR);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use camino::Utf8PathBuf;

    #[test]
    fn test_prepare_output_dir() {
        let dir = Utf8PathBuf::from_path_buf(std::env::temp_dir())
            .unwrap()
            .join(format!("svprep_logger_test_{}", std::process::id()));
        prepare_output_dir(&dir, false).unwrap();
        assert!(dir.is_dir());

        std::fs::write(dir.join(JUNCTIONS_FILENAME), "x").unwrap();
        assert!(prepare_output_dir(&dir, false).is_err());
        prepare_output_dir(&dir, true).unwrap();
        assert!(!dir.join(JUNCTIONS_FILENAME).exists());

        std::fs::remove_dir_all(&dir).unwrap();
    }
}
