//! Filesystem and process limit helpers
//!

use camino::Utf8Path;
use simple_error::{SimpleResult, bail};

/// Create the directory and any missing parents
///
/// * `label` - describes the directory in the error message
///
pub fn create_dir_all(dir: &Utf8Path, label: &str) -> SimpleResult<()> {
    if dir.is_dir() {
        return Ok(());
    }
    if let Err(e) = std::fs::create_dir_all(dir) {
        bail!("Can't create new {label} directory at '{dir}': {e}");
    }
    Ok(())
}

/// Remove any of the named files found in `dir`
///
/// Used when an existing output directory is reused, so that stale results from an earlier run
/// can't be mixed with the new ones.
///
pub fn remove_stale_files(dir: &Utf8Path, filenames: &[&str]) -> SimpleResult<()> {
    for filename in filenames {
        let path = dir.join(filename);
        if path.is_file() {
            if let Err(e) = std::fs::remove_file(&path) {
                bail!("Can't remove existing output file '{path}': {e}");
            }
        }
    }
    Ok(())
}

/// Raise the soft open file limit to the hard limit
///
/// Each worker thread holds its own alignment file handle, so large thread counts can exceed a
/// low default limit. Failure is ignored.
///
pub fn attempt_max_open_file_limit() {
    use rlimit::Resource;

    if let Ok((soft, hard)) = Resource::NOFILE.get() {
        if soft < hard {
            rlimit::setrlimit(Resource::NOFILE, hard, hard).unwrap_or_default();
        }
    }
}
