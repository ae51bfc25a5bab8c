use std::path::Path;

use simple_error::{SimpleResult, bail};

fn check_existing_file(filename: &str, label: &str) -> SimpleResult<()> {
    let path = Path::new(filename);
    if !path.exists() {
        bail!("Can't find specified {label} file: '{filename}'");
    }
    if !path.is_file() {
        bail!("Specified {label} file path does not appear to be a file: '{filename}'");
    }
    Ok(())
}

/// Check a required input filename
///
/// Assumes no logger has been configured yet
///
pub fn check_required_filename(filename: &str, label: &str) -> SimpleResult<()> {
    if filename.is_empty() {
        bail!("Must specify {label} file");
    }
    check_existing_file(filename, label)
}

/// Check an optional input filename, if given
///
pub fn check_optional_filename(filename: Option<&String>, label: &str) -> SimpleResult<()> {
    match filename {
        Some(x) => check_existing_file(x, label),
        None => Ok(()),
    }
}
