use std::sync::{Arc, Mutex};

use rust_htslib::bam;
use unwrap::unwrap;

/// Persistent indexed alignment file reader for one worker thread
pub struct BamReaderWorkerThreadData {
    pub bam_reader: bam::IndexedReader,
}

impl BamReaderWorkerThreadData {
    pub fn new(bam_filename: &str, ref_filename: Option<&str>) -> Self {
        let mut bam_reader = unwrap!(
            bam::IndexedReader::from_path(bam_filename),
            "Unable to open indexed alignment file: '{bam_filename}'"
        );
        if let Some(ref_filename) = ref_filename {
            unwrap!(
                bam_reader.set_reference(ref_filename),
                "Unable to set reference for alignment file: '{ref_filename}'"
            );
        }
        Self { bam_reader }
    }
}

pub type BamReaderWorkerThreadDataSet = Arc<Vec<Mutex<BamReaderWorkerThreadData>>>;

pub fn get_bam_reader_worker_thread_data(
    thread_count: usize,
    bam_filename: &str,
    ref_filename: Option<&str>,
) -> BamReaderWorkerThreadDataSet {
    let worker_thread_data = (0..thread_count)
        .map(|_| Mutex::new(BamReaderWorkerThreadData::new(bam_filename, ref_filename)))
        .collect();
    Arc::new(worker_thread_data)
}
