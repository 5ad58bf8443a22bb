//! File-level driver: all banks of a file, in parallel.

use crate::bank::{BankProcessor, CalibrationInput};
use crate::config::ReduceConfig;
use crate::Result;
use nexhist_io::NexusFile;
use rayon::prelude::*;
use std::collections::BTreeMap;
use std::path::Path;

/// Histograms every bank of a NeXus file.
///
/// Banks run as independent rayon tasks, each with its own group
/// handle, buffers, calibration table, and accumulator; the HDF5
/// library serializes the underlying reads.
///
/// # Errors
/// Returns the first bank failure; completed banks' results are
/// discarded with it.
pub fn process_file<P: AsRef<Path>>(
    path: P,
    config: &ReduceConfig,
    calibration: CalibrationInput<'_>,
    edges: &[f64],
) -> Result<BTreeMap<String, Vec<u32>>> {
    nexhist_core::validate_edges(edges).map_err(crate::Error::Core)?;
    let file = NexusFile::open(path).map_err(crate::Error::Io)?;
    let banks = file.bank_names().map_err(crate::Error::Io)?;
    log::info!("processing {} bank(s)", banks.len());

    let processor = BankProcessor::new(config, calibration, edges);
    let nbins = edges.len() - 1;

    banks
        .par_iter()
        .map(|name| -> Result<(String, Vec<u32>)> {
            let bank = file.bank(name).map_err(crate::Error::Io)?;
            let mut counts = vec![0u32; nbins];
            processor.process_bank(&bank, name, &mut counts)?;
            Ok((name.clone(), counts))
        })
        .collect()
}
